//! Moving-average crossover signals with an optional classifier overlay.
//!
//! The rule-based part (`signal`, `position`) is what the simulator trades
//! on. The classifier columns (`ml_signal`, `ml_confidence`) are display
//! only; a failed fit leaves them at zero instead of failing the run.

use chrono::NaiveDate;
use ndarray::{Array1, Array2};

use super::classifier::{ClassifierError, LogisticRegression};
use super::error::CrosstraderError;
use super::indicator::{lead, pct_change, rolling_mean, rolling_mean_defined};
use super::price::PriceBar;

/// Rows with a complete feature vector and target required before the
/// classifier is trained at all.
pub const MIN_TRAINING_ROWS: usize = 50;

/// Ret_1, Ret_3, Ret_5, Short_MA, Long_MA.
pub const FEATURE_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub use_ml: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            short_window: 40,
            long_window: 100,
            use_ml: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub short_ma: f64,
    pub long_ma: f64,
    pub signal: u8,
    pub position: i8,
    pub ret: Option<f64>,
    pub next_return: Option<f64>,
    pub target: Option<u8>,
    pub ret_1: Option<f64>,
    pub ret_3: Option<f64>,
    pub ret_5: Option<f64>,
    pub ml_signal: u8,
    pub ml_confidence: f64,
}

impl SignalRecord {
    /// [Ret_1, Ret_3, Ret_5, Short_MA, Long_MA], or `None` while any
    /// return feature is still undefined.
    pub fn features(&self) -> Option<[f64; FEATURE_COUNT]> {
        Some([
            self.ret_1?,
            self.ret_3?,
            self.ret_5?,
            self.short_ma,
            self.long_ma,
        ])
    }

    pub fn is_buy_edge(&self) -> bool {
        self.position == 1
    }

    pub fn is_sell_edge(&self) -> bool {
        self.position == -1
    }
}

/// Build one [`SignalRecord`] per price bar, in input order.
pub fn generate_signals(
    bars: &[PriceBar],
    config: &SignalConfig,
) -> Result<Vec<SignalRecord>, CrosstraderError> {
    validate_window("short_window", config.short_window)?;
    validate_window("long_window", config.long_window)?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let short_ma = rolling_mean(&closes, config.short_window);
    let long_ma = rolling_mean(&closes, config.long_window);

    let returns = pct_change(&closes);
    let next_returns = lead(&returns);
    let ret_3 = rolling_mean_defined(&returns, 3);
    let ret_5 = rolling_mean_defined(&returns, 5);

    let mut records = Vec::with_capacity(bars.len());
    let mut prev_signal: Option<u8> = None;

    for (i, bar) in bars.iter().enumerate() {
        let signal = u8::from(short_ma[i] > long_ma[i]);
        let position = match prev_signal {
            Some(prev) => signal as i8 - prev as i8,
            None => 0,
        };
        prev_signal = Some(signal);

        records.push(SignalRecord {
            date: bar.date,
            close: bar.close,
            short_ma: short_ma[i],
            long_ma: long_ma[i],
            signal,
            position,
            ret: returns[i],
            next_return: next_returns[i],
            target: next_returns[i].map(|r| u8::from(r > 0.0)),
            ret_1: returns[i],
            ret_3: ret_3[i],
            ret_5: ret_5[i],
            ml_signal: 0,
            ml_confidence: 0.0,
        });
    }

    if config.use_ml {
        apply_classifier(&mut records);
    }

    Ok(records)
}

fn validate_window(name: &str, value: usize) -> Result<(), CrosstraderError> {
    if value == 0 {
        return Err(CrosstraderError::InvalidWindow {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

/// Classifier output for one training-table row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score {
    index: usize,
    class: u8,
    probability: f64,
}

/// Attempt a fit; on any failure every record keeps the disabled sentinel
/// (0 / 0.0). Scores are only written once the whole table has been scored.
fn apply_classifier(records: &mut [SignalRecord]) {
    match score_training_rows(records) {
        Ok(Some(scores)) => {
            for score in scores {
                let record = &mut records[score.index];
                record.ml_signal = score.class;
                record.ml_confidence = score.probability.clamp(0.0, 1.0);
            }
        }
        Ok(None) => {}
        Err(e) => {
            log::warn!("classifier disabled for this run: {e}");
        }
    }
}

fn score_training_rows(records: &[SignalRecord]) -> Result<Option<Vec<Score>>, ClassifierError> {
    let rows: Vec<(usize, [f64; FEATURE_COUNT], u8)> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| Some((i, r.features()?, r.target?)))
        .collect();

    if rows.len() < MIN_TRAINING_ROWS {
        log::debug!(
            "{} training rows, need {}; classifier skipped",
            rows.len(),
            MIN_TRAINING_ROWS
        );
        return Ok(None);
    }

    let x = Array2::from_shape_vec(
        (rows.len(), FEATURE_COUNT),
        rows.iter().flat_map(|(_, f, _)| f.iter().copied()).collect(),
    )
    .map_err(|_| ClassifierError::DimensionMismatch {
        expected: rows.len() * FEATURE_COUNT,
        got: 0,
    })?;
    let y: Array1<f64> = rows.iter().map(|(_, _, t)| f64::from(*t)).collect();

    // Chronological split, no shuffling: the fit set strictly precedes
    // the held-out rows.
    let split = rows.len() * 7 / 10;
    let x_fit = x.slice(ndarray::s![..split, ..]).to_owned();
    let y_fit = y.slice(ndarray::s![..split]).to_owned();

    let mut model = LogisticRegression::default();
    model.fit(&x_fit, &y_fit)?;
    log::debug!("classifier fitted on {split} of {} rows", rows.len());

    // Every training-table row is scored, in-sample ones included.
    let classes = model.predict(&x)?;
    let probabilities = model.predict_proba(&x)?;

    Ok(Some(
        rows.iter()
            .zip(classes.iter().zip(probabilities.iter()))
            .map(|((index, _, _), (&class, &probability))| Score {
                index: *index,
                class,
                probability,
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(start + chrono::Duration::days(i as i64), c))
            .collect()
    }

    fn no_ml(short: usize, long: usize) -> SignalConfig {
        SignalConfig {
            short_window: short,
            long_window: long,
            use_ml: false,
        }
    }

    /// Zig-zag with drift so both target classes appear.
    fn choppy(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + (i as f64) * 0.1 + if i % 3 == 0 { 2.0 } else { -1.0 })
            .collect()
    }

    #[test]
    fn one_record_per_bar_in_order() {
        let input = bars(&[10.0, 11.0, 12.0, 11.0]);
        let records = generate_signals(&input, &no_ml(2, 3)).unwrap();
        assert_eq!(records.len(), 4);
        for (r, b) in records.iter().zip(&input) {
            assert_eq!(r.date, b.date);
            assert_eq!(r.close, b.close);
        }
    }

    #[test]
    fn crossover_edges() {
        // short=1, long=2: signal is 1 exactly when the close rose.
        let records =
            generate_signals(&bars(&[9.0, 9.0, 10.0, 12.0, 11.0, 11.0]), &no_ml(1, 2)).unwrap();
        let signals: Vec<u8> = records.iter().map(|r| r.signal).collect();
        let positions: Vec<i8> = records.iter().map(|r| r.position).collect();
        assert_eq!(signals, vec![0, 0, 1, 1, 0, 0]);
        assert_eq!(positions, vec![0, 0, 1, 0, -1, 0]);
    }

    #[test]
    fn first_position_is_zero_even_when_signal_starts_high() {
        // Signal at bar 0 is 0 because both means equal the first close.
        let records = generate_signals(&bars(&[10.0, 20.0, 30.0]), &no_ml(1, 3)).unwrap();
        assert_eq!(records[0].position, 0);
        assert_eq!(records[1].position, 1);
    }

    #[test]
    fn returns_targets_and_features() {
        let records =
            generate_signals(&bars(&[100.0, 110.0, 99.0, 99.0]), &no_ml(2, 3)).unwrap();

        assert_eq!(records[0].ret, None);
        assert!((records[1].ret.unwrap() - 0.1).abs() < 1e-12);
        assert!((records[0].next_return.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(records[3].next_return, None);

        assert_eq!(records[0].target, Some(1));
        assert_eq!(records[1].target, Some(0));
        assert_eq!(records[2].target, Some(0));
        assert_eq!(records[3].target, None);

        assert_eq!(records[0].features(), None);
        let f = records[2].features().unwrap();
        assert!((f[0] - (-0.1)).abs() < 1e-12);
        assert!((f[1] - 0.0).abs() < 1e-12);
        assert_eq!(f[3], records[2].short_ma);
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = generate_signals(&bars(&[1.0, 2.0]), &no_ml(0, 3)).unwrap_err();
        assert!(matches!(err, CrosstraderError::InvalidWindow { .. }));
    }

    #[test]
    fn ml_disabled_leaves_sentinel() {
        let records = generate_signals(&bars(&choppy(120)), &no_ml(5, 20)).unwrap();
        assert!(records
            .iter()
            .all(|r| r.ml_signal == 0 && r.ml_confidence == 0.0));
    }

    #[test]
    fn ml_skipped_below_minimum_rows() {
        // 51 bars leave 49 complete rows (first and last bar drop out).
        let config = SignalConfig {
            short_window: 3,
            long_window: 10,
            use_ml: true,
        };
        let records = generate_signals(&bars(&choppy(51)), &config).unwrap();
        assert!(records
            .iter()
            .all(|r| r.ml_signal == 0 && r.ml_confidence == 0.0));
    }

    #[test]
    fn ml_scores_every_training_row() {
        let config = SignalConfig {
            short_window: 3,
            long_window: 10,
            use_ml: true,
        };
        let records = generate_signals(&bars(&choppy(52)), &config).unwrap();
        let last = records.len() - 1;

        assert_eq!(records[0].ml_confidence, 0.0);
        assert_eq!(records[last].ml_confidence, 0.0);
        for r in &records[1..last] {
            assert!(r.ml_confidence > 0.0 && r.ml_confidence < 1.0);
            assert!(r.ml_signal <= 1);
            assert_eq!(r.ml_signal, u8::from(r.ml_confidence > 0.5));
        }
    }

    #[test]
    fn ml_falls_back_when_fit_fails() {
        // Strictly rising prices: every target is 1, so the fit fails.
        let closes: Vec<f64> = (0..120).map(|i| 50.0 + i as f64).collect();
        let config = SignalConfig {
            short_window: 3,
            long_window: 10,
            use_ml: true,
        };
        let records = generate_signals(&bars(&closes), &config).unwrap();
        assert!(records
            .iter()
            .all(|r| r.ml_signal == 0 && r.ml_confidence == 0.0));
        assert!(records.iter().any(|r| r.signal == 1));
    }

    #[test]
    fn ml_does_not_change_rule_signals() {
        let input = bars(&choppy(150));
        let with_ml = generate_signals(
            &input,
            &SignalConfig {
                short_window: 5,
                long_window: 20,
                use_ml: true,
            },
        )
        .unwrap();
        let without = generate_signals(&input, &no_ml(5, 20)).unwrap();
        for (a, b) in with_ml.iter().zip(&without) {
            assert_eq!(a.signal, b.signal);
            assert_eq!(a.position, b.position);
        }
    }
}

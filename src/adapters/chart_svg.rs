//! SVG chart output.
//!
//! Two stacked panels sharing the x axis: strategy equity against the
//! buy-and-hold benchmark, then the close price with trade markers and,
//! optionally, the classifier's edges and confidence.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CrosstraderError;
use crate::ports::result_port::ResultSink;
use log::{info, warn};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

const WIDTH: f64 = 1000.0;
const PANEL_HEIGHT: f64 = 320.0;
const PADDING: f64 = 60.0;
const HEIGHT: f64 = 2.0 * (PANEL_HEIGHT + PADDING) + PADDING;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChartOptions {
    pub show_ml: bool,
    pub log_scale: bool,
}

/// Maps values onto a vertical pixel range.
#[derive(Debug, Clone, Copy)]
struct Scale {
    lo: f64,
    hi: f64,
    log: bool,
    top: f64,
    height: f64,
}

impl Scale {
    fn fit<'a>(values: impl Iterator<Item = &'a f64>, log: bool, top: f64, height: f64) -> Self {
        let (mut lo, mut hi) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if lo > hi {
            lo = 0.0;
            hi = 1.0;
        }
        if log {
            lo = lo.ln();
            hi = hi.ln();
        }
        Scale {
            lo,
            hi,
            log,
            top,
            height,
        }
    }

    fn y(&self, value: f64) -> f64 {
        let v = if self.log { value.ln() } else { value };
        let range = self.hi - self.lo;
        let frac = if range > 0.0 { (v - self.lo) / range } else { 0.5 };
        self.top + self.height - frac * self.height
    }

    fn label(&self, frac: f64) -> f64 {
        let v = self.lo + frac * (self.hi - self.lo);
        if self.log { v.exp() } else { v }
    }
}

fn x_at(i: usize, n: usize) -> f64 {
    let plot_width = WIDTH - 2.0 * PADDING;
    if n > 1 {
        PADDING + i as f64 * plot_width / (n - 1) as f64
    } else {
        PADDING + plot_width / 2.0
    }
}

fn polyline(out: &mut String, values: &[f64], scale: &Scale, style: &str) {
    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| format!("{:.1},{:.1}", x_at(i, values.len()), scale.y(v)))
        .collect();
    let _ = writeln!(
        out,
        r#"  <polyline fill="none" {} points="{}"/>"#,
        style,
        points.join(" ")
    );
}

fn axes(out: &mut String, scale: &Scale, title: &str, y_label: &str) {
    let bottom = scale.top + scale.height;
    let _ = writeln!(
        out,
        r#"  <text x="{:.0}" y="{:.0}" font-size="16" font-weight="bold" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        scale.top - 20.0,
        escape(title)
    );
    let _ = writeln!(
        out,
        r#"  <line x1="{p:.0}" y1="{t:.0}" x2="{p:.0}" y2="{b:.0}" stroke="black"/>"#,
        p = PADDING,
        t = scale.top,
        b = bottom
    );
    let _ = writeln!(
        out,
        r#"  <line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="black"/>"#,
        p = PADDING,
        b = bottom,
        r = WIDTH - PADDING
    );
    for frac in [0.0, 0.5, 1.0] {
        let _ = writeln!(
            out,
            r#"  <text x="{:.0}" y="{:.1}" font-size="10" text-anchor="end">{:.2}</text>"#,
            PADDING - 4.0,
            scale.top + scale.height * (1.0 - frac),
            scale.label(frac)
        );
    }
    let _ = writeln!(
        out,
        r#"  <text x="12" y="{:.0}" font-size="12" transform="rotate(-90 12 {:.0})" text-anchor="middle">{}</text>"#,
        scale.top + scale.height / 2.0,
        scale.top + scale.height / 2.0,
        escape(y_label)
    );
}

fn triangle(out: &mut String, x: f64, y: f64, up: bool, fill: &str) {
    let d = if up { 7.0 } else { -7.0 };
    let _ = writeln!(
        out,
        r#"  <polygon points="{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}" fill="{}" stroke="black" stroke-width="0.6"/>"#,
        x,
        y - d,
        x - 6.0,
        y + d,
        x + 6.0,
        y + d,
        fill
    );
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render the whole chart as one SVG document.
pub fn render_chart(result: &BacktestResult, options: ChartOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">"#,
        WIDTH, HEIGHT, WIDTH, HEIGHT
    );
    let _ = writeln!(out, r#"  <rect width="100%" height="100%" fill="white"/>"#);

    if result.signals.is_empty() {
        let _ = writeln!(
            out,
            r#"  <text x="{:.0}" y="{:.0}" text-anchor="middle">No data available.</text>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
        out.push_str("</svg>\n");
        return out;
    }

    render_equity_panel(&mut out, result, options.log_scale);
    render_price_panel(&mut out, result, options.show_ml);

    out.push_str("</svg>\n");
    out
}

fn render_equity_panel(out: &mut String, result: &BacktestResult, log_scale: bool) {
    let equity = result.simulation.equity();
    let benchmark = result.benchmark.equity();

    let mut log = log_scale;
    if log && equity.iter().chain(&benchmark).any(|&v| v <= 0.0) {
        warn!("log scale requested but equity has non-positive values; using linear scale");
        log = false;
    }

    let scale = Scale::fit(equity.iter().chain(&benchmark), log, PADDING, PANEL_HEIGHT);
    axes(
        out,
        &scale,
        &format!("Strategy Performance vs Benchmark - {}", result.ticker),
        "Equity ($)",
    );
    polyline(out, &benchmark, &scale, r#"stroke="green" stroke-width="2.5" opacity="0.9""#);
    polyline(out, &equity, &scale, r#"stroke="blue" stroke-width="2.5""#);
    let _ = writeln!(
        out,
        r#"  <text x="{:.0}" y="{:.0}" font-size="11" fill="blue">Equity Curve</text>"#,
        PADDING + 10.0,
        PADDING + 14.0
    );
    let _ = writeln!(
        out,
        r#"  <text x="{:.0}" y="{:.0}" font-size="11" fill="green">Buy &amp; Hold</text>"#,
        PADDING + 10.0,
        PADDING + 28.0
    );
}

fn render_price_panel(out: &mut String, result: &BacktestResult, show_ml: bool) {
    let signals = &result.signals;
    let n = signals.len();
    let closes: Vec<f64> = signals.iter().map(|r| r.close).collect();
    let top = 2.0 * PADDING + PANEL_HEIGHT + PADDING;
    let scale = Scale::fit(closes.iter(), false, top, PANEL_HEIGHT);

    axes(
        out,
        &scale,
        &format!("Trading Signals on Price Curve - {}", result.ticker),
        "Stock Price ($)",
    );

    if show_ml {
        let bottom = top + PANEL_HEIGHT;
        let mut points = vec![format!("{:.1},{:.1}", x_at(0, n), bottom)];
        points.extend(signals.iter().enumerate().map(|(i, r)| {
            let conf = r.ml_confidence.clamp(0.0, 1.0);
            format!("{:.1},{:.1}", x_at(i, n), bottom - conf * PANEL_HEIGHT)
        }));
        points.push(format!("{:.1},{:.1}", x_at(n - 1, n), bottom));
        let _ = writeln!(
            out,
            r#"  <polygon class="ml-confidence" fill="mediumpurple" opacity="0.3" points="{}"/>"#,
            points.join(" ")
        );
        for (frac, label) in [(0.0, "0"), (1.0, "1")] {
            let _ = writeln!(
                out,
                r#"  <text x="{:.0}" y="{:.1}" font-size="10">{}</text>"#,
                WIDTH - PADDING + 4.0,
                bottom - frac * PANEL_HEIGHT,
                label
            );
        }
    }

    polyline(
        out,
        &closes,
        &scale,
        r#"stroke="saddlebrown" stroke-width="1.2" opacity="0.85""#,
    );

    for (i, record) in signals.iter().enumerate() {
        let (x, y) = (x_at(i, n), scale.y(record.close));
        if record.is_buy_edge() {
            triangle(out, x, y, true, "limegreen");
        } else if record.is_sell_edge() {
            triangle(out, x, y, false, "red");
        }
    }

    if show_ml {
        for (i, pair) in signals.windows(2).enumerate() {
            let (x, y) = (x_at(i + 1, n), scale.y(pair[1].close));
            match (pair[0].ml_signal, pair[1].ml_signal) {
                (0, 1) => {
                    let _ = writeln!(
                        out,
                        r#"  <circle class="ml-buy" cx="{:.1}" cy="{:.1}" r="5" fill="purple" stroke="white"/>"#,
                        x, y
                    );
                }
                (1, 0) => {
                    let _ = writeln!(
                        out,
                        r#"  <path class="ml-sell" d="M{:.1},{:.1} l8,8 m0,-8 l-8,8" stroke="black" stroke-width="1.2"/>"#,
                        x - 4.0,
                        y - 4.0
                    );
                }
                _ => {}
            }
        }
    }
}

pub struct SvgChartWriter {
    path: PathBuf,
    options: ChartOptions,
}

impl SvgChartWriter {
    pub fn new(path: PathBuf, options: ChartOptions) -> Self {
        Self { path, options }
    }
}

impl ResultSink for SvgChartWriter {
    fn write(&self, result: &BacktestResult) -> Result<(), CrosstraderError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, render_chart(result, self.options))?;
        info!("chart written to {}", self.path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "svg"
    }
}

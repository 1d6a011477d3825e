//! Executed fills and round-trip trades.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub side: Side,
    pub shares: u64,
    pub price: f64,
    pub fee: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.shares as f64 * self.price
    }
}

/// A buy fill closed by the following sell fill.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub shares: u64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net of the entry and exit fees.
    pub pnl: f64,
}

impl RoundTrip {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

/// Pair each buy with the next sell. A trailing buy with no exit is an
/// open position and produces no round trip.
pub fn pair_round_trips(fills: &[Fill]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<&Fill> = None;

    for fill in fills {
        match (fill.side, open) {
            (Side::Buy, None) => open = Some(fill),
            (Side::Sell, Some(entry)) => {
                trips.push(RoundTrip {
                    shares: entry.shares,
                    entry_date: entry.date,
                    exit_date: fill.date,
                    entry_price: entry.price,
                    exit_price: fill.price,
                    pnl: fill.notional() - entry.notional() - entry.fee - fill.fee,
                });
                open = None;
            }
            // The simulator never emits these; skip rather than guess.
            (Side::Buy, Some(_)) | (Side::Sell, None) => {}
        }
    }

    trips
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(day: u32, side: Side, shares: u64, price: f64) -> Fill {
        Fill {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            side,
            shares,
            price,
            fee: 5.0,
        }
    }

    #[test]
    fn pairs_buy_with_following_sell() {
        let trips = pair_round_trips(&[fill(2, Side::Buy, 100, 10.0), fill(9, Side::Sell, 100, 20.0)]);
        assert_eq!(trips.len(), 1);
        let trip = &trips[0];
        assert_eq!(trip.shares, 100);
        assert!((trip.pnl - 990.0).abs() < 1e-9);
        assert_eq!(trip.holding_days(), 7);
    }

    #[test]
    fn open_position_is_not_a_round_trip() {
        let trips = pair_round_trips(&[
            fill(1, Side::Buy, 10, 10.0),
            fill(2, Side::Sell, 10, 9.0),
            fill(3, Side::Buy, 10, 8.0),
        ]);
        assert_eq!(trips.len(), 1);
        assert!((trips[0].pnl - (-20.0)).abs() < 1e-9);
    }

    #[test]
    fn notional() {
        assert!((fill(1, Side::Buy, 3, 2.5).notional() - 7.5).abs() < f64::EPSILON);
    }
}

//! Trade execution against a cash balance.
//!
//! Long only, whole shares, flat fee per fill. Cash never goes below zero:
//! a buy is sized so that cost plus fee fits, and a sale's fee is capped at
//! what the sale leaves in the account.

use chrono::NaiveDate;

use super::position::{Fill, Side};

/// Cash and share count carried from bar to bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub shares: u64,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            cash: initial_capital,
            shares: 0,
        }
    }

    pub fn holdings(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    pub fn is_flat(&self) -> bool {
        self.shares == 0
    }
}

/// Largest share count whose cost plus `fee` fits in `cash`.
///
/// Starts from floor(cash / price); only when the fee does not fit beside
/// that many shares is the count reduced.
pub fn affordable_shares(cash: f64, price: f64, fee: f64) -> u64 {
    if !price.is_finite() || price <= 0.0 || cash.is_nan() || cash <= 0.0 {
        return 0;
    }

    let mut shares = (cash / price).floor() as u64;
    if shares > 0 && shares as f64 * price + fee > cash {
        shares = if cash > fee {
            ((cash - fee) / price).floor() as u64
        } else {
            0
        };
    }
    // Float rounding in the divisions above can overshoot by a share.
    while shares > 0 && shares as f64 * price + fee > cash {
        shares -= 1;
    }
    shares
}

/// Buy as many shares as the account affords. `None` when not even one
/// share fits; that is a no-op, not an error.
///
/// The fee counts against the budget: $1000 at $10 with a $5 fee buys 99
/// shares and leaves $5, not 100 shares and -$5.
pub fn buy(account: Account, date: NaiveDate, price: f64, fee: f64) -> (Account, Option<Fill>) {
    let shares = affordable_shares(account.cash, price, fee);
    if shares == 0 {
        return (account, None);
    }

    let cost = shares as f64 * price + fee;
    let next = Account {
        cash: account.cash - cost,
        shares: account.shares + shares,
    };
    let fill = Fill {
        date,
        side: Side::Buy,
        shares,
        price,
        fee,
    };
    (next, Some(fill))
}

/// Sell the whole position. `None` when flat.
pub fn sell_all(account: Account, date: NaiveDate, price: f64, fee: f64) -> (Account, Option<Fill>) {
    if account.is_flat() {
        return (account, None);
    }

    let gross = account.cash + account.holdings(price);
    let fee = fee.min(gross.max(0.0));
    let next = Account {
        cash: gross - fee,
        shares: 0,
    };
    let fill = Fill {
        date,
        side: Side::Sell,
        shares: account.shares,
        price,
        fee,
    };
    (next, Some(fill))
}

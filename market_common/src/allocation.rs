//! Three-bucket allocation split and its monetary valuation.
//!
//! A balance is partitioned into trading, locked (collateral) and referral
//! capital. Editing one bucket is absorbed by exactly one other bucket:
//!
//! - editing `trading` moves the difference into `locked`;
//! - editing `locked` or `referral` moves the difference into `trading`.
//!
//! `referral` never absorbs anything. The absorbing bucket is floored at zero,
//! so the total can drift away from 100 (e.g. 10/20/70 with `locked` set to 50
//! gives 0/50/70). That drift is kept as-is; `AllocationSplit::is_balanced`
//! reports it.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::MarketError;
use crate::format::format_grouped;

/// Slider upper bound.
pub const MAX_PERCENT: u16 = 100;
/// Account balance shown on the dashboard, in KES.
pub const DEFAULT_BALANCE_KES: f64 = 6_850_200.0;
/// Fixed conversion rate, KES per USD.
pub const KES_PER_USD: f64 = 130.50;

/// One of the three allocation buckets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Bucket {
    /// Capital available for trading.
    Trading,
    /// Capital locked as loan collateral.
    #[value(alias = "collateral")]
    #[strum(to_string = "locked", serialize = "collateral")]
    Locked,
    /// Capital earned through referrals.
    Referral,
}

impl Bucket {
    /// All buckets in display order.
    pub const ALL: [Bucket; 3] = [Bucket::Trading, Bucket::Locked, Bucket::Referral];

    /// Label used on the account screen.
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Trading => "Trading",
            Bucket::Locked => "Collateral",
            Bucket::Referral => "Referrals",
        }
    }
}

/// Percentage split of a balance across the three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSplit {
    /// Trading share in percent.
    pub trading: u16,
    /// Locked share in percent.
    pub locked: u16,
    /// Referral share in percent.
    pub referral: u16,
}

impl Default for AllocationSplit {
    fn default() -> Self {
        Self {
            trading: 70,
            locked: 20,
            referral: 10,
        }
    }
}

impl AllocationSplit {
    /// Creates a split from explicit shares.
    pub fn new(trading: u16, locked: u16, referral: u16) -> Self {
        Self {
            trading,
            locked,
            referral,
        }
    }

    /// Share of `bucket` in percent.
    pub fn get(&self, bucket: Bucket) -> u16 {
        match bucket {
            Bucket::Trading => self.trading,
            Bucket::Locked => self.locked,
            Bucket::Referral => self.referral,
        }
    }

    fn slot(&mut self, bucket: Bucket) -> &mut u16 {
        match bucket {
            Bucket::Trading => &mut self.trading,
            Bucket::Locked => &mut self.locked,
            Bucket::Referral => &mut self.referral,
        }
    }

    /// Sum of all three shares.
    pub fn total(&self) -> u32 {
        u32::from(self.trading) + u32::from(self.locked) + u32::from(self.referral)
    }

    /// True while the shares add up to exactly 100.
    pub fn is_balanced(&self) -> bool {
        self.total() == u32::from(MAX_PERCENT)
    }

    /// Sets `key` to `new_value` and absorbs the difference; see [`set_bucket`].
    pub fn with_bucket(self, key: Bucket, new_value: u16) -> Self {
        set_bucket(self, key, new_value)
    }
}

/// Sets one bucket and rebalances.
///
/// `new_value` is clamped to the slider range `0..=100`. The absorbing bucket is
/// `locked` when `key` is `trading` and `trading` otherwise; it moves by the
/// opposite of the edit and never goes below zero. The third bucket is untouched.
pub fn set_bucket(current: AllocationSplit, key: Bucket, new_value: u16) -> AllocationSplit {
    let new_value = new_value.min(MAX_PERCENT);
    let delta = i32::from(new_value) - i32::from(current.get(key));
    let absorber = match key {
        Bucket::Trading => Bucket::Locked,
        Bucket::Locked | Bucket::Referral => Bucket::Trading,
    };

    let mut next = current;
    *next.slot(key) = new_value;
    let absorbed = (i32::from(current.get(absorber)) - delta).clamp(0, i32::from(u16::MAX));
    *next.slot(absorber) = absorbed as u16;
    next
}

/// A single `bucket=value` edit, as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketEdit {
    /// Bucket to change.
    pub bucket: Bucket,
    /// New share in percent, `0..=100`.
    pub value: u16,
}

impl std::str::FromStr for BucketEdit {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| MarketError::Format(format!("expected bucket=value, got {:?}", s)))?;
        let bucket = name
            .trim()
            .parse::<Bucket>()
            .map_err(|e| MarketError::Format(format!("unknown bucket {:?}: {}", name, e)))?;
        let value = value
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|v| *v <= MAX_PERCENT)
            .ok_or_else(|| MarketError::Format(format!("percentage out of range: {:?}", value)))?;
        Ok(BucketEdit { bucket, value })
    }
}

/// Display currency for money amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
pub enum Currency {
    /// Kenyan shilling, the account's base currency.
    #[default]
    #[strum(serialize = "KES")]
    Kes,
    /// US dollar, converted at the fixed rate.
    #[strum(serialize = "USD")]
    Usd,
}

/// Converts bucket shares into money amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    /// Total balance in KES.
    pub total_balance: f64,
    /// KES per USD.
    pub rate: f64,
}

impl Default for Valuation {
    fn default() -> Self {
        Self {
            total_balance: DEFAULT_BALANCE_KES,
            rate: KES_PER_USD,
        }
    }
}

impl Valuation {
    /// Amount held in `bucket`, in KES: `total_balance * share / 100`.
    pub fn amount(&self, split: &AllocationSplit, bucket: Bucket) -> f64 {
        self.total_balance * f64::from(split.get(bucket)) / 100.0
    }

    /// Amounts of every bucket in display order.
    pub fn breakdown(&self, split: &AllocationSplit) -> [(Bucket, f64); 3] {
        Bucket::ALL.map(|bucket| (bucket, self.amount(split, bucket)))
    }

    /// Renders a KES amount in `currency`.
    ///
    /// KES has no decimals (`KES 4,795,140`), USD is converted and keeps two
    /// (`$36,744.37`).
    pub fn display(&self, amount_kes: f64, currency: Currency) -> String {
        match currency {
            Currency::Kes => format!("KES {}", format_grouped(amount_kes, 0)),
            Currency::Usd => format!("${}", format_grouped(amount_kes / self.rate, 2)),
        }
    }
}

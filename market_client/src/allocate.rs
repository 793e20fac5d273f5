//! `allocate` action: apply slider edits to a split and print the money breakdown.

use log::{info, warn};
use market_common::allocation::{AllocationSplit, Valuation, set_bucket};
use market_common::{MarketError, Result};

use crate::args::AllocateArgs;

/// Applies every `--set` edit in order and returns the final split.
pub fn apply_edits(args: &AllocateArgs) -> AllocationSplit {
    let start = AllocationSplit::new(args.trading, args.locked, args.referral);
    if !start.is_balanced() {
        warn!("Starting split totals {}%", start.total());
    }
    args.edits.iter().fold(start, |split, edit| {
        let next = set_bucket(split, edit.bucket, edit.value);
        info!(
            "{}={} -> trading {}% / locked {}% / referral {}%",
            edit.bucket, edit.value, next.trading, next.locked, next.referral
        );
        next
    })
}

/// Runs the `allocate` action.
pub fn run(args: AllocateArgs) -> Result<()> {
    if !(args.rate.is_finite() && args.rate > 0.0) {
        return Err(MarketError::Format(format!("rate must be positive, got {}", args.rate)));
    }
    if !(args.balance.is_finite() && args.balance >= 0.0) {
        return Err(MarketError::Format(format!(
            "balance must be non-negative, got {}",
            args.balance
        )));
    }

    let split = apply_edits(&args);
    let valuation = Valuation {
        total_balance: args.balance,
        rate: args.rate,
    };

    if args.json {
        println!("{}", serde_json::to_string(&split)?);
    }
    info!("Total balance: {}", valuation.display(args.balance, args.currency));
    for (bucket, amount) in valuation.breakdown(&split) {
        info!(
            "{:<11} {:>3}%  {}",
            bucket.label(),
            split.get(bucket),
            valuation.display(amount, args.currency)
        );
    }
    if !split.is_balanced() {
        warn!("Allocation totals {}% after clamping", split.total());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Args, Command};
    use clap::Parser;

    fn allocate_args(argv: &[&str]) -> AllocateArgs {
        let mut full = vec!["market_client", "allocate"];
        full.extend_from_slice(argv);
        match Args::parse_from(full).command {
            Command::Allocate(args) => args,
            Command::Watch(_) => panic!("parsed the wrong action"),
        }
    }

    #[test]
    fn edits_apply_in_order() {
        let args = allocate_args(&["--set", "referral=25", "--set", "trading=90"]);
        // 70/20/10 -> 55/20/25 -> 90/0/25
        assert_eq!(apply_edits(&args), AllocationSplit::new(90, 0, 25));
    }

    #[test]
    fn explicit_start_and_alias() {
        let args = allocate_args(&[
            "--trading", "10", "--locked", "20", "--referral", "70", "--set", "collateral=50",
        ]);
        let split = apply_edits(&args);
        assert_eq!(split, AllocationSplit::new(0, 50, 70));
        assert_eq!(split.total(), 120);
    }

    #[test]
    fn out_of_range_values_are_rejected_by_the_parser() {
        let argv = ["market_client", "allocate", "--trading", "120"];
        assert!(Args::try_parse_from(argv).is_err());
        let argv = ["market_client", "allocate", "--set", "locked=101"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let args = allocate_args(&["--currency", "usd", "--rate", "0"]);
        assert!(matches!(run(args), Err(MarketError::Format(_))));
    }

    #[test]
    fn default_run_succeeds() {
        assert!(run(allocate_args(&["--currency", "usd"])).is_ok());
    }
}

//! Split balance calculator.
//!
//! Pure functions over a split slice. Settled splits never contribute to a
//! balance. Unparsable stored amounts count as zero.

use crate::model::amount::parse_amount;
use crate::model::split::Split;
use rust_decimal::Decimal;

/// Splits that list `friend_id` as a participant, in ledger order.
pub fn friend_splits<'a>(
    splits: &'a [Split],
    friend_id: &'a str,
) -> impl Iterator<Item = &'a Split> + 'a {
    splits.iter().filter(move |split| split.includes(friend_id))
}

/// What `friend_id` still owes: per-person shares of their unsettled splits.
pub fn friend_balance(splits: &[Split], friend_id: &str) -> Decimal {
    friend_splits(splits, friend_id)
        .filter(|split| !split.settled)
        .map(|split| amount_or_zero(&split.per_person_amount))
        .sum()
}

/// Sum of total amounts over every unsettled split.
pub fn total_outstanding(splits: &[Split]) -> Decimal {
    splits
        .iter()
        .filter(|split| !split.settled)
        .map(|split| amount_or_zero(&split.amount))
        .sum()
}

/// Unsettled splits, newest first.
pub fn active_splits(splits: &[Split]) -> Vec<&Split> {
    splits.iter().rev().filter(|split| !split.settled).collect()
}

/// Settled splits, newest first.
pub fn settled_splits(splits: &[Split]) -> Vec<&Split> {
    splits.iter().rev().filter(|split| split.settled).collect()
}

fn amount_or_zero(raw: &str) -> Decimal {
    parse_amount(raw).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::{active_splits, friend_balance, settled_splits, total_outstanding};
    use crate::model::amount::format_amount;
    use crate::model::split::{Participant, Split, SplitDraft};

    fn split(id: &str, amount: &str, friends: &[&str]) -> Split {
        Split::create(
            id.to_string(),
            "2026-01-01T00:00:00.000Z".to_string(),
            SplitDraft {
                title: format!("split {id}"),
                amount: amount.to_string(),
                participants: friends
                    .iter()
                    .map(|f| Participant {
                        id: f.to_string(),
                        name: f.to_uppercase(),
                    })
                    .collect(),
                ..SplitDraft::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn balances_sum_unsettled_shares_only() {
        let mut splits = vec![split("1", "30", &["a", "b"]), split("2", "20", &["a"])];
        assert_eq!(format_amount(friend_balance(&splits, "a")), "20.00");
        assert_eq!(format_amount(friend_balance(&splits, "b")), "10.00");
        assert_eq!(format_amount(total_outstanding(&splits)), "50.00");

        splits[1].settle("now".to_string());
        assert_eq!(format_amount(friend_balance(&splits, "a")), "10.00");
        assert_eq!(format_amount(total_outstanding(&splits)), "30.00");
        assert_eq!(format_amount(friend_balance(&splits, "stranger")), "0.00");
    }

    #[test]
    fn duplicate_participant_is_counted_per_split_once() {
        let splits = vec![split("1", "30", &["a", "a"])];
        assert_eq!(format_amount(friend_balance(&splits, "a")), "10.00");
    }

    #[test]
    fn partitions_are_newest_first() {
        let mut splits = vec![
            split("1", "3", &["a"]),
            split("2", "3", &["a"]),
            split("3", "3", &["a"]),
        ];
        splits[0].settle("now".to_string());
        let active: Vec<_> = active_splits(&splits).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(active, vec!["3", "2"]);
        let settled: Vec<_> = settled_splits(&splits).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(settled, vec!["1"]);
    }
}

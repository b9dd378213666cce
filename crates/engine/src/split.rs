//! Equal-share allocation of an expense between group members.
//!
//! The payer is one of the `n + 1` participants but never gets a split row:
//! each of the `n` other members owes `share = A / (n + 1)` rounded to the
//! cent (half away from zero) and the payer implicitly covers `A - n * share`,
//! which absorbs the rounding remainder in either direction. When rounding up
//! would leave the payer with a negative share (only for amounts of a few
//! cents) the share is truncated instead.

use crate::{EngineError, Money, ResultEngine};

/// Result of [`allocate_splits`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    /// Amount owed by every other member.
    pub share: Money,
    /// One `(member, amount_owed)` entry per other member, input order kept.
    pub splits: Vec<(i64, Money)>,
    /// What the payer covers: `amount - share * n`.
    pub payer_share: Money,
}

impl Allocation {
    pub fn total_owed(&self) -> Money {
        self.splits.iter().map(|(_, amount)| *amount).sum()
    }
}

/// Splits `amount` equally between the payer and `other_members`.
///
/// `other_members` must exclude the payer. Fails with
/// [`EngineError::NoMembersToSplit`] when nobody else is in the group and
/// with [`EngineError::InvalidAmount`] for a non-positive amount.
///
/// ```rust
/// use engine::{Money, allocate_splits};
///
/// let allocation = allocate_splits(Money::new(100_00), &[2, 3]).unwrap();
/// assert_eq!(allocation.share, Money::new(33_33));
/// assert_eq!(allocation.payer_share, Money::new(33_34));
/// ```
pub fn allocate_splits(amount: Money, other_members: &[i64]) -> ResultEngine<Allocation> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(
            "amount must be > 0".to_string(),
        ));
    }
    if other_members.is_empty() {
        return Err(EngineError::NoMembersToSplit);
    }

    let members = i64::try_from(other_members.len())
        .map_err(|_| EngineError::InvalidAmount("too many members".to_string()))?;
    let parts = members + 1;
    let floor = amount.minor() / parts;
    let rounded = if 2 * (amount.minor() % parts) >= parts {
        floor + 1
    } else {
        floor
    };

    let owed_for = |minor: i64| {
        Money::new(minor)
            .checked_mul(members)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))
    };
    let (share, owed) = match owed_for(rounded)? {
        owed if owed <= amount => (Money::new(rounded), owed),
        _ => (Money::new(floor), owed_for(floor)?),
    };

    Ok(Allocation {
        share,
        splits: other_members.iter().map(|id| (*id, share)).collect(),
        payer_share: amount - owed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_way_split_payer_absorbs_cent() {
        let allocation = allocate_splits(Money::new(100_00), &[2, 3]).unwrap();
        assert_eq!(
            allocation.splits,
            vec![(2, Money::new(33_33)), (3, Money::new(33_33))]
        );
        assert_eq!(allocation.payer_share, Money::new(33_34));
        assert_eq!(allocation.total_owed(), Money::new(66_66));
    }

    #[test]
    fn shares_round_up_and_payer_covers_less() {
        let allocation = allocate_splits(Money::new(2_00), &[2, 3]).unwrap();
        assert_eq!(
            allocation.splits,
            vec![(2, Money::new(67)), (3, Money::new(67))]
        );
        assert_eq!(allocation.payer_share, Money::new(66));
    }

    #[test]
    fn half_cent_rounds_away_from_zero() {
        // 0.05 / 2 = 0.025
        let allocation = allocate_splits(Money::new(5), &[2]).unwrap();
        assert_eq!(allocation.share, Money::new(3));
        assert_eq!(allocation.payer_share, Money::new(2));
    }

    #[test]
    fn exact_division_has_no_remainder() {
        let allocation = allocate_splits(Money::new(90_00), &[7, 8]).unwrap();
        assert_eq!(allocation.share, Money::new(30_00));
        assert_eq!(allocation.payer_share, Money::new(30_00));
    }

    #[test]
    fn share_is_cent_rounded_and_payer_never_negative() {
        for amount in [1, 7, 99, 100, 101, 200, 12_345, 1_000_003] {
            for n in 1..=9_i64 {
                let others: Vec<i64> = (0..n).collect();
                let allocation = allocate_splits(Money::new(amount), &others).unwrap();
                let rounded = (2 * amount + n + 1) / (2 * (n + 1));
                if rounded * n <= amount {
                    assert_eq!(allocation.share.minor(), rounded, "amount={amount} n={n}");
                } else {
                    assert_eq!(allocation.share.minor(), amount / (n + 1));
                }
                assert!(allocation.payer_share.minor() >= 0, "amount={amount} n={n}");
                assert_eq!(
                    allocation.total_owed() + allocation.payer_share,
                    Money::new(amount)
                );
            }
        }
    }

    #[test]
    fn tiny_amount_yields_zero_shares() {
        let allocation = allocate_splits(Money::new(2), &[2, 3, 4]).unwrap();
        assert_eq!(allocation.share, Money::ZERO);
        assert_eq!(allocation.payer_share, Money::new(2));

        // 0.01 / 3 rounds down on its own.
        let allocation = allocate_splits(Money::new(1), &[2, 3]).unwrap();
        assert_eq!(allocation.share, Money::ZERO);
        assert_eq!(allocation.payer_share, Money::new(1));
    }

    #[test]
    fn rejects_empty_group_and_bad_amount() {
        assert_eq!(
            allocate_splits(Money::new(100), &[]),
            Err(EngineError::NoMembersToSplit)
        );
        assert!(matches!(
            allocate_splits(Money::ZERO, &[2]),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            allocate_splits(Money::new(-5), &[2]),
            Err(EngineError::InvalidAmount(_))
        ));
    }
}

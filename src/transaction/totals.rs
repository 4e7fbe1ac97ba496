use serde::Serialize;

use crate::{category::TransactionKind, money::Money, transaction::TransactionRecord};

/// Income, expenses and their difference over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// The sum of income amounts.
    pub income: Money,
    /// The sum of expense amounts.
    pub expense: Money,
    /// Income minus expenses.
    pub net: Money,
}

impl Totals {
    /// Add up `records`.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TransactionRecord>) -> Self {
        let (income, expense) = records.into_iter().fold(
            (Money::ZERO, Money::ZERO),
            |(income, expense), record| match record.kind {
                TransactionKind::Income => (income + record.amount, expense),
                TransactionKind::Expense => (income, expense + record.amount),
            },
        );

        Self {
            income,
            expense,
            net: income - expense,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::{OffsetDateTime, macros::date};

    use crate::{
        UserID,
        category::{Category, TransactionKind},
        money::Money,
        transaction::{Totals, TransactionForm, TransactionRecord},
    };

    fn record(id: i64, kind: TransactionKind, minor_units: i64) -> TransactionRecord {
        let category = match kind {
            TransactionKind::Income => Category::Salary,
            TransactionKind::Expense => Category::Bills,
        };

        TransactionRecord {
            id,
            owner_id: UserID::new(1),
            date: date!(2025 - 02 - 01),
            kind,
            category,
            amount: Money::from_minor_units(minor_units),
            notes: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(
            Totals::from_records(&Vec::<TransactionRecord>::new()),
            Totals::default()
        );
    }

    #[test]
    fn sums_by_kind() {
        let records = [
            record(1, TransactionKind::Income, 100_000),
            record(2, TransactionKind::Expense, 2_550),
            record(3, TransactionKind::Expense, 10),
            record(4, TransactionKind::Income, 20),
        ];

        let totals = Totals::from_records(&records);

        assert_eq!(totals.income, Money::from_minor_units(100_020));
        assert_eq!(totals.expense, Money::from_minor_units(2_560));
        assert_eq!(totals.net, Money::from_minor_units(97_460));
    }

    #[test]
    fn net_can_be_negative() {
        let records = [
            record(1, TransactionKind::Income, 500),
            record(2, TransactionKind::Expense, 1_500),
        ];

        assert_eq!(
            Totals::from_records(&records).net,
            Money::from_minor_units(-1_000)
        );
    }

    #[test]
    fn removing_a_record_recomputes_exactly() {
        let mut records = vec![
            record(1, TransactionKind::Expense, 10),
            record(2, TransactionKind::Expense, 20),
            record(3, TransactionKind::Expense, 30),
        ];
        let before = Totals::from_records(&records);

        records.retain(|record| record.id != 2);
        let after = Totals::from_records(&records);

        assert_eq!(before.expense, Money::from_minor_units(60));
        assert_eq!(after.expense, Money::from_minor_units(40));
    }

    #[test]
    fn largest_valid_amounts_add_up_exactly() {
        let validated = TransactionForm {
            date: "2025-02-01".to_owned(),
            kind: TransactionKind::Income,
            category: "Salary".to_owned(),
            amount: "1000000000".to_owned(),
            notes: String::new(),
        }
        .validate()
        .unwrap();
        let records: Vec<_> = (1..=10_000)
            .map(|id| record(id, TransactionKind::Income, validated.amount.minor_units()))
            .collect();

        let totals = Totals::from_records(&records);

        assert_eq!(
            totals.income,
            Money::from_minor_units(1_000_000_000_000_000)
        );
        assert_eq!(totals.net, totals.income);
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let records = [
            record(1, TransactionKind::Income, i64::MAX),
            record(2, TransactionKind::Income, i64::MAX),
            record(3, TransactionKind::Expense, i64::MAX),
            record(4, TransactionKind::Expense, i64::MAX),
        ];

        let totals = Totals::from_records(&records);

        assert_eq!(totals.income, Money::from_minor_units(i64::MAX));
        assert_eq!(totals.net, Money::ZERO);
    }
}

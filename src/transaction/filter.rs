//! Search and filter criteria for the transactions list.

use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    category::{Category, TransactionKind},
    transaction::{TransactionRecord, core::parse_date},
};

/// Which kinds of transaction to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindFilter {
    /// Show income and expenses.
    #[default]
    All,
    /// Show only transactions of this kind.
    Only(TransactionKind),
}

impl KindFilter {
    fn matches(&self, kind: TransactionKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(wanted) => *wanted == kind,
        }
    }
}

/// Which categories to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Show every category.
    #[default]
    All,
    /// Show only transactions in this category.
    Only(Category),
}

impl CategoryFilter {
    fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == category,
        }
    }
}

/// The criteria a transaction must meet to be shown.
///
/// A transaction is shown only if it passes every criterion. The default
/// filter shows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Text to look for in the category name or notes, ignoring case.
    pub search_term: Option<String>,
    /// The kind of transaction to show.
    pub kind: KindFilter,
    /// The category to show.
    pub category: CategoryFilter,
    /// The earliest date to show, inclusive.
    pub start_date: Option<Date>,
    /// The latest date to show, inclusive.
    pub end_date: Option<Date>,
}

impl TransactionFilter {
    /// Return the filter to its defaults, showing everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the filter lets every transaction through.
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
            && self.kind == KindFilter::All
            && self.category == CategoryFilter::All
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// The transactions in `records` that pass the filter, in their original order.
    pub fn apply<'a>(&self, records: &'a [TransactionRecord]) -> Vec<&'a TransactionRecord> {
        let needle = self.search_term().map(str::to_lowercase);

        records
            .iter()
            .filter(|record| self.matches(record, needle.as_deref()))
            .collect()
    }

    fn search_term(&self) -> Option<&str> {
        self.search_term
            .as_deref()
            .filter(|term| !term.is_empty())
    }

    fn matches(&self, record: &TransactionRecord, needle: Option<&str>) -> bool {
        let matches_search = needle.is_none_or(|needle| {
            record.category.name().to_lowercase().contains(needle)
                || record.notes_or_empty().to_lowercase().contains(needle)
        });

        matches_search
            && self.kind.matches(record.kind)
            && self.category.matches(record.category)
            && self.start_date.is_none_or(|start| record.date >= start)
            && self.end_date.is_none_or(|end| record.date <= end)
    }
}

/// The filter as it arrives in a query string.
///
/// Empty values and "all" mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransactionFilterQuery {
    /// Text to search for.
    pub search: Option<String>,
    /// "income", "expense" or "all".
    pub kind: Option<String>,
    /// A category name or "all".
    pub category: Option<String>,
    /// The earliest date as `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// The latest date as `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_query_date(value: &Option<String>) -> Result<Option<Date>, Error> {
    non_empty(value)
        .map(|text| parse_date(text).ok_or_else(|| Error::InvalidDate(text.to_owned())))
        .transpose()
}

impl TryFrom<TransactionFilterQuery> for TransactionFilter {
    type Error = Error;

    fn try_from(query: TransactionFilterQuery) -> Result<Self, Self::Error> {
        let kind = match non_empty(&query.kind) {
            None | Some("all") => KindFilter::All,
            Some(kind) => KindFilter::Only(kind.parse()?),
        };

        let category = match non_empty(&query.category) {
            None | Some("all") => CategoryFilter::All,
            Some(category) => CategoryFilter::Only(category.parse()?),
        };

        Ok(Self {
            search_term: query.search.filter(|term| !term.is_empty()),
            kind,
            category,
            start_date: parse_query_date(&query.start_date)?,
            end_date: parse_query_date(&query.end_date)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::{Date, OffsetDateTime, macros::date};

    use crate::{
        Error, UserID,
        category::{Category, TransactionKind},
        money::Money,
        transaction::{
            CategoryFilter, KindFilter, TransactionFilter, TransactionFilterQuery,
            TransactionRecord,
        },
    };

    fn record(
        id: i64,
        date: Date,
        kind: TransactionKind,
        category: Category,
        notes: Option<&str>,
    ) -> TransactionRecord {
        TransactionRecord {
            id,
            owner_id: UserID::new(1),
            date,
            kind,
            category,
            amount: Money::from_minor_units(1000),
            notes: notes.map(str::to_owned),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn sample_records() -> Vec<TransactionRecord> {
        vec![
            record(
                4,
                date!(2025 - 01 - 31),
                TransactionKind::Income,
                Category::Salary,
                Some("January pay"),
            ),
            record(
                3,
                date!(2025 - 01 - 20),
                TransactionKind::Expense,
                Category::Food,
                Some("Groceries at SM"),
            ),
            record(
                2,
                date!(2025 - 01 - 15),
                TransactionKind::Expense,
                Category::Transport,
                None,
            ),
            record(
                1,
                date!(2025 - 01 - 01),
                TransactionKind::Expense,
                Category::Food,
                Some("New year lunch"),
            ),
        ]
    }

    fn ids(records: &[&TransactionRecord]) -> Vec<i64> {
        records.iter().map(|record| record.id).collect()
    }

    #[test]
    fn default_filter_is_identity() {
        let records = sample_records();
        let filter = TransactionFilter::default();

        let got = filter.apply(&records);

        assert!(filter.is_empty());
        assert_eq!(ids(&got), [4, 3, 2, 1]);
    }

    #[test]
    fn empty_search_term_is_inactive() {
        let records = sample_records();
        let filter = TransactionFilter {
            search_term: Some(String::new()),
            ..Default::default()
        };

        assert!(filter.is_empty());
        assert_eq!(ids(&filter.apply(&records)), [4, 3, 2, 1]);
    }

    #[test]
    fn criteria_are_combined_with_and() {
        let records = sample_records();
        let filter = TransactionFilter {
            kind: KindFilter::Only(TransactionKind::Expense),
            category: CategoryFilter::Only(Category::Food),
            start_date: Some(date!(2025 - 01 - 10)),
            ..Default::default()
        };

        assert_eq!(ids(&filter.apply(&records)), [3]);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let records = sample_records();
        let filter = TransactionFilter {
            start_date: Some(date!(2025 - 01 - 15)),
            end_date: Some(date!(2025 - 01 - 20)),
            ..Default::default()
        };

        assert_eq!(ids(&filter.apply(&records)), [3, 2]);
    }

    #[test]
    fn dates_one_day_outside_bounds_are_excluded() {
        let records = vec![
            record(
                12,
                date!(2025 - 01 - 21),
                TransactionKind::Expense,
                Category::Food,
                None,
            ),
            record(
                11,
                date!(2025 - 01 - 20),
                TransactionKind::Expense,
                Category::Food,
                None,
            ),
            record(
                10,
                date!(2025 - 01 - 15),
                TransactionKind::Expense,
                Category::Food,
                None,
            ),
            record(
                9,
                date!(2025 - 01 - 14),
                TransactionKind::Expense,
                Category::Food,
                None,
            ),
        ];
        let filter = TransactionFilter {
            start_date: Some(date!(2025 - 01 - 15)),
            end_date: Some(date!(2025 - 01 - 20)),
            ..Default::default()
        };

        assert_eq!(ids(&filter.apply(&records)), [11, 10]);
    }

    #[test]
    fn search_ignores_case() {
        let records = sample_records();

        for term in ["food", "FOOD", "FoOd", "FOO"] {
            let filter = TransactionFilter {
                search_term: Some(term.to_owned()),
                ..Default::default()
            };

            assert_eq!(
                ids(&filter.apply(&records)),
                [3, 1],
                "searching for {term:?}"
            );
        }
    }

    #[test]
    fn search_matches_notes() {
        let records = sample_records();
        let filter = TransactionFilter {
            search_term: Some("sm".to_owned()),
            ..Default::default()
        };

        assert_eq!(ids(&filter.apply(&records)), [3]);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut filter = TransactionFilter {
            search_term: Some("pay".to_owned()),
            kind: KindFilter::Only(TransactionKind::Income),
            category: CategoryFilter::Only(Category::Salary),
            start_date: Some(date!(2025 - 01 - 01)),
            end_date: Some(date!(2025 - 01 - 31)),
        };

        filter.reset();

        assert_eq!(filter, TransactionFilter::default());
    }

    #[test]
    fn query_all_means_no_filter() {
        let query = TransactionFilterQuery {
            search: Some(String::new()),
            kind: Some("all".to_owned()),
            category: Some("all".to_owned()),
            start_date: Some(String::new()),
            end_date: None,
        };

        assert_eq!(
            TransactionFilter::try_from(query),
            Ok(TransactionFilter::default())
        );
    }

    #[test]
    fn query_parses_criteria() {
        let query = TransactionFilterQuery {
            search: Some("lunch".to_owned()),
            kind: Some("expense".to_owned()),
            category: Some("Other Expense".to_owned()),
            start_date: Some("2025-01-01".to_owned()),
            end_date: Some("2025-01-31".to_owned()),
        };

        assert_eq!(
            TransactionFilter::try_from(query),
            Ok(TransactionFilter {
                search_term: Some("lunch".to_owned()),
                kind: KindFilter::Only(TransactionKind::Expense),
                category: CategoryFilter::Only(Category::OtherExpense),
                start_date: Some(date!(2025 - 01 - 01)),
                end_date: Some(date!(2025 - 01 - 31)),
            })
        );
    }

    #[test]
    fn query_rejects_bad_values() {
        let bad_date = TransactionFilterQuery {
            start_date: Some("01/01/2025".to_owned()),
            ..Default::default()
        };
        let bad_category = TransactionFilterQuery {
            category: Some("Rent".to_owned()),
            ..Default::default()
        };

        assert_eq!(
            TransactionFilter::try_from(bad_date),
            Err(Error::InvalidDate("01/01/2025".to_owned()))
        );
        assert_eq!(
            TransactionFilter::try_from(bad_category),
            Err(Error::UnknownCategory("Rent".to_owned()))
        );
    }
}

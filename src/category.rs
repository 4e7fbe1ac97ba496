//! The fixed category taxonomy that every transaction is labelled with.
//!
//! Each category belongs to exactly one [TransactionKind]. The list is static
//! and never changes at runtime.

use std::{fmt::Display, str::FromStr};

use axum::{Json, extract::Query};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Whether money was earned or spent.
///
/// New transactions are expenses unless the user says otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned, e.g. a salary payment.
    Income,
    /// Money spent, e.g. groceries.
    #[default]
    Expense,
}

impl TransactionKind {
    /// The lowercase name used on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(Error::UnknownTransactionKind(other.to_owned())),
        }
    }
}

/// A category from the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Wages from an employer.
    Salary,
    /// Income from contract or gig work.
    Freelance,
    /// Dividends, interest and investment gains.
    Investments,
    /// Income that fits no other category.
    #[serde(rename = "Other Income")]
    OtherIncome,
    /// Groceries and eating out.
    Food,
    /// Fares, fuel and other travel costs.
    Transport,
    /// Utilities, rent and other recurring bills.
    Bills,
    /// Going out, hobbies and subscriptions.
    Entertainment,
    /// Medical costs.
    Health,
    /// Clothes and other purchases.
    Shopping,
    /// Tuition, books and courses.
    Education,
    /// Expenses that fit no other category.
    #[serde(rename = "Other Expense")]
    OtherExpense,
}

impl Category {
    /// Every category in display order, income categories first.
    pub const ALL: [Category; 12] = [
        Category::Salary,
        Category::Freelance,
        Category::Investments,
        Category::OtherIncome,
        Category::Food,
        Category::Transport,
        Category::Bills,
        Category::Entertainment,
        Category::Health,
        Category::Shopping,
        Category::Education,
        Category::OtherExpense,
    ];

    /// The display name of the category, e.g. "Other Income".
    pub fn name(&self) -> &'static str {
        match self {
            Category::Salary => "Salary",
            Category::Freelance => "Freelance",
            Category::Investments => "Investments",
            Category::OtherIncome => "Other Income",
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Bills => "Bills",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Shopping => "Shopping",
            Category::Education => "Education",
            Category::OtherExpense => "Other Expense",
        }
    }

    /// The kind of transaction this category may be attached to.
    pub fn kind(&self) -> TransactionKind {
        match self {
            Category::Salary
            | Category::Freelance
            | Category::Investments
            | Category::OtherIncome => TransactionKind::Income,
            _ => TransactionKind::Expense,
        }
    }

    /// The categories that may be attached to a transaction of `kind`.
    pub fn for_kind(kind: TransactionKind) -> impl Iterator<Item = Category> {
        Self::ALL
            .into_iter()
            .filter(move |category| category.kind() == kind)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Parse a category from its exact display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_owned()))
    }
}

// ============================================================================
// DATABASE MAPPING
// ============================================================================

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.name()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

// ============================================================================
// ENDPOINT
// ============================================================================

/// Query parameters for listing categories.
#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    /// Only list categories for this kind of transaction.
    pub kind: Option<TransactionKind>,
}

/// A taxonomy entry as sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// The category, serialized as its display name.
    pub name: Category,
    /// Whether the category is for income or expenses.
    pub kind: TransactionKind,
}

/// A route handler that lists the taxonomy, optionally restricted to one kind.
pub async fn get_categories_endpoint(
    Query(query): Query<CategoriesQuery>,
) -> Json<Vec<CategoryEntry>> {
    let entries = Category::ALL
        .into_iter()
        .filter(|category| query.kind.is_none_or(|kind| category.kind() == kind))
        .map(|category| CategoryEntry {
            name: category,
            kind: category.kind(),
        })
        .collect();

    Json(entries)
}

//! The create/edit transaction form: raw input, validation and the save lifecycle.

use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error, UserID,
    category::{Category, TransactionKind},
    money::Money,
    transaction::{
        NewTransaction, TransactionId, TransactionRecord, TransactionService, TransactionUpdate,
        core::parse_date,
    },
};

/// Why a transaction form was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// One or more of the required fields were left blank.
    #[error("Date, category, and amount are required.")]
    MissingRequiredFields,
    /// The amount is not a number, or is zero or less.
    #[error("Amount must be a positive number.")]
    AmountNotPositive,
    /// The date is not a real `YYYY-MM-DD` date.
    #[error("Date must be a valid date (YYYY-MM-DD).")]
    InvalidDate,
    /// The category is not in the taxonomy.
    #[error("Unknown category: {0}.")]
    UnknownCategory(String),
    /// The category belongs to the other kind of transaction.
    #[error("{category} is not an {kind} category.")]
    CategoryKindMismatch {
        /// The chosen category.
        category: Category,
        /// The chosen kind of transaction.
        kind: TransactionKind,
    },
}

impl FormError {
    /// The form field the error is about, if it is about a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            FormError::MissingRequiredFields => None,
            FormError::AmountNotPositive => Some("amount"),
            FormError::InvalidDate => Some("date"),
            FormError::UnknownCategory(_) | FormError::CategoryKindMismatch { .. } => {
                Some("category")
            }
        }
    }
}

/// The transaction form as the user filled it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionForm {
    /// The date as `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    /// Income or expense.
    #[serde(default, alias = "type")]
    pub kind: TransactionKind,
    /// The category name.
    #[serde(default)]
    pub category: String,
    /// The amount in major units, e.g. "12.50". Numbers are accepted too.
    #[serde(default, deserialize_with = "amount_text")]
    pub amount: String,
    /// Free text notes.
    #[serde(default)]
    pub notes: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Text(String),
    Number(f64),
}

fn amount_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match AmountInput::deserialize(deserializer)? {
        AmountInput::Text(text) => text,
        AmountInput::Number(number) => number.to_string(),
    })
}

/// A transaction form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransaction {
    /// When the transaction happened.
    pub date: Date,
    /// Income or expense.
    pub kind: TransactionKind,
    /// A category of `kind`.
    pub category: Category,
    /// A positive amount.
    pub amount: Money,
    /// The notes, `None` if left blank.
    pub notes: Option<String>,
}

impl ValidatedTransaction {
    /// The fields for creating a transaction owned by `owner_id`.
    pub fn into_new(self, owner_id: UserID) -> NewTransaction {
        NewTransaction {
            owner_id,
            date: self.date,
            kind: self.kind,
            category: self.category,
            amount: self.amount,
            notes: self.notes,
        }
    }

    /// The fields for updating an existing transaction.
    pub fn into_update(self) -> TransactionUpdate {
        TransactionUpdate {
            date: self.date,
            kind: self.kind,
            category: self.category,
            amount: self.amount,
            notes: self.notes,
        }
    }
}

impl TransactionForm {
    /// A blank expense dated `today`.
    pub fn for_create(today: Date) -> Self {
        Self {
            date: today.to_string(),
            kind: TransactionKind::Expense,
            ..Default::default()
        }
    }

    /// A form pre-filled with `record`.
    pub fn from_record(record: &TransactionRecord) -> Self {
        Self {
            date: record.date.to_string(),
            kind: record.kind,
            category: record.category.name().to_owned(),
            amount: record.amount.to_string(),
            notes: record.notes_or_empty().to_owned(),
        }
    }

    /// Check the form, stopping at the first problem.
    ///
    /// # Errors
    ///
    /// Returns a [FormError] describing the first rule the form breaks.
    pub fn validate(&self) -> Result<ValidatedTransaction, FormError> {
        let date = self.date.trim();
        let category = self.category.trim();
        let amount = self.amount.trim();

        if date.is_empty() || category.is_empty() || amount.is_empty() {
            return Err(FormError::MissingRequiredFields);
        }

        let amount = Money::parse_positive(amount).ok_or(FormError::AmountNotPositive)?;
        let date = parse_date(date).ok_or(FormError::InvalidDate)?;
        let category: Category = category
            .parse()
            .map_err(|_| FormError::UnknownCategory(category.to_owned()))?;

        if category.kind() != self.kind {
            return Err(FormError::CategoryKindMismatch {
                category,
                kind: self.kind,
            });
        }

        let notes = match self.notes.trim() {
            "" => None,
            _ => Some(self.notes.clone()),
        };

        Ok(ValidatedTransaction {
            date,
            kind: self.kind,
            category,
            amount,
            notes,
        })
    }
}

/// Whether the form creates a new transaction or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    /// Saving creates a new transaction.
    Create,
    /// Saving overwrites the transaction with this ID.
    Edit(TransactionId),
}

/// Where the form is in its save lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormState {
    /// Waiting for input.
    #[default]
    Idle,
    /// Checking the input.
    Validating,
    /// Waiting for the remote store to confirm the save.
    Saving,
}

/// An open transaction form and its save lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEditor {
    mode: FormMode,
    form: TransactionForm,
    state: FormState,
    error: Option<String>,
}

impl TransactionEditor {
    /// Open a blank form for a new transaction dated `today`.
    pub fn create(today: Date) -> Self {
        Self {
            mode: FormMode::Create,
            form: TransactionForm::for_create(today),
            state: FormState::Idle,
            error: None,
        }
    }

    /// Open a form for a new transaction dated today in UTC.
    pub fn create_today() -> Self {
        Self::create(OffsetDateTime::now_utc().date())
    }

    /// Open a form pre-filled with `record`.
    pub fn edit(record: &TransactionRecord) -> Self {
        Self {
            mode: FormMode::Edit(record.id),
            form: TransactionForm::from_record(record),
            state: FormState::Idle,
            error: None,
        }
    }

    /// Whether saving creates or edits a transaction.
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// The current input.
    pub fn form(&self) -> &TransactionForm {
        &self.form
    }

    /// Replace the input, e.g. with what the user typed.
    pub fn set_form(&mut self, form: TransactionForm) {
        self.form = form;
    }

    /// Where the form is in its save lifecycle.
    pub fn state(&self) -> FormState {
        self.state
    }

    /// The message from the last failed save, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validate the input and send it to the remote store.
    ///
    /// Nothing is sent if the input is invalid. On failure the input is kept
    /// so the user can try again.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::SaveInProgress] if a save has not finished yet,
    /// - [Error::Validation] if the input is invalid,
    /// - [Error::UpdateMissingTransaction] if the edited transaction no longer exists,
    /// - [Error::SaveFailed] if the remote store failed.
    pub async fn submit<S: TransactionService>(
        &mut self,
        owner: UserID,
        service: &S,
    ) -> Result<TransactionRecord, Error> {
        if self.state == FormState::Saving {
            return Err(Error::SaveInProgress);
        }

        self.state = FormState::Validating;
        let validated = match self.form.validate() {
            Ok(validated) => validated,
            Err(error) => {
                self.state = FormState::Idle;
                self.error = Some(error.to_string());
                return Err(error.into());
            }
        };

        self.state = FormState::Saving;
        self.error = None;
        let result = match self.mode {
            FormMode::Create => service.create(validated.into_new(owner)).await,
            FormMode::Edit(id) => service.update(id, validated.into_update()).await,
        };
        self.state = FormState::Idle;

        result.map_err(|error| {
            tracing::error!("Failed to save transaction: {error}");
            self.error = Some(Error::SaveFailed.to_string());

            match error {
                Error::UpdateMissingTransaction => error,
                _ => Error::SaveFailed,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error, UserID,
        category::{Category, TransactionKind},
        money::Money,
        transaction::{
            FormError, FormMode, FormState, TransactionEditor, TransactionForm,
            test_utils::FakeTransactionService,
        },
    };

    fn valid_form() -> TransactionForm {
        TransactionForm {
            date: "2025-05-01".to_owned(),
            kind: TransactionKind::Expense,
            category: "Food".to_owned(),
            amount: "250.75".to_owned(),
            notes: "Lunch".to_owned(),
        }
    }

    #[test]
    fn validates_good_input() {
        let validated = valid_form().validate().unwrap();

        assert_eq!(validated.date, date!(2025 - 05 - 01));
        assert_eq!(validated.category, Category::Food);
        assert_eq!(validated.amount, Money::from_minor_units(25_075));
        assert_eq!(validated.notes.as_deref(), Some("Lunch"));
    }

    #[test]
    fn blank_notes_become_none() {
        let form = TransactionForm {
            notes: "   ".to_owned(),
            ..valid_form()
        };

        assert_eq!(form.validate().unwrap().notes, None);
    }

    #[test]
    fn requires_date_category_and_amount() {
        for form in [
            TransactionForm {
                date: String::new(),
                ..valid_form()
            },
            TransactionForm {
                category: " ".to_owned(),
                ..valid_form()
            },
            TransactionForm {
                amount: String::new(),
                ..valid_form()
            },
        ] {
            assert_eq!(form.validate(), Err(FormError::MissingRequiredFields));
        }
    }

    #[test]
    fn rejects_amounts_that_are_not_positive() {
        for amount in ["0", "-5", "abc", "0.001", "NaN", "inf"] {
            let form = TransactionForm {
                amount: amount.to_owned(),
                ..valid_form()
            };

            assert_eq!(
                form.validate(),
                Err(FormError::AmountNotPositive),
                "amount {amount:?}"
            );
        }
    }

    #[test]
    fn first_failing_rule_wins() {
        let form = TransactionForm {
            date: "not a date".to_owned(),
            amount: "-1".to_owned(),
            ..valid_form()
        };

        assert_eq!(form.validate(), Err(FormError::AmountNotPositive));
    }

    #[test]
    fn rejects_bad_dates() {
        let form = TransactionForm {
            date: "2025-13-01".to_owned(),
            ..valid_form()
        };

        assert_eq!(form.validate(), Err(FormError::InvalidDate));
    }

    #[test]
    fn rejects_unknown_category() {
        let form = TransactionForm {
            category: "Rent".to_owned(),
            ..valid_form()
        };

        let error = form.validate().unwrap_err();

        assert_eq!(error, FormError::UnknownCategory("Rent".to_owned()));
        assert_eq!(error.to_string(), "Unknown category: Rent.");
    }

    #[test]
    fn rejects_category_of_other_kind() {
        let form = TransactionForm {
            kind: TransactionKind::Income,
            ..valid_form()
        };

        let error = form.validate().unwrap_err();

        assert_eq!(error.to_string(), "Food is not an income category.");
        assert_eq!(error.field(), Some("category"));
    }

    #[test]
    fn accepts_numeric_amount_in_json() {
        let form: TransactionForm = serde_json::from_str(
            r#"{"date": "2025-05-01", "type": "income", "category": "Salary", "amount": 1500.5}"#,
        )
        .unwrap();

        assert_eq!(form.kind, TransactionKind::Income);
        assert_eq!(form.amount, "1500.5");
        assert_eq!(form.notes, "");
    }

    #[test]
    fn create_form_defaults_to_expense_today() {
        let editor = TransactionEditor::create(date!(2025 - 06 - 15));

        assert_eq!(editor.mode(), FormMode::Create);
        assert_eq!(editor.form().date, "2025-06-15");
        assert_eq!(editor.form().kind, TransactionKind::Expense);
        assert_eq!(editor.form().category, "");
        assert_eq!(editor.form().amount, "");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_service() {
        let service = FakeTransactionService::default();

        for amount in ["0", "-5", "abc"] {
            let mut editor = TransactionEditor::create(date!(2025 - 06 - 15));
            editor.set_form(TransactionForm {
                amount: amount.to_owned(),
                ..valid_form()
            });

            let result = editor.submit(UserID::new(1), &service).await;

            assert_eq!(
                result,
                Err(Error::Validation(FormError::AmountNotPositive)),
                "amount {amount:?}"
            );
            assert_eq!(editor.error(), Some("Amount must be a positive number."));
            assert_eq!(editor.state(), FormState::Idle);
        }

        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn failed_save_keeps_input() {
        let service = FakeTransactionService::default();
        service.set_failing(true);
        let mut editor = TransactionEditor::create(date!(2025 - 06 - 15));
        editor.set_form(valid_form());

        let result = editor.submit(UserID::new(1), &service).await;

        assert_eq!(result, Err(Error::SaveFailed));
        assert_eq!(editor.error(), Some("Failed to save transaction"));
        assert_eq!(editor.form(), &valid_form());
        assert_eq!(editor.state(), FormState::Idle);
    }
}

//! Route handlers for the transactions screen.
//!
//! Reads wait their turn on the session's workspace. Writes are refused while
//! anything else is using it, see [run_exclusive].

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::Session,
    backend::SqliteBackend,
    transaction::{
        TransactionFilter, TransactionFilterQuery, TransactionForm, TransactionId,
        TransactionRecord, TransactionsSnapshot,
    },
    workspace::{WorkspaceHandle, run_exclusive},
};

/// A route handler for the filtered transactions, their totals and any load error.
///
/// Loads the transactions first if they have not been loaded yet or if the
/// last attempt failed.
///
/// # Errors
///
/// Returns an [Error::InvalidDate] if a date in the query is malformed.
pub async fn get_transactions_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
    Query(query): Query<TransactionFilterQuery>,
) -> Result<Json<TransactionsSnapshot>, Error> {
    let filter = TransactionFilter::try_from(query)?;
    let client = backend.client(session.user_id);

    let mut workspace = workspace.lock().await;
    let view = &mut workspace.transactions;
    view.ensure_loaded(&client).await;
    view.set_filter(filter);

    Ok(Json(view.snapshot()))
}

/// A route handler for the defaults of a blank transaction form.
pub async fn get_new_form_endpoint() -> Json<TransactionForm> {
    Json(TransactionForm::for_create(OffsetDateTime::now_utc().date()))
}

/// A route handler for the form of an existing transaction, filled in from the record.
///
/// # Errors
///
/// Returns an [Error::NotFound] if the user has no transaction with `transaction_id`.
pub async fn get_edit_form_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionForm>, Error> {
    let client = backend.client(session.user_id);

    let mut workspace = workspace.lock().await;
    let view = &mut workspace.transactions;
    view.ensure_loaded(&client).await;

    view.store()
        .get(transaction_id)
        .map(|record| Json(TransactionForm::from_record(record)))
        .ok_or(Error::NotFound)
}

/// A route handler for creating a transaction.
///
/// # Errors
///
/// Returns:
/// - [Error::Validation] if the form is invalid, nothing is sent to the backend,
/// - [Error::SaveFailed] if the backend could not save the transaction,
/// - [Error::OperationInProgress] if another change for the session is in flight.
pub async fn create_transaction_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<TransactionRecord>), Error> {
    let client = backend.client(session.user_id);

    let record = run_exclusive(&workspace, |mut workspace| async move {
        let view = &mut workspace.transactions;
        view.ensure_loaded(&client).await;
        view.open_create(OffsetDateTime::now_utc().date())
            .set_form(form);

        view.submit(&client).await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// A route handler for editing a transaction.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if the user has no transaction with `transaction_id`,
/// - [Error::Validation] if the form is invalid, nothing is sent to the backend,
/// - [Error::UpdateMissingTransaction] if the transaction was deleted elsewhere,
/// - [Error::SaveFailed] if the backend could not save the transaction,
/// - [Error::OperationInProgress] if another change for the session is in flight.
pub async fn edit_transaction_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
    Path(transaction_id): Path<TransactionId>,
    Json(form): Json<TransactionForm>,
) -> Result<Json<TransactionRecord>, Error> {
    let client = backend.client(session.user_id);

    let record = run_exclusive(&workspace, |mut workspace| async move {
        let view = &mut workspace.transactions;
        view.ensure_loaded(&client).await;
        view.open_edit(transaction_id)?.set_form(form);

        view.submit(&client).await
    })
    .await?;

    Ok(Json(record))
}

/// The query string of a delete request.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Whether the user confirmed the delete.
    #[serde(default)]
    pub confirmed: bool,
}

/// A route handler for deleting a transaction the user has confirmed deleting.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if the user has no transaction with `transaction_id`,
/// - [Error::ConfirmationRequired] if the request did not carry `confirmed=true`,
/// - [Error::DeleteMissingTransaction] if the transaction was already deleted elsewhere,
/// - [Error::DeleteFailed] if the backend could not delete the transaction,
/// - [Error::OperationInProgress] if another change for the session is in flight.
pub async fn delete_transaction_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
    Path(transaction_id): Path<TransactionId>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, Error> {
    let client = backend.client(session.user_id);

    run_exclusive(&workspace, |mut workspace| async move {
        let view = &mut workspace.transactions;
        view.ensure_loaded(&client).await;
        let confirmation = view.request_delete(transaction_id)?;

        if !query.confirmed {
            return Err(Error::ConfirmationRequired);
        }

        view.confirm_delete(confirmation, &client).await
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

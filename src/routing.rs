//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};

use crate::{
    AppState, Error,
    auth::{
        auth_guard, get_session_endpoint, post_log_in, post_log_out, register_user,
        update_password_endpoint,
    },
    category::get_categories_endpoint,
    endpoints,
    profile::{get_profile_endpoint, update_profile_endpoint},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_edit_form_endpoint, get_new_form_endpoint, get_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::SIGN_UP, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out))
        .route(endpoints::CATEGORIES, get(get_categories_endpoint));

    let protected_routes = Router::new()
        .route(endpoints::SESSION, get(get_session_endpoint))
        .route(endpoints::PASSWORD, put(update_password_endpoint))
        .route(
            endpoints::PROFILE,
            get(get_profile_endpoint).put(update_profile_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::NEW_TRANSACTION_FORM, get(get_new_form_endpoint))
        .route(
            endpoints::EDIT_TRANSACTION_FORM,
            get(get_edit_form_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}

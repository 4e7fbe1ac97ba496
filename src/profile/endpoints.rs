use axum::{Extension, Json, extract::State};
use serde::Deserialize;

use crate::{
    Error,
    auth::Session,
    backend::SqliteBackend,
    profile::{CurrencyCode, Profile, ProfileService, ProfileUpdate, load_or_create_profile},
    user::DisplayName,
    workspace::{WorkspaceHandle, run_exclusive},
};

/// The profile fields a user can change. Missing fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    /// The new display name.
    pub name: Option<String>,
    /// The new currency code, e.g. "NZD".
    pub currency: Option<String>,
}

impl TryFrom<ProfileForm> for ProfileUpdate {
    type Error = Error;

    fn try_from(form: ProfileForm) -> Result<Self, Self::Error> {
        Ok(Self {
            name: form.name.as_deref().map(DisplayName::new).transpose()?,
            currency: form.currency.as_deref().map(CurrencyCode::new).transpose()?,
        })
    }
}

/// A route handler for the signed-in user's profile.
///
/// If the profile could not be set up at sign-in, this tries again.
///
/// # Errors
///
/// Returns an [Error::NotFound] if the profile still could not be loaded or created.
pub async fn get_profile_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
) -> Result<Json<Profile>, Error> {
    let mut workspace = workspace.lock().await;

    if let Some(profile) = workspace.session.profile() {
        return Ok(Json(profile.clone()));
    }

    let client = backend.client(session.user_id);
    let profile = load_or_create_profile(&session, &client)
        .await
        .ok_or(Error::NotFound)?;
    workspace.session.set_profile(profile.clone());

    Ok(Json(profile))
}

/// A route handler for changing the signed-in user's name or currency.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidName] or [Error::InvalidCurrency] if a field is invalid,
/// - [Error::NotFound] if the user has no profile,
/// - [Error::OperationInProgress] if another change for the session is in flight.
pub async fn update_profile_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Profile>, Error> {
    let update = ProfileUpdate::try_from(form)?;
    let client = backend.client(session.user_id);

    let profile = run_exclusive(&workspace, move |mut workspace| async move {
        let profile = client.update(session.user_id, update).await?;
        workspace.session.set_profile(profile.clone());

        Ok(profile)
    })
    .await?;

    Ok(Json(profile))
}

use std::{fmt::Display, future::Future};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    auth::Session,
    user::{DisplayName, EmailAddress},
};

/// The currency new profiles start with.
pub const DEFAULT_CURRENCY: &str = "PHP";

/// The name new profiles get when the user did not give one at sign-up.
pub const DEFAULT_PROFILE_NAME: &str = "User";

/// A three letter ISO 4217 currency code, e.g. "PHP" or "NZD".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validate a currency code, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCurrency] if `code` is not three ASCII letters.
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidCurrency(code.to_owned()));
        }

        Ok(Self(code.to_ascii_uppercase()))
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// The user the profile belongs to.
    pub id: UserID,
    /// The name shown in the app.
    pub name: String,
    /// The user's email address at the time the profile was created.
    pub email: EmailAddress,
    /// The currency amounts are displayed in.
    pub currency: String,
    /// When the profile was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the profile was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The data needed to create a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    /// The user the profile belongs to.
    pub id: UserID,
    /// The name shown in the app.
    pub name: String,
    /// The user's email address.
    pub email: EmailAddress,
    /// The currency amounts are displayed in.
    pub currency: CurrencyCode,
}

/// Changes to a profile. Fields that are `None` are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    /// The new display name.
    pub name: Option<DisplayName>,
    /// The new currency.
    pub currency: Option<CurrencyCode>,
}

/// Reads and writes user profiles.
pub trait ProfileService {
    /// Get the profile of the user with `user_id`, or `None` if they do not have one.
    fn get(&self, user_id: UserID) -> impl Future<Output = Result<Option<Profile>, Error>> + Send;

    /// Create a profile.
    fn create(&self, profile: NewProfile) -> impl Future<Output = Result<Profile, Error>> + Send;

    /// Apply `update` to the profile of the user with `user_id`.
    fn update(
        &self,
        user_id: UserID,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<Profile, Error>> + Send;
}

/// Load the signed-in user's profile, creating a default one if it is missing.
///
/// The default profile uses the name from the session (or
/// [DEFAULT_PROFILE_NAME]) and [DEFAULT_CURRENCY].
/// Failures are logged and result in `None`, the user stays signed in either way.
pub async fn load_or_create_profile<P: ProfileService>(
    session: &Session,
    profiles: &P,
) -> Option<Profile> {
    match profiles.get(session.user_id).await {
        Ok(Some(profile)) => return Some(profile),
        Ok(None) => {}
        Err(error) => {
            tracing::error!(
                "Could not load profile for user {}: {error}",
                session.user_id
            );
            return None;
        }
    }

    let name = match session.name.trim() {
        "" => DEFAULT_PROFILE_NAME,
        name => name,
    };
    let new_profile = NewProfile {
        id: session.user_id,
        name: name.to_owned(),
        email: session.email.clone(),
        currency: CurrencyCode(DEFAULT_CURRENCY.to_owned()),
    };

    match profiles.create(new_profile).await {
        Ok(profile) => {
            tracing::info!("Created profile for user {}", session.user_id);
            Some(profile)
        }
        Err(error) => {
            tracing::error!(
                "Could not create profile for user {}: {error}",
                session.user_id
            );
            None
        }
    }
}

use std::{collections::HashMap, sync::Mutex};

use time::OffsetDateTime;

use crate::{
    Error, UserID,
    profile::{NewProfile, Profile, ProfileService, ProfileUpdate},
};

/// An in-memory [ProfileService] for tests.
#[derive(Debug, Default)]
pub(crate) struct FakeProfileService {
    profiles: Mutex<HashMap<UserID, Profile>>,
    fail: bool,
}

impl FakeProfileService {
    /// A service where every call fails.
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), Error> {
        if self.fail {
            Err(Error::DatabaseLockError)
        } else {
            Ok(())
        }
    }
}

impl ProfileService for FakeProfileService {
    async fn get(&self, user_id: UserID) -> Result<Option<Profile>, Error> {
        self.check()?;
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn create(&self, profile: NewProfile) -> Result<Profile, Error> {
        self.check()?;
        let now = OffsetDateTime::now_utc();
        let profile = Profile {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            currency: profile.currency.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id, profile.clone());

        Ok(profile)
    }

    async fn update(&self, user_id: UserID, update: ProfileUpdate) -> Result<Profile, Error> {
        self.check()?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&user_id).ok_or(Error::NotFound)?;

        if let Some(name) = update.name {
            profile.name = name.to_string();
        }
        if let Some(currency) = update.currency {
            profile.currency = currency.to_string();
        }
        profile.updated_at = OffsetDateTime::now_utc();

        Ok(profile.clone())
    }
}

//! User profiles: display name and preferred currency.

mod db;
mod domain;
mod endpoints;
#[cfg(test)]
pub(crate) mod test_utils;

pub use db::{create_profile_table, get_profile, insert_profile, update_profile};
pub use domain::{
    CurrencyCode, DEFAULT_CURRENCY, DEFAULT_PROFILE_NAME, NewProfile, Profile, ProfileService,
    ProfileUpdate, load_or_create_profile,
};
pub use endpoints::{ProfileForm, get_profile_endpoint, update_profile_endpoint};

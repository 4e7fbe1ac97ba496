use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    profile::{NewProfile, Profile, ProfileUpdate},
    user::EmailAddress,
};

/// Create the profile table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_profile_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                currency TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Get the profile of the user with `user_id`.
///
/// Returns `Ok(None)` if the user has no profile.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn get_profile(user_id: UserID, connection: &Connection) -> Result<Option<Profile>, Error> {
    connection
        .prepare(
            "SELECT id, name, email, currency, created_at, updated_at FROM profile WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_profile_row)
        .optional()
        .map_err(Error::from)
}

/// Insert a new profile.
///
/// # Errors
/// Returns an [Error::SqlError] if the profile already exists or the user does not exist.
pub fn insert_profile(profile: &NewProfile, connection: &Connection) -> Result<Profile, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(
            "INSERT INTO profile (id, name, email, currency, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING id, name, email, currency, created_at, updated_at",
        )?
        .query_row(
            (
                profile.id.as_i64(),
                &profile.name,
                profile.email.as_ref(),
                profile.currency.as_ref(),
                now,
            ),
            map_profile_row,
        )
        .map_err(Error::from)
}

/// Apply `update` to the profile of the user with `user_id`.
///
/// # Errors
/// Returns an [Error::NotFound] if the user has no profile.
pub fn update_profile(
    user_id: UserID,
    update: &ProfileUpdate,
    connection: &Connection,
) -> Result<Profile, Error> {
    connection
        .prepare(
            "UPDATE profile
             SET name = COALESCE(?1, name), currency = COALESCE(?2, currency), updated_at = ?3
             WHERE id = ?4
             RETURNING id, name, email, currency, created_at, updated_at",
        )?
        .query_row(
            (
                update.name.as_ref().map(AsRef::<str>::as_ref),
                update.currency.as_ref().map(AsRef::<str>::as_ref),
                OffsetDateTime::now_utc(),
                user_id.as_i64(),
            ),
            map_profile_row,
        )
        .map_err(Error::from)
}

fn map_profile_row(row: &Row) -> Result<Profile, rusqlite::Error> {
    let raw_email: String = row.get(2)?;

    Ok(Profile {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        email: EmailAddress::new_unchecked(&raw_email),
        currency: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

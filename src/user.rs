//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A syntactically valid email address.
///
/// The check mirrors what a browser does for `type="email"` inputs: some
/// non-whitespace text, an `@`, and a domain with at least one inner dot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and normalise an email address.
    ///
    /// Surrounding whitespace is removed and the address is lowercased.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEmail] if `email` is not a valid email address.
    pub fn new(email: &str) -> Result<Self, Error> {
        let email = email.trim();

        if email.chars().any(char::is_whitespace) {
            return Err(Error::InvalidEmail);
        }

        let Some((local, domain)) = email.split_once('@') else {
            return Err(Error::InvalidEmail);
        };

        if local.is_empty() || domain.contains('@') {
            return Err(Error::InvalidEmail);
        }

        let has_inner_dot = domain
            .char_indices()
            .any(|(index, c)| c == '.' && index > 0 && index < domain.len() - 1);

        if !has_inner_dot {
            return Err(Error::InvalidEmail);
        }

        Ok(Self(email.to_lowercase()))
    }

    /// Create an email address without validation.
    ///
    /// The caller should ensure that the string is a valid, lowercase email address.
    pub fn new_unchecked(email: &str) -> Self {
        Self(email.to_owned())
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for EmailAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmailAddress::new(s)
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The minimum number of characters in a display name.
const MIN_NAME_LENGTH: usize = 2;
/// The maximum number of characters in a display name.
const MAX_NAME_LENGTH: usize = 50;

/// A user's display name, between 2 and 50 characters after trimming.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Create a display name.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidName] if the trimmed name is too short or too long.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();
        let length = name.chars().count();

        if length < MIN_NAME_LENGTH {
            return Err(Error::InvalidName(format!(
                "Name must be at least {MIN_NAME_LENGTH} characters long."
            )));
        }

        if length > MAX_NAME_LENGTH {
            return Err(Error::InvalidName(format!(
                "Name must be less than {MAX_NAME_LENGTH} characters long."
            )));
        }

        Ok(Self(name.to_owned()))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The address the user signs in with.
    pub email: EmailAddress,
    /// The name given at sign-up, kept as user metadata.
    pub name: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if a user with `email` already exists,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    email: &EmailAddress,
    name: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, name, password) VALUES (?1, ?2, ?3)",
        (email.as_ref(), name, password_hash.as_ref()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.clone(),
        name: name.to_owned(),
        password_hash,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, name, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database registered with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user is registered with `email`.
pub fn get_user_by_email(email: &EmailAddress, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, name, password FROM user WHERE email = :email")?
        .query_row(&[(":email", email.as_ref())], map_user_row)
        .map_err(|error| error.into())
}

/// Replace the password hash of the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not belong to a registered user.
pub fn update_password_hash(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(1)?;
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: EmailAddress::new_unchecked(&raw_email),
        name: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}


#[cfg(test)]
mod display_name_tests {
    use crate::{Error, user::DisplayName};

    #[test]
    fn trims_name() {
        assert_eq!(DisplayName::new("  Juan  ").unwrap().as_ref(), "Juan");
    }

    #[test]
    fn rejects_short_and_long_names() {
        assert_eq!(
            DisplayName::new(" J "),
            Err(Error::InvalidName(
                "Name must be at least 2 characters long.".to_owned()
            ))
        );
        assert_eq!(
            DisplayName::new(&"x".repeat(51)),
            Err(Error::InvalidName(
                "Name must be less than 50 characters long.".to_owned()
            ))
        );
    }
}

//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error, PasswordHash,
    db::{UNIQUE_CONSTRAINT_FAILED, is_constraint_error},
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address, removing surrounding whitespace.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::InvalidEmail] if `raw_email` is not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let trimmed = raw_email.trim();

        if EmailAddress::is_valid(trimmed) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(Error::InvalidEmail(raw_email.to_owned()))
        }
    }

    /// Create a new `Email` without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted email address.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a user, compared for equality when a route requires a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// The role given to users who did not ask for one.
    pub const DEFAULT: &str = "personel";

    /// The role that may use the administrative routes.
    pub const ADMIN: &str = "admin";

    /// Create a role, an empty string gives the default role.
    pub fn new(role: &str) -> Self {
        let role = role.trim();

        if role.is_empty() {
            Self::default()
        } else {
            Self(role.to_owned())
        }
    }

    /// The administrator role.
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_owned())
    }
}

impl Default for Role {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user of the application.
///
/// Not serializable, use [UserResponse] to send a user to a client.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// Unique among users, ignoring letter case.
    pub email: Email,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// May be empty.
    pub phone: String,
    /// May be empty.
    pub department: String,
    /// Checked by routes that require a role.
    pub role: Role,
}

/// The fields needed to register a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: PasswordHash,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub department: String,
    pub role: Role,
}

/// A user as sent to clients, without the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub id: UserID,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub department: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            department: user.department,
            role: user.role,
        }
    }
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
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password TEXT NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                department TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'personel'
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns an [Error::DuplicateEmail] if the email is already registered, ignoring case,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection
        .execute(
            "INSERT INTO user (email, password, first_name, last_name, phone, department, role)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                new_user.email.as_ref(),
                new_user.password_hash.as_ref(),
                &new_user.first_name,
                &new_user.last_name,
                &new_user.phone,
                &new_user.department,
                new_user.role.as_ref(),
            ),
        )
        .map_err(|error| {
            if is_constraint_error(&error, UNIQUE_CONSTRAINT_FAILED) {
                Error::DuplicateEmail(new_user.email.to_string())
            } else {
                error.into()
            }
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: new_user.email,
        password_hash: new_user.password_hash,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        phone: new_user.phone,
        department: new_user.department,
        role: new_user.role,
    })
}

/// Get the user whose email matches `email`, ignoring case.
///
/// # Errors
///
/// This function will return an [Error::NotFound] if `email` does not belong to a registered user.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, email, password, first_name, last_name, phone, department, role
             FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", &email.trim())], map_row)
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(1)?;
    let raw_password_hash: String = row.get(2)?;
    let raw_role: String = row.get(7)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: Email::new_unchecked(&raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        phone: row.get(5)?,
        department: row.get(6)?,
        role: Role::new(&raw_role),
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        PasswordHash,
        user::{Email, NewUser, Role, create_user, get_user_by_email},
    };

    use super::{Error, create_user_table};

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::new(email).unwrap(),
            password_hash: PasswordHash::new_unchecked("hunter2"),
            first_name: "Ayşe".to_owned(),
            last_name: "Yılmaz".to_owned(),
            phone: String::new(),
            department: "Muhasebe".to_owned(),
            role: Role::default(),
        }
    }

    #[test]
    fn email_is_validated() {
        assert!(Email::new("ayse@example.com").is_ok());
        assert_eq!(
            Email::new("not an email"),
            Err(Error::InvalidEmail("not an email".to_owned()))
        );
    }

    #[test]
    fn empty_role_is_default() {
        assert_eq!(Role::new("  "), Role::default());
        assert_eq!(Role::default().as_ref(), "personel");
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();

        let inserted_user = create_user(new_user("ayse@example.com"), &db_connection).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.role, Role::default());
    }

    #[test]
    fn insert_user_fails_on_duplicate_email_in_other_case() {
        let db_connection = get_db_connection();
        create_user(new_user("ayse@example.com"), &db_connection).unwrap();

        let result = create_user(new_user("AYSE@example.com"), &db_connection);

        assert_eq!(
            result,
            Err(Error::DuplicateEmail("AYSE@example.com".to_owned()))
        );
    }

    #[test]
    fn get_user_fails_with_unknown_email() {
        let db_connection = get_db_connection();

        assert_eq!(
            get_user_by_email("nobody@example.com", &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_user_ignores_email_case() {
        let db_connection = get_db_connection();
        let test_user = create_user(new_user("ayse@example.com"), &db_connection).unwrap();

        let retrieved_user = get_user_by_email("Ayse@Example.com", &db_connection).unwrap();

        assert_eq!(retrieved_user, test_user);
    }
}

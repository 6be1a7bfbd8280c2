//! The user model, account lifecycle state, and the queries that manage both.
//!
//! A user owns every ledger row in the application. Account lifecycle
//! (active/inactive/expired, trial expiration, forced password changes) is
//! managed from the admin panel and enforced at log-in.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, password::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
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

/// The name a user logs in with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Username(String);

impl Username {
    /// Create a username, rejecting empty or whitespace-only strings.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyUsername] if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyUsername)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a username without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an account may log in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    /// The account may log in.
    Active,
    /// The account has been switched off by an administrator.
    Inactive,
    /// The account's expiration date has passed.
    Expired,
}

impl AccountStatus {
    /// The string stored in the database for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Expired => "expired",
        }
    }

    /// Parse a status string from the database.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "expired" => Some(AccountStatus::Expired),
            _ => None,
        }
    }
}

impl Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let display_name = match self {
            AccountStatus::Active => "Active",
            AccountStatus::Inactive => "Inactive",
            AccountStatus::Expired => "Expired",
        };

        write!(f, "{display_name}")
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: Username,
    /// The user's contact email address.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Whether the user may access the admin panel.
    pub is_admin: bool,
    /// Whether the account may log in.
    pub status: AccountStatus,
    /// When the account expires, if an expiration has been set.
    pub expiration: Option<OffsetDateTime>,
    /// Whether the user must change their password at next log-in.
    pub needs_password_change: bool,
    /// The name of the user's business, shown on the dashboard.
    pub business_name: String,
    /// The currency symbol used when formatting amounts for this user.
    pub currency: String,
    /// The user's monthly income target; 0 disables the target display.
    pub monthly_income_target: f64,
    /// The user's monthly expense target; 0 disables the target display.
    pub monthly_expense_target: f64,
    /// Whether the dashboard shows the inventory overview card.
    pub show_inventory_overview: bool,
}

impl User {
    /// Whether the account's expiration date has passed as of `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        matches!(self.expiration, Some(expiration) if expiration < now)
    }
}

/// The data needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The name the user logs in with.
    pub username: Username,
    /// The user's contact email address.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Whether the user may access the admin panel.
    pub is_admin: bool,
    /// When the account expires, if an expiration should be set.
    pub expiration: Option<OffsetDateTime>,
    /// Whether the user must change their password at next log-in.
    pub needs_password_change: bool,
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
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            expiration TEXT,
            needs_password_change INTEGER NOT NULL DEFAULT 0,
            business_name TEXT NOT NULL DEFAULT '',
            currency TEXT NOT NULL DEFAULT '₱',
            monthly_income_target REAL NOT NULL DEFAULT 0,
            monthly_expense_target REAL NOT NULL DEFAULT 0,
            show_inventory_overview INTEGER NOT NULL DEFAULT 1
        )",
        (),
    )?;

    Ok(())
}

const USER_COLUMNS: &str = "id, username, email, password, is_admin, status, expiration, \
    needs_password_change, business_name, currency, monthly_income_target, \
    monthly_expense_target, show_inventory_overview";

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_username: String = row.get(1)?;
    let raw_password: String = row.get(3)?;
    let raw_status: String = row.get(5)?;

    let status = AccountStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("invalid account status {raw_status:?}").into(),
        )
    })?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: Username::new_unchecked(&raw_username),
        email: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password),
        is_admin: row.get(4)?,
        status,
        expiration: row.get(6)?,
        needs_password_change: row.get(7)?,
        business_name: row.get(8)?,
        currency: row.get(9)?,
        monthly_income_target: row.get(10)?,
        monthly_expense_target: row.get(11)?,
        show_inventory_overview: row.get(12)?,
    })
}

/// Create and insert a new user into the database.
///
/// New users start out active with the default business settings.
///
/// # Errors
///
/// Returns [Error::DuplicateUsername] or [Error::DuplicateEmail] if the
/// username or email are taken, or a [Error::SqlError] if another SQL
/// related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, email, password, is_admin, status, expiration, needs_password_change)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            new_user.username.as_ref(),
            &new_user.email,
            new_user.password_hash.as_ref(),
            new_user.is_admin,
            AccountStatus::Active.as_str(),
            new_user.expiration,
            new_user.needs_password_change,
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    get_user_by_id(id, connection)
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
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with a username equal to `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that username, or a
/// [Error::SqlError] if an SQL related error occurred.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE username = :username"
        ))?
        .query_row(&[(":username", &username)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all users ordered by ID, for the admin panel.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user ORDER BY id ASC"))?
        .query_map([], map_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    let count: i64 = connection.query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))?;

    Ok(count as usize)
}

/// Whether a user already exists with `username` or `email`.
///
/// Used to give a friendlier error before attempting the insert.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn username_or_email_taken(
    username: &str,
    email: &str,
    connection: &Connection,
) -> Result<bool, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM user WHERE username = :username OR email = :email",
        &[(":username", &username), (":email", &email)],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

/// Update a user's password hash and the forced-change flag in one statement.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if no user has `user_id`.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    needs_password_change: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1, needs_password_change = ?2 WHERE id = ?3",
        (password_hash.as_ref(), needs_password_change, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Set a user's account status.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if no user has `user_id`.
pub fn set_account_status(
    user_id: UserID,
    status: AccountStatus,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET status = ?1 WHERE id = ?2",
        (status.as_str(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Grant or revoke admin access for a user.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if no user has `user_id`.
pub fn set_admin(user_id: UserID, is_admin: bool, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET is_admin = ?1 WHERE id = ?2",
        (is_admin, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Set or clear a user's expiration date.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if no user has `user_id`.
pub fn set_expiration(
    user_id: UserID,
    expiration: Option<OffsetDateTime>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET expiration = ?1 WHERE id = ?2",
        (expiration, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Set or clear the forced-password-change flag for a user.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if no user has `user_id`.
pub fn set_needs_password_change(
    user_id: UserID,
    needs_password_change: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET needs_password_change = ?1 WHERE id = ?2",
        (needs_password_change, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Update the business name and currency symbol shown on the user's pages.
///
/// # Errors
///
/// Returns [Error::EmptyBusinessName] if `business_name` is empty, or
/// [Error::UpdateMissingUser] if no user has `user_id`.
pub fn update_business_info(
    user_id: UserID,
    business_name: &str,
    currency: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let business_name = business_name.trim();

    if business_name.is_empty() {
        return Err(Error::EmptyBusinessName);
    }

    let rows_affected = connection.execute(
        "UPDATE user SET business_name = ?1, currency = ?2 WHERE id = ?3",
        (business_name, currency, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Update the user's monthly income and expense targets.
///
/// # Errors
///
/// Returns [Error::NegativeTarget] if either target is negative, or
/// [Error::UpdateMissingUser] if no user has `user_id`.
pub fn update_targets(
    user_id: UserID,
    monthly_income_target: f64,
    monthly_expense_target: f64,
    connection: &Connection,
) -> Result<(), Error> {
    if monthly_income_target < 0.0 || monthly_expense_target < 0.0 {
        return Err(Error::NegativeTarget);
    }

    let rows_affected = connection.execute(
        "UPDATE user SET monthly_income_target = ?1, monthly_expense_target = ?2 WHERE id = ?3",
        (monthly_income_target, monthly_expense_target, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Toggle whether the dashboard shows the inventory overview card.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if no user has `user_id`.
pub fn update_dashboard_preference(
    user_id: UserID,
    show_inventory_overview: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET show_inventory_overview = ?1 WHERE id = ?2",
        (show_inventory_overview, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Mark the user as expired if their expiration date has passed.
///
/// Returns `true` if the status was changed. Called at log-in so stale
/// accounts are flipped before the credentials are accepted.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn expire_user_if_due(
    user: &User,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    if user.status != AccountStatus::Active || !user.is_expired_at(now) {
        return Ok(false);
    }

    set_account_status(user.id, AccountStatus::Expired, connection)?;

    Ok(true)
}

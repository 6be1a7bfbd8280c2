//! The append-only audit trail of money moving into and out of savings goals.
//!
//! Entries are written by the transfer engine inside its transactions and
//! are never mutated or deleted afterwards.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, savings::goal::GoalId, user::UserID};

pub type SavingsLogId = i64;

/// The direction of a savings transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogType {
    /// Money moved from the wallet into a goal.
    Deposit,
    /// Money returned to the wallet from a deleted goal.
    Return,
}

impl LogType {
    /// The string stored in the database for this log type.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Deposit => "Deposit",
            LogType::Return => "Return",
        }
    }

    /// Parse a log type string from the database.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Deposit" => Some(LogType::Deposit),
            "Return" => Some(LogType::Return),
            _ => None,
        }
    }
}

impl Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the savings audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsLogEntry {
    /// The ID of the log entry.
    pub id: SavingsLogId,
    /// The user whose savings moved.
    pub user_id: UserID,
    /// The goal involved. `None` once the goal itself has been deleted.
    pub goal_id: Option<GoalId>,
    /// Whether money moved into or out of savings.
    pub log_type: LogType,
    /// The amount moved.
    pub amount: f64,
    /// A human-readable summary of the transfer.
    pub description: String,
    /// When the transfer happened.
    pub log_date: OffsetDateTime,
}

pub fn create_savings_log_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS savings_log (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            goal_id INTEGER,
            log_type TEXT NOT NULL,
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            log_date TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_savings_log_user_date ON savings_log(user_id, log_date);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<SavingsLogEntry, rusqlite::Error> {
    let raw_log_type: String = row.get(3)?;

    let log_type = LogType::parse(&raw_log_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("invalid savings log type {raw_log_type:?}").into(),
        )
    })?;

    Ok(SavingsLogEntry {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        goal_id: row.get(2)?,
        log_type,
        amount: row.get(4)?,
        description: row.get(5)?,
        log_date: row.get(6)?,
    })
}

/// Append an entry to the audit trail.
///
/// Called by the transfer engine inside its transactions so the entry
/// commits or rolls back together with the ledger writes.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn append_log(
    user_id: UserID,
    goal_id: Option<GoalId>,
    log_type: LogType,
    amount: f64,
    description: &str,
    connection: &Connection,
) -> Result<SavingsLogEntry, Error> {
    let log_date = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO savings_log (user_id, goal_id, log_type, amount, description, log_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            user_id.as_i64(),
            goal_id,
            log_type.as_str(),
            amount,
            description,
            log_date,
        ),
    )?;

    Ok(SavingsLogEntry {
        id: connection.last_insert_rowid(),
        user_id,
        goal_id,
        log_type,
        amount,
        description: description.to_owned(),
        log_date,
    })
}

/// The number of log entries for `user_id`.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn count_logs(user_id: UserID, connection: &Connection) -> Result<u64, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM savings_log WHERE user_id = :user_id",
        &[(":user_id", &user_id.as_i64())],
        |row| row.get(0),
    )?;

    Ok(count as u64)
}

/// Retrieve one page of log entries for `user_id`, newest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_logs_page(
    user_id: UserID,
    page_size: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<SavingsLogEntry>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, goal_id, log_type, amount, description, log_date
            FROM savings_log WHERE user_id = :user_id
            ORDER BY log_date DESC, id DESC LIMIT :limit OFFSET :offset",
        )?
        .query_map(
            &[
                (":user_id", &user_id.as_i64()),
                (":limit", &(page_size as i64)),
                (":offset", &(offset as i64)),
            ],
            map_row,
        )?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}

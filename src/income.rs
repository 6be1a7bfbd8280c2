//! Income ledger rows: money coming into the main wallet.
//!
//! Rows are created by the user recording income, or by the savings engine
//! returning a deleted goal's balance to the wallet. Rows are immutable once
//! created.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, user::UserID};

pub type IncomeId = i64;

/// A single income entry in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    /// The ID of the income entry.
    pub id: IncomeId,
    /// The user who received the income.
    pub user_id: UserID,
    /// The amount received. Always positive.
    pub amount: f64,
    /// A short description of where the money came from.
    pub description: String,
    /// The date the income was received.
    pub date: Date,
}

pub fn create_income_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS income (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            date TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_income_user_date ON income(user_id, date);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Income, rusqlite::Error> {
    Ok(Income {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        description: row.get(3)?,
        date: row.get(4)?,
    })
}

/// Record an income entry for `user_id`.
///
/// # Errors
/// Returns [Error::NonPositiveAmount] if `amount` is zero or negative, or an
/// [Error::SqlError] if there is an SQL error.
pub fn insert_income(
    user_id: UserID,
    amount: f64,
    description: &str,
    date: Date,
    connection: &Connection,
) -> Result<Income, Error> {
    if amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    connection.execute(
        "INSERT INTO income (user_id, amount, description, date) VALUES (?1, ?2, ?3, ?4)",
        (user_id.as_i64(), amount, description, date),
    )?;

    Ok(Income {
        id: connection.last_insert_rowid(),
        user_id,
        amount,
        description: description.to_owned(),
        date,
    })
}

/// Get an income entry by ID, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if the entry does not exist or belongs to
/// another user.
pub fn get_income(id: IncomeId, user_id: UserID, connection: &Connection) -> Result<Income, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, description, date FROM income
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(&[(":id", &id), (":user_id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// The lifetime sum of a user's income. Zero when there are no rows.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn total_income(user_id: UserID, connection: &Connection) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM income WHERE user_id = :user_id",
            &[(":user_id", &user_id.as_i64())],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

#[cfg(test)]
mod income_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        user::{UserID, create_user_table},
    };

    use super::{create_income_table, get_income, insert_income, total_income};

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");
        create_income_table(&connection).expect("Could not create income table");

        connection
    }

    #[test]
    fn insert_income_round_trips() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        let inserted = insert_income(user_id, 150.0, "Store sales", date!(2025 - 07 - 20), &connection)
            .expect("Could not insert income");

        assert!(inserted.id > 0);
        assert_eq!(
            Ok(inserted),
            get_income(1, user_id, &connection),
        );
    }

    #[test]
    fn insert_income_rejects_non_positive_amounts() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        assert_eq!(
            insert_income(user_id, 0.0, "nothing", date!(2025 - 07 - 20), &connection),
            Err(Error::NonPositiveAmount)
        );
        assert_eq!(
            insert_income(user_id, -5.0, "negative", date!(2025 - 07 - 20), &connection),
            Err(Error::NonPositiveAmount)
        );
    }

    #[test]
    fn total_income_is_zero_without_rows() {
        let connection = get_db_connection();

        let total = total_income(UserID::new(1), &connection).unwrap();

        assert_eq!(total, 0.0);
    }

    #[test]
    fn total_income_sums_only_this_users_rows() {
        let connection = get_db_connection();
        let user = UserID::new(1);
        let other_user = UserID::new(2);
        insert_income(user, 100.0, "sales", date!(2025 - 07 - 20), &connection).unwrap();
        insert_income(user, 50.5, "sales", date!(2025 - 07 - 21), &connection).unwrap();
        insert_income(other_user, 999.0, "sales", date!(2025 - 07 - 21), &connection).unwrap();

        let total = total_income(user, &connection).unwrap();

        assert_eq!(total, 150.5);
    }

    #[test]
    fn get_income_is_scoped_to_owner() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        let inserted =
            insert_income(owner, 100.0, "sales", date!(2025 - 07 - 20), &connection).unwrap();

        let other_users_view = get_income(inserted.id, UserID::new(2), &connection);

        assert_eq!(other_users_view, Err(Error::NotFound));
    }
}

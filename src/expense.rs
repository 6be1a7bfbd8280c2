//! Expense ledger rows: money leaving the main wallet.
//!
//! Rows are created by the user recording an expense, by paying a scheduled
//! bill, or by the savings engine when money is moved into a goal. Rows are
//! immutable once created.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, user::UserID};

pub type ExpenseId = i64;

/// A single expense entry in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The ID of the expense entry.
    pub id: ExpenseId,
    /// The user who spent the money.
    pub user_id: UserID,
    /// The amount spent. Always positive.
    pub amount: f64,
    /// A short description of what the money was spent on.
    pub description: String,
    /// The date the expense occurred.
    pub date: Date,
}

pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            date TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        description: row.get(3)?,
        date: row.get(4)?,
    })
}

/// Record an expense entry for `user_id`.
///
/// # Errors
/// Returns [Error::NonPositiveAmount] if `amount` is zero or negative, or an
/// [Error::SqlError] if there is an SQL error.
pub fn insert_expense(
    user_id: UserID,
    amount: f64,
    description: &str,
    date: Date,
    connection: &Connection,
) -> Result<Expense, Error> {
    if amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    connection.execute(
        "INSERT INTO expense (user_id, amount, description, date) VALUES (?1, ?2, ?3, ?4)",
        (user_id.as_i64(), amount, description, date),
    )?;

    Ok(Expense {
        id: connection.last_insert_rowid(),
        user_id,
        amount,
        description: description.to_owned(),
        date,
    })
}

/// Get an expense entry by ID, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if the entry does not exist or belongs to
/// another user.
pub fn get_expense(
    id: ExpenseId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, description, date FROM expense
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(&[(":id", &id), (":user_id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// The lifetime sum of a user's expenses. Zero when there are no rows.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn total_expenses(user_id: UserID, connection: &Connection) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expense WHERE user_id = :user_id",
            &[(":user_id", &user_id.as_i64())],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

#[cfg(test)]
mod expense_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        user::{UserID, create_user_table},
    };

    use super::{create_expense_table, get_expense, insert_expense, total_expenses};

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");
        create_expense_table(&connection).expect("Could not create expense table");

        connection
    }

    #[test]
    fn insert_expense_round_trips() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        let inserted = insert_expense(
            user_id,
            75.25,
            "Supplier delivery",
            date!(2025 - 07 - 20),
            &connection,
        )
        .expect("Could not insert expense");

        assert!(inserted.id > 0);
        assert_eq!(Ok(inserted), get_expense(1, user_id, &connection));
    }

    #[test]
    fn insert_expense_rejects_non_positive_amounts() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        assert_eq!(
            insert_expense(user_id, 0.0, "nothing", date!(2025 - 07 - 20), &connection),
            Err(Error::NonPositiveAmount)
        );
    }

    #[test]
    fn total_expenses_is_zero_without_rows() {
        let connection = get_db_connection();

        let total = total_expenses(UserID::new(1), &connection).unwrap();

        assert_eq!(total, 0.0);
    }

    #[test]
    fn total_expenses_sums_only_this_users_rows() {
        let connection = get_db_connection();
        let user = UserID::new(1);
        insert_expense(user, 100.0, "stock", date!(2025 - 07 - 20), &connection).unwrap();
        insert_expense(user, 25.0, "stock", date!(2025 - 07 - 21), &connection).unwrap();
        insert_expense(UserID::new(2), 999.0, "stock", date!(2025 - 07 - 21), &connection)
            .unwrap();

        let total = total_expenses(user, &connection).unwrap();

        assert_eq!(total, 125.0);
    }
}

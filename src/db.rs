//! Database initialization for the application's SQLite store.

use rusqlite::Connection;

use crate::{
    bills::create_bill_table,
    expense::create_expense_table,
    income::create_income_table,
    inventory::create_product_table,
    savings::{create_savings_goal_table, create_savings_log_table},
    user::create_user_table,
};

/// Create the tables for all the domain models.
///
/// Each `create_*_table` function uses `CREATE TABLE IF NOT EXISTS`, so this
/// is safe to call on an existing database.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_user_table(connection)?;
    create_income_table(connection)?;
    create_expense_table(connection)?;
    create_savings_goal_table(connection)?;
    create_savings_log_table(connection)?;
    create_bill_table(connection)?;
    create_product_table(connection)?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn creates_all_tables() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        initialize(&connection).expect("Could not initialize database");

        let table_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                ('user', 'income', 'expense', 'savings_goal', 'savings_log', 'scheduled_bill', 'product')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 7);
    }

    #[test]
    fn is_idempotent() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        initialize(&connection).expect("Could not initialize database");
        initialize(&connection).expect("Second initialize should not error");
    }
}

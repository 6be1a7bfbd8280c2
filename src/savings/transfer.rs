//! The savings transfer engine: the single source of truth for moving money
//! between the main wallet and savings goals.
//!
//! The main wallet balance is derived, never stored: lifetime income minus
//! lifetime expenses. Moving money into a goal therefore writes a synthetic
//! expense row, and returning a deleted goal's balance writes a synthetic
//! income row, so that `wallet balance + total savings` is preserved by every
//! transfer. Each multi-write operation runs inside one SQLite transaction;
//! an error at any step rolls the whole operation back.
//!
//! The sufficient-funds check and the goal update deliberately share one
//! function and one transaction so a stricter isolation mode could be added
//! here without changing any caller.

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    expense::{insert_expense, total_expenses},
    html::format_currency,
    income::{insert_income, total_income},
    savings::{
        goal::{GoalId, GoalName, SavingsGoal, get_goal},
        log::{LogType, append_log},
    },
    user::UserID,
};

/// The money a user has on hand: lifetime income minus lifetime expenses,
/// excluding anything held in savings goals.
///
/// Recomputed from the ledger on every call; a user with no rows has a
/// balance of zero.
///
/// # Errors
/// This function will return an error only if a store query fails.
pub fn wallet_balance(user_id: UserID, connection: &Connection) -> Result<f64, Error> {
    let income = total_income(user_id, connection)?;
    let expenses = total_expenses(user_id, connection)?;

    Ok(income - expenses)
}

/// The sum of `current_amount` across all goals owned by `user_id`; zero if
/// the user has no goals.
///
/// # Errors
/// This function will return an error only if a store query fails.
pub fn total_savings(user_id: UserID, connection: &Connection) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(current_amount), 0) FROM savings_goal WHERE user_id = :user_id",
            &[(":user_id", &user_id.as_i64())],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create a new savings goal with nothing saved towards it yet.
///
/// A single insert; no transaction needed.
///
/// # Errors
/// Returns [Error::NonPositiveAmount] if `target_amount` is zero or
/// negative. (An empty name is rejected when constructing the [GoalName].)
pub fn create_goal(
    user_id: UserID,
    name: GoalName,
    target_amount: f64,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    if target_amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    connection.execute(
        "INSERT INTO savings_goal (user_id, name, target_amount, current_amount)
        VALUES (?1, ?2, ?3, 0)",
        (user_id.as_i64(), name.as_ref(), target_amount),
    )?;

    Ok(SavingsGoal {
        id: connection.last_insert_rowid(),
        user_id,
        name,
        target_amount,
        current_amount: 0.0,
    })
}

/// Move `amount` from the main wallet into a goal.
///
/// All steps run inside one transaction: look up the goal, check the wallet
/// holds at least `amount`, increment the goal, record the matching expense
/// row (dated `today`), and append a Deposit entry to the audit trail. If
/// any step fails nothing is written.
///
/// On success the wallet balance has decreased by exactly `amount` and the
/// goal's balance increased by the same, so the combined total is unchanged.
///
/// Note the funds check reads the balance inside the same transaction but
/// takes no lock; two concurrent deposits can both observe enough funds
/// before either commits.
///
/// # Errors
/// - [Error::NonPositiveAmount] if `amount` is zero or negative.
/// - [Error::DepositMissingGoal] if the goal does not exist or belongs to
///   another user.
/// - [Error::InsufficientFunds] if the wallet balance is less than `amount`.
/// - [Error::SqlError] if a write fails; prior writes are rolled back.
pub fn deposit_to_goal(
    user_id: UserID,
    goal_id: GoalId,
    amount: f64,
    today: Date,
    connection: &mut Connection,
) -> Result<SavingsGoal, Error> {
    if amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    // Dropping the transaction on any early return rolls everything back.
    let transaction = connection.transaction()?;

    let goal = match get_goal(goal_id, user_id, &transaction) {
        Ok(goal) => goal,
        Err(Error::NotFound) => return Err(Error::DepositMissingGoal),
        Err(error) => return Err(error),
    };

    let available = wallet_balance(user_id, &transaction)?;

    if available < amount {
        return Err(Error::InsufficientFunds { available });
    }

    let rows_affected = transaction.execute(
        "UPDATE savings_goal SET current_amount = current_amount + ?1
        WHERE id = ?2 AND user_id = ?3",
        (amount, goal_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DepositMissingGoal);
    }

    insert_expense(
        user_id,
        amount,
        &format!("Deposit to savings goal: {}", goal.name),
        today,
        &transaction,
    )?;

    append_log(
        user_id,
        Some(goal_id),
        LogType::Deposit,
        amount,
        &format!("Deposited {} to '{}'", format_currency(amount), goal.name),
        &transaction,
    )?;

    let updated_goal = get_goal(goal_id, user_id, &transaction)?;

    transaction.commit()?;

    Ok(updated_goal)
}

/// What a deleted goal returned to the wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalRefund {
    /// The name the deleted goal had.
    pub goal_name: GoalName,
    /// The amount returned to the main wallet. Zero for an unfunded goal.
    pub amount: f64,
}

/// Delete a goal and return its balance to the main wallet.
///
/// All steps run inside one transaction: read the goal's balance and name,
/// delete the row, record an income row for the refund (dated `today`,
/// skipped when the goal held nothing), and append a Return entry to the
/// audit trail with no goal reference since the goal no longer exists. If
/// any step fails nothing is written. A Return entry is written even for a
/// zero refund.
///
/// On success the wallet balance has increased by the goal's prior balance
/// and total savings decreased by the same, so the combined total is
/// unchanged. The goal ID is permanently invalid afterwards.
///
/// # Errors
/// - [Error::DeleteMissingGoal] if the goal does not exist or belongs to
///   another user.
/// - [Error::SqlError] if a write fails; prior writes are rolled back.
pub fn delete_goal(
    user_id: UserID,
    goal_id: GoalId,
    today: Date,
    connection: &mut Connection,
) -> Result<GoalRefund, Error> {
    let transaction = connection.transaction()?;

    let goal = match get_goal(goal_id, user_id, &transaction) {
        Ok(goal) => goal,
        Err(Error::NotFound) => return Err(Error::DeleteMissingGoal),
        Err(error) => return Err(error),
    };

    let rows_affected = transaction.execute(
        "DELETE FROM savings_goal WHERE id = ?1 AND user_id = ?2",
        (goal_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingGoal);
    }

    let refund = goal.current_amount;

    if refund > 0.0 {
        insert_income(
            user_id,
            refund,
            &format!("Amount returned from deleted savings goal: {}", goal.name),
            today,
            &transaction,
        )?;
    }

    append_log(
        user_id,
        None,
        LogType::Return,
        refund,
        &format!(
            "Amount returned ({}) from deleted goal: '{}'",
            format_currency(refund),
            goal.name
        ),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(GoalRefund {
        goal_name: goal.name,
        amount: refund,
    })
}

#[cfg(test)]
mod balance_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        expense::insert_expense,
        income::insert_income,
        savings::{GoalName, transfer::create_goal},
        user::UserID,
    };

    use super::{total_savings, wallet_balance};

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    #[test]
    fn wallet_balance_is_zero_without_rows() {
        let connection = get_db_connection();

        assert_eq!(wallet_balance(UserID::new(1), &connection), Ok(0.0));
    }

    #[test]
    fn wallet_balance_is_income_minus_expenses() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        insert_income(user_id, 600.0, "sales", date!(2025 - 07 - 01), &connection).unwrap();
        insert_income(user_id, 400.0, "sales", date!(2025 - 07 - 02), &connection).unwrap();
        insert_expense(user_id, 250.0, "stock", date!(2025 - 07 - 03), &connection).unwrap();
        insert_expense(user_id, 150.0, "rent", date!(2025 - 07 - 04), &connection).unwrap();

        assert_eq!(wallet_balance(user_id, &connection), Ok(600.0));
    }

    #[test]
    fn wallet_balance_ignores_other_users() {
        let connection = get_db_connection();
        insert_income(UserID::new(2), 1000.0, "sales", date!(2025 - 07 - 01), &connection)
            .unwrap();

        assert_eq!(wallet_balance(UserID::new(1), &connection), Ok(0.0));
    }

    #[test]
    fn total_savings_is_zero_without_goals() {
        let connection = get_db_connection();

        assert_eq!(total_savings(UserID::new(1), &connection), Ok(0.0));
    }

    #[test]
    fn repeated_reads_return_identical_results() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        insert_income(user_id, 123.45, "sales", date!(2025 - 07 - 01), &connection).unwrap();
        create_goal(user_id, GoalName::new_unchecked("Laptop"), 500.0, &connection).unwrap();

        assert_eq!(
            wallet_balance(user_id, &connection),
            wallet_balance(user_id, &connection)
        );
        assert_eq!(
            total_savings(user_id, &connection),
            total_savings(user_id, &connection)
        );
    }
}

#[cfg(test)]
mod create_goal_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        savings::{GoalName, get_goal},
        user::UserID,
    };

    use super::create_goal;

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    #[test]
    fn create_goal_starts_empty() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        let goal = create_goal(
            user_id,
            GoalName::new_unchecked("Laptop"),
            50_000.0,
            &connection,
        )
        .unwrap();

        assert!(goal.id > 0);
        assert_eq!(goal.current_amount, 0.0);
        assert_eq!(goal.target_amount, 50_000.0);
        assert_eq!(Ok(goal), get_goal(1, user_id, &connection));
    }

    #[test]
    fn create_goal_rejects_non_positive_target() {
        let connection = get_db_connection();

        let result = create_goal(
            UserID::new(1),
            GoalName::new_unchecked("Laptop"),
            0.0,
            &connection,
        );

        assert_eq!(result, Err(Error::NonPositiveAmount));
    }

    #[test]
    fn empty_goal_name_is_rejected_before_any_insert() {
        let connection = get_db_connection();

        assert_eq!(GoalName::new(""), Err(Error::EmptyGoalName));

        let goal_count: i64 = connection
            .query_row("SELECT COUNT(*) FROM savings_goal", [], |row| row.get(0))
            .unwrap();
        assert_eq!(goal_count, 0);
    }
}

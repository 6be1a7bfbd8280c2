//! The savings goal model and its read-side queries.
//!
//! Goal balances are only ever changed by the transfer engine
//! ([crate::savings::transfer]); nothing else writes to this table.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, user::UserID};

pub type GoalId = i64;

/// The name of a savings goal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalName(String);

impl GoalName {
    /// Create a goal name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyGoalName] if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyGoalName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a goal name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for GoalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for GoalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named savings target with progressively accumulated funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The user who owns the goal.
    pub user_id: UserID,
    /// The name of the goal, e.g. 'New Laptop'.
    pub name: GoalName,
    /// The amount the user is saving towards. Always positive.
    pub target_amount: f64,
    /// The amount saved so far. Never negative; may exceed the target.
    pub current_amount: f64,
}

impl SavingsGoal {
    /// Progress towards the target as a percentage, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 100.0;
        }

        ((self.current_amount / self.target_amount) * 100.0).min(100.0)
    }
}

pub fn create_savings_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS savings_goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            name TEXT NOT NULL,
            target_amount REAL NOT NULL,
            current_amount REAL NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_savings_goal_user ON savings_goal(user_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<SavingsGoal, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(SavingsGoal {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: GoalName::new_unchecked(&raw_name),
        target_amount: row.get(3)?,
        current_amount: row.get(4)?,
    })
}

/// Get a goal by ID, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to
/// another user.
pub fn get_goal(goal_id: GoalId, user_id: UserID, connection: &Connection) -> Result<SavingsGoal, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, target_amount, current_amount FROM savings_goal
            WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &goal_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all goals owned by `user_id`, newest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_goals(user_id: UserID, connection: &Connection) -> Result<Vec<SavingsGoal>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, target_amount, current_amount FROM savings_goal
            WHERE user_id = :user_id ORDER BY id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_goal| maybe_goal.map_err(|error| error.into()))
        .collect()
}

#[cfg(test)]
mod goal_name_tests {
    use crate::{Error, savings::GoalName};

    #[test]
    fn new_fails_on_empty_string() {
        assert_eq!(GoalName::new(""), Err(Error::EmptyGoalName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        assert_eq!(GoalName::new("\n\t \r"), Err(Error::EmptyGoalName));
    }

    #[test]
    fn new_succeeds_on_non_empty_string() {
        assert!(GoalName::new("New Laptop").is_ok());
    }
}

#[cfg(test)]
mod progress_tests {
    use crate::{
        savings::{GoalName, SavingsGoal},
        user::UserID,
    };

    fn goal(current: f64, target: f64) -> SavingsGoal {
        SavingsGoal {
            id: 1,
            user_id: UserID::new(1),
            name: GoalName::new_unchecked("Laptop"),
            target_amount: target,
            current_amount: current,
        }
    }

    #[test]
    fn progress_is_proportional() {
        assert_eq!(goal(25.0, 100.0).progress_percent(), 25.0);
    }

    #[test]
    fn progress_caps_at_one_hundred() {
        assert_eq!(goal(250.0, 100.0).progress_percent(), 100.0);
    }

    #[test]
    fn empty_goal_has_zero_progress() {
        assert_eq!(goal(0.0, 100.0).progress_percent(), 0.0);
    }
}

//! Savings goals: named targets funded from the main wallet.
//!
//! The transfer engine in [transfer] is the single source of truth for
//! moving money between the wallet and goals. The page and endpoint modules
//! only call into it and render the results.

mod create;
mod delete;
mod deposit;
mod goal;
mod log;
mod page;
pub mod transfer;

pub use create::create_goal_endpoint;
pub use delete::delete_goal_endpoint;
pub use deposit::deposit_endpoint;
pub use goal::{GoalId, GoalName, SavingsGoal, create_savings_goal_table, get_all_goals, get_goal};
pub use log::{
    LogType, SavingsLogEntry, count_logs, create_savings_log_table, get_logs_page,
};
pub use page::{SavingsPageState, get_savings_page};

//! The dashboard: summary cards, income/expense charts, upcoming bill and
//! low stock alerts, and the most recent ledger entries.

mod aggregation;
mod cards;
mod charts;
mod handlers;

pub use handlers::{DashboardState, get_dashboard_page};

//! The endpoint for deleting a savings goal and refunding its balance.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::Alert,
    html::format_currency,
    savings::{goal::GoalId, transfer::delete_goal},
    timezone::get_local_offset,
    user::UserID,
};

/// The state needed for deleting a savings goal.
#[derive(Debug, Clone)]
pub struct DeleteGoalEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Manila".
    pub local_timezone: String,
}

impl FromRef<AppState> for DeleteGoalEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for deleting a savings goal.
///
/// Runs the transfer engine's delete operation, which returns the goal's
/// balance to the main wallet before removing the goal.
pub async fn delete_goal_endpoint(
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    State(state): State<DeleteGoalEndpointState>,
) -> Response {
    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => {
            return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
        }
    };
    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_goal(user_id, goal_id, today, &mut connection) {
        Ok(refund) => Alert::Success {
            message: "Savings goal deleted".to_owned(),
            details: format!(
                "{} was returned from '{}' to your main wallet.",
                format_currency(refund.amount),
                refund.goal_name
            ),
        }
        .into_response(),
        Err(error @ Error::DeleteMissingGoal) => error.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting savings goal {goal_id}: {error}"
            );

            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_goal_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        income::insert_income,
        savings::{GoalName, transfer},
        test_utils::parse_html_fragment,
        user::UserID,
    };

    use super::{DeleteGoalEndpointState, delete_goal_endpoint};

    fn get_test_state() -> DeleteGoalEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        DeleteGoalEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn delete_goal_reports_refund() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let goal_id = {
            let mut connection = state.db_connection.lock().unwrap();
            insert_income(user_id, 500.0, "sales", date!(2025 - 07 - 01), &connection).unwrap();
            let goal = transfer::create_goal(
                user_id,
                GoalName::new_unchecked("Laptop"),
                50_000.0,
                &connection,
            )
            .unwrap();
            transfer::deposit_to_goal(user_id, goal.id, 300.0, date!(2025 - 07 - 02), &mut connection)
                .unwrap();
            goal.id
        };

        let response = delete_goal_endpoint(Extension(user_id), Path(goal_id), State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("₱300.00"));
        assert!(text.contains("Laptop"));

        let balance =
            transfer::wallet_balance(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(balance, 500.0);
    }

    #[tokio::test]
    async fn delete_missing_goal_returns_not_found() {
        let state = get_test_state();

        let response = delete_goal_endpoint(Extension(UserID::new(1)), Path(999), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

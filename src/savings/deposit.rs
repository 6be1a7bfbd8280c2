//! The endpoint for depositing money into a savings goal.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error, endpoints,
    savings::{goal::GoalId, transfer::deposit_to_goal},
    timezone::get_local_offset,
    user::UserID,
};

/// The state needed for depositing into a savings goal.
#[derive(Debug, Clone)]
pub struct DepositEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Manila".
    pub local_timezone: String,
}

impl FromRef<AppState> for DepositEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositFormData {
    pub amount: f64,
}

/// A route handler for depositing into a savings goal.
///
/// Runs the transfer engine's deposit operation and redirects back to the
/// savings page so the refreshed balances are shown.
pub async fn deposit_endpoint(
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    State(state): State<DepositEndpointState>,
    Form(form_data): Form<DepositFormData>,
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

    match deposit_to_goal(user_id, goal_id, form_data.amount, today, &mut connection) {
        Ok(_) => (
            HxRedirect(endpoints::SAVINGS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(
            error @ (Error::NonPositiveAmount
            | Error::InsufficientFunds { .. }
            | Error::DepositMissingGoal),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while depositing into goal {goal_id}: {error}"
            );

            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod deposit_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        endpoints,
        income::insert_income,
        savings::{GoalName, get_goal, transfer},
        test_utils::{assert_hx_redirect, parse_html_fragment},
        user::UserID,
    };

    use super::{DepositEndpointState, DepositFormData, deposit_endpoint};

    fn get_test_state() -> DepositEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        DepositEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    fn setup_goal(state: &DepositEndpointState, user_id: UserID, income: f64) -> i64 {
        let connection = state.db_connection.lock().unwrap();
        insert_income(user_id, income, "sales", date!(2025 - 07 - 01), &connection).unwrap();
        transfer::create_goal(user_id, GoalName::new_unchecked("Laptop"), 50_000.0, &connection)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn deposit_succeeds_and_redirects() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let goal_id = setup_goal(&state, user_id, 500.0);

        let response = deposit_endpoint(
            Extension(user_id),
            Path(goal_id),
            State(state.clone()),
            Form(DepositFormData { amount: 200.0 }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::SAVINGS_VIEW);

        let goal = get_goal(goal_id, user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(goal.current_amount, 200.0);
    }

    #[tokio::test]
    async fn deposit_shows_available_balance_when_funds_are_short() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let goal_id = setup_goal(&state, user_id, 100.0);

        let response = deposit_endpoint(
            Extension(user_id),
            Path(goal_id),
            State(state.clone()),
            Form(DepositFormData { amount: 250.0 }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Insufficient funds"));
        assert!(text.contains("₱100.00"), "available balance should be shown");

        let goal = get_goal(goal_id, user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(goal.current_amount, 0.0);
    }

    #[tokio::test]
    async fn deposit_into_missing_goal_returns_not_found() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        {
            let connection = state.db_connection.lock().unwrap();
            insert_income(user_id, 500.0, "sales", date!(2025 - 07 - 01), &connection).unwrap();
        }

        let response = deposit_endpoint(
            Extension(user_id),
            Path(999),
            State(state),
            Form(DepositFormData { amount: 100.0 }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! The endpoint for creating a new savings goal.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, endpoints,
    savings::{goal::GoalName, transfer::create_goal},
    user::UserID,
};

/// The state needed for creating a savings goal.
#[derive(Debug, Clone)]
pub struct CreateGoalEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateGoalEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGoalFormData {
    pub name: String,
    pub target_amount: f64,
}

/// A route handler for creating a new savings goal.
pub async fn create_goal_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<CreateGoalEndpointState>,
    Form(form_data): Form<CreateGoalFormData>,
) -> Response {
    let name = match GoalName::new(&form_data.name) {
        Ok(name) => name,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_goal(user_id, name, form_data.target_amount, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::SAVINGS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ Error::NonPositiveAmount) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a savings goal: {error}");

            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod create_goal_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        endpoints,
        savings::get_all_goals,
        test_utils::{assert_hx_redirect, parse_html_fragment},
        user::UserID,
    };

    use super::{CreateGoalEndpointState, CreateGoalFormData, create_goal_endpoint};

    fn get_test_state() -> CreateGoalEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        CreateGoalEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn can_create_goal() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let form = CreateGoalFormData {
            name: "Laptop".to_owned(),
            target_amount: 50_000.0,
        };

        let response = create_goal_endpoint(Extension(user_id), State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::SAVINGS_VIEW);

        let goals = get_all_goals(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].name.as_ref(), "Laptop");
        assert_eq!(goals[0].current_amount, 0.0);
    }

    #[tokio::test]
    async fn create_goal_fails_on_empty_name() {
        let state = get_test_state();
        let form = CreateGoalFormData {
            name: "".to_owned(),
            target_amount: 100.0,
        };

        let response =
            create_goal_endpoint(Extension(UserID::new(1)), State(state.clone()), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Goal name cannot be empty"));

        let goals = get_all_goals(UserID::new(1), &state.db_connection.lock().unwrap()).unwrap();
        assert!(goals.is_empty());
    }

    #[tokio::test]
    async fn create_goal_fails_on_non_positive_target() {
        let state = get_test_state();
        let form = CreateGoalFormData {
            name: "Laptop".to_owned(),
            target_amount: 0.0,
        };

        let response =
            create_goal_endpoint(Extension(UserID::new(1)), State(state.clone()), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let goals = get_all_goals(UserID::new(1), &state.db_connection.lock().unwrap()).unwrap();
        assert!(goals.is_empty());
    }
}

//! The create, delete, and pay endpoints for scheduled bills.

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
    AppState, Error,
    alert::Alert,
    bills::core::{BillId, NewBill, Recurrence, delete_bill, insert_bill, pay_bill},
    dates::parse_form_date,
    endpoints,
    html::format_currency,
    timezone::get_local_offset,
    user::UserID,
};

/// The state needed for the bill mutation endpoints.
#[derive(Debug, Clone)]
pub struct BillEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Manila".
    pub local_timezone: String,
}

impl FromRef<AppState> for BillEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBillFormData {
    pub name: String,
    pub amount: f64,
    pub due_date: String,
    pub recurrence: String,
    #[serde(default)]
    pub description: String,
}

/// A route handler for scheduling a new bill.
pub async fn create_bill_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<BillEndpointState>,
    Form(form_data): Form<CreateBillFormData>,
) -> Response {
    let due_date = match parse_form_date(&form_data.due_date) {
        Some(due_date) => due_date,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid due date".to_owned(),
                    details: "Enter the due date as YYYY-MM-DD.".to_owned(),
                }
                .into_html(),
            )
                .into_response();
        }
    };

    let recurrence = Recurrence::parse(&form_data.recurrence).unwrap_or(Recurrence::Once);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let new_bill = NewBill {
        name: form_data.name,
        amount: form_data.amount,
        due_date,
        recurrence,
        description: form_data.description,
    };

    match insert_bill(user_id, new_bill, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::BILLS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::EmptyBillName | Error::NonPositiveAmount)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while scheduling a bill: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for deleting a scheduled bill without paying it.
pub async fn delete_bill_endpoint(
    Extension(user_id): Extension<UserID>,
    Path(bill_id): Path<BillId>,
    State(state): State<BillEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_bill(bill_id, user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Bill deleted successfully".to_owned(),
        }
        .into_response(),
        Err(error @ Error::DeleteMissingBill) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while deleting bill {bill_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for paying a scheduled bill.
///
/// The payment is recorded as an expense; one-off bills are removed, while
/// recurring bills move to their next due date. Redirects back to the bills
/// page so the refreshed table is shown.
pub async fn pay_bill_endpoint(
    Extension(user_id): Extension<UserID>,
    Path(bill_id): Path<BillId>,
    State(state): State<BillEndpointState>,
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

    match pay_bill(user_id, bill_id, today, &mut connection) {
        Ok(paid) => {
            tracing::info!(
                "User {user_id} paid bill '{}' for {}",
                paid.name,
                format_currency(paid.amount)
            );

            (
                HxRedirect(endpoints::BILLS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ Error::PayMissingBill) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while paying bill {bill_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod bill_endpoint_tests {
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
        bills::core::{NewBill, Recurrence, get_all_bills, insert_bill},
        db::initialize,
        endpoints,
        expense::total_expenses,
        test_utils::assert_hx_redirect,
        user::UserID,
    };

    use super::{BillEndpointState, CreateBillFormData, create_bill_endpoint, delete_bill_endpoint, pay_bill_endpoint};

    fn get_test_state() -> BillEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        BillEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn can_create_bill() {
        let state = get_test_state();
        let user_id = UserID::new(1);

        let response = create_bill_endpoint(
            Extension(user_id),
            State(state.clone()),
            Form(CreateBillFormData {
                name: "Shop rent".to_owned(),
                amount: 5000.0,
                due_date: "2025-09-01".to_owned(),
                recurrence: "monthly".to_owned(),
                description: String::new(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::BILLS_VIEW);

        let bills = get_all_bills(user_id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].recurrence, Recurrence::Monthly);
    }

    #[tokio::test]
    async fn create_bill_rejects_bad_date() {
        let state = get_test_state();

        let response = create_bill_endpoint(
            Extension(UserID::new(1)),
            State(state.clone()),
            Form(CreateBillFormData {
                name: "Shop rent".to_owned(),
                amount: 5000.0,
                due_date: "not-a-date".to_owned(),
                recurrence: "monthly".to_owned(),
                description: String::new(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bills = get_all_bills(UserID::new(1), &state.db_connection.lock().unwrap()).unwrap();
        assert!(bills.is_empty());
    }

    #[tokio::test]
    async fn pay_bill_records_expense_and_redirects() {
        let state = get_test_state();
        let user_id = UserID::new(1);
        let bill_id = {
            let connection = state.db_connection.lock().unwrap();
            insert_bill(
                user_id,
                NewBill {
                    name: "Electricity".to_owned(),
                    amount: 1200.0,
                    due_date: date!(2025 - 08 - 01),
                    recurrence: Recurrence::Once,
                    description: String::new(),
                },
                &connection,
            )
            .unwrap()
            .id
        };

        let response = pay_bill_endpoint(Extension(user_id), Path(bill_id), State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::BILLS_VIEW);
        assert_eq!(
            total_expenses(user_id, &state.db_connection.lock().unwrap()),
            Ok(1200.0)
        );
    }

    #[tokio::test]
    async fn delete_missing_bill_returns_not_found() {
        let state = get_test_state();

        let response = delete_bill_endpoint(Extension(UserID::new(1)), Path(999), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

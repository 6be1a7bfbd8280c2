//! The edit page and update endpoint for a scheduled bill.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    alert::Alert,
    bills::core::{BillId, NewBill, Recurrence, ScheduledBill, get_bill, update_bill},
    dates::parse_form_date,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    user::UserID,
};

/// The state needed for the edit bill page and the update endpoint.
#[derive(Debug, Clone)]
pub struct EditBillState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditBillState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn edit_bill_form_view(update_endpoint: &str, bill: &ScheduledBill, error_message: &str) -> Markup {
    html! {
        form
            hx-put=(update_endpoint)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Bill Name" }
                input id="name" type="text" name="name" value=(bill.name) required
                    autofocus class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                input id="amount" type="number" name="amount" step="0.01" min="0.01"
                    value=(format!("{:.2}", bill.amount)) required class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="due_date" class=(FORM_LABEL_STYLE) { "Due Date" }
                input id="due_date" type="date" name="due_date" value=(bill.due_date)
                    required class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="recurrence" class=(FORM_LABEL_STYLE) { "Repeats" }
                select id="recurrence" name="recurrence" class=(FORM_SELECT_STYLE)
                {
                    @for option in Recurrence::ALL {
                        option value=(option.as_str()) selected[option == bill.recurrence]
                        {
                            (option)
                        }
                    }
                }
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Notes" }
                input id="description" type="text" name="description"
                    value=(bill.description) class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex items-center gap-x-3"
            {
                input type="checkbox" name="is_paid" id="is_paid" checked[bill.is_paid]
                    class="rounded-xs";
                label for="is_paid" class=(FORM_LABEL_STYLE) { "Mark as paid" }
            }

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Bill" }
        }
    }
}

fn edit_bill_view(bill: &ScheduledBill, error_message: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::BILLS_VIEW).into_html();
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_BILL, bill.id);
    let form = edit_bill_form_view(&update_endpoint, bill, error_message);

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Bill", &[], &content)
}

/// Route handler for the edit bill page.
pub async fn get_edit_bill_page(
    Extension(user_id): Extension<UserID>,
    Path(bill_id): Path<BillId>,
    State(state): State<EditBillState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let bill = get_bill(bill_id, user_id, &connection)?;

    Ok(edit_bill_view(&bill, "").into_response())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditBillFormData {
    pub name: String,
    pub amount: f64,
    pub due_date: String,
    pub recurrence: String,
    #[serde(default)]
    pub description: String,
    /// Checkbox field: present when checked, absent otherwise.
    pub is_paid: Option<String>,
}

/// A route handler for updating a scheduled bill.
pub async fn update_bill_endpoint(
    Extension(user_id): Extension<UserID>,
    Path(bill_id): Path<BillId>,
    State(state): State<EditBillState>,
    Form(form_data): Form<EditBillFormData>,
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

    let recurrence = match Recurrence::parse(&form_data.recurrence) {
        Some(recurrence) => recurrence,
        None => Recurrence::Once,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let updated = NewBill {
        name: form_data.name,
        amount: form_data.amount,
        due_date,
        recurrence,
        description: form_data.description,
    };

    match update_bill(bill_id, user_id, updated, form_data.is_paid.is_some(), &connection) {
        Ok(()) => (
            HxRedirect(endpoints::BILLS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::EmptyBillName | Error::NonPositiveAmount | Error::UpdateMissingBill)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating bill {bill_id}: {error}");
            error.into_alert_response()
        }
    }
}

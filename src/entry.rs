//! The page and endpoints for recording income and expense entries.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    alert::Alert,
    dates::parse_form_date,
    endpoints,
    expense::insert_expense,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        currency_input_styles,
    },
    income::insert_income,
    navigation::NavBar,
    timezone::get_local_offset,
    user::{UserID, get_user_by_id},
};

/// The state needed for the entry page and its endpoints.
#[derive(Debug, Clone)]
pub struct EntryState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Manila".
    pub local_timezone: String,
}

impl FromRef<AppState> for EntryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Display the page for recording a new income or expense entry.
pub async fn get_new_entry_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<EntryState>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let currency = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_user_by_id(user_id, &connection)?.currency
    };

    Ok(new_entry_view(NavBar::new(endpoints::NEW_ENTRY_VIEW), &currency, today).into_response())
}

fn new_entry_view(nav_bar: NavBar, currency: &str, today: Date) -> Markup {
    let nav_bar = nav_bar.into_html();
    let head_elements = [currency_input_styles(currency)];

    let content = html!(
        (nav_bar)

        div class="flex flex-col px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-xl text-gray-900 dark:text-white"
        {
            div class="grid grid-cols-1 md:grid-cols-2 gap-6"
            {
                (entry_form_card(
                    "Record Income",
                    "e.g. Store sales",
                    endpoints::POST_INCOME,
                    today,
                ))
                (entry_form_card(
                    "Record Expense",
                    "e.g. Supplier delivery",
                    endpoints::POST_EXPENSE,
                    today,
                ))
            }
        }
    );

    base("New Entry", &head_elements, &content)
}

fn entry_form_card(title: &str, placeholder: &str, post_endpoint: &str, today: Date) -> Markup {
    html!(
        div class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold mb-4" { (title) }

            form
                hx-post=(post_endpoint)
                hx-target-error="#alert-container"
                class="space-y-4"
            {
                div
                {
                    label class=(FORM_LABEL_STYLE) { "Amount" }
                    div class="input-wrapper"
                    {
                        input type="number" name="amount" step="0.01" min="0.01" required
                            class=(FORM_TEXT_INPUT_STYLE);
                    }
                }

                div
                {
                    label class=(FORM_LABEL_STYLE) { "Description" }
                    input type="text" name="description" placeholder=(placeholder)
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label class=(FORM_LABEL_STYLE) { "Date" }
                    input type="date" name="date" value=(today) class=(FORM_TEXT_INPUT_STYLE);
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { (title) }
            }
        }
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntryFormData {
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    /// Optional; defaults to today in the configured local timezone.
    #[serde(default)]
    pub date: String,
}

enum EntryKind {
    Income,
    Expense,
}

fn record_entry(
    kind: EntryKind,
    user_id: UserID,
    state: EntryState,
    form_data: EntryFormData,
) -> Response {
    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => {
            return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
        }
    };

    let date = if form_data.date.trim().is_empty() {
        OffsetDateTime::now_utc().to_offset(local_offset).date()
    } else {
        match parse_form_date(&form_data.date) {
            Some(date) => date,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Alert::Error {
                        message: "Invalid date".to_owned(),
                        details: "Enter the date as YYYY-MM-DD.".to_owned(),
                    }
                    .into_html(),
                )
                    .into_response();
            }
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = match kind {
        EntryKind::Income => insert_income(
            user_id,
            form_data.amount,
            &form_data.description,
            date,
            &connection,
        )
        .map(|_| ()),
        EntryKind::Expense => insert_expense(
            user_id,
            form_data.amount,
            &form_data.description,
            date,
            &connection,
        )
        .map(|_| ()),
    };

    match result {
        Ok(()) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ Error::NonPositiveAmount) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while recording an entry: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler for recording an income entry.
pub async fn create_income_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<EntryState>,
    Form(form_data): Form<EntryFormData>,
) -> Response {
    record_entry(EntryKind::Income, user_id, state, form_data)
}

/// A route handler for recording an expense entry.
pub async fn create_expense_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<EntryState>,
    Form(form_data): Form<EntryFormData>,
) -> Response {
    record_entry(EntryKind::Expense, user_id, state, form_data)
}

#[cfg(test)]
mod entry_endpoint_tests {
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
        expense::total_expenses,
        income::total_income,
        test_utils::assert_hx_redirect,
        user::UserID,
    };

    use super::{EntryFormData, EntryState, create_expense_endpoint, create_income_endpoint};

    fn get_test_state() -> EntryState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        EntryState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn records_income_with_explicit_date() {
        let state = get_test_state();
        let user_id = UserID::new(1);

        let response = create_income_endpoint(
            Extension(user_id),
            State(state.clone()),
            Form(EntryFormData {
                amount: 150.0,
                description: "Store sales".to_owned(),
                date: "2025-07-20".to_owned(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::TRANSACTIONS_VIEW);
        assert_eq!(
            total_income(user_id, &state.db_connection.lock().unwrap()),
            Ok(150.0)
        );
    }

    #[tokio::test]
    async fn records_expense_defaulting_to_today() {
        let state = get_test_state();
        let user_id = UserID::new(1);

        let response = create_expense_endpoint(
            Extension(user_id),
            State(state.clone()),
            Form(EntryFormData {
                amount: 75.0,
                description: String::new(),
                date: String::new(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            total_expenses(user_id, &state.db_connection.lock().unwrap()),
            Ok(75.0)
        );
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let state = get_test_state();
        let user_id = UserID::new(1);

        let response = create_income_endpoint(
            Extension(user_id),
            State(state.clone()),
            Form(EntryFormData {
                amount: 0.0,
                description: String::new(),
                date: String::new(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            total_income(user_id, &state.db_connection.lock().unwrap()),
            Ok(0.0)
        );
    }

    #[tokio::test]
    async fn rejects_malformed_dates() {
        let state = get_test_state();

        let response = create_income_endpoint(
            Extension(UserID::new(1)),
            State(state),
            Form(EntryFormData {
                amount: 10.0,
                description: String::new(),
                date: "20/07/2025".to_owned(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

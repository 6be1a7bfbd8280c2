//! The user settings page: business info, monthly targets, and dashboard
//! preferences, plus a link to the change-password page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    alert::Alert,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base, link,
    },
    navigation::NavBar,
    user::{
        UserID, get_user_by_id, update_business_info, update_dashboard_preference, update_targets,
    },
};

/// Currency symbols offered in the settings form.
const CURRENCY_CHOICES: [&str; 4] = ["₱", "$", "€", "¥"];

/// The state needed for the settings page and its endpoints.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the settings page for the logged-in user.
pub async fn get_settings_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<SettingsState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;

    let nav_bar = if user.is_admin {
        NavBar::new(endpoints::SETTINGS_VIEW).with_admin_link(endpoints::SETTINGS_VIEW)
    } else {
        NavBar::new(endpoints::SETTINGS_VIEW)
    };

    Ok(settings_view(
        nav_bar,
        &user.business_name,
        &user.currency,
        user.monthly_income_target,
        user.monthly_expense_target,
        user.show_inventory_overview,
    )
    .into_response())
}

fn settings_view(
    nav_bar: NavBar,
    business_name: &str,
    currency: &str,
    monthly_income_target: f64,
    monthly_expense_target: f64,
    show_inventory_overview: bool,
) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div class="flex flex-col px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-md text-gray-900 dark:text-white space-y-6"
        {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-4" { "Business Information" }

                form
                    hx-post=(endpoints::UPDATE_BUSINESS_INFO)
                    hx-target-error="#alert-container"
                    class="space-y-4"
                {
                    div
                    {
                        label for="business_name" class=(FORM_LABEL_STYLE) { "Business Name" }
                        input id="business_name" type="text" name="business_name"
                            value=(business_name) required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="currency" class=(FORM_LABEL_STYLE) { "Currency Symbol" }
                        select id="currency" name="currency" class=(FORM_SELECT_STYLE)
                        {
                            @for choice in CURRENCY_CHOICES {
                                option value=(choice) selected[choice == currency] { (choice) }
                            }
                        }
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Business Info" }
                }
            }

            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-4" { "Monthly Targets" }
                p class="text-sm text-gray-500 dark:text-gray-400 mb-4"
                {
                    "Set a target to see progress bars on the dashboard. Zero disables a target."
                }

                form
                    hx-post=(endpoints::UPDATE_TARGETS)
                    hx-target-error="#alert-container"
                    class="space-y-4"
                {
                    div
                    {
                        label for="monthly_income_target" class=(FORM_LABEL_STYLE)
                        {
                            "Monthly Income Target"
                        }
                        input id="monthly_income_target" type="number" name="monthly_income_target"
                            step="0.01" min="0" value=(format!("{monthly_income_target:.2}"))
                            required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="monthly_expense_target" class=(FORM_LABEL_STYLE)
                        {
                            "Monthly Expense Target"
                        }
                        input id="monthly_expense_target" type="number" name="monthly_expense_target"
                            step="0.01" min="0" value=(format!("{monthly_expense_target:.2}"))
                            required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Targets" }
                }
            }

            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-4" { "Dashboard Preferences" }

                form
                    hx-post=(endpoints::UPDATE_DASHBOARD_PREFS)
                    hx-target-error="#alert-container"
                    class="space-y-4"
                {
                    div class="flex items-center gap-x-3"
                    {
                        input type="checkbox" name="show_inventory_overview"
                            id="show_inventory_overview" checked[show_inventory_overview]
                            class="rounded-xs";

                        label for="show_inventory_overview" class=(FORM_LABEL_STYLE)
                        {
                            "Show the inventory overview card on the dashboard"
                        }
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Preferences" }
                }
            }

            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-2" { "Password" }
                p { (link(endpoints::CHANGE_PASSWORD_VIEW, "Change your password")) }
            }
        }
    );

    base("Settings", &[], &content)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BusinessInfoFormData {
    pub business_name: String,
    pub currency: String,
}

/// A route handler for updating the business name and currency.
pub async fn update_business_info_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<SettingsState>,
    Form(form_data): Form<BusinessInfoFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_business_info(user_id, &form_data.business_name, &form_data.currency, &connection)
    {
        Ok(()) => Alert::SuccessSimple {
            message: "Business information updated.".to_owned(),
        }
        .into_response(),
        Err(error @ (Error::EmptyBusinessName | Error::UpdateMissingUser)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating business info: {error}");
            error.into_alert_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TargetsFormData {
    pub monthly_income_target: f64,
    pub monthly_expense_target: f64,
}

/// A route handler for updating the monthly income/expense targets.
pub async fn update_targets_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<SettingsState>,
    Form(form_data): Form<TargetsFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_targets(
        user_id,
        form_data.monthly_income_target,
        form_data.monthly_expense_target,
        &connection,
    ) {
        Ok(()) => Alert::SuccessSimple {
            message: "Monthly targets updated.".to_owned(),
        }
        .into_response(),
        Err(error @ (Error::NegativeTarget | Error::UpdateMissingUser)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating targets: {error}");
            error.into_alert_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardPrefsFormData {
    /// Checkbox field: present when checked, absent otherwise.
    pub show_inventory_overview: Option<String>,
}

/// A route handler for updating dashboard preferences.
pub async fn update_dashboard_prefs_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<SettingsState>,
    Form(form_data): Form<DashboardPrefsFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_dashboard_preference(
        user_id,
        form_data.show_inventory_overview.is_some(),
        &connection,
    ) {
        Ok(()) => Alert::SuccessSimple {
            message: "Dashboard preferences updated.".to_owned(),
        }
        .into_response(),
        Err(error @ Error::UpdateMissingUser) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating preferences: {error}");
            error.into_alert_response()
        }
    }
}

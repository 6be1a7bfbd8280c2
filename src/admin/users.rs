//! The admin users page and the account lifecycle endpoints.
//!
//! Administrators can activate/deactivate accounts, grant or revoke admin
//! access, set or clear expiration dates, reset passwords (which forces the
//! user to choose a new one at next log-in), and toggle the forced change
//! flag directly.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    AppState, Error,
    alert::Alert,
    dates::{format_form_date_time, parse_form_date_time},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    password::{PasswordHash, ValidatedPassword},
    user::{
        AccountStatus, User, UserID, get_all_users, get_user_by_id, set_account_status, set_admin,
        set_expiration, set_needs_password_change, update_password,
    },
};

/// The state needed for the admin users page and its endpoints.
#[derive(Debug, Clone)]
pub struct AdminUsersState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminUsersState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the admin users page.
pub async fn get_admin_users_page(
    State(state): State<AdminUsersState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let users = get_all_users(&connection)?;

    Ok(admin_users_view(
        NavBar::new(endpoints::ADMIN_USERS_VIEW).with_admin_link(endpoints::ADMIN_USERS_VIEW),
        &users,
    )
    .into_response())
}

fn admin_users_view(nav_bar: NavBar, users: &[User]) -> Markup {
    let nav_bar = nav_bar.into_html();
    let active_count = users
        .iter()
        .filter(|user| user.status == AccountStatus::Active)
        .count();
    let inactive_count = users
        .iter()
        .filter(|user| user.status == AccountStatus::Inactive)
        .count();
    let expired_count = users
        .iter()
        .filter(|user| user.status == AccountStatus::Expired)
        .count();

    let content = html!(
        (nav_bar)

        div class="flex flex-col px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-xl text-gray-900 dark:text-white"
        {
            h2 class="text-2xl font-bold mb-4" { "User Accounts" }

            section class="grid grid-cols-2 md:grid-cols-4 gap-4 w-full mx-auto mb-6"
            {
                (stat_card("Total", users.len()))
                (stat_card("Active", active_count))
                (stat_card("Inactive", inactive_count))
                (stat_card("Expired", expired_count))
            }

            div class="relative overflow-x-auto shadow-md rounded mb-8"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class="px-6 py-3" { "ID" }
                            th scope="col" class="px-6 py-3" { "Username" }
                            th scope="col" class="px-6 py-3" { "Email" }
                            th scope="col" class="px-6 py-3" { "Admin" }
                            th scope="col" class="px-6 py-3" { "Status" }
                            th scope="col" class="px-6 py-3" { "Expires" }
                            th scope="col" class="px-6 py-3" { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for user in users {
                            (user_row(user))
                        }
                    }
                }
            }
        }
    );

    base("Admin", &[], &content)
}

fn stat_card(label: &str, count: usize) -> Markup {
    html!(
        div class=(CARD_STYLE)
        {
            h3 class="text-sm font-semibold text-gray-500 dark:text-gray-400 uppercase" { (label) }
            p class="text-3xl font-bold mt-1" { (count) }
        }
    )
}

fn user_row(user: &User) -> Markup {
    let status_endpoint = endpoints::format_endpoint(endpoints::ADMIN_USER_STATUS, user.id.as_i64());
    let admin_endpoint = endpoints::format_endpoint(endpoints::ADMIN_USER_ADMIN, user.id.as_i64());
    let expiration_endpoint =
        endpoints::format_endpoint(endpoints::ADMIN_USER_EXPIRATION, user.id.as_i64());
    let password_endpoint =
        endpoints::format_endpoint(endpoints::ADMIN_USER_PASSWORD, user.id.as_i64());
    let force_password_endpoint =
        endpoints::format_endpoint(endpoints::ADMIN_USER_FORCE_PASSWORD, user.id.as_i64());

    let status_style = match user.status {
        AccountStatus::Active => "font-bold text-green-600 dark:text-green-400",
        AccountStatus::Inactive => "font-bold text-red-600 dark:text-red-400",
        AccountStatus::Expired => "font-bold text-amber-600 dark:text-amber-400",
    };
    let toggle_status_label = if user.status == AccountStatus::Active {
        "Deactivate"
    } else {
        "Activate"
    };
    let toggle_admin_label = if user.is_admin {
        "Revoke admin"
    } else {
        "Make admin"
    };
    let toggle_force_label = if user.needs_password_change {
        "Clear password flag"
    } else {
        "Require new password"
    };

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (user.id) }

            td class="px-6 py-4 font-medium text-gray-900 dark:text-white" { (user.username) }

            td class=(TABLE_CELL_STYLE) { (user.email) }

            td class=(TABLE_CELL_STYLE)
            {
                @if user.is_admin { "Yes" } @else { "No" }
            }

            td class=(TABLE_CELL_STYLE)
            {
                span class=(status_style) { (user.status) }

                @if user.needs_password_change {
                    span class="ms-2 text-xs text-gray-500" { "(must change password)" }
                }
            }

            td class=(TABLE_CELL_STYLE)
            {
                @match user.expiration {
                    Some(expiration) => { (expiration.date()) " " (expiration.time()) }
                    None => { "N/A" }
                }
            }

            td class="px-6 py-4 space-y-2"
            {
                div class="space-x-3 whitespace-nowrap"
                {
                    button hx-post=(status_endpoint) hx-target-error="#alert-container"
                        class=(LINK_STYLE)
                    {
                        (toggle_status_label)
                    }

                    button hx-post=(admin_endpoint) hx-target-error="#alert-container"
                        class=(LINK_STYLE)
                    {
                        (toggle_admin_label)
                    }

                    button hx-post=(force_password_endpoint) hx-target-error="#alert-container"
                        class=(LINK_STYLE)
                    {
                        (toggle_force_label)
                    }
                }

                form
                    hx-post=(expiration_endpoint)
                    hx-target-error="#alert-container"
                    class="flex gap-2 items-center"
                {
                    input type="datetime-local" name="expiration"
                        value=[user.expiration.map(|expiration| format_form_date_time(
                            PrimitiveDateTime::new(expiration.date(), expiration.time())
                        ))]
                        class=(FORM_TEXT_INPUT_STYLE);
                    button type="submit" class=(LINK_STYLE) { "Set expiry" }
                }

                form
                    hx-post=(password_endpoint)
                    hx-target-error="#alert-container"
                    class="flex gap-2 items-center"
                {
                    input type="password" name="new_password" placeholder="Temporary password"
                        required class=(FORM_TEXT_INPUT_STYLE);
                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Reset password" }
                }
            }
        }
    )
}

fn refresh_admin_users_page() -> Response {
    (
        HxRedirect(endpoints::ADMIN_USERS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler that flips a user between active and inactive.
///
/// Expired accounts are reactivated; pair with clearing or extending the
/// expiration date.
pub async fn toggle_status_endpoint(
    Path(target_id): Path<i64>,
    State(state): State<AdminUsersState>,
) -> Response {
    let target_id = UserID::new(target_id);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(target_id, &connection) {
        Ok(user) => user,
        Err(error) => return error.into_alert_response(),
    };

    let new_status = if user.status == AccountStatus::Active {
        AccountStatus::Inactive
    } else {
        AccountStatus::Active
    };

    match set_account_status(target_id, new_status, &connection) {
        Ok(()) => refresh_admin_users_page(),
        Err(error) => {
            tracing::error!("could not set status for user {target_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler that grants or revokes admin access.
pub async fn toggle_admin_endpoint(
    Path(target_id): Path<i64>,
    State(state): State<AdminUsersState>,
) -> Response {
    let target_id = UserID::new(target_id);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(target_id, &connection) {
        Ok(user) => user,
        Err(error) => return error.into_alert_response(),
    };

    match set_admin(target_id, !user.is_admin, &connection) {
        Ok(()) => refresh_admin_users_page(),
        Err(error) => {
            tracing::error!("could not toggle admin for user {target_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// A route handler that sets or clears the forced password change flag.
pub async fn toggle_force_password_change_endpoint(
    Path(target_id): Path<i64>,
    State(state): State<AdminUsersState>,
) -> Response {
    let target_id = UserID::new(target_id);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(target_id, &connection) {
        Ok(user) => user,
        Err(error) => return error.into_alert_response(),
    };

    match set_needs_password_change(target_id, !user.needs_password_change, &connection) {
        Ok(()) => refresh_admin_users_page(),
        Err(error) => {
            tracing::error!("could not toggle password flag for user {target_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpirationFormData {
    /// Empty clears the expiration.
    #[serde(default)]
    pub expiration: String,
}

/// A route handler that sets or clears a user's expiration date.
pub async fn set_expiration_endpoint(
    Path(target_id): Path<i64>,
    State(state): State<AdminUsersState>,
    Form(form_data): Form<ExpirationFormData>,
) -> Response {
    let target_id = UserID::new(target_id);

    let expiration = if form_data.expiration.trim().is_empty() {
        None
    } else {
        match parse_form_date_time(&form_data.expiration) {
            Some(date_time) => Some(date_time.assume_utc()),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Alert::Error {
                        message: "Invalid expiration date".to_owned(),
                        details: "Enter the expiration as YYYY-MM-DDTHH:MM, or leave it empty \
                            to clear it."
                            .to_owned(),
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

    match set_expiration(target_id, expiration, &connection) {
        Ok(()) => refresh_admin_users_page(),
        Err(error @ Error::UpdateMissingUser) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not set expiration for user {target_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordFormData {
    pub new_password: String,
}

/// A route handler that resets a user's password to a temporary one.
///
/// The account is flagged so the user must choose their own password at the
/// next log-in.
pub async fn reset_password_endpoint(
    Path(target_id): Path<i64>,
    State(state): State<AdminUsersState>,
    Form(form_data): Form<ResetPasswordFormData>,
) -> Response {
    let target_id = UserID::new(target_id);

    let validated_password = match ValidatedPassword::new(&form_data.new_password) {
        Ok(password) => password,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Password too weak".to_owned(),
                    details: error.to_string(),
                }
                .into_html(),
            )
                .into_response();
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return error.into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_password(target_id, &password_hash, true, &connection) {
        Ok(()) => {
            tracing::info!("Password reset for user {target_id} at {}", OffsetDateTime::now_utc());

            Alert::Success {
                message: "Password reset".to_owned(),
                details: "The user must choose a new password at their next log-in.".to_owned(),
            }
            .into_response()
        }
        Err(error @ Error::UpdateMissingUser) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not reset password for user {target_id}: {error}");
            error.into_alert_response()
        }
    }
}

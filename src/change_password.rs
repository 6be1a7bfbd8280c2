//! The change-password page and endpoint.
//!
//! Serves two flows: a voluntary change (current password required) and the
//! forced change applied after an administrator resets an account. The
//! forced flow skips the current-password check, since the user just proved
//! the temporary password at log-in, and clears the flag on success.

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

use crate::{
    AppState, Error,
    alert::Alert,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, password_input},
    internal_server_error::get_internal_server_error_redirect,
    navigation::NavBar,
    password::{PasswordHash, ValidatedPassword},
    user::{UserID, get_user_by_id, update_password},
};

/// The state needed for the change-password page and endpoint.
#[derive(Debug, Clone)]
pub struct ChangePasswordState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChangePasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn change_password_form(
    require_current: bool,
    current_error: Option<&str>,
    new_error: Option<&str>,
    confirm_error: Option<&str>,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::CHANGE_PASSWORD_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            @if require_current {
                (password_input("current_password", "Current Password", 0, current_error))
            } @else {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Your account requires a new password before you can continue."
                }
            }

            (password_input("new_password", "New Password", 14, new_error))
            (password_input("confirm_new_password", "Confirm New Password", 14, confirm_error))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Change Password" }
        }
    }
}

fn change_password_view(require_current: bool) -> Markup {
    let nav_bar = NavBar::new(endpoints::CHANGE_PASSWORD_VIEW).into_html();
    let form = change_password_form(require_current, None, None, None);

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Change Password" }
            (form)
        }
    };

    base("Change Password", &[], &content)
}

/// Display the change-password page.
pub async fn get_change_password_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<ChangePasswordState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;

    Ok(change_password_view(!user.needs_password_change).into_response())
}

#[derive(Serialize, Deserialize)]
pub struct ChangePasswordForm {
    /// Absent in the forced-change flow.
    pub current_password: Option<String>,
    pub new_password: String,
    pub confirm_new_password: String,
}

/// A route handler for changing the logged-in user's password.
pub async fn change_password_endpoint(
    Extension(user_id): Extension<UserID>,
    State(state): State<ChangePasswordState>,
    Form(form_data): Form<ChangePasswordForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(error) => {
            tracing::error!("could not load user {user_id} to change password: {error}");
            return error.into_alert_response();
        }
    };

    let was_forced = user.needs_password_change;

    if !was_forced {
        let current_password = form_data.current_password.as_deref().unwrap_or_default();

        match user.password_hash.verify(current_password) {
            Ok(true) => {}
            Ok(false) => {
                return change_password_form(
                    true,
                    Some("The current password you entered is incorrect."),
                    None,
                    None,
                )
                .into_response();
            }
            Err(error) => {
                tracing::error!("error verifying current password: {error}");
                return get_internal_server_error_redirect();
            }
        }
    }

    let validated_password = match ValidatedPassword::new(&form_data.new_password) {
        Ok(password) => password,
        Err(error) => {
            return change_password_form(!was_forced, None, Some(&error.to_string()), None)
                .into_response();
        }
    };

    if form_data.new_password != form_data.confirm_new_password {
        return change_password_form(!was_forced, None, None, Some("New passwords do not match"))
            .into_response();
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return get_internal_server_error_redirect();
        }
    };

    if let Err(error) = update_password(user_id, &password_hash, false, &connection) {
        tracing::error!("could not update password for user {user_id}: {error}");
        return error.into_alert_response();
    }

    if was_forced {
        let destination = if user.is_admin {
            endpoints::ADMIN_USERS_VIEW
        } else {
            endpoints::DASHBOARD_VIEW
        };

        (
            HxRedirect(destination.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response()
    } else {
        Alert::SuccessSimple {
            message: "Your password has been changed.".to_owned(),
        }
        .into_response()
    }
}

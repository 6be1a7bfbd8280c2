//! The registration page and endpoint for creating a new account.
//!
//! New accounts start a 24 hour preview period; an administrator extends or
//! clears the expiration from the admin panel.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    endpoints,
    html::{
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner, log_in_register,
        password_input,
    },
    internal_server_error::get_internal_server_error_redirect,
    password::{PasswordHash, ValidatedPassword},
    user::{NewUser, Username, create_user, username_or_email_taken},
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 14;

/// How long a freshly registered account may be used before an administrator
/// must extend it.
const PREVIEW_PERIOD: Duration = Duration::hours(24);

fn text_input(name: &str, label: &str, input_type: &str, value: &str, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for=(name)
                class=(FORM_LABEL_STYLE)
            {
                (label)
            }

            input
                id=(name)
                type=(input_type)
                name=(name)
                placeholder=(label)
                value=(value)
                required
                class=(FORM_TEXT_INPUT_STYLE);

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

struct RegistrationFormErrors<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

impl Default for RegistrationFormErrors<'_> {
    fn default() -> Self {
        Self {
            username: None,
            email: None,
            password: None,
            confirm_password: None,
        }
    }
}

fn registration_form(username: &str, email: &str, errors: RegistrationFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #email, #password, #confirm_password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", "text", username, errors.username))
            (text_input("email", "Email", "email", email, errors.email))
            (password_input("password", "Password", PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (password_input(
                "confirm_password",
                "Confirm Password",
                PASSWORD_INPUT_MIN_LENGTH,
                errors.confirm_password,
            ))

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form("", "", RegistrationFormErrors::default());
    let content = log_in_register("Create your account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let username = match Username::new(&user_data.username) {
        Ok(username) => username,
        Err(error) => {
            return registration_form(
                &user_data.username,
                &user_data.email,
                RegistrationFormErrors {
                    username: Some(&error.to_string()),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    let email = user_data.email.trim().to_owned();
    if email.is_empty() || !email.contains('@') {
        return registration_form(
            username.as_ref(),
            &email,
            RegistrationFormErrors {
                email: Some("Enter a valid email address"),
                ..Default::default()
            },
        )
        .into_response();
    }

    let taken = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return get_internal_server_error_redirect();
            }
        };

        username_or_email_taken(username.as_ref(), &email, &connection)
    };

    match taken {
        Ok(true) => {
            return registration_form(
                username.as_ref(),
                &email,
                RegistrationFormErrors {
                    username: Some("Username or email already exists. Please choose a different one."),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Ok(false) => {}
        Err(error) => {
            tracing::error!("could not check for duplicate users: {error}");
            return get_internal_server_error_redirect();
        }
    }

    let validated_password = match ValidatedPassword::new(&user_data.password) {
        Ok(password) => password,
        Err(error) => {
            return registration_form(
                username.as_ref(),
                &email,
                RegistrationFormErrors {
                    password: Some(&error.to_string()),
                    ..Default::default()
                },
            )
            .into_response();
        }
    };

    if user_data.password != user_data.confirm_password {
        return registration_form(
            username.as_ref(),
            &email,
            RegistrationFormErrors {
                confirm_password: Some("Passwords do not match"),
                ..Default::default()
            },
        )
        .into_response();
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("an error occurred while hashing a password: {e}");

            return get_internal_server_error_redirect();
        }
    };

    let new_user = NewUser {
        username,
        email,
        password_hash,
        is_admin: false,
        expiration: Some(OffsetDateTime::now_utc() + PREVIEW_PERIOD),
        needs_password_change: false,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return get_internal_server_error_redirect();
        }
    };

    match create_user(new_user, &connection) {
        Ok(user) => {
            tracing::info!("Registered new user {} ({})", user.username, user.id);

            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ (Error::DuplicateUsername | Error::DuplicateEmail)) => registration_form(
            &user_data.username,
            &user_data.email,
            RegistrationFormErrors {
                username: Some(&error.to_string()),
                ..Default::default()
            },
        )
        .into_response(),
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");

            get_internal_server_error_redirect()
        }
    }
}

#[cfg(test)]
mod get_register_page_tests {
    use axum::http::{StatusCode, header::CONTENT_TYPE};

    use crate::test_utils::{
        assert_form_input, assert_valid_html, must_get_form, parse_html_document,
    };

    use super::get_register_page;

    #[tokio::test]
    async fn render_register_page() {
        let response = get_register_page().await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        assert_form_input(&form, "confirm_password", "password");
    }
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        endpoints,
        test_utils::{assert_hx_redirect, assert_valid_html, must_get_form, parse_html_document},
        user::{count_users, get_user_by_username},
    };

    use super::{RegisterForm, RegistrationState, register_user};

    const STRONG_PASSWORD: &str = "correct-horse-battery-staple";

    fn get_test_state() -> RegistrationState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        RegistrationState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn register_form(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn register_creates_user_and_redirects_to_log_in() {
        let state = get_test_state();

        let response = register_user(
            State(state.clone()),
            Form(register_form("maria", "maria@example.com", STRONG_PASSWORD)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::LOG_IN_VIEW);

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_username("maria", &connection).unwrap();
        assert!(!user.is_admin);
        assert!(!user.needs_password_change);
        assert!(user.expiration.is_some(), "preview period should be set");
        assert!(user.password_hash.verify(STRONG_PASSWORD).unwrap());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let state = get_test_state();
        register_user(
            State(state.clone()),
            Form(register_form("maria", "maria@example.com", STRONG_PASSWORD)),
        )
        .await;

        let response = register_user(
            State(state.clone()),
            Form(register_form("maria", "other@example.com", STRONG_PASSWORD)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        let text = form.text().collect::<String>();
        assert!(text.contains("already exists"));

        assert_eq!(
            count_users(&state.db_connection.lock().unwrap()),
            Ok(1)
        );
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let state = get_test_state();

        let response = register_user(
            State(state.clone()),
            Form(register_form("maria", "maria@example.com", "password1")),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(count_users(&state.db_connection.lock().unwrap()), Ok(0));
    }

    #[tokio::test]
    async fn register_rejects_mismatched_passwords() {
        let state = get_test_state();
        let mut form = register_form("maria", "maria@example.com", STRONG_PASSWORD);
        form.confirm_password = "a-different-strong-password".to_owned();

        let response = register_user(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        let form = must_get_form(&html);
        let text = form.text().collect::<String>();
        assert!(text.contains("Passwords do not match"));
        assert_eq!(count_users(&state.db_connection.lock().unwrap()), Ok(0));
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let state = get_test_state();

        let response = register_user(
            State(state.clone()),
            Form(register_form("maria", "not-an-email", STRONG_PASSWORD)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(count_users(&state.db_connection.lock().unwrap()), Ok(0));
    }
}

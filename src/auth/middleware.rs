//! Authentication middleware that validates cookies, extends sessions, and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::{extend_auth_cookie_duration_if_needed, get_user_id_from_auth_cookie},
    endpoints,
    timezone::get_local_offset,
    user::{UserID, get_user_by_id},
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Manila".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned using `get_redirect`.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => {
            tracing::error!("Error getting local timezone. Redirecting to log in page.");
            return get_redirect(endpoints::LOG_IN_VIEW);
        }
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(endpoints::LOG_IN_VIEW);
        }
    };
    let user_id = match get_user_id_from_auth_cookie(&jar) {
        Ok(user_id) => user_id,
        Err(_) => return get_redirect(endpoints::LOG_IN_VIEW),
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let jar =
        match extend_auth_cookie_duration_if_needed(jar.clone(), Duration::minutes(5), local_offset)
        {
            Ok(updated_jar) => updated_jar,
            Err(err) => {
                tracing::error!(
                    "Error extending cookie duration: {err:?}. Rolling back cookie jar."
                );
                jar
            }
        };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a HTMX redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// The state needed for the admin guard middleware.
#[derive(Clone)]
pub struct AdminGuardState {
    /// The database connection, used to look up the requesting user's admin flag.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminGuardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware function that restricts a route to administrators.
///
/// Must be layered inside [auth_guard] so the request extensions carry the
/// user ID. Non-admin users are redirected to their dashboard.
pub async fn admin_guard(
    State(state): State<AdminGuardState>,
    request: Request,
    next: Next,
) -> Response {
    let user_id = match request.extensions().get::<UserID>() {
        Some(user_id) => *user_id,
        None => {
            tracing::error!("admin_guard ran without auth_guard providing a user ID");
            return Redirect::to(endpoints::LOG_IN_VIEW).into_response();
        }
    };

    let is_admin = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        get_user_by_id(user_id, &connection).map(|user| user.is_admin)
    };

    match is_admin {
        Ok(true) => next.run(request).await,
        Ok(false) => Redirect::to(endpoints::DASHBOARD_VIEW).into_response(),
        Err(error) => {
            tracing::error!("could not load user {user_id} for admin check: {error}");
            error.into_response()
        }
    }
}


#[cfg(test)]
mod admin_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Router, middleware,
        response::Html,
        routing::get,
    };
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        auth::middleware::{AdminGuardState, admin_guard},
        db::initialize,
        endpoints,
        password::PasswordHash,
        user::{NewUser, UserID, Username, create_user, set_admin},
    };

    async fn test_handler() -> Html<&'static str> {
        Html("<h1>Admin only</h1>")
    }

    fn get_test_state() -> AdminGuardState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        AdminGuardState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn create_test_user(state: &AdminGuardState, is_admin: bool) -> UserID {
        let connection = state.db_connection.lock().unwrap();
        let user = create_user(
            NewUser {
                username: Username::new_unchecked(if is_admin { "admin" } else { "maria" }),
                email: format!("{}@example.com", if is_admin { "admin" } else { "maria" }),
                password_hash: PasswordHash::new_unchecked("hunter2"),
                is_admin: false,
                expiration: None,
                needs_password_change: false,
            },
            &connection,
        )
        .expect("Could not create test user");

        if is_admin {
            set_admin(user.id, true, &connection).expect("Could not grant admin");
        }

        user.id
    }

    fn get_test_server(state: AdminGuardState, user_id: UserID) -> TestServer {
        // Simulates auth_guard having already inserted the user ID extension.
        let app = Router::new()
            .route("/admin", get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard))
            .layer(Extension(user_id))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn admin_user_passes_through() {
        let state = get_test_state();
        let admin_id = create_test_user(&state, true);
        let server = get_test_server(state, admin_id);

        server.get("/admin").await.assert_status_ok();
    }

    #[tokio::test]
    async fn non_admin_user_is_redirected_to_dashboard() {
        let state = get_test_state();
        let user_id = create_test_user(&state, false);
        let server = get_test_server(state, user_id);

        let response = server.get("/admin").await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::DASHBOARD_VIEW);
    }
}

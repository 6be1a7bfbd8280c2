//! User authentication: private cookie handling, guards for protected and
//! admin-only routes, and the log-in/log-out route handlers.

mod cookie;
mod log_in;
mod log_out;
mod middleware;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::{INVALID_CREDENTIALS_ERROR_MSG, LoginState, get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AdminGuardState, AuthState, admin_guard, auth_guard, auth_guard_hx};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_EXPIRY, COOKIE_USER_ID};

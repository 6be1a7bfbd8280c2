//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/bills/{bill_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for displaying a user's income and expense entries.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for recording a new income or expense entry.
pub const NEW_ENTRY_VIEW: &str = "/entries/new";
/// The page for savings goals and the savings transaction history.
pub const SAVINGS_VIEW: &str = "/savings";
/// The page for scheduled bills.
pub const BILLS_VIEW: &str = "/bills";
/// The page for editing an existing scheduled bill.
pub const EDIT_BILL_VIEW: &str = "/bills/{bill_id}/edit";
/// The page for managing inventory.
pub const INVENTORY_VIEW: &str = "/inventory";
/// The page for user settings.
pub const SETTINGS_VIEW: &str = "/settings";
/// The admin page for managing user accounts.
pub const ADMIN_USERS_VIEW: &str = "/admin/users";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page shown to users who must change their password before continuing.
pub const CHANGE_PASSWORD_VIEW: &str = "/change_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register a user.
pub const USERS: &str = "/api/users";
/// The route to record an income entry.
pub const POST_INCOME: &str = "/api/income";
/// The route to record an expense entry.
pub const POST_EXPENSE: &str = "/api/expenses";
/// The route to create a savings goal.
pub const POST_SAVINGS_GOAL: &str = "/api/savings_goals";
/// The route to deposit into a savings goal.
pub const POST_SAVINGS_DEPOSIT: &str = "/api/savings_goals/{goal_id}/deposits";
/// The route to delete a savings goal and refund its balance.
pub const DELETE_SAVINGS_GOAL: &str = "/api/savings_goals/{goal_id}";
/// The route to create a scheduled bill.
pub const POST_BILL: &str = "/api/bills";
/// The route to update a scheduled bill.
pub const PUT_BILL: &str = "/api/bills/{bill_id}";
/// The route to delete a scheduled bill.
pub const DELETE_BILL: &str = "/api/bills/{bill_id}";
/// The route to pay a scheduled bill.
pub const PAY_BILL: &str = "/api/bills/{bill_id}/payments";
/// The route to create a product.
pub const POST_PRODUCT: &str = "/api/products";
/// The route to update a product.
pub const PUT_PRODUCT: &str = "/api/products/{product_id}";
/// The route to delete a product.
pub const DELETE_PRODUCT: &str = "/api/products/{product_id}";
/// The route to update the business name and currency.
pub const UPDATE_BUSINESS_INFO: &str = "/api/settings/business";
/// The route to update the monthly income/expense targets.
pub const UPDATE_TARGETS: &str = "/api/settings/targets";
/// The route to update dashboard preferences.
pub const UPDATE_DASHBOARD_PREFS: &str = "/api/settings/dashboard";
/// The route to change the logged-in user's password.
pub const CHANGE_PASSWORD_API: &str = "/api/settings/password";
/// The admin route to toggle a user's account status.
pub const ADMIN_USER_STATUS: &str = "/api/admin/users/{user_id}/status";
/// The admin route to grant or revoke admin access.
pub const ADMIN_USER_ADMIN: &str = "/api/admin/users/{user_id}/admin";
/// The admin route to set or clear a user's expiration date.
pub const ADMIN_USER_EXPIRATION: &str = "/api/admin/users/{user_id}/expiration";
/// The admin route to reset a user's password.
pub const ADMIN_USER_PASSWORD: &str = "/api/admin/users/{user_id}/password";
/// The admin route to toggle the forced password change flag.
pub const ADMIN_USER_FORCE_PASSWORD: &str = "/api/admin/users/{user_id}/force_password_change";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/bills/{bill_id}', '{bill_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD_VIEW);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::NEW_ENTRY_VIEW);
        assert_endpoint_is_valid_uri(endpoints::SAVINGS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::BILLS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::EDIT_BILL_VIEW);
        assert_endpoint_is_valid_uri(endpoints::INVENTORY_VIEW);
        assert_endpoint_is_valid_uri(endpoints::SETTINGS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USERS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::REGISTER_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_VIEW);
        assert_endpoint_is_valid_uri(endpoints::CHANGE_PASSWORD_VIEW);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);
        assert_endpoint_is_valid_uri(endpoints::STATIC);

        assert_endpoint_is_valid_uri(endpoints::LOG_IN_API);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::USERS);
        assert_endpoint_is_valid_uri(endpoints::POST_INCOME);
        assert_endpoint_is_valid_uri(endpoints::POST_EXPENSE);
        assert_endpoint_is_valid_uri(endpoints::POST_SAVINGS_GOAL);
        assert_endpoint_is_valid_uri(endpoints::POST_SAVINGS_DEPOSIT);
        assert_endpoint_is_valid_uri(endpoints::DELETE_SAVINGS_GOAL);
        assert_endpoint_is_valid_uri(endpoints::POST_BILL);
        assert_endpoint_is_valid_uri(endpoints::PUT_BILL);
        assert_endpoint_is_valid_uri(endpoints::DELETE_BILL);
        assert_endpoint_is_valid_uri(endpoints::PAY_BILL);
        assert_endpoint_is_valid_uri(endpoints::POST_PRODUCT);
        assert_endpoint_is_valid_uri(endpoints::PUT_PRODUCT);
        assert_endpoint_is_valid_uri(endpoints::DELETE_PRODUCT);
        assert_endpoint_is_valid_uri(endpoints::UPDATE_BUSINESS_INFO);
        assert_endpoint_is_valid_uri(endpoints::UPDATE_TARGETS);
        assert_endpoint_is_valid_uri(endpoints::UPDATE_DASHBOARD_PREFS);
        assert_endpoint_is_valid_uri(endpoints::CHANGE_PASSWORD_API);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USER_STATUS);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USER_ADMIN);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USER_EXPIRATION);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USER_PASSWORD);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USER_FORCE_PASSWORD);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());

        // Parameter with single word should also work.
        let formatted_path = format_endpoint("/hello/{world}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint("/hello/{world}/bye", 1);

        assert_eq!(formatted_path, "/hello/1/bye");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}

//! Application router configuration with protected, admin-only, and
//! unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    admin::{
        get_admin_users_page, reset_password_endpoint, set_expiration_endpoint,
        toggle_admin_endpoint, toggle_force_password_change_endpoint, toggle_status_endpoint,
    },
    auth::{admin_guard, auth_guard, auth_guard_hx, get_log_in_page, get_log_out, post_log_in},
    bills::{
        create_bill_endpoint, delete_bill_endpoint, get_bills_page, get_edit_bill_page,
        pay_bill_endpoint, update_bill_endpoint,
    },
    change_password::{change_password_endpoint, get_change_password_page},
    dashboard::get_dashboard_page,
    endpoints,
    entry::{create_expense_endpoint, create_income_endpoint, get_new_entry_page},
    internal_server_error::get_internal_server_error_page,
    inventory::{
        create_product_endpoint, delete_product_endpoint, get_inventory_page,
        update_product_endpoint,
    },
    not_found::get_404_not_found,
    register_user::{get_register_page, register_user},
    savings::{
        create_goal_endpoint, delete_goal_endpoint, deposit_endpoint, get_savings_page,
    },
    settings::{
        get_settings_page, update_business_info_endpoint, update_dashboard_prefs_endpoint,
        update_targets_endpoint,
    },
    transactions_page::get_transactions_page,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::NEW_ENTRY_VIEW, get(get_new_entry_page))
        .route(endpoints::SAVINGS_VIEW, get(get_savings_page))
        .route(endpoints::BILLS_VIEW, get(get_bills_page))
        .route(endpoints::EDIT_BILL_VIEW, get(get_edit_bill_page))
        .route(endpoints::INVENTORY_VIEW, get(get_inventory_page))
        .route(endpoints::SETTINGS_VIEW, get(get_settings_page))
        .route(endpoints::CHANGE_PASSWORD_VIEW, get(get_change_password_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for
    // auth redirects to work properly for HTMX requests.
    let protected_api_routes = Router::new()
        .route(endpoints::POST_INCOME, post(create_income_endpoint))
        .route(endpoints::POST_EXPENSE, post(create_expense_endpoint))
        .route(endpoints::POST_SAVINGS_GOAL, post(create_goal_endpoint))
        .route(endpoints::POST_SAVINGS_DEPOSIT, post(deposit_endpoint))
        .route(endpoints::DELETE_SAVINGS_GOAL, delete(delete_goal_endpoint))
        .route(endpoints::POST_BILL, post(create_bill_endpoint))
        .route(endpoints::PUT_BILL, put(update_bill_endpoint))
        .route(endpoints::DELETE_BILL, delete(delete_bill_endpoint))
        .route(endpoints::PAY_BILL, post(pay_bill_endpoint))
        .route(endpoints::POST_PRODUCT, post(create_product_endpoint))
        .route(endpoints::PUT_PRODUCT, put(update_product_endpoint))
        .route(endpoints::DELETE_PRODUCT, delete(delete_product_endpoint))
        .route(
            endpoints::UPDATE_BUSINESS_INFO,
            post(update_business_info_endpoint),
        )
        .route(endpoints::UPDATE_TARGETS, post(update_targets_endpoint))
        .route(
            endpoints::UPDATE_DASHBOARD_PREFS,
            post(update_dashboard_prefs_endpoint),
        )
        .route(endpoints::CHANGE_PASSWORD_API, post(change_password_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    // The admin guard runs after the auth guard so the request extensions
    // carry the user ID.
    let admin_page_routes = Router::new()
        .route(endpoints::ADMIN_USERS_VIEW, get(get_admin_users_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let admin_api_routes = Router::new()
        .route(endpoints::ADMIN_USER_STATUS, post(toggle_status_endpoint))
        .route(endpoints::ADMIN_USER_ADMIN, post(toggle_admin_endpoint))
        .route(
            endpoints::ADMIN_USER_EXPIRATION,
            post(set_expiration_endpoint),
        )
        .route(endpoints::ADMIN_USER_PASSWORD, post(reset_password_endpoint))
        .route(
            endpoints::ADMIN_USER_FORCE_PASSWORD,
            post(toggle_force_password_change_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    protected_page_routes
        .merge(protected_api_routes)
        .merge(admin_page_routes)
        .merge(admin_api_routes)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

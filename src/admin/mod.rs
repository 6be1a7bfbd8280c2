//! The admin panel for managing user account lifecycles.

mod users;

pub use users::{
    get_admin_users_page, reset_password_endpoint, set_expiration_endpoint,
    toggle_admin_endpoint, toggle_force_password_change_endpoint, toggle_status_endpoint,
};

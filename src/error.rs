//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert, html::format_currency, internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of username and password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An empty string was used for a savings goal name.
    #[error("Goal name cannot be empty")]
    EmptyGoalName,

    /// An empty string was used for a bill name.
    #[error("Bill name cannot be empty")]
    EmptyBillName,

    /// An empty string was used for a product name.
    #[error("Product name cannot be empty")]
    EmptyProductName,

    /// An empty string was used for a username.
    #[error("Username cannot be empty")]
    EmptyUsername,

    /// An empty string was used for a business name.
    #[error("Business name cannot be empty")]
    EmptyBusinessName,

    /// A zero or negative amount was used where only positive amounts make
    /// sense (ledger entries, deposits, bill amounts, goal targets).
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    /// A negative value was used for a monthly income/expense target.
    #[error("Targets cannot be negative")]
    NegativeTarget,

    /// A deposit was attempted for more money than the main wallet holds.
    ///
    /// Carries the wallet balance at the time of the check so it can be
    /// shown to the user.
    #[error("insufficient funds in the main wallet")]
    InsufficientFunds {
        /// The wallet balance available at the time of the failed deposit.
        available: f64,
    },

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The specified username already exists in the database.
    #[error("the username already exists in the database")]
    DuplicateUsername,

    /// The specified email address already exists in the database.
    #[error("the email address already exists in the database")]
    DuplicateEmail,

    /// The specified product name already exists for this user.
    #[error("the product already exists in the inventory")]
    DuplicateProductName,

    /// Tried to deposit into a savings goal that does not exist or belongs
    /// to another user.
    #[error("tried to deposit into a savings goal that is not in the database")]
    DepositMissingGoal,

    /// Tried to delete a savings goal that does not exist or belongs to
    /// another user.
    #[error("tried to delete a savings goal that is not in the database")]
    DeleteMissingGoal,

    /// Tried to update a scheduled bill that does not exist.
    #[error("tried to update a bill that is not in the database")]
    UpdateMissingBill,

    /// Tried to delete a scheduled bill that does not exist.
    #[error("tried to delete a bill that is not in the database")]
    DeleteMissingBill,

    /// Tried to pay a scheduled bill that does not exist.
    #[error("tried to pay a bill that is not in the database")]
    PayMissingBill,

    /// Tried to update a product that does not exist.
    #[error("tried to update a product that is not in the database")]
    UpdateMissingProduct,

    /// Tried to delete a product that does not exist.
    #[error("tried to delete a product that is not in the database")]
    DeleteMissingProduct,

    /// Tried to update a user that does not exist.
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("product.") =>
            {
                Error::DuplicateProductName
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::EmptyGoalName
            | Error::EmptyBillName
            | Error::EmptyProductName
            | Error::EmptyUsername
            | Error::EmptyBusinessName
            | Error::NonPositiveAmount
            | Error::NegativeTarget => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid input".to_owned(),
                    details: self.to_string(),
                },
            ),
            Error::InsufficientFunds { available } => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Insufficient funds".to_owned(),
                    details: format!(
                        "The main wallet does not hold enough money for this deposit. \
                        Available: {}.",
                        format_currency(available)
                    ),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Not found".to_owned(),
                    details: "The requested item could not be found. \
                    Try refreshing the page."
                        .to_owned(),
                },
            ),
            Error::DepositMissingGoal => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not deposit".to_owned(),
                    details: "The savings goal could not be found. \
                    Try refreshing the page to see if the goal has been deleted."
                        .to_owned(),
                },
            ),
            Error::DeleteMissingGoal => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete savings goal".to_owned(),
                    details: "The savings goal could not be found. \
                    Try refreshing the page to see if the goal has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingBill => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update bill".to_owned(),
                    details: "The bill could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingBill => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete bill".to_owned(),
                    details: "The bill could not be found. \
                    Try refreshing the page to see if the bill has already been deleted."
                        .to_owned(),
                },
            ),
            Error::PayMissingBill => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not pay bill".to_owned(),
                    details: "The bill could not be found. \
                    Try refreshing the page to see if the bill has already been paid."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingProduct => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update product".to_owned(),
                    details: "The product could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingProduct => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete product".to_owned(),
                    details: "The product could not be found. \
                    Try refreshing the page to see if the product has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingUser => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update user".to_owned(),
                    details: "The user could not be found.".to_owned(),
                },
            ),
            Error::DuplicateUsername => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Duplicate username".to_owned(),
                    details: "That username is already taken. Choose a different one.".to_owned(),
                },
            ),
            Error::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Duplicate email".to_owned(),
                    details: "That email address is already registered.".to_owned(),
                },
            ),
            Error::DuplicateProductName => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Duplicate product name".to_owned(),
                    details: "A product with that name already exists in your inventory. \
                        Choose a different name, or edit the existing product."
                        .to_owned(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}

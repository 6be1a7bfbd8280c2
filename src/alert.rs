//! Success and error alert fragments for htmx out-of-band swaps.
//!
//! Alerts are rendered into the `#alert-container` element defined in the
//! base layout and dismiss themselves via the close button.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// A user-facing message shown after a mutating action.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The action succeeded.
    Success {
        /// Short headline, e.g. "Deposit recorded".
        message: String,
        /// Longer explanation shown under the headline.
        details: String,
    },
    /// The action succeeded, no details needed.
    SuccessSimple {
        /// Short headline, e.g. "Tag deleted successfully".
        message: String,
    },
    /// The action failed.
    Error {
        /// Short headline, e.g. "Could not deposit".
        message: String,
        /// Longer explanation shown under the headline.
        details: String,
    },
}

const SUCCESS_ALERT_STYLE: &str = "flex items-start gap-3 p-4 mb-4 rounded-lg border \
    text-green-800 border-green-300 bg-green-50 dark:bg-gray-800 \
    dark:text-green-400 dark:border-green-800";

const ERROR_ALERT_STYLE: &str = "flex items-start gap-3 p-4 mb-4 rounded-lg border \
    text-red-800 border-red-300 bg-red-50 dark:bg-gray-800 \
    dark:text-red-400 dark:border-red-800";

impl Alert {
    /// Render the alert as an out-of-band swap targeting the alert container
    /// in the base layout.
    pub fn into_html(self) -> Markup {
        let (style, message, details) = match self {
            Alert::Success { message, details } => (SUCCESS_ALERT_STYLE, message, details),
            Alert::SuccessSimple { message } => (SUCCESS_ALERT_STYLE, message, String::new()),
            Alert::Error { message, details } => (ERROR_ALERT_STYLE, message, details),
        };

        html! {
            div id="alert-container" hx-swap-oob="true" class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(style) role="alert"
                {
                    div class="flex-1"
                    {
                        p class="font-medium" { (message) }

                        @if !details.is_empty() {
                            p class="text-sm" { (details) }
                        }
                    }

                    button
                        type="button"
                        class="ms-auto -mx-1.5 -my-1.5 rounded-lg p-1.5 inline-flex h-8 w-8 \
                            hover:bg-gray-100 dark:hover:bg-gray-700"
                        aria-label="Close"
                        onclick="this.closest('[role=alert]').remove()"
                    {
                        "✕"
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

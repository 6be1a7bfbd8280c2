//! The savings page: balance cards, goal cards with progress bars, and the
//! paginated savings transaction history.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency_with,
    },
    navigation::NavBar,
    pagination::{PaginationConfig, PaginationIndicator, create_pagination_indicators},
    savings::{
        LogType, SavingsLogEntry, count_logs, get_all_goals, get_logs_page,
        goal::SavingsGoal,
        transfer::{total_savings, wallet_balance},
    },
    user::{UserID, get_user_by_id},
};

/// The state needed for the savings page.
#[derive(Debug, Clone)]
pub struct SavingsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to page the savings history.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for SavingsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SavingsPageQuery {
    pub page: Option<u64>,
}

/// Display the savings page for the logged-in user.
pub async fn get_savings_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<SavingsPageState>,
    Query(query): Query<SavingsPageQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let balance = wallet_balance(user_id, &connection)?;
    let savings = total_savings(user_id, &connection)?;
    let goals = get_all_goals(user_id, &connection)?;

    let page_size = state.pagination_config.default_page_size;
    let current_page = query
        .page
        .unwrap_or(state.pagination_config.default_page)
        .max(1);
    let log_count = count_logs(user_id, &connection)?;
    let page_count = log_count.div_ceil(page_size).max(1);
    let current_page = current_page.min(page_count);
    let logs = get_logs_page(
        user_id,
        page_size,
        (current_page - 1) * page_size,
        &connection,
    )?;

    let indicators =
        create_pagination_indicators(current_page, page_count, state.pagination_config.max_pages);

    Ok(savings_view(
        NavBar::new(endpoints::SAVINGS_VIEW),
        &user.currency,
        balance,
        savings,
        &goals,
        &logs,
        &indicators,
    )
    .into_response())
}

fn savings_view(
    nav_bar: NavBar,
    currency: &str,
    balance: f64,
    savings: f64,
    goals: &[SavingsGoal],
    logs: &[SavingsLogEntry],
    indicators: &[PaginationIndicator],
) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div class="flex flex-col px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-xl text-gray-900 dark:text-white"
        {
            (balance_cards(currency, balance, savings))
            (add_goal_card())

            section class="w-full mx-auto mt-8"
            {
                @if goals.is_empty() {
                    div class=(CARD_STYLE)
                    {
                        p class="text-center text-gray-500 dark:text-gray-400"
                        {
                            "No savings goals created yet. Add one above to get started!"
                        }
                    }
                } @else {
                    div class="grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-4"
                    {
                        @for goal in goals {
                            (goal_card(currency, goal))
                        }
                    }
                }
            }

            (history_section(currency, logs, indicators))
        }
    );

    base("Savings", &[], &content)
}

fn balance_cards(currency: &str, balance: f64, savings: f64) -> Markup {
    html!(
        section class="grid grid-cols-1 md:grid-cols-3 gap-4 w-full mx-auto"
        {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold" { "Cash On Hand" }
                p class="text-3xl font-bold text-blue-600 dark:text-blue-400 mt-2"
                {
                    (format_currency_with(currency, balance))
                }
                p class="text-sm text-gray-500 dark:text-gray-400 mt-1"
                {
                    "Total cash available for deposits."
                }
            }

            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold" { "Total Savings" }
                p class="text-3xl font-bold text-green-600 dark:text-green-400 mt-2"
                {
                    (format_currency_with(currency, savings))
                }
                p class="text-sm text-gray-500 dark:text-gray-400 mt-1"
                {
                    "Money set aside across all goals."
                }
            }

            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold" { "Total Balance" }
                p class="text-3xl font-bold mt-2"
                {
                    (format_currency_with(currency, balance + savings))
                }
                p class="text-sm text-gray-500 dark:text-gray-400 mt-1"
                {
                    "Main wallet plus all savings goals."
                }
            }
        }
    )
}

fn add_goal_card() -> Markup {
    html!(
        section class="w-full mx-auto mt-8"
        {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-4" { "Add New Savings Goal" }

                form
                    hx-post=(endpoints::POST_SAVINGS_GOAL)
                    hx-target-error="#alert-container"
                    class="grid grid-cols-1 md:grid-cols-3 gap-4 items-end"
                {
                    div
                    {
                        label for="name" class=(FORM_LABEL_STYLE) { "Goal Name" }

                        input
                            id="name"
                            type="text"
                            name="name"
                            placeholder="e.g. New Laptop"
                            required
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="target_amount" class=(FORM_LABEL_STYLE) { "Target Amount" }

                        input
                            id="target_amount"
                            type="number"
                            name="target_amount"
                            step="0.01"
                            min="0.01"
                            placeholder="50000.00"
                            required
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Goal" }
                }
            }
        }
    )
}

fn goal_card(currency: &str, goal: &SavingsGoal) -> Markup {
    let deposit_endpoint = endpoints::format_endpoint(endpoints::POST_SAVINGS_DEPOSIT, goal.id);
    let delete_endpoint = endpoints::format_endpoint(endpoints::DELETE_SAVINGS_GOAL, goal.id);
    let progress = goal.progress_percent();
    let progress_color = if progress >= 100.0 {
        "bg-green-500"
    } else {
        "bg-blue-500"
    };

    html!(
        div class=(CARD_STYLE)
        {
            div class="flex items-center justify-between"
            {
                h3 class="text-lg font-bold" { (goal.name) }

                button
                    hx-delete=(delete_endpoint)
                    hx-confirm=(format!(
                        "Delete the goal \"{}\"? The current amount will be returned to your main wallet.",
                        goal.name
                    ))
                    hx-target-error="#alert-container"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }

            div class="h-2 rounded-full bg-gray-200 dark:bg-gray-700 overflow-hidden my-4"
            {
                div
                    class=(format!("h-full rounded-full {progress_color}"))
                    style=(format!("width: {progress:.0}%;"))
                {}
            }

            div class="flex justify-between text-sm text-gray-600 dark:text-gray-400 font-medium mb-4"
            {
                span
                {
                    "Current: "
                    span class="font-bold text-gray-900 dark:text-white"
                    {
                        (format_currency_with(currency, goal.current_amount))
                    }
                }
                span
                {
                    "Target: "
                    span class="font-bold text-gray-900 dark:text-white"
                    {
                        (format_currency_with(currency, goal.target_amount))
                    }
                }
            }

            form
                hx-post=(deposit_endpoint)
                hx-target-error="#alert-container"
                class="flex gap-2"
            {
                input
                    type="number"
                    name="amount"
                    step="0.01"
                    min="0.01"
                    placeholder="Amount to deposit"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Deposit" }
            }
        }
    )
}

/// Display format for history timestamps, e.g. "Jul 20, 2025 03:15 PM".
const LOG_DATE_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[month repr:short] [day], [year] [hour repr:12 padding:zero]:[minute] [period]"
);

fn format_log_date(log_date: OffsetDateTime) -> String {
    log_date
        .format(LOG_DATE_FORMAT)
        .unwrap_or_else(|_| log_date.to_string())
}

fn history_section(
    currency: &str,
    logs: &[SavingsLogEntry],
    indicators: &[PaginationIndicator],
) -> Markup {
    html!(
        section class="w-full mx-auto mt-8 mb-8"
        {
            h2 class="text-xl font-bold mb-4" { "Savings Transaction History" }

            div class="relative overflow-x-auto shadow-md rounded"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class="px-6 py-3" { "Date" }
                            th scope="col" class="px-6 py-3" { "Type" }
                            th scope="col" class="px-6 py-3 text-right" { "Amount" }
                            th scope="col" class="px-6 py-3" { "Description" }
                        }
                    }

                    tbody
                    {
                        @if logs.is_empty() {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td colspan="4" class="px-6 py-4 text-center"
                                {
                                    "No transactions recorded yet."
                                }
                            }
                        }

                        @for entry in logs {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (format_log_date(entry.log_date)) }

                                td class=(TABLE_CELL_STYLE)
                                {
                                    @match entry.log_type {
                                        LogType::Deposit => {
                                            span class="font-bold text-blue-500" { "Deposit" }
                                        }
                                        LogType::Return => {
                                            span class="font-bold text-green-500" { "Return" }
                                        }
                                    }
                                }

                                td class="px-6 py-4 text-right font-semibold"
                                {
                                    (format_currency_with(currency, entry.amount))
                                }

                                td class="px-6 py-4 max-w-xs truncate" { (entry.description) }
                            }
                        }
                    }
                }
            }

            (pagination_nav(indicators))
        }
    )
}

fn pagination_nav(indicators: &[PaginationIndicator]) -> Markup {
    let page_link = |page: u64| format!("{}?page={page}", endpoints::SAVINGS_VIEW);
    let inactive_style = "flex items-center justify-center h-10 px-4 text-sm font-medium \
        text-gray-500 bg-white border border-gray-300 rounded-lg hover:bg-gray-100 \
        hover:text-gray-700 dark:bg-gray-800 dark:border-gray-700 dark:text-gray-400";
    let active_style = "flex items-center justify-center h-10 px-4 text-sm font-medium \
        text-blue-600 bg-blue-50 border border-blue-300 rounded-lg dark:bg-gray-700 \
        dark:text-white";

    html!(
        nav class="flex justify-center items-center mt-6" aria-label="Savings history pages"
        {
            ul class="flex items-center space-x-2"
            {
                @for indicator in indicators {
                    li
                    {
                        @match indicator {
                            PaginationIndicator::BackButton(page) => {
                                a href=(page_link(*page)) class=(inactive_style) { "Prev" }
                            }
                            PaginationIndicator::NextButton(page) => {
                                a href=(page_link(*page)) class=(inactive_style) { "Next" }
                            }
                            PaginationIndicator::Page(page) => {
                                a href=(page_link(*page)) class=(inactive_style) { (page) }
                            }
                            PaginationIndicator::CurrPage(page) => {
                                span class=(active_style) aria-current="page" { (page) }
                            }
                            PaginationIndicator::Ellipsis => {
                                span class="px-2 text-gray-500" { "…" }
                            }
                        }
                    }
                }
            }
        }
    )
}

#[cfg(test)]
mod savings_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        income::insert_income,
        pagination::PaginationConfig,
        password::PasswordHash,
        savings::{GoalName, transfer},
        test_utils::{assert_valid_html, parse_html_document},
        user::{NewUser, UserID, Username, create_user},
    };

    use super::{SavingsPageQuery, SavingsPageState, get_savings_page};

    fn get_test_state() -> (SavingsPageState, UserID) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        let user = create_user(
            NewUser {
                username: Username::new_unchecked("maria"),
                email: "maria@example.com".to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
                is_admin: false,
                expiration: None,
                needs_password_change: false,
            },
            &connection,
        )
        .expect("Could not create test user");

        (
            SavingsPageState {
                db_connection: Arc::new(Mutex::new(connection)),
                pagination_config: PaginationConfig::default(),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn renders_empty_state() {
        let (state, user_id) = get_test_state();

        let response = get_savings_page(
            Extension(user_id),
            State(state),
            Query(SavingsPageQuery { page: None }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No savings goals created yet"));
        assert!(text.contains("No transactions recorded yet"));
    }

    #[tokio::test]
    async fn renders_goals_and_history() {
        let (state, user_id) = get_test_state();
        {
            let mut connection = state.db_connection.lock().unwrap();
            insert_income(user_id, 1000.0, "sales", date!(2025 - 07 - 01), &connection).unwrap();
            let goal = transfer::create_goal(
                user_id,
                GoalName::new_unchecked("Laptop"),
                50_000.0,
                &connection,
            )
            .unwrap();
            transfer::deposit_to_goal(
                user_id,
                goal.id,
                250.0,
                date!(2025 - 07 - 02),
                &mut connection,
            )
            .unwrap();
        }

        let response = get_savings_page(
            Extension(user_id),
            State(state),
            Query(SavingsPageQuery { page: None }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Laptop"));
        assert!(text.contains("₱750.00"), "wallet balance should show");
        assert!(text.contains("₱250.00"), "goal balance should show");
        assert!(text.contains("Deposit"));
    }
}

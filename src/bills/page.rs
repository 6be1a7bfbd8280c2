//! The scheduled bills page: an add-bill form and the table of bills with
//! pay/edit/delete actions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    bills::core::{Recurrence, ScheduledBill, get_all_bills, reactivate_due_bills},
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_SELECT_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency_with,
    },
    navigation::NavBar,
    timezone::get_local_offset,
    user::{UserID, get_user_by_id},
};

/// The state needed for the bills page.
#[derive(Debug, Clone)]
pub struct BillsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Manila".
    pub local_timezone: String,
}

impl FromRef<AppState> for BillsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Display the bills page for the logged-in user.
///
/// Loading the page also runs the reactivation sweep so paid recurring bills
/// come back as unpaid when their next due date approaches.
pub async fn get_bills_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<BillsPageState>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let reactivated = reactivate_due_bills(user_id, today, &connection)?;
    if reactivated > 0 {
        tracing::info!("Reactivated {reactivated} recurring bill(s) for user {user_id}");
    }

    let user = get_user_by_id(user_id, &connection)?;
    let bills = get_all_bills(user_id, &connection)?;

    Ok(bills_view(NavBar::new(endpoints::BILLS_VIEW), &user.currency, &bills, today)
        .into_response())
}

fn bills_view(
    nav_bar: NavBar,
    currency: &str,
    bills: &[ScheduledBill],
    today: time::Date,
) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div class="flex flex-col px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-xl text-gray-900 dark:text-white"
        {
            (add_bill_card())

            section class="w-full mx-auto mt-8 mb-8"
            {
                h2 class="text-xl font-bold mb-4" { "Scheduled Bills" }

                div class="relative overflow-x-auto shadow-md rounded"
                {
                    table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class="px-6 py-3" { "Bill" }
                                th scope="col" class="px-6 py-3 text-right" { "Amount" }
                                th scope="col" class="px-6 py-3" { "Due" }
                                th scope="col" class="px-6 py-3" { "Repeats" }
                                th scope="col" class="px-6 py-3" { "Status" }
                                th scope="col" class="px-6 py-3" { "Actions" }
                            }
                        }

                        tbody
                        {
                            @if bills.is_empty() {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td colspan="6" class="px-6 py-4 text-center"
                                    {
                                        "No scheduled bills yet. Add one above."
                                    }
                                }
                            }

                            @for bill in bills {
                                (bill_row(currency, bill, today))
                            }
                        }
                    }
                }
            }
        }
    );

    base("Bills", &[], &content)
}

fn add_bill_card() -> Markup {
    html!(
        section class="w-full mx-auto"
        {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold mb-4" { "Schedule a Bill" }

                form
                    hx-post=(endpoints::POST_BILL)
                    hx-target-error="#alert-container"
                    class="grid grid-cols-1 md:grid-cols-3 lg:grid-cols-6 gap-4 items-end"
                {
                    div
                    {
                        label for="name" class=(FORM_LABEL_STYLE) { "Bill Name" }
                        input id="name" type="text" name="name" placeholder="e.g. Shop rent"
                            required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                        input id="amount" type="number" name="amount" step="0.01" min="0.01"
                            required class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="due_date" class=(FORM_LABEL_STYLE) { "Due Date" }
                        input id="due_date" type="date" name="due_date" required
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    div
                    {
                        label for="recurrence" class=(FORM_LABEL_STYLE) { "Repeats" }
                        select id="recurrence" name="recurrence" class=(FORM_SELECT_STYLE)
                        {
                            @for option in Recurrence::ALL {
                                option value=(option.as_str()) { (option) }
                            }
                        }
                    }

                    div
                    {
                        label for="description" class=(FORM_LABEL_STYLE) { "Notes" }
                        input id="description" type="text" name="description"
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Bill" }
                }
            }
        }
    )
}

fn bill_row(currency: &str, bill: &ScheduledBill, today: time::Date) -> Markup {
    let pay_endpoint = endpoints::format_endpoint(endpoints::PAY_BILL, bill.id);
    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_BILL_VIEW, bill.id);
    let delete_endpoint = endpoints::format_endpoint(endpoints::DELETE_BILL, bill.id);
    let days_until_due = (bill.due_date - today).whole_days();
    let due_soon = !bill.is_paid && (0..=5).contains(&days_until_due);
    let overdue = !bill.is_paid && days_until_due < 0;

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class="px-6 py-4 font-medium text-gray-900 dark:text-white"
            {
                (bill.name)

                @if !bill.description.is_empty() {
                    p class="text-xs text-gray-500 dark:text-gray-400 font-normal"
                    {
                        (bill.description)
                    }
                }
            }

            td class="px-6 py-4 text-right font-semibold"
            {
                (format_currency_with(currency, bill.amount))
            }

            td class=(TABLE_CELL_STYLE)
            {
                (bill.due_date)

                @if overdue {
                    span class="ms-2 text-xs font-bold text-red-600 dark:text-red-400" { "Overdue" }
                } @else if due_soon {
                    span class="ms-2 text-xs font-bold text-amber-600 dark:text-amber-400" { "Due soon" }
                }
            }

            td class=(TABLE_CELL_STYLE) { (bill.recurrence) }

            td class=(TABLE_CELL_STYLE)
            {
                @if bill.is_paid {
                    span class="font-bold text-green-600 dark:text-green-400" { "Paid" }
                } @else {
                    span class="font-bold text-gray-600 dark:text-gray-300" { "Unpaid" }
                }
            }

            td class="px-6 py-4 space-x-3 whitespace-nowrap"
            {
                @if !bill.is_paid {
                    button
                        hx-post=(pay_endpoint)
                        hx-confirm=(format!(
                            "Pay \"{}\" ({})? This records the amount as an expense.",
                            bill.name,
                            format_currency_with(currency, bill.amount)
                        ))
                        hx-target-error="#alert-container"
                        class=(LINK_STYLE)
                    {
                        "Pay"
                    }
                }

                a href=(edit_endpoint) class=(LINK_STYLE) { "Edit" }

                button
                    hx-delete=(delete_endpoint)
                    hx-confirm=(format!("Delete the bill \"{}\"?", bill.name))
                    hx-target-error="#alert-container"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }
        }
    )
}

#[cfg(test)]
mod bills_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        bills::core::{NewBill, Recurrence, get_bill, insert_bill, pay_bill},
        db::initialize,
        password::PasswordHash,
        test_utils::{assert_valid_html, parse_html_document},
        user::{NewUser, UserID, Username, create_user},
    };

    use super::{BillsPageState, get_bills_page};

    fn get_test_state() -> (BillsPageState, UserID) {
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
            BillsPageState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user.id,
        )
    }

    #[tokio::test]
    async fn renders_bills_table() {
        let (state, user_id) = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            insert_bill(
                user_id,
                NewBill {
                    name: "Shop rent".to_owned(),
                    amount: 5000.0,
                    due_date: OffsetDateTime::now_utc().date() + Duration::days(10),
                    recurrence: Recurrence::Monthly,
                    description: String::new(),
                },
                &connection,
            )
            .unwrap();
        }

        let response = get_bills_page(Extension(user_id), State(state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Shop rent"));
        assert!(text.contains("Unpaid"));
    }

    #[tokio::test]
    async fn page_load_reactivates_due_recurring_bills() {
        let (state, user_id) = get_test_state();
        let bill_id = {
            let mut connection = state.db_connection.lock().unwrap();
            let today = OffsetDateTime::now_utc().date();
            // Due a month ago; paying moves the due date to roughly today,
            // which is within the five-day reactivation window.
            let bill = insert_bill(
                user_id,
                NewBill {
                    name: "Electricity".to_owned(),
                    amount: 1200.0,
                    due_date: today - Duration::days(30),
                    recurrence: Recurrence::Monthly,
                    description: String::new(),
                },
                &connection,
            )
            .unwrap();
            pay_bill(user_id, bill.id, today, &mut connection).unwrap();
            assert!(get_bill(bill.id, user_id, &connection).unwrap().is_paid);
            bill.id
        };

        get_bills_page(Extension(user_id), State(state.clone()))
            .await
            .unwrap();

        let connection = state.db_connection.lock().unwrap();
        assert!(!get_bill(bill_id, user_id, &connection).unwrap().is_paid);
    }
}

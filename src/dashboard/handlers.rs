//! Dashboard HTTP handlers and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    bills::{ScheduledBill, upcoming_bills},
    dashboard::{
        aggregation::{
            daily_totals, expenses_in_range, first_day_of_month, income_in_range,
            monthly_totals, previous_month_range,
        },
        cards::{DashboardFigures, low_stock_card, summary_cards_view, upcoming_bills_card},
        charts::{
            DashboardChart, charts_script, charts_view, daily_cash_flow_chart,
            monthly_cash_flow_chart,
        },
    },
    endpoints,
    html::{HeadElement, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency_with, link},
    inventory::{Product, get_low_stock_products},
    navigation::NavBar,
    savings::transfer::{total_savings, wallet_balance},
    timezone::get_local_offset,
    transactions_page::{EntryKind, LedgerEntry, ListingFilter, count_entries, get_entries_page},
    user::{User, UserID, get_user_by_id},
};

/// How many of the latest ledger entries to show on the dashboard.
const RECENT_ENTRY_COUNT: u64 = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Manila".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    user: User,
    figures: DashboardFigures,
    charts: [DashboardChart; 2],
    upcoming: Vec<ScheduledBill>,
    low_stock: Vec<Product>,
    recent_entries: Vec<LedgerEntry>,
}

/// Display a page with an overview of the user's finances.
pub async fn get_dashboard_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<DashboardState>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;
    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let nav_bar = if user.is_admin {
        NavBar::new(endpoints::DASHBOARD_VIEW).with_admin_link(endpoints::DASHBOARD_VIEW)
    } else {
        NavBar::new(endpoints::DASHBOARD_VIEW)
    };

    match build_dashboard_data(user, today, &connection)? {
        Some(data) => Ok(dashboard_view(nav_bar, &data).into_response()),
        None => Ok(dashboard_no_data_view(nav_bar).into_response()),
    }
}

/// Fetches and builds all data needed for the dashboard display.
///
/// Returns `None` when the user has no ledger entries at all.
fn build_dashboard_data(
    user: User,
    today: Date,
    connection: &Connection,
) -> Result<Option<DashboardData>, Error> {
    let user_id = user.id;
    let entry_count = count_entries(user_id, &ListingFilter::default(), connection)?;
    if entry_count == 0 {
        return Ok(None);
    }

    let month_start = first_day_of_month(today);
    let (last_month_start, last_month_end) = previous_month_range(today);
    let thirty_days_ago = today - Duration::days(30);

    let figures = DashboardFigures {
        wallet_balance: wallet_balance(user_id, connection)?,
        total_savings: total_savings(user_id, connection)?,
        month_income: income_in_range(user_id, month_start, today, connection)?,
        month_expenses: expenses_in_range(user_id, month_start, today, connection)?,
        last_month_income: income_in_range(user_id, last_month_start, last_month_end, connection)?,
        last_month_expenses: expenses_in_range(
            user_id,
            last_month_start,
            last_month_end,
            connection,
        )?,
        last_30_days_income: income_in_range(user_id, thirty_days_ago, today, connection)?,
        last_30_days_expenses: expenses_in_range(user_id, thirty_days_ago, today, connection)?,
        monthly_income_target: user.monthly_income_target,
        monthly_expense_target: user.monthly_expense_target,
    };

    let daily = daily_totals(user_id, thirty_days_ago, today, connection)?;
    let monthly = monthly_totals(user_id, today.year(), connection)?;

    let charts = [
        DashboardChart {
            id: "daily-cash-flow-chart",
            options: daily_cash_flow_chart(&daily).to_string(),
        },
        DashboardChart {
            id: "monthly-cash-flow-chart",
            options: monthly_cash_flow_chart(&monthly, today.year()).to_string(),
        },
    ];

    let upcoming = upcoming_bills(user_id, today, connection)?;
    let low_stock = if user.show_inventory_overview {
        get_low_stock_products(user_id, connection)?
    } else {
        Vec::new()
    };
    let recent_entries = get_entries_page(
        user_id,
        &ListingFilter::default(),
        RECENT_ENTRY_COUNT,
        0,
        connection,
    )?;

    Ok(Some(DashboardData {
        user,
        figures,
        charts,
        upcoming,
        low_stock,
        recent_entries,
    }))
}

/// Renders the dashboard page when no ledger data exists.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();
    let new_entry_link = link(endpoints::NEW_ENTRY_VIEW, "recording an entry");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts and summaries will show up here once you add some income
                or expenses. Start by " (new_entry_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

/// Renders the main dashboard page with cards, charts, and tables.
fn dashboard_view(nav_bar: NavBar, data: &DashboardData) -> Markup {
    let nav_bar = nav_bar.into_html();
    let head_elements = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(&data.charts),
    ];
    let currency = data.user.currency.as_str();
    let heading = if data.user.business_name.is_empty() {
        "Dashboard".to_owned()
    } else {
        data.user.business_name.clone()
    };

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            div class="w-full flex justify-between items-baseline mb-4"
            {
                h2 class="text-2xl font-bold" { (heading) }
                p { (link(endpoints::NEW_ENTRY_VIEW, "Record income or expense")) }
            }

            (summary_cards_view(currency, &data.figures))

            div class="grid grid-cols-1 md:grid-cols-2 gap-4 w-full mx-auto mb-4"
            {
                (upcoming_bills_card(currency, &data.upcoming))
                (low_stock_card(&data.low_stock))
            }

            (charts_view(&data.charts))

            (recent_entries_table(currency, &data.recent_entries))
        }
    );

    base("Dashboard", &head_elements, &content)
}

fn recent_entries_table(currency: &str, entries: &[LedgerEntry]) -> Markup {
    html!(
        section class="w-full mx-auto mb-8"
        {
            div class="flex justify-between items-baseline mb-2"
            {
                h3 class="text-lg font-semibold" { "Recent Transactions" }
                p class="text-sm" { (link(endpoints::TRANSACTIONS_VIEW, "View all")) }
            }

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
                        @for entry in entries {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (entry.date) }

                                td class=(TABLE_CELL_STYLE)
                                {
                                    @match entry.kind {
                                        EntryKind::Income => {
                                            span class="font-bold text-green-600 dark:text-green-400" { "Income" }
                                        }
                                        EntryKind::Expense => {
                                            span class="font-bold text-red-600 dark:text-red-400" { "Expense" }
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
        }
    )
}

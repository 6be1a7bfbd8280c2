//! The transactions page: a unified, filterable listing of income and
//! expense entries.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::{Connection, Row, named_params};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    dates::parse_form_date,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency_with, link,
    },
    navigation::NavBar,
    pagination::{PaginationConfig, PaginationIndicator, create_pagination_indicators},
    user::{UserID, get_user_by_id},
};

/// Whether a ledger entry is money in or money out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }
}

/// One row of the unified listing.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub id: i64,
    pub amount: f64,
    pub description: String,
    pub date: Date,
}

/// Which entries to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    Income,
    Expense,
}

/// The column to sort the listing by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Date,
    Amount,
}

/// The direction to sort the listing in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// The filters applied to the unified listing.
#[derive(Debug, Default, Clone)]
pub struct ListingFilter {
    pub kind: KindFilter,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

/// Assemble the SQL for the unified listing.
///
/// Only fixed clause fragments are concatenated; every user-supplied value is
/// bound as a parameter.
fn listing_sql(filter: &ListingFilter, select: &str, paged: bool) -> String {
    let date_clause = match (filter.start_date, filter.end_date) {
        (Some(_), Some(_)) => " AND date >= :start_date AND date <= :end_date",
        (Some(_), None) => " AND date >= :start_date",
        (None, Some(_)) => " AND date <= :end_date",
        (None, None) => "",
    };

    let income_half =
        format!("SELECT 'income' AS kind, id, amount, description, date FROM income WHERE user_id = :user_id{date_clause}");
    let expense_half =
        format!("SELECT 'expense' AS kind, id, amount, description, date FROM expense WHERE user_id = :user_id{date_clause}");

    let source = match filter.kind {
        KindFilter::All => format!("{income_half} UNION ALL {expense_half}"),
        KindFilter::Income => income_half,
        KindFilter::Expense => expense_half,
    };

    let direction = match filter.sort_order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let order_clause = match filter.sort_by {
        SortBy::Date => format!("ORDER BY date {direction}, id {direction}"),
        SortBy::Amount => format!("ORDER BY amount {direction}, id {direction}"),
    };

    if paged {
        format!("{select} FROM ({source}) {order_clause} LIMIT :limit OFFSET :offset")
    } else {
        format!("{select} FROM ({source})")
    }
}

fn map_row(row: &Row) -> Result<LedgerEntry, rusqlite::Error> {
    let raw_kind: String = row.get(0)?;

    let kind = match raw_kind.as_str() {
        "income" => EntryKind::Income,
        "expense" => EntryKind::Expense,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("invalid ledger entry kind {other:?}").into(),
            ));
        }
    };

    Ok(LedgerEntry {
        kind,
        id: row.get(1)?,
        amount: row.get(2)?,
        description: row.get(3)?,
        date: row.get(4)?,
    })
}

/// Count the entries matching `filter`.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn count_entries(
    user_id: UserID,
    filter: &ListingFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    let sql = listing_sql(filter, "SELECT COUNT(*)", false);
    let mut statement = connection.prepare(&sql)?;

    let count: i64 = match (filter.start_date, filter.end_date) {
        (Some(start), Some(end)) => statement.query_row(
            named_params! {":user_id": user_id.as_i64(), ":start_date": start, ":end_date": end},
            |row| row.get(0),
        )?,
        (Some(start), None) => statement.query_row(
            named_params! {":user_id": user_id.as_i64(), ":start_date": start},
            |row| row.get(0),
        )?,
        (None, Some(end)) => statement.query_row(
            named_params! {":user_id": user_id.as_i64(), ":end_date": end},
            |row| row.get(0),
        )?,
        (None, None) => statement.query_row(
            named_params! {":user_id": user_id.as_i64()},
            |row| row.get(0),
        )?,
    };

    Ok(count as u64)
}

/// Retrieve one page of entries matching `filter`.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_entries_page(
    user_id: UserID,
    filter: &ListingFilter,
    page_size: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<LedgerEntry>, Error> {
    let sql = listing_sql(filter, "SELECT kind, id, amount, description, date", true);
    let mut statement = connection.prepare(&sql)?;
    let limit = page_size as i64;
    let offset = offset as i64;

    let rows = match (filter.start_date, filter.end_date) {
        (Some(start), Some(end)) => statement.query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":start_date": start,
                ":end_date": end,
                ":limit": limit,
                ":offset": offset,
            },
            map_row,
        )?,
        (Some(start), None) => statement.query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":start_date": start,
                ":limit": limit,
                ":offset": offset,
            },
            map_row,
        )?,
        (None, Some(end)) => statement.query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":end_date": end,
                ":limit": limit,
                ":offset": offset,
            },
            map_row,
        )?,
        (None, None) => statement.query_map(
            named_params! {
                ":user_id": user_id.as_i64(),
                ":limit": limit,
                ":offset": offset,
            },
            map_row,
        )?,
    };

    rows.map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to page the listing.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsPageQuery {
    pub page: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<KindFilter>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// Display the unified transactions listing for the logged-in user.
pub async fn get_transactions_page(
    Extension(user_id): Extension<UserID>,
    State(state): State<TransactionsPageState>,
    Query(query): Query<TransactionsPageQuery>,
) -> Result<Response, Error> {
    let filter = ListingFilter {
        kind: query.kind.unwrap_or_default(),
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
        start_date: parse_form_date(&query.start_date),
        end_date: parse_form_date(&query.end_date),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;

    let page_size = state.pagination_config.default_page_size;
    let entry_count = count_entries(user_id, &filter, &connection)?;
    let page_count = entry_count.div_ceil(page_size).max(1);
    let current_page = query
        .page
        .unwrap_or(state.pagination_config.default_page)
        .clamp(1, page_count);
    let entries = get_entries_page(
        user_id,
        &filter,
        page_size,
        (current_page - 1) * page_size,
        &connection,
    )?;

    let indicators =
        create_pagination_indicators(current_page, page_count, state.pagination_config.max_pages);

    Ok(transactions_view(
        NavBar::new(endpoints::TRANSACTIONS_VIEW),
        &user.currency,
        &filter,
        &query,
        &entries,
        &indicators,
    )
    .into_response())
}

fn transactions_view(
    nav_bar: NavBar,
    currency: &str,
    filter: &ListingFilter,
    query: &TransactionsPageQuery,
    entries: &[LedgerEntry],
    indicators: &[PaginationIndicator],
) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div class="flex flex-col px-2 lg:px-6 lg:py-8 mx-auto max-w-screen-xl text-gray-900 dark:text-white"
        {
            div class="flex justify-between items-baseline"
            {
                h2 class="text-xl font-bold" { "Transactions" }
                p { (link(endpoints::NEW_ENTRY_VIEW, "Record a new entry")) }
            }

            (filter_card(filter, query))

            section class="w-full mx-auto mt-4 mb-8"
            {
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
                            @if entries.is_empty() {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td colspan="4" class="px-6 py-4 text-center"
                                    {
                                        "No transactions match these filters."
                                    }
                                }
                            }

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

                (pagination_nav(filter, query, indicators))
            }
        }
    );

    base("Transactions", &[], &content)
}

fn filter_card(filter: &ListingFilter, query: &TransactionsPageQuery) -> Markup {
    html!(
        div class=(CARD_STYLE)
        {
            form method="get" action=(endpoints::TRANSACTIONS_VIEW)
                class="grid grid-cols-2 md:grid-cols-6 gap-4 items-end"
            {
                div
                {
                    label for="type" class=(FORM_LABEL_STYLE) { "Type" }
                    select id="type" name="type" class=(FORM_SELECT_STYLE)
                    {
                        option value="all" selected[filter.kind == KindFilter::All] { "All" }
                        option value="income" selected[filter.kind == KindFilter::Income] { "Income" }
                        option value="expense" selected[filter.kind == KindFilter::Expense] { "Expense" }
                    }
                }

                div
                {
                    label for="sort_by" class=(FORM_LABEL_STYLE) { "Sort by" }
                    select id="sort_by" name="sort_by" class=(FORM_SELECT_STYLE)
                    {
                        option value="date" selected[filter.sort_by == SortBy::Date] { "Date" }
                        option value="amount" selected[filter.sort_by == SortBy::Amount] { "Amount" }
                    }
                }

                div
                {
                    label for="sort_order" class=(FORM_LABEL_STYLE) { "Order" }
                    select id="sort_order" name="sort_order" class=(FORM_SELECT_STYLE)
                    {
                        option value="desc" selected[filter.sort_order == SortOrder::Desc] { "Newest first" }
                        option value="asc" selected[filter.sort_order == SortOrder::Asc] { "Oldest first" }
                    }
                }

                div
                {
                    label for="start_date" class=(FORM_LABEL_STYLE) { "From" }
                    input id="start_date" type="date" name="start_date"
                        value=(query.start_date) class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="end_date" class=(FORM_LABEL_STYLE) { "To" }
                    input id="end_date" type="date" name="end_date"
                        value=(query.end_date) class=(FORM_TEXT_INPUT_STYLE);
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Apply" }
            }
        }
    )
}

fn pagination_nav(
    filter: &ListingFilter,
    query: &TransactionsPageQuery,
    indicators: &[PaginationIndicator],
) -> Markup {
    let page_link = |page: u64| {
        let kind = match filter.kind {
            KindFilter::All => "all",
            KindFilter::Income => "income",
            KindFilter::Expense => "expense",
        };
        let sort_by = match filter.sort_by {
            SortBy::Date => "date",
            SortBy::Amount => "amount",
        };
        let sort_order = match filter.sort_order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };

        let query_string = serde_urlencoded::to_string([
            ("page", page.to_string().as_str()),
            ("type", kind),
            ("sort_by", sort_by),
            ("sort_order", sort_order),
            ("start_date", query.start_date.as_str()),
            ("end_date", query.end_date.as_str()),
        ])
        .unwrap_or_else(|_| format!("page={page}"));

        format!("{}?{}", endpoints::TRANSACTIONS_VIEW, query_string)
    };

    let inactive_style = "flex items-center justify-center h-10 px-4 text-sm font-medium \
        text-gray-500 bg-white border border-gray-300 rounded-lg hover:bg-gray-100 \
        hover:text-gray-700 dark:bg-gray-800 dark:border-gray-700 dark:text-gray-400";
    let active_style = "flex items-center justify-center h-10 px-4 text-sm font-medium \
        text-blue-600 bg-blue-50 border border-blue-300 rounded-lg dark:bg-gray-700 \
        dark:text-white";

    html!(
        nav class="flex justify-center items-center mt-6" aria-label="Transaction pages"
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

//! Date-bucketed ledger aggregation for the dashboard cards and charts.

use std::collections::HashMap;

use rusqlite::{Connection, named_params};
use time::{Date, Duration, Month};

use crate::{Error, user::UserID};

/// Income and expense totals for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTotal {
    pub date: Date,
    pub income: f64,
    pub expense: f64,
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub month: Month,
    pub income: f64,
    pub expense: f64,
}

fn sum_in_range(
    table: &str,
    user_id: UserID,
    from: Date,
    to: Date,
    connection: &Connection,
) -> Result<f64, Error> {
    // `table` is a fixed identifier chosen by the caller, never user input.
    let sql = format!(
        "SELECT COALESCE(SUM(amount), 0) FROM {table}
        WHERE user_id = :user_id AND date >= :from AND date <= :to"
    );

    connection
        .query_row(
            &sql,
            named_params! {":user_id": user_id.as_i64(), ":from": from, ":to": to},
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Total income received in the inclusive date range.
pub fn income_in_range(
    user_id: UserID,
    from: Date,
    to: Date,
    connection: &Connection,
) -> Result<f64, Error> {
    sum_in_range("income", user_id, from, to, connection)
}

/// Total expenses paid in the inclusive date range.
pub fn expenses_in_range(
    user_id: UserID,
    from: Date,
    to: Date,
    connection: &Connection,
) -> Result<f64, Error> {
    sum_in_range("expense", user_id, from, to, connection)
}

/// The first day of the month `date` falls in.
pub fn first_day_of_month(date: Date) -> Date {
    date.replace_day(1).expect("day one exists in every month")
}

/// The first and last day of the month before the one `date` falls in.
pub fn previous_month_range(date: Date) -> (Date, Date) {
    let first_of_this_month = first_day_of_month(date);
    let last_of_previous = first_of_this_month - Duration::days(1);

    (first_day_of_month(last_of_previous), last_of_previous)
}

fn grouped_by_day(
    table: &str,
    user_id: UserID,
    from: Date,
    to: Date,
    connection: &Connection,
) -> Result<HashMap<Date, f64>, Error> {
    let sql = format!(
        "SELECT date, SUM(amount) FROM {table}
        WHERE user_id = :user_id AND date >= :from AND date <= :to GROUP BY date"
    );

    connection
        .prepare(&sql)?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":from": from, ":to": to},
            |row| Ok((row.get::<_, Date>(0)?, row.get::<_, f64>(1)?)),
        )?
        .map(|maybe_pair| maybe_pair.map_err(|error| error.into()))
        .collect()
}

/// Income and expense totals for every day in the inclusive range, zeros
/// included so charts have a point for each day.
pub fn daily_totals(
    user_id: UserID,
    from: Date,
    to: Date,
    connection: &Connection,
) -> Result<Vec<DailyTotal>, Error> {
    let income_by_day = grouped_by_day("income", user_id, from, to, connection)?;
    let expense_by_day = grouped_by_day("expense", user_id, from, to, connection)?;

    let mut totals = Vec::new();
    let mut date = from;
    while date <= to {
        totals.push(DailyTotal {
            date,
            income: income_by_day.get(&date).copied().unwrap_or(0.0),
            expense: expense_by_day.get(&date).copied().unwrap_or(0.0),
        });
        date += Duration::days(1);
    }

    Ok(totals)
}

fn grouped_by_month(
    table: &str,
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<HashMap<u8, f64>, Error> {
    // Dates are stored as ISO 'YYYY-MM-DD' text, so strftime groups cleanly.
    let sql = format!(
        "SELECT CAST(strftime('%m', date) AS INTEGER), SUM(amount) FROM {table}
        WHERE user_id = :user_id AND strftime('%Y', date) = :year GROUP BY 1"
    );

    connection
        .prepare(&sql)?
        .query_map(
            named_params! {":user_id": user_id.as_i64(), ":year": year.to_string()},
            |row| Ok((row.get::<_, u8>(0)?, row.get::<_, f64>(1)?)),
        )?
        .map(|maybe_pair| maybe_pair.map_err(|error| error.into()))
        .collect()
}

/// Income and expense totals for every month of `year`, zeros included.
pub fn monthly_totals(
    user_id: UserID,
    year: i32,
    connection: &Connection,
) -> Result<Vec<MonthlyTotal>, Error> {
    let income_by_month = grouped_by_month("income", user_id, year, connection)?;
    let expense_by_month = grouped_by_month("expense", user_id, year, connection)?;

    let mut totals = Vec::with_capacity(12);
    let mut month = Month::January;
    for month_number in 1..=12u8 {
        totals.push(MonthlyTotal {
            month,
            income: income_by_month.get(&month_number).copied().unwrap_or(0.0),
            expense: expense_by_month.get(&month_number).copied().unwrap_or(0.0),
        });
        month = month.next();
    }

    Ok(totals)
}

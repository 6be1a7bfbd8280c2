//! The scheduled bill model and the queries and transactions that manage it.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime};

use crate::{Error, expense::insert_expense, user::UserID};

pub type BillId = i64;

/// How often a bill comes due again after being paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    /// The bill is paid once and then removed.
    Once,
    Weekly,
    Monthly,
    Yearly,
}

impl Recurrence {
    /// The string stored in the database for this recurrence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::Once => "once",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Yearly => "yearly",
        }
    }

    /// Parse a recurrence string from the database or a form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "once" => Some(Recurrence::Once),
            "weekly" => Some(Recurrence::Weekly),
            "monthly" => Some(Recurrence::Monthly),
            "yearly" => Some(Recurrence::Yearly),
            _ => None,
        }
    }

    /// All recurrence options in display order, for form selects.
    pub const ALL: [Recurrence; 4] = [
        Recurrence::Once,
        Recurrence::Weekly,
        Recurrence::Monthly,
        Recurrence::Yearly,
    ];
}

impl Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let display_name = match self {
            Recurrence::Once => "Once",
            Recurrence::Weekly => "Weekly",
            Recurrence::Monthly => "Monthly",
            Recurrence::Yearly => "Yearly",
        };

        write!(f, "{display_name}")
    }
}

/// A bill the user expects to pay on or before a due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledBill {
    /// The ID of the bill.
    pub id: BillId,
    /// The user who owes the bill.
    pub user_id: UserID,
    /// The name of the bill, e.g. 'Shop rent'.
    pub name: String,
    /// The amount due. Always positive.
    pub amount: f64,
    /// When the bill is next due.
    pub due_date: Date,
    /// How often the bill comes due again.
    pub recurrence: Recurrence,
    /// Free-form notes about the bill.
    pub description: String,
    /// Whether the current period has been paid.
    pub is_paid: bool,
    /// When the bill was first scheduled.
    pub created_at: OffsetDateTime,
}

/// The data needed to schedule a new bill.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub name: String,
    pub amount: f64,
    pub due_date: Date,
    pub recurrence: Recurrence,
    pub description: String,
}

pub fn create_bill_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS scheduled_bill (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES user(id),
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            due_date TEXT NOT NULL,
            recurrence TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            is_paid INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scheduled_bill_user_due ON scheduled_bill(user_id, due_date);",
    )?;

    Ok(())
}

const BILL_COLUMNS: &str =
    "id, user_id, name, amount, due_date, recurrence, description, is_paid, created_at";

fn map_row(row: &Row) -> Result<ScheduledBill, rusqlite::Error> {
    let raw_recurrence: String = row.get(5)?;

    let recurrence = Recurrence::parse(&raw_recurrence).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("invalid recurrence {raw_recurrence:?}").into(),
        )
    })?;

    Ok(ScheduledBill {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        amount: row.get(3)?,
        due_date: row.get(4)?,
        recurrence,
        description: row.get(6)?,
        is_paid: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Schedule a new bill. New bills always start unpaid.
///
/// # Errors
/// Returns [Error::EmptyBillName] if the name is empty or
/// [Error::NonPositiveAmount] if the amount is zero or negative.
pub fn insert_bill(
    user_id: UserID,
    new_bill: NewBill,
    connection: &Connection,
) -> Result<ScheduledBill, Error> {
    let name = new_bill.name.trim().to_owned();

    if name.is_empty() {
        return Err(Error::EmptyBillName);
    }

    if new_bill.amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO scheduled_bill (user_id, name, amount, due_date, recurrence, description, is_paid, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        (
            user_id.as_i64(),
            &name,
            new_bill.amount,
            new_bill.due_date,
            new_bill.recurrence.as_str(),
            &new_bill.description,
            created_at,
        ),
    )?;

    Ok(ScheduledBill {
        id: connection.last_insert_rowid(),
        user_id,
        name,
        amount: new_bill.amount,
        due_date: new_bill.due_date,
        recurrence: new_bill.recurrence,
        description: new_bill.description,
        is_paid: false,
        created_at,
    })
}

/// Get a bill by ID, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to
/// another user.
pub fn get_bill(bill_id: BillId, user_id: UserID, connection: &Connection) -> Result<ScheduledBill, Error> {
    connection
        .prepare(&format!(
            "SELECT {BILL_COLUMNS} FROM scheduled_bill WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &bill_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all bills owned by `user_id`, soonest due first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_all_bills(user_id: UserID, connection: &Connection) -> Result<Vec<ScheduledBill>, Error> {
    connection
        .prepare(&format!(
            "SELECT {BILL_COLUMNS} FROM scheduled_bill WHERE user_id = :user_id ORDER BY due_date ASC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_bill| maybe_bill.map_err(|error| error.into()))
        .collect()
}

/// Unpaid bills due within the next five days, for the dashboard and the
/// bills page highlights.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn upcoming_bills(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<Vec<ScheduledBill>, Error> {
    connection
        .prepare(&format!(
            "SELECT {BILL_COLUMNS} FROM scheduled_bill
            WHERE user_id = :user_id AND is_paid = 0
                AND due_date >= date(:today) AND due_date <= date(:today, '+5 days')
            ORDER BY due_date ASC"
        ))?
        .query_map(
            rusqlite::named_params! {":user_id": user_id.as_i64(), ":today": today},
            map_row,
        )?
        .map(|maybe_bill| maybe_bill.map_err(|error| error.into()))
        .collect()
}

/// Update a bill's details.
///
/// # Errors
/// Returns [Error::EmptyBillName], [Error::NonPositiveAmount], or
/// [Error::UpdateMissingBill] if no bill matches.
pub fn update_bill(
    bill_id: BillId,
    user_id: UserID,
    updated: NewBill,
    is_paid: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let name = updated.name.trim().to_owned();

    if name.is_empty() {
        return Err(Error::EmptyBillName);
    }

    if updated.amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    let rows_affected = connection.execute(
        "UPDATE scheduled_bill
        SET name = ?1, amount = ?2, due_date = ?3, recurrence = ?4, description = ?5, is_paid = ?6
        WHERE id = ?7 AND user_id = ?8",
        (
            &name,
            updated.amount,
            updated.due_date,
            updated.recurrence.as_str(),
            &updated.description,
            is_paid,
            bill_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBill);
    }

    Ok(())
}

/// Delete a bill without paying it.
///
/// # Errors
/// Returns [Error::DeleteMissingBill] if no bill matches.
pub fn delete_bill(bill_id: BillId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM scheduled_bill WHERE id = ?1 AND user_id = ?2",
        (bill_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingBill);
    }

    Ok(())
}

/// The due date after `due_date` for a recurring bill.
///
/// Monthly and yearly recurrences clamp the day to the end of a shorter
/// month, e.g. Jan 31 -> Feb 28.
pub fn next_due_date(due_date: Date, recurrence: Recurrence) -> Date {
    match recurrence {
        Recurrence::Once => due_date,
        Recurrence::Weekly => due_date + time::Duration::weeks(1),
        Recurrence::Monthly => {
            let (year, month) = match due_date.month() {
                Month::December => (due_date.year() + 1, Month::January),
                month => (due_date.year(), month.next()),
            };
            clamped_date(year, month, due_date.day())
        }
        Recurrence::Yearly => clamped_date(due_date.year() + 1, due_date.month(), due_date.day()),
    }
}

fn clamped_date(year: i32, month: Month, day: u8) -> Date {
    let day = day.min(time::util::days_in_month(month, year));

    // The day is clamped into range, so this cannot fail for valid years.
    Date::from_calendar_date(year, month, day)
        .unwrap_or_else(|_| Date::from_calendar_date(year, month, 1).expect("valid month start"))
}

/// Pay a bill: record the expense and advance or remove the bill, as one
/// atomic operation.
///
/// Inside one transaction: insert an expense row for the bill's amount dated
/// `today`, then delete the bill if it is a one-off, or mark it paid with
/// its due date moved one period forward. If any step fails nothing is
/// written.
///
/// Returns the bill as it was when paid.
///
/// # Errors
/// - [Error::PayMissingBill] if the bill does not exist or belongs to
///   another user.
/// - [Error::SqlError] if a write fails; prior writes are rolled back.
pub fn pay_bill(
    user_id: UserID,
    bill_id: BillId,
    today: Date,
    connection: &mut Connection,
) -> Result<ScheduledBill, Error> {
    let transaction = connection.transaction()?;

    let bill = match get_bill(bill_id, user_id, &transaction) {
        Ok(bill) => bill,
        Err(Error::NotFound) => return Err(Error::PayMissingBill),
        Err(error) => return Err(error),
    };

    insert_expense(
        user_id,
        bill.amount,
        &format!("Paid: {}", bill.name),
        today,
        &transaction,
    )?;

    if bill.recurrence == Recurrence::Once {
        let rows_affected = transaction.execute(
            "DELETE FROM scheduled_bill WHERE id = ?1 AND user_id = ?2",
            (bill_id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            return Err(Error::PayMissingBill);
        }
    } else {
        let next_due = next_due_date(bill.due_date, bill.recurrence);
        let rows_affected = transaction.execute(
            "UPDATE scheduled_bill SET is_paid = 1, due_date = ?1 WHERE id = ?2 AND user_id = ?3",
            (next_due, bill_id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            return Err(Error::PayMissingBill);
        }
    }

    transaction.commit()?;

    Ok(bill)
}

/// Flip paid recurring bills back to unpaid once their next due date is
/// within five days of `today`. Runs on every bills page load.
///
/// Returns the number of bills reactivated.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn reactivate_due_bills(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE scheduled_bill SET is_paid = 0
            WHERE user_id = ?1 AND is_paid = 1 AND recurrence <> 'once'
                AND date(due_date, '-5 days') <= date(?2)",
            (user_id.as_i64(), today),
        )
        .map_err(|error| error.into())
}


#[cfg(test)]
mod bill_query_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{Error, db::initialize, user::UserID};

    use super::{
        NewBill, Recurrence, delete_bill, get_all_bills, get_bill, insert_bill, upcoming_bills,
        update_bill,
    };

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    fn new_bill(name: &str, due: time::Date) -> NewBill {
        NewBill {
            name: name.to_owned(),
            amount: 500.0,
            due_date: due,
            recurrence: Recurrence::Monthly,
            description: String::new(),
        }
    }

    #[test]
    fn insert_bill_round_trips() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        let bill =
            insert_bill(user_id, new_bill("Rent", date!(2025 - 08 - 01)), &connection).unwrap();

        assert!(bill.id > 0);
        assert!(!bill.is_paid);
        assert_eq!(Ok(bill), get_bill(1, user_id, &connection));
    }

    #[test]
    fn insert_bill_rejects_bad_input() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);

        let mut empty_name = new_bill("  ", date!(2025 - 08 - 01));
        empty_name.amount = 100.0;
        assert_eq!(
            insert_bill(user_id, empty_name, &connection),
            Err(Error::EmptyBillName)
        );

        let mut zero_amount = new_bill("Rent", date!(2025 - 08 - 01));
        zero_amount.amount = 0.0;
        assert_eq!(
            insert_bill(user_id, zero_amount, &connection),
            Err(Error::NonPositiveAmount)
        );
    }

    #[test]
    fn bills_are_listed_soonest_first() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        insert_bill(user_id, new_bill("Later", date!(2025 - 09 - 01)), &connection).unwrap();
        insert_bill(user_id, new_bill("Sooner", date!(2025 - 08 - 01)), &connection).unwrap();

        let bills = get_all_bills(user_id, &connection).unwrap();

        assert_eq!(bills[0].name, "Sooner");
        assert_eq!(bills[1].name, "Later");
    }

    #[test]
    fn upcoming_bills_spans_five_days_and_skips_paid() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        let today = date!(2025 - 08 - 01);
        insert_bill(user_id, new_bill("Due today", today), &connection).unwrap();
        insert_bill(user_id, new_bill("Due in five", date!(2025 - 08 - 06)), &connection)
            .unwrap();
        insert_bill(user_id, new_bill("Due in six", date!(2025 - 08 - 07)), &connection)
            .unwrap();
        insert_bill(user_id, new_bill("Overdue", date!(2025 - 07 - 30)), &connection).unwrap();
        let paid = insert_bill(user_id, new_bill("Paid", date!(2025 - 08 - 02)), &connection)
            .unwrap();
        update_bill(
            paid.id,
            user_id,
            new_bill("Paid", date!(2025 - 08 - 02)),
            true,
            &connection,
        )
        .unwrap();

        let upcoming = upcoming_bills(user_id, today, &connection).unwrap();

        let names: Vec<&str> = upcoming.iter().map(|bill| bill.name.as_str()).collect();
        assert_eq!(names, vec!["Due today", "Due in five"]);
    }

    #[test]
    fn update_bill_changes_all_fields() {
        let connection = get_db_connection();
        let user_id = UserID::new(1);
        let bill =
            insert_bill(user_id, new_bill("Rent", date!(2025 - 08 - 01)), &connection).unwrap();

        update_bill(
            bill.id,
            user_id,
            NewBill {
                name: "Shop rent".to_owned(),
                amount: 750.0,
                due_date: date!(2025 - 08 - 15),
                recurrence: Recurrence::Weekly,
                description: "renegotiated".to_owned(),
            },
            true,
            &connection,
        )
        .unwrap();

        let updated = get_bill(bill.id, user_id, &connection).unwrap();
        assert_eq!(updated.name, "Shop rent");
        assert_eq!(updated.amount, 750.0);
        assert_eq!(updated.due_date, date!(2025 - 08 - 15));
        assert_eq!(updated.recurrence, Recurrence::Weekly);
        assert!(updated.is_paid);
    }

    #[test]
    fn update_missing_bill_errors() {
        let connection = get_db_connection();

        let result = update_bill(
            999,
            UserID::new(1),
            new_bill("Rent", date!(2025 - 08 - 01)),
            false,
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingBill));
    }

    #[test]
    fn delete_bill_is_scoped_to_owner() {
        let connection = get_db_connection();
        let owner = UserID::new(1);
        let bill =
            insert_bill(owner, new_bill("Rent", date!(2025 - 08 - 01)), &connection).unwrap();

        assert_eq!(
            delete_bill(bill.id, UserID::new(2), &connection),
            Err(Error::DeleteMissingBill)
        );
        assert!(delete_bill(bill.id, owner, &connection).is_ok());
        assert_eq!(get_bill(bill.id, owner, &connection), Err(Error::NotFound));
    }
}

#[cfg(test)]
mod pay_bill_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        expense::total_expenses,
        user::UserID,
    };

    use super::{NewBill, Recurrence, get_bill, insert_bill, pay_bill};

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    fn new_bill(recurrence: Recurrence) -> NewBill {
        NewBill {
            name: "Electricity".to_owned(),
            amount: 1200.0,
            due_date: date!(2025 - 08 - 01),
            recurrence,
            description: String::new(),
        }
    }

    #[test]
    fn paying_a_one_off_bill_records_expense_and_removes_it() {
        let mut connection = get_db_connection();
        let user_id = UserID::new(1);
        let bill = insert_bill(user_id, new_bill(Recurrence::Once), &connection).unwrap();

        let paid = pay_bill(user_id, bill.id, date!(2025 - 07 - 30), &mut connection).unwrap();

        assert_eq!(paid.name, "Electricity");
        assert_eq!(total_expenses(user_id, &connection), Ok(1200.0));
        assert_eq!(get_bill(bill.id, user_id, &connection), Err(Error::NotFound));

        let (description,): (String,) = connection
            .query_row("SELECT description FROM expense", [], |row| {
                Ok((row.get(0)?,))
            })
            .unwrap();
        assert_eq!(description, "Paid: Electricity");
    }

    #[test]
    fn paying_a_recurring_bill_advances_the_due_date() {
        let mut connection = get_db_connection();
        let user_id = UserID::new(1);
        let bill = insert_bill(user_id, new_bill(Recurrence::Monthly), &connection).unwrap();

        pay_bill(user_id, bill.id, date!(2025 - 07 - 30), &mut connection).unwrap();

        let updated = get_bill(bill.id, user_id, &connection).unwrap();
        assert!(updated.is_paid);
        assert_eq!(updated.due_date, date!(2025 - 09 - 01));
        assert_eq!(total_expenses(user_id, &connection), Ok(1200.0));
    }

    #[test]
    fn paying_a_missing_bill_writes_nothing() {
        let mut connection = get_db_connection();
        let user_id = UserID::new(1);

        let result = pay_bill(user_id, 999, date!(2025 - 07 - 30), &mut connection);

        assert_eq!(result, Err(Error::PayMissingBill));
        assert_eq!(total_expenses(user_id, &connection), Ok(0.0));
    }

    #[test]
    fn pay_rolls_back_when_the_bill_update_fails() {
        let mut connection = get_db_connection();
        let user_id = UserID::new(1);
        let bill = insert_bill(user_id, new_bill(Recurrence::Once), &connection).unwrap();

        // Paying the same one-off bill twice: the second attempt finds no
        // bill and must leave no extra expense behind.
        pay_bill(user_id, bill.id, date!(2025 - 07 - 30), &mut connection).unwrap();
        let result = pay_bill(user_id, bill.id, date!(2025 - 07 - 30), &mut connection);

        assert_eq!(result, Err(Error::PayMissingBill));
        assert_eq!(total_expenses(user_id, &connection), Ok(1200.0));
    }
}

#[cfg(test)]
mod reactivation_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{db::initialize, user::UserID};

    use super::{NewBill, Recurrence, get_bill, insert_bill, pay_bill, reactivate_due_bills};

    fn get_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    fn paid_monthly_bill(connection: &mut Connection, user_id: UserID, due: time::Date) -> i64 {
        let bill = insert_bill(
            user_id,
            NewBill {
                name: "Rent".to_owned(),
                amount: 500.0,
                due_date: due,
                recurrence: Recurrence::Monthly,
                description: String::new(),
            },
            connection,
        )
        .unwrap();
        pay_bill(user_id, bill.id, due, connection).unwrap();

        bill.id
    }

    #[test]
    fn reactivates_bills_close_to_their_next_due_date() {
        let mut connection = get_db_connection();
        let user_id = UserID::new(1);
        // Paying moves the due date to 2025-08-01.
        let bill_id = paid_monthly_bill(&mut connection, user_id, date!(2025 - 07 - 01));

        // Five days out: reactivate.
        let reactivated =
            reactivate_due_bills(user_id, date!(2025 - 07 - 27), &connection).unwrap();

        assert_eq!(reactivated, 1);
        assert!(!get_bill(bill_id, user_id, &connection).unwrap().is_paid);
    }

    #[test]
    fn leaves_bills_alone_when_the_due_date_is_far_off() {
        let mut connection = get_db_connection();
        let user_id = UserID::new(1);
        let bill_id = paid_monthly_bill(&mut connection, user_id, date!(2025 - 07 - 01));

        let reactivated =
            reactivate_due_bills(user_id, date!(2025 - 07 - 10), &connection).unwrap();

        assert_eq!(reactivated, 0);
        assert!(get_bill(bill_id, user_id, &connection).unwrap().is_paid);
    }
}

//! Scheduled bills: recurring or one-off expenses with a due date.
//!
//! Paying a bill records an expense in the ledger and either removes the
//! bill (one-off) or pushes its due date forward one period. Paid recurring
//! bills flip back to unpaid automatically as their next due date
//! approaches.

mod core;
mod edit;
mod endpoints;
mod page;

pub use core::{
    BillId, NewBill, Recurrence, ScheduledBill, create_bill_table, delete_bill, get_all_bills,
    get_bill, insert_bill, next_due_date, pay_bill, reactivate_due_bills, upcoming_bills,
    update_bill,
};
pub use edit::{get_edit_bill_page, update_bill_endpoint};
pub use endpoints::{create_bill_endpoint, delete_bill_endpoint, pay_bill_endpoint};
pub use page::{BillsPageState, get_bills_page};

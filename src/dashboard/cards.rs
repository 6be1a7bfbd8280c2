//! Summary cards for the dashboard: balances, month-to-date figures with
//! target progress, upcoming bills, and low stock warnings.

use maud::{Markup, html};

use crate::{
    bills::ScheduledBill,
    endpoints,
    html::{CARD_STYLE, format_currency_with, link},
    inventory::Product,
};

/// The headline figures shown on the dashboard.
#[derive(Debug, Clone, Default)]
pub(super) struct DashboardFigures {
    pub wallet_balance: f64,
    pub total_savings: f64,
    pub month_income: f64,
    pub month_expenses: f64,
    pub last_month_income: f64,
    pub last_month_expenses: f64,
    pub last_30_days_income: f64,
    pub last_30_days_expenses: f64,
    pub monthly_income_target: f64,
    pub monthly_expense_target: f64,
}

pub(super) fn summary_cards_view(currency: &str, figures: &DashboardFigures) -> Markup {
    html!(
        section class="grid grid-cols-1 md:grid-cols-2 xl:grid-cols-4 gap-4 w-full mx-auto mb-4"
        {
            div class=(CARD_STYLE)
            {
                h3 class="text-sm font-semibold text-gray-500 dark:text-gray-400 uppercase"
                {
                    "Cash On Hand"
                }
                p class="text-3xl font-bold text-blue-600 dark:text-blue-400 mt-2"
                {
                    (format_currency_with(currency, figures.wallet_balance))
                }
                p class="text-sm text-gray-500 dark:text-gray-400 mt-1"
                {
                    "Savings held separately: "
                    (format_currency_with(currency, figures.total_savings))
                }
            }

            (target_card(
                "Income This Month",
                currency,
                figures.month_income,
                figures.monthly_income_target,
                figures.last_month_income,
                "text-green-600 dark:text-green-400",
            ))

            (target_card(
                "Expenses This Month",
                currency,
                figures.month_expenses,
                figures.monthly_expense_target,
                figures.last_month_expenses,
                "text-red-600 dark:text-red-400",
            ))

            div class=(CARD_STYLE)
            {
                h3 class="text-sm font-semibold text-gray-500 dark:text-gray-400 uppercase"
                {
                    "Last 30 Days"
                }
                p class="mt-2"
                {
                    "Income: "
                    span class="font-bold text-green-600 dark:text-green-400"
                    {
                        (format_currency_with(currency, figures.last_30_days_income))
                    }
                }
                p
                {
                    "Expenses: "
                    span class="font-bold text-red-600 dark:text-red-400"
                    {
                        (format_currency_with(currency, figures.last_30_days_expenses))
                    }
                }
                p class="text-sm text-gray-500 dark:text-gray-400 mt-1"
                {
                    "Net: "
                    (format_currency_with(
                        currency,
                        figures.last_30_days_income - figures.last_30_days_expenses,
                    ))
                }
            }
        }
    )
}

fn target_card(
    title: &str,
    currency: &str,
    amount: f64,
    target: f64,
    last_month: f64,
    amount_style: &str,
) -> Markup {
    let progress = if target > 0.0 {
        Some(((amount / target) * 100.0).min(100.0))
    } else {
        None
    };

    html!(
        div class=(CARD_STYLE)
        {
            h3 class="text-sm font-semibold text-gray-500 dark:text-gray-400 uppercase"
            {
                (title)
            }
            p class=(format!("text-3xl font-bold mt-2 {amount_style}"))
            {
                (format_currency_with(currency, amount))
            }

            @if let Some(progress) = progress {
                div class="h-2 rounded-full bg-gray-200 dark:bg-gray-700 overflow-hidden mt-3"
                {
                    div
                        class="h-full rounded-full bg-blue-500"
                        style=(format!("width: {progress:.0}%;"))
                    {}
                }
                p class="text-sm text-gray-500 dark:text-gray-400 mt-1"
                {
                    (format!("{progress:.0}% of the {} target", format_currency_with(currency, target)))
                }
            } @else {
                p class="text-sm text-gray-500 dark:text-gray-400 mt-1"
                {
                    "Last month: " (format_currency_with(currency, last_month))
                }
            }
        }
    )
}

pub(super) fn upcoming_bills_card(currency: &str, bills: &[ScheduledBill]) -> Markup {
    html!(
        div class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold mb-2" { "Bills Due Soon" }

            @if bills.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Nothing due in the next five days."
                }
            } @else {
                ul class="space-y-2"
                {
                    @for bill in bills {
                        li class="flex justify-between text-sm"
                        {
                            span { (bill.name) " — due " (bill.due_date) }
                            span class="font-semibold"
                            {
                                (format_currency_with(currency, bill.amount))
                            }
                        }
                    }
                }
            }

            p class="text-sm mt-3" { (link(endpoints::BILLS_VIEW, "Manage bills")) }
        }
    )
}

pub(super) fn low_stock_card(low_stock: &[Product]) -> Markup {
    html!(
        div class=(CARD_STYLE)
        {
            h3 class="text-lg font-semibold mb-2" { "Inventory Overview" }

            @if low_stock.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "All products are above their minimum stock levels."
                }
            } @else {
                ul class="space-y-2"
                {
                    @for product in low_stock {
                        li class="flex justify-between text-sm"
                        {
                            span { (product.name) }
                            span class="font-semibold text-amber-600 dark:text-amber-400"
                            {
                                (product.stock_quantity) " left (min " (product.min_stock_level) ")"
                            }
                        }
                    }
                }
            }

            p class="text-sm mt-3" { (link(endpoints::INVENTORY_VIEW, "Manage inventory")) }
        }
    )
}

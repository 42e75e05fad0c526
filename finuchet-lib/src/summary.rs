//! Income and expense totals per category and per month

use chrono::{Datelike, NaiveDate};
use finuchet_repo::transaction_repo::TransactionKind;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Serialize, Clone, Copy, PartialEq, Debug, Default)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
}

impl Totals {
    fn add(&mut self, kind: TransactionKind, amount: Decimal) {
        match kind {
            TransactionKind::Income => self.income += amount,
            TransactionKind::Expense => self.expense += amount,
        }
    }
}

/// Months are keyed `YYYY-MM`
#[derive(Serialize, Clone, PartialEq, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub category_summary: BTreeMap<String, Totals>,
    pub monthly_summary: BTreeMap<String, Totals>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub profit: Decimal,
}

impl Summary {
    pub fn add(
        &mut self,
        date: NaiveDate,
        kind: TransactionKind,
        category: Option<&str>,
        amount: Decimal,
    ) {
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);
        self.category_summary
            .entry(category.to_owned())
            .or_default()
            .add(kind, amount);

        let month = format!("{:04}-{:02}", date.year(), date.month());
        self.monthly_summary.entry(month).or_default().add(kind, amount);

        match kind {
            TransactionKind::Income => self.total_income += amount,
            TransactionKind::Expense => self.total_expense += amount,
        }
        self.profit = self.total_income - self.total_expense;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[actix_rt::test]
    async fn groups_by_category_and_month() {
        let mut summary = Summary::default();
        summary.add(date(2023, 1, 5), TransactionKind::Income, Some("Salary"), Decimal::new(1000, 0));
        summary.add(date(2023, 1, 9), TransactionKind::Expense, Some("Groceries"), Decimal::new(150, 0));
        summary.add(date(2023, 2, 1), TransactionKind::Expense, Some("Groceries"), Decimal::new(50, 0));
        summary.add(date(2023, 2, 3), TransactionKind::Expense, None, Decimal::new(25, 0));

        assert_eq!(summary.total_income, Decimal::new(1000, 0));
        assert_eq!(summary.total_expense, Decimal::new(225, 0));
        assert_eq!(summary.profit, Decimal::new(775, 0));
        assert_eq!(
            summary.category_summary["Groceries"],
            Totals {
                income: Decimal::ZERO,
                expense: Decimal::new(200, 0)
            }
        );
        assert_eq!(
            summary.category_summary[UNCATEGORIZED].expense,
            Decimal::new(25, 0)
        );
        assert_eq!(summary.monthly_summary["2023-01"].income, Decimal::new(1000, 0));
        assert_eq!(summary.monthly_summary["2023-02"].expense, Decimal::new(75, 0));
    }

    #[actix_rt::test]
    async fn empty_summary() {
        let summary = Summary::default();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["categorySummary"], serde_json::json!({}));
        assert_eq!(summary.profit, Decimal::ZERO);
    }
}

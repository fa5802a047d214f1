//! Aggregated totals for the finance overview.

use crate::{error::Result, Category, Error, Transaction, TransactionKind};
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Calendar month bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

/// Totals over a set of transactions. Amounts are summed by magnitude; the
/// kind decides which side of the balance they land on. A total that leaves
/// the `Decimal` range is an [`Error::AmountOverflow`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub count: usize,
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    pub by_category: BTreeMap<Category, Decimal>,
}

impl Summary {
    pub fn of<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Result<Self> {
        let mut summary = Summary::default();
        for tx in transactions {
            summary.add(tx)?;
        }
        Ok(summary)
    }

    fn add(&mut self, tx: &Transaction) -> Result<()> {
        let amount = tx.fields.amount.abs();
        let overflow = || Error::AmountOverflow(tx.unique_id.clone());

        match tx.fields.kind {
            TransactionKind::Income => {
                self.income = self.income.checked_add(amount).ok_or_else(overflow)?;
                self.balance = self.balance.checked_add(amount).ok_or_else(overflow)?;
            }
            TransactionKind::Expense => {
                self.expenses = self.expenses.checked_add(amount).ok_or_else(overflow)?;
                self.balance = self.balance.checked_sub(amount).ok_or_else(overflow)?;
            }
        }
        let total = self.by_category.entry(tx.fields.category).or_default();
        *total = total.checked_add(amount).ok_or_else(overflow)?;
        self.count += 1;
        Ok(())
    }
}

/// Per-month summaries keyed by the month the money moved.
pub fn monthly<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Result<BTreeMap<Month, Summary>> {
    let mut months: BTreeMap<Month, Summary> = BTreeMap::new();
    for tx in transactions {
        let at = tx.fields.occurred_at;
        let key = Month {
            year: at.year(),
            month: at.month(),
        };
        months.entry(key).or_default().add(tx)?;
    }
    Ok(months)
}

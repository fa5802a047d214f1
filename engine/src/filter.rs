//! Display-time filtering of the transaction list.
//!
//! Filters only narrow what is shown; they never take part in
//! reconciliation.

use crate::{error::Result, Category, Error, Transaction, TransactionKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind selector offered by the list screen. `All` exists only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KindFilter {
    Expense,
    Income,
    #[default]
    All,
}

impl KindFilter {
    pub fn matches(&self, kind: TransactionKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Expense => kind == TransactionKind::Expense,
            KindFilter::Income => kind == TransactionKind::Income,
        }
    }
}

impl From<TransactionKind> for KindFilter {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Expense => KindFilter::Expense,
            TransactionKind::Income => KindFilter::Income,
        }
    }
}

impl TryFrom<KindFilter> for TransactionKind {
    type Error = Error;

    fn try_from(filter: KindFilter) -> Result<Self> {
        match filter {
            KindFilter::Expense => Ok(TransactionKind::Expense),
            KindFilter::Income => Ok(TransactionKind::Income),
            KindFilter::All => Err(Error::FilterKindNotStorable),
        }
    }
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: &T) -> bool {
        *value >= self.min && *value <= self.max
    }

    fn is_inverted(&self) -> bool {
        self.min > self.max
    }
}

/// Optional bundle of predicates applied to the in-memory list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Bounds<Decimal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred: Option<Bounds<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<KindFilter>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub categories: BTreeSet<Category>,
    /// Case-insensitive substring of the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amount_between(mut self, min: Decimal, max: Decimal) -> Self {
        self.amount = Some(Bounds::new(min, max));
        self
    }

    pub fn occurred_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.occurred = Some(Bounds::new(from, to));
        self
    }

    pub fn with_kind(mut self, kind: KindFilter) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories.extend(categories);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Reject ranges whose lower bound is above the upper bound.
    pub fn validate(&self) -> Result<()> {
        if self.amount.as_ref().is_some_and(Bounds::is_inverted) {
            return Err(Error::InvertedRange { field: "amount" });
        }
        if self.occurred.as_ref().is_some_and(Bounds::is_inverted) {
            return Err(Error::InvertedRange { field: "occurredAt" });
        }
        Ok(())
    }

    /// Number of active criteria, as shown on the filter badge.
    pub fn active_count(&self) -> usize {
        let mut count = 0;
        if matches!(self.kind, Some(k) if k != KindFilter::All) {
            count += 1;
        }
        if !self.categories.is_empty() {
            count += 1;
        }
        if self.amount.is_some() {
            count += 1;
        }
        if self.occurred.is_some() {
            count += 1;
        }
        if self.search.as_deref().is_some_and(|s| !s.trim().is_empty()) {
            count += 1;
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        let fields = &tx.fields;

        let kind_ok = self.kind.map_or(true, |k| k.matches(fields.kind));
        let amount_ok = self
            .amount
            .as_ref()
            .map_or(true, |b| b.contains(&fields.amount));
        let occurred_ok = self
            .occurred
            .as_ref()
            .map_or(true, |b| b.contains(&fields.occurred_at));
        let category_ok = self.categories.is_empty() || self.categories.contains(&fields.category);
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => fields
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        };

        kind_ok && amount_ok && occurred_ok && category_ok && search_ok
    }

    /// Keep the matching transactions, preserving order.
    pub fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
        transactions.iter().filter(|tx| self.matches(tx)).collect()
    }
}

//! Transaction types: the local record, its remote mirror document, and the
//! field set that both sides share.

use crate::{Error, LocalId, RemoteRef, UniqueId, UserId};
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Direction of a money movement. This is the only kind that is ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 2] = [TransactionKind::Expense, TransactionKind::Income];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Income => "INCOME",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Older installs stored the plural spelling.
            "EXPENSE" | "EXPENSES" => Ok(TransactionKind::Expense),
            "INCOME" => Ok(TransactionKind::Income),
            "ALL" => Err(Error::FilterKindNotStorable),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// Fixed set of spending and income categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    CreditCard,
    Food,
    Clothing,
    Shopping,
    Bills,
    Beauty,
    Education,
    Entertainment,
    Paycheck,
    OtherExpense,
    OtherIncome,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::CreditCard,
        Category::Food,
        Category::Clothing,
        Category::Shopping,
        Category::Bills,
        Category::Beauty,
        Category::Education,
        Category::Entertainment,
        Category::Paycheck,
        Category::OtherExpense,
        Category::OtherIncome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CreditCard => "CREDIT_CARD",
            Category::Food => "FOOD",
            Category::Clothing => "CLOTHING",
            Category::Shopping => "SHOPPING",
            Category::Bills => "BILLS",
            Category::Beauty => "BEAUTY",
            Category::Education => "EDUCATION",
            Category::Entertainment => "ENTERTAINMENT",
            Category::Paycheck => "PAYCHECK",
            Category::OtherExpense => "OTHER_EXPENSE",
            Category::OtherIncome => "OTHER_INCOME",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// Sub-second digits kept on `occurred_at`. The remote mirror stores
/// microseconds, so anything finer would never compare equal after a round
/// trip.
pub const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;

/// `at` truncated to the precision both stores keep.
pub fn stored_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)
}

fn deserialize_occurred_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    DateTime::<Utc>::deserialize(deserializer).map(stored_precision)
}

/// The field set that is mirrored between the local store and the remote
/// collection. Two copies of a transaction are equal iff these are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFields {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Decimal,
    /// Date the money moved, not the time the record was created
    #[serde(deserialize_with = "deserialize_occurred_at")]
    pub occurred_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub category: Category,
}

impl TransactionFields {
    pub fn new(
        title: impl Into<String>,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
        kind: TransactionKind,
        category: Category,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            amount,
            occurred_at: stored_precision(occurred_at),
            kind,
            category,
        }
    }

    /// The same fields with `occurred_at` cut to [`TIMESTAMP_SUBSEC_DIGITS`].
    pub fn at_stored_precision(mut self) -> Self {
        self.occurred_at = stored_precision(self.occurred_at);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A transaction as held by the on-device store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Store-assigned surrogate key; never sent to the remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<LocalId>,
    /// Client-generated join key between the local and remote copies
    pub unique_id: UniqueId,
    /// Handle of the remote document, once mirrored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ref: Option<RemoteRef>,
    #[serde(flatten)]
    pub fields: TransactionFields,
    /// True iff the local copy is believed to match a remote copy
    #[serde(default)]
    pub synced: bool,
}

impl Transaction {
    /// Create a new unsynced transaction with a fresh random unique id.
    pub fn new(fields: TransactionFields) -> Self {
        Self::with_unique_id(uuid::Uuid::new_v4().to_string(), fields)
    }

    /// Create an unsynced transaction with a caller-provided unique id.
    pub fn with_unique_id(unique_id: impl Into<UniqueId>, fields: TransactionFields) -> Self {
        Self {
            local_id: None,
            unique_id: unique_id.into(),
            remote_ref: None,
            fields: fields.at_stored_precision(),
            synced: false,
        }
    }

    /// Record that the local copy now matches the remote document `remote_ref`.
    pub fn mark_synced(&mut self, remote_ref: Option<RemoteRef>) {
        self.synced = true;
        if remote_ref.is_some() {
            self.remote_ref = remote_ref;
        }
    }

    /// Replace the field values. The unique id never changes.
    pub fn apply_edit(&mut self, fields: TransactionFields) {
        self.fields = fields.at_stored_precision();
        self.synced = false;
    }

    /// Whether this copy carries the same field values as a remote document.
    pub fn matches_remote(&self, doc: &RemoteDoc) -> bool {
        self.unique_id == doc.unique_id && self.fields == doc.fields
    }

    /// Wire body for writing this transaction to the remote mirror.
    pub fn to_body(&self) -> DocumentBody {
        DocumentBody {
            unique_id: self.unique_id.clone(),
            fields: self.fields.clone(),
        }
    }
}

/// A transaction document in the remote mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDoc {
    pub remote_ref: RemoteRef,
    pub user_id: UserId,
    pub unique_id: UniqueId,
    #[serde(flatten)]
    pub fields: TransactionFields,
}

impl RemoteDoc {
    /// Convert into a local copy that is known to match this document.
    pub fn into_local(self) -> Transaction {
        Transaction {
            local_id: None,
            unique_id: self.unique_id,
            remote_ref: Some(self.remote_ref),
            fields: self.fields,
            synced: true,
        }
    }
}

/// Request body for adding or replacing a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    pub unique_id: UniqueId,
    #[serde(flatten)]
    pub fields: TransactionFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn lunch() -> TransactionFields {
        TransactionFields::new(
            "Lunch",
            dec("12.50"),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            TransactionKind::Expense,
            Category::Food,
        )
    }

    #[test]
    fn new_transaction_is_unsynced_with_uuid() {
        let tx = Transaction::new(lunch());
        assert!(!tx.synced);
        assert!(tx.remote_ref.is_none());
        assert!(uuid::Uuid::parse_str(&tx.unique_id).is_ok());
    }

    #[test]
    fn unique_ids_are_distinct() {
        let a = Transaction::new(lunch());
        let b = Transaction::new(lunch());
        assert_ne!(a.unique_id, b.unique_id);
    }

    #[test]
    fn edit_keeps_unique_id_and_clears_synced() {
        let mut tx = Transaction::with_unique_id("tx-1", lunch());
        tx.mark_synced(Some("doc-1".into()));
        assert!(tx.synced);

        let mut fields = lunch();
        fields.amount = dec("15.00");
        tx.apply_edit(fields);

        assert_eq!(tx.unique_id, "tx-1");
        assert_eq!(tx.remote_ref.as_deref(), Some("doc-1"));
        assert!(!tx.synced);
    }

    #[test]
    fn mark_synced_without_ref_keeps_existing_ref() {
        let mut tx = Transaction::with_unique_id("tx-1", lunch());
        tx.mark_synced(Some("doc-1".into()));
        tx.mark_synced(None);
        assert_eq!(tx.remote_ref.as_deref(), Some("doc-1"));
    }

    #[test]
    fn remote_doc_into_local_is_synced() {
        let doc = RemoteDoc {
            remote_ref: "doc-9".into(),
            user_id: "user-1".into(),
            unique_id: "tx-9".into(),
            fields: lunch(),
        };
        let local = doc.clone().into_local();
        assert!(local.synced);
        assert_eq!(local.remote_ref.as_deref(), Some("doc-9"));
        assert!(local.matches_remote(&doc));
    }

    #[test]
    fn kind_parsing_rejects_all() {
        assert_eq!(
            "EXPENSES".parse::<TransactionKind>(),
            Ok(TransactionKind::Expense)
        );
        assert_eq!(
            "ALL".parse::<TransactionKind>(),
            Err(Error::FilterKindNotStorable)
        );
        assert!(matches!(
            "TRANSFER".parse::<TransactionKind>(),
            Err(Error::UnknownKind(_))
        ));
    }

    #[test]
    fn category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("GROCERIES".parse::<Category>().is_err());
    }

    #[test]
    fn wire_format_is_flat_camel_case() {
        let mut tx = Transaction::with_unique_id("tx-1", lunch().with_description("with Ana"));
        tx.mark_synced(Some("doc-1".into()));

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["uniqueId"], "tx-1");
        assert_eq!(json["remoteRef"], "doc-1");
        assert_eq!(json["title"], "Lunch");
        assert_eq!(json["amount"], "12.50");
        assert_eq!(json["kind"], "EXPENSE");
        assert_eq!(json["category"], "FOOD");
        assert_eq!(json["synced"], true);
        assert!(json.get("localId").is_none());

        let parsed: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, tx);
    }

    #[test]
    fn occurred_at_is_kept_to_microseconds() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let micros = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);

        let mut fields = lunch();
        fields.occurred_at = at;
        assert_eq!(fields.clone().at_stored_precision().occurred_at, micros);

        let tx = Transaction::with_unique_id("tx-1", fields.clone());
        assert_eq!(tx.fields.occurred_at, micros);

        let mut edited = Transaction::with_unique_id("tx-2", lunch());
        edited.apply_edit(fields.clone());
        assert_eq!(edited.fields.occurred_at, micros);

        let built = TransactionFields::new("Lunch", dec("1"), at, TransactionKind::Expense, Category::Food);
        assert_eq!(built.occurred_at, micros);
    }

    #[test]
    fn nanosecond_timestamp_survives_a_microsecond_store() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(987_654_321);
        let tx = Transaction::with_unique_id(
            "tx-1",
            TransactionFields::new("Coffee", dec("3.50"), now, TransactionKind::Expense, Category::Food),
        );

        // What a column with microsecond resolution hands back.
        let mut stored = tx.fields.clone();
        stored.occurred_at = stored.occurred_at.trunc_subsecs(6);
        let doc = RemoteDoc {
            remote_ref: "doc-1".into(),
            user_id: "user-1".into(),
            unique_id: "tx-1".into(),
            fields: stored,
        };

        assert!(tx.matches_remote(&doc));
    }

    #[test]
    fn deserialized_timestamps_are_truncated() {
        let json = r#"{
            "title": "Lunch",
            "amount": "12.50",
            "occurredAt": "2024-03-01T12:00:00.123456789Z",
            "kind": "EXPENSE",
            "category": "FOOD"
        }"#;
        let fields: TransactionFields = serde_json::from_str(json).unwrap();
        assert_eq!(fields.occurred_at.timestamp_subsec_nanos(), 123_456_000);
    }
}

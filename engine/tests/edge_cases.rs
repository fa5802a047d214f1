//! Edge case tests for lumen-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use chrono::{DateTime, TimeZone, Utc};
use lumen_engine::{
    summary, validate_fields, validate_transaction, Category, KindFilter, Reconciler, RemoteDoc,
    Summary, SyncAction, Transaction, TransactionFields, TransactionFilter, TransactionKind,
};
use rust_decimal::Decimal;

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn fields(title: &str, amount: &str) -> TransactionFields {
    TransactionFields::new(
        title,
        amount.parse().unwrap(),
        at(2024, 2, 29),
        TransactionKind::Expense,
        Category::Shopping,
    )
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[test]
fn unicode_titles() {
    let titles = vec![
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Pão de queijo",
        "Tab\tand\nnewline",
    ];

    for title in titles {
        let fields = fields(title, "9.99");
        assert!(validate_fields(&fields).is_ok(), "rejected: {title}");

        let json = serde_json::to_string(&Transaction::new(fields.clone())).unwrap();
        let parsed: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.fields, fields);
    }
}

#[test]
fn title_length_counts_characters_not_bytes() {
    // 120 three-byte characters is still a valid title.
    let title = "€".repeat(120);
    assert!(validate_fields(&fields(&title, "1")).is_ok());
}

#[test]
fn search_is_case_insensitive_beyond_ascii() {
    let list = vec![Transaction::with_unique_id("a", fields("CAFÉ da manhã", "7.5"))];
    let filter = TransactionFilter::new().with_search("café");
    assert_eq!(filter.apply(&list).len(), 1);
}

#[test]
fn whitespace_only_search_is_inactive() {
    let filter = TransactionFilter::new().with_search("   ");
    assert_eq!(filter.active_count(), 0);
}

// ============================================================================
// Amount Edge Cases
// ============================================================================

#[test]
fn decimal_scale_survives_json() {
    let tx = Transaction::with_unique_id("a", fields("Coffee", "3.10"));
    let json = serde_json::to_value(&tx).unwrap();
    assert_eq!(json["amount"], "3.10");

    let parsed: Transaction = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.fields.amount.to_string(), "3.10");
}

#[test]
fn large_amounts_sum_exactly() {
    let list: Vec<Transaction> = (0..1_000)
        .map(|i| Transaction::with_unique_id(format!("tx-{i}"), fields("Bulk", "0.01")))
        .collect();
    let summary = Summary::of(&list).unwrap();
    assert_eq!(summary.expenses, Decimal::new(1_000, 2));
    assert_eq!(summary.balance, Decimal::new(-1_000, 2));

    let huge = Transaction::with_unique_id("big", fields("Big", "79228162514264337593543950"));
    assert!(validate_transaction(&huge).is_ok());
}

#[test]
fn valid_amounts_whose_total_overflows_do_not_panic() {
    let a = Transaction::with_unique_id("a", fields("Max", "79228162514264337593543950335"));
    let b = Transaction::with_unique_id("b", fields("Max", "79228162514264337593543950335"));
    assert!(validate_transaction(&a).is_ok());
    assert!(validate_transaction(&b).is_ok());

    let result = std::panic::catch_unwind(|| Summary::of([&a, &b]));
    assert!(matches!(result, Ok(Err(lumen_engine::Error::AmountOverflow(_)))));
}

#[test]
fn zero_amount_rejected_in_any_scale() {
    assert!(validate_fields(&fields("Nothing", "0.00")).is_err());
}

// ============================================================================
// Date Edge Cases
// ============================================================================

#[test]
fn dates_before_epoch_rejected() {
    let mut f = fields("Old", "1");
    f.occurred_at = at(1969, 12, 31);
    assert!(validate_fields(&f).is_err());
}

#[test]
fn monthly_buckets_cross_year_boundary() {
    let mut dec = Transaction::with_unique_id("dec", fields("Gift", "20"));
    dec.fields.occurred_at = at(2023, 12, 31);
    let mut jan = Transaction::with_unique_id("jan", fields("Gift", "30"));
    jan.fields.occurred_at = at(2024, 1, 1);

    let months = summary::monthly([&jan, &dec]).unwrap();
    let keys: Vec<_> = months.keys().map(|m| (m.year, m.month)).collect();
    assert_eq!(keys, vec![(2023, 12), (2024, 1)]);
}

#[test]
fn date_range_bounds_are_inclusive() {
    let list = vec![Transaction::with_unique_id("leap", fields("Leap", "1"))];
    let filter = TransactionFilter::new().occurred_between(at(2024, 2, 29), at(2024, 2, 29));
    assert_eq!(filter.apply(&list).len(), 1);
}

// ============================================================================
// Kind Edge Cases
// ============================================================================

#[test]
fn all_filter_never_deserializes_into_a_stored_kind() {
    let json = r#"{
        "uniqueId": "a",
        "title": "Bad",
        "amount": "1",
        "occurredAt": "2024-01-01T00:00:00Z",
        "kind": "ALL",
        "category": "FOOD"
    }"#;
    assert!(serde_json::from_str::<Transaction>(json).is_err());

    let filter: TransactionFilter = serde_json::from_str(r#"{"kind":"ALL"}"#).unwrap();
    assert_eq!(filter.kind, Some(KindFilter::All));
}

// ============================================================================
// Reconciliation Edge Cases
// ============================================================================

#[test]
fn ids_with_special_characters() {
    let ids = ["a/b", "a b", "ünïcödé", "id\"quoted\"", ""];
    let local: Vec<Transaction> = ids
        .iter()
        .map(|id| Transaction::with_unique_id(*id, fields("x", "1")))
        .collect();

    let plan = Reconciler::new(&local, &[]).plan().unwrap();
    assert_eq!(plan.push_count(), ids.len());
}

#[test]
fn many_records_plan_without_remote_writes_when_in_sync() {
    let remote: Vec<RemoteDoc> = (0..5_000)
        .map(|i| RemoteDoc {
            remote_ref: format!("ref-{i}"),
            user_id: "user-1".into(),
            unique_id: format!("tx-{i:05}"),
            fields: fields("Synced", "1"),
        })
        .collect();
    let local: Vec<Transaction> = remote.iter().cloned().map(RemoteDoc::into_local).collect();

    let plan = Reconciler::new(&local, &remote).plan().unwrap();
    assert!(plan.is_noop());
}

#[test]
fn local_record_without_ref_matches_by_unique_id() {
    let doc = RemoteDoc {
        remote_ref: "ref-1".into(),
        user_id: "user-1".into(),
        unique_id: "tx-1".into(),
        fields: fields("Lunch", "10"),
    };
    let mut local = Transaction::with_unique_id("tx-1", fields("Lunch (edited)", "12"));
    local.synced = false;

    let plan = Reconciler::new(&[local.clone()], &[doc]).plan().unwrap();
    assert_eq!(
        plan.actions,
        vec![SyncAction::PushUpdate {
            transaction: local,
            remote_ref: "ref-1".into(),
        }]
    );
}

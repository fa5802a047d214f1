//! FFI layer for the mobile shell.
//!
//! C-compatible functions for the Android and iOS hosts. All data crosses
//! the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `lumen_*` functions are allocated by Rust
//! - Caller must free them with `lumen_string_free`
//! - `lumen_version` returns a static string that must not be freed
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{
    summary, validate, AccountConfig, FieldError, ReconcilePlan, Reconciler, RemoteDoc, Summary,
    Transaction, TransactionFields, TransactionFilter,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(Serialize)]
#[serde(untagged)]
enum FfiResult<T: Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: Serialize> FfiResult<T> {
    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

impl<T: Serialize> From<Result<T, String>> for FfiResult<T> {
    fn from(result: Result<T, String>) -> Self {
        match result {
            Ok(ok) => FfiResult::Ok { ok },
            Err(error) => FfiResult::Err { error },
        }
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `lumen_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

fn respond<T: Serialize>(result: Result<T, String>) -> *mut c_char {
    to_c_string(FfiResult::from(result).to_json())
}

/// Read a JSON argument.
///
/// # Safety
/// `ptr` must be a valid null-terminated C string or null.
unsafe fn parse_arg<T: DeserializeOwned>(ptr: *const c_char, what: &str) -> Result<T, String> {
    if ptr.is_null() {
        return Err(format!("null {what}"));
    }
    let text = CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("{what} is not valid UTF-8"))?;
    serde_json::from_str(text).map_err(|e| format!("parse error in {what}: {e}"))
}

/// Input of `lumen_plan_reconcile`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanRequest {
    local: Vec<Transaction>,
    remote: Vec<RemoteDoc>,
    #[serde(default)]
    erasure_pending: bool,
}

/// Input of `lumen_filter`.
#[derive(Debug, Deserialize)]
struct FilterRequest {
    transactions: Vec<Transaction>,
    #[serde(default)]
    filter: TransactionFilter,
}

/// Output of `lumen_summarize`.
#[derive(Debug, Serialize)]
struct SummaryResponse {
    total: Summary,
    months: Vec<MonthEntry>,
}

#[derive(Debug, Serialize)]
struct MonthEntry {
    year: i32,
    month: u32,
    summary: Summary,
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Plan a reconciliation pass.
///
/// # Arguments
/// - `request_json`: `{"local": [Transaction], "remote": [RemoteDoc], "erasurePending": bool}`
///
/// # Returns
/// JSON string: `{"ok": ReconcilePlan}` or `{"error": "message"}`
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `lumen_string_free`
#[no_mangle]
pub unsafe extern "C" fn lumen_plan_reconcile(request_json: *const c_char) -> *mut c_char {
    let result = parse_arg::<PlanRequest>(request_json, "plan request").and_then(|req| {
        Reconciler::new(&req.local, &req.remote)
            .with_erasure_pending(req.erasure_pending)
            .plan()
            .map_err(|e| e.to_string())
    });
    respond::<ReconcilePlan>(result)
}

// ============================================================================
// Listing
// ============================================================================

/// Filter a transaction list for display.
///
/// # Arguments
/// - `request_json`: `{"transactions": [Transaction], "filter": TransactionFilter}`
///
/// # Returns
/// JSON string: `{"ok": [Transaction]}` or `{"error": "message"}`
///
/// # Safety
/// - `request_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `lumen_string_free`
#[no_mangle]
pub unsafe extern "C" fn lumen_filter(request_json: *const c_char) -> *mut c_char {
    let result = parse_arg::<FilterRequest>(request_json, "filter request").and_then(|req| {
        req.filter.validate().map_err(|e| e.to_string())?;
        Ok(req
            .filter
            .apply(&req.transactions)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>())
    });
    respond(result)
}

/// Summarize a transaction list, overall and per month.
///
/// # Returns
/// JSON string: `{"ok": {"total": Summary, "months": [...]}}` or `{"error": "message"}`
///
/// # Safety
/// - `transactions_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `lumen_string_free`
#[no_mangle]
pub unsafe extern "C" fn lumen_summarize(transactions_json: *const c_char) -> *mut c_char {
    let result = parse_arg::<Vec<Transaction>>(transactions_json, "transactions").and_then(|list| {
        let months = summary::monthly(&list)
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|(m, summary)| MonthEntry {
                year: m.year,
                month: m.month,
                summary,
            })
            .collect();
        Ok(SummaryResponse {
            total: Summary::of(&list).map_err(|e| e.to_string())?,
            months,
        })
    });
    respond(result)
}

// ============================================================================
// Forms
// ============================================================================

/// Validate a transaction form.
///
/// # Returns
/// JSON string: `{"ok": [FieldError]}` (empty when valid) or `{"error": "message"}`
///
/// # Safety
/// - `fields_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `lumen_string_free`
#[no_mangle]
pub unsafe extern "C" fn lumen_validate(fields_json: *const c_char) -> *mut c_char {
    let result = parse_arg::<TransactionFields>(fields_json, "fields").map(|fields| {
        match validate::validate_fields(&fields) {
            Ok(()) => Vec::new(),
            Err(e) => e.field_errors().to_vec(),
        }
    });
    respond::<Vec<FieldError>>(result)
}

/// Generate a fresh unique id for a new transaction.
///
/// # Safety
/// Caller must free the returned string with `lumen_string_free`.
#[no_mangle]
pub unsafe extern "C" fn lumen_new_unique_id() -> *mut c_char {
    to_c_string(uuid::Uuid::new_v4().to_string())
}

/// First-run account profile for a device locale such as `pt-BR`.
///
/// # Returns
/// JSON string: `{"ok": AccountConfig}` or `{"error": "message"}`
///
/// # Safety
/// - `locale` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `lumen_string_free`
#[no_mangle]
pub unsafe extern "C" fn lumen_account_defaults(locale: *const c_char) -> *mut c_char {
    let result = if locale.is_null() {
        Err("null locale".to_string())
    } else {
        CStr::from_ptr(locale)
            .to_str()
            .map(|tag| AccountConfig::from_locale(tag, None))
            .map_err(|_| "locale is not valid UTF-8".to_string())
    };
    respond(result)
}

// ============================================================================
// Utility
// ============================================================================

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `lumen_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn lumen_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn lumen_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::ptr;

    unsafe fn call(f: unsafe extern "C" fn(*const c_char) -> *mut c_char, input: &str) -> Value {
        let input = CString::new(input).unwrap();
        let out = f(input.as_ptr());
        let json: Value = serde_json::from_str(CStr::from_ptr(out).to_str().unwrap()).unwrap();
        lumen_string_free(out);
        json
    }

    const LUNCH: &str = r#"{
        "uniqueId": "tx-1",
        "title": "Lunch",
        "amount": "12.50",
        "occurredAt": "2024-03-01T12:00:00Z",
        "kind": "EXPENSE",
        "category": "FOOD",
        "synced": false
    }"#;

    #[test]
    fn ffi_plan_reconcile() {
        unsafe {
            let request = format!(r#"{{"local": [{LUNCH}], "remote": []}}"#);
            let json = call(lumen_plan_reconcile, &request);

            assert_eq!(json["ok"]["kind"], "incremental");
            assert_eq!(json["ok"]["actions"][0]["action"], "pushAdd");
            assert_eq!(json["ok"]["actions"][0]["transaction"]["uniqueId"], "tx-1");
        }
    }

    #[test]
    fn ffi_plan_first_hydration() {
        unsafe {
            let request = r#"{
                "local": [],
                "remote": [{
                    "remoteRef": "doc-1",
                    "userId": "user-1",
                    "uniqueId": "a",
                    "title": "Rent",
                    "amount": "900",
                    "occurredAt": "2024-03-01T00:00:00Z",
                    "kind": "EXPENSE",
                    "category": "BILLS"
                }]
            }"#;
            let json = call(lumen_plan_reconcile, request);
            assert_eq!(json["ok"]["kind"], "firstHydration");
            assert_eq!(json["ok"]["actions"][0]["doc"]["remoteRef"], "doc-1");
        }
    }

    #[test]
    fn ffi_filter_and_summarize() {
        unsafe {
            let request = format!(
                r#"{{"transactions": [{LUNCH}], "filter": {{"kind": "INCOME"}}}}"#
            );
            let json = call(lumen_filter, &request);
            assert_eq!(json["ok"].as_array().unwrap().len(), 0);

            let json = call(lumen_summarize, &format!("[{LUNCH}]"));
            assert_eq!(json["ok"]["total"]["expenses"], "12.50");
            assert_eq!(json["ok"]["months"][0]["month"], 3);
        }
    }

    #[test]
    fn ffi_summarize_reports_overflow_instead_of_unwinding() {
        unsafe {
            let big = |id: &str| {
                format!(
                    r#"{{"uniqueId": "{id}", "title": "Big", "amount": "79228162514264337593543950335",
                        "occurredAt": "2024-03-01T12:00:00Z", "kind": "INCOME", "category": "PAYCHECK"}}"#
                )
            };
            let json = call(lumen_summarize, &format!("[{}, {}]", big("a"), big("b")));
            assert!(json["error"].as_str().unwrap().contains("out of range"));
        }
    }

    #[test]
    fn ffi_filter_rejects_inverted_range() {
        unsafe {
            let request = format!(
                r#"{{"transactions": [{LUNCH}], "filter": {{"amount": {{"min": "10", "max": "1"}}}}}}"#
            );
            let json = call(lumen_filter, &request);
            assert!(json["error"].as_str().unwrap().contains("inverted amount range"));
        }
    }

    #[test]
    fn ffi_validate_reports_fields() {
        unsafe {
            let fields = r#"{
                "title": " ",
                "amount": "0",
                "occurredAt": "2024-03-01T12:00:00Z",
                "kind": "EXPENSE",
                "category": "FOOD"
            }"#;
            let json = call(lumen_validate, fields);
            let errors = json["ok"].as_array().unwrap();
            assert_eq!(errors.len(), 2);
            assert_eq!(errors[0]["field"], "title");
        }
    }

    #[test]
    fn ffi_account_defaults() {
        unsafe {
            let json = call(lumen_account_defaults, "pt-BR");
            assert_eq!(json["ok"]["language"], "PT");
            assert_eq!(json["ok"]["currency"], "BRL");
        }
    }

    #[test]
    fn ffi_unique_id_and_version() {
        unsafe {
            let id = lumen_new_unique_id();
            let id_str = CStr::from_ptr(id).to_str().unwrap();
            assert!(uuid::Uuid::parse_str(id_str).is_ok());
            lumen_string_free(id);

            let version = CStr::from_ptr(lumen_version()).to_str().unwrap();
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }

    #[test]
    fn ffi_error_handling() {
        unsafe {
            let out = lumen_plan_reconcile(ptr::null());
            let json = CStr::from_ptr(out).to_str().unwrap();
            assert!(json.contains("\"error\""));
            lumen_string_free(out);

            let json = call(lumen_plan_reconcile, "not valid json");
            assert!(json["error"].as_str().unwrap().starts_with("parse error"));

            let json = call(lumen_summarize, r#"[{"uniqueId": "x"}]"#);
            assert!(json.get("error").is_some());
        }
    }
}

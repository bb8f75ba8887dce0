//! FFI layer for embedding the engine in non-Rust clients.
//!
//! All data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `toto_*` functions are allocated by Rust
//! - Caller must free them with `toto_string_free`
//! - Session pointers must be freed with `toto_session_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{merge, score, LocalSession, MergeOptions, Mutation, Pick, PoolState, SystemClock};
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::Arc;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

fn error_string(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `toto_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|_| CString::from(c"{\"error\":\"string contained null bytes\"}"))
        .into_raw()
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Parse a JSON argument, producing the error envelope on failure.
unsafe fn parse_arg<T: serde::de::DeserializeOwned>(
    ptr: *const c_char,
    what: &str,
) -> Result<T, *mut c_char> {
    let raw = from_c_string(ptr).ok_or_else(|| error_string(format!("invalid {what} JSON")))?;
    serde_json::from_str(&raw).map_err(|e| error_string(format!("parse error: {}", e)))
}

// ============================================================================
// Stateless
// ============================================================================

/// Merge a server state with a local state.
///
/// # Arguments
/// - `server_json`: JSON of the server `PoolState`
/// - `local_json`: JSON of the local `PoolState`
/// - `prefer_local_settings`: non-zero to let local settings win
///
/// # Returns
/// JSON string: `{"ok": MergeOutcome}` or `{"error": "message"}`
///
/// # Safety
/// - `server_json` and `local_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `toto_string_free`
#[no_mangle]
pub unsafe extern "C" fn toto_merge(
    server_json: *const c_char,
    local_json: *const c_char,
    prefer_local_settings: i32,
) -> *mut c_char {
    let server: PoolState = match parse_arg(server_json, "server state") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let local: PoolState = match parse_arg(local_json, "local state") {
        Ok(s) => s,
        Err(e) => return e,
    };

    let options = MergeOptions {
        prefer_local_settings: prefer_local_settings != 0,
    };
    to_c_string(FfiResult::ok(merge(&server, &local, options)).to_json())
}

/// Score one guess against a week's results.
///
/// # Arguments
/// - `picks_json`: JSON array of picks, e.g. `["1","X","2"]`
/// - `results_json`: JSON array of results, same shape
///
/// # Returns
/// JSON string: `{"ok": <score>}` or `{"error": "message"}`
///
/// # Safety
/// - Both arguments must be valid null-terminated C strings or null
/// - Caller must free the returned string with `toto_string_free`
#[no_mangle]
pub unsafe extern "C" fn toto_score(
    picks_json: *const c_char,
    results_json: *const c_char,
) -> *mut c_char {
    let picks: Vec<Pick> = match parse_arg(picks_json, "picks") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let results: Vec<Pick> = match parse_arg(results_json, "results") {
        Ok(r) => r,
        Err(e) => return e,
    };
    to_c_string(FfiResult::ok(score(&picks, &results)).to_json())
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Create a local session.
///
/// # Arguments
/// - `state_json`: JSON of the saved local `PoolState`, or null for an empty one
///
/// # Returns
/// Pointer to LocalSession, or null if `state_json` does not parse.
///
/// # Safety
/// - `state_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `toto_session_free`
#[no_mangle]
pub unsafe extern "C" fn toto_session_new(state_json: *const c_char) -> *mut LocalSession {
    let state = if state_json.is_null() {
        PoolState::new()
    } else {
        match from_c_string(state_json).map(|s| PoolState::from_json(&s)) {
            Some(Ok(state)) => state,
            _ => return ptr::null_mut(),
        }
    };

    let session = LocalSession::with_state(state, Arc::new(SystemClock));
    Box::into_raw(Box::new(session))
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer from `toto_session_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn toto_session_free(session: *mut LocalSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `toto_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn toto_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Session Operations
// ============================================================================

/// Apply a mutation to the session.
///
/// # Returns
/// JSON string: `{"ok": ApplyResult}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `toto_session_new` or null
/// - `mutation_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `toto_string_free`
#[no_mangle]
pub unsafe extern "C" fn toto_session_apply(
    session: *mut LocalSession,
    mutation_json: *const c_char,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_string("null session pointer"),
    };
    let mutation: Mutation = match parse_arg(mutation_json, "mutation") {
        Ok(m) => m,
        Err(e) => return e,
    };

    match session.apply(mutation) {
        Ok(result) => to_c_string(FfiResult::ok(result).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

/// Merge a freshly fetched server state into the session.
///
/// The caller saves `ok.state` and then calls `toto_session_acknowledge`.
///
/// # Returns
/// JSON string: `{"ok": MergeOutcome}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `toto_session_new` or null
/// - `server_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `toto_string_free`
#[no_mangle]
pub unsafe extern "C" fn toto_session_merge(
    session: *mut LocalSession,
    server_json: *const c_char,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_string("null session pointer"),
    };
    let server: PoolState = match parse_arg(server_json, "server state") {
        Ok(s) => s,
        Err(e) => return e,
    };

    let outcome = session.merge_with(&server);
    to_c_string(FfiResult::ok(outcome).to_json())
}

/// Confirm that the merged state was saved; clears tombstones.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `toto_session_new` or null
/// - Caller must free the returned string with `toto_string_free`
#[no_mangle]
pub unsafe extern "C" fn toto_session_acknowledge(session: *mut LocalSession) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_string("null session pointer"),
    };

    session.acknowledge_saved();
    to_c_string(FfiResult::ok(()).to_json())
}

/// Export the session's current state.
///
/// # Returns
/// JSON string: `{"ok": PoolState}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `toto_session_new` or null
/// - Caller must free the returned string with `toto_string_free`
#[no_mangle]
pub unsafe extern "C" fn toto_session_export(session: *const LocalSession) -> *mut c_char {
    let session = match session.as_ref() {
        Some(s) => s,
        None => return error_string("null session pointer"),
    };

    to_c_string(FfiResult::ok(session.state()).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn toto_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    unsafe fn take_json(ptr: *mut c_char) -> Value {
        let text = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        toto_string_free(ptr);
        serde_json::from_str(&text).unwrap()
    }

    fn cstr(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn ffi_merge() {
        unsafe {
            let server = cstr(
                r#"{"matches":[{"id":"m1","week":1,"homeTeam":"A","awayTeam":"B","result":"","updatedAt":1}]}"#,
            );
            let local = cstr(
                r#"{"matches":[{"id":"m1","week":1,"homeTeam":"A","awayTeam":"B","result":"1","updatedAt":2}],
                    "deletedWeeks":[3]}"#,
            );

            let json = take_json(toto_merge(server.as_ptr(), local.as_ptr(), 0));
            assert_eq!(json["ok"]["state"]["matches"][0]["result"], "1");
            assert_eq!(json["ok"]["state"]["deletedWeeks"], serde_json::json!([3]));
            assert_eq!(json["ok"]["report"]["matches"]["localWon"], 1);
        }
    }

    #[test]
    fn ffi_score() {
        unsafe {
            let picks = cstr(r#"["1","X","2"]"#);
            let results = cstr(r#"["2","X","1"]"#);
            let json = take_json(toto_score(picks.as_ptr(), results.as_ptr()));
            assert_eq!(json["ok"], 1);
        }
    }

    #[test]
    fn ffi_session_lifecycle() {
        unsafe {
            let session = toto_session_new(ptr::null());
            assert!(!session.is_null());

            let add = cstr(r#"{"type":"addUser","name":"Dana"}"#);
            let json = take_json(toto_session_apply(session, add.as_ptr()));
            assert_eq!(json["ok"]["kind"], "addUser");

            let delete = cstr(r#"{"type":"deleteUser","name":"dana"}"#);
            take_json(toto_session_apply(session, delete.as_ptr()));

            let server = cstr(r#"{"users":[{"id":"u9","name":"DANA","updatedAt":1}]}"#);
            let json = take_json(toto_session_merge(session, server.as_ptr()));
            assert_eq!(json["ok"]["state"]["users"], serde_json::json!([]));

            let json = take_json(toto_session_acknowledge(session));
            assert!(json["ok"].is_null());

            let json = take_json(toto_session_export(session));
            assert_eq!(json["ok"]["deletedUsers"], serde_json::json!([]));

            toto_session_free(session);
        }
    }

    #[test]
    fn ffi_session_from_saved_state() {
        unsafe {
            let state = cstr(r#"{"users":[{"id":"u1","name":"Avi"}]}"#);
            let session = toto_session_new(state.as_ptr());
            assert!(!session.is_null());
            let json = take_json(toto_session_export(session));
            assert_eq!(json["ok"]["users"][0]["name"], "Avi");
            toto_session_free(session);

            let bad = cstr("not json");
            assert!(toto_session_new(bad.as_ptr()).is_null());
        }
    }

    #[test]
    fn ffi_version() {
        unsafe {
            let version = toto_version();
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
        }
    }

    #[test]
    fn ffi_error_handling() {
        unsafe {
            let mutation = cstr(r#"{"type":"deleteWeek","week":1}"#);
            let json = take_json(toto_session_apply(ptr::null_mut(), mutation.as_ptr()));
            assert_eq!(json["error"], "null session pointer");

            let session = toto_session_new(ptr::null());
            let invalid = cstr("not valid json");
            let json = take_json(toto_session_apply(session, invalid.as_ptr()));
            assert!(json["error"].as_str().unwrap().starts_with("parse error"));

            let unknown_user = cstr(r#"{"type":"setUserPayment","name":"x","status":"paid"}"#);
            let json = take_json(toto_session_apply(session, unknown_user.as_ptr()));
            assert_eq!(json["error"], "user not found: x");

            let json = take_json(toto_merge(ptr::null(), ptr::null(), 0));
            assert_eq!(json["error"], "invalid server state JSON");

            toto_session_free(session);
        }
    }
}

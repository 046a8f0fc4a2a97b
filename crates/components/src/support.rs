//! Shared argument-unpacking and domain-error helpers used by every handler
//! in this crate.
//!
//! Grounded on the CALL-dispatch convention documented in
//! `nn-runtime::method::ComponentContext` and `Computer::invoke`: a domain
//! failure is a `(nil, message)` pair pushed onto the frame, with the call
//! itself still returning `Ok(())`.

use nn_core::{NnResult, Value};
use nn_runtime::ComponentContext;

/// Pushes `(nil, message)` and returns `Ok(())`, the standard shape for a
/// domain error (bad argument, read-only device, no such file, ...).
pub fn fail(cx: &mut ComponentContext, message: impl Into<String>) -> NnResult<()> {
    cx.frame.push_return(Value::Nil);
    cx.frame.push_return(Value::string(message.into()));
    Ok(())
}

/// Reads argument `index` as a byte string, if it is one.
pub fn arg_bytes(cx: &ComponentContext, index: usize) -> Option<Vec<u8>> {
    cx.frame.get_argument(index).to_bytes().map(|b| b.to_vec())
}

/// Reads argument `index` as a UTF-8 string, lossily, if it is a string.
pub fn arg_string(cx: &ComponentContext, index: usize) -> Option<String> {
    arg_bytes(cx, index).map(|b| String::from_utf8_lossy(&b).into_owned())
}

/// Reads argument `index` as an integer (`toInt` semantics: nil/wrong type
/// reads as 0).
pub fn arg_int(cx: &ComponentContext, index: usize) -> i64 {
    cx.frame.get_argument(index).to_int()
}

/// Reads argument `index` as an integer, or `default` if that argument is
/// nil (distinguishing "omitted" from "explicitly zero").
pub fn arg_int_or(cx: &ComponentContext, index: usize, default: i64) -> i64 {
    let v = cx.frame.get_argument(index);
    if v.is_nil() {
        default
    } else {
        v.to_int()
    }
}

/// Reads argument `index` as a boolean, or `default` if omitted.
pub fn arg_bool_or(cx: &ComponentContext, index: usize, default: bool) -> bool {
    let v = cx.frame.get_argument(index);
    if v.is_nil() {
        default
    } else {
        v.to_boolean()
    }
}

/// Truncates `label` to `max_len` bytes on a UTF-8 boundary, matching the
/// `NN_LABEL_SIZE` truncation every labeled peripheral applies to `setLabel`.
pub fn truncate_label(label: &str, max_len: usize) -> String {
    if label.len() <= max_len {
        return label.to_string();
    }
    let mut end = max_len;
    while end > 0 && !label.is_char_boundary(end) {
        end -= 1;
    }
    label[..end].to_string()
}

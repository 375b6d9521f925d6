//! Canonical JSON serialization and the string escaping rules of spec §6.
//!
//! This is the equality oracle for replicas (P1): two documents that
//! have integrated the same set of changes must render byte-identical
//! `to_sorted_json` output regardless of delivery order.

use crate::clock::TimeTicket;
use crate::element::CRDTElement;
use crate::root::CRDTRoot;
use crate::value::Primitive;

/// Escapes `\`, `"`, `'`, and the control/line-separator characters
/// named in spec §6. The pair with `unescape` is an exact round-trip
/// identity for every legal input (P5).
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out
}

/// Exact inverse of `escape`.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn quote(s: &str) -> String {
    format!("\"{}\"", escape(s))
}

fn format_double(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}

fn primitive_to_json(p: &Primitive) -> String {
    match p {
        Primitive::Null => "null".to_string(),
        Primitive::Bool(b) => b.to_string(),
        Primitive::Int32(i) => i.to_string(),
        Primitive::Int64(i) => i.to_string(),
        Primitive::Double(d) => format_double(*d),
        Primitive::Str(s) => quote(s),
        Primitive::Bytes(b) => quote(&b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        Primitive::Date(ms) => ms.to_string(),
    }
}

/// Renders the element at `id` (and everything reachable from it) as
/// canonical JSON: objects with keys sorted lexicographically, arrays in
/// list order, live entries only (spec §6).
pub fn to_json(root: &CRDTRoot, id: &TimeTicket) -> String {
    let slot = match root.get(id) {
        Ok(slot) => slot,
        Err(_) => return "null".to_string(),
    };
    match &slot.value {
        CRDTElement::Primitive(p) => primitive_to_json(p),
        CRDTElement::Text(t) => quote(&t.content),
        CRDTElement::Object(obj) => {
            let mut parts: Vec<String> = obj.iter_live()
                .map(|(k, child)| format!("{}:{}", quote(k), to_json(root, child)))
                .collect();
            parts.sort();
            // `iter_live` is already key-sorted (Rht is a BTreeMap); the
            // extra sort above is a no-op safeguard and documents the
            // ordering requirement at the call site.
            format!("{{{}}}", parts.join(","))
        }
        CRDTElement::Array(arr) => {
            let parts: Vec<String> = arr.iter_live().map(|child| to_json(root, child)).collect();
            format!("[{}]", parts.join(","))
        }
    }
}

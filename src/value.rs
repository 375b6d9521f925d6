use smartstring::alias::String as SmartString;

/// Immutable scalar value (spec §3 — Primitive). Once created, a
/// Primitive's value never changes; replacing it means creating a new
/// element and removing the old one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Primitive {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Str(SmartString),
    Bytes(Vec<u8>),
    /// Milliseconds since the Unix epoch.
    Date(i64),
}

impl Primitive {
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Bool(_) => "bool",
            Primitive::Int32(_) => "int32",
            Primitive::Int64(_) => "int64",
            Primitive::Double(_) => "double",
            Primitive::Str(_) => "string",
            Primitive::Bytes(_) => "bytes",
            Primitive::Date(_) => "date",
        }
    }
}

impl From<bool> for Primitive {
    fn from(v: bool) -> Self { Primitive::Bool(v) }
}
impl From<i32> for Primitive {
    fn from(v: i32) -> Self { Primitive::Int32(v) }
}
impl From<i64> for Primitive {
    fn from(v: i64) -> Self { Primitive::Int64(v) }
}
impl From<f64> for Primitive {
    fn from(v: f64) -> Self { Primitive::Double(v) }
}
impl From<&str> for Primitive {
    fn from(v: &str) -> Self { Primitive::Str(SmartString::from(v)) }
}
impl From<String> for Primitive {
    fn from(v: String) -> Self { Primitive::Str(SmartString::from(v.as_str())) }
}

use std::collections::HashMap;

/// Property map as returned by a batched property read or a change signal.
pub type PropMap = HashMap<String, PropValue>;

/// Transport-independent property value.
///
/// Bus backends convert their native variant type into this shape so the
/// session logic never depends on the wire representation.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Boolean value
    Bool(bool),
    /// Signed integer of any width
    Int(i64),
    /// Unsigned integer of any width
    UInt(u64),
    /// Double precision float
    Double(f64),
    /// UTF-8 string
    Str(String),
    /// D-Bus object path
    ObjectPath(String),
    /// Homogeneous array
    List(Vec<PropValue>),
    /// String-keyed dictionary
    Dict(PropMap),
}

impl PropValue {
    /// Boolean content, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content.
    ///
    /// Accepts unsigned values that fit into `i64` and finite doubles, since
    /// players disagree on the integer type used for lengths and positions.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::UInt(n) => i64::try_from(*n).ok(),
            Self::Double(f) if f.is_finite() => Some(f.trunc() as i64),
            _ => None,
        }
    }

    /// Floating point content; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            Self::UInt(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// String content of a string or object path.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::ObjectPath(s) => Some(s),
            _ => None,
        }
    }

    /// List of strings.
    ///
    /// A bare string is accepted as a one-element list. Non-string elements
    /// are skipped.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Str(s) => Some(vec![s.clone()]),
            Self::List(items) => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_owned))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Dictionary content.
    pub fn as_dict(&self) -> Option<&PropMap> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for PropValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<PropMap> for PropValue {
    fn from(map: PropMap) -> Self {
        Self::Dict(map)
    }
}

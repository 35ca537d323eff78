use std::collections::HashMap;

use tracing::debug;
use zbus::zvariant::{OwnedValue, Value};

use crate::bus::{PropMap, PropValue};

/// Convert a `GetAll` reply, dropping entries with unrepresentable types.
pub(super) fn prop_map(values: HashMap<String, OwnedValue>) -> PropMap {
    values
        .into_iter()
        .filter_map(|(key, value)| match prop_value(&value) {
            Some(converted) => Some((key, converted)),
            None => {
                debug!(property = %key, "Skipping property with unsupported type");
                None
            }
        })
        .collect()
}

/// Convert the borrowed map carried by a `PropertiesChanged` signal.
pub(super) fn changed_map(values: &HashMap<&str, Value<'_>>) -> PropMap {
    values
        .iter()
        .filter_map(|(key, value)| match prop_value(value) {
            Some(converted) => Some(((*key).to_owned(), converted)),
            None => {
                debug!(property = %key, "Skipping changed property with unsupported type");
                None
            }
        })
        .collect()
}

/// Convert a single variant. Returns `None` for types MPRIS never uses
/// (file descriptors, structures, signatures).
pub(super) fn prop_value(value: &Value<'_>) -> Option<PropValue> {
    match value {
        Value::Bool(b) => Some(PropValue::Bool(*b)),
        Value::U8(n) => Some(PropValue::UInt(u64::from(*n))),
        Value::U16(n) => Some(PropValue::UInt(u64::from(*n))),
        Value::U32(n) => Some(PropValue::UInt(u64::from(*n))),
        Value::U64(n) => Some(PropValue::UInt(*n)),
        Value::I16(n) => Some(PropValue::Int(i64::from(*n))),
        Value::I32(n) => Some(PropValue::Int(i64::from(*n))),
        Value::I64(n) => Some(PropValue::Int(*n)),
        Value::F64(f) => Some(PropValue::Double(*f)),
        Value::Str(s) => Some(PropValue::Str(s.as_str().to_owned())),
        Value::ObjectPath(path) => Some(PropValue::ObjectPath(path.as_str().to_owned())),
        Value::Value(inner) => prop_value(inner),
        Value::Array(array) => Some(PropValue::List(
            array.iter().filter_map(prop_value).collect(),
        )),
        Value::Dict(dict) => Some(PropValue::Dict(
            dict.iter()
                .filter_map(|(key, value)| {
                    let key = match key {
                        Value::Str(s) => s.as_str().to_owned(),
                        _ => return None,
                    };
                    prop_value(value).map(|value| (key, value))
                })
                .collect(),
        )),
        _ => None,
    }
}

//! Study property values and input validation.

use serde_json::{Map, Value};

use crate::errors::HopaasResult;
use crate::suggestion::Suggestion;
use crate::validation_error;

/// Property map as it travels on the wire.
pub type PropertyMap = Map<String, Value>;

/// A static study property: either a plain JSON value or a search-space
/// suggestion that the server replaces with a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Value(Value),
    Suggestion(Suggestion),
}

impl Property {
    /// Wire value: suggestions become their encoded string.
    pub fn into_wire(self) -> HopaasResult<Value> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Suggestion(suggestion) => {
                suggestion.validate()?;
                Ok(Value::String(suggestion.encode()))
            }
        }
    }

    pub fn is_suggestion(&self) -> bool {
        matches!(self, Self::Suggestion(_))
    }
}

impl From<Suggestion> for Property {
    fn from(suggestion: Suggestion) -> Self {
        Self::Suggestion(suggestion)
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

macro_rules! property_from_plain {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Property {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

property_from_plain!(i32, i64, u32, u64, f64, bool, String, &str);

impl<T: Into<Value>> From<Option<T>> for Property {
    fn from(value: Option<T>) -> Self {
        Self::Value(value.map(Into::into).unwrap_or(Value::Null))
    }
}

/// Validate a caller-supplied property mapping.
///
/// `None` is accepted only when `allow_none` is set. Anything other than a
/// JSON object is rejected. One leading `_` is stripped from every key; two
/// keys that collapse onto the same name are rejected.
pub fn valid_properties(
    properties: Option<Value>,
    allow_none: bool,
) -> HopaasResult<Option<PropertyMap>> {
    let properties = match properties {
        None if allow_none => return Ok(None),
        None => return Err(validation_error!("a property mapping is required")),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(validation_error!(
                "properties must be a mapping, got {}",
                json_kind(&other)
            ))
        }
    };

    let mut valid = PropertyMap::new();
    for (key, value) in properties {
        let stripped = key.strip_prefix('_').unwrap_or(key.as_str()).to_string();
        if stripped.is_empty() {
            return Err(validation_error!("property key {key:?} is empty once stripped"));
        }
        if valid.contains_key(&stripped) {
            return Err(validation_error!(
                "property key {key:?} collides with {stripped:?}"
            ));
        }
        valid.insert(stripped, value);
    }
    Ok(Some(valid))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn none_depends_on_allow_none() {
        assert_eq!(valid_properties(None, true).unwrap(), None);
        assert!(valid_properties(None, false).is_err());
    }

    #[test]
    fn non_mapping_is_rejected() {
        let err = valid_properties(Some(json!([1, 2])), true).unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(valid_properties(Some(json!("x")), false).is_err());
    }

    #[test]
    fn leading_underscore_is_stripped() {
        let props = valid_properties(Some(json!({"_n_jobs": 4, "seed": 1})), false)
            .unwrap()
            .unwrap();
        assert_eq!(props.get("n_jobs"), Some(&json!(4)));
        assert_eq!(props.get("seed"), Some(&json!(1)));
        assert!(!props.contains_key("_n_jobs"));
    }

    #[test]
    fn collisions_after_stripping_are_rejected() {
        let err = valid_properties(Some(json!({"_seed": 1, "seed": 2})), true).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn suggestion_property_goes_on_the_wire_encoded() {
        let wire = Property::from(Suggestion::int(0, 100)).into_wire().unwrap();
        assert_eq!(wire, json!("optuna#int(0,100,1,false)"));
        assert_eq!(Property::from(1).into_wire().unwrap(), json!(1));
        assert_eq!(Property::from(None::<f64>).into_wire().unwrap(), Value::Null);
        assert!(Property::from(Suggestion::int(5, 1)).into_wire().is_err());
    }
}

//! Property type tags for control and meta properties

use serde_json::Value;

/// JSON type of a control property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Int,
    Bool,
    Float,
    String,
    Array,
    Object,
    Null,
}

impl PropertyType {
    /// Classify a JSON value. Integral numbers are `Int`, every other number is `Float`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => PropertyType::Null,
            Value::Bool(_) => PropertyType::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => PropertyType::Int,
            Value::Number(_) => PropertyType::Float,
            Value::String(_) => PropertyType::String,
            Value::Array(_) => PropertyType::Array,
            Value::Object(_) => PropertyType::Object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_type_of() {
        assert_eq!(PropertyType::of(&json!(3)), PropertyType::Int);
        assert_eq!(PropertyType::of(&json!(-3)), PropertyType::Int);
        assert_eq!(PropertyType::of(&json!(3.5)), PropertyType::Float);
        assert_eq!(PropertyType::of(&json!("x")), PropertyType::String);
        assert_eq!(PropertyType::of(&json!(true)), PropertyType::Bool);
        assert_eq!(PropertyType::of(&json!([1])), PropertyType::Array);
        assert_eq!(PropertyType::of(&json!({})), PropertyType::Object);
        assert_eq!(PropertyType::of(&Value::Null), PropertyType::Null);
    }
}

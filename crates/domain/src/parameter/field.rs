use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage type of a block field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Integer,
    Float,
    Boolean,
    Text,
}

/// Conversion between a field's Rust type and a mapping value
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    /// Lossy conversion from a mapping value, `None` when not representable
    fn coerce(value: &Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

/// Integer fields truncate floats toward zero, parse integer strings and
/// reject anything outside the target range.
macro_rules! integer_field {
    ($($ty:ty),+) => {
        $(
            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::Integer;

                fn coerce(value: &Value) -> Option<Self> {
                    match value {
                        Value::Number(n) => {
                            if let Some(i) = n.as_i64() {
                                <$ty>::try_from(i).ok()
                            } else if let Some(u) = n.as_u64() {
                                <$ty>::try_from(u).ok()
                            } else {
                                let f = n.as_f64()?.trunc();
                                if f.is_finite() && f >= <$ty>::MIN as f64 && f <= <$ty>::MAX as f64 {
                                    Some(f as $ty)
                                } else {
                                    None
                                }
                            }
                        }
                        Value::String(s) => s.trim().parse::<$ty>().ok(),
                        Value::Bool(b) => Some(<$ty>::from(*b)),
                        _ => None,
                    }
                }

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }
            }
        )+
    };
}

integer_field!(u8, i16, u16, i32, u32, i64);

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

// used for date and datetime values
use chrono::{NaiveDate, NaiveDateTime};
// used for decimal numbers
use bigdecimal::BigDecimal;

// value types travel inside persisted view definitions
use serde::{Deserialize, Serialize};

// used to print out readable forms of a value
use std::fmt;

// ------------- ValueType -------------
/// The admissible types a [`Value`] can carry. Every variable declares
/// exactly one of these and every value knows its own.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
}
impl ValueType {
    pub const fn name(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
        }
    }
    /// The missing value of this type.
    pub const fn null(&self) -> Value {
        Value::Null(*self)
    }
}
impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ------------- Value -------------
/// An immutable typed scalar or sequence. Missing values are explicit
/// ([`Value::Null`]) and still carry the type they are missing for.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Value {
    Null(ValueType),
    Text(String),
    Integer(i64),
    Decimal(BigDecimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Sequence(ValueType, Vec<Value>),
}
impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null(t) => *t,
            Value::Text(_) => ValueType::Text,
            Value::Integer(_) => ValueType::Integer,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Date(_) => ValueType::Date,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Sequence(t, _) => *t,
        }
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_, _))
    }
    /// A sequence value whose element type is given even when empty.
    pub fn sequence(value_type: ValueType, values: Vec<Value>) -> Value {
        Value::Sequence(value_type, values)
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "null"),
            Value::Text(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Sequence(_, vs) => {
                let mut s = String::new();
                for v in vs {
                    s += &(v.to_string() + ",");
                }
                s.pop();
                write!(f, "[{}]", s)
            }
        }
    }
}

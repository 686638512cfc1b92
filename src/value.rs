//! Dynamically-typed values passed to and returned from user functions.
//!
//! [`FromValue`] decides whether an argument is convertible to a parameter
//! type, [`IntoValue`]/[`IntoValues`] turn return values back into a list.

use std::{any::Any, fmt, ops::Deref, sync::Arc};

use crate::{error::InvocationError, invoke::Func};

/// A dynamically-typed argument or return value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Func(Func),
    /// Any other Rust value, extracted again through [`Opaque`].
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wraps an arbitrary Rust value (a channel sender, a shared counter, ...).
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Arc::new(value))
    }

    /// Short label of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Func(_) => "func",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Converts a copy of this value, as an argument of type `T` would be.
    pub fn get<T: FromValue>(&self) -> Option<T> {
        T::from_value(self.clone())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.get()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::UInt(v) => write!(f, "UInt({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Func(func) => write!(f, "Func({})", func.signature()),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Int(a), Value::UInt(b)) | (Value::UInt(b), Value::Int(a)) => {
                u64::try_from(*a).is_ok_and(|a| a == *b)
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Wrapper to pass any `Clone` Rust value through a [`Value`].
///
/// ```rust
/// use easy_worker::{Opaque, Value};
///
/// let v = Value::opaque(vec![1u8, 2, 3]);
/// let Opaque(bytes) = v.get::<Opaque<Vec<u8>>>().unwrap();
/// assert_eq!(bytes, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Opaque<T>(pub T);

/// Trailing parameter of a variadic function: collects every remaining argument.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variadic<T>(pub Vec<T>);

impl<T> Variadic<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Variadic<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

/// Conversion from an argument value to a parameter type.
pub trait FromValue: Sized {
    /// Name of the parameter type in `TypeMismatch` errors.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// `None` when the value is not convertible.
    fn from_value(value: Value) -> Option<Self>;
}

/// Conversion of a single return value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion of a whole return (unit, single value, tuple, `Result`).
pub trait IntoValues {
    fn into_values(self) -> Result<Vec<Value>, InvocationError>;
}

macro_rules! int_conversions {
    ($($t:ty => $variant:ident as $repr:ty),* $(,)?) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => <$t>::try_from(v).ok(),
                        Value::UInt(v) => <$t>::try_from(v).ok(),
                        _ => None,
                    }
                }
            }

            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::$variant(self as $repr)
                }
            }
        )*
    };
}

int_conversions!(
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    isize => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    usize => UInt as u64,
);

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Option<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for String {
    fn type_name() -> &'static str {
        "String"
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_owned())
    }
}

impl FromValue for Value {
    fn type_name() -> &'static str {
        "Value"
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for Func {
    fn into_value(self) -> Value {
        Value::Func(self)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Nil => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Nil, IntoValue::into_value)
    }
}

impl<T: Any + Clone + Send + Sync> FromValue for Opaque<T> {
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Opaque(any) => (*any).downcast_ref::<T>().cloned().map(Opaque),
            _ => None,
        }
    }
}

impl<T: Any + Send + Sync> IntoValue for Opaque<T> {
    fn into_value(self) -> Value {
        Value::opaque(self.0)
    }
}

impl IntoValues for () {
    fn into_values(self) -> Result<Vec<Value>, InvocationError> {
        Ok(Vec::new())
    }
}

macro_rules! single_into_values {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoValues for $t {
                fn into_values(self) -> Result<Vec<Value>, InvocationError> {
                    Ok(vec![self.into_value()])
                }
            }
        )*
    };
}

single_into_values!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String, &str, Value, Func,
);

impl<T: IntoValue> IntoValues for Vec<T> {
    fn into_values(self) -> Result<Vec<Value>, InvocationError> {
        Ok(vec![self.into_value()])
    }
}

impl<T: IntoValue> IntoValues for Option<T> {
    fn into_values(self) -> Result<Vec<Value>, InvocationError> {
        Ok(vec![self.into_value()])
    }
}

impl<T: Any + Send + Sync> IntoValues for Opaque<T> {
    fn into_values(self) -> Result<Vec<Value>, InvocationError> {
        Ok(vec![self.into_value()])
    }
}

macro_rules! tuple_into_values {
    ($($name:ident),+) => {
        impl<$($name: IntoValue),+> IntoValues for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_values(self) -> Result<Vec<Value>, InvocationError> {
                let ($($name,)+) = self;
                Ok(vec![$($name.into_value()),+])
            }
        }
    };
}

tuple_into_values!(A, B);
tuple_into_values!(A, B, C);
tuple_into_values!(A, B, C, D);

impl<T: IntoValues, E: fmt::Display> IntoValues for Result<T, E> {
    fn into_values(self) -> Result<Vec<Value>, InvocationError> {
        match self {
            Ok(values) => values.into_values(),
            Err(err) => Err(InvocationError::Returned(err.to_string())),
        }
    }
}

/// Builds an argument list, converting each expression with [`IntoValue`].
///
/// ```rust
/// use easy_worker::{args, Value};
///
/// assert_eq!(args![1, "a"], vec![Value::Int(1), Value::Str("a".into())]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::IntoValue::into_value($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_convert_when_they_fit() {
        assert_eq!(u8::from_value(Value::Int(200)), Some(200));
        assert_eq!(u8::from_value(Value::Int(300)), None);
        assert_eq!(u32::from_value(Value::Int(-1)), None);
        assert_eq!(i64::from_value(Value::UInt(7)), Some(7));
        assert_eq!(i64::from_value(Value::Str("7".into())), None);
    }

    #[test]
    fn floats_accept_integers() {
        assert_eq!(f64::from_value(Value::Int(2)), Some(2.0));
        assert_eq!(f64::from_value(Value::Float(0.5)), Some(0.5));
        assert_eq!(f64::from_value(Value::Bool(true)), None);
    }

    #[test]
    fn lists_convert_element_wise() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(Vec::<i32>::from_value(list), Some(vec![1, 2]));

        let mixed = Value::List(vec![Value::Int(1), Value::Str("x".into())]);
        assert_eq!(Vec::<i32>::from_value(mixed), None);
    }

    #[test]
    fn nil_is_none() {
        assert_eq!(Option::<i64>::from_value(Value::Nil), Some(None));
        assert_eq!(Option::<i64>::from_value(Value::Int(4)), Some(Some(4)));
        assert_eq!(i64::from_value(Value::Nil), None);
    }

    #[test]
    fn opaque_round_trips_only_its_own_type() {
        let value = Value::opaque(String::from("inner"));
        assert_eq!(
            value.get::<Opaque<String>>(),
            Some(Opaque(String::from("inner")))
        );
        assert_eq!(value.get::<Opaque<u32>>(), None);
        assert_eq!(value.kind(), "opaque");
    }

    #[test]
    fn returns_flatten_into_lists() {
        assert_eq!(().into_values(), Ok(vec![]));
        assert_eq!(5i64.into_values(), Ok(vec![Value::Int(5)]));
        assert_eq!(
            (1i32, "x").into_values(),
            Ok(vec![Value::Int(1), Value::Str("x".into())])
        );

        let failed: Result<i64, String> = Err("bad input".into());
        assert_eq!(
            failed.into_values(),
            Err(InvocationError::Returned("bad input".into()))
        );
    }

    #[test]
    fn signed_and_unsigned_compare_by_value() {
        assert_eq!(Value::Int(3), Value::UInt(3));
        assert_ne!(Value::Int(-3), Value::UInt(3));
    }
}

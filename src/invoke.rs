//! Fault-isolated invocation of type-erased functions.
//!
//! A [`Func`] is built once from a typed closure and remembers the declared
//! parameter types. [`invoke`] checks arity, converts every argument and only
//! then calls the function, catching any panic on the way out. It is the one
//! place where user code runs; pools, children and monitor units all go
//! through it.

use std::{
    any::Any,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use crate::{
    error::{ConfigError, InvocationError},
    value::{FromValue, IntoValues, Value, Variadic},
};

type ErasedCall = dyn Fn(Vec<Value>) -> Result<Vec<Value>, InvocationError> + Send + Sync;

/// Declared parameter types of a [`Func`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<&'static str>,
    variadic: Option<&'static str>,
}

impl Signature {
    /// Number of fixed (non-variadic) parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    pub fn params(&self) -> &[&'static str] {
        &self.params
    }

    fn check_arity(&self, actual: usize) -> Result<(), InvocationError> {
        let expected = self.arity();
        let accepted = if self.is_variadic() {
            actual >= expected
        } else {
            actual == expected
        };
        if accepted {
            Ok(())
        } else {
            Err(InvocationError::ArityMismatch {
                expected,
                actual,
                variadic: self.is_variadic(),
            })
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        if let Some(elem) = self.variadic {
            if !self.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...{elem}")?;
        }
        write!(f, ")")
    }
}

/// A cheaply cloneable, type-erased function.
///
/// ```rust
/// use easy_worker::{args, invoke, Func, Value, Variadic};
///
/// let add = Func::new(|a: i64, b: i64| a + b);
/// assert_eq!(invoke(&add.clone().into(), args![1, 2]), Ok(vec![Value::Int(3)]));
///
/// let sum = Func::new(|xs: Variadic<i64>| xs.iter().sum::<i64>());
/// assert_eq!(invoke(&sum.into(), args![1, 2, 3]), Ok(vec![Value::Int(6)]));
/// ```
#[derive(Clone)]
pub struct Func {
    signature: Arc<Signature>,
    call: Arc<ErasedCall>,
}

impl Func {
    /// Erases a typed function. See [`IntoFunc`] for what is accepted.
    pub fn new<M>(f: impl IntoFunc<M>) -> Self {
        f.into_func()
    }

    fn from_erased<C>(signature: Signature, call: C) -> Self
    where
        C: Fn(Vec<Value>) -> Result<Vec<Value>, InvocationError> + Send + Sync + 'static,
    {
        Self {
            signature: Arc::new(signature),
            call: Arc::new(call),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn ptr_eq(&self, other: &Func) -> bool {
        Arc::ptr_eq(&self.signature, &other.signature)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

impl From<Func> for Value {
    fn from(func: Func) -> Self {
        Value::Func(func)
    }
}

/// Typed functions that can be erased into a [`Func`].
///
/// Implemented for every `Fn` of up to six parameters whose parameter types
/// implement [`FromValue`] and whose return type implements [`IntoValues`].
/// A trailing [`Variadic<T>`] parameter makes the function variadic.
/// `Marker` only disambiguates the implementations.
pub trait IntoFunc<Marker>: Send + Sync + Sized + 'static {
    fn into_func(self) -> Func;
}

fn convert<T: FromValue>(position: usize, value: Value) -> Result<T, InvocationError> {
    let actual = value.kind();
    T::from_value(value).ok_or(InvocationError::TypeMismatch {
        position,
        expected: T::type_name(),
        actual,
    })
}

fn next_arg<T: FromValue>(
    args: &mut impl Iterator<Item = (usize, Value)>,
    arity: usize,
) -> Result<T, InvocationError> {
    match args.next() {
        Some((position, value)) => convert(position, value),
        None => Err(InvocationError::ArityMismatch {
            expected: arity,
            actual: 0,
            variadic: false,
        }),
    }
}

macro_rules! impl_into_func {
    ($($arg:ident $val:ident),*) => {
        impl<F, R, $($arg,)*> IntoFunc<fn($($arg,)*) -> R> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoValues,
            $($arg: FromValue,)*
        {
            #[allow(unused_mut, unused_variables)]
            fn into_func(self) -> Func {
                let signature = Signature {
                    params: vec![$($arg::type_name()),*],
                    variadic: None,
                };
                let arity = signature.arity();
                Func::from_erased(signature, move |args: Vec<Value>| {
                    let mut args = args.into_iter().enumerate();
                    $(let $val = next_arg::<$arg>(&mut args, arity)?;)*
                    (self)($($val),*).into_values()
                })
            }
        }

        impl<F, R, V, $($arg,)*> IntoFunc<(Variadic<V>, fn($($arg,)*) -> R)> for F
        where
            F: Fn($($arg,)* Variadic<V>) -> R + Send + Sync + 'static,
            R: IntoValues,
            V: FromValue,
            $($arg: FromValue,)*
        {
            #[allow(unused_mut, unused_variables)]
            fn into_func(self) -> Func {
                let signature = Signature {
                    params: vec![$($arg::type_name()),*],
                    variadic: Some(V::type_name()),
                };
                let arity = signature.arity();
                Func::from_erased(signature, move |args: Vec<Value>| {
                    let mut args = args.into_iter().enumerate();
                    $(let $val = next_arg::<$arg>(&mut args, arity)?;)*
                    let rest = args
                        .map(|(position, value)| convert::<V>(position, value))
                        .collect::<Result<Vec<V>, _>>()?;
                    (self)($($val,)* Variadic(rest)).into_values()
                })
            }
        }
    };
}

impl_into_func!();
impl_into_func!(A1 a1);
impl_into_func!(A1 a1, A2 a2);
impl_into_func!(A1 a1, A2 a2, A3 a3);
impl_into_func!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_into_func!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_into_func!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);

/// Fails with [`ConfigError::NotCallable`] unless `target` is a function.
pub fn ensure_callable(target: &Value) -> Result<&Func, ConfigError> {
    match target {
        Value::Func(func) => Ok(func),
        other => Err(ConfigError::NotCallable(other.kind())),
    }
}

/// Calls `target` with `args` on the current thread.
///
/// Arity and argument types are checked before anything runs. A panic raised
/// by the function is caught here and returned as [`InvocationError::Panic`].
pub fn invoke(target: &Value, args: Vec<Value>) -> Result<Vec<Value>, InvocationError> {
    let Value::Func(func) = target else {
        return Err(InvocationError::NotCallable(target.kind()));
    };
    func.signature.check_arity(args.len())?;

    match catch_unwind(AssertUnwindSafe(|| (func.call)(args))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(&*payload);
            tracing::warn!(signature = %func.signature, %message, "user function panicked");
            Err(InvocationError::Panic(message))
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

mod common;

use common::{add, add_with_panic};
use easy_worker::{args, invoke, Func, InvocationError, Opaque, Value, Variadic};

#[test]
fn test_plain_function() {
    let target = Value::from(Func::new(add));
    assert_eq!(invoke(&target, args![20, 22]), Ok(vec![Value::Int(42)]));
}

#[test]
fn test_panic_is_contained() {
    let target = Value::from(Func::new(add_with_panic));
    let err = invoke(&target, args![6, 1]).unwrap_err();
    assert!(matches!(err, InvocationError::Panic(ref msg) if msg.contains("a = 6")));
    assert_eq!(err.as_label(), "invoke_panic");
    assert!(err.is_fault());

    // Still callable afterwards.
    assert_eq!(invoke(&target, args![1, 1]), Ok(vec![Value::Int(2)]));
}

#[test]
fn test_variadic_sum() {
    let sum = Func::new(|scale: i64, xs: Variadic<i64>| scale * xs.iter().sum::<i64>());
    assert!(sum.signature().is_variadic());
    assert_eq!(sum.signature().arity(), 1);

    let target = Value::from(sum);
    assert_eq!(invoke(&target, args![2, 1, 2, 3]), Ok(vec![Value::Int(12)]));
    assert_eq!(invoke(&target, args![2]), Ok(vec![Value::Int(0)]));
}

#[test]
fn test_multiple_returns_and_shared_state() {
    let (tx, rx) = std::sync::mpsc::channel::<String>();
    let target = Value::from(Func::new(
        |Opaque(tx): Opaque<std::sync::mpsc::Sender<String>>, name: String| {
            let _ = tx.send(name.clone());
            (name.len(), name)
        },
    ));

    let out = invoke(&target, vec![Value::opaque(tx), Value::Str("worker".into())]);
    assert_eq!(
        out,
        Ok(vec![Value::UInt(6), Value::Str("worker".into())])
    );
    assert_eq!(rx.recv().unwrap(), "worker");
}

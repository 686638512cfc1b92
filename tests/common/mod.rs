use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use easy_worker::Func;
use tokio::time::Instant;

#[allow(unused)]
pub fn add(a: i64, b: i64) -> i64 {
    a + b
}

// Panics whenever the first operand is a multiple of 3
#[allow(unused)]
pub fn add_with_panic(a: i64, b: i64) -> i64 {
    if a % 3 == 0 {
        panic!("panic from user func, a = {a}");
    }
    a + b
}

/// Counts its calls and sleeps a little, so restart loops stay observable.
#[allow(unused)]
pub fn counting(calls: Arc<AtomicUsize>) -> Func {
    Func::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(2));
    })
}

/// Fails with `Err` on its first `failures` calls, then returns the call number.
#[allow(unused)]
pub fn flaky(failures: usize, calls: Arc<AtomicUsize>) -> Func {
    Func::new(move || -> Result<i64, String> {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= failures {
            Err(format!("failure #{call}"))
        } else {
            Ok(call as i64)
        }
    })
}

/// Polls `condition` until it holds or five seconds pass.
#[allow(unused)]
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}

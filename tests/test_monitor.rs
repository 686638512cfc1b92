mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{add, add_with_panic, wait_until};
use easy_worker::{args, Func, MonitorUnit, RuntimeError, SignalKind, UnitState, Value};
use tokio::time::timeout;

#[tokio::test]
async fn test_every_subscriber_gets_its_own_signal() -> anyhow::Result<()> {
    let unit = MonitorUnit::new(Func::new(add), args![40, 2])?;
    let (a, mut rx_a) = unit.monitor();
    let (b, mut rx_b) = unit.monitor();
    assert_ne!(a, b);

    unit.run()?;
    let signal_a = timeout(Duration::from_secs(5), rx_a.recv()).await?.unwrap();
    let signal_b = timeout(Duration::from_secs(5), rx_b.recv()).await?.unwrap();
    assert_eq!(signal_a.subscription, a);
    assert_eq!(signal_b.subscription, b);
    assert_eq!(signal_a.kind, SignalKind::Done);
    assert_eq!(signal_b.kind, SignalKind::Done);
    assert_eq!(unit.result(), vec![Value::Int(42)]);
    Ok(())
}

#[tokio::test]
async fn test_demonitor_stops_delivery() -> anyhow::Result<()> {
    let unit = MonitorUnit::new(Func::new(add), args![1, 1])?;
    let (a, mut rx_a) = unit.monitor();
    let (b, mut rx_b) = unit.monitor();
    unit.demonitor(a);
    assert_eq!(unit.subscribers(), 1);

    unit.run()?;
    let signal_b = timeout(Duration::from_secs(5), rx_b.recv()).await?.unwrap();
    assert_eq!(signal_b.subscription, b);
    // The closed queue yields nothing.
    assert!(rx_a.recv().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_failure_is_signalled() -> anyhow::Result<()> {
    let unit = MonitorUnit::new(Func::new(add_with_panic), args![3, 1])?;
    let (_, mut rx) = unit.monitor();
    unit.run()?;

    let signal = timeout(Duration::from_secs(5), rx.recv()).await?.unwrap();
    assert_eq!(signal.kind, SignalKind::Failed);
    assert!(unit.result().is_empty());
    assert_eq!(unit.run_and_wait().await, Ok(false));
    Ok(())
}

#[tokio::test]
async fn test_run_and_wait_repeats() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let unit = MonitorUnit::new(
        Func::new(move || counter.fetch_add(1, Ordering::SeqCst) + 1),
        args![],
    )?;

    assert!(unit.run_and_wait().await?);
    assert!(unit.run_and_wait().await?);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(unit.result(), vec![Value::UInt(2)]);
    // Temporary subscriptions are cleaned up.
    assert_eq!(unit.subscribers(), 0);
    assert_eq!(unit.state(), UnitState::Standby);
    Ok(())
}

#[tokio::test]
async fn test_stop_forbids_running_again() -> anyhow::Result<()> {
    let unit = MonitorUnit::new(Func::new(add), args![2, 3])?;
    assert!(unit.run_and_wait().await?);
    assert_eq!(unit.result(), vec![Value::Int(5)]);

    let (_, mut rx) = unit.monitor();
    unit.stop();
    assert_eq!(unit.state(), UnitState::Stopped);
    assert!(rx.recv().await.is_none());

    assert_eq!(unit.run_and_wait().await, Err(RuntimeError::AlreadyStopped));
    assert!(unit.result().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_state_while_running() -> anyhow::Result<()> {
    let unit = MonitorUnit::new(
        Func::new(|| std::thread::sleep(Duration::from_millis(50))),
        args![],
    )?;
    assert_eq!(unit.state(), UnitState::Standby);

    unit.run()?;
    assert_eq!(unit.state(), UnitState::Running);
    assert!(wait_until(|| unit.state() == UnitState::Standby).await);
    Ok(())
}

#[tokio::test]
async fn test_new_and_run() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let unit = MonitorUnit::new_and_run(
        Func::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
        args![],
    )?;

    assert!(wait_until(|| calls.load(Ordering::SeqCst) == 1).await);
    assert!(wait_until(|| unit.state() == UnitState::Standby).await);
    Ok(())
}

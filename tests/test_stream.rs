mod common;

use std::time::Duration;

use common::{add, add_with_panic};
use easy_worker::{args, CallResult, Config, Func, InvocationError, RuntimeError, TaskStream, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn stream_of(target: Func, workers: usize) -> (TaskStream, mpsc::Sender<Vec<Value>>, mpsc::Receiver<CallResult>) {
    let config = Config::new(target, workers, 0, Duration::ZERO).unwrap();
    let (input_tx, input_rx) = mpsc::channel(16);
    let (output_tx, output_rx) = mpsc::channel(16);
    (TaskStream::new(config, input_rx, output_tx), input_tx, output_rx)
}

#[tokio::test]
async fn test_stop_before_run() {
    let (stream, _input, _output) = stream_of(Func::new(add), 1);
    assert!(!stream.is_running());
    assert_eq!(stream.stop(), Err(RuntimeError::NotRunning));
}

#[tokio::test]
async fn test_outputs_are_forwarded() -> anyhow::Result<()> {
    let (mut stream, input, mut output) = stream_of(Func::new(add), 3);
    stream.run()?;
    assert!(stream.is_running());

    for i in 1..=5 {
        input.send(args![i, 10]).await?;
    }

    let mut sums = Vec::new();
    for _ in 0..5 {
        let result = timeout(Duration::from_secs(5), output.recv())
            .await?
            .expect("output closed early");
        sums.push(result?[0].as_i64().unwrap());
    }
    sums.sort_unstable();
    assert_eq!(sums, vec![11, 12, 13, 14, 15]);

    stream.stop()?;
    assert!(!stream.is_running());
    Ok(())
}

#[tokio::test]
async fn test_failures_are_forwarded_as_errors() -> anyhow::Result<()> {
    let (mut stream, input, mut output) = stream_of(Func::new(add_with_panic), 1);
    stream.run()?;

    input.send(args![3, 3]).await?;
    let result = timeout(Duration::from_secs(5), output.recv()).await?;
    assert!(matches!(result, Some(Err(InvocationError::Panic(_)))));

    // The worker survives the panic.
    input.send(args![1, 1]).await?;
    let result = timeout(Duration::from_secs(5), output.recv()).await?;
    assert_eq!(result, Some(Ok(vec![Value::Int(2)])));

    stream.stop()?;
    Ok(())
}

#[tokio::test]
async fn test_stop_delivers_call_in_flight() -> anyhow::Result<()> {
    let slow = Func::new(|n: i64| {
        std::thread::sleep(Duration::from_millis(200));
        n
    });
    let (mut stream, input, mut output) = stream_of(slow, 1);
    stream.run()?;

    input.send(args![7]).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.stop()?;
    assert!(!stream.is_running());

    let result = timeout(Duration::from_secs(2), output.recv()).await?;
    assert_eq!(result, Some(Ok(vec![Value::Int(7)])));

    // The input forwarder is gone, so no new argument set is accepted.
    assert!(input.send(args![8]).await.is_err());
    drop(stream);
    let closed = timeout(Duration::from_secs(2), output.recv()).await?;
    assert!(closed.is_none());
    Ok(())
}

#[tokio::test]
async fn test_run_twice() -> anyhow::Result<()> {
    let (mut stream, _input, _output) = stream_of(Func::new(add), 1);
    stream.run()?;
    assert_eq!(stream.run(), Err(RuntimeError::AlreadyRunning));
    stream.stop()?;
    Ok(())
}

#[tokio::test]
async fn test_output_closes_after_stop() -> anyhow::Result<()> {
    let (mut stream, _input, mut output) = stream_of(Func::new(add), 2);
    stream.run()?;
    stream.stop()?;
    drop(stream);

    // Both forwarders exit and the last sender clone goes away.
    let closed = timeout(Duration::from_secs(5), output.recv()).await?;
    assert!(closed.is_none());
    Ok(())
}

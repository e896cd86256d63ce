//! Multi-threaded channel tests: blocking sends, timeouts, FIFO under
//! contention.
//!
//! Each thread plays one context. Contexts share nothing but the registry.

use isochan_data::Value;
use isochan_runtime::{ChannelError, ChannelRegistry, Received, SendOptions};
use isochan_types::{ChannelEnd, ChannelId, ContextId, ErrorCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls until something is received. Gives up after `limit`.
fn recv_blocking(
    reg: &ChannelRegistry,
    ctx: ContextId,
    id: ChannelId,
    limit: Duration,
) -> Received<Value> {
    let start = Instant::now();
    loop {
        match reg.recv(ctx, id) {
            Ok(got) => return got,
            Err(ChannelError::Empty(_)) if start.elapsed() < limit => thread::yield_now(),
            Err(e) => panic!("recv failed: {e}"),
        }
    }
}

fn wait_for_count(reg: &ChannelRegistry, id: ChannelId, count: usize) {
    let start = Instant::now();
    while reg.get_count(id) != Ok(count) {
        assert!(start.elapsed() < Duration::from_secs(5), "queue never reached {count}");
        thread::yield_now();
    }
}

// =============================================================================
// Blocking sends
// =============================================================================

#[test]
fn blocking_send_returns_after_delayed_receive() {
    init_tracing();
    let reg = Arc::new(ChannelRegistry::new());
    let id = reg.create_default().expect("create");
    let received = Arc::new(AtomicBool::new(false));

    let receiver = {
        let reg = Arc::clone(&reg);
        let received = Arc::clone(&received);
        thread::spawn(move || {
            wait_for_count(&reg, id, 1);
            thread::sleep(Duration::from_millis(50));
            let got = recv_blocking(&reg, ContextId::new(1), id, Duration::from_secs(5));
            received.store(true, Ordering::SeqCst);
            got
        })
    };

    let start = Instant::now();
    reg.send(ContextId::new(0), id, &Value::from("late"), SendOptions::new())
        .expect("blocking send");
    assert!(start.elapsed() >= Duration::from_millis(50));

    let got = receiver.join().expect("receiver thread");
    assert_eq!(got, Received::Value(Value::from("late")));
    assert!(received.load(Ordering::SeqCst));
    assert_eq!(reg.boundary().total_live_tokens(), 0);
}

#[test]
fn blocking_send_times_out_and_withdraws_item() {
    init_tracing();
    let reg = ChannelRegistry::new();
    let id = reg.create_default().expect("create");
    let timeout = Duration::from_millis(20);

    let start = Instant::now();
    let err = reg
        .send(
            ContextId::new(0),
            id,
            &Value::Int(1),
            SendOptions::new().timeout(timeout),
        )
        .unwrap_err();

    assert!(start.elapsed() >= timeout);
    assert_eq!(err, ChannelError::Timeout { channel: id, timeout });
    assert!(err.is_recoverable());
    assert_eq!(reg.get_count(id), Ok(0));
    assert_eq!(reg.recv(ContextId::new(1), id), Err(ChannelError::Empty(id)));
    assert_eq!(reg.boundary().total_live_tokens(), 0);
}

#[test]
fn blocking_send_woken_by_forced_close() {
    init_tracing();
    let reg = Arc::new(ChannelRegistry::new());
    let id = reg.create_default().expect("create");

    let sender = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || reg.send(ContextId::new(0), id, &Value::Int(1), SendOptions::new()))
    };

    wait_for_count(&reg, id, 1);
    reg.close(id, ChannelEnd::Both, true)
        .expect("forced close");

    let result = sender.join().expect("sender thread");
    let err = result.unwrap_err();
    assert_eq!(err, ChannelError::ClosedWhileWaiting(id));
    assert_eq!(err.code(), "CHANNEL_CLOSED_WHILE_WAITING");
    assert!(err.is_closed());
}

#[test]
fn blocking_send_woken_by_destroy() {
    let reg = Arc::new(ChannelRegistry::new());
    let id = reg.create_default().expect("create");

    let sender = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || reg.send(ContextId::new(0), id, &Value::Int(1), SendOptions::new()))
    };

    wait_for_count(&reg, id, 1);
    reg.destroy(id).expect("destroy");

    assert_eq!(
        sender.join().expect("sender thread"),
        Err(ChannelError::ClosedWhileWaiting(id))
    );
    assert_eq!(reg.boundary().total_live_tokens(), 0);
}

#[test]
fn blocking_send_woken_when_last_release_closes_channel() {
    init_tracing();
    let reg = Arc::new(ChannelRegistry::new());
    let id = reg.create_default().expect("create");
    let (tx, rx) = (ContextId::new(0), ContextId::new(1));
    assert_eq!(reg.recv(rx, id), Err(ChannelError::Empty(id)));
    let timeout = Duration::from_secs(5);

    let sender = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || {
            let start = Instant::now();
            let result = reg.send(tx, id, &Value::Int(1), SendOptions::new().timeout(timeout));
            (result, start.elapsed())
        })
    };

    wait_for_count(&reg, id, 1);
    reg.release(rx, id, ChannelEnd::Recv, false).expect("release recv");
    reg.release(tx, id, ChannelEnd::Send, false).expect("release send");

    let (result, elapsed) = sender.join().expect("sender thread");
    assert_eq!(result, Err(ChannelError::ClosedWhileWaiting(id)));
    assert!(elapsed < timeout, "sender waited out its timeout");

    // Releasing never drops items: the token lives until the channel goes.
    let info = reg.get_info(tx, id).expect("info");
    assert!(info.is_closed());
    assert_eq!(info.count, 1);
    assert_eq!(reg.boundary().live_tokens(tx), 1);
    reg.destroy(id).expect("destroy");
    assert_eq!(reg.boundary().total_live_tokens(), 0);
}

#[test]
fn blocking_send_without_timeout_woken_when_teardown_closes_channel() {
    init_tracing();
    let reg = Arc::new(ChannelRegistry::new());
    let id = reg.create_default().expect("create");
    let tx = ContextId::new(0);

    let sender = {
        let reg = Arc::clone(&reg);
        thread::spawn(move || reg.send(tx, id, &Value::Int(1), SendOptions::new()))
    };

    wait_for_count(&reg, id, 1);
    // The sender holds the only association, so its teardown closes the
    // channel with the placeholder still queued.
    reg.clear_context(tx);

    assert_eq!(
        sender.join().expect("sender thread"),
        Err(ChannelError::ClosedWhileWaiting(id))
    );
    assert!(reg.get_info(tx, id).expect("info").is_closed());
    assert_eq!(reg.boundary().total_live_tokens(), 0);
}

// =============================================================================
// Contention
// =============================================================================

/// N senders, M receivers. Every item is received exactly once and each
/// sender's items arrive in the order they were sent.
#[test]
fn per_sender_fifo_under_contention() {
    init_tracing();
    const SENDERS: i64 = 4;
    const RECEIVERS: i64 = 3;
    const PER_SENDER: i64 = 200;

    let reg = Arc::new(ChannelRegistry::new());
    let id = reg.create_default().expect("create");
    let start = Arc::new(Barrier::new((SENDERS + RECEIVERS) as usize));
    let total = (SENDERS * PER_SENDER) as usize;
    let taken = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let senders: Vec<_> = (0..SENDERS)
        .map(|s| {
            let reg = Arc::clone(&reg);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for n in 0..PER_SENDER {
                    let value = Value::Tuple(vec![Value::Int(s), Value::Int(n)]);
                    reg.send(ContextId::new(s), id, &value, SendOptions::nowait())
                        .expect("send");
                }
            })
        })
        .collect();

    let receivers: Vec<_> = (0..RECEIVERS)
        .map(|r| {
            let reg = Arc::clone(&reg);
            let start = Arc::clone(&start);
            let taken = Arc::clone(&taken);
            thread::spawn(move || {
                let ctx = ContextId::new(100 + r);
                let mut got = Vec::new();
                start.wait();
                while taken.load(Ordering::SeqCst) < total {
                    match reg.recv(ctx, id) {
                        Ok(Received::Value(Value::Tuple(pair))) => {
                            taken.fetch_add(1, Ordering::SeqCst);
                            got.push(pair);
                        }
                        Ok(other) => panic!("unexpected item {other:?}"),
                        Err(ChannelError::Empty(_)) => thread::yield_now(),
                        Err(e) => panic!("recv failed: {e}"),
                    }
                }
                got
            })
        })
        .collect();

    for s in senders {
        s.join().expect("sender thread");
    }

    let mut last: HashMap<i64, i64> = HashMap::new();
    let mut count = 0;
    for r in receivers {
        // Items seen by one receiver keep each sender's order.
        let mut seen: HashMap<i64, i64> = HashMap::new();
        for pair in r.join().expect("receiver thread") {
            let (Value::Int(s), Value::Int(n)) = (&pair[0], &pair[1]) else {
                panic!("malformed item {pair:?}");
            };
            if let Some(prev) = seen.insert(*s, *n) {
                assert!(*n > prev, "sender {s}: {n} received after {prev}");
            }
            let max = last.entry(*s).or_insert(-1);
            *max = (*max).max(*n);
            count += 1;
        }
    }

    assert_eq!(count, total);
    for s in 0..SENDERS {
        assert_eq!(last.get(&s), Some(&(PER_SENDER - 1)));
    }
    assert_eq!(reg.get_count(id), Ok(0));
    assert_eq!(reg.boundary().total_live_tokens(), 0);
}

/// Blocking senders paired with receivers across many threads; all sends
/// complete and nothing is left queued.
#[test]
fn blocking_stress() {
    const PAIRS: i64 = 8;
    const ROUNDS: i64 = 25;

    let reg = Arc::new(ChannelRegistry::new());
    let id = reg.create_default().expect("create");

    let mut threads = Vec::new();
    for p in 0..PAIRS {
        let tx = Arc::clone(&reg);
        threads.push(thread::spawn(move || {
            for n in 0..ROUNDS {
                tx.send(ContextId::new(p), id, &Value::Int(n), SendOptions::new())
                    .expect("blocking send");
            }
        }));
        let rx = Arc::clone(&reg);
        threads.push(thread::spawn(move || {
            for _ in 0..ROUNDS {
                let got = recv_blocking(&rx, ContextId::new(1000 + p), id, Duration::from_secs(10));
                assert!(matches!(got, Received::Value(Value::Int(_))));
            }
        }));
    }

    for t in threads {
        t.join().expect("thread");
    }
    assert_eq!(reg.get_count(id), Ok(0));
    assert_eq!(reg.boundary().total_live_tokens(), 0);
}

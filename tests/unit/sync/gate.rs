use super::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn disabled_gate_never_blocks() {
    let gate = Arc::new(OrderingGate::new(false));
    let a = gate.acquire();
    let b = gate.acquire();
    assert_eq!(a.ticket(), None);
    assert_eq!(b.ticket(), None);
    assert_eq!(gate.tickets_issued(), 0);
}

#[test]
fn enabled_gate_issues_sequential_tickets() {
    let gate = Arc::new(OrderingGate::from_flags(&FeatureFlags {
        gralloc_sync: true,
        ..Default::default()
    }));
    assert!(gate.is_enabled());
    let a = gate.acquire();
    assert_eq!(a.ticket(), Some(0));
    a.release();
    let b = gate.acquire();
    assert_eq!(b.ticket(), Some(1));
    drop(b);
    assert_eq!(gate.tickets_issued(), 2);
}

#[test]
fn second_holder_waits_for_release() {
    let gate = Arc::new(OrderingGate::new(true));
    let first = gate.acquire();
    let entered = Arc::new(AtomicBool::new(false));

    let waiter = {
        let gate = Arc::clone(&gate);
        let entered = Arc::clone(&entered);
        thread::spawn(move || {
            let hold = gate.acquire();
            entered.store(true, Ordering::SeqCst);
            hold.ticket()
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!entered.load(Ordering::SeqCst));
    drop(first);
    assert_eq!(waiter.join().unwrap(), Some(1));
    assert!(entered.load(Ordering::SeqCst));
}

#[test]
fn hold_can_be_released_on_another_thread() {
    let gate = Arc::new(OrderingGate::new(true));
    let hold = gate.acquire();
    thread::spawn(move || drop(hold)).join().unwrap();
    let next = gate.acquire();
    assert_eq!(next.ticket(), Some(1));
}

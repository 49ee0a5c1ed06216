use std::thread;
use std::time::Duration;

use crate::buffer::{BoundedBuffer, Interrupt};
use crate::error::{PutError, TakeError};

const SETTLE: Duration = Duration::from_millis(50);

fn cursors<T>(buffer: &BoundedBuffer<T>) -> (usize, usize, usize) {
    let stats = buffer.stats();
    (stats.len, stats.put_index, stats.take_index)
}

#[test]
fn interrupt_blocked_put_leaves_state_unchanged() {
    let buffer = BoundedBuffer::new(2).unwrap();
    buffer.put(1).unwrap();
    buffer.put(2).unwrap();
    buffer.take().unwrap();
    buffer.put(3).unwrap();
    let before = cursors(&buffer);

    let interrupt = Interrupt::new();
    let producer = {
        let buffer = buffer.clone();
        let interrupt = interrupt.clone();
        thread::spawn(move || buffer.put_interruptible(4, &interrupt))
    };

    thread::sleep(SETTLE);
    assert_eq!(buffer.stats().blocked_puts, 1);
    interrupt.raise();

    let err = producer.join().unwrap().unwrap_err();
    assert!(err.is_interrupted());
    assert_eq!(err.into_inner(), 4);
    assert_eq!(cursors(&buffer), before);
    assert!(!interrupt.is_raised());
    assert_eq!(buffer.take(), Ok(2));
    assert_eq!(buffer.take(), Ok(3));
}

#[test]
fn interrupt_blocked_take_leaves_state_unchanged() {
    let buffer: BoundedBuffer<String> = BoundedBuffer::new(3).unwrap();
    buffer.put("a".to_string()).unwrap();
    buffer.take().unwrap();
    let before = cursors(&buffer);

    let interrupt = Interrupt::new();
    let consumer = {
        let buffer = buffer.clone();
        let interrupt = interrupt.clone();
        thread::spawn(move || buffer.take_interruptible(&interrupt))
    };

    thread::sleep(SETTLE);
    interrupt.raise();
    assert_eq!(consumer.join().unwrap(), Err(TakeError::Interrupted));
    assert_eq!(cursors(&buffer), before);
    assert_eq!(buffer.stats().interrupts, 1);
}

#[test]
fn interrupt_targets_only_its_waiter() {
    let buffer = BoundedBuffer::new(1).unwrap();
    let victim = Interrupt::new();
    let bystander = Interrupt::new();

    let interrupted = {
        let buffer = buffer.clone();
        let victim = victim.clone();
        thread::spawn(move || buffer.take_interruptible(&victim))
    };
    let survivor = {
        let buffer = buffer.clone();
        let bystander = bystander.clone();
        thread::spawn(move || buffer.take_interruptible(&bystander))
    };

    thread::sleep(SETTLE);
    victim.raise();
    assert_eq!(interrupted.join().unwrap(), Err(TakeError::Interrupted));

    buffer.put(5u8).unwrap();
    assert_eq!(survivor.join().unwrap(), Ok(5));
}

#[test]
fn shared_token_still_reaches_remaining_waiter() {
    let buffer = BoundedBuffer::new(1).unwrap();
    let token = Interrupt::new();
    let waiters: Vec<_> = (0..2)
        .map(|_| {
            let buffer = buffer.clone();
            let token = token.clone();
            thread::spawn(move || buffer.take_interruptible(&token))
        })
        .collect();

    thread::sleep(SETTLE);
    buffer.put(7u32).unwrap();
    thread::sleep(SETTLE);
    // One waiter has left with the item; the other must still be reachable.
    token.raise();

    let results: Vec<_> = waiters.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| **r == Ok(7)).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| **r == Err(TakeError::Interrupted))
            .count(),
        1
    );
    assert!(!token.is_raised());
    assert!(buffer.is_empty());
}

#[test]
fn other_producers_progress_after_one_is_interrupted() {
    let buffer = BoundedBuffer::new(1).unwrap();
    buffer.put(0u32).unwrap();
    let interrupt = Interrupt::new();

    let interrupted = {
        let buffer = buffer.clone();
        let interrupt = interrupt.clone();
        thread::spawn(move || buffer.put_interruptible(1, &interrupt))
    };
    let plain: Vec<_> = [2u32, 3]
        .into_iter()
        .map(|v| {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.put(v))
        })
        .collect();

    thread::sleep(SETTLE);
    assert_eq!(buffer.stats().blocked_puts, 3);
    interrupt.raise();
    assert_eq!(interrupted.join().unwrap(), Err(PutError::Interrupted(1)));

    assert_eq!(buffer.take(), Ok(0));
    let mut rest = vec![buffer.take().unwrap(), buffer.take().unwrap()];
    for producer in plain {
        producer.join().unwrap().unwrap();
    }
    rest.sort_unstable();
    assert_eq!(rest, vec![2, 3]);
    assert_eq!(buffer.stats().interrupts, 1);
    assert!(buffer.is_empty());
}

#[test]
fn buffer_usable_after_interrupted_waits() {
    let buffer = BoundedBuffer::new(1).unwrap();
    buffer.put(0u64).unwrap();

    for _ in 0..5 {
        let interrupt = Interrupt::new();
        let producer = {
            let buffer = buffer.clone();
            let interrupt = interrupt.clone();
            thread::spawn(move || buffer.put_interruptible(99, &interrupt))
        };
        thread::sleep(Duration::from_millis(10));
        interrupt.raise();
        assert_eq!(producer.join().unwrap(), Err(PutError::Interrupted(99)));
    }

    assert_eq!(buffer.take(), Ok(0));
    buffer.put(1).unwrap();
    assert_eq!(buffer.take(), Ok(1));
    assert_eq!(buffer.stats().interrupts, 5);
}

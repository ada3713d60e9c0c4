//! Cross-cutting tests exercising `Registry` as an external crate would:
//! through its public surface only, with real OS threads where the
//! single-mutex concurrency model is itself the thing under test.

use std::{sync::Arc, thread};

use registry::{AccessMode, Config, Registry, Status};

fn registry() -> Registry {
    Registry::new(Config { use_locks: true, table_capacity: 64 })
}

#[test]
fn concurrent_posts_never_lose_an_increment() {
    let registry = Arc::new(registry());
    registry.register_plain("A", 0, None, 0, 0).unwrap();

    const THREADS: usize = 8;
    const POSTS_PER_THREAD: usize = 50;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..POSTS_PER_THREAD {
                    registry.post("A", 0, 0).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let observer = registry.register_plain("A", 0, None, 0, 0).unwrap();
    let addr = registry.get_check_addr(observer).unwrap();

    // val started at 1 and the registry lock serializes every increment, so
    // no post's effect is lost to a race.
    assert_eq!(addr.load(), 1 + (THREADS * POSTS_PER_THREAD) as u32);
}

#[test]
fn full_lifecycle_through_the_public_surface() {
    let registry = registry();

    registry.set_owner("com.example", 501, 20).unwrap();
    registry.set_access("com.example", AccessMode::from_bits(0b11_100_110)).unwrap();
    assert_eq!(registry.get_owner("com.example").unwrap(), (501, 20));

    let denied = registry.register_plain("com.example.child", 0, None, 999, 999);
    assert_eq!(denied, Err(Status::NotAuthorized));

    let client = registry.register_plain("com.example.child", 7, None, 501, 20).unwrap();
    assert!(registry.check(client).unwrap());

    registry.post("com.example.child", 501, 20).unwrap();
    assert!(registry.check(client).unwrap());

    registry.cancel(client).unwrap();
    assert_eq!(registry.check(client), Err(Status::InvalidToken));

    registry.release_name("com.example", 501, 20).unwrap();
    assert_eq!(registry.get_owner("com.example").unwrap(), (0, 0));
}

#[test]
fn unknown_client_operations_return_invalid_token() {
    let registry = registry();
    assert_eq!(registry.peek(42), Err(Status::InvalidToken));
    assert_eq!(registry.get_val(42), Err(Status::InvalidToken));
    assert_eq!(registry.get_state(42), Err(Status::InvalidToken));
    assert_eq!(registry.get_check_addr(42), Err(Status::InvalidToken));
    assert_eq!(registry.set_val(42, 0, 0, 1), Err(Status::InvalidToken));
}

use sockbridge::RuntimeBuilder;
use sockbridge::task::spawn;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_block_on_returns_output() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    assert_eq!(rt.block_on(async { 42 }), 42);
}

#[test]
fn test_spawned_tasks_all_complete() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let completed = Arc::new(Mutex::new(HashSet::new()));
    let completed_clone = completed.clone();

    rt.block_on(async move {
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let completed = completed_clone.clone();
                spawn(async move {
                    completed.lock().unwrap().insert(i);
                    i
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await, i);
        }
    });

    assert_eq!(completed.lock().unwrap().len(), 20);
}

#[test]
fn test_chained_spawns() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();

    let result = rt.block_on(async {
        let outer = spawn(async {
            let inner = spawn(async { 10 });
            inner.await + 20
        });
        outer.await + 30
    });

    assert_eq!(result, 60);
}

#[test]
fn test_runtime_spawn_from_outside() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();

    let handle = rt.spawn(async { "done" });

    assert_eq!(rt.block_on(handle), "done");
}

#[test]
fn test_worker_threads_are_named() {
    let rt = RuntimeBuilder::new()
        .worker_threads(1)
        .thread_name("bridge-test")
        .build();

    let name = rt.block_on(async { thread::current().name().map(str::to_string) });

    assert_eq!(name.as_deref(), Some("bridge-test-0"));
}

#[test]
#[should_panic(expected = "task failed")]
fn test_task_panic_reaches_block_on() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    rt.block_on(async { panic!("task failed") });
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_worker_threads_zero_panics() {
    let _ = RuntimeBuilder::new().worker_threads(0).build();
}

#[sockbridge::test(worker_threads = 2)]
async fn test_macro_accepts_options() {
    let handle = spawn(async { 1 + 1 });
    assert_eq!(handle.await, 2);
}

//! Run queue and worker pool.
//!
//! Workers all run the same loop: pop a ready process from the shared
//! priority queue (waiting up to a short timeout so shutdown is prompt),
//! mark it running, execute one quantum, then requeue it unless it
//! terminated or parked itself. Preemption is cooperative at the
//! instruction boundary the quantum grants; native calls are not
//! preemptible.
//!
//! The queue orders by explicit process priority, higher first, with FIFO
//! ordering among equals via a monotone sequence number. It holds at most
//! one entry per process: pushes for an already-queued handle are no-ops,
//! and a worker claims a popped entry by swapping the process from ready
//! to running, so stale wakes are dropped instead of granting extra
//! quanta.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::process::{ProcState, ProcessHandle, Tick};
use crate::vm::Vm;

/// Instructions a process may execute per schedule slot.
pub const QUANTUM: usize = 2000;

/// How long a worker waits on an empty queue before rechecking shutdown.
pub const POP_TIMEOUT: Duration = Duration::from_millis(10);

struct Entry {
    priority: u8,
    seq: u64,
    proc: Arc<ProcessHandle>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap: higher priority wins, earlier arrival breaks ties.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
pub struct RunQueue {
    heap: Mutex<BinaryHeap<Entry>>,
    cv: Condvar,
    seq: AtomicU64,
}

impl RunQueue {
    pub fn new() -> Self {
        RunQueue::default()
    }

    /// Enqueue a process. A handle whose queue slot is already claimed
    /// (racing wakers, a yield racing a send) is left alone: the queue
    /// holds each process at most once.
    pub fn push(&self, proc: Arc<ProcessHandle>) {
        if !proc.mark_queued() {
            return;
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        {
            let mut heap = self.heap.lock();
            heap.push(Entry {
                priority: proc.priority(),
                seq,
                proc,
            });
        }
        self.cv.notify_one();
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<Arc<ProcessHandle>> {
        let mut heap = self.heap.lock();
        if heap.is_empty() {
            self.cv.wait_for(&mut heap, timeout);
        }
        let proc = heap.pop().map(|entry| entry.proc)?;
        proc.clear_queued();
        Some(proc)
    }

    pub fn notify_all(&self) {
        self.cv.notify_all();
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }
}

/// The loop every worker thread runs until the machine stops.
pub fn worker_loop(vm: Arc<Vm>, index: usize) {
    tracing::debug!(worker = index, "worker started");
    while vm.is_running() {
        let Some(proc) = vm.run_queue().pop_timeout(POP_TIMEOUT) else {
            continue;
        };
        if proc.is_terminated() {
            continue;
        }
        // Only a ready process gets the slot. A stale entry for a process
        // that parked again, or whose quantum is still winding down on
        // another worker, is dropped; whatever makes it ready again
        // requeues it.
        if !proc.swap_state_if(ProcState::Ready, ProcState::Running) {
            continue;
        }
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            proc.run_quantum(&vm, QUANTUM)
        }));
        match outcome {
            Ok(Tick::Finished) => vm.finalize(&proc),
            Ok(Tick::Yielded) => {
                proc.set_state(ProcState::Ready);
                vm.run_queue().push(Arc::clone(&proc));
            }
            // A parked process is requeued by whoever unblocks it.
            Ok(Tick::Blocked) => {}
            Err(payload) => {
                let message = panic_message(payload);
                tracing::error!(
                    worker = index,
                    pid = proc.pid(),
                    %message,
                    "internal error, terminating process"
                );
                {
                    let mut core = proc.core.lock();
                    core.stack.clear();
                    core.result = None;
                }
                vm.finalize(&proc);
            }
        }
    }
    tracing::debug!(worker = index, "worker stopped");
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

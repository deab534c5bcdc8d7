//! The machine: process map, run queue, worker lifecycle.
//!
//! One [`Vm`] hosts many processes. It owns the shared pieces (PID
//! allocation, the concurrent process map, the run queue, the bytecode
//! code cache) and drives the fixed worker pool. Everything process-local
//! lives behind each process's own handle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::errors::VmError;
use crate::message::{self, Packet};
use crate::modules::CodeCache;
use crate::object::{ModulePayload, Payload};
use crate::process::{Pid, ProcState, ProcessHandle};
use crate::scheduler::{self, RunQueue};
use crate::stack::{Frame, FrameKind};
use crate::stdlib;

pub struct Vm {
    processes: DashMap<Pid, Arc<ProcessHandle>>,
    run_queue: RunQueue,
    code_cache: CodeCache,
    next_pid: AtomicU32,
    running: AtomicBool,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl Vm {
    /// A stopped machine resolving bytecode modules under `base`. Worker
    /// count is clamped to at least one.
    pub fn new(base: PathBuf, worker_count: usize) -> Arc<Vm> {
        stdlib::register_all();
        Arc::new(Vm {
            processes: DashMap::new(),
            run_queue: RunQueue::new(),
            code_cache: CodeCache::new(base),
            next_pid: AtomicU32::new(1),
            running: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
            worker_count: worker_count.max(1),
        })
    }

    pub fn code_cache(&self) -> &CodeCache {
        &self.code_cache
    }

    pub fn run_queue(&self) -> &RunQueue {
        &self.run_queue
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut workers = self.workers.lock();
        for index in 0..self.worker_count {
            let vm = Arc::clone(self);
            let handle = std::thread::Builder::new()
                .name(format!("beryl-worker-{}", index))
                .spawn(move || scheduler::worker_loop(vm, index))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        tracing::debug!(workers = self.worker_count, "machine started");
    }

    /// Stop the workers after their current quantum. Processes still
    /// queued are dropped; programs that need their children to finish
    /// use process.join before returning.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.run_queue.notify_all();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
        tracing::debug!("machine stopped");
    }

    // ── Process lifecycle ───────────────────────────────────────────────

    /// Load `module` from the code cache and boot a process running its
    /// top-level code.
    pub fn spawn_entry(&self, module: &str) -> Result<Pid, VmError> {
        let code = self.code_cache.get_or_load(module)?;
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ProcessHandle::new(pid, 0, None));
        {
            let mut core = handle.core.lock();
            let null = core.null();
            let root = core.alloc(
                None,
                Payload::Module(ModulePayload {
                    name: module.to_string(),
                    code: Some(Arc::clone(&code)),
                }),
            );
            core.registry.add(module.to_string(), root);
            core.registry.mark_loading(module.to_string());
            let frame = Frame::new(code, root, null, FrameKind::Module(module.to_string()));
            core.stack
                .push_frame(frame)
                .expect("fresh call stack cannot overflow");
        }
        self.processes.insert(pid, Arc::clone(&handle));
        self.run_queue.push(handle);
        tracing::debug!(pid, module, "entry process spawned");
        Ok(pid)
    }

    /// Create a process from a detached `(callable, args...)` packet. The
    /// packet is rehydrated into the new process's private heap and the
    /// call runs on its first quantum.
    pub fn spawn(&self, packet: Packet, priority: u8, parent: Option<Pid>) -> Pid {
        debug_assert!(packet.root_count() >= 1, "spawn packet needs a callable");
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ProcessHandle::new(pid, priority, parent));
        {
            let mut core = handle.core.lock();
            let mut roots = message::rehydrate(&mut *core, &packet);
            let callee = roots.remove(0);
            core.start = Some((callee, roots));
        }
        self.processes.insert(pid, Arc::clone(&handle));
        self.run_queue.push(handle);
        tracing::debug!(pid, parent = ?parent, "process spawned");
        pid
    }

    /// Deliver a detached message to `pid`'s mailbox, waking the receiver
    /// if it parked on an empty mailbox. Returns false for unknown pids.
    pub fn send(&self, pid: Pid, packet: Packet) -> bool {
        let handle = match self.processes.get(&pid) {
            Some(entry) => Arc::clone(entry.value()),
            None => return false,
        };
        handle.mailbox.push(packet);
        if handle.swap_state_if(ProcState::Waiting, ProcState::Ready) {
            self.run_queue.push(handle);
        }
        true
    }

    pub fn process(&self, pid: Pid) -> Option<Arc<ProcessHandle>> {
        self.processes.get(&pid).map(|entry| Arc::clone(entry.value()))
    }

    /// `ready`, `running`, `waiting`, `terminated`, or `unknown`.
    pub fn state_str(&self, pid: Pid) -> &'static str {
        self.process(pid)
            .map(|handle| handle.state().as_str())
            .unwrap_or("unknown")
    }

    /// Host-side blocking wait for a process to terminate.
    pub fn join(&self, pid: Pid) {
        if let Some(handle) = self.process(pid) {
            handle.wait_terminated();
        }
    }

    /// Mark a process terminated and wake its joiners. Terminated
    /// processes stay in the map so process.state keeps answering.
    pub fn finalize(&self, handle: &Arc<ProcessHandle>) {
        handle.set_state(ProcState::Terminated);
        for waiter in handle.take_join_waiters() {
            if let Some(joiner) = self.process(waiter) {
                if joiner.swap_state_if(ProcState::Waiting, ProcState::Ready) {
                    self.run_queue.push(joiner);
                }
            }
        }
        tracing::debug!(pid = handle.pid(), "process terminated");
    }

    /// Message of the exception a terminated process died with, if any.
    pub fn uncaught_exception(&self, pid: Pid) -> Option<String> {
        let handle = self.process(pid)?;
        let core = handle.core.lock();
        let result = core.result?;
        match &core.heap.get(result).payload {
            Payload::Exception(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Boot a machine, run `module`'s process to completion, and return
    /// the machine (still running, entry terminated) plus the entry pid.
    pub fn run_module(base: PathBuf, module: &str, workers: usize) -> Result<(Arc<Vm>, Pid), VmError> {
        let vm = Vm::new(base, workers);
        vm.start();
        let pid = match vm.spawn_entry(module) {
            Ok(pid) => pid,
            Err(err) => {
                vm.stop();
                return Err(err);
            }
        };
        vm.join(pid);
        Ok((vm, pid))
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        // Workers hold an Arc<Vm>, so by the time this runs they are
        // already gone; the flag flip is for machines never started.
        self.running.store(false, Ordering::Release);
    }
}

//! Lightweight processes.
//!
//! A process is split in two:
//!
//! * [`ProcessCore`] is everything only the owning worker touches during a
//!   quantum: the heap, the call stack, the module registry, the native
//!   prototype table, and the scratch roots natives use to anchor
//!   temporaries. It sits behind a mutex that is uncontended in steady
//!   state; the scheduler hands a process to one worker at a time.
//! * [`ProcessHandle`] is the shared face: pid, priority, state, mailbox,
//!   and join bookkeeping, all safe to poke from other workers.
//!
//! Allocation goes through the core so the collector can see every root
//! source. When the live set reaches the heap threshold, the core gathers
//! roots from the call stack, the module registry, the prototype table,
//! the scratch frame, the pending start call, and the process result, then
//! collects and doubles the threshold.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::heap::Heap;
use crate::interp::{self, Ctx, Fault};
use crate::mailbox::Mailbox;
use crate::modules::ModuleRegistry;
use crate::natives::NativeProtos;
use crate::object::{Object, Payload, Ref};
use crate::stack::CallStack;
use crate::vm::Vm;

pub type Pid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Ready,
    Running,
    Waiting,
    Terminated,
}

impl ProcState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcState::Ready => "ready",
            ProcState::Running => "running",
            ProcState::Waiting => "waiting",
            ProcState::Terminated => "terminated",
        }
    }
}

/// Result of one scheduled quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Quantum exhausted with work left; requeue.
    Yielded,
    /// The process parked itself (empty mailbox, live join target); it is
    /// requeued by whoever satisfies the condition, not by the worker.
    Blocked,
    /// Root frame returned or an uncaught exception unwound everything.
    Finished,
}

// ── Core ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ProcessCore {
    pub heap: Heap,
    pub stack: CallStack,
    pub registry: ModuleRegistry,
    pub protos: NativeProtos,
    /// Scoped native-frame roots: temporaries anchored across allocation.
    scratch: Vec<Ref>,
    /// Entry call installed by process.create, run on the first quantum.
    pub start: Option<(Ref, Vec<Ref>)>,
    /// Value of the root frame's return, or the uncaught exception.
    pub result: Option<Ref>,
}

impl ProcessCore {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let protos = NativeProtos::install(&mut heap);
        ProcessCore {
            heap,
            stack: CallStack::new(),
            registry: ModuleRegistry::new(),
            protos,
            scratch: Vec::new(),
            start: None,
            result: None,
        }
    }

    pub fn null(&self) -> Ref {
        self.protos.null
    }

    pub fn boolean(&self, value: bool) -> Ref {
        if value {
            self.protos.bool_true
        } else {
            self.protos.bool_false
        }
    }

    // ── Scratch roots (scoped native frames) ────────────────────────────

    pub fn scratch_mark(&self) -> usize {
        self.scratch.len()
    }

    pub fn scratch_push(&mut self, r: Ref) {
        self.scratch.push(r);
    }

    pub fn scratch_truncate(&mut self, mark: usize) {
        self.scratch.truncate(mark);
    }

    // ── Allocation ──────────────────────────────────────────────────────

    /// Allocate a new object. May run a collection first; the object under
    /// construction is rooted through the scratch frame while it runs, so
    /// its payload cannot be reaped out from under it.
    pub fn alloc(&mut self, parent: Option<Ref>, payload: Payload) -> Ref {
        let obj = Object::new(parent, payload);
        if self.heap.should_collect() {
            let mark = self.scratch.len();
            obj.trace(&mut self.scratch);
            self.collect();
            self.heap.double_threshold();
            self.scratch.truncate(mark);
        }
        self.heap.insert(obj)
    }

    pub fn alloc_plain(&mut self, parent: Option<Ref>) -> Ref {
        let parent = parent.or(Some(self.protos.object));
        self.alloc(parent, Payload::Plain)
    }

    pub fn alloc_number(&mut self, value: f64) -> Ref {
        let proto = self.protos.number;
        self.alloc(Some(proto), Payload::Number(value))
    }

    pub fn alloc_string(&mut self, value: impl Into<String>) -> Ref {
        let proto = self.protos.string;
        self.alloc(Some(proto), Payload::Str(value.into()))
    }

    pub fn alloc_array(&mut self, elems: Vec<Ref>) -> Ref {
        let proto = self.protos.array;
        self.alloc(Some(proto), Payload::Array(elems))
    }

    pub fn alloc_exception(&mut self, message: impl Into<String>) -> Ref {
        let proto = self.protos.exception;
        self.alloc(Some(proto), Payload::Exception(message.into()))
    }

    /// Full collection over every registered root source.
    pub fn collect(&mut self) -> usize {
        let mut roots = Vec::with_capacity(64);
        self.stack.trace(&mut roots);
        self.registry.trace(&mut roots);
        self.protos.trace(&mut roots);
        roots.extend(self.scratch.iter().copied());
        if let Some((callee, args)) = &self.start {
            roots.push(*callee);
            roots.extend(args.iter().copied());
        }
        if let Some(result) = self.result {
            roots.push(result);
        }
        let freed = self.heap.collect(roots);
        tracing::trace!(freed, live = self.heap.live(), "collection finished");
        freed
    }
}

impl Default for ProcessCore {
    fn default() -> Self {
        ProcessCore::new()
    }
}

pub fn exception_message(core: &ProcessCore, r: Ref) -> String {
    match &core.heap.get(r).payload {
        Payload::Exception(m) => m.clone(),
        other => format!("<{}>", Object::new(None, other.clone()).type_name()),
    }
}

// ── Handle ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    priority: u8,
    parent: Option<Pid>,
    state: Mutex<ProcState>,
    state_cv: Condvar,
    /// Set while a run-queue entry for this handle exists; keeps the
    /// queue at one entry per process no matter how many wakers race.
    queued: AtomicBool,
    pub mailbox: Mailbox,
    join_waiters: Mutex<Vec<Pid>>,
    pub core: Mutex<ProcessCore>,
}

impl ProcessHandle {
    pub fn new(pid: Pid, priority: u8, parent: Option<Pid>) -> Self {
        ProcessHandle {
            pid,
            priority,
            parent,
            state: Mutex::new(ProcState::Ready),
            state_cv: Condvar::new(),
            queued: AtomicBool::new(false),
            mailbox: Mailbox::new(),
            join_waiters: Mutex::new(Vec::new()),
            core: Mutex::new(ProcessCore::new()),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    pub fn state(&self) -> ProcState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: ProcState) {
        *self.state.lock() = state;
        self.state_cv.notify_all();
    }

    /// Transition `from` to `to` if the process is currently in `from`.
    pub fn swap_state_if(&self, from: ProcState, to: ProcState) -> bool {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            self.state_cv.notify_all();
            true
        } else {
            false
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == ProcState::Terminated
    }

    /// Host-side blocking wait for termination.
    pub fn wait_terminated(&self) {
        let mut state = self.state.lock();
        while *state != ProcState::Terminated {
            self.state_cv.wait(&mut state);
        }
    }

    /// Claim the single queue slot. Returns false if an entry for this
    /// handle is already queued (or in a worker's hands), making a
    /// duplicate push a no-op.
    pub(crate) fn mark_queued(&self) -> bool {
        !self.queued.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn clear_queued(&self) {
        self.queued.store(false, Ordering::Release);
    }

    pub fn add_join_waiter(&self, pid: Pid) {
        let mut waiters = self.join_waiters.lock();
        if !waiters.contains(&pid) {
            waiters.push(pid);
        }
    }

    pub fn take_join_waiters(&self) -> Vec<Pid> {
        std::mem::take(&mut *self.join_waiters.lock())
    }

    /// Execute up to `quantum` instructions on the calling worker thread.
    pub fn run_quantum(&self, vm: &Vm, quantum: usize) -> Tick {
        let mut core = self.core.lock();
        let mut ctx = Ctx {
            core: &mut *core,
            vm,
            proc: self,
        };

        if let Some((callee, args)) = ctx.core.start.take() {
            match interp::begin_call(&mut ctx, callee, args.clone()) {
                Ok(()) => {}
                Err(Fault::Block) => {
                    ctx.core.start = Some((callee, args));
                    return Tick::Blocked;
                }
                Err(fault) => return unwind(ctx.core, self.pid, fault),
            }
        }

        match interp::run_quantum(&mut ctx, quantum) {
            Ok(Tick::Finished) => {
                ctx.core.collect();
                Tick::Finished
            }
            Ok(tick) => tick,
            Err(fault) => unwind(ctx.core, self.pid, fault),
        }
    }
}

/// Unwind every frame and terminate with the exception as the result.
fn unwind(core: &mut ProcessCore, pid: Pid, fault: Fault) -> Tick {
    match fault {
        Fault::Throw(exc) => {
            let message = exception_message(core, exc);
            tracing::warn!(pid, %message, "uncaught exception, terminating process");
            core.stack.clear();
            core.result = Some(exc);
        }
        Fault::Internal(message) => {
            tracing::error!(pid, %message, "internal error, terminating process");
            core.stack.clear();
            core.result = None;
        }
        Fault::Block => {
            // Blocks are converted to ticks before they get here.
            tracing::error!(pid, "internal error: stray block fault");
            core.stack.clear();
            core.result = None;
        }
    }
    core.collect();
    Tick::Finished
}

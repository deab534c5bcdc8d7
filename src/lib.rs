//! Beryl runtime core.
//!
//! The execution engine of a small prototype-based scripting language:
//! a stack bytecode interpreter with magic-method dispatch, per-process
//! mark-and-sweep heaps, and a preemptive scheduler over lightweight
//! processes with message passing.
//!
//! Module layout:
//!   - opcode     stack-machine instruction set
//!   - code       compiled units, labels, constant pools, .emc files
//!   - magic      magic-method name table
//!   - object     prototype-chained objects and built-in variants
//!   - heap       per-process mark-and-sweep arena
//!   - stack      call stack and activation frames
//!   - interp     dispatch loop, calls, exceptions
//!   - mailbox    per-process FIFO message queue
//!   - message    cross-heap deep copies (detach / rehydrate)
//!   - process    process core + shared handle
//!   - scheduler  run queue and worker pool
//!   - vm         machine facade: spawn, send, join, lifecycle
//!   - modules    module registries and the code cache
//!   - natives    built-in prototypes and their methods
//!   - stdlib     core / process / gc native modules
//!   - errors     host-level errors

pub mod code;
pub mod errors;
pub mod heap;
pub mod interp;
pub mod magic;
pub mod mailbox;
pub mod message;
pub mod modules;
pub mod natives;
pub mod object;
pub mod opcode;
pub mod process;
pub mod scheduler;
pub mod stack;
pub mod stdlib;
pub mod vm;

pub use code::{Code, Instr, CODE_EXTENSION};
pub use errors::VmError;
pub use heap::Heap;
pub use interp::{Ctx, Fault};
pub use magic::Magic;
pub use object::{Object, Payload, Ref};
pub use opcode::Op;
pub use process::{Pid, ProcState, ProcessCore, ProcessHandle};
pub use scheduler::QUANTUM;
pub use vm::Vm;

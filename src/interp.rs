//! The bytecode interpreter.
//!
//! Execution is a flat loop over explicit frames: nothing recurses on the
//! Rust stack per language-level call, so call depth is bounded only by
//! the call stack's own limit. One [`step`] executes exactly one
//! instruction of the innermost frame; [`run_quantum`] drives it for the
//! scheduler's instruction quantum.
//!
//! Operator opcodes resolve a magic method on the left operand's
//! prototype chain and invoke it. A resolved native runs synchronously
//! and its result is pushed immediately; a resolved Function pushes a
//! frame and its `ret` delivers the result to the caller's operand stack,
//! which is exactly where the operator wanted it. Contexts that need the
//! value immediately (conditional jumps, stringification, cloning,
//! `__init__`) use [`call_sync`], which drives the nested frames to
//! completion inside the current quantum, the same way a native call is
//! not preemptible.
//!
//! Exceptions are ordinary objects traveling the `Err` channel of every
//! interpreter function. With no handler opcodes in the instruction set,
//! an uncaught exception unwinds every frame and terminates the process.

use std::sync::Arc;

use crate::code::Instr;
use crate::magic::Magic;
use crate::object::{Payload, Ref};
use crate::object::format_number;
use crate::opcode::Op;
use crate::process::{ProcessCore, ProcessHandle, Tick};
use crate::stack::{Frame, FrameKind};
use crate::vm::Vm;

/// Everything a running instruction can touch: the owning process's
/// private core, the shared machine, and the process's own handle.
pub struct Ctx<'a> {
    pub core: &'a mut ProcessCore,
    pub vm: &'a Vm,
    pub proc: &'a ProcessHandle,
}

/// Why an interpreter function did not produce a value.
#[derive(Debug)]
pub enum Fault {
    /// A language exception in flight; the payload lives in this heap.
    Throw(Ref),
    /// Invariant violation. Unrecoverable; terminates the process.
    Internal(String),
    /// The current instruction would block (empty mailbox, live join
    /// target). The instruction has been rewound and will re-execute when
    /// the process is rescheduled.
    Block,
}

/// Allocate an Exception carrying `message` and wrap it as a fault.
pub fn raise(core: &mut ProcessCore, message: impl Into<String>) -> Fault {
    let exc = core.alloc_exception(message.into());
    Fault::Throw(exc)
}

pub(crate) enum Invoked {
    /// A frame was pushed; the result arrives via `ret`.
    Frame,
    /// The callee ran synchronously.
    Value(Ref),
}

fn top<'a>(ctx: &'a mut Ctx) -> &'a mut Frame {
    ctx.core
        .stack
        .top()
        .expect("internal error: no active frame")
}

// ── Quantum loop ────────────────────────────────────────────────────────

/// Run up to `quantum` instructions of the innermost frames.
pub fn run_quantum(ctx: &mut Ctx, quantum: usize) -> Result<Tick, Fault> {
    for _ in 0..quantum {
        if ctx.core.stack.is_empty() {
            return Ok(Tick::Finished);
        }
        match step(ctx) {
            Ok(()) => {}
            Err(Fault::Block) => return Ok(Tick::Blocked),
            Err(fault) => return Err(fault),
        }
    }
    if ctx.core.stack.is_empty() {
        Ok(Tick::Finished)
    } else {
        Ok(Tick::Yielded)
    }
}

/// Install the entry call of a spawned process: either pushes the root
/// frame or, for a native callable, runs it and records the result.
pub fn begin_call(ctx: &mut Ctx, callee: Ref, args: Vec<Ref>) -> Result<(), Fault> {
    match call_obj(ctx, callee, args)? {
        Invoked::Value(v) => {
            ctx.core.result = Some(v);
            Ok(())
        }
        Invoked::Frame => Ok(()),
    }
}

// ── Single-instruction dispatch ─────────────────────────────────────────

fn step(ctx: &mut Ctx) -> Result<(), Fault> {
    // A frame that ran off the end of its code is retired as its own
    // step, so a synchronous caller observes the depth change before the
    // caller's next instruction runs. Module frames leave nothing behind;
    // call frames deliver an implicit null.
    let exhausted = match ctx.core.stack.top() {
        Some(frame) => !frame.has_instructions_left(),
        None => return Ok(()),
    };
    if exhausted {
        let frame = ctx.core.stack.pop_frame().expect("frame just observed");
        match frame.kind {
            FrameKind::Module(ref name) => ctx.core.registry.finish_loading(name),
            FrameKind::Call => {
                let null = ctx.core.null();
                if let Some(caller) = ctx.core.stack.top() {
                    caller.push(null);
                }
            }
        }
        return Ok(());
    }

    let instr: Instr = {
        let frame = top(ctx);
        let instr = frame.code.instr(frame.ip);
        frame.ip += 1;
        instr
    };

    match instr.op {
        Op::Nop => {}
        Op::Jmp => top(ctx).ip = instr.arg(0) as usize,
        Op::JmpTrue | Op::JmpFalse => {
            let v = top(ctx).pop();
            let b = truthy(ctx, v)?;
            if b == (instr.op == Op::JmpTrue) {
                top(ctx).ip = instr.arg(0) as usize;
            }
        }

        Op::Neg => unary_op(ctx, Magic::Neg)?,
        Op::BitNot => unary_op(ctx, Magic::BitNot)?,

        Op::Add => binary_op(ctx, Magic::Add)?,
        Op::Sub => binary_op(ctx, Magic::Sub)?,
        Op::Mul => binary_op(ctx, Magic::Mul)?,
        Op::Div => binary_op(ctx, Magic::Div)?,
        Op::Mod => binary_op(ctx, Magic::Mod)?,
        Op::Eq => binary_op(ctx, Magic::Eq)?,
        Op::Neq => binary_op(ctx, Magic::Neq)?,
        Op::Lt => binary_op(ctx, Magic::Lt)?,
        Op::Gt => binary_op(ctx, Magic::Gt)?,
        Op::Lte => binary_op(ctx, Magic::Lte)?,
        Op::Gte => binary_op(ctx, Magic::Gte)?,
        Op::BitOr => binary_op(ctx, Magic::BitOr)?,
        Op::BitXor => binary_op(ctx, Magic::BitXor)?,
        Op::BitAnd => binary_op(ctx, Magic::BitAnd)?,
        Op::BitShl => binary_op(ctx, Magic::BitShl)?,
        Op::BitShr => binary_op(ctx, Magic::BitShr)?,

        Op::IAdd => inplace_op(ctx, Magic::IAdd, Magic::Add)?,
        Op::ISub => inplace_op(ctx, Magic::ISub, Magic::Sub)?,
        Op::IMul => inplace_op(ctx, Magic::IMul, Magic::Mul)?,
        Op::IDiv => inplace_op(ctx, Magic::IDiv, Magic::Div)?,
        Op::IMod => inplace_op(ctx, Magic::IMod, Magic::Mod)?,

        Op::Str => {
            let v = top(ctx).pop();
            match ctx.core.heap.resolve(v, Magic::Str.name()) {
                Some(method) => {
                    let result = call_sync(ctx, method, vec![v])?;
                    top(ctx).push(result);
                }
                None => {
                    let mark = ctx.core.scratch_mark();
                    ctx.core.scratch_push(v);
                    let s = default_str(ctx, v)?;
                    let result = ctx.core.alloc_string(s);
                    ctx.core.scratch_truncate(mark);
                    top(ctx).push(result);
                }
            }
        }
        Op::Boolean => {
            let v = top(ctx).pop();
            let b = truthy(ctx, v)?;
            let result = ctx.core.boolean(b);
            top(ctx).push(result);
        }

        Op::Call => {
            let n = instr.arg(0) as usize;
            let (callee, args) = {
                let frame = top(ctx);
                let args = frame.pop_args(n);
                let callee = frame.pop();
                (callee, args)
            };
            match call_obj(ctx, callee, args.clone()) {
                Ok(Invoked::Value(v)) => top(ctx).push(v),
                Ok(Invoked::Frame) => {}
                Err(Fault::Block) => {
                    // Rewind so the call re-executes on reschedule.
                    let frame = top(ctx);
                    frame.push(callee);
                    for arg in &args {
                        frame.push(*arg);
                    }
                    frame.ip -= 1;
                    return Err(Fault::Block);
                }
                Err(fault) => return Err(fault),
            }
        }
        Op::Ret => {
            let null = ctx.core.null();
            let mut frame = ctx
                .core
                .stack
                .pop_frame()
                .expect("internal error: ret without a frame");
            let result = frame.data.pop().unwrap_or(null);
            if let FrameKind::Module(ref name) = frame.kind {
                ctx.core.registry.finish_loading(name);
            }
            match ctx.core.stack.top() {
                Some(caller) => caller.push(result),
                None => ctx.core.result = Some(result),
            }
        }

        Op::NewObj => {
            let explicit_parent = instr.arg(0) != 0;
            let num_props = instr.arg(1) as usize;
            new_obj(ctx, explicit_parent, num_props)?;
        }
        Op::Init => {
            // The freshly built object sits on top with the init
            // arguments beneath it; it stays on the stack afterwards.
            let n = instr.arg(0) as usize;
            let (args, receiver) = {
                let frame = top(ctx);
                let receiver = frame.pop();
                let args = frame.pop_args(n);
                frame.push(receiver);
                (args, receiver)
            };
            let method = match ctx.core.heap.resolve(receiver, Magic::Init.name()) {
                Some(m) => m,
                None => return Err(raise(ctx.core, "no such method: __init__")),
            };
            let mut full = Vec::with_capacity(n + 1);
            full.push(receiver);
            full.extend(args);
            call_sync(ctx, method, full)?;
        }
        Op::NewFunc => {
            let id = instr.arg(0) as usize;
            let (code, globals) = {
                let frame = top(ctx);
                (frame.code.func(id), frame.globals)
            };
            let code = match code {
                Some(c) => c,
                None => return Err(Fault::Internal(format!("unknown function id {}", id))),
            };
            let func = ctx.core.alloc(
                None,
                Payload::Function(crate::object::FunctionPayload { code, globals }),
            );
            top(ctx).push(func);
        }
        Op::NewNum => {
            let value = top(ctx).code.num_constant(instr.arg(0) as usize);
            let num = ctx.core.alloc_number(value);
            top(ctx).push(num);
        }
        Op::NewStr => {
            let value = top(ctx).code.str_constant(instr.arg(0) as usize).to_string();
            let s = ctx.core.alloc_string(value);
            top(ctx).push(s);
        }
        Op::NewBoolean => {
            let b = ctx.core.boolean(instr.arg(0) != 0);
            top(ctx).push(b);
        }
        Op::NewArr => {
            let n = instr.arg(0) as usize;
            // Elements are collected top-down: the top of the stack
            // becomes element zero.
            let elems = {
                let frame = top(ctx);
                let mut elems = Vec::with_capacity(n);
                for _ in 0..n {
                    elems.push(frame.pop());
                }
                elems
            };
            let arr = ctx.core.alloc_array(elems);
            top(ctx).push(arr);
        }
        Op::Null => {
            let null = ctx.core.null();
            top(ctx).push(null);
        }

        Op::GetProp => {
            let push_self_back = instr.arg(0) != 0;
            let (obj, key) = {
                let frame = top(ctx);
                let obj = frame.pop();
                let key = frame.pop();
                (obj, key)
            };
            let mark = ctx.core.scratch_mark();
            ctx.core.scratch_push(obj);
            let key = string_key(ctx, key)?;
            ctx.core.scratch_truncate(mark);
            match ctx.core.heap.resolve(obj, &key) {
                Some(value) => {
                    // The value goes under the re-pushed receiver so a
                    // following `call` finds the callee beneath its args.
                    let frame = top(ctx);
                    frame.push(value);
                    if push_self_back {
                        frame.push(obj);
                    }
                }
                None => return Err(raise(ctx.core, format!("no such property: {}", key))),
            }
        }
        Op::HasProp => {
            let push_self_back = instr.arg(0) != 0;
            let (obj, key) = {
                let frame = top(ctx);
                let obj = frame.pop();
                let key = frame.pop();
                (obj, key)
            };
            let mark = ctx.core.scratch_mark();
            ctx.core.scratch_push(obj);
            let key = string_key(ctx, key)?;
            ctx.core.scratch_truncate(mark);
            let has = ctx.core.heap.has_property(obj, &key);
            let b = ctx.core.boolean(has);
            let frame = top(ctx);
            frame.push(b);
            if push_self_back {
                frame.push(obj);
            }
        }
        Op::SetProp => {
            let push_self_back = instr.arg(0) != 0;
            let (value, key, obj) = {
                let frame = top(ctx);
                let value = frame.pop();
                let key = frame.pop();
                let obj = frame.pop();
                (value, key, obj)
            };
            let mark = ctx.core.scratch_mark();
            ctx.core.scratch_push(obj);
            ctx.core.scratch_push(value);
            let key = string_key(ctx, key)?;
            ctx.core.scratch_truncate(mark);
            if !ctx.core.heap.set_property(obj, key.clone(), value) {
                return Err(raise(ctx.core, format!("could not set property: {}", key)));
            }
            if push_self_back {
                top(ctx).push(obj);
            }
        }
        Op::GetParent => {
            let obj = top(ctx).pop();
            let parent = ctx.core.heap.get(obj).parent.unwrap_or(ctx.core.null());
            top(ctx).push(parent);
        }

        Op::LdLoc => {
            let slot = instr.arg(0) as usize;
            let frame = top(ctx);
            let value = frame.locals[slot];
            frame.push(value);
        }
        Op::StLoc => {
            let slot = instr.arg(0) as usize;
            let frame = top(ctx);
            let value = frame.pop();
            frame.locals[slot] = value;
        }
        Op::LdGbl => {
            let (name, globals) = {
                let frame = top(ctx);
                (frame.code.global_name(instr.arg(0) as usize), frame.globals)
            };
            match ctx.core.heap.resolve(globals, &name) {
                Some(value) => top(ctx).push(value),
                None => return Err(raise(ctx.core, format!("no such variable: {}", name))),
            }
        }
        Op::StGbl => {
            let (name, globals, value) = {
                let frame = top(ctx);
                let value = frame.pop();
                (frame.code.global_name(instr.arg(0) as usize), frame.globals, value)
            };
            ctx.core.heap.set_property(globals, name, value);
        }

        Op::Print => {
            let v = top(ctx).pop();
            let mark = ctx.core.scratch_mark();
            ctx.core.scratch_push(v);
            let s = stringify(ctx, v)?;
            ctx.core.scratch_truncate(mark);
            println!("{}", s);
        }
        Op::Import => {
            let name = {
                let frame = top(ctx);
                frame.code.import_name(instr.arg(0) as usize).to_string()
            };
            import_module(ctx, &name)?;
        }
    }
    Ok(())
}

// ── Operator dispatch ───────────────────────────────────────────────────

fn unary_op(ctx: &mut Ctx, magic: Magic) -> Result<(), Fault> {
    let args = top(ctx).pop_args(1);
    execute_mm(ctx, magic, args)
}

fn binary_op(ctx: &mut Ctx, magic: Magic) -> Result<(), Fault> {
    let args = top(ctx).pop_args(2);
    execute_mm(ctx, magic, args)
}

/// In-place arithmetic resolves the `__i*__` hook and falls back to the
/// plain operator when the receiver's chain has none.
fn inplace_op(ctx: &mut Ctx, magic: Magic, fallback: Magic) -> Result<(), Fault> {
    let args = top(ctx).pop_args(2);
    let method = ctx
        .core
        .heap
        .resolve(args[0], magic.name())
        .or_else(|| ctx.core.heap.resolve(args[0], fallback.name()));
    match method {
        Some(m) => dispatch_push(ctx, m, args),
        None => Err(raise(ctx.core, format!("no such method: {}", magic.name()))),
    }
}

fn execute_mm(ctx: &mut Ctx, magic: Magic, args: Vec<Ref>) -> Result<(), Fault> {
    match ctx.core.heap.resolve(args[0], magic.name()) {
        Some(m) => dispatch_push(ctx, m, args),
        None => Err(raise(ctx.core, format!("no such method: {}", magic.name()))),
    }
}

fn dispatch_push(ctx: &mut Ctx, callee: Ref, args: Vec<Ref>) -> Result<(), Fault> {
    match call_obj(ctx, callee, args)? {
        Invoked::Value(v) => {
            top(ctx).push(v);
            Ok(())
        }
        Invoked::Frame => Ok(()),
    }
}

// ── Calls ───────────────────────────────────────────────────────────────

pub(crate) fn call_obj(ctx: &mut Ctx, callee: Ref, args: Vec<Ref>) -> Result<Invoked, Fault> {
    enum Kind {
        Func(crate::object::FunctionPayload),
        Native(crate::object::NativeFn),
        Other,
    }
    let kind = match &ctx.core.heap.get(callee).payload {
        Payload::Function(f) => Kind::Func(f.clone()),
        Payload::Native(f) => Kind::Native(*f),
        _ => Kind::Other,
    };
    match kind {
        Kind::Func(f) => {
            let null = ctx.core.null();
            let mut frame = Frame::new(f.code, f.globals, null, FrameKind::Call);
            for (i, arg) in args.into_iter().enumerate() {
                if i < frame.locals.len() {
                    frame.locals[i] = arg;
                }
            }
            if ctx.core.stack.push_frame(frame).is_err() {
                return Err(raise(ctx.core, "stack overflow"));
            }
            Ok(Invoked::Frame)
        }
        Kind::Native(f) => {
            // Root callee and arguments for the duration of the call; the
            // native anchors its own temporaries the same way.
            let mark = ctx.core.scratch_mark();
            ctx.core.scratch_push(callee);
            for arg in &args {
                ctx.core.scratch_push(*arg);
            }
            let result = f(ctx, &args);
            ctx.core.scratch_truncate(mark);
            result.map(Invoked::Value)
        }
        Kind::Other => match ctx.core.heap.resolve(callee, Magic::Call.name()) {
            Some(m) => call_obj(ctx, m, args),
            None => Err(raise(ctx.core, "object is not callable")),
        },
    }
}

/// Invoke a callable and drive it to completion, returning its value.
/// Used where the interpreter needs the result inside one instruction.
pub fn call_sync(ctx: &mut Ctx, callee: Ref, args: Vec<Ref>) -> Result<Ref, Fault> {
    match call_obj(ctx, callee, args) {
        Ok(Invoked::Value(v)) => Ok(v),
        Ok(Invoked::Frame) => {
            let base = ctx.core.stack.depth();
            while ctx.core.stack.depth() >= base {
                match step(ctx) {
                    Ok(()) => {}
                    Err(Fault::Block) => {
                        return Err(raise(ctx.core, "cannot block inside a protocol call"))
                    }
                    Err(fault) => return Err(fault),
                }
            }
            Ok(top(ctx).pop())
        }
        Err(Fault::Block) => Err(raise(ctx.core, "cannot block inside a protocol call")),
        Err(fault) => Err(fault),
    }
}

// ── Truthiness, stringification, property keys ──────────────────────────

/// `__boolean__` through the chain, falling back to the default rules.
pub fn truthy(ctx: &mut Ctx, r: Ref) -> Result<bool, Fault> {
    match ctx.core.heap.resolve(r, Magic::Boolean.name()) {
        Some(method) => {
            let mark = ctx.core.scratch_mark();
            ctx.core.scratch_push(r);
            let result = call_sync(ctx, method, vec![r])?;
            ctx.core.scratch_truncate(mark);
            Ok(ctx.core.heap.get(result).as_bool())
        }
        None => Ok(ctx.core.heap.get(r).as_bool()),
    }
}

/// `__str__` through the chain, falling back to the per-variant default.
pub fn stringify(ctx: &mut Ctx, r: Ref) -> Result<String, Fault> {
    let mark = ctx.core.scratch_mark();
    ctx.core.scratch_push(r);
    let out = match ctx.core.heap.resolve(r, Magic::Str.name()) {
        Some(method) => {
            let result = call_sync(ctx, method, vec![r])?;
            let direct = match &ctx.core.heap.get(result).payload {
                Payload::Str(s) => Some(s.clone()),
                _ => None,
            };
            match direct {
                Some(s) => s,
                None => default_str(ctx, result)?,
            }
        }
        None => default_str(ctx, r)?,
    };
    ctx.core.scratch_truncate(mark);
    Ok(out)
}

fn default_str(ctx: &mut Ctx, r: Ref) -> Result<String, Fault> {
    enum Rendered {
        Done(String),
        Elements(Vec<Ref>),
    }
    let rendered = match &ctx.core.heap.get(r).payload {
        Payload::Number(n) => Rendered::Done(format_number(*n)),
        Payload::Str(s) => Rendered::Done(s.clone()),
        Payload::Boolean(b) => Rendered::Done(if *b { "true" } else { "false" }.to_string()),
        Payload::Null => Rendered::Done("null".to_string()),
        Payload::Exception(m) => Rendered::Done(m.clone()),
        Payload::Function(f) => Rendered::Done(format!("<function {}>", f.code.label())),
        Payload::Native(_) => Rendered::Done("<native function>".to_string()),
        Payload::Module(m) => Rendered::Done(format!("<module {}>", m.name)),
        Payload::Plain => Rendered::Done(format!("<object at {}>", r.0)),
        Payload::Array(elems) => Rendered::Elements(elems.clone()),
    };
    match rendered {
        Rendered::Done(s) => Ok(s),
        Rendered::Elements(elems) => {
            let mut parts = Vec::with_capacity(elems.len());
            for e in elems {
                parts.push(stringify(ctx, e)?);
            }
            Ok(format!("[{}]", parts.join(",")))
        }
    }
}

/// Property key from an arbitrary object: strings pass through, anything
/// else is stringified.
pub fn string_key(ctx: &mut Ctx, r: Ref) -> Result<String, Fault> {
    let direct = match &ctx.core.heap.get(r).payload {
        Payload::Str(s) => Some(s.clone()),
        _ => None,
    };
    match direct {
        Some(s) => Ok(s),
        None => stringify(ctx, r),
    }
}

// ── Object construction and import ──────────────────────────────────────

/// `new_obj`: pop property pairs and an optional explicit parent, clone
/// the parent through `__clone__`, write the properties, push the child.
fn new_obj(ctx: &mut Ctx, explicit_parent: bool, num_props: usize) -> Result<(), Fault> {
    let mark = ctx.core.scratch_mark();

    let mut props: Vec<(Ref, Ref)> = Vec::with_capacity(num_props);
    {
        let frame = top(ctx);
        for _ in 0..num_props {
            let key = frame.pop();
            let value = frame.pop();
            props.push((key, value));
        }
    }
    let parent = if explicit_parent {
        top(ctx).pop()
    } else {
        ctx.core.protos.object
    };

    ctx.core.scratch_push(parent);
    for (key, value) in &props {
        ctx.core.scratch_push(*key);
        ctx.core.scratch_push(*value);
    }

    let clone_method = match ctx.core.heap.resolve(parent, Magic::Clone.name()) {
        Some(m) => m,
        None => return Err(raise(ctx.core, "no such method: __clone__")),
    };
    let child = call_sync(ctx, clone_method, vec![parent])?;
    ctx.core.scratch_push(child);

    for (key, value) in props {
        let key = string_key(ctx, key)?;
        if !ctx.core.heap.set_property(child, key.clone(), value) {
            return Err(raise(ctx.core, format!("could not set property: {}", key)));
        }
    }

    ctx.core.scratch_truncate(mark);
    top(ctx).push(child);
    Ok(())
}

/// `import`: cached module, native initializer, or bytecode load whose
/// top-level frame runs to define the exports.
fn import_module(ctx: &mut Ctx, name: &str) -> Result<(), Fault> {
    if ctx.core.registry.is_loading(name) {
        return Err(raise(ctx.core, format!("cyclic import: {}", name)));
    }
    if let Some(module) = ctx.core.registry.get(name) {
        top(ctx).push(module);
        return Ok(());
    }
    if let Some(init) = crate::modules::native_init(name) {
        let module = init(ctx)?;
        ctx.core.registry.add(name.to_string(), module);
        top(ctx).push(module);
        tracing::debug!(pid = ctx.proc.pid(), module = name, "native module initialized");
        return Ok(());
    }

    let code = match ctx.vm.code_cache().get_or_load(name) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(module = name, %err, "module load failed");
            return Err(raise(ctx.core, format!("no such module: {}", name)));
        }
    };
    let null = ctx.core.null();
    let module = ctx.core.alloc(
        None,
        Payload::Module(crate::object::ModulePayload {
            name: name.to_string(),
            code: Some(Arc::clone(&code)),
        }),
    );
    ctx.core.registry.add(name.to_string(), module);
    ctx.core.registry.mark_loading(name.to_string());
    top(ctx).push(module);

    let frame = Frame::new(code, module, null, FrameKind::Module(name.to_string()));
    if ctx.core.stack.push_frame(frame).is_err() {
        return Err(raise(ctx.core, "stack overflow"));
    }
    Ok(())
}

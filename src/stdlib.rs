//! Native standard modules: `core`, `process`, and `gc`.
//!
//! These are the runtime hooks the core cannot live without. Each
//! initializer allocates a fresh module object on the importing process's
//! heap and populates it with native functions; the per-process module
//! registry guarantees the initializer runs at most once per process.

use std::time::Duration;

use crate::interp::{call_sync, raise, stringify, truthy, Ctx, Fault};
use crate::magic::Magic;
use crate::message;
use crate::modules::register_native_init;
use crate::natives::{number_of, render_args};
use crate::object::{ModulePayload, NativeFn, Payload, Ref};
use crate::process::{Pid, ProcState};

pub fn register_all() {
    register_native_init("core", init_core);
    register_native_init("process", init_process);
    register_native_init("gc", init_gc);
}

fn alloc_module(ctx: &mut Ctx, name: &str) -> Ref {
    ctx.core.alloc(
        None,
        Payload::Module(ModulePayload {
            name: name.to_string(),
            code: None,
        }),
    )
}

fn set_native(ctx: &mut Ctx, target: Ref, name: &str, f: NativeFn) {
    let func = ctx.core.alloc(None, Payload::Native(f));
    ctx.core.heap.set_property(target, name.to_string(), func);
}

fn want_pid(ctx: &mut Ctx, r: Ref, what: &str) -> Result<Pid, Fault> {
    match number_of(ctx.core, r) {
        Some(n) if n >= 0.0 => Ok(n as Pid),
        _ => Err(raise(ctx.core, format!("{} expects a pid", what))),
    }
}

// ── core ────────────────────────────────────────────────────────────────

fn init_core(ctx: &mut Ctx) -> Result<Ref, Fault> {
    let mark = ctx.core.scratch_mark();
    let module = alloc_module(ctx, "core");
    ctx.core.scratch_push(module);

    let protos = [
        ("Object", ctx.core.protos.object),
        ("Number", ctx.core.protos.number),
        ("String", ctx.core.protos.string),
        ("Boolean", ctx.core.protos.boolean),
        ("Array", ctx.core.protos.array),
        ("Exception", ctx.core.protos.exception),
    ];
    for (name, proto) in protos {
        ctx.core.heap.set_property(module, name.to_string(), proto);
    }

    set_native(ctx, module, "print", core_print);
    set_native(ctx, module, "str", core_str);
    set_native(ctx, module, "boolean", core_boolean);
    set_native(ctx, module, "clone", core_clone);
    set_native(ctx, module, "type", core_type);

    ctx.core.scratch_truncate(mark);
    Ok(module)
}

fn core_print(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let line = render_args(ctx, args)?;
    println!("{}", line);
    Ok(ctx.core.null())
}

fn core_str(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 2 {
        return Err(raise(ctx.core, "str expects 1 argument"));
    }
    let s = stringify(ctx, args[1])?;
    Ok(ctx.core.alloc_string(s))
}

fn core_boolean(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 2 {
        return Err(raise(ctx.core, "boolean expects 1 argument"));
    }
    let b = truthy(ctx, args[1])?;
    Ok(ctx.core.boolean(b))
}

fn core_clone(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 2 {
        return Err(raise(ctx.core, "clone expects 1 argument"));
    }
    let method = match ctx.core.heap.resolve(args[1], Magic::Clone.name()) {
        Some(m) => m,
        None => return Err(raise(ctx.core, "no such method: __clone__")),
    };
    call_sync(ctx, method, vec![args[1]])
}

fn core_type(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 2 {
        return Err(raise(ctx.core, "type expects 1 argument"));
    }
    let name = ctx.core.heap.get(args[1]).type_name();
    Ok(ctx.core.alloc_string(name))
}

// ── process ─────────────────────────────────────────────────────────────

fn init_process(ctx: &mut Ctx) -> Result<Ref, Fault> {
    let mark = ctx.core.scratch_mark();
    let module = alloc_module(ctx, "process");
    ctx.core.scratch_push(module);

    set_native(ctx, module, "create", process_create);
    set_native(ctx, module, "id", process_id);
    set_native(ctx, module, "join", process_join);
    set_native(ctx, module, "receive", process_receive);
    set_native(ctx, module, "send", process_send);
    set_native(ctx, module, "sleep", process_sleep);
    set_native(ctx, module, "state", process_state);

    let states = ctx.core.alloc_plain(None);
    ctx.core.scratch_push(states);
    for name in ["ready", "running", "waiting", "terminated"] {
        let value = ctx.core.alloc_string(name);
        ctx.core.heap.set_property(states, name.to_string(), value);
    }
    ctx.core.heap.set_property(module, "States".to_string(), states);

    ctx.core.scratch_truncate(mark);
    Ok(module)
}

/// Deep-copies the callable and its arguments into the new process's heap
/// and schedules it; returns the new pid.
fn process_create(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() < 2 {
        return Err(raise(ctx.core, "create expects at least 1 argument"));
    }
    let packet = message::detach(ctx.core, &args[1..]);
    let pid = ctx.vm.spawn(packet, ctx.proc.priority(), Some(ctx.proc.pid()));
    Ok(ctx.core.alloc_number(pid as f64))
}

fn process_id(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 1 {
        return Err(raise(ctx.core, "id expects 0 arguments"));
    }
    Ok(ctx.core.alloc_number(ctx.proc.pid() as f64))
}

fn process_join(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 2 {
        return Err(raise(ctx.core, "join expects 1 argument"));
    }
    let pid = want_pid(ctx, args[1], "join")?;
    let target = match ctx.vm.process(pid) {
        Some(t) => t,
        None => return Ok(ctx.core.null()),
    };
    if target.is_terminated() {
        return Ok(ctx.core.null());
    }
    // Park first, then register, then re-check: a target terminating
    // between the steps either sees us waiting or is seen terminated.
    ctx.proc.set_state(ProcState::Waiting);
    target.add_join_waiter(ctx.proc.pid());
    if target.is_terminated() {
        ctx.proc.set_state(ProcState::Running);
        return Ok(ctx.core.null());
    }
    Err(Fault::Block)
}

fn process_receive(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 1 {
        return Err(raise(ctx.core, "receive expects 0 arguments"));
    }
    // Park before checking so a concurrent send cannot slip between the
    // empty check and the state change.
    ctx.proc.set_state(ProcState::Waiting);
    match ctx.proc.mailbox.try_pop() {
        Some(packet) => {
            ctx.proc.set_state(ProcState::Running);
            let roots = message::rehydrate(ctx.core, &packet);
            Ok(roots[0])
        }
        None => Err(Fault::Block),
    }
}

fn process_send(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 3 {
        return Err(raise(ctx.core, "send expects 2 arguments"));
    }
    let pid = want_pid(ctx, args[1], "send")?;
    let packet = message::detach(ctx.core, &args[2..3]);
    let delivered = ctx.vm.send(pid, packet);
    Ok(ctx.core.boolean(delivered))
}

fn process_sleep(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 2 {
        return Err(raise(ctx.core, "sleep expects 1 argument"));
    }
    let secs = match number_of(ctx.core, args[1]) {
        Some(n) if n >= 0.0 => n,
        _ => return Err(raise(ctx.core, "sleep expects a non-negative number")),
    };
    // The worker thread blocks here; preemption is only at quantum
    // boundaries, so a sleeping process keeps its worker.
    ctx.proc.set_state(ProcState::Waiting);
    std::thread::sleep(Duration::from_secs_f64(secs));
    ctx.proc.set_state(ProcState::Running);
    Ok(ctx.core.null())
}

fn process_state(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 2 {
        return Err(raise(ctx.core, "state expects 1 argument"));
    }
    let pid = want_pid(ctx, args[1], "state")?;
    let state = ctx.vm.state_str(pid);
    Ok(ctx.core.alloc_string(state))
}

// ── gc ──────────────────────────────────────────────────────────────────

fn init_gc(ctx: &mut Ctx) -> Result<Ref, Fault> {
    let mark = ctx.core.scratch_mark();
    let module = alloc_module(ctx, "gc");
    ctx.core.scratch_push(module);

    set_native(ctx, module, "collect", gc_collect);
    set_native(ctx, module, "threshold", gc_threshold);

    ctx.core.scratch_truncate(mark);
    Ok(module)
}

/// Forced collection; returns the number of objects freed. Does not touch
/// the growth threshold.
fn gc_collect(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 1 {
        return Err(raise(ctx.core, "collect expects 0 arguments"));
    }
    let freed = ctx.core.collect();
    Ok(ctx.core.alloc_number(freed as f64))
}

fn gc_threshold(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    if args.len() != 1 {
        return Err(raise(ctx.core, "threshold expects 0 arguments"));
    }
    let threshold = ctx.core.heap.threshold() as f64;
    Ok(ctx.core.alloc_number(threshold))
}

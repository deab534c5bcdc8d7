//! Multi-process scenarios: spawning, message passing, joining, state
//! queries, and scheduler fairness across workers.

mod common;

use beryl::code::Code;
use common::*;

/// Build a module that imports `process` into the `process` global before
/// anything else runs.
fn module_with_process() -> Code {
    let mut code = Code::new("main");
    code.write_import("process");
    code.write_stgbl("process");
    code
}

/// Emit `process.<name>` onto the stack ready for a call: callee under
/// the receiver argument.
fn write_method(code: &mut Code, module_global: &str, name: &str) {
    code.write_new_str(name);
    code.write_ldgbl(module_global);
    code.write_get_prop(true);
}

// ── Message passing ─────────────────────────────────────────────────────

#[test]
fn echo_round_trip() {
    let mut code = module_with_process();

    // echo: msg = receive(); send(msg[0], msg[1])
    let echo = code.add_function("echo");
    {
        let f = code.func_mut(echo);
        f.write_new_str("receive");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_call(1);
        f.write_stloc("msg");

        f.write_new_str("send");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_new_str("at");
        f.write_ldloc("msg");
        f.write_get_prop(true);
        f.write_new_num(0.0);
        f.write_call(2);
        f.write_new_str("at");
        f.write_ldloc("msg");
        f.write_get_prop(true);
        f.write_new_num(1.0);
        f.write_call(2);
        f.write_call(3);
        f.write_ret();
    }
    code.write_new_func(echo);
    code.write_stgbl("echo");

    // pid = process.create(echo)
    write_method(&mut code, "process", "create");
    code.write_ldgbl("echo");
    code.write_call(2);
    code.write_stgbl("pid");

    // me = process.id()
    write_method(&mut code, "process", "id");
    code.write_call(1);
    code.write_stgbl("me");

    // process.send(pid, [me, "hi"])
    write_method(&mut code, "process", "send");
    code.write_ldgbl("pid");
    code.write_new_str("hi");
    code.write_ldgbl("me");
    code.write_new_arr(2);
    code.write_call(3);
    code.write_stgbl("delivered");

    // reply = process.receive()
    write_method(&mut code, "process", "receive");
    code.write_call(1);
    code.write_stgbl("reply");

    let (vm, pid) = boot(code, 2);
    assert!(global_bool(&vm, pid, "delivered"));
    assert_eq!(global_string(&vm, pid, "reply"), "hi");
    assert_eq!(vm.uncaught_exception(pid), None);
    vm.stop();
}

#[test]
fn sends_from_one_process_arrive_in_order() {
    let mut code = module_with_process();

    // burst(parent): send 1, 2, 3 to parent
    let burst = code.add_function("burst");
    {
        let f = code.func_mut(burst);
        f.declare_local("parent");
        for n in [1.0, 2.0, 3.0] {
            f.write_new_str("send");
            f.write_ldgbl("process");
            f.write_get_prop(true);
            f.write_ldloc("parent");
            f.write_new_num(n);
            f.write_call(3);
            f.write_stloc("ignored");
        }
        f.write_null();
        f.write_ret();
    }
    code.write_new_func(burst);
    code.write_stgbl("burst");

    write_method(&mut code, "process", "id");
    code.write_call(1);
    code.write_stgbl("me");

    write_method(&mut code, "process", "create");
    code.write_ldgbl("burst");
    code.write_ldgbl("me");
    code.write_call(3);
    code.write_stgbl("child");

    for name in ["first", "second", "third"] {
        write_method(&mut code, "process", "receive");
        code.write_call(1);
        code.write_stgbl(name);
    }

    let (vm, pid) = boot(code, 2);
    assert_eq!(global_number(&vm, pid, "first"), 1.0);
    assert_eq!(global_number(&vm, pid, "second"), 2.0);
    assert_eq!(global_number(&vm, pid, "third"), 3.0);
    vm.stop();
}

// ── Join and state ──────────────────────────────────────────────────────

#[test]
fn join_waits_for_termination() {
    let mut code = module_with_process();

    // worker: sleep a beat, then return
    let worker = code.add_function("worker");
    {
        let f = code.func_mut(worker);
        f.write_new_str("sleep");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_new_num(0.05);
        f.write_call(2);
        f.write_ret();
    }
    code.write_new_func(worker);
    code.write_stgbl("worker");

    write_method(&mut code, "process", "create");
    code.write_ldgbl("worker");
    code.write_call(2);
    code.write_stgbl("child");

    write_method(&mut code, "process", "join");
    code.write_ldgbl("child");
    code.write_call(2);
    code.write_stgbl("joined");

    write_method(&mut code, "process", "state");
    code.write_ldgbl("child");
    code.write_call(2);
    code.write_stgbl("childstate");

    let (vm, pid) = boot(code, 2);
    assert_eq!(global_string(&vm, pid, "childstate"), "terminated");
    vm.stop();
}

#[test]
fn state_of_unknown_pid_is_unknown() {
    let mut code = module_with_process();
    write_method(&mut code, "process", "state");
    code.write_new_num(999999.0);
    code.write_call(2);
    code.write_stgbl("s");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_string(&vm, pid, "s"), "unknown");
    vm.stop();
}

// ── Fairness ────────────────────────────────────────────────────────────

#[test]
fn four_producers_all_make_progress() {
    let mut code = module_with_process();

    // producer(parent): send own id 10 times
    let producer = code.add_function("producer");
    {
        let f = code.func_mut(producer);
        f.declare_local("parent");
        f.write_new_num(0.0);
        f.write_stloc("i");
        let top = f.create_label();
        let done = f.create_label();
        f.bind_label(top);
        f.write_ldloc("i");
        f.write_new_num(10.0);
        f.write_lt();
        f.write_jmp_false(done);
        f.write_new_str("send");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_ldloc("parent");
        f.write_new_str("id");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_call(1);
        f.write_call(3);
        f.write_stloc("ignored");
        f.write_ldloc("i");
        f.write_new_num(1.0);
        f.write_add();
        f.write_stloc("i");
        f.write_jmp(top);
        f.bind_label(done);
        f.write_null();
        f.write_ret();
    }
    code.write_new_func(producer);
    code.write_stgbl("producer");

    write_method(&mut code, "process", "id");
    code.write_call(1);
    code.write_stgbl("me");

    for slot in ["p1", "p2", "p3", "p4"] {
        write_method(&mut code, "process", "create");
        code.write_ldgbl("producer");
        code.write_ldgbl("me");
        code.write_call(3);
        code.write_stgbl(slot);
    }

    // Receive all 40 messages, tracking how many came from each child.
    code.write_new_arr(0);
    code.write_stgbl("senders");
    code.write_new_num(0.0);
    code.write_stgbl("count");
    let top = code.create_label();
    let done = code.create_label();
    code.bind_label(top);
    code.write_ldgbl("count");
    code.write_new_num(40.0);
    code.write_lt();
    code.write_jmp_false(done);
    code.write_new_str("push");
    code.write_ldgbl("senders");
    code.write_get_prop(true);
    write_method(&mut code, "process", "receive");
    code.write_call(1);
    code.write_call(2);
    code.write_stgbl("ignored");
    code.write_ldgbl("count");
    code.write_new_num(1.0);
    code.write_add();
    code.write_stgbl("count");
    code.write_jmp(top);
    code.bind_label(done);

    let (vm, pid) = boot(code, 4);
    assert_eq!(global_number(&vm, pid, "count"), 40.0);
    assert_eq!(global_array_len(&vm, pid, "senders"), 40);

    // Every producer pid appears exactly ten times.
    let handle = vm.process(pid).unwrap();
    let core = handle.core.lock();
    let module = core.registry.get("main").unwrap();
    let senders = core.heap.resolve(module, "senders").unwrap();
    let elems = match &core.heap.get(senders).payload {
        beryl::object::Payload::Array(elems) => elems.clone(),
        other => panic!("senders is not an array: {:?}", other),
    };
    let mut counts = std::collections::HashMap::new();
    for e in elems {
        match core.heap.get(e).payload {
            beryl::object::Payload::Number(n) => *counts.entry(n as u32).or_insert(0) += 1,
            ref other => panic!("sender entry is not a number: {:?}", other),
        }
    }
    assert_eq!(counts.len(), 4, "all four producers sent: {:?}", counts);
    assert!(counts.values().all(|&c| c == 10), "uneven: {:?}", counts);
    drop(core);
    vm.stop();
}

// ── Module identity across messages ─────────────────────────────────────

#[test]
fn sent_functions_share_the_receivers_canonical_globals_module() {
    let mut code = module_with_process();

    // setter: writes flag = 42 into its defining module's globals
    let setter = code.add_function("setter");
    {
        let f = code.func_mut(setter);
        f.write_new_num(42.0);
        f.write_stgbl("flag");
        f.write_null();
        f.write_ret();
    }

    // worker: receives a function, calls it, then reads the global the
    // call wrote. The write is only visible if the received function's
    // globals resolved to the worker's own module object.
    let worker = code.add_function("worker");
    {
        let f = code.func_mut(worker);
        f.write_new_str("receive");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_call(1);
        f.write_stloc("g");
        f.write_ldloc("g");
        f.write_call(0);
        f.write_stloc("ignored");
        f.write_ldgbl("flag");
        f.write_stgbl("out");
        f.write_null();
        f.write_ret();
    }

    code.write_new_func(worker);
    code.write_stgbl("worker");
    code.write_new_func(setter);
    code.write_stgbl("setter");

    write_method(&mut code, "process", "create");
    code.write_ldgbl("worker");
    code.write_call(2);
    code.write_stgbl("child");

    write_method(&mut code, "process", "send");
    code.write_ldgbl("child");
    code.write_ldgbl("setter");
    code.write_call(3);
    code.write_stgbl("sent");

    write_method(&mut code, "process", "join");
    code.write_ldgbl("child");
    code.write_call(2);
    code.write_stgbl("joined");

    let (vm, pid) = boot(code, 2);
    assert!(global_bool(&vm, pid, "sent"));
    assert_eq!(vm.uncaught_exception(pid), None);

    let child_pid = global_number(&vm, pid, "child") as u32;
    assert_eq!(vm.state_str(child_pid), "terminated");
    assert_eq!(vm.uncaught_exception(child_pid), None);

    let child = vm.process(child_pid).unwrap();
    let core = child.core.lock();
    let module = core.registry.get("main").unwrap();
    let out = core.heap.resolve(module, "out").unwrap();
    match core.heap.get(out).payload {
        beryl::object::Payload::Number(n) => assert_eq!(n, 42.0),
        ref other => panic!("out is not a number: {:?}", other),
    }
    drop(core);
    vm.stop();
}

// ── Heap privacy ────────────────────────────────────────────────────────

#[test]
fn messages_are_deep_copied_between_heaps() {
    let mut code = module_with_process();

    // keeper: msg = receive(); msg.push(99); send(sender, msg.size())
    let keeper = code.add_function("keeper");
    {
        let f = code.func_mut(keeper);
        f.write_new_str("receive");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_call(1);
        f.write_stloc("msg");
        // arr = msg[1], sender = msg[0]
        f.write_new_str("at");
        f.write_ldloc("msg");
        f.write_get_prop(true);
        f.write_new_num(1.0);
        f.write_call(2);
        f.write_stloc("arr");
        f.write_new_str("push");
        f.write_ldloc("arr");
        f.write_get_prop(true);
        f.write_new_num(99.0);
        f.write_call(2);
        f.write_stloc("ignored");
        f.write_new_str("send");
        f.write_ldgbl("process");
        f.write_get_prop(true);
        f.write_new_str("at");
        f.write_ldloc("msg");
        f.write_get_prop(true);
        f.write_new_num(0.0);
        f.write_call(2);
        f.write_new_str("size");
        f.write_ldloc("arr");
        f.write_get_prop(true);
        f.write_call(1);
        f.write_call(3);
        f.write_ret();
    }
    code.write_new_func(keeper);
    code.write_stgbl("keeper");

    write_method(&mut code, "process", "create");
    code.write_ldgbl("keeper");
    code.write_call(2);
    code.write_stgbl("pid");

    write_method(&mut code, "process", "id");
    code.write_call(1);
    code.write_stgbl("me");

    // shared = [1, 2]
    code.write_new_num(2.0);
    code.write_new_num(1.0);
    code.write_new_arr(2);
    code.write_stgbl("shared");

    write_method(&mut code, "process", "send");
    code.write_ldgbl("pid");
    code.write_ldgbl("shared");
    code.write_ldgbl("me");
    code.write_new_arr(2);
    code.write_call(3);
    code.write_stgbl("delivered");

    write_method(&mut code, "process", "receive");
    code.write_call(1);
    code.write_stgbl("childsize");

    // local copy is untouched by the child's mutation
    code.write_new_str("size");
    code.write_ldgbl("shared");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("localsize");

    let (vm, pid) = boot(code, 2);
    assert_eq!(global_number(&vm, pid, "childsize"), 3.0);
    assert_eq!(global_number(&vm, pid, "localsize"), 2.0);
    assert_eq!(vm.uncaught_exception(pid), None);
    vm.stop();
}

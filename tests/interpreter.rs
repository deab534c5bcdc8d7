//! End-to-end interpreter scenarios driven through real bytecode on a
//! live machine: recursion, prototype chaining, cloning, operators,
//! object construction, and the exception paths.

mod common;

use beryl::code::Code;
use beryl::heap::INITIAL_GC_THRESHOLD;
use common::*;

// ── Recursion ───────────────────────────────────────────────────────────

fn fib_module() -> Code {
    let mut code = Code::new("main");
    let fib = code.add_function("fib");
    {
        let f = code.func_mut(fib);
        f.declare_local("n");
        let recurse = f.create_label();
        f.write_ldloc("n");
        f.write_new_num(2.0);
        f.write_lt();
        f.write_jmp_false(recurse);
        f.write_ldloc("n");
        f.write_ret();
        f.bind_label(recurse);
        f.write_ldgbl("fib");
        f.write_ldloc("n");
        f.write_new_num(1.0);
        f.write_sub();
        f.write_call(1);
        f.write_ldgbl("fib");
        f.write_ldloc("n");
        f.write_new_num(2.0);
        f.write_sub();
        f.write_call(1);
        f.write_add();
        f.write_ret();
    }
    code.write_new_func(fib);
    code.write_stgbl("fib");
    code.write_ldgbl("fib");
    code.write_new_num(10.0);
    code.write_call(1);
    code.write_stgbl("result");
    code.write_ldgbl("result");
    code.write_print();
    code
}

#[test]
fn fibonacci_recursion() {
    let (vm, pid) = boot(fib_module(), 2);
    assert_eq!(global_number(&vm, pid, "result"), 55.0);
    assert_eq!(vm.state_str(pid), "terminated");
    assert_eq!(vm.uncaught_exception(pid), None);
    vm.stop();
}

// ── Prototype chaining ──────────────────────────────────────────────────

#[test]
fn property_lookup_walks_the_parent_chain() {
    let mut code = Code::new("main");
    // A = object with x = 1
    code.write_new_num(1.0);
    code.write_new_str("x");
    code.write_new_obj(false, 1);
    code.write_stgbl("A");
    // B clones A
    code.write_ldgbl("A");
    code.write_new_obj(true, 0);
    code.write_stgbl("B");
    // result = B.x
    code.write_new_str("x");
    code.write_ldgbl("B");
    code.write_get_prop(false);
    code.write_stgbl("result");
    // parent = B's parent (identity-equal to A)
    code.write_ldgbl("B");
    code.write_get_parent();
    code.write_stgbl("parent");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "result"), 1.0);
    assert_eq!(
        global_ref(&vm, pid, "parent"),
        global_ref(&vm, pid, "A")
    );
    vm.stop();
}

#[test]
fn has_prop_follows_the_chain() {
    let mut code = Code::new("main");
    code.write_new_num(1.0);
    code.write_new_str("x");
    code.write_new_obj(false, 1);
    code.write_stgbl("A");
    code.write_ldgbl("A");
    code.write_new_obj(true, 0);
    code.write_stgbl("B");
    code.write_new_str("x");
    code.write_ldgbl("B");
    code.write_has_prop(false);
    code.write_stgbl("inherited");
    code.write_new_str("y");
    code.write_ldgbl("B");
    code.write_has_prop(false);
    code.write_stgbl("missing");

    let (vm, pid) = boot(code, 1);
    assert!(global_bool(&vm, pid, "inherited"));
    assert!(!global_bool(&vm, pid, "missing"));
    vm.stop();
}

// ── Cloning ─────────────────────────────────────────────────────────────

#[test]
fn array_clone_is_independent_of_the_source() {
    let mut code = Code::new("main");
    // a = [1, 2, 3]
    code.write_new_num(3.0);
    code.write_new_num(2.0);
    code.write_new_num(1.0);
    code.write_new_arr(3);
    code.write_stgbl("a");
    // b = a.__clone__()
    code.write_new_str("__clone__");
    code.write_ldgbl("a");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("b");
    // b.push(4)
    code.write_new_str("push");
    code.write_ldgbl("b");
    code.write_get_prop(true);
    code.write_new_num(4.0);
    code.write_call(2);
    code.write_stgbl("ignored");
    // sizes
    code.write_new_str("size");
    code.write_ldgbl("a");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("asize");
    code.write_new_str("size");
    code.write_ldgbl("b");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("bsize");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "asize"), 3.0);
    assert_eq!(global_number(&vm, pid, "bsize"), 4.0);
    vm.stop();
}

#[test]
fn cloning_a_singleton_boolean_returns_the_singleton() {
    let mut code = Code::new("main");
    code.write_new_str("__clone__");
    code.write_new_boolean(true);
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("c");
    code.write_new_boolean(true);
    code.write_stgbl("t");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_ref(&vm, pid, "c"), global_ref(&vm, pid, "t"));
    assert!(global_bool(&vm, pid, "c"));
    vm.stop();
}

// ── Operators ───────────────────────────────────────────────────────────

#[test]
fn arithmetic_comparison_and_bitwise() {
    let mut code = Code::new("main");
    code.write_new_num(7.0);
    code.write_new_num(3.0);
    code.write_sub();
    code.write_stgbl("diff");
    code.write_new_num(6.0);
    code.write_new_num(3.0);
    code.write_bit_and();
    code.write_stgbl("anded");
    code.write_new_num(1.0);
    code.write_new_num(4.0);
    code.write_bit_shl();
    code.write_stgbl("shifted");
    code.write_new_num(2.0);
    code.write_new_num(5.0);
    code.write_lte();
    code.write_stgbl("ordered");
    code.write_new_num(9.0);
    code.write_neg();
    code.write_stgbl("negated");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "diff"), 4.0);
    assert_eq!(global_number(&vm, pid, "anded"), 2.0);
    assert_eq!(global_number(&vm, pid, "shifted"), 16.0);
    assert!(global_bool(&vm, pid, "ordered"));
    assert_eq!(global_number(&vm, pid, "negated"), -9.0);
    vm.stop();
}

#[test]
fn inplace_add_mutates_and_returns_the_receiver() {
    let mut code = Code::new("main");
    code.write_new_num(5.0);
    code.write_stgbl("a");
    code.write_ldgbl("a");
    code.write_new_num(3.0);
    code.write_iadd();
    code.write_stgbl("b");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "a"), 8.0);
    assert_eq!(global_ref(&vm, pid, "a"), global_ref(&vm, pid, "b"));
    vm.stop();
}

#[test]
fn string_concatenation_and_comparison() {
    let mut code = Code::new("main");
    code.write_new_str("foo");
    code.write_new_str("bar");
    code.write_add();
    code.write_stgbl("joined");
    code.write_new_str("abc");
    code.write_new_str("abd");
    code.write_lt();
    code.write_stgbl("ordered");
    code.write_new_str("same");
    code.write_new_str("same");
    code.write_eq();
    code.write_stgbl("equal");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_string(&vm, pid, "joined"), "foobar");
    assert!(global_bool(&vm, pid, "ordered"));
    assert!(global_bool(&vm, pid, "equal"));
    vm.stop();
}

#[test]
fn loops_accumulate_through_jumps() {
    let mut code = Code::new("main");
    code.write_new_num(0.0);
    code.write_stgbl("total");
    code.write_new_num(0.0);
    code.write_stgbl("i");
    let top = code.create_label();
    let done = code.create_label();
    code.bind_label(top);
    code.write_ldgbl("i");
    code.write_new_num(10.0);
    code.write_lt();
    code.write_jmp_false(done);
    code.write_ldgbl("total");
    code.write_ldgbl("i");
    code.write_add();
    code.write_stgbl("total");
    code.write_ldgbl("i");
    code.write_new_num(1.0);
    code.write_add();
    code.write_stgbl("i");
    code.write_jmp(top);
    code.bind_label(done);

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "total"), 45.0);
    vm.stop();
}

#[test]
fn str_opcode_renders_values() {
    let mut code = Code::new("main");
    code.write_new_num(55.0);
    code.write_str();
    code.write_stgbl("rendered");
    code.write_new_num(2.0);
    code.write_new_num(1.0);
    code.write_new_arr(2);
    code.write_str();
    code.write_stgbl("arr");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_string(&vm, pid, "rendered"), "55");
    assert_eq!(global_string(&vm, pid, "arr"), "[1,2]");
    vm.stop();
}

// ── Calls and construction ──────────────────────────────────────────────

#[test]
fn call_magic_makes_objects_callable() {
    let mut code = Code::new("main");
    let doubler = code.add_function("doubler");
    {
        let f = code.func_mut(doubler);
        f.declare_local("x");
        f.write_ldloc("x");
        f.write_new_num(2.0);
        f.write_mul();
        f.write_ret();
    }
    code.write_new_func(doubler);
    code.write_new_str("__call__");
    code.write_new_obj(false, 1);
    code.write_stgbl("callable");
    code.write_ldgbl("callable");
    code.write_new_num(21.0);
    code.write_call(1);
    code.write_stgbl("result");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "result"), 42.0);
    vm.stop();
}

#[test]
fn init_runs_the_constructor_and_preserves_the_receiver() {
    let mut code = Code::new("main");
    let ctor = code.add_function("ctor");
    {
        let f = code.func_mut(ctor);
        f.declare_local("self");
        f.declare_local("v");
        f.write_ldloc("self");
        f.write_new_str("x");
        f.write_ldloc("v");
        f.write_set_prop(false);
        f.write_null();
        f.write_ret();
    }
    code.write_new_func(ctor);
    code.write_new_str("__init__");
    code.write_new_obj(false, 1);
    code.write_stgbl("Proto");

    code.write_new_num(7.0);
    code.write_ldgbl("Proto");
    code.write_new_obj(true, 0);
    code.write_init(1);
    code.write_stgbl("inst");

    code.write_new_str("x");
    code.write_ldgbl("inst");
    code.write_get_prop(false);
    code.write_stgbl("result");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "result"), 7.0);
    vm.stop();
}

#[test]
fn iteration_protocol_over_arrays() {
    let mut code = Code::new("main");
    // arr = [10, 20, 30]; total = sum via __iter__/__done__/__cur__/__next__
    code.write_new_num(30.0);
    code.write_new_num(20.0);
    code.write_new_num(10.0);
    code.write_new_arr(3);
    code.write_stgbl("arr");
    code.write_new_str("iter");
    code.write_ldgbl("arr");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("it");
    code.write_new_num(0.0);
    code.write_stgbl("total");

    let top = code.create_label();
    let done = code.create_label();
    code.bind_label(top);
    code.write_new_str("__done__");
    code.write_ldgbl("it");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_jmp_true(done);
    code.write_ldgbl("total");
    code.write_new_str("__cur__");
    code.write_ldgbl("it");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_add();
    code.write_stgbl("total");
    code.write_new_str("__next__");
    code.write_ldgbl("it");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("it");
    code.write_jmp(top);
    code.bind_label(done);

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_number(&vm, pid, "total"), 60.0);
    vm.stop();
}

// ── Exceptions ──────────────────────────────────────────────────────────

#[test]
fn unknown_global_terminates_with_a_name_error() {
    let mut code = Code::new("main");
    code.write_ldgbl("missing");
    code.write_stgbl("x");

    let (vm, pid) = boot(code, 1);
    assert_eq!(
        vm.uncaught_exception(pid),
        Some("no such variable: missing".to_string())
    );
    assert_eq!(vm.state_str(pid), "terminated");
    vm.stop();
}

#[test]
fn missing_property_raises() {
    let mut code = Code::new("main");
    code.write_new_obj(false, 0);
    code.write_stgbl("o");
    code.write_new_str("ghost");
    code.write_ldgbl("o");
    code.write_get_prop(false);
    code.write_stgbl("x");

    let (vm, pid) = boot(code, 1);
    assert_eq!(
        vm.uncaught_exception(pid),
        Some("no such property: ghost".to_string())
    );
    vm.stop();
}

#[test]
fn division_by_zero_is_a_domain_error() {
    let mut code = Code::new("main");
    code.write_new_num(1.0);
    code.write_new_num(0.0);
    code.write_div();
    code.write_stgbl("x");

    let (vm, pid) = boot(code, 1);
    assert_eq!(
        vm.uncaught_exception(pid),
        Some("division by zero".to_string())
    );
    vm.stop();
}

#[test]
fn pop_on_empty_array_is_a_domain_error() {
    let mut code = Code::new("main");
    code.write_new_arr(0);
    code.write_stgbl("a");
    code.write_new_str("pop");
    code.write_ldgbl("a");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("x");

    let (vm, pid) = boot(code, 1);
    assert_eq!(
        vm.uncaught_exception(pid),
        Some("pop from empty array".to_string())
    );
    vm.stop();
}

#[test]
fn runaway_recursion_overflows_the_call_stack() {
    let mut code = Code::new("main");
    let f = code.add_function("f");
    {
        let body = code.func_mut(f);
        body.write_ldgbl("f");
        body.write_call(0);
        body.write_ret();
    }
    code.write_new_func(f);
    code.write_stgbl("f");
    code.write_ldgbl("f");
    code.write_call(0);
    code.write_stgbl("x");

    let (vm, pid) = boot(code, 1);
    assert_eq!(vm.uncaught_exception(pid), Some("stack overflow".to_string()));
    vm.stop();
}

#[test]
fn null_refuses_property_writes() {
    let mut code = Code::new("main");
    code.write_null();
    code.write_new_str("x");
    code.write_new_num(1.0);
    code.write_set_prop(false);

    let (vm, pid) = boot(code, 1);
    assert_eq!(
        vm.uncaught_exception(pid),
        Some("could not set property: x".to_string())
    );
    vm.stop();
}

#[test]
fn import_of_unknown_module_is_an_import_error() {
    let mut code = Code::new("main");
    code.write_import("nosuch");
    code.write_stgbl("m");

    let (vm, pid) = boot(code, 1);
    assert_eq!(
        vm.uncaught_exception(pid),
        Some("no such module: nosuch".to_string())
    );
    vm.stop();
}

// ── GC under program control ────────────────────────────────────────────

#[test]
fn ephemeral_strings_are_collected_while_survivors_stay() {
    let mut code = Code::new("main");
    code.write_import("gc");
    code.write_stgbl("gc");
    code.write_new_arr(0);
    code.write_stgbl("keep");
    code.write_new_num(0.0);
    code.write_stgbl("i");

    let top = code.create_label();
    let skip = code.create_label();
    let done = code.create_label();
    code.bind_label(top);
    code.write_ldgbl("i");
    code.write_new_num(5000.0);
    code.write_lt();
    code.write_jmp_false(done);
    // s = str(i)
    code.write_ldgbl("i");
    code.write_str();
    code.write_stgbl("s");
    // every 100th survives in keep
    code.write_ldgbl("i");
    code.write_new_num(100.0);
    code.write_mod();
    code.write_new_num(0.0);
    code.write_eq();
    code.write_jmp_false(skip);
    code.write_new_str("push");
    code.write_ldgbl("keep");
    code.write_get_prop(true);
    code.write_ldgbl("s");
    code.write_call(2);
    code.write_stgbl("ignored");
    code.bind_label(skip);
    code.write_ldgbl("i");
    code.write_new_num(1.0);
    code.write_add();
    code.write_stgbl("i");
    code.write_jmp(top);
    code.bind_label(done);

    code.write_new_str("collect");
    code.write_ldgbl("gc");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("freed");
    code.write_new_str("threshold");
    code.write_ldgbl("gc");
    code.write_get_prop(true);
    code.write_call(1);
    code.write_stgbl("threshold");

    let (vm, pid) = boot(code, 1);
    assert_eq!(global_array_len(&vm, pid, "keep"), 50);
    assert_eq!(global_string_at(&vm, pid, "keep", 0), "0");
    assert_eq!(global_string_at(&vm, pid, "keep", 49), "4900");
    // Thousands of dead strings went through the heap; the threshold grew
    // past its initial value and the live set stayed bounded.
    assert!(global_number(&vm, pid, "threshold") > INITIAL_GC_THRESHOLD as f64);
    let handle = vm.process(pid).unwrap();
    let live = handle.core.lock().heap.live();
    assert!(live < 1000, "live set did not stay bounded: {}", live);
    vm.stop();
}

fn global_string_at(vm: &beryl::vm::Vm, pid: beryl::process::Pid, name: &str, index: usize) -> String {
    let handle = vm.process(pid).unwrap();
    let core = handle.core.lock();
    let module = core.registry.get("main").unwrap();
    let arr = core.heap.resolve(module, name).unwrap();
    match &core.heap.get(arr).payload {
        beryl::object::Payload::Array(elems) => {
            match &core.heap.get(elems[index]).payload {
                beryl::object::Payload::Str(s) => s.clone(),
                other => panic!("element {} is not a string: {:?}", index, other),
            }
        }
        other => panic!("'{}' is not an array: {:?}", name, other),
    }
}

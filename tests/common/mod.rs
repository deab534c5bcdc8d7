#![allow(dead_code)]

use std::sync::Arc;

use beryl::code::Code;
use beryl::object::{Payload, Ref};
use beryl::process::Pid;
use beryl::vm::Vm;

/// Register `code` as the `main` module, run it to completion on a live
/// machine, and hand back the machine for inspection.
pub fn boot(code: Code, workers: usize) -> (Arc<Vm>, Pid) {
    let vm = Vm::new(std::env::temp_dir(), workers);
    vm.code_cache().insert("main", Arc::new(code));
    vm.start();
    let pid = vm.spawn_entry("main").expect("entry module spawns");
    vm.join(pid);
    (vm, pid)
}

pub fn global_payload(vm: &Vm, pid: Pid, name: &str) -> Option<Payload> {
    let handle = vm.process(pid)?;
    let core = handle.core.lock();
    let module = core.registry.get("main")?;
    let value = core.heap.resolve(module, name)?;
    Some(core.heap.get(value).payload.clone())
}

pub fn global_ref(vm: &Vm, pid: Pid, name: &str) -> Option<Ref> {
    let handle = vm.process(pid)?;
    let core = handle.core.lock();
    let module = core.registry.get("main")?;
    core.heap.resolve(module, name)
}

pub fn global_number(vm: &Vm, pid: Pid, name: &str) -> f64 {
    match global_payload(vm, pid, name) {
        Some(Payload::Number(n)) => n,
        other => panic!("global '{}' is not a number: {:?}", name, other),
    }
}

pub fn global_string(vm: &Vm, pid: Pid, name: &str) -> String {
    match global_payload(vm, pid, name) {
        Some(Payload::Str(s)) => s,
        other => panic!("global '{}' is not a string: {:?}", name, other),
    }
}

pub fn global_bool(vm: &Vm, pid: Pid, name: &str) -> bool {
    match global_payload(vm, pid, name) {
        Some(Payload::Boolean(b)) => b,
        other => panic!("global '{}' is not a boolean: {:?}", name, other),
    }
}

pub fn global_array_len(vm: &Vm, pid: Pid, name: &str) -> usize {
    match global_payload(vm, pid, name) {
        Some(Payload::Array(elems)) => elems.len(),
        other => panic!("global '{}' is not an array: {:?}", name, other),
    }
}

//! Compiled code units.
//!
//! A [`Code`] is produced by the external compiler (or by tests through the
//! writer API) and is read-only once execution starts. It owns the
//! instruction vector, the number and string constant pools, nested
//! function codes, the local name table, the import name table, and a
//! module-wide global name table shared by every nested code.
//!
//! Jump targets are resolved while writing: `create_label` hands out a
//! label id, `bind_label` pins it to the current instruction index and
//! rewrites any jump that referenced the label before it was bound. After
//! building, the `jmp` family holds absolute instruction indices.
//!
//! Persisted artifacts use the `.emc` extension and are serialized with
//! serde; the layout is stable within a build.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::VmError;
use crate::opcode::Op;

/// File extension for persisted bytecode.
pub const CODE_EXTENSION: &str = "emc";

/// One instruction: an opcode plus up to two unsigned operands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    pub op: Op,
    pub args: [u64; 2],
}

impl Instr {
    pub fn new(op: Op) -> Self {
        Instr { op, args: [0, 0] }
    }

    pub fn one(op: Op, a: u64) -> Self {
        Instr { op, args: [a, 0] }
    }

    pub fn two(op: Op, a: u64, b: u64) -> Self {
        Instr { op, args: [a, b] }
    }

    pub fn arg(&self, i: usize) -> u64 {
        self.args[i]
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op.name())?;
        for i in 0..self.op.arg_count() {
            write!(f, " {}", self.args[i])?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LabelEntry {
    pos: usize,
    bound: bool,
    /// Instruction indices whose first operand still needs the final
    /// position once the label is bound.
    patches: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Code {
    label: String,
    id: usize,
    instructions: Vec<Instr>,
    functions: Vec<Arc<Code>>,
    function_labels: HashMap<String, usize>,
    num_constants: Vec<f64>,
    str_constants: Vec<String>,
    import_names: Vec<String>,
    labels: Vec<LabelEntry>,
    locals: Vec<String>,
    globals: Arc<RwLock<Vec<String>>>,
}

impl Code {
    /// A fresh top-level (module) code unit.
    pub fn new(label: impl Into<String>) -> Self {
        Code {
            label: label.into(),
            id: 0,
            instructions: Vec::new(),
            functions: Vec::new(),
            function_labels: HashMap::new(),
            num_constants: Vec::new(),
            str_constants: Vec::new(),
            import_names: Vec::new(),
            labels: Vec::new(),
            locals: Vec::new(),
            globals: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn child(label: String, id: usize, globals: Arc<RwLock<Vec<String>>>) -> Self {
        Code {
            label,
            id,
            instructions: Vec::new(),
            functions: Vec::new(),
            function_labels: HashMap::new(),
            num_constants: Vec::new(),
            str_constants: Vec::new(),
            import_names: Vec::new(),
            labels: Vec::new(),
            locals: Vec::new(),
            globals,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instr(&self, i: usize) -> Instr {
        self.instructions[i]
    }

    pub fn instructions(&self) -> &[Instr] {
        &self.instructions
    }

    // ── Labels ──────────────────────────────────────────────────────────

    pub fn create_label(&mut self) -> usize {
        self.labels.push(LabelEntry::default());
        self.labels.len() - 1
    }

    pub fn bind_label(&mut self, label: usize) {
        let pos = self.instructions.len();
        let entry = &mut self.labels[label];
        entry.pos = pos;
        entry.bound = true;
        for i in std::mem::take(&mut entry.patches) {
            self.instructions[i].args[0] = pos as u64;
        }
    }

    fn write_jump(&mut self, op: Op, label: usize) {
        let entry = &mut self.labels[label];
        if entry.bound {
            let pos = entry.pos as u64;
            self.write(Instr::one(op, pos));
        } else {
            entry.patches.push(self.instructions.len());
            self.write(Instr::one(op, 0));
        }
    }

    // ── Writer API ──────────────────────────────────────────────────────

    fn write(&mut self, instr: Instr) {
        self.instructions.push(instr);
    }

    pub fn write_nop(&mut self) {
        self.write(Instr::new(Op::Nop));
    }

    pub fn write_jmp(&mut self, label: usize) {
        self.write_jump(Op::Jmp, label);
    }

    pub fn write_jmp_true(&mut self, label: usize) {
        self.write_jump(Op::JmpTrue, label);
    }

    pub fn write_jmp_false(&mut self, label: usize) {
        self.write_jump(Op::JmpFalse, label);
    }

    pub fn write_neg(&mut self) {
        self.write(Instr::new(Op::Neg));
    }

    pub fn write_add(&mut self) {
        self.write(Instr::new(Op::Add));
    }

    pub fn write_sub(&mut self) {
        self.write(Instr::new(Op::Sub));
    }

    pub fn write_mul(&mut self) {
        self.write(Instr::new(Op::Mul));
    }

    pub fn write_div(&mut self) {
        self.write(Instr::new(Op::Div));
    }

    pub fn write_mod(&mut self) {
        self.write(Instr::new(Op::Mod));
    }

    pub fn write_iadd(&mut self) {
        self.write(Instr::new(Op::IAdd));
    }

    pub fn write_isub(&mut self) {
        self.write(Instr::new(Op::ISub));
    }

    pub fn write_imul(&mut self) {
        self.write(Instr::new(Op::IMul));
    }

    pub fn write_idiv(&mut self) {
        self.write(Instr::new(Op::IDiv));
    }

    pub fn write_imod(&mut self) {
        self.write(Instr::new(Op::IMod));
    }

    pub fn write_eq(&mut self) {
        self.write(Instr::new(Op::Eq));
    }

    pub fn write_neq(&mut self) {
        self.write(Instr::new(Op::Neq));
    }

    pub fn write_lt(&mut self) {
        self.write(Instr::new(Op::Lt));
    }

    pub fn write_gt(&mut self) {
        self.write(Instr::new(Op::Gt));
    }

    pub fn write_lte(&mut self) {
        self.write(Instr::new(Op::Lte));
    }

    pub fn write_gte(&mut self) {
        self.write(Instr::new(Op::Gte));
    }

    pub fn write_bit_not(&mut self) {
        self.write(Instr::new(Op::BitNot));
    }

    pub fn write_bit_or(&mut self) {
        self.write(Instr::new(Op::BitOr));
    }

    pub fn write_bit_xor(&mut self) {
        self.write(Instr::new(Op::BitXor));
    }

    pub fn write_bit_and(&mut self) {
        self.write(Instr::new(Op::BitAnd));
    }

    pub fn write_bit_shl(&mut self) {
        self.write(Instr::new(Op::BitShl));
    }

    pub fn write_bit_shr(&mut self) {
        self.write(Instr::new(Op::BitShr));
    }

    pub fn write_str(&mut self) {
        self.write(Instr::new(Op::Str));
    }

    pub fn write_boolean(&mut self) {
        self.write(Instr::new(Op::Boolean));
    }

    pub fn write_call(&mut self, num_args: usize) {
        self.write(Instr::one(Op::Call, num_args as u64));
    }

    pub fn write_ret(&mut self) {
        self.write(Instr::new(Op::Ret));
    }

    pub fn write_new_obj(&mut self, explicit_parent: bool, num_props: usize) {
        self.write(Instr::two(Op::NewObj, explicit_parent as u64, num_props as u64));
    }

    pub fn write_init(&mut self, num_args: usize) {
        self.write(Instr::one(Op::Init, num_args as u64));
    }

    /// Create an empty nested function code under `label` and return its id.
    /// Fill it through [`Code::func_mut`], then reference it with
    /// [`Code::write_new_func`].
    pub fn add_function(&mut self, label: &str) -> usize {
        let id = self.functions.len();
        let child = Code::child(label.to_string(), id, Arc::clone(&self.globals));
        self.functions.push(Arc::new(child));
        self.function_labels.insert(label.to_string(), id);
        id
    }

    /// Mutable access to a nested function while it is still being built.
    pub fn func_mut(&mut self, id: usize) -> &mut Code {
        Arc::get_mut(&mut self.functions[id]).expect("nested code is already shared")
    }

    pub fn write_new_func(&mut self, id: usize) {
        self.write(Instr::one(Op::NewFunc, id as u64));
    }

    pub fn write_new_num(&mut self, val: f64) -> usize {
        let id = self.intern_num(val);
        self.write(Instr::one(Op::NewNum, id as u64));
        id
    }

    pub fn write_new_str(&mut self, val: &str) -> usize {
        let id = self.intern_str(val);
        self.write(Instr::one(Op::NewStr, id as u64));
        id
    }

    pub fn write_new_boolean(&mut self, val: bool) {
        self.write(Instr::one(Op::NewBoolean, val as u64));
    }

    pub fn write_new_arr(&mut self, num_elems: usize) {
        self.write(Instr::one(Op::NewArr, num_elems as u64));
    }

    pub fn write_null(&mut self) {
        self.write(Instr::new(Op::Null));
    }

    pub fn write_get_prop(&mut self, push_self_back: bool) {
        self.write(Instr::one(Op::GetProp, push_self_back as u64));
    }

    pub fn write_has_prop(&mut self, push_self_back: bool) {
        self.write(Instr::one(Op::HasProp, push_self_back as u64));
    }

    pub fn write_set_prop(&mut self, push_self_back: bool) {
        self.write(Instr::one(Op::SetProp, push_self_back as u64));
    }

    pub fn write_get_parent(&mut self) {
        self.write(Instr::new(Op::GetParent));
    }

    pub fn write_ldloc(&mut self, name: &str) -> usize {
        let id = self.intern_local(name);
        self.write(Instr::one(Op::LdLoc, id as u64));
        id
    }

    pub fn write_stloc(&mut self, name: &str) -> usize {
        let id = self.intern_local(name);
        self.write(Instr::one(Op::StLoc, id as u64));
        id
    }

    pub fn write_ldgbl(&mut self, name: &str) -> usize {
        let id = self.intern_global(name);
        self.write(Instr::one(Op::LdGbl, id as u64));
        id
    }

    pub fn write_stgbl(&mut self, name: &str) -> usize {
        let id = self.intern_global(name);
        self.write(Instr::one(Op::StGbl, id as u64));
        id
    }

    pub fn write_print(&mut self) {
        self.write(Instr::new(Op::Print));
    }

    pub fn write_import(&mut self, name: &str) -> usize {
        let id = match self.import_names.iter().position(|n| n == name) {
            Some(i) => i,
            None => {
                self.import_names.push(name.to_string());
                self.import_names.len() - 1
            }
        };
        self.write(Instr::one(Op::Import, id as u64));
        id
    }

    // ── Pools and name tables ───────────────────────────────────────────

    fn intern_num(&mut self, val: f64) -> usize {
        match self.num_constants.iter().position(|&v| v == val) {
            Some(i) => i,
            None => {
                self.num_constants.push(val);
                self.num_constants.len() - 1
            }
        }
    }

    fn intern_str(&mut self, val: &str) -> usize {
        match self.str_constants.iter().position(|v| v == val) {
            Some(i) => i,
            None => {
                self.str_constants.push(val.to_string());
                self.str_constants.len() - 1
            }
        }
    }

    /// Reserve a local slot without emitting anything. The compiler uses
    /// this to pin parameters to the first slots, in declaration order.
    pub fn declare_local(&mut self, name: &str) -> usize {
        self.intern_local(name)
    }

    fn intern_local(&mut self, name: &str) -> usize {
        match self.locals.iter().position(|n| n == name) {
            Some(i) => i,
            None => {
                self.locals.push(name.to_string());
                self.locals.len() - 1
            }
        }
    }

    fn intern_global(&mut self, name: &str) -> usize {
        let mut globals = self.globals.write();
        match globals.iter().position(|n| n == name) {
            Some(i) => i,
            None => {
                globals.push(name.to_string());
                globals.len() - 1
            }
        }
    }

    pub fn num_constant(&self, id: usize) -> f64 {
        self.num_constants[id]
    }

    pub fn str_constant(&self, id: usize) -> &str {
        &self.str_constants[id]
    }

    pub fn local_name(&self, id: usize) -> &str {
        &self.locals[id]
    }

    pub fn local_names(&self) -> &[String] {
        &self.locals
    }

    pub fn num_locals(&self) -> usize {
        self.locals.len()
    }

    pub fn is_local_name(&self, name: &str) -> bool {
        self.locals.iter().any(|n| n == name)
    }

    pub fn global_name(&self, id: usize) -> String {
        self.globals.read()[id].clone()
    }

    pub fn num_globals(&self) -> usize {
        self.globals.read().len()
    }

    pub fn is_global_name(&self, name: &str) -> bool {
        self.globals.read().iter().any(|n| n == name)
    }

    pub fn import_name(&self, id: usize) -> &str {
        &self.import_names[id]
    }

    pub fn import_names(&self) -> &[String] {
        &self.import_names
    }

    pub fn func(&self, id: usize) -> Option<Arc<Code>> {
        self.functions.get(id).cloned()
    }

    pub fn func_by_label(&self, label: &str) -> Option<Arc<Code>> {
        self.function_labels.get(label).and_then(|&id| self.func(id))
    }

    pub fn func_index(&self, label: &str) -> Option<usize> {
        self.function_labels.get(label).copied()
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Path of the artifact for `module_name` under `base`, mapping dots to
    /// directory separators: `a.b` becomes `<base>/a/b.emc`.
    pub fn path_for_module(base: &Path, module_name: &str) -> PathBuf {
        let mut path = base.to_path_buf();
        for part in module_name.split('.') {
            path.push(part);
        }
        path.set_extension(CODE_EXTENSION);
        path
    }

    pub fn from_file(path: &Path) -> Result<Code, VmError> {
        let bytes = fs::read(path).map_err(|source| VmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| VmError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), VmError> {
        let bytes = serde_json::to_vec(self).expect("code serialization cannot fail");
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| VmError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, bytes).map_err(|source| VmError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    // ── Disassembly ─────────────────────────────────────────────────────

    fn render(&self, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        out.push_str(&format!("{}{} (id {}):\n", pad, self.label, self.id));
        for (i, instr) in self.instructions.iter().enumerate() {
            out.push_str(&format!("{}  {:4}  {}\n", pad, i, instr));
        }
        for func in &self.functions {
            func.render(depth + 1, out);
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(0, &mut out);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jumps_are_backpatched() {
        let mut code = Code::new("test");
        let end = code.create_label();
        code.write_new_boolean(true);
        code.write_jmp_true(end);
        code.write_nop();
        code.write_nop();
        code.bind_label(end);
        code.write_null();

        assert_eq!(code.instr(1).op, Op::JmpTrue);
        assert_eq!(code.instr(1).arg(0), 4);
    }

    #[test]
    fn backward_jumps_use_bound_position() {
        let mut code = Code::new("test");
        let top = code.create_label();
        code.write_nop();
        code.bind_label(top);
        code.write_nop();
        code.write_jmp(top);

        assert_eq!(code.instr(2).arg(0), 1);
    }

    #[test]
    fn constants_are_interned() {
        let mut code = Code::new("test");
        let a = code.write_new_num(1.5);
        let b = code.write_new_num(2.5);
        let c = code.write_new_num(1.5);
        assert_eq!(a, c);
        assert_ne!(a, b);

        let s1 = code.write_new_str("x");
        let s2 = code.write_new_str("x");
        assert_eq!(s1, s2);
    }

    #[test]
    fn nested_functions_share_the_global_table() {
        let mut code = Code::new("mod");
        code.write_ldgbl("a");
        let f = code.add_function("inner");
        code.func_mut(f).write_ldgbl("b");
        code.write_ldgbl("b");

        assert_eq!(code.global_name(0), "a");
        assert_eq!(code.global_name(1), "b");
        let inner = code.func(f).unwrap();
        assert_eq!(inner.global_name(1), "b");
        assert_eq!(inner.instr(0).arg(0), 1);
        assert!(code.func_by_label("inner").is_some());
        assert_eq!(code.func_index("inner"), Some(f));
    }

    #[test]
    fn serialization_round_trips() {
        let mut code = Code::new("mod");
        code.write_new_num(42.0);
        let f = code.add_function("f");
        code.func_mut(f).write_null();
        code.func_mut(f).write_ret();
        code.write_new_func(f);
        code.write_print();

        let json = serde_json::to_string(&code).unwrap();
        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), code.len());
        assert_eq!(back.num_constant(0), 42.0);
        assert_eq!(back.func(0).unwrap().label(), "f");
        for (a, b) in back.instructions().iter().zip(code.instructions()) {
            assert_eq!(a, b);
        }
    }
}

//! Module registries and the bytecode code cache.
//!
//! Three pieces with different scopes:
//!
//! * [`ModuleRegistry`] is per-process and guarantees at most one live
//!   module object per name. It also tracks modules whose top-level code
//!   is still executing, which is how cyclic imports are caught.
//! * The native-initializer registry is global: host code registers a
//!   callback per module name, run the first time a process imports it.
//! * [`CodeCache`] is machine-wide and memoizes `.emc` artifacts by module
//!   name, so processes importing the same module share one immutable
//!   [`Code`] while owning distinct module objects.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::code::Code;
use crate::errors::VmError;
use crate::interp::{Ctx, Fault};
use crate::object::Ref;

/// Initializer for a native module: allocates a fresh module object on the
/// importing process's heap, populates it, and returns it.
pub type NativeInit = fn(&mut Ctx<'_>) -> Result<Ref, Fault>;

static NATIVE_INITS: Lazy<DashMap<&'static str, NativeInit>> = Lazy::new(DashMap::new);

pub fn register_native_init(name: &'static str, init: NativeInit) {
    NATIVE_INITS.insert(name, init);
}

pub fn native_init(name: &str) -> Option<NativeInit> {
    NATIVE_INITS.get(name).map(|entry| *entry.value())
}

// ── Per-process registry ────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Ref>,
    loading: HashSet<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry::default()
    }

    pub fn add(&mut self, name: String, module: Ref) {
        self.modules.insert(name, module);
    }

    pub fn get(&self, name: &str) -> Option<Ref> {
        self.modules.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn mark_loading(&mut self, name: String) {
        self.loading.insert(name);
    }

    pub fn finish_loading(&mut self, name: &str) {
        self.loading.remove(name);
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.loading.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(|s| s.as_str())
    }

    /// Every registered module is a GC root.
    pub fn trace(&self, out: &mut Vec<Ref>) {
        out.extend(self.modules.values().copied());
    }
}

// ── Machine-wide code cache ─────────────────────────────────────────────

#[derive(Debug)]
pub struct CodeCache {
    base: PathBuf,
    cache: DashMap<String, Arc<Code>>,
}

impl CodeCache {
    pub fn new(base: PathBuf) -> Self {
        CodeCache {
            base,
            cache: DashMap::new(),
        }
    }

    /// Register an in-memory artifact under `name`, bypassing disk.
    pub fn insert(&self, name: &str, code: Arc<Code>) {
        self.cache.insert(name.to_string(), code);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Code>> {
        self.cache.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_or_load(&self, name: &str) -> Result<Arc<Code>, VmError> {
        if let Some(code) = self.get(name) {
            return Ok(code);
        }
        self.load(name)?;
        Ok(self.get(name).expect("module cached by load"))
    }

    fn load(&self, name: &str) -> Result<(), VmError> {
        let path = Code::path_for_module(&self.base, name);
        if !path.exists() {
            return Err(VmError::ModuleNotFound(name.to_string()));
        }
        let code = Arc::new(Code::from_file(&path)?);
        tracing::debug!(module = name, path = %path.display(), "loaded bytecode module");
        // Insert before chasing imports so mutually-importing modules
        // cannot loop the loader. The registry still rejects genuine
        // import cycles at execution time.
        self.cache.insert(name.to_string(), Arc::clone(&code));
        for import in code.import_names() {
            if native_init(import).is_some() || self.cache.contains_key(import.as_str()) {
                continue;
            }
            self.load(import)?;
        }
        Ok(())
    }
}

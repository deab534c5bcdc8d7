//! Cross-heap value transfer.
//!
//! Heaps are private to their process, so a value crossing a process
//! boundary (send, process.create) is detached into a [`Packet`]: a flat
//! node graph built with a clone cache, which preserves sharing and cycles
//! within one copy operation. Built-in prototypes and the canonical
//! singletons are recorded as markers instead of being copied, so the
//! rehydrated value reattaches to the receiving process's own prototype
//! table.
//!
//! Rehydration is two-phase: allocate a shell per node (scratch-rooted, so
//! a collection mid-rebuild cannot reap half-wired nodes), then wire
//! parents, properties, array elements, and function globals through the
//! node map. Modules coming out of a packet resolve against the
//! receiver's module registry: an unseen name allocates and registers a
//! fresh module object, a known name reuses the registered one, so every
//! transferred function's globals land on the single module object the
//! receiving process already sees.

use std::collections::HashMap;
use std::sync::Arc;

use crate::code::Code;
use crate::object::{FunctionPayload, ModulePayload, NativeFn, Payload, Ref};
use crate::process::ProcessCore;

/// Which built-in prototype a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoTag {
    Object,
    Number,
    Str,
    Boolean,
    Array,
    Exception,
    ArrayIterator,
}

#[derive(Debug, Clone)]
enum PacketPayload {
    Plain,
    Number(f64),
    Str(String),
    Boolean(bool),
    Exception(String),
    Array(Vec<u32>),
    Function { code: Arc<Code>, globals: u32 },
    Native(NativeFn),
    Module { name: String, code: Option<Arc<Code>> },
    NullSingleton,
    TrueSingleton,
    FalseSingleton,
    Proto(ProtoTag),
}

#[derive(Debug, Clone)]
struct PacketNode {
    parent: Option<u32>,
    props: Vec<(String, u32)>,
    payload: PacketPayload,
}

/// A detached value graph, independent of any heap.
#[derive(Debug, Clone)]
pub struct Packet {
    nodes: Vec<PacketNode>,
    roots: Vec<u32>,
}

impl Packet {
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }
}

// ── Detach ──────────────────────────────────────────────────────────────

struct Detacher<'a> {
    core: &'a ProcessCore,
    cache: HashMap<Ref, u32>,
    nodes: Vec<PacketNode>,
}

/// Deep-copy `roots` out of `core`'s heap into a heap-independent packet.
pub fn detach(core: &ProcessCore, roots: &[Ref]) -> Packet {
    let mut detacher = Detacher {
        core,
        cache: HashMap::new(),
        nodes: Vec::new(),
    };
    let roots = roots.iter().map(|r| detacher.visit(*r)).collect();
    Packet {
        nodes: detacher.nodes,
        roots,
    }
}

impl Detacher<'_> {
    fn visit(&mut self, r: Ref) -> u32 {
        if let Some(&idx) = self.cache.get(&r) {
            return idx;
        }

        let idx = self.nodes.len() as u32;
        self.nodes.push(PacketNode {
            parent: None,
            props: Vec::new(),
            payload: PacketPayload::Plain,
        });
        self.cache.insert(r, idx);

        if let Some(special) = self.special_payload(r) {
            self.nodes[idx as usize].payload = special;
            return idx;
        }

        let core = self.core;
        let obj = core.heap.get(r);
        let parent = obj.parent.map(|p| self.visit(p));
        let props = obj
            .props
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|(k, v)| (k, self.visit(v)))
            .collect();
        let payload = match &obj.payload {
            Payload::Plain => PacketPayload::Plain,
            Payload::Number(n) => PacketPayload::Number(*n),
            Payload::Str(s) => PacketPayload::Str(s.clone()),
            Payload::Boolean(b) => PacketPayload::Boolean(*b),
            Payload::Null => PacketPayload::NullSingleton,
            Payload::Exception(m) => PacketPayload::Exception(m.clone()),
            Payload::Array(elems) => {
                let elems = elems.clone();
                PacketPayload::Array(elems.into_iter().map(|e| self.visit(e)).collect())
            }
            Payload::Function(f) => PacketPayload::Function {
                code: Arc::clone(&f.code),
                globals: self.visit(f.globals),
            },
            Payload::Native(f) => PacketPayload::Native(*f),
            Payload::Module(m) => PacketPayload::Module {
                name: m.name.clone(),
                code: m.code.clone(),
            },
        };

        let node = &mut self.nodes[idx as usize];
        node.parent = parent;
        node.props = props;
        node.payload = payload;
        idx
    }

    fn special_payload(&self, r: Ref) -> Option<PacketPayload> {
        let protos = &self.core.protos;
        if r == protos.null {
            Some(PacketPayload::NullSingleton)
        } else if r == protos.bool_true {
            Some(PacketPayload::TrueSingleton)
        } else if r == protos.bool_false {
            Some(PacketPayload::FalseSingleton)
        } else {
            protos.tag_of(r).map(PacketPayload::Proto)
        }
    }
}

// ── Rehydrate ───────────────────────────────────────────────────────────

/// Materialize a packet inside `core`'s heap, returning one handle per
/// packet root.
///
/// Module nodes resolve against the receiver's registry before anything
/// else is wired: a name already registered (by an earlier message, a
/// spawn, or an import) maps to the canonical module object, and the
/// packet's snapshot of its contents is discarded. The registry keeps at
/// most one live module per name, and every transferred function ends up
/// with its globals pointing at the module other holders see.
pub fn rehydrate(core: &mut ProcessCore, packet: &Packet) -> Vec<Ref> {
    let mark = core.scratch_mark();
    let null = core.null();

    let mut map: Vec<Ref> = Vec::with_capacity(packet.nodes.len());
    // Nodes that resolved to an object the receiver already owns; their
    // contents are not overwritten in the wiring phase.
    let mut reused = vec![false; packet.nodes.len()];
    for (i, node) in packet.nodes.iter().enumerate() {
        let r = match &node.payload {
            PacketPayload::NullSingleton => core.null(),
            PacketPayload::TrueSingleton => core.boolean(true),
            PacketPayload::FalseSingleton => core.boolean(false),
            PacketPayload::Proto(tag) => core.protos.by_tag(*tag),
            PacketPayload::Plain => core.alloc(None, Payload::Plain),
            PacketPayload::Number(n) => core.alloc(None, Payload::Number(*n)),
            PacketPayload::Str(s) => core.alloc(None, Payload::Str(s.clone())),
            PacketPayload::Boolean(b) => core.alloc(None, Payload::Boolean(*b)),
            PacketPayload::Exception(m) => core.alloc(None, Payload::Exception(m.clone())),
            PacketPayload::Array(_) => core.alloc(None, Payload::Array(Vec::new())),
            PacketPayload::Function { code, .. } => core.alloc(
                None,
                Payload::Function(FunctionPayload {
                    code: Arc::clone(code),
                    globals: null,
                }),
            ),
            PacketPayload::Native(f) => core.alloc(None, Payload::Native(*f)),
            PacketPayload::Module { name, code } => match core.registry.get(name) {
                Some(existing) => {
                    reused[i] = true;
                    existing
                }
                None => {
                    let module = core.alloc(
                        None,
                        Payload::Module(ModulePayload {
                            name: name.clone(),
                            code: code.clone(),
                        }),
                    );
                    core.registry.add(name.clone(), module);
                    module
                }
            },
        };
        core.scratch_push(r);
        map.push(r);
    }

    for (i, node) in packet.nodes.iter().enumerate() {
        if reused[i] {
            continue;
        }
        if matches!(
            node.payload,
            PacketPayload::NullSingleton
                | PacketPayload::TrueSingleton
                | PacketPayload::FalseSingleton
                | PacketPayload::Proto(_)
        ) {
            continue;
        }
        let r = map[i];
        let obj = core.heap.get_mut(r);
        obj.parent = node.parent.map(|p| map[p as usize]);
        for (k, v) in &node.props {
            obj.props.insert(k.clone(), map[*v as usize]);
        }
        match (&mut obj.payload, &node.payload) {
            (Payload::Array(elems), PacketPayload::Array(src)) => {
                *elems = src.iter().map(|e| map[*e as usize]).collect();
            }
            (Payload::Function(f), PacketPayload::Function { globals, .. }) => {
                f.globals = map[*globals as usize];
            }
            _ => {}
        }
    }

    core.scratch_truncate(mark);
    packet.roots.iter().map(|i| map[*i as usize]).collect()
}

//! Built-in prototypes and their native methods.
//!
//! Every process owns one [`NativeProtos`] table: the root Object
//! prototype, the built-in variant prototypes chained off it, and the
//! canonical `true`/`false`/`null` singletons. Operators on built-ins are
//! ordinary magic-method properties holding native functions, so user
//! objects that chain off a built-in prototype inherit its behavior and
//! may shadow any piece of it.

use crate::heap::Heap;
use crate::interp::{call_sync, raise, stringify, Ctx, Fault};
use crate::magic::Magic;
use crate::message::ProtoTag;
use crate::object::{NativeFn, Object, Payload, Ref};
use crate::process::ProcessCore;

#[derive(Debug)]
pub struct NativeProtos {
    pub object: Ref,
    pub number: Ref,
    pub string: Ref,
    pub boolean: Ref,
    pub array: Ref,
    pub exception: Ref,
    pub array_iterator: Ref,
    pub bool_true: Ref,
    pub bool_false: Ref,
    pub null: Ref,
}

fn install_native(heap: &mut Heap, target: Ref, name: &str, f: NativeFn) {
    let func = heap.insert(Object::new(None, Payload::Native(f)));
    heap.set_property(target, name.to_string(), func);
}

impl NativeProtos {
    pub fn install(heap: &mut Heap) -> Self {
        let object = heap.insert(Object::new(None, Payload::Plain));
        let number = heap.insert(Object::new(Some(object), Payload::Number(0.0)));
        let string = heap.insert(Object::new(Some(object), Payload::Str(String::new())));
        let boolean = heap.insert(Object::new(Some(object), Payload::Boolean(false)));
        let array = heap.insert(Object::new(Some(object), Payload::Array(Vec::new())));
        let exception = heap.insert(Object::new(Some(object), Payload::Exception(String::new())));
        let array_iterator = heap.insert(Object::new(Some(object), Payload::Plain));
        let bool_true = heap.insert(Object::new(Some(boolean), Payload::Boolean(true)));
        let bool_false = heap.insert(Object::new(Some(boolean), Payload::Boolean(false)));
        let null = heap.insert(Object::new(None, Payload::Null));

        install_native(heap, object, Magic::Eq.name(), object_eq);
        install_native(heap, object, Magic::Neq.name(), object_neq);
        install_native(heap, object, Magic::Clone.name(), object_clone);

        install_native(heap, number, Magic::Neg.name(), number_neg);
        install_native(heap, number, Magic::Add.name(), number_add);
        install_native(heap, number, Magic::Sub.name(), number_sub);
        install_native(heap, number, Magic::Mul.name(), number_mul);
        install_native(heap, number, Magic::Div.name(), number_div);
        install_native(heap, number, Magic::Mod.name(), number_mod);
        install_native(heap, number, Magic::IAdd.name(), number_iadd);
        install_native(heap, number, Magic::ISub.name(), number_isub);
        install_native(heap, number, Magic::IMul.name(), number_imul);
        install_native(heap, number, Magic::IDiv.name(), number_idiv);
        install_native(heap, number, Magic::IMod.name(), number_imod);
        install_native(heap, number, Magic::Eq.name(), number_eq);
        install_native(heap, number, Magic::Neq.name(), number_neq);
        install_native(heap, number, Magic::Lt.name(), number_lt);
        install_native(heap, number, Magic::Gt.name(), number_gt);
        install_native(heap, number, Magic::Lte.name(), number_lte);
        install_native(heap, number, Magic::Gte.name(), number_gte);
        install_native(heap, number, Magic::BitNot.name(), number_bit_not);
        install_native(heap, number, Magic::BitOr.name(), number_bit_or);
        install_native(heap, number, Magic::BitXor.name(), number_bit_xor);
        install_native(heap, number, Magic::BitAnd.name(), number_bit_and);
        install_native(heap, number, Magic::BitShl.name(), number_bit_shl);
        install_native(heap, number, Magic::BitShr.name(), number_bit_shr);
        install_native(heap, number, Magic::Clone.name(), number_clone);

        install_native(heap, string, Magic::Add.name(), string_add);
        install_native(heap, string, Magic::Eq.name(), string_eq);
        install_native(heap, string, Magic::Neq.name(), string_neq);
        install_native(heap, string, Magic::Lt.name(), string_lt);
        install_native(heap, string, Magic::Gt.name(), string_gt);
        install_native(heap, string, Magic::Lte.name(), string_lte);
        install_native(heap, string, Magic::Gte.name(), string_gte);
        install_native(heap, string, Magic::Clone.name(), string_clone);
        install_native(heap, string, "len", string_len);
        install_native(heap, string, "empty", string_empty);
        install_native(heap, string, "at", string_at);
        install_native(heap, string, "front", string_front);
        install_native(heap, string, "back", string_back);
        install_native(heap, string, "find", string_find);
        install_native(heap, string, "substr", string_substr);

        install_native(heap, boolean, Magic::Eq.name(), boolean_eq);
        install_native(heap, boolean, Magic::Neq.name(), boolean_neq);
        install_native(heap, boolean, Magic::Clone.name(), boolean_clone);

        install_native(heap, array, Magic::Eq.name(), array_eq);
        install_native(heap, array, Magic::Neq.name(), array_neq);
        install_native(heap, array, Magic::Clone.name(), array_clone);
        install_native(heap, array, "at", array_at);
        install_native(heap, array, "front", array_front);
        install_native(heap, array, "back", array_back);
        install_native(heap, array, "empty", array_empty);
        install_native(heap, array, "size", array_size);
        install_native(heap, array, "clear", array_clear);
        install_native(heap, array, "push", array_push);
        install_native(heap, array, "pop", array_pop);
        install_native(heap, array, Magic::Iter.name(), array_iter);
        install_native(heap, array, "iter", array_iter);

        install_native(heap, exception, Magic::Clone.name(), exception_clone);

        install_native(heap, array_iterator, Magic::Cur.name(), iterator_cur);
        install_native(heap, array_iterator, Magic::Done.name(), iterator_done);
        install_native(heap, array_iterator, Magic::Next.name(), iterator_next);

        NativeProtos {
            object,
            number,
            string,
            boolean,
            array,
            exception,
            array_iterator,
            bool_true,
            bool_false,
            null,
        }
    }

    pub fn trace(&self, out: &mut Vec<Ref>) {
        out.extend([
            self.object,
            self.number,
            self.string,
            self.boolean,
            self.array,
            self.exception,
            self.array_iterator,
            self.bool_true,
            self.bool_false,
            self.null,
        ]);
    }

    pub fn tag_of(&self, r: Ref) -> Option<ProtoTag> {
        if r == self.object {
            Some(ProtoTag::Object)
        } else if r == self.number {
            Some(ProtoTag::Number)
        } else if r == self.string {
            Some(ProtoTag::Str)
        } else if r == self.boolean {
            Some(ProtoTag::Boolean)
        } else if r == self.array {
            Some(ProtoTag::Array)
        } else if r == self.exception {
            Some(ProtoTag::Exception)
        } else if r == self.array_iterator {
            Some(ProtoTag::ArrayIterator)
        } else {
            None
        }
    }

    pub fn by_tag(&self, tag: ProtoTag) -> Ref {
        match tag {
            ProtoTag::Object => self.object,
            ProtoTag::Number => self.number,
            ProtoTag::Str => self.string,
            ProtoTag::Boolean => self.boolean,
            ProtoTag::Array => self.array,
            ProtoTag::Exception => self.exception,
            ProtoTag::ArrayIterator => self.array_iterator,
        }
    }
}

// ── Shared helpers ──────────────────────────────────────────────────────

fn expect_args(ctx: &mut Ctx, args: &[Ref], total: usize, what: &str) -> Result<(), Fault> {
    if args.len() != total {
        return Err(raise(
            ctx.core,
            format!(
                "{} expects {} arguments, got {}",
                what,
                total.saturating_sub(1),
                args.len().saturating_sub(1)
            ),
        ));
    }
    Ok(())
}

pub(crate) fn number_of(core: &ProcessCore, r: Ref) -> Option<f64> {
    match core.heap.get(r).payload {
        Payload::Number(n) => Some(n),
        _ => None,
    }
}

pub(crate) fn string_of(core: &ProcessCore, r: Ref) -> Option<String> {
    match &core.heap.get(r).payload {
        Payload::Str(s) => Some(s.clone()),
        _ => None,
    }
}

fn array_of(core: &ProcessCore, r: Ref) -> Option<Vec<Ref>> {
    match &core.heap.get(r).payload {
        Payload::Array(elems) => Some(elems.clone()),
        _ => None,
    }
}

fn want_number(ctx: &mut Ctx, r: Ref, what: &str) -> Result<f64, Fault> {
    match number_of(ctx.core, r) {
        Some(n) => Ok(n),
        None => {
            let found = ctx.core.heap.get(r).type_name();
            Err(raise(ctx.core, format!("{} expects a number, got {}", what, found)))
        }
    }
}

fn want_string(ctx: &mut Ctx, r: Ref, what: &str) -> Result<String, Fault> {
    match string_of(ctx.core, r) {
        Some(s) => Ok(s),
        None => {
            let found = ctx.core.heap.get(r).type_name();
            Err(raise(ctx.core, format!("{} expects a string, got {}", what, found)))
        }
    }
}

fn want_array(ctx: &mut Ctx, r: Ref, what: &str) -> Result<Vec<Ref>, Fault> {
    match array_of(ctx.core, r) {
        Some(elems) => Ok(elems),
        None => {
            let found = ctx.core.heap.get(r).type_name();
            Err(raise(ctx.core, format!("{} expects an array, got {}", what, found)))
        }
    }
}

fn two_numbers(ctx: &mut Ctx, args: &[Ref], what: &str) -> Result<(f64, f64), Fault> {
    expect_args(ctx, args, 2, what)?;
    let lhs = want_number(ctx, args[0], what)?;
    let rhs = want_number(ctx, args[1], what)?;
    Ok((lhs, rhs))
}

/// In-place arithmetic mutates the receiver's value and returns it.
fn number_inplace(
    ctx: &mut Ctx,
    args: &[Ref],
    what: &str,
    apply: fn(f64, f64) -> f64,
) -> Result<Ref, Fault> {
    let (_, rhs) = two_numbers(ctx, args, what)?;
    match &mut ctx.core.heap.get_mut(args[0]).payload {
        Payload::Number(v) => {
            *v = apply(*v, rhs);
            Ok(args[0])
        }
        _ => Err(raise(ctx.core, format!("{} expects a number receiver", what))),
    }
}

// ── Object ──────────────────────────────────────────────────────────────

fn object_eq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__eq__")?;
    Ok(ctx.core.boolean(args[0] == args[1]))
}

fn object_neq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__neq__")?;
    Ok(ctx.core.boolean(args[0] != args[1]))
}

fn object_clone(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__clone__")?;
    Ok(ctx.core.alloc(Some(args[0]), Payload::Plain))
}

// ── Number ──────────────────────────────────────────────────────────────

fn number_neg(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__neg__")?;
    let v = want_number(ctx, args[0], "__neg__")?;
    Ok(ctx.core.alloc_number(-v))
}

fn number_add(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__add__")?;
    Ok(ctx.core.alloc_number(a + b))
}

fn number_sub(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__sub__")?;
    Ok(ctx.core.alloc_number(a - b))
}

fn number_mul(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__mul__")?;
    Ok(ctx.core.alloc_number(a * b))
}

fn number_div(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__div__")?;
    if b == 0.0 {
        return Err(raise(ctx.core, "division by zero"));
    }
    Ok(ctx.core.alloc_number(a / b))
}

fn number_mod(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__mod__")?;
    if b == 0.0 {
        return Err(raise(ctx.core, "division by zero"));
    }
    Ok(ctx.core.alloc_number(((a as i64) % (b as i64)) as f64))
}

fn number_iadd(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    number_inplace(ctx, args, "__iadd__", |a, b| a + b)
}

fn number_isub(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    number_inplace(ctx, args, "__isub__", |a, b| a - b)
}

fn number_imul(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    number_inplace(ctx, args, "__imul__", |a, b| a * b)
}

fn number_idiv(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (_, b) = two_numbers(ctx, args, "__idiv__")?;
    if b == 0.0 {
        return Err(raise(ctx.core, "division by zero"));
    }
    number_inplace(ctx, args, "__idiv__", |a, b| a / b)
}

fn number_imod(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (_, b) = two_numbers(ctx, args, "__imod__")?;
    if b == 0.0 {
        return Err(raise(ctx.core, "division by zero"));
    }
    number_inplace(ctx, args, "__imod__", |a, b| ((a as i64) % (b as i64)) as f64)
}

fn number_eq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__eq__")?;
    let lhs = want_number(ctx, args[0], "__eq__")?;
    let equal = number_of(ctx.core, args[1]).map(|rhs| lhs == rhs).unwrap_or(false);
    Ok(ctx.core.boolean(equal))
}

fn number_neq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__neq__")?;
    let lhs = want_number(ctx, args[0], "__neq__")?;
    let equal = number_of(ctx.core, args[1]).map(|rhs| lhs == rhs).unwrap_or(false);
    Ok(ctx.core.boolean(!equal))
}

fn number_lt(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__lt__")?;
    Ok(ctx.core.boolean(a < b))
}

fn number_gt(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__gt__")?;
    Ok(ctx.core.boolean(a > b))
}

fn number_lte(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__lte__")?;
    Ok(ctx.core.boolean(a <= b))
}

fn number_gte(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__gte__")?;
    Ok(ctx.core.boolean(a >= b))
}

fn number_bit_not(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__bit_not__")?;
    let v = want_number(ctx, args[0], "__bit_not__")?;
    Ok(ctx.core.alloc_number(!(v as i64) as f64))
}

fn number_bit_or(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__bit_or__")?;
    Ok(ctx.core.alloc_number(((a as i64) | (b as i64)) as f64))
}

fn number_bit_xor(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__bit_xor__")?;
    Ok(ctx.core.alloc_number(((a as i64) ^ (b as i64)) as f64))
}

fn number_bit_and(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__bit_and__")?;
    Ok(ctx.core.alloc_number(((a as i64) & (b as i64)) as f64))
}

fn number_bit_shl(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__bit_shl__")?;
    Ok(ctx.core.alloc_number(((a as i64) << (b as i64)) as f64))
}

fn number_bit_shr(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let (a, b) = two_numbers(ctx, args, "__bit_shr__")?;
    Ok(ctx.core.alloc_number(((a as i64) >> (b as i64)) as f64))
}

fn number_clone(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__clone__")?;
    let v = want_number(ctx, args[0], "__clone__")?;
    Ok(ctx.core.alloc(Some(args[0]), Payload::Number(v)))
}

// ── String ──────────────────────────────────────────────────────────────

fn string_add(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__add__")?;
    let lhs = want_string(ctx, args[0], "__add__")?;
    let rhs = want_string(ctx, args[1], "__add__")?;
    Ok(ctx.core.alloc_string(format!("{}{}", lhs, rhs)))
}

fn string_compare(
    ctx: &mut Ctx,
    args: &[Ref],
    what: &str,
    apply: fn(&str, &str) -> bool,
) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, what)?;
    let lhs = want_string(ctx, args[0], what)?;
    let rhs = want_string(ctx, args[1], what)?;
    Ok(ctx.core.boolean(apply(&lhs, &rhs)))
}

fn string_eq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__eq__")?;
    let lhs = want_string(ctx, args[0], "__eq__")?;
    let equal = string_of(ctx.core, args[1]).map(|rhs| lhs == rhs).unwrap_or(false);
    Ok(ctx.core.boolean(equal))
}

fn string_neq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__neq__")?;
    let lhs = want_string(ctx, args[0], "__neq__")?;
    let equal = string_of(ctx.core, args[1]).map(|rhs| lhs == rhs).unwrap_or(false);
    Ok(ctx.core.boolean(!equal))
}

fn string_lt(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    string_compare(ctx, args, "__lt__", |a, b| a < b)
}

fn string_gt(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    string_compare(ctx, args, "__gt__", |a, b| a > b)
}

fn string_lte(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    string_compare(ctx, args, "__lte__", |a, b| a <= b)
}

fn string_gte(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    string_compare(ctx, args, "__gte__", |a, b| a >= b)
}

fn string_clone(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__clone__")?;
    let v = want_string(ctx, args[0], "__clone__")?;
    Ok(ctx.core.alloc(Some(args[0]), Payload::Str(v)))
}

fn string_len(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "len")?;
    let v = want_string(ctx, args[0], "len")?;
    Ok(ctx.core.alloc_number(v.len() as f64))
}

fn string_empty(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "empty")?;
    let v = want_string(ctx, args[0], "empty")?;
    Ok(ctx.core.boolean(v.is_empty()))
}

fn string_at(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "at")?;
    let v = want_string(ctx, args[0], "at")?;
    let i = want_number(ctx, args[1], "at")? as usize;
    match v.chars().nth(i) {
        Some(c) => Ok(ctx.core.alloc_string(c.to_string())),
        None => Err(raise(ctx.core, "index out of range")),
    }
}

fn string_front(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "front")?;
    let v = want_string(ctx, args[0], "front")?;
    match v.chars().next() {
        Some(c) => Ok(ctx.core.alloc_string(c.to_string())),
        None => Err(raise(ctx.core, "front of empty string")),
    }
}

fn string_back(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "back")?;
    let v = want_string(ctx, args[0], "back")?;
    match v.chars().last() {
        Some(c) => Ok(ctx.core.alloc_string(c.to_string())),
        None => Err(raise(ctx.core, "back of empty string")),
    }
}

fn string_find(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "find")?;
    let haystack = want_string(ctx, args[0], "find")?;
    let needle = want_string(ctx, args[1], "find")?;
    let idx = haystack.find(&needle).map(|i| i as f64).unwrap_or(-1.0);
    Ok(ctx.core.alloc_number(idx))
}

fn string_substr(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 3, "substr")?;
    let v = want_string(ctx, args[0], "substr")?;
    let pos = want_number(ctx, args[1], "substr")? as usize;
    let len = want_number(ctx, args[2], "substr")? as usize;
    if pos > v.len() {
        return Err(raise(ctx.core, "index out of range"));
    }
    let end = (pos + len).min(v.len());
    let slice = v[pos..end].to_string();
    Ok(ctx.core.alloc_string(slice))
}

// ── Boolean ─────────────────────────────────────────────────────────────

fn boolean_value(core: &ProcessCore, r: Ref) -> Option<bool> {
    match core.heap.get(r).payload {
        Payload::Boolean(b) => Some(b),
        _ => None,
    }
}

fn boolean_eq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__eq__")?;
    let equal = match (boolean_value(ctx.core, args[0]), boolean_value(ctx.core, args[1])) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    Ok(ctx.core.boolean(equal))
}

fn boolean_neq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__neq__")?;
    let equal = match (boolean_value(ctx.core, args[0]), boolean_value(ctx.core, args[1])) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    Ok(ctx.core.boolean(!equal))
}

/// Cloning the canonical singletons yields the singletons themselves;
/// anything else gets a parent-chained copy with the same truth value.
fn boolean_clone(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__clone__")?;
    if args[0] == ctx.core.protos.bool_true || args[0] == ctx.core.protos.bool_false {
        return Ok(args[0]);
    }
    let value = ctx.core.heap.get(args[0]).as_bool();
    Ok(ctx.core.alloc(Some(args[0]), Payload::Boolean(value)))
}

// ── Array ───────────────────────────────────────────────────────────────

fn array_eq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "__eq__")?;
    let lhs = want_array(ctx, args[0], "__eq__")?;
    let rhs = match array_of(ctx.core, args[1]) {
        Some(elems) => elems,
        None => return Ok(ctx.core.boolean(false)),
    };
    if lhs.len() != rhs.len() {
        return Ok(ctx.core.boolean(false));
    }
    for (l, r) in lhs.into_iter().zip(rhs) {
        let method = match ctx.core.heap.resolve(l, Magic::Eq.name()) {
            Some(m) => m,
            None => return Ok(ctx.core.boolean(false)),
        };
        let verdict = call_sync(ctx, method, vec![l, r])?;
        if !ctx.core.heap.get(verdict).as_bool() {
            return Ok(ctx.core.boolean(false));
        }
    }
    Ok(ctx.core.boolean(true))
}

fn array_neq(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    let equal = array_eq(ctx, args)?;
    let value = ctx.core.heap.get(equal).as_bool();
    Ok(ctx.core.boolean(!value))
}

/// Copies the spine, not the elements.
fn array_clone(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__clone__")?;
    let elems = want_array(ctx, args[0], "__clone__")?;
    Ok(ctx.core.alloc(Some(args[0]), Payload::Array(elems)))
}

fn array_at(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "at")?;
    let elems = want_array(ctx, args[0], "at")?;
    let i = want_number(ctx, args[1], "at")? as usize;
    match elems.get(i) {
        Some(e) => Ok(*e),
        None => Err(raise(ctx.core, "index out of range")),
    }
}

fn array_front(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "front")?;
    let elems = want_array(ctx, args[0], "front")?;
    match elems.first() {
        Some(e) => Ok(*e),
        None => Err(raise(ctx.core, "front of empty array")),
    }
}

fn array_back(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "back")?;
    let elems = want_array(ctx, args[0], "back")?;
    match elems.last() {
        Some(e) => Ok(*e),
        None => Err(raise(ctx.core, "back of empty array")),
    }
}

fn array_empty(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "empty")?;
    let elems = want_array(ctx, args[0], "empty")?;
    Ok(ctx.core.boolean(elems.is_empty()))
}

fn array_size(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "size")?;
    let elems = want_array(ctx, args[0], "size")?;
    Ok(ctx.core.alloc_number(elems.len() as f64))
}

fn array_clear(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "clear")?;
    match &mut ctx.core.heap.get_mut(args[0]).payload {
        Payload::Array(elems) => {
            elems.clear();
            Ok(args[0])
        }
        _ => Err(raise(ctx.core, "clear expects an array receiver")),
    }
}

/// Returns the new size.
fn array_push(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 2, "push")?;
    let len = match &mut ctx.core.heap.get_mut(args[0]).payload {
        Payload::Array(elems) => {
            elems.push(args[1]);
            elems.len()
        }
        _ => return Err(raise(ctx.core, "push expects an array receiver")),
    };
    Ok(ctx.core.alloc_number(len as f64))
}

fn array_pop(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "pop")?;
    let popped = match &mut ctx.core.heap.get_mut(args[0]).payload {
        Payload::Array(elems) => elems.pop(),
        _ => return Err(raise(ctx.core, "pop expects an array receiver")),
    };
    match popped {
        Some(e) => Ok(e),
        None => Err(raise(ctx.core, "pop from empty array")),
    }
}

fn array_iter(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "iter")?;
    want_array(ctx, args[0], "iter")?;
    let mark = ctx.core.scratch_mark();
    let index = ctx.core.alloc_number(0.0);
    ctx.core.scratch_push(index);
    let proto = ctx.core.protos.array_iterator;
    let iter = ctx.core.alloc(Some(proto), Payload::Plain);
    ctx.core.heap.set_property(iter, "__array__".into(), args[0]);
    ctx.core.heap.set_property(iter, "__index__".into(), index);
    ctx.core.scratch_truncate(mark);
    Ok(iter)
}

// ── Array iterator ──────────────────────────────────────────────────────

fn iterator_parts(ctx: &mut Ctx, r: Ref, what: &str) -> Result<(Vec<Ref>, Ref, f64), Fault> {
    let arr = ctx.core.heap.resolve(r, "__array__");
    let index = ctx.core.heap.resolve(r, "__index__");
    let (arr, index) = match (arr, index) {
        (Some(a), Some(i)) => (a, i),
        _ => return Err(raise(ctx.core, format!("{} expects an iterator receiver", what))),
    };
    let elems = want_array(ctx, arr, what)?;
    let i = want_number(ctx, index, what)?;
    Ok((elems, index, i))
}

fn iterator_cur(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__cur__")?;
    let (elems, _, i) = iterator_parts(ctx, args[0], "__cur__")?;
    Ok(elems.get(i as usize).copied().unwrap_or(ctx.core.null()))
}

fn iterator_done(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__done__")?;
    let (elems, _, i) = iterator_parts(ctx, args[0], "__done__")?;
    Ok(ctx.core.boolean(i as usize >= elems.len()))
}

fn iterator_next(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__next__")?;
    let (_, index, _) = iterator_parts(ctx, args[0], "__next__")?;
    if let Payload::Number(v) = &mut ctx.core.heap.get_mut(index).payload {
        *v += 1.0;
    }
    Ok(args[0])
}

// ── Exception ───────────────────────────────────────────────────────────

fn exception_clone(ctx: &mut Ctx, args: &[Ref]) -> Result<Ref, Fault> {
    expect_args(ctx, args, 1, "__clone__")?;
    let message = match &ctx.core.heap.get(args[0]).payload {
        Payload::Exception(m) => m.clone(),
        _ => String::new(),
    };
    Ok(ctx.core.alloc(Some(args[0]), Payload::Exception(message)))
}

/// Stringify each argument after the receiver and join with spaces; shared
/// by `print`-style natives in the standard modules.
pub(crate) fn render_args(ctx: &mut Ctx, args: &[Ref]) -> Result<String, Fault> {
    let mut parts = Vec::with_capacity(args.len().saturating_sub(1));
    for arg in &args[1..] {
        parts.push(stringify(ctx, *arg)?);
    }
    Ok(parts.join(" "))
}

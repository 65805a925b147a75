//! Storage layout for one compilation frame (§3.6): the mapping from a
//! declared name to its stack slot, plus enough type information to know
//! an array's lower bound and whether an indexable is a `string` (accessed
//! through `CHARAT`) or an integer/boolean/real array (accessed through
//! `LOAD 0` / `STORE 0`).
//!
//! A fresh [`Frame`] is pushed on entry to the program's own (global)
//! block and again on entry to every subprogram; [`crate::codegen::CodeGenerator`]
//! owns exactly one at a time and swaps it out around a subprogram visit,
//! mirroring the teacher's own stack-frame-per-call-site bookkeeping in
//! `faxc-lir::stack_frame`.

use ewvmc_par::ast::TypeExpr;
use ewvmc_util::{FxHashMap, Symbol};

/// The reserved name bound to a function's own return slot and to the
/// function's own name (Pascal's "assign to the function name to set the
/// return value" convention, §4.4). `$` cannot appear in a source
/// identifier (`ewvmc-lex` only accepts `[A-Za-z_][A-Za-z0-9_]*`), so this
/// sentinel can never collide with a real program symbol once interned.
pub const RETURN_SLOT_SENTINEL: &str = "$return";

#[derive(Debug, Clone)]
struct Slot {
    offset: i32,
    ty: TypeExpr,
}

/// One compilation frame: the current block's variable-to-offset mapping
/// and the next free slot. Globals and subprogram locals are both frames;
/// what distinguishes them is [`Frame::is_function_local`]. Per §3.6 a
/// frame is function-local iff it binds the `$return` sentinel; a
/// procedure's frame binds no such slot (it has no return value) but
/// addresses its locals identically, so [`Frame::mark_subprogram_local`]
/// sets the same flag explicitly for that case.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    slots: FxHashMap<Symbol, Slot>,
    current_offset: i32,
    function_local: bool,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            slots: FxHashMap::default(),
            current_offset: 0,
            function_local: false,
        }
    }

    pub fn is_function_local(&self) -> bool {
        self.function_local
    }

    pub fn declare(&mut self, name: Symbol, ty: TypeExpr) -> i32 {
        let offset = self.current_offset;
        self.slots.insert(name, Slot { offset, ty });
        self.current_offset += 1;
        offset
    }

    /// Declares `name` at an explicit `offset` rather than the next free
    /// slot - used for parameters, which are laid out back-to-front
    /// starting at `-1` (§4.6 step 3) rather than front-to-back from `0`.
    pub fn declare_at(&mut self, name: Symbol, ty: TypeExpr, offset: i32) {
        self.slots.insert(name, Slot { offset, ty });
    }

    /// Reserves `size` consecutive slots starting at the next free offset
    /// (used for an array declaration, whose element count is `hi - lo +
    /// 1`) and returns the base offset.
    pub fn declare_sized(&mut self, name: Symbol, ty: TypeExpr, size: u32) -> i32 {
        let offset = self.current_offset;
        self.slots.insert(name, Slot { offset, ty });
        self.current_offset += size as i32;
        offset
    }

    pub fn current_offset(&self) -> i32 {
        self.current_offset
    }

    pub fn set_current_offset(&mut self, offset: i32) {
        self.current_offset = offset;
    }

    pub fn offset_of(&self, name: Symbol) -> Option<i32> {
        self.slots.get(&name).map(|s| s.offset)
    }

    pub fn type_of(&self, name: Symbol) -> Option<&TypeExpr> {
        self.slots.get(&name).map(|s| &s.ty)
    }

    /// Procedures bind no `$return` sentinel (they have no return value)
    /// but still address their locals the same way a function does;
    /// called once when a procedure's frame is pushed.
    pub fn mark_subprogram_local(&mut self) {
        self.function_local = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ewvmc_util::Interner;

    #[test]
    fn globals_are_not_function_local() {
        let frame = Frame::new();
        assert!(!frame.is_function_local());
    }

    #[test]
    fn a_function_frame_is_function_local_via_the_return_sentinel() {
        let mut interner = Interner::new();
        let mut frame = Frame::new();
        let sentinel = interner.intern(RETURN_SLOT_SENTINEL);
        frame.declare(sentinel, TypeExpr::Basic(ewvmc_par::ast::BasicType::Integer));
        frame.mark_subprogram_local();
        assert!(frame.is_function_local());
    }

    #[test]
    fn declare_sized_reserves_contiguous_slots() {
        let mut interner = Interner::new();
        let mut frame = Frame::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let array_ty = TypeExpr::Array {
            lo: 0,
            hi: 9,
            elem: Box::new(TypeExpr::Basic(ewvmc_par::ast::BasicType::Integer)),
        };
        let base = frame.declare_sized(a, array_ty, 10);
        assert_eq!(base, 0);
        frame.declare(b, TypeExpr::Basic(ewvmc_par::ast::BasicType::Integer));
        assert_eq!(frame.offset_of(b), Some(10));
    }
}

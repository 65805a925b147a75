//! Single-threaded string interner backing [`super::Symbol`].

use crate::FxHashMap;
use super::Symbol;

/// Owns the canonical lowercased text for every interned symbol.
///
/// Strings are leaked to obtain `'static` string slices; this is acceptable
/// for a batch compiler that interns at most one source file's worth of
/// identifiers and exits.
#[derive(Default)]
pub struct Interner {
    map: FxHashMap<&'static str, Symbol>,
    strings: Vec<&'static str>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::new(),
        }
    }

    /// Intern `text`, lowercasing it first. Returns the existing symbol if
    /// an equal (post-lowercasing) string was already interned.
    pub fn intern(&mut self, text: &str) -> Symbol {
        let lowered = text.to_lowercase();
        if let Some(&sym) = self.map.get(lowered.as_str()) {
            return sym;
        }
        let leaked: &'static str = Box::leak(lowered.into_boxed_str());
        let sym = Symbol::from_index(self.strings.len() as u32);
        self.strings.push(leaked);
        self.map.insert(leaked, sym);
        sym
    }

    /// Intern `text` verbatim, without lowercasing. Used for string-literal
    /// contents, which (unlike identifiers) are case-sensitive.
    pub fn intern_raw(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.map.get(text) {
            return sym;
        }
        let leaked: &'static str = Box::leak(text.to_string().into_boxed_str());
        let sym = Symbol::from_index(self.strings.len() as u32);
        self.strings.push(leaked);
        self.map.insert(leaked, sym);
        sym
    }

    /// Look up the canonical string for a previously interned symbol.
    ///
    /// # Panics
    ///
    /// Panics if `symbol` was not produced by this interner.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.strings[symbol.as_u32() as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_interner_has_no_strings() {
        let interner = Interner::new();
        assert!(interner.is_empty());
    }

    #[test]
    fn repeated_intern_does_not_grow_table() {
        let mut interner = Interner::new();
        interner.intern("foo");
        interner.intern("foo");
        interner.intern("FOO");
        assert_eq!(interner.len(), 1);
    }
}

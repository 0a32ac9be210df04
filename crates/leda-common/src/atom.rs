//! String interning for identifiers and literal text.
//!
//! Symbols and types are compared and hashed constantly during binding and
//! checking; interning identifier text once keeps those comparisons to a
//! pointer-sized integer instead of a string compare.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// An interned string handle. Cheap to copy, compares by interned index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

/// Owns the backing strings for every [`Atom`] handed out.
#[derive(Default)]
pub struct Interner {
    strings: Vec<Arc<str>>,
    lookup: FxHashMap<Arc<str>, u32>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Atom {
        if let Some(&id) = self.lookup.get(text) {
            return Atom(id);
        }
        let id = u32::try_from(self.strings.len()).expect("interner overflow");
        let arc: Arc<str> = Arc::from(text);
        self.strings.push(arc.clone());
        self.lookup.insert(arc, id);
        Atom(id)
    }

    #[must_use]
    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_text_returns_the_same_atom() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "foo");
    }

    #[test]
    fn distinct_text_yields_distinct_atoms() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }
}

//! ewvmc-util - core utilities shared by every compiler phase.
//!
//! This crate carries the types that have no business living in a single
//! phase crate: interned symbols ([`symbol`]), source locations
//! ([`span`]), the diagnostic record and its accumulating handler
//! ([`diagnostic`]), and a typed-index vector ([`IndexVec`]) used by the
//! scope arena in `ewvmc-sem`.
//!
//! None of these types know anything about Pascal, the stack machine, or
//! the compilation pipeline — they are the foundation the phase crates are
//! built on.

pub mod diagnostic;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use index_vec::{Idx, IndexVec};
pub use span::Span;
pub use symbol::{Interner, Symbol};

// Re-export commonly used hash collections; the compiler is single-threaded
// so there is no need for a lock-free or thread-safe map anywhere in the
// workspace.
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;

/// Defines a newtype wrapping `u32` and implements [`Idx`] for it.
///
/// Used to create distinct index spaces (e.g. `ScopeId`, `LabelId`) that
/// cannot be mixed up at compile time even though they share a
/// representation.
#[macro_export]
macro_rules! define_idx {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

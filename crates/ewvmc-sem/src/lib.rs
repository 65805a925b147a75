//! ewvmc-sem - name resolution and type checking for the parsed program.
//!
//! Two pieces cooperate: [`scope::ScopeArena`] resolves every identifier to
//! a declaration (a variable, parameter, procedure, or function), and
//! [`analysis::SemanticAnalyzer`] walks the tree assigning each expression a
//! [`types::Type`] and checking it against the rules in §3.3/3.4/4.4 —
//! declared-before-use, assignment and call-argument compatibility, and the
//! handful of control-flow conditions that must be boolean.
//!
//! Like the rest of the pipeline this phase never aborts on the first
//! mistake: every check reports through the shared [`ewvmc_util::diagnostic::Handler`]
//! and keeps walking, so a single compile run surfaces as many real
//! problems as it can instead of stopping at the first one.

mod analysis;
mod scope;
mod types;

#[cfg(test)]
mod edge_cases;

pub use analysis::{analyze, SemanticAnalyzer};
pub use scope::{ScopeArena, ScopeId, SymbolEntry, SymbolKind};
pub use types::Type;

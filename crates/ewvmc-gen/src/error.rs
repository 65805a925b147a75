//! Fatal, phase-local failures for `ewvmc-gen` (§7 "Internal" and the
//! `real`/nested-subprogram cases called out by §9's Design Notes).
//!
//! These are distinct from the accumulated [`ewvmc_util::diagnostic::Diagnostic`]s
//! lexing/parsing/semantic analysis report through a `Handler`: by the
//! time code generation runs, the pipeline has already checked
//! `handler.has_errors()` and decided to proceed, so anything this crate
//! rejects is a construct the earlier phases accepted but this backend
//! cannot translate - real-arithmetic code generation, a `string`
//! element write, or a tree shape semantic analysis should have already
//! ruled out (a nested subprogram, an unresolved call target). Modeled on
//! `faxc-util::error`'s `#[derive(thiserror::Error)]` + `type XResult<T>`
//! convention.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodeGenError {
    /// A `real`-typed value reached a position code generation must emit
    /// arithmetic for. The tree carries real literals and the type
    /// checker accepts `real` arithmetic (§3.4's widening rule), but the
    /// code generator has no real-valued instruction to emit (§9).
    #[error("line {line}: 'real' arithmetic is not supported by the code generator")]
    RealArithmeticUnsupported { line: u32 },

    /// A subprogram declares a nested subprogram. Semantic analysis
    /// already diagnoses this (§4.4) and aborts the pipeline before code
    /// generation runs; this variant exists so the generator never
    /// silently miscompiles one if it is ever invoked directly in a test
    /// without going through the full pipeline.
    #[error("line {line}: nested subprograms are not supported")]
    NestedSubprogramUnsupported { line: u32 },

    /// An assignment or `read` target is a `string`-typed array element.
    /// The Target VM's `CHARAT` reads a character by index but the
    /// instruction set used here has no matching character-store
    /// instruction (§4.6): preserved as a hard diagnostic rather than a
    /// silently-dropped store.
    #[error("line {line}: assigning to a character of a string is not supported")]
    StringElementWriteUnsupported { line: u32 },

    /// A call site names a procedure/function with no recorded entry
    /// label. Semantic analysis resolves every call before code
    /// generation runs, so this indicates the two phases disagree about
    /// what was declared.
    #[error("line {line}: '{name}' has no code generated for it")]
    UndeclaredProcedure { name: String, line: u32 },

    /// An unexpected tree shape reached the generator (§7 "Internal").
    #[error("internal code generation error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CodeGenError>;

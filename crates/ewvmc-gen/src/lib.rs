//! ewvmc-gen - Target VM code generator.
//!
//! Lowers a checked, optimized [`ewvmc_par::ast::Program`] to a flat
//! listing of Target VM assembly lines (§4.6). [`generate`] is the single
//! entry point; everything else is implementation detail the driver does
//! not need.

mod codegen;
mod error;
mod frame;
mod instr;

pub use codegen::generate;
pub use error::{CodeGenError, Result};
pub use instr::{Instr, Label, Line};

//! ewvmc-drv - the `ewvmc` command-line compiler.
//!
//! Wires the phase crates (`ewvmc-lex` through `ewvmc-gen`) into the single
//! pipeline described in §6: read a `.pas` source file, lex and parse it,
//! check it, optimize it, and emit a Target VM assembly listing. Every
//! phase-local fatal error is aggregated into `anyhow::Error` here (§10.1);
//! the accumulated lexical/syntactic/semantic diagnostics travel through
//! the shared [`ewvmc_util::diagnostic::Handler`] instead and are printed
//! before the pipeline aborts, so a run with a dozen type errors reports
//! all of them rather than just the first.
//!
//! This crate owns the CLI surface and the phase-boundary logging
//! (`tracing`, §10.2); none of the library crates it calls log directly.

mod config;
mod pipeline;

pub use config::Config;
pub use pipeline::run;

//! Drives one compilation from a [`Config`] to an exit-code-bearing
//! `anyhow::Result` (§6, §7): lex → parse → analyze → optimize → generate,
//! short-circuiting at `--tokens-only`/`--ast-only` and skipping the last
//! two phases under `--no-opt`/`--no-code` as requested.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ewvmc_util::diagnostic::{Diagnostic, Handler};
use ewvmc_util::Interner;

use crate::config::Config;

/// Runs the full pipeline for `config`. Returns `Ok(())` when compilation
/// produced no errors (warnings are not fatal); any error condition -
/// lexical, syntactic-fatal, semantic, or internal (§7) - surfaces as
/// `Err`, which `main` turns into a non-zero exit code.
pub fn run(config: &Config) -> Result<()> {
    let source = fs::read_to_string(&config.source)
        .with_context(|| format!("reading source file {}", config.source.display()))?;

    let mut interner = Interner::new();
    let mut handler = Handler::new();

    if config.tokens_only {
        tracing::debug!(file = %config.source.display(), "lexing");
        print_tokens(&source, &mut interner, &mut handler);
        return report_and_exit(&handler, "lexing");
    }

    tracing::debug!(file = %config.source.display(), "parsing");
    let program = ewvmc_par::parse(&source, &mut interner, &mut handler);

    if config.ast_only {
        match &program {
            Some(program) => println!("{program:#?}"),
            None => bail!("parsing produced no AST"),
        }
        return report_and_exit(&handler, "parsing");
    }

    let Some(mut program) = program else {
        print_diagnostics(&handler);
        bail!("parsing produced no AST");
    };

    tracing::debug!("analyzing");
    ewvmc_sem::analyze(&program, &interner, &handler);
    if handler.has_errors() {
        print_diagnostics(&handler);
        bail!(
            "semantic analysis reported {} error(s)",
            handler.error_count()
        );
    }

    if !config.no_opt {
        tracing::debug!("optimizing");
        let rewrites = ewvmc_opt::optimize(&mut program);
        tracing::debug!(rewrites, "optimizer rewrote {rewrites} node(s)");
    }

    if config.no_code {
        tracing::info!(
            "{} diagnostic(s); skipping code generation (--no-code)",
            handler.diagnostics().len()
        );
        print_diagnostics(&handler);
        return Ok(());
    }

    tracing::debug!("generating code");
    let lines = ewvmc_gen::generate(&program, &mut interner)
        .context("code generation failed")?;

    let output_path = config.output_path();
    write_output(&output_path, &lines)?;
    tracing::info!(output = %output_path.display(), "wrote {} line(s)", lines.len());

    print_diagnostics(&handler);
    Ok(())
}

/// Tokenizes `source` in full and prints one `line:column token` per line,
/// resolving identifier/string-literal symbols through `interner` so the
/// dump is readable rather than showing raw interned indices.
fn print_tokens(source: &str, interner: &mut Interner, handler: &mut Handler) {
    let mut lexer = ewvmc_lex::Lexer::new(source, interner, handler);
    loop {
        let (token, line, column) = lexer.next_token();
        let is_eof = token == ewvmc_lex::Token::Eof;
        println!("{line}:{column} {}", describe_token(&token, interner));
        if is_eof {
            break;
        }
    }
}

fn describe_token(token: &ewvmc_lex::Token, interner: &Interner) -> String {
    use ewvmc_lex::Token;
    match token {
        Token::Ident(sym) => format!("Ident({})", interner.resolve(*sym)),
        Token::StringLit(sym) => format!("StringLit({:?})", interner.resolve(*sym)),
        other => format!("{other:?}"),
    }
}

fn write_output(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(path, contents)
        .with_context(|| format!("writing output file {}", path.display()))
}

/// Prints every accumulated diagnostic to stderr (§3.8/§6): `{level}:
/// {message} ({line}:{column})`, plus any attached notes/help.
fn print_diagnostics(handler: &Handler) {
    for diagnostic in handler.diagnostics() {
        print_one(&diagnostic);
    }
}

fn print_one(diagnostic: &Diagnostic) {
    eprintln!(
        "{}: {} ({}:{})",
        diagnostic.level, diagnostic.message, diagnostic.span.line, diagnostic.span.column
    );
    for note in &diagnostic.notes {
        eprintln!("  note: {note}");
    }
    for help in &diagnostic.helps {
        eprintln!("  help: {help}");
    }
}

/// Shared tail for the `--tokens-only`/`--ast-only` short-circuit paths:
/// print whatever the handler collected and fail the run if any of it was
/// an error rather than a mere warning.
fn report_and_exit(handler: &Handler, phase: &str) -> Result<()> {
    print_diagnostics(handler);
    if handler.has_errors() {
        bail!("{phase} reported {} error(s)", handler.error_count());
    }
    Ok(())
}

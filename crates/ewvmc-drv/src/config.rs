//! CLI surface (§6, §10.3). `Config` is both the plain data the rest of
//! the driver consumes and the `clap`-derived argument parser itself,
//! modeled on `faxt`'s `#[derive(clap::Parser)]` usage - the nearest real
//! CLI-parsing grounding in the corpus, since `faxc-drv` documents a CLI
//! surface but never actually wires `clap`.

use std::path::PathBuf;

use clap::Parser;

/// Compiles a single Pascal-standard source file to Target VM assembly.
#[derive(Parser, Debug, Clone)]
#[command(name = "ewvmc")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Path to the `.pas` source file to compile.
    pub source: PathBuf,

    /// Output path for the generated assembly listing.
    ///
    /// Defaults to `<source-dir>/../outputs/<basename>.ewvm`, mirroring the
    /// original tool's `../outputs/` convention (§6).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after lexing and print the token stream.
    #[arg(short, long)]
    pub tokens_only: bool,

    /// Stop after parsing and print the AST.
    #[arg(short, long)]
    pub ast_only: bool,

    /// Skip the constant-folding / dead-branch-elimination optimizer.
    #[arg(long)]
    pub no_opt: bool,

    /// Skip code generation; run the pipeline only through semantic analysis.
    #[arg(long)]
    pub no_code: bool,

    /// Emit debug-level phase tracing in addition to warnings.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Resolves the output path per §6: an explicit `-o/--output` wins,
    /// otherwise `<source-dir>/../outputs/<basename>.ewvm`.
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let source_dir = self
            .source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let basename = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        source_dir.join("..").join("outputs").join(format!("{basename}.ewvm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut full = vec!["ewvmc"];
        full.extend_from_slice(args);
        Config::parse_from(full)
    }

    #[test]
    fn default_output_path_sits_next_to_source_dirs_outputs_sibling() {
        let config = parse(&["programs/hello.pas"]);
        assert_eq!(
            config.output_path(),
            PathBuf::from("programs/../outputs/hello.ewvm")
        );
    }

    #[test]
    fn default_output_path_for_a_bare_filename_uses_current_dir() {
        let config = parse(&["hello.pas"]);
        assert_eq!(config.output_path(), PathBuf::from("./../outputs/hello.ewvm"));
    }

    #[test]
    fn explicit_output_overrides_the_default() {
        let config = parse(&["hello.pas", "-o", "custom.ewvm"]);
        assert_eq!(config.output_path(), PathBuf::from("custom.ewvm"));
    }

    #[test]
    fn short_flags_parse() {
        let config = parse(&["hello.pas", "-t", "-v"]);
        assert!(config.tokens_only);
        assert!(config.verbose);
        assert!(!config.ast_only);
    }

    #[test]
    fn long_flags_parse() {
        let config = parse(&["hello.pas", "--ast-only", "--no-opt", "--no-code"]);
        assert!(config.ast_only);
        assert!(config.no_opt);
        assert!(config.no_code);
    }

    #[test]
    fn flags_default_to_false() {
        let config = parse(&["hello.pas"]);
        assert!(!config.tokens_only);
        assert!(!config.ast_only);
        assert!(!config.no_opt);
        assert!(!config.no_code);
        assert!(!config.verbose);
    }
}

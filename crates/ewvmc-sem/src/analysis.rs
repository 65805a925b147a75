//! Walks the parsed tree once, resolving every name against a
//! [`ScopeArena`] and assigning every expression a [`Type`]. Diagnostics are
//! reported through the shared [`Handler`] rather than returned, so one
//! malformed declaration does not stop the rest of the program from being
//! checked.

use crate::scope::{ScopeArena, SymbolEntry, SymbolKind};
use crate::types::Type;
use ewvmc_par::ast::{self, BinOp, Expr, Stmt, UnOp};
use ewvmc_util::diagnostic::{Diagnostic, Handler};
use ewvmc_util::{Interner, Span, Symbol};

fn span(line: u32) -> Span {
    Span::point(line, 0)
}

/// Runs semantic analysis over `program`, reporting every diagnostic
/// through `handler`. Callers decide whether to proceed to optimization
/// and code generation by checking `handler.has_errors()` afterward.
pub fn analyze(program: &ast::Program, interner: &Interner, handler: &Handler) {
    let mut analyzer = SemanticAnalyzer::new(interner, handler);
    analyzer.analyze_program(program);
}

pub struct SemanticAnalyzer<'a> {
    interner: &'a Interner,
    handler: &'a Handler,
    scopes: ScopeArena,
    /// `(name, return type)` of the subprogram currently being analyzed,
    /// when it is a function: assigning to the function's own name inside
    /// its own body sets the return value rather than naming a variable.
    current_function: Option<(Symbol, Type)>,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(interner: &'a Interner, handler: &'a Handler) -> Self {
        Self {
            interner,
            handler,
            scopes: ScopeArena::new(),
            current_function: None,
        }
    }

    fn name_of(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    fn error(&self, line: u32, message: impl Into<String>) {
        self.handler
            .emit_diagnostic(Diagnostic::error(message, span(line)));
    }

    fn warn(&self, line: u32, message: impl Into<String>) {
        self.handler
            .emit_diagnostic(Diagnostic::warning(message, span(line)));
    }

    // -- top level -----------------------------------------------------------

    pub fn analyze_program(&mut self, program: &ast::Program) {
        self.declare_block_members(&program.block, program.line);
        self.analyze_subprograms(&program.block);
        self.analyze_statements(&program.block.body);
    }

    /// Declares every global (the program's own `var`s and subprograms) in
    /// the current scope before any body is checked, so forward references
    /// between subprograms and use-before-the-`var`-line both resolve.
    fn declare_block_members(&mut self, block: &ast::Block, _line: u32) {
        for decl in &block.declarations {
            let ty = Type::from_type_expr(&decl.ty);
            if let Type::Array { lo, hi, .. } = &ty {
                if lo > hi {
                    self.error(
                        decl.line,
                        format!("array bounds are out of order: {lo}..{hi}"),
                    );
                }
            }
            for name in &decl.names {
                let entry = SymbolEntry {
                    name: *name,
                    kind: SymbolKind::Variable,
                    ty: Some(ty.clone()),
                    params: Vec::new(),
                    initialized: false,
                    line: decl.line,
                };
                if !self.scopes.declare(entry) {
                    self.error(
                        decl.line,
                        format!("'{}' is already declared in this scope", self.name_of(*name)),
                    );
                }
            }
        }

        for sub in &block.subprograms {
            let (kind, ty) = match sub {
                ast::Subprogram::Function(f) => {
                    (SymbolKind::Function, Some(Type::from_type_expr(&f.ret_ty)))
                }
                ast::Subprogram::Procedure(_) => (SymbolKind::Procedure, None),
            };
            let params: Vec<Type> = sub
                .params()
                .iter()
                .flat_map(|p| {
                    let ty = Type::from_type_expr(&p.ty);
                    std::iter::repeat(ty).take(p.names.len())
                })
                .collect();
            let entry = SymbolEntry {
                name: sub.name(),
                kind,
                ty,
                params,
                initialized: true,
                line: sub.line(),
            };
            if !self.scopes.declare(entry) {
                self.error(
                    sub.line(),
                    format!(
                        "'{}' is already declared in this scope",
                        self.name_of(sub.name())
                    ),
                );
            }
        }
    }

    fn analyze_subprograms(&mut self, block: &ast::Block) {
        for sub in &block.subprograms {
            self.analyze_subprogram(sub);
        }
    }

    fn analyze_subprogram(&mut self, sub: &ast::Subprogram) {
        if !sub.block().subprograms.is_empty() {
            self.error(
                sub.line(),
                format!(
                    "nested subprograms are not supported ('{}' declares one)",
                    self.name_of(sub.name())
                ),
            );
        }

        self.scopes.enter_scope();
        for param in sub.params() {
            let ty = Type::from_type_expr(&param.ty);
            for name in &param.names {
                let entry = SymbolEntry {
                    name: *name,
                    kind: SymbolKind::Parameter,
                    ty: Some(ty.clone()),
                    params: Vec::new(),
                    initialized: true,
                    line: sub.line(),
                };
                if !self.scopes.declare(entry) {
                    self.error(
                        sub.line(),
                        format!(
                            "parameter '{}' is already declared",
                            self.name_of(*name)
                        ),
                    );
                }
            }
        }

        let saved_function = match sub {
            ast::Subprogram::Function(f) => self
                .current_function
                .replace((f.name, Type::from_type_expr(&f.ret_ty))),
            ast::Subprogram::Procedure(_) => self.current_function.take(),
        };

        self.declare_block_members(sub.block(), sub.line());
        // Nested subprograms were already rejected above; only the
        // declarations need registering before the body is checked.
        self.analyze_statements(&sub.block().body);

        self.current_function = saved_function;
        self.scopes.exit_scope();
    }

    // -- statements ------------------------------------------------------------

    fn analyze_statements(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.analyze_stmt(stmt);
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assignment { lhs, rhs, line } => {
                let lhs_ty = self.analyze_assignment_target(lhs, *line);
                let rhs_ty = self.infer_expr(rhs);
                if !lhs_ty.is_compatible(&rhs_ty) {
                    self.error(
                        *line,
                        format!("cannot assign a value of type {rhs_ty} to a target of type {lhs_ty}"),
                    );
                }
                if let Expr::Variable(name, _) = lhs {
                    self.scopes.mark_initialized(*name);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                line,
            } => {
                self.expect_boolean(cond, *line, "if");
                self.analyze_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.analyze_stmt(else_branch);
                }
            }
            Stmt::While { cond, body, line } => {
                self.expect_boolean(cond, *line, "while");
                self.analyze_stmt(body);
            }
            Stmt::For {
                var,
                start,
                end,
                body,
                line,
                ..
            } => {
                match self.scopes.lookup(*var) {
                    Some(entry) if entry.kind == SymbolKind::Variable => {
                        if entry.ty != Some(Type::Integer) {
                            self.error(
                                *line,
                                format!("for-loop control variable '{}' must be integer", self.name_of(*var)),
                            );
                        }
                    }
                    Some(_) => self.error(
                        *line,
                        format!("'{}' cannot be used as a for-loop control variable", self.name_of(*var)),
                    ),
                    None => self.error(
                        *line,
                        format!("undeclared identifier '{}'", self.name_of(*var)),
                    ),
                }
                self.scopes.mark_initialized(*var);
                let start_ty = self.infer_expr(start);
                let end_ty = self.infer_expr(end);
                if !start_ty.is_error() && start_ty != Type::Integer {
                    self.error(*line, format!("for-loop start value must be integer, found {start_ty}"));
                }
                if !end_ty.is_error() && end_ty != Type::Integer {
                    self.error(*line, format!("for-loop end value must be integer, found {end_ty}"));
                }
                self.analyze_stmt(body);
            }
            Stmt::Read { targets, line, .. } => {
                for target in targets {
                    self.analyze_assignment_target(target, *line);
                    if let Expr::Variable(name, _) = target {
                        self.scopes.mark_initialized(*name);
                    }
                }
            }
            Stmt::Write { args, .. } => {
                for arg in args {
                    self.infer_expr(arg);
                }
            }
            Stmt::Compound(stmts) => self.analyze_statements(stmts),
            Stmt::ProcedureCall { name, args, line } => {
                self.analyze_call(*name, args, *line);
            }
            Stmt::Empty => {}
        }
    }

    fn expect_boolean(&mut self, cond: &Expr, line: u32, construct: &str) {
        let ty = self.infer_expr(cond);
        if !ty.is_error() && ty != Type::Boolean {
            self.error(
                line,
                format!("'{construct}' condition must be boolean, found {ty}"),
            );
        }
    }

    /// Resolves an assignment/read target (`Variable`, `ArrayAccess`, or the
    /// enclosing function's own name) and returns its type without marking
    /// anything initialized — callers decide that per §10.5's asymmetry.
    fn analyze_assignment_target(&mut self, target: &Expr, line: u32) -> Type {
        match target {
            Expr::Variable(name, _) => {
                if let Some((fn_name, ret_ty)) = &self.current_function {
                    if fn_name == name {
                        return ret_ty.clone();
                    }
                }
                match self.scopes.lookup(*name) {
                    Some(entry) if entry.kind == SymbolKind::Procedure => {
                        self.error(
                            line,
                            format!("'{}' is a procedure and cannot be assigned to", self.name_of(*name)),
                        );
                        Type::Error
                    }
                    Some(entry) if entry.kind == SymbolKind::Function => {
                        self.error(
                            line,
                            format!(
                                "'{}' cannot be assigned to outside of its own body",
                                self.name_of(*name)
                            ),
                        );
                        Type::Error
                    }
                    Some(entry) => entry.ty.clone().unwrap_or(Type::Error),
                    None => {
                        self.error(line, format!("undeclared identifier '{}'", self.name_of(*name)));
                        Type::Error
                    }
                }
            }
            Expr::ArrayAccess { name, index, line } => {
                let index_ty = self.infer_expr(index);
                if !index_ty.is_error() && index_ty != Type::Integer {
                    self.error(*line, format!("array index must be integer, found {index_ty}"));
                }
                match self.scopes.lookup(*name) {
                    Some(entry) => match &entry.ty {
                        Some(Type::Array { elem, .. }) => (**elem).clone(),
                        // A `string` is indexable too (Pascal's 1-based
                        // character access, §4.6) - it yields another
                        // `string` since this grammar has no standalone
                        // character type. Writing through this form is a
                        // codegen-level restriction (`CodeGenError::StringElementWriteUnsupported`),
                        // not a semantic one.
                        Some(Type::String) => Type::String,
                        Some(other) => {
                            self.error(
                                *line,
                                format!("'{}' is not an array (found {other})", self.name_of(*name)),
                            );
                            Type::Error
                        }
                        None => Type::Error,
                    },
                    None => {
                        self.error(*line, format!("undeclared identifier '{}'", self.name_of(*name)));
                        Type::Error
                    }
                }
            }
            other => self.infer_expr(other),
        }
    }

    // -- expressions -----------------------------------------------------------

    fn infer_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::IntegerConst(..) => Type::Integer,
            Expr::RealConst(..) => Type::Real,
            Expr::StringConst(..) => Type::String,
            Expr::BooleanConst(..) => Type::Boolean,
            Expr::Variable(name, line) => self.infer_variable(*name, *line),
            Expr::ArrayAccess { .. } => self.analyze_assignment_target(expr, expr.line()),
            Expr::Binary { op, lhs, rhs, line } => self.infer_binary(*op, lhs, rhs, *line),
            Expr::Unary { op, expr, line } => self.infer_unary(*op, expr, *line),
            Expr::Call { name, args, line } => self.analyze_call(*name, args, *line),
        }
    }

    fn infer_variable(&mut self, name: Symbol, line: u32) -> Type {
        if let Some((fn_name, ret_ty)) = &self.current_function {
            if *fn_name == name {
                return ret_ty.clone();
            }
        }
        match self.scopes.lookup(name) {
            Some(entry) if entry.kind == SymbolKind::Procedure => {
                self.error(line, format!("'{}' is a procedure, not a value", self.name_of(name)));
                Type::Error
            }
            Some(entry) if entry.kind == SymbolKind::Function => {
                self.error(
                    line,
                    format!("'{}' must be called with arguments", self.name_of(name)),
                );
                Type::Error
            }
            Some(entry) => {
                if !entry.initialized {
                    self.warn(
                        line,
                        format!("'{}' is used before being assigned a value", self.name_of(name)),
                    );
                }
                entry.ty.clone().unwrap_or(Type::Error)
            }
            None => {
                self.error(line, format!("undeclared identifier '{}'", self.name_of(name)));
                Type::Error
            }
        }
    }

    fn infer_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, line: u32) -> Type {
        let lhs_ty = self.infer_expr(lhs);
        let rhs_ty = self.infer_expr(rhs);
        if lhs_ty.is_error() || rhs_ty.is_error() {
            return Type::Error;
        }
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                if lhs_ty == Type::Integer && rhs_ty == Type::Integer {
                    Type::Integer
                } else if lhs_ty.is_numeric() && rhs_ty.is_numeric() {
                    // Either operand being `real` widens the whole
                    // expression to `real` (§4.4 "any real operand ->
                    // real"), mirroring the original's "contagio" rule.
                    Type::Real
                } else {
                    self.error(
                        line,
                        format!("arithmetic operator is not defined for {lhs_ty} and {rhs_ty}"),
                    );
                    Type::Error
                }
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::NotEq => {
                // All six relational operators share one `expected <=
                // actual` compatibility check (§4.4), in either direction
                // since neither operand is privileged as "expected" here.
                if lhs_ty.is_compatible(&rhs_ty) || rhs_ty.is_compatible(&lhs_ty) {
                    Type::Boolean
                } else {
                    self.error(
                        line,
                        format!("relational operator is not defined for {lhs_ty} and {rhs_ty}"),
                    );
                    Type::Error
                }
            }
            BinOp::And | BinOp::Or => {
                if lhs_ty == Type::Boolean && rhs_ty == Type::Boolean {
                    Type::Boolean
                } else {
                    self.error(
                        line,
                        format!("'{}' requires boolean operands, found {lhs_ty} and {rhs_ty}",
                            if op == BinOp::And { "and" } else { "or" }),
                    );
                    Type::Error
                }
            }
        }
    }

    fn infer_unary(&mut self, op: UnOp, operand: &Expr, line: u32) -> Type {
        let ty = self.infer_expr(operand);
        if ty.is_error() {
            return Type::Error;
        }
        match op {
            UnOp::Not => {
                if ty == Type::Boolean {
                    Type::Boolean
                } else {
                    self.error(line, format!("'not' requires a boolean operand, found {ty}"));
                    Type::Error
                }
            }
            UnOp::Neg => {
                if ty.is_numeric() {
                    ty
                } else {
                    self.error(line, format!("unary '-' requires a numeric operand, found {ty}"));
                    Type::Error
                }
            }
        }
    }

    /// Shared by `Stmt::ProcedureCall` and `Expr::Call`: both forms resolve
    /// the callee, check its argument list, and (for a function) yield its
    /// return type. The one built-in, `length`, is recognized here by name
    /// when no user declaration shadows it.
    fn analyze_call(&mut self, name: Symbol, args: &[Expr], line: u32) -> Type {
        let arg_types: Vec<Type> = args.iter().map(|arg| self.infer_expr(arg)).collect();

        if self.scopes.lookup(name).is_none() && self.name_of(name) == "length" {
            if arg_types.len() != 1 {
                self.error(line, "'length' takes exactly one argument".to_string());
                return Type::Error;
            }
            let arg_ty = &arg_types[0];
            if !arg_ty.is_error() && !matches!(arg_ty, Type::String | Type::Array { .. }) {
                self.error(
                    line,
                    format!("'length' expects a string or array argument, found {arg_ty}"),
                );
                return Type::Error;
            }
            return Type::Integer;
        }

        let Some(entry) = self.scopes.lookup(name) else {
            self.error(line, format!("undeclared identifier '{}'", self.name_of(name)));
            return Type::Error;
        };

        let (kind, ret_ty, params) = (entry.kind, entry.ty.clone(), entry.params.clone());
        if kind != SymbolKind::Function && kind != SymbolKind::Procedure {
            self.error(line, format!("'{}' is not callable", self.name_of(name)));
            return Type::Error;
        }

        if arg_types.len() != params.len() {
            self.error(
                line,
                format!(
                    "'{}' expects {} argument(s), found {}",
                    self.name_of(name),
                    params.len(),
                    arg_types.len()
                ),
            );
            return ret_ty.unwrap_or(Type::Error);
        }

        for (i, (param_ty, arg_ty)) in params.iter().zip(arg_types.iter()).enumerate() {
            if !param_ty.is_compatible(arg_ty) {
                self.error(
                    line,
                    format!(
                        "argument {} to '{}' has type {arg_ty}, expected {param_ty}",
                        i + 1,
                        self.name_of(name)
                    ),
                );
            }
        }

        ret_ty.unwrap_or(Type::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ewvmc_util::diagnostic::Handler;

    fn check(src: &str) -> Handler {
        let mut interner = Interner::new();
        let mut handler = Handler::new();
        let program = ewvmc_par::parse(src, &mut interner, &mut handler)
            .expect("test sources must parse");
        analyze(&program, &interner, &handler);
        handler
    }

    #[test]
    fn well_typed_program_has_no_errors() {
        let handler = check(
            "program p; var x, y: integer; begin x := 1; y := x + 2 end.",
        );
        assert!(!handler.has_errors());
    }

    #[test]
    fn undeclared_identifier_is_an_error() {
        let handler = check("program p; begin x := 1 end.");
        assert!(handler.has_errors());
    }

    #[test]
    fn type_mismatch_on_assignment_is_an_error() {
        let handler = check("program p; var x: boolean; begin x := 1 end.");
        assert!(handler.has_errors());
    }

    #[test]
    fn a_real_operand_widens_mixed_arithmetic_instead_of_rejecting_it() {
        let handler = check(
            "program p; var r: real; i: integer; begin r := i + 1.5; r := 1.5 + i end.",
        );
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn relational_comparison_of_an_integer_and_a_real_is_allowed_by_widening() {
        let handler = check(
            "program p; var r: real; i: integer; b: boolean; \
             begin b := i < r; b := r >= i end.",
        );
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn if_condition_must_be_boolean() {
        let handler = check("program p; var x: integer; begin if x then x := 1 end.");
        assert!(handler.has_errors());
    }

    #[test]
    fn recursive_function_with_self_assignment_is_accepted() {
        let handler = check(
            "program p; function fib(n: integer): integer; \
             begin if n < 2 then fib := n else fib := fib(n - 1) + fib(n - 2) end; \
             begin fib(5) end.",
        );
        assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    }

    #[test]
    fn array_index_must_be_integer() {
        let handler = check(
            "program p; var a: array[0..9] of integer; b: boolean; \
             begin a[b] := 1 end.",
        );
        assert!(handler.has_errors());
    }

    #[test]
    fn array_element_assignment_does_not_mark_whole_array_initialized() {
        let handler = check(
            "program p; var a: array[0..9] of integer; x: integer; \
             begin a[0] := 1; x := a[1] end.",
        );
        // Reading a different element than was written is not flagged as a
        // hard error; only a best-effort warning tracks initialization for
        // plain variables, never per-array-element.
        assert!(!handler.has_errors());
    }

    #[test]
    fn nested_subprograms_are_rejected() {
        let handler = check(
            "program p; function outer: integer; \
             function inner: integer; begin inner := 1 end; \
             begin outer := 1 end; \
             begin outer end.",
        );
        assert!(handler.has_errors());
    }

    #[test]
    fn length_builtin_accepts_string_and_array() {
        let handler = check(
            "program p; var s: string; a: array[0..3] of integer; n: integer; \
             begin n := length(s); n := length(a) end.",
        );
        assert!(!handler.has_errors());
    }

    #[test]
    fn redeclared_variable_is_an_error() {
        let handler = check("program p; var x: integer; x: boolean; begin end.");
        assert!(handler.has_errors());
    }

    #[test]
    fn calling_undeclared_procedure_is_an_error() {
        let handler = check("program p; begin greet() end.");
        assert!(handler.has_errors());
    }
}

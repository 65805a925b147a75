//! Code generator (§4.6): walks the checked-and-optimized [`ast::Program`]
//! and emits a line-oriented Target VM assembly listing.
//!
//! Unlike [`ewvmc_sem`], which keeps its scope tree alive only for the
//! duration of analysis, this phase needs its own notion of "where does
//! this name live" to compute addresses - so it re-derives storage layout
//! directly from the AST's own `Declaration`/`Param` nodes into a
//! [`crate::frame::Frame`], rather than threading the analyzer's
//! [`ewvmc_sem::ScopeArena`] through. Since nested subprograms are already
//! rejected by semantic analysis (§4.4), at most two frames are ever live
//! at once: the program's global frame and, while compiling one
//! subprogram body, that subprogram's own frame. A name is looked up in
//! the local frame first and the global frame second, and the frame it is
//! found in - not the frame currently being compiled - decides whether its
//! address is `FP`-relative or `GP`-relative. This is a slightly more
//! precise reading of §4.6's addressing rule than the literal text (which
//! speaks only of "the current frame"); see DESIGN.md.

use ewvmc_par::ast::{self, BasicType, Declaration, Expr, ForDirection, Program, Stmt, Subprogram, TypeExpr};
use ewvmc_util::{FxHashMap, Interner, Symbol};

use crate::error::{CodeGenError, Result};
use crate::frame::{Frame, RETURN_SLOT_SENTINEL};
use crate::instr::{Instr, Label, Line};

/// Which frame a resolved name's storage lives in, and therefore which
/// addressing mode (`PUSHL`/`STOREL` vs `PUSHG`/`STOREG`) reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddrKind {
    Local,
    Global,
}

/// What an indexing expression (`a[i]` or `s[i]`) resolves to: a
/// character of a `string` (read through `CHARAT`, never written) or an
/// element of a genuine array (read/written through `LOAD 0`/`STORE 0`).
enum IndexedKind {
    StringChar,
    Element(TypeExpr),
}

/// Lowers one [`Program`] to a flat instruction listing. Holds no state
/// that outlives a single `compile_program` call; [`generate`] is the
/// only public entry point.
struct CodeGenerator<'a> {
    interner: &'a mut Interner,
    lines: Vec<Line>,
    next_label: u32,
    global: Frame,
    locals: Option<Frame>,
    procedures: FxHashMap<Symbol, Label>,
    length_sym: Symbol,
}

/// Compiles `program` to a Target VM assembly listing, one instruction or
/// label per returned line.
pub fn generate(program: &Program, interner: &mut Interner) -> Result<Vec<String>> {
    let mut gen = CodeGenerator::new(interner);
    gen.compile_program(program)?;
    Ok(gen.lines.iter().map(|line| line.to_string()).collect())
}

/// Declares every name in `decls` into `frame`, expanding each
/// declaration's shared id-list and sizing arrays as `hi - lo + 1` slots.
/// Returns the number of slots added.
fn declare_vars(frame: &mut Frame, decls: &[Declaration]) -> u32 {
    let start = frame.current_offset();
    for decl in decls {
        for &name in &decl.names {
            match &decl.ty {
                TypeExpr::Array { lo, hi, .. } => {
                    let size = (hi - lo + 1).max(0) as u32;
                    frame.declare_sized(name, decl.ty.clone(), size);
                }
                TypeExpr::Basic(_) => {
                    frame.declare(name, decl.ty.clone());
                }
            }
        }
    }
    (frame.current_offset() - start) as u32
}

impl<'a> CodeGenerator<'a> {
    fn new(interner: &'a mut Interner) -> Self {
        let length_sym = interner.intern("length");
        Self {
            interner,
            lines: Vec::new(),
            next_label: 0,
            global: Frame::new(),
            locals: None,
            procedures: FxHashMap::default(),
            length_sym,
        }
    }

    fn emit(&mut self, instr: Instr) {
        self.lines.push(Line::Instr(instr));
    }

    fn emit_label(&mut self, label: Label) {
        self.lines.push(Line::LabelDef(label));
    }

    fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn resolve(&self, name: Symbol) -> Option<(AddrKind, i32, TypeExpr)> {
        if let Some(locals) = &self.locals {
            if let Some(offset) = locals.offset_of(name) {
                return Some((AddrKind::Local, offset, locals.type_of(name).cloned().unwrap()));
            }
        }
        if let Some(offset) = self.global.offset_of(name) {
            return Some((AddrKind::Global, offset, self.global.type_of(name).cloned().unwrap()));
        }
        None
    }

    fn undeclared(&self, name: Symbol, line: u32) -> CodeGenError {
        CodeGenError::Internal(format!(
            "line {line}: '{}' reached code generation undeclared",
            self.interner.resolve(name)
        ))
    }

    fn emit_read_var(&mut self, kind: AddrKind, offset: i32) {
        match kind {
            AddrKind::Local => self.emit(Instr::PushL(offset)),
            AddrKind::Global => self.emit(Instr::PushG(offset)),
        }
    }

    fn emit_store_var(&mut self, kind: AddrKind, offset: i32) {
        match kind {
            AddrKind::Local => self.emit(Instr::StoreL(offset)),
            AddrKind::Global => self.emit(Instr::StoreG(offset)),
        }
    }

    /// Pushes the base address of a variable's storage: `FP`/`GP`, then
    /// its offset, then `PADD` (§4.6 "Frame and addressing").
    fn emit_base_address(&mut self, kind: AddrKind, offset: i32) {
        match kind {
            AddrKind::Local => self.emit(Instr::PushFp),
            AddrKind::Global => self.emit(Instr::PushGp),
        }
        self.emit(Instr::PushI(offset as i64));
        self.emit(Instr::Padd);
    }

    /// Computes what an indexing expression reaches. For a genuine array
    /// this is an *address*: base address, then the index normalized to
    /// zero-based (§4.6 "Array indexing"), then `PADD`; the caller follows
    /// it with `LOAD 0`/`STORE 0`. For a `string` it is instead the two
    /// operands `CHARAT` itself expects: the string value (`PUSHL`/`PUSHG`,
    /// not an address) and a zero-based index - Pascal strings are
    /// 1-based, so the index is normalized with `PUSHI 1; SUB` and left on
    /// the stack for `CHARAT` to consume directly, with no trailing `PADD`.
    fn gen_indexed(&mut self, name: Symbol, index: &Expr, line: u32) -> Result<IndexedKind> {
        let (kind, offset, ty) = self.resolve(name).ok_or_else(|| self.undeclared(name, line))?;
        match ty {
            TypeExpr::Basic(BasicType::String) => {
                self.emit_read_var(kind, offset);
                self.gen_expr(index)?;
                self.emit(Instr::PushI(1));
                self.emit(Instr::Sub);
                Ok(IndexedKind::StringChar)
            }
            TypeExpr::Array { lo, elem, .. } => {
                self.emit_base_address(kind, offset);
                self.gen_expr(index)?;
                if lo != 0 {
                    self.emit(Instr::PushI(lo));
                    self.emit(Instr::Sub);
                }
                self.emit(Instr::Padd);
                Ok(IndexedKind::Element(*elem))
            }
            _ => Err(CodeGenError::Internal(format!(
                "line {line}: '{}' is not indexable",
                self.interner.resolve(name)
            ))),
        }
    }

    fn gen_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::IntegerConst(v, _) => self.emit(Instr::PushI(*v)),
            Expr::RealConst(_, line) => {
                return Err(CodeGenError::RealArithmeticUnsupported { line: *line })
            }
            Expr::StringConst(sym, _) => {
                let text = self.interner.resolve(*sym).to_string();
                self.emit(Instr::PushS(text));
            }
            Expr::BooleanConst(b, _) => self.emit(Instr::PushI(if *b { 1 } else { 0 })),
            Expr::Variable(name, line) => {
                let (kind, offset, _) =
                    self.resolve(*name).ok_or_else(|| self.undeclared(*name, *line))?;
                self.emit_read_var(kind, offset);
            }
            Expr::ArrayAccess { name, index, line } => {
                match self.gen_indexed(*name, index, *line)? {
                    IndexedKind::StringChar => self.emit(Instr::CharAt),
                    IndexedKind::Element(_) => self.emit(Instr::Load0),
                }
            }
            Expr::Binary { op, lhs, rhs, line } => self.gen_binary(*op, lhs, rhs, *line)?,
            Expr::Unary { op, expr, .. } => self.gen_unary(*op, expr)?,
            Expr::Call { name, args, line } => self.emit_call(*name, args, *line)?,
        }
        Ok(())
    }

    /// Binary operator codegen, including the one-character-string-literal
    /// fast path for `=`/`<>` (§4.6 "Special-case fast path"). The
    /// asymmetric case `'c' = x` is deliberately not given the fast path,
    /// matching the original.
    fn gen_binary(&mut self, op: ast::BinOp, lhs: &Expr, rhs: &Expr, _line: u32) -> Result<()> {
        use ast::BinOp;

        if matches!(op, BinOp::Eq | BinOp::NotEq) {
            if let Expr::StringConst(sym, _) = rhs {
                let text = self.interner.resolve(*sym);
                if text.chars().count() == 1 {
                    let code = text.chars().next().unwrap() as i64;
                    self.gen_expr(lhs)?;
                    self.emit(Instr::PushI(code));
                    self.emit(Instr::Equal);
                    if op == BinOp::NotEq {
                        self.emit(Instr::Not);
                    }
                    return Ok(());
                }
            }
        }

        self.gen_expr(lhs)?;
        self.gen_expr(rhs)?;
        match op {
            BinOp::Add => self.emit(Instr::Add),
            BinOp::Sub => self.emit(Instr::Sub),
            BinOp::Mul => self.emit(Instr::Mul),
            BinOp::Div => self.emit(Instr::Div),
            BinOp::Mod => self.emit(Instr::Mod),
            BinOp::Eq => self.emit(Instr::Equal),
            BinOp::NotEq => {
                self.emit(Instr::Equal);
                self.emit(Instr::Not);
            }
            BinOp::Lt => self.emit(Instr::Inf),
            BinOp::Gt => self.emit(Instr::Sup),
            BinOp::Le => self.emit(Instr::InfEq),
            BinOp::Ge => self.emit(Instr::SupEq),
            BinOp::And => self.emit(Instr::And),
            BinOp::Or => self.emit(Instr::Or),
        }
        Ok(())
    }

    fn gen_unary(&mut self, op: ast::UnOp, expr: &Expr) -> Result<()> {
        self.gen_expr(expr)?;
        match op {
            ast::UnOp::Not => self.emit(Instr::Not),
            ast::UnOp::Neg => {
                self.emit(Instr::PushI(-1));
                self.emit(Instr::Mul);
            }
        }
        Ok(())
    }

    /// Shared by `Expr::Call` and `Stmt::ProcedureCall` (§4.6 "Calls" -
    /// the redesign that closes the original's gap where procedure-call
    /// statements never emitted `CALL` at all). The callee's return value,
    /// if any, is simply left on the stack for a statement-context call.
    fn emit_call(&mut self, name: Symbol, args: &[Expr], line: u32) -> Result<()> {
        if name == self.length_sym {
            if args.len() != 1 {
                return Err(CodeGenError::Internal(format!(
                    "line {line}: 'length' expects exactly one argument"
                )));
            }
            self.gen_expr(&args[0])?;
            self.emit(Instr::StrLen);
            return Ok(());
        }

        let label = *self.procedures.get(&name).ok_or_else(|| CodeGenError::UndeclaredProcedure {
            name: self.interner.resolve(name).to_string(),
            line,
        })?;
        for arg in args {
            self.gen_expr(arg)?;
        }
        self.emit(Instr::PushA(label));
        self.emit(Instr::Call);
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assignment { lhs, rhs, line } => self.gen_assignment(lhs, rhs, *line)?,
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let l_else = self.fresh_label();
                let l_end = self.fresh_label();
                self.gen_expr(cond)?;
                self.emit(Instr::Jz(l_else));
                self.gen_stmt(then_branch)?;
                self.emit(Instr::Jump(l_end));
                self.emit_label(l_else);
                if let Some(else_branch) = else_branch {
                    self.gen_stmt(else_branch)?;
                }
                self.emit_label(l_end);
            }
            Stmt::While { cond, body, .. } => {
                let l_start = self.fresh_label();
                let l_end = self.fresh_label();
                self.emit_label(l_start);
                self.gen_expr(cond)?;
                self.emit(Instr::Jz(l_end));
                self.gen_stmt(body)?;
                self.emit(Instr::Jump(l_start));
                self.emit_label(l_end);
            }
            Stmt::For {
                var,
                start,
                end,
                direction,
                body,
                line,
            } => self.gen_for(*var, start, end, *direction, body, *line)?,
            Stmt::Read { targets, line, .. } => {
                for target in targets {
                    self.gen_read_target(target, *line)?;
                }
            }
            Stmt::Write { args, .. } => {
                for arg in args {
                    if let Expr::StringConst(_, _) = arg {
                        self.gen_expr(arg)?;
                        self.emit(Instr::WriteS);
                    } else {
                        self.gen_expr(arg)?;
                        self.emit(Instr::WriteI);
                    }
                }
            }
            Stmt::Compound(stmts) => {
                for stmt in stmts {
                    self.gen_stmt(stmt)?;
                }
            }
            Stmt::ProcedureCall { name, args, line } => {
                self.emit_call(*name, args, *line)?;
            }
            Stmt::Empty => {}
        }
        Ok(())
    }

    fn gen_assignment(&mut self, lhs: &Expr, rhs: &Expr, line: u32) -> Result<()> {
        match lhs {
            Expr::Variable(name, _) => {
                let (kind, offset, _) =
                    self.resolve(*name).ok_or_else(|| self.undeclared(*name, line))?;
                self.gen_expr(rhs)?;
                self.emit_store_var(kind, offset);
            }
            Expr::ArrayAccess { name, index, line } => {
                match self.gen_indexed(*name, index, *line)? {
                    IndexedKind::StringChar => {
                        return Err(CodeGenError::StringElementWriteUnsupported { line: *line })
                    }
                    IndexedKind::Element(_) => {
                        self.gen_expr(rhs)?;
                        self.emit(Instr::Store0);
                    }
                }
            }
            _ => {
                return Err(CodeGenError::Internal(format!(
                    "line {line}: invalid assignment target"
                )))
            }
        }
        Ok(())
    }

    fn gen_read_target(&mut self, target: &Expr, line: u32) -> Result<()> {
        match target {
            Expr::Variable(name, _) => {
                let (kind, offset, ty) =
                    self.resolve(*name).ok_or_else(|| self.undeclared(*name, line))?;
                self.emit(Instr::Read);
                if matches!(ty, TypeExpr::Basic(BasicType::Integer)) {
                    self.emit(Instr::Atoi);
                }
                self.emit_store_var(kind, offset);
            }
            Expr::ArrayAccess { name, index, line } => {
                match self.gen_indexed(*name, index, *line)? {
                    IndexedKind::StringChar => {
                        return Err(CodeGenError::StringElementWriteUnsupported { line: *line })
                    }
                    IndexedKind::Element(elem_ty) => {
                        self.emit(Instr::Read);
                        if matches!(elem_ty, TypeExpr::Basic(BasicType::Integer)) {
                            self.emit(Instr::Atoi);
                        }
                        self.emit(Instr::Store0);
                    }
                }
            }
            _ => {
                return Err(CodeGenError::Internal(format!(
                    "line {line}: invalid read target"
                )))
            }
        }
        Ok(())
    }

    fn gen_for(
        &mut self,
        var: Symbol,
        start: &Expr,
        end: &Expr,
        direction: ForDirection,
        body: &Stmt,
        line: u32,
    ) -> Result<()> {
        let (kind, offset, _) = self.resolve(var).ok_or_else(|| self.undeclared(var, line))?;
        self.gen_expr(start)?;
        self.emit_store_var(kind, offset);

        let l_loop = self.fresh_label();
        let l_end = self.fresh_label();
        self.emit_label(l_loop);
        self.emit_read_var(kind, offset);
        self.gen_expr(end)?;
        match direction {
            ForDirection::To => self.emit(Instr::InfEq),
            ForDirection::DownTo => self.emit(Instr::SupEq),
        }
        self.emit(Instr::Jz(l_end));
        self.gen_stmt(body)?;
        self.emit_read_var(kind, offset);
        self.emit(Instr::PushI(1));
        match direction {
            ForDirection::To => self.emit(Instr::Add),
            ForDirection::DownTo => self.emit(Instr::Sub),
        }
        self.emit_store_var(kind, offset);
        self.emit(Instr::Jump(l_loop));
        self.emit_label(l_end);
        Ok(())
    }

    /// Program prologue/epilogue and block layout (§4.6): `PUSHI 0; PUSHI
    /// 0; START`, the global allocation and subprogram bodies, the `Lmain`
    /// label, the main compound statement, then `STOP`.
    fn compile_program(&mut self, program: &Program) -> Result<()> {
        self.emit(Instr::PushI(0));
        self.emit(Instr::PushI(0));
        self.emit(Instr::Start);

        let added = declare_vars(&mut self.global, &program.block.declarations);
        if added > 0 {
            self.emit(Instr::PushN(added));
        }

        let l_main = self.fresh_label();
        self.emit(Instr::Jump(l_main));

        // Subprogram entry labels are allocated before any body is
        // compiled so mutually recursive calls within this block resolve
        // regardless of declaration order.
        for sp in &program.block.subprograms {
            let label = self.fresh_label();
            self.procedures.insert(sp.name(), label);
        }
        for sp in &program.block.subprograms {
            self.compile_subprogram(sp)?;
        }

        self.emit_label(l_main);
        for stmt in &program.block.body {
            self.gen_stmt(stmt)?;
        }
        self.emit(Instr::Stop);
        Ok(())
    }

    /// The 8-step subprogram compilation procedure (§4.6).
    fn compile_subprogram(&mut self, sp: &Subprogram) -> Result<()> {
        let label = *self
            .procedures
            .get(&sp.name())
            .expect("entry labels are pre-allocated for every subprogram in this block");
        self.emit_label(label);

        let block = sp.block();
        if !block.subprograms.is_empty() {
            return Err(CodeGenError::NestedSubprogramUnsupported { line: sp.line() });
        }

        let mut frame = Frame::new();
        frame.mark_subprogram_local();

        // Parameters, flattened in source order, assigned offsets -n..-1
        // back-to-front so the last one sits at -1 (§4.6 step 3).
        let params = sp.params();
        let n = params.iter().map(|p| p.names.len()).sum::<usize>() as i32;
        let mut index = 0i32;
        for param in params {
            for &name in &param.names {
                frame.declare_at(name, param.ty.clone(), index - n);
                index += 1;
            }
        }

        frame.set_current_offset(0);
        let is_function = if let Subprogram::Function(f) = sp {
            let sentinel = self.interner.intern(RETURN_SLOT_SENTINEL);
            frame.declare_at(sentinel, f.ret_ty.clone(), 0);
            frame.declare_at(f.name, f.ret_ty.clone(), 0);
            frame.set_current_offset(1);
            true
        } else {
            false
        };
        self.locals = Some(frame);
        if is_function {
            self.emit(Instr::PushI(0));
        }

        // Subprogram-local `var` declarations get their own slots after
        // the return sentinel, mirroring the global block's allocation;
        // the worked example in §4.6 has none, so this is a generalization
        // (see DESIGN.md).
        let added = declare_vars(self.locals.as_mut().unwrap(), &block.declarations);
        if added > 0 {
            self.emit(Instr::PushN(added));
        }

        for stmt in &block.body {
            self.gen_stmt(stmt)?;
        }

        if is_function {
            self.emit(Instr::PushL(0));
        }
        self.emit(Instr::Return);
        self.locals = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ewvmc_util::diagnostic::Handler;

    fn compile(source: &str) -> Vec<String> {
        let mut interner = Interner::new();
        let mut handler = Handler::new();
        let mut program = ewvmc_par::parse(source, &mut interner, &mut handler)
            .expect("source must parse for this test");
        assert!(!handler.has_errors(), "unexpected parse errors: {:?}", handler.diagnostics());
        ewvmc_sem::analyze(&program, &interner, &handler);
        assert!(!handler.has_errors(), "unexpected semantic errors: {:?}", handler.diagnostics());
        ewvmc_opt::optimize(&mut program);
        generate(&program, &mut interner).expect("code generation must succeed for this test")
    }

    #[test]
    fn constant_folding_reaches_the_generated_assignment() {
        let lines = compile("program p; var x: integer; begin x := 3 + 4 end.");
        assert_eq!(lines[0], "PUSHI 0");
        assert_eq!(lines[1], "PUSHI 0");
        assert_eq!(lines[2], "START");
        assert!(lines.contains(&"PUSHN 1".to_string()));
        assert!(lines.contains(&"PUSHI 7".to_string()));
        assert!(lines.contains(&"STOREG 0".to_string()));
        assert_eq!(lines.last().unwrap(), "STOP");
    }

    #[test]
    fn a_for_loop_uses_infeq_and_increments_the_global_counter() {
        let lines =
            compile("program p; var i: integer; begin for i := 1 to 3 do write(i) end.");
        assert!(lines.contains(&"PUSHG 0".to_string()));
        assert!(lines.contains(&"WRITEI".to_string()));
        assert!(lines.contains(&"INFEQ".to_string()));
        assert!(lines.windows(3).any(|w| w
            == ["PUSHG 0".to_string(), "PUSHI 1".to_string(), "ADD".to_string()]));
    }

    #[test]
    fn a_function_call_uses_negative_parameter_offsets_and_returns_through_the_sentinel() {
        let lines = compile(
            "program p; function sq(n: integer): integer; begin sq := n * n end; \
             var x: integer; begin x := sq(5) end.",
        );
        assert!(lines.contains(&"PUSHL -1".to_string()));
        assert!(lines.windows(2).any(|w| w == ["PUSHL 0".to_string(), "RETURN".to_string()]));
        assert!(lines.contains(&"CALL".to_string()));
    }

    #[test]
    fn one_char_string_equality_uses_the_fast_path() {
        let lines = compile(
            "program p; var s: string; begin s := 'hi'; if s[1] = 'h' then write(1) end.",
        );
        assert!(lines.contains(&"CHARAT".to_string()));
        assert!(lines.contains(&"PUSHI 104".to_string()));
        assert!(!lines.contains(&"PUSHS \"h\"".to_string()));
    }

    #[test]
    fn string_indexing_pushes_the_string_value_and_a_zero_based_index_for_charat() {
        // CHARAT consumes two operands, the string value and a zero-based
        // index - not a computed address. `s[i]` must read the slot
        // directly (`PUSHG k`, not `PUSHGP; PUSHI k; PADD`), push the index,
        // and normalize the 1-based source index with `PUSHI 1; SUB`, with
        // no trailing `PADD` fusing the two into one address.
        let lines = compile(
            "program p; var s: string; i: integer; c: boolean; \
             begin i := 1; c := s[i] = s[i] end.",
        );
        assert!(lines.contains(&"CHARAT".to_string()));
        assert!(!lines.contains(&"PADD".to_string()));
        assert!(lines.windows(4).any(|w| w[0].starts_with("PUSHG")
            && w[1].starts_with("PUSHG")
            && w[2] == "PUSHI 1"
            && w[3] == "SUB"));
    }

    #[test]
    fn a_program_with_no_global_vars_emits_no_pushn() {
        let lines = compile("program p; begin if true then write(1) else write(2) end.");
        assert!(!lines.iter().any(|l| l.starts_with("PUSHN")));
    }

    #[test]
    fn a_nonzero_lower_bound_array_write_normalizes_the_index() {
        let lines =
            compile("program p; var a: array[10..12] of integer; begin a[10] := 0 end.");
        assert!(lines.windows(2).any(|w| w == ["PUSHI 10".to_string(), "SUB".to_string()]));
        assert!(lines.contains(&"STORE 0".to_string()));
    }

    #[test]
    fn a_statically_true_condition_emits_only_the_taken_branch() {
        let lines = compile("program p; begin if true then write(1) else write(2) end.");
        assert!(!lines.contains(&"JZ L0".to_string()) || !lines.iter().any(|l| l == "JZ L0"));
        assert!(lines.iter().filter(|l| l.as_str() == "WRITEI").count() == 1);
        assert!(!lines.iter().any(|l| l.starts_with("JZ")));
    }

    #[test]
    fn recursive_calls_resolve_even_when_the_subprogram_calls_itself() {
        let lines = compile(
            "program p; function fact(n: integer): integer; \
             begin if n <= 1 then fact := 1 else fact := n * fact(n - 1) end; \
             var x: integer; begin x := fact(5) end.",
        );
        assert_eq!(lines.iter().filter(|l| l.as_str() == "CALL").count(), 2);
    }

    #[test]
    fn a_procedure_call_statement_still_emits_a_call() {
        let lines = compile(
            "program p; procedure greet; begin write(1) end; begin greet() end.",
        );
        assert!(lines.contains(&"CALL".to_string()));
    }

    #[test]
    fn writing_a_string_literal_uses_writes() {
        let lines = compile("program p; begin write('hi') end.");
        assert!(lines.contains(&"WRITES".to_string()));
        assert!(lines.contains(&"PUSHS \"hi\"".to_string()));
    }

    #[test]
    fn reading_an_integer_target_emits_atoi() {
        let lines = compile("program p; var x: integer; begin read(x) end.");
        assert!(lines.contains(&"READ".to_string()));
        assert!(lines.contains(&"ATOI".to_string()));
        assert!(lines.contains(&"STOREG 0".to_string()));
    }

    #[test]
    fn length_compiles_to_strlen_not_a_call() {
        let lines =
            compile("program p; var s: string; x: integer; begin x := length(s) end.");
        assert!(lines.contains(&"STRLEN".to_string()));
        assert!(!lines.contains(&"CALL".to_string()));
    }

    #[test]
    fn real_arithmetic_is_a_hard_codegen_error() {
        let mut interner = Interner::new();
        let mut handler = Handler::new();
        let mut program = ewvmc_par::parse(
            "program p; var x: real; begin x := 1.5 + 2.0 end.",
            &mut interner,
            &mut handler,
        )
        .unwrap();
        ewvmc_sem::analyze(&program, &interner, &handler);
        assert!(!handler.has_errors());
        ewvmc_opt::optimize(&mut program);
        let err = generate(&program, &mut interner).unwrap_err();
        assert!(matches!(err, CodeGenError::RealArithmeticUnsupported { .. }));
    }

    #[test]
    fn assigning_into_a_string_character_is_a_hard_codegen_error() {
        let mut interner = Interner::new();
        let mut handler = Handler::new();
        let mut program = ewvmc_par::parse(
            "program p; var s: string; begin s[1] := 'h' end.",
            &mut interner,
            &mut handler,
        )
        .unwrap();
        ewvmc_sem::analyze(&program, &interner, &handler);
        ewvmc_opt::optimize(&mut program);
        let err = generate(&program, &mut interner).unwrap_err();
        assert!(matches!(err, CodeGenError::StringElementWriteUnsupported { .. }));
    }
}

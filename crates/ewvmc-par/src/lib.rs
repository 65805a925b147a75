//! ewvmc-par - recursive-descent parser for the Pascal-standard source
//! language, producing the closed-sum tree defined in [`ast`].
//!
//! The grammar is precedence-climbing rather than table-driven: each
//! precedence tier from §4.3 (relational, `OR`, `AND`, additive,
//! multiplicative, unary) gets its own `parse_*` method that calls the next
//! tier up for its operands, the usual recursive-descent encoding of an
//! operator-precedence table.
//!
//! Two productions recover from a single malformed declaration or statement
//! by resynchronizing to the next `;` (§4.3); everywhere else a parse
//! failure is reported through the [`Handler`] and a best-effort tree is
//! still produced so that later phases see as much of the program as
//! possible.

pub mod ast;

use ast::*;
use ewvmc_lex::{Lexer, Token};
use ewvmc_util::diagnostic::{Diagnostic, Handler};
use ewvmc_util::{Interner, Span, Symbol};

/// Lexes `source` in full and parses it into a [`Program`].
///
/// Returns `None` only when the token stream could not be shaped into a
/// `Program` at all; lesser failures are recorded in `handler` and
/// recovered from in place, realizing §4.3's "ast-or-null, errors,
/// warnings" contract as `Option<Program>` plus `handler.has_errors()` /
/// `handler.warning_count()`.
pub fn parse(source: &str, interner: &mut Interner, handler: &mut Handler) -> Option<Program> {
    let mut lexer = Lexer::new(source, interner, handler);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok.0 == Token::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    let mut parser = Parser::new(tokens, handler, interner);
    parser.parse_program()
}

/// Owns the fully materialized token stream for one source file and a
/// cursor into it. Buffering the whole stream (rather than pulling tokens
/// lazily from the lexer) keeps lookahead trivial for the recovery
/// productions, which need to scan forward to the next `;` without
/// re-lexing.
pub struct Parser<'a> {
    tokens: Vec<(Token, u32, u32)>,
    pos: usize,
    handler: &'a Handler,
    interner: &'a mut Interner,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: Vec<(Token, u32, u32)>,
        handler: &'a Handler,
        interner: &'a mut Interner,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            handler,
            interner,
        }
    }

    // -- token stream helpers -------------------------------------------------

    fn current(&self) -> &(Token, u32, u32) {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn tok(&self) -> &Token {
        &self.current().0
    }

    fn line(&self) -> u32 {
        self.current().1
    }

    fn column(&self) -> u32 {
        self.current().2
    }

    fn at_eof(&self) -> bool {
        matches!(self.tok(), Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().0.clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, tok: &Token) -> bool {
        self.tok() == tok
    }

    fn accept(&mut self, tok: &Token) -> bool {
        if self.check(tok) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// A placeholder identifier used only when a required name is missing
    /// from malformed input; the tree still needs a `Symbol` in that slot so
    /// later phases can keep walking instead of aborting on the spot.
    fn error_symbol(&mut self) -> Symbol {
        self.interner.intern("<error>")
    }

    /// Consumes `tok` or reports a global parse error with the heuristic
    /// hints described in §4.3 (a stray `;` near a semicolon-shaped mismatch,
    /// or a misplaced `var`).
    fn expect(&mut self, tok: Token) -> bool {
        if self.accept(&tok) {
            return true;
        }
        let mut diag = Diagnostic::error(
            format!("expected {:?}, found {:?}", tok, self.tok()),
            Span::point(self.line(), self.column()),
        );
        if tok == Token::Semicolon {
            diag = diag.with_help("a stray ';' may be missing near here");
        }
        if self.check(&Token::Var) {
            diag = diag.with_help("'var' must appear once, before the first declaration");
        }
        self.handler.emit_diagnostic(diag);
        false
    }

    fn expect_ident(&mut self) -> Option<Symbol> {
        if let Token::Ident(sym) = self.tok().clone() {
            self.advance();
            Some(sym)
        } else {
            self.handler.emit_diagnostic(Diagnostic::error(
                format!("expected identifier, found {:?}", self.tok()),
                Span::point(self.line(), self.column()),
            ));
            None
        }
    }

    fn expect_integer(&mut self) -> i64 {
        if let Token::IntegerLit(v) = self.tok().clone() {
            self.advance();
            v
        } else {
            self.handler.emit_diagnostic(Diagnostic::error(
                format!("expected integer literal, found {:?}", self.tok()),
                Span::point(self.line(), self.column()),
            ));
            0
        }
    }

    /// Resynchronizes to the next `;` (consuming it), or to `end`/EOF if no
    /// `;` appears first. Backs both recovery productions in §4.3.
    fn recover_to_semicolon(&mut self, message: &str) {
        self.handler.emit_diagnostic(Diagnostic::warning(
            message,
            Span::point(self.line(), self.column()),
        ));
        while !self.at_eof() && !self.check(&Token::Semicolon) && !self.check(&Token::End) {
            self.advance();
        }
        self.accept(&Token::Semicolon);
    }

    // -- program structure -----------------------------------------------------

    pub fn parse_program(&mut self) -> Option<Program> {
        let line = self.line();
        self.expect(Token::Program);
        let name = self.expect_ident().unwrap_or_else(|| self.error_symbol());
        self.expect(Token::Semicolon);
        let block = self.parse_block();
        self.expect(Token::Dot);
        Some(Program { name, block, line })
    }

    fn starts_subprogram(&self) -> bool {
        matches!(self.tok(), Token::Function | Token::Procedure)
    }

    /// Normalizes the five flexible orderings of §4.3 into one fixed-shape
    /// `Block`: at most one declarations run and one subprograms run, in
    /// either order, always followed by the compound statement body.
    fn parse_block(&mut self) -> Block {
        let mut declarations = Vec::new();
        let mut subprograms = Vec::new();

        if self.check(&Token::Var) {
            declarations = self.parse_declarations();
            if self.starts_subprogram() {
                subprograms = self.parse_subprograms();
            }
        } else if self.starts_subprogram() {
            subprograms = self.parse_subprograms();
            if self.check(&Token::Var) {
                declarations = self.parse_declarations();
            }
        }

        let body = self.parse_compound_statement();
        Block {
            subprograms,
            declarations,
            body,
        }
    }

    fn parse_declarations(&mut self) -> Vec<Declaration> {
        self.expect(Token::Var);
        let mut decls = Vec::new();
        while matches!(self.tok(), Token::Ident(_)) {
            if let Some(d) = self.parse_one_declaration() {
                decls.push(d);
            }
        }
        decls
    }

    /// declaration -> id_list ':' type ';' | error ';'
    fn parse_one_declaration(&mut self) -> Option<Declaration> {
        let line = self.line();
        let names = self.parse_id_list();
        if names.is_empty() || !self.check(&Token::Colon) {
            self.recover_to_semicolon("invalid declaration ignored, resuming at ';'");
            return None;
        }
        self.expect(Token::Colon);
        let ty = self.parse_type();
        if !self.expect(Token::Semicolon) {
            self.recover_to_semicolon("invalid declaration ignored, resuming at ';'");
            return None;
        }
        Some(Declaration { names, ty, line })
    }

    fn parse_id_list(&mut self) -> Vec<Symbol> {
        let mut names = Vec::new();
        if let Some(s) = self.expect_ident() {
            names.push(s);
        } else {
            return names;
        }
        while self.accept(&Token::Comma) {
            if let Some(s) = self.expect_ident() {
                names.push(s);
            }
        }
        names
    }

    fn parse_type(&mut self) -> TypeExpr {
        if self.accept(&Token::Array) {
            self.expect(Token::LBracket);
            let lo = self.expect_integer();
            self.expect(Token::DotDot);
            let hi = self.expect_integer();
            self.expect(Token::RBracket);
            self.expect(Token::Of);
            let elem = self.parse_type();
            TypeExpr::Array {
                lo,
                hi,
                elem: Box::new(elem),
            }
        } else {
            TypeExpr::Basic(self.parse_basic_type())
        }
    }

    fn parse_basic_type(&mut self) -> BasicType {
        match self.tok() {
            Token::Integer => {
                self.advance();
                BasicType::Integer
            }
            Token::Boolean => {
                self.advance();
                BasicType::Boolean
            }
            Token::StringKw => {
                self.advance();
                BasicType::String
            }
            _ => {
                self.handler.emit_diagnostic(Diagnostic::error(
                    format!("expected a type name, found {:?}", self.tok()),
                    Span::point(self.line(), self.column()),
                ));
                BasicType::Integer
            }
        }
    }

    fn parse_subprograms(&mut self) -> Vec<Subprogram> {
        let mut subs = Vec::new();
        while self.starts_subprogram() {
            subs.push(self.parse_subprogram());
        }
        subs
    }

    fn parse_formal_parameters(&mut self) -> Vec<Param> {
        if !self.accept(&Token::LParen) {
            return Vec::new();
        }
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let names = self.parse_id_list();
                self.expect(Token::Colon);
                let ty = self.parse_type();
                params.push(Param { names, ty });
                if !self.accept(&Token::Semicolon) {
                    break;
                }
            }
        }
        self.expect(Token::RParen);
        params
    }

    fn parse_subprogram(&mut self) -> Subprogram {
        let line = self.line();
        if self.accept(&Token::Function) {
            let name = self.expect_ident().unwrap_or_else(|| self.error_symbol());
            let params = self.parse_formal_parameters();
            self.expect(Token::Colon);
            let ret_ty = TypeExpr::Basic(self.parse_basic_type());
            self.expect(Token::Semicolon);
            let block = self.parse_block();
            self.expect(Token::Semicolon);
            Subprogram::Function(FunctionDecl {
                name,
                params,
                ret_ty,
                block,
                line,
            })
        } else {
            self.expect(Token::Procedure);
            let name = self.expect_ident().unwrap_or_else(|| self.error_symbol());
            let params = self.parse_formal_parameters();
            self.expect(Token::Semicolon);
            let block = self.parse_block();
            self.expect(Token::Semicolon);
            Subprogram::Procedure(ProcedureDecl {
                name,
                params,
                block,
                line,
            })
        }
    }

    // -- statements --------------------------------------------------------

    fn parse_compound_statement(&mut self) -> Vec<Stmt> {
        self.expect(Token::Begin);
        let mut stmts = Vec::new();
        loop {
            if self.check(&Token::End) || self.at_eof() {
                break;
            }
            if let Some(s) = self.parse_statement() {
                stmts.push(s);
            }
            if !self.accept(&Token::Semicolon) {
                break;
            }
        }
        self.expect(Token::End);
        stmts
    }

    fn parse_statement_required(&mut self) -> Stmt {
        self.parse_statement().unwrap_or(Stmt::Empty)
    }

    /// statement -> ... | error ';'
    ///
    /// Returns `None` when the leading token cannot start any statement
    /// form; the caller resynchronizes to `;` and discards the slot.
    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.tok().clone() {
            Token::Ident(name) => {
                let line = self.line();
                self.advance();
                Some(self.parse_ident_led_statement(name, line))
            }
            Token::If => Some(self.parse_if_stmt()),
            Token::While => Some(self.parse_while_stmt()),
            Token::For => Some(self.parse_for_stmt()),
            Token::Read | Token::ReadLn => Some(self.parse_read_stmt()),
            Token::Write | Token::WriteLn => Some(self.parse_write_stmt()),
            Token::Begin => Some(Stmt::Compound(self.parse_compound_statement())),
            Token::Semicolon | Token::End => Some(Stmt::Empty),
            _ => {
                self.recover_to_semicolon("invalid statement ignored, resuming at ';'");
                None
            }
        }
    }

    fn parse_ident_led_statement(&mut self, name: Symbol, line: u32) -> Stmt {
        if self.accept(&Token::LBracket) {
            let index = self.parse_expr();
            self.expect(Token::RBracket);
            self.expect(Token::Assign);
            let rhs = self.parse_expr();
            return Stmt::Assignment {
                lhs: Expr::ArrayAccess {
                    name,
                    index: Box::new(index),
                    line,
                },
                rhs,
                line,
            };
        }
        if self.accept(&Token::Assign) {
            let rhs = self.parse_expr();
            return Stmt::Assignment {
                lhs: Expr::Variable(name, line),
                rhs,
                line,
            };
        }
        // The original grammar only recognizes a procedure-call statement
        // through `ID LPAREN RPAREN` / `ID LPAREN args RPAREN`; a bare
        // identifier with no `(...)` is not a valid statement form.
        if !self.expect(Token::LParen) {
            return Stmt::Empty;
        }
        let args = self.parse_arg_list();
        self.expect(Token::RParen);
        Stmt::ProcedureCall { name, args, line }
    }

    fn parse_arg_list(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr());
            while self.accept(&Token::Comma) {
                args.push(self.parse_expr());
            }
        }
        args
    }

    fn parse_if_stmt(&mut self) -> Stmt {
        let line = self.line();
        self.expect(Token::If);
        let cond = self.parse_expr();
        self.expect(Token::Then);
        let then_branch = Box::new(self.parse_statement_required());
        let else_branch = if self.accept(&Token::Else) {
            Some(Box::new(self.parse_statement_required()))
        } else {
            None
        };
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            line,
        }
    }

    fn parse_while_stmt(&mut self) -> Stmt {
        let line = self.line();
        self.expect(Token::While);
        let cond = self.parse_expr();
        self.expect(Token::Do);
        let body = Box::new(self.parse_statement_required());
        Stmt::While { cond, body, line }
    }

    fn parse_for_stmt(&mut self) -> Stmt {
        let line = self.line();
        self.expect(Token::For);
        let var = self.expect_ident().unwrap_or_else(|| self.error_symbol());
        self.expect(Token::Assign);
        let start = self.parse_expr();
        let direction = if self.accept(&Token::DownTo) {
            ForDirection::DownTo
        } else {
            self.expect(Token::To);
            ForDirection::To
        };
        let end = self.parse_expr();
        self.expect(Token::Do);
        let body = Box::new(self.parse_statement_required());
        Stmt::For {
            var,
            start,
            end,
            direction,
            body,
            line,
        }
    }

    fn parse_designator(&mut self) -> Expr {
        let line = self.line();
        let name = self.expect_ident().unwrap_or_else(|| self.error_symbol());
        if self.accept(&Token::LBracket) {
            let index = self.parse_expr();
            self.expect(Token::RBracket);
            Expr::ArrayAccess {
                name,
                index: Box::new(index),
                line,
            }
        } else {
            Expr::Variable(name, line)
        }
    }

    fn parse_read_stmt(&mut self) -> Stmt {
        let line = self.line();
        let kind = if self.accept(&Token::Read) {
            ReadKind::Read
        } else {
            self.expect(Token::ReadLn);
            ReadKind::ReadLn
        };
        self.expect(Token::LParen);
        let mut targets = Vec::new();
        if !self.check(&Token::RParen) {
            targets.push(self.parse_designator());
            while self.accept(&Token::Comma) {
                targets.push(self.parse_designator());
            }
        }
        self.expect(Token::RParen);
        Stmt::Read { kind, targets, line }
    }

    fn parse_write_stmt(&mut self) -> Stmt {
        let line = self.line();
        let kind = if self.accept(&Token::Write) {
            WriteKind::Write
        } else {
            self.expect(Token::WriteLn);
            WriteKind::WriteLn
        };
        self.expect(Token::LParen);
        let args = self.parse_arg_list();
        self.expect(Token::RParen);
        Stmt::Write { kind, args, line }
    }

    // -- expressions: precedence climbing, low to high ----------------------
    //
    // relational (nonassoc) -> OR -> AND -> additive -> multiplicative ->
    // unary (NOT / unary MINUS) -> primary

    pub fn parse_expr(&mut self) -> Expr {
        self.parse_relational()
    }

    fn parse_relational(&mut self) -> Expr {
        let lhs = self.parse_or();
        let op = match self.tok() {
            Token::Eq => BinOp::Eq,
            Token::NotEq => BinOp::NotEq,
            Token::Lt => BinOp::Lt,
            Token::Gt => BinOp::Gt,
            Token::LtEq => BinOp::Le,
            Token::GtEq => BinOp::Ge,
            _ => return lhs,
        };
        let line = self.line();
        self.advance();
        let rhs = self.parse_or();
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            line,
        }
    }

    fn parse_or(&mut self) -> Expr {
        let mut lhs = self.parse_and();
        while self.check(&Token::Or) {
            let line = self.line();
            self.advance();
            let rhs = self.parse_and();
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        lhs
    }

    fn parse_and(&mut self) -> Expr {
        let mut lhs = self.parse_additive();
        while self.check(&Token::And) {
            let line = self.line();
            self.advance();
            let rhs = self.parse_additive();
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        lhs
    }

    fn parse_additive(&mut self) -> Expr {
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = match self.tok() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_multiplicative();
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            let op = match self.tok() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Div => BinOp::Div,
                Token::Mod => BinOp::Mod,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.parse_unary();
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        let line = self.line();
        if self.accept(&Token::Not) {
            let expr = self.parse_unary();
            return Expr::Unary {
                op: UnOp::Not,
                expr: Box::new(expr),
                line,
            };
        }
        if self.accept(&Token::Minus) {
            let expr = self.parse_unary();
            return Expr::Unary {
                op: UnOp::Neg,
                expr: Box::new(expr),
                line,
            };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Expr {
        let line = self.line();
        match self.tok().clone() {
            Token::IntegerLit(v) => {
                self.advance();
                Expr::IntegerConst(v, line)
            }
            Token::RealLit(v) => {
                self.advance();
                Expr::RealConst(v, line)
            }
            Token::StringLit(s) => {
                self.advance();
                Expr::StringConst(s, line)
            }
            Token::True => {
                self.advance();
                Expr::BooleanConst(true, line)
            }
            Token::False => {
                self.advance();
                Expr::BooleanConst(false, line)
            }
            Token::LParen => {
                self.advance();
                let e = self.parse_expr();
                self.expect(Token::RParen);
                e
            }
            Token::Ident(name) => {
                self.advance();
                if self.accept(&Token::LBracket) {
                    let index = self.parse_expr();
                    self.expect(Token::RBracket);
                    Expr::ArrayAccess {
                        name,
                        index: Box::new(index),
                        line,
                    }
                } else if self.accept(&Token::LParen) {
                    let args = self.parse_arg_list();
                    self.expect(Token::RParen);
                    Expr::Call { name, args, line }
                } else {
                    Expr::Variable(name, line)
                }
            }
            other => {
                self.handler.emit_diagnostic(Diagnostic::error(
                    format!("expected an expression, found {:?}", other),
                    Span::point(self.line(), self.column()),
                ));
                if !self.at_eof() {
                    self.advance();
                }
                Expr::IntegerConst(0, line)
            }
        }
    }
}

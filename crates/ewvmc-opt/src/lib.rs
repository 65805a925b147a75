//! ewvmc-opt - constant folding and dead-branch elimination over the parsed
//! tree (§4.5).
//!
//! The pass is a post-order AST rewrite: every statement and expression is
//! reconstructed bottom-up, so a parent node always sees its children
//! already folded by the time it tries to fold itself. Unlike
//! `ewvmc-sem`'s analyzer, this pass owns the tree outright (it runs after
//! semantic analysis has either approved the program or aborted the
//! pipeline) and rewrites it in place rather than annotating it.
//!
//! Only the handful of shapes named in §4.5 are rewritten; everything else
//! passes through unchanged. Division and modulo by a constant zero abort
//! folding for that one node rather than panicking or propagating an
//! error - the original division-by-zero is left for the Target VM to
//! fault on at run time, mirroring the teacher's own "leave the node as-is"
//! fixpoint passes in `faxc-lir::opt::optimize`.

use ewvmc_par::ast::{BinOp, Block, Expr, Program, Stmt, Subprogram, UnOp};

/// Runs the optimizer over `program` in place and returns the number of
/// nodes it rewrote. A return value of `0` means the tree was already in
/// normal form - running the pass again is a no-op (§8 "idempotent
/// optimizer").
pub fn optimize(program: &mut Program) -> usize {
    let mut opt = Optimizer::new();
    opt.run(program);
    opt.rewrites
}

struct Optimizer {
    rewrites: usize,
}

impl Optimizer {
    fn new() -> Self {
        Self { rewrites: 0 }
    }

    fn run(&mut self, program: &mut Program) {
        self.fold_block(&mut program.block);
    }

    fn fold_block(&mut self, block: &mut Block) {
        for sub in &mut block.subprograms {
            match sub {
                Subprogram::Function(f) => self.fold_block(&mut f.block),
                Subprogram::Procedure(p) => self.fold_block(&mut p.block),
            }
        }
        let body = std::mem::take(&mut block.body);
        block.body = body.into_iter().map(|s| self.fold_stmt(s)).collect();
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Stmt {
        match stmt {
            Stmt::Assignment { lhs, rhs, line } => Stmt::Assignment {
                lhs: self.fold_expr(lhs),
                rhs: self.fold_expr(rhs),
                line,
            },
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                line,
            } => {
                let cond = self.fold_expr(cond);
                let then_branch = Box::new(self.fold_stmt(*then_branch));
                let else_branch = else_branch.map(|b| Box::new(self.fold_stmt(*b)));
                match cond {
                    Expr::BooleanConst(true, _) => {
                        self.rewrites += 1;
                        *then_branch
                    }
                    Expr::BooleanConst(false, _) => {
                        self.rewrites += 1;
                        match else_branch {
                            Some(b) => *b,
                            None => Stmt::Empty,
                        }
                    }
                    cond => Stmt::If {
                        cond,
                        then_branch,
                        else_branch,
                        line,
                    },
                }
            }
            Stmt::While { cond, body, line } => Stmt::While {
                cond: self.fold_expr(cond),
                body: Box::new(self.fold_stmt(*body)),
                line,
            },
            Stmt::For {
                var,
                start,
                end,
                direction,
                body,
                line,
            } => Stmt::For {
                var,
                start: self.fold_expr(start),
                end: self.fold_expr(end),
                direction,
                body: Box::new(self.fold_stmt(*body)),
                line,
            },
            Stmt::Read { kind, targets, line } => Stmt::Read {
                kind,
                targets: targets.into_iter().map(|t| self.fold_expr(t)).collect(),
                line,
            },
            Stmt::Write { kind, args, line } => Stmt::Write {
                kind,
                args: args.into_iter().map(|a| self.fold_expr(a)).collect(),
                line,
            },
            Stmt::Compound(stmts) => {
                Stmt::Compound(stmts.into_iter().map(|s| self.fold_stmt(s)).collect())
            }
            Stmt::ProcedureCall { name, args, line } => Stmt::ProcedureCall {
                name,
                args: args.into_iter().map(|a| self.fold_expr(a)).collect(),
                line,
            },
            Stmt::Empty => Stmt::Empty,
        }
    }

    fn fold_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::ArrayAccess { name, index, line } => Expr::ArrayAccess {
                name,
                index: Box::new(self.fold_expr(*index)),
                line,
            },
            Expr::Binary { op, lhs, rhs, line } => {
                let lhs = self.fold_expr(*lhs);
                let rhs = self.fold_expr(*rhs);
                self.fold_binary(op, lhs, rhs, line)
            }
            Expr::Unary { op, expr, line } => {
                let inner = self.fold_expr(*expr);
                self.fold_unary(op, inner, line)
            }
            Expr::Call { name, args, line } => Expr::Call {
                name,
                args: args.into_iter().map(|a| self.fold_expr(a)).collect(),
                line,
            },
            leaf => leaf,
        }
    }

    fn fold_binary(&mut self, op: BinOp, lhs: Expr, rhs: Expr, line: u32) -> Expr {
        if let (Expr::IntegerConst(a, _), Expr::IntegerConst(b, _)) = (&lhs, &rhs) {
            let (a, b) = (*a, *b);
            match op {
                BinOp::Add => {
                    self.rewrites += 1;
                    return Expr::IntegerConst(a.wrapping_add(b), line);
                }
                BinOp::Sub => {
                    self.rewrites += 1;
                    return Expr::IntegerConst(a.wrapping_sub(b), line);
                }
                BinOp::Mul => {
                    self.rewrites += 1;
                    return Expr::IntegerConst(a.wrapping_mul(b), line);
                }
                BinOp::Div if b != 0 => {
                    self.rewrites += 1;
                    return Expr::IntegerConst(floor_div(a, b), line);
                }
                BinOp::Mod if b != 0 => {
                    self.rewrites += 1;
                    return Expr::IntegerConst(floor_mod(a, b), line);
                }
                BinOp::Eq => {
                    self.rewrites += 1;
                    return Expr::BooleanConst(a == b, line);
                }
                // Division/modulo by a constant zero: leave the node as-is
                // (§4.5) rather than fold it or report an error here - it is
                // not this pass's job to diagnose, only to preserve meaning.
                _ => {}
            }
        }
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            line,
        }
    }

    fn fold_unary(&mut self, op: UnOp, operand: Expr, line: u32) -> Expr {
        if let (UnOp::Neg, Expr::IntegerConst(v, _)) = (op, &operand) {
            self.rewrites += 1;
            return Expr::IntegerConst(v.wrapping_neg(), line);
        }
        Expr::Unary {
            op,
            expr: Box::new(operand),
            line,
        }
    }
}

/// `a div b` truncated toward negative infinity, matching the source
/// language's `div` rather than Rust's truncate-toward-zero `/`.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// `a mod b` with the same floor-toward-negative-infinity quotient as
/// [`floor_div`], so `a == floor_div(a, b) * b + floor_mod(a, b)` always.
fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

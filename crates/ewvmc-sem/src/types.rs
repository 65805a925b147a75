//! Type descriptor for the checked language.
//!
//! Unlike `ewvmc-par`'s `TypeExpr` (a syntactic type name straight out of
//! the grammar), `Type` is the semantic descriptor every expression and
//! declared name carries once the analyzer has resolved it: a closed sum
//! of the four basic scalars, arrays over them, and two sentinels.
//! `Error` absorbs an already-diagnosed mismatch so one bad declaration
//! does not cascade into a wall of follow-on diagnostics; `Unknown` exists
//! only while a type is still being constructed and never escapes the
//! analyzer.

use ewvmc_par::ast;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer,
    Boolean,
    String,
    Real,
    Array { lo: i64, hi: i64, elem: Box<Type> },
    Error,
    Unknown,
}

impl Type {
    pub fn from_basic(basic: ast::BasicType) -> Type {
        match basic {
            ast::BasicType::Integer => Type::Integer,
            ast::BasicType::Boolean => Type::Boolean,
            ast::BasicType::String => Type::String,
            ast::BasicType::Real => Type::Real,
        }
    }

    pub fn from_type_expr(ty: &ast::TypeExpr) -> Type {
        match ty {
            ast::TypeExpr::Basic(basic) => Type::from_basic(*basic),
            ast::TypeExpr::Array { lo, hi, elem } => Type::Array {
                lo: *lo,
                hi: *hi,
                elem: Box::new(Type::from_type_expr(elem)),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Real)
    }

    /// `expected` is compatible with `actual` (§3.4/4.4 "expected ⇐ actual").
    /// `Error` is compatible with anything: it is the residue of an
    /// already-reported mismatch, and treating it as universally compatible
    /// keeps that single diagnostic from cascading. The one widening this
    /// language allows is `real ⇐ integer`: an integer value may flow into a
    /// `real`-typed target, never the reverse.
    pub fn is_compatible(&self, actual: &Type) -> bool {
        if self.is_error() || actual.is_error() {
            return true;
        }
        if *self == Type::Real && *actual == Type::Integer {
            return true;
        }
        self == actual
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer => write!(f, "integer"),
            Type::Boolean => write!(f, "boolean"),
            Type::String => write!(f, "string"),
            Type::Real => write!(f, "real"),
            Type::Array { lo, hi, elem } => write!(f, "array[{lo}..{hi}] of {elem}"),
            Type::Error => write!(f, "<error>"),
            Type::Unknown => write!(f, "<unknown>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_compatible_with_anything() {
        assert!(Type::Error.is_compatible(&Type::Integer));
        assert!(Type::Boolean.is_compatible(&Type::Error));
    }

    #[test]
    fn an_integer_widens_into_a_real_target_but_not_the_reverse() {
        assert!(Type::Real.is_compatible(&Type::Integer));
        assert!(!Type::Integer.is_compatible(&Type::Real));
    }

    #[test]
    fn same_basic_types_are_compatible() {
        assert!(Type::Integer.is_compatible(&Type::Integer));
        assert!(!Type::Integer.is_compatible(&Type::Boolean));
    }

    #[test]
    fn array_type_compatibility_checks_bounds_and_element() {
        let a = Type::Array {
            lo: 0,
            hi: 9,
            elem: Box::new(Type::Integer),
        };
        let b = Type::Array {
            lo: 0,
            hi: 9,
            elem: Box::new(Type::Integer),
        };
        let c = Type::Array {
            lo: 0,
            hi: 10,
            elem: Box::new(Type::Integer),
        };
        assert!(a.is_compatible(&b));
        assert!(!a.is_compatible(&c));
    }

    #[test]
    fn from_type_expr_lowers_nested_arrays() {
        let expr = ast::TypeExpr::Array {
            lo: 0,
            hi: 1,
            elem: Box::new(ast::TypeExpr::Basic(ast::BasicType::Real)),
        };
        assert_eq!(
            Type::from_type_expr(&expr),
            Type::Array {
                lo: 0,
                hi: 1,
                elem: Box::new(Type::Real)
            }
        );
    }
}

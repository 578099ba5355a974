use std::sync::Arc;

use crate::node::{Algebra, OpFn};

/// A stock operator that can be registered by name.
#[derive(Copy, Clone, Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub algebra: Algebra,
    pub eval: fn(&[f64]) -> f64,
}

impl Builtin {
    pub fn op_fn(&self) -> OpFn {
        let eval = self.eval;
        Arc::new(move |args: &[f64]| eval(args))
    }
}

macro_rules! builtin_table {
    ($( $name:literal : $arity:literal $(as $algebra:ident)? => |$args:ident| $eval:expr ),* $(,)?) => {
        pub const BUILTINS: &[Builtin] = &[
            $(
                Builtin {
                    name: $name,
                    arity: $arity,
                    algebra: builtin_table!(@algebra $($algebra)?),
                    eval: {
                        fn f($args: &[f64]) -> f64 {
                            $eval
                        }
                        f
                    },
                },
            )*
        ];
    };
    (@algebra $algebra:ident) => {
        Algebra::$algebra
    };
    (@algebra) => {
        Algebra::Opaque
    };
}

builtin_table! {
    "add": 2 as Add => |a| a[0] + a[1],
    "sub": 2 as Sub => |a| a[0] - a[1],
    "mul": 2 as Mul => |a| a[0] * a[1],
    "div": 2 as Div => |a| a[0] / a[1],
    "pow": 2 as Pow => |a| a[0].powf(a[1]),
    "neg": 1 as Neg => |a| -a[0],
    "sin": 1 => |a| a[0].sin(),
    "cos": 1 => |a| a[0].cos(),
    "tan": 1 => |a| a[0].tan(),
    "tanh": 1 => |a| a[0].tanh(),
    "exp": 1 => |a| a[0].exp(),
    "log": 1 => |a| a[0].ln(),
    "sqrt": 1 => |a| a[0].sqrt(),
    "abs": 1 => |a| a[0].abs(),
    "square": 1 => |a| a[0] * a[0],
    "inv": 1 => |a| 1.0 / a[0],
    "max": 2 => |a| a[0].max(a[1]),
    "min": 2 => |a| a[0].min(a[1]),
}

/// Finds a stock operator by name, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let add = lookup("Add").unwrap();
        assert_eq!(add.arity, 2);
        assert_eq!(add.algebra, Algebra::Add);
        assert_eq!((add.eval)(&[1.5, 2.0]), 3.5);
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in BUILTINS.iter().enumerate() {
            for b in &BUILTINS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn opaque_ops_keep_their_arity() {
        let sin = lookup("sin").unwrap();
        assert_eq!(sin.algebra, Algebra::Opaque);
        assert_eq!(sin.arity, 1);
        let f = sin.op_fn();
        assert_eq!(f(&[0.0]), 0.0);
    }
}

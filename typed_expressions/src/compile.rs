use core::fmt;

use ndarray::{Array1, ArrayView2};

use crate::names;
use crate::node::OpFn;
use crate::parse::{self, Ast, BinOp, ParseError};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("cannot parse expression: {0}")]
    Parse(#[from] ParseError),
    #[error("unknown name {0:?}")]
    UnknownName(String),
    #[error("unknown function {0:?}")]
    UnknownFunction(String),
    #[error("{name} takes {expected} arguments, got {found}")]
    Arity { name: String, expected: usize, found: usize },
    #[error("node sequence is not a valid preorder encoding")]
    InvalidPreorder,
}

/// Where an instruction reads an operand from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Src {
    /// Formal parameter by position.
    Param(usize),
    Lit(f64),
    Slot(usize),
}

#[derive(Clone)]
enum Callee {
    Func(OpFn),
    Bin(BinOp),
    Neg,
}

#[derive(Clone)]
struct Instr {
    callee: Callee,
    args: Vec<Src>,
    dst: usize,
}

/// A compiled expression: a slot-allocated postfix program over the formal
/// parameters `[constants..., variables...]`.
#[derive(Clone)]
pub struct CompiledFn {
    params: Vec<String>,
    n_constants: usize,
    instrs: Vec<Instr>,
    n_slots: usize,
    root: Src,
}

impl fmt::Debug for CompiledFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFn")
            .field("params", &self.params)
            .field("n_constants", &self.n_constants)
            .field("n_instrs", &self.instrs.len())
            .field("n_slots", &self.n_slots)
            .finish()
    }
}

impl CompiledFn {
    /// Formal parameter names: constants in order of first appearance,
    /// then the registry's variables in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn n_constants(&self) -> usize {
        self.n_constants
    }

    pub fn constant_names(&self) -> &[String] {
        &self.params[..self.n_constants]
    }

    pub fn variable_names(&self) -> &[String] {
        &self.params[self.n_constants..]
    }

    /// Evaluates the program with one value per formal parameter.
    pub fn call(&self, args: &[f64]) -> f64 {
        assert_eq!(args.len(), self.params.len(), "wrong number of arguments");
        let mut slots = vec![0.0; self.n_slots];
        let mut buf: Vec<f64> = Vec::new();
        let read = |slots: &[f64], src: Src| match src {
            Src::Param(i) => args[i],
            Src::Lit(v) => v,
            Src::Slot(s) => slots[s],
        };

        for instr in &self.instrs {
            buf.clear();
            buf.extend(instr.args.iter().map(|&src| read(&slots, src)));
            slots[instr.dst] = match &instr.callee {
                Callee::Func(f) => f(&buf),
                Callee::Bin(op) => op.apply(buf[0], buf[1]),
                Callee::Neg => -buf[0],
            };
        }
        read(&slots, self.root)
    }

    /// Evaluates every row of `x` (samples by variables, columns in
    /// declaration order) with the constants fixed to `consts`.
    pub fn predict(&self, consts: &[f64], x: ArrayView2<'_, f64>) -> Array1<f64> {
        assert_eq!(consts.len(), self.n_constants, "wrong number of constants");
        assert_eq!(x.ncols(), self.params.len() - self.n_constants, "wrong number of variables");
        let mut args = Vec::with_capacity(self.params.len());
        args.extend_from_slice(consts);
        args.resize(self.params.len(), 0.0);

        x.rows()
            .into_iter()
            .map(|row| {
                for (dst, v) in args[self.n_constants..].iter_mut().zip(row.iter()) {
                    *dst = *v;
                }
                self.call(&args)
            })
            .collect()
    }
}

/// Compiles the textual form of `expr` against `registry`.
///
/// Works for a [`crate::tree::Tree`] or any value whose `Display` output is
/// valid notation.
pub fn compile<E: fmt::Display + ?Sized>(expr: &E, registry: &Registry) -> Result<CompiledFn, CompileError> {
    compile_str(&expr.to_string(), registry)
}

pub fn compile_str(text: &str, registry: &Registry) -> Result<CompiledFn, CompileError> {
    let ast = parse::parse(text)?;

    let mut constants: Vec<String> = Vec::new();
    ast.for_each_ident(&mut |name| {
        if names::is_constant_name(name) && !constants.iter().any(|c| c == name) {
            constants.push(name.to_string());
        }
    });
    let n_constants = constants.len();
    let mut params = constants;
    params.extend(registry.variables().iter().cloned());

    let mut builder = PlanBuilder {
        registry,
        params: &params,
        n_constants,
        instrs: Vec::new(),
        free_slots: Vec::new(),
        next_slot: 0,
    };
    let root = builder.emit(&ast)?;
    let PlanBuilder { instrs, next_slot, .. } = builder;

    log::trace!("compiled {text:?}: {} instructions, {} slots", instrs.len(), next_slot);
    Ok(CompiledFn {
        params,
        n_constants,
        instrs,
        n_slots: next_slot,
        root,
    })
}

struct PlanBuilder<'a> {
    registry: &'a Registry,
    params: &'a [String],
    n_constants: usize,
    instrs: Vec<Instr>,
    free_slots: Vec<usize>,
    next_slot: usize,
}

impl PlanBuilder<'_> {
    fn alloc_slot(&mut self) -> usize {
        self.free_slots.pop().unwrap_or_else(|| {
            let s = self.next_slot;
            self.next_slot += 1;
            s
        })
    }

    fn push(&mut self, callee: Callee, args: Vec<Src>) -> Src {
        // Operands are read before the destination is written, so their slots can be reused.
        for src in &args {
            if let Src::Slot(s) = *src {
                self.free_slots.push(s);
            }
        }
        let dst = self.alloc_slot();
        self.instrs.push(Instr { callee, args, dst });
        Src::Slot(dst)
    }

    fn lookup_param(&self, name: &str) -> Option<usize> {
        if names::is_constant_name(name) {
            return self.params[..self.n_constants].iter().position(|p| p == name);
        }
        self.params[self.n_constants..]
            .iter()
            .position(|p| p == name)
            .map(|i| i + self.n_constants)
    }

    fn emit(&mut self, ast: &Ast) -> Result<Src, CompileError> {
        match ast {
            Ast::Num(v) => Ok(Src::Lit(*v)),
            Ast::Ident(name) => self
                .lookup_param(name)
                .map(Src::Param)
                .ok_or_else(|| CompileError::UnknownName(name.clone())),
            Ast::Neg(inner) => {
                let a = self.emit(inner)?;
                Ok(self.push(Callee::Neg, vec![a]))
            }
            Ast::Binary { op, lhs, rhs } => {
                let a = self.emit(lhs)?;
                let b = self.emit(rhs)?;
                Ok(self.push(Callee::Bin(*op), vec![a, b]))
            }
            Ast::Call { name, args } => {
                let (func, expected) = if let Some(p) = self.registry.primitive(name) {
                    (p.func().clone(), p.arity())
                } else if let Some(h) = self.registry.helper(name) {
                    (h.func.clone(), h.arity)
                } else {
                    return Err(CompileError::UnknownFunction(name.clone()));
                };
                if expected != args.len() {
                    return Err(CompileError::Arity {
                        name: name.clone(),
                        expected,
                        found: args.len(),
                    });
                }
                let srcs = args.iter().map(|a| self.emit(a)).collect::<Result<Vec<_>, _>>()?;
                Ok(self.push(Callee::Func(func), srcs))
            }
        }
    }
}

use core::fmt;
use std::sync::Arc;

use crate::grammar::TypeTag;

/// Numeric callable behind a primitive or helper; receives exactly `arity` arguments.
pub type OpFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// What a call means algebraically. Symbolic export expands the known
/// arithmetic forms and keeps everything else as an opaque function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algebra {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Pow,
    Opaque,
}

impl Algebra {
    /// Recognises the conventional arithmetic names, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "add" => Algebra::Add,
            "sub" => Algebra::Sub,
            "mul" => Algebra::Mul,
            "div" => Algebra::Div,
            "neg" => Algebra::Neg,
            "pow" => Algebra::Pow,
            _ => Algebra::Opaque,
        }
    }

    pub fn arity(self) -> Option<usize> {
        match self {
            Algebra::Neg => Some(1),
            Algebra::Add | Algebra::Sub | Algebra::Mul | Algebra::Div | Algebra::Pow => Some(2),
            Algebra::Opaque => None,
        }
    }
}

/// A typed operator. Immutable once registered.
pub struct Primitive {
    pub name: String,
    pub args: Vec<TypeTag>,
    pub ret: TypeTag,
    pub algebra: Algebra,
    func: OpFn,
}

impl Primitive {
    pub fn new(name: impl Into<String>, args: Vec<TypeTag>, ret: TypeTag, algebra: Algebra, func: OpFn) -> Self {
        Self {
            name: name.into(),
            args,
            ret,
            algebra,
            func,
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn call(&self, args: &[f64]) -> f64 {
        debug_assert_eq!(args.len(), self.arity());
        (self.func)(args)
    }

    pub fn func(&self) -> &OpFn {
        &self.func
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("ret", &self.ret)
            .field("algebra", &self.algebra)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args && self.ret == other.ret
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TerminalKind {
    Variable,
    Constant,
}

/// A leaf: a named free variable or a named free-constant placeholder.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Terminal {
    pub name: String,
    pub kind: TerminalKind,
}

impl Terminal {
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TerminalKind::Variable,
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TerminalKind::Constant,
        }
    }

    /// A constant terminal carrying a freshly minted name.
    pub fn fresh_constant() -> Self {
        Self::constant(crate::names::new_constant())
    }

    pub fn tag(&self) -> TypeTag {
        match self.kind {
            TerminalKind::Variable => TypeTag::Variable,
            TerminalKind::Constant => TypeTag::Constant,
        }
    }
}

/// One entry of a preorder node sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Primitive(Arc<Primitive>),
    Terminal(Terminal),
}

impl Node {
    pub fn arity(&self) -> usize {
        match self {
            Node::Primitive(p) => p.arity(),
            Node::Terminal(_) => 0,
        }
    }

    pub fn ret(&self) -> TypeTag {
        match self {
            Node::Primitive(p) => p.ret,
            Node::Terminal(t) => t.tag(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Primitive(p) => &p.name,
            Node::Terminal(t) => &t.name,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Node::Terminal(Terminal {
                kind: TerminalKind::Constant,
                ..
            })
        )
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            Node::Terminal(Terminal {
                kind: TerminalKind::Variable,
                ..
            })
        )
    }
}

impl From<Terminal> for Node {
    fn from(t: Terminal) -> Self {
        Node::Terminal(t)
    }
}

impl From<Arc<Primitive>> for Node {
    fn from(p: Arc<Primitive>) -> Self {
        Node::Primitive(p)
    }
}

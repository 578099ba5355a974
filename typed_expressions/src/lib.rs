pub mod builtin;
pub mod compile;
pub mod generate;
pub mod grammar;
pub mod names;
pub mod node;
pub mod node_utils;
pub mod parse;
pub(crate) mod random;
pub mod registry;
pub mod strings;
pub mod symbolic;
pub mod tree;

pub use crate::compile::{CompileError, CompiledFn, compile, compile_str};
pub use crate::generate::{
    Category, ContinuationPolicy, Full, GenerationError, Grow, generate, generate_full, generate_grow,
};
pub use crate::grammar::TypeTag;
pub use crate::names::{NameCounter, is_constant_name, new_constant, new_variable};
pub use crate::node::{Algebra, Node, OpFn, Primitive, Terminal, TerminalKind};
pub use crate::node_utils::{
    count_constant_nodes, count_depth, count_nodes, count_primitive_nodes, count_variable_nodes, is_valid_preorder,
    node_depths, subtree_end, tree_mapreduce,
};
pub use crate::registry::{Registry, RegistryError, TerminalSpec, WEIGHTED_PRODUCT, WEIGHTED_SUM};
pub use crate::strings::{string_tree, try_string_tree};
pub use crate::symbolic::{SymExpr, SymbolicError, round_to};
pub use crate::tree::Tree;

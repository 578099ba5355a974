use core::fmt;
use std::collections::BTreeMap;

use crate::node::Node;
use crate::node_utils;
use crate::registry::Registry;
use crate::strings;
use crate::symbolic::{self, SymExpr, SymbolicError};

/// A candidate program: preorder node sequence plus the constants last
/// fitted for it.
///
/// `parameters` belongs to this tree alone. Evaluators replace it wholesale
/// on every fitness call; crossover and mutation may edit `nodes` directly
/// as long as the sequence stays a valid preorder encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub parameters: BTreeMap<String, f64>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        debug_assert!(node_utils::is_valid_preorder(&nodes), "invalid preorder sequence");
        Self {
            nodes,
            parameters: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn depth(&self) -> usize {
        node_utils::count_depth(&self.nodes)
    }

    /// Distinct constant names in order of first appearance.
    pub fn constant_names(&self) -> Vec<&str> {
        node_utils::constant_names(&self.nodes)
    }

    /// Replaces the fitted parameters; nothing from the previous map survives.
    pub fn set_parameters(&mut self, parameters: BTreeMap<String, f64>) {
        self.parameters = parameters;
    }

    /// Expanded symbolic form of the rendered text. With `subs_params`,
    /// every constant is replaced by its fitted value rounded to `decimals`
    /// (`0.0` when the tree was never fitted).
    pub fn symbolic(&self, registry: &Registry, subs_params: bool, decimals: u32) -> Result<SymExpr, SymbolicError> {
        let text = self.to_string();
        if subs_params {
            symbolic::expand_with(&text, registry, |name| {
                let v = self.parameters.get(name).copied().unwrap_or(0.0);
                symbolic::round_to(v, decimals)
            })
        } else {
            symbolic::expand(&text, registry)
        }
    }

    /// LaTeX rendering of [`Tree::symbolic`].
    pub fn latex(&self, registry: &Registry, subs_params: bool, decimals: u32) -> Result<String, SymbolicError> {
        Ok(self.symbolic(registry, subs_params, decimals)?.to_latex())
    }
}

impl From<Vec<Node>> for Tree {
    fn from(nodes: Vec<Node>) -> Self {
        Tree::new(nodes)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&strings::string_tree(&self.nodes))
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::builtin;
use crate::grammar::TypeTag;
use crate::names::{self, NameCounter};
use crate::node::{Algebra, OpFn, Primitive, Terminal, TerminalKind};

/// Name of the skeleton primitive `wsum(WeightedTerm, Constant) -> WeightedSum`.
pub const WEIGHTED_SUM: &str = "wsum";
/// Name of the skeleton primitive `wmul(Constant, Variable) -> WeightedTerm`.
pub const WEIGHTED_PRODUCT: &str = "wmul";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("name {0:?} is already registered")]
    DuplicateName(String),
    #[error("operator {name:?} declares arity {arity} but {n_args} argument types")]
    ArityMismatch { name: String, arity: usize, n_args: usize },
    #[error("unknown builtin operator {0:?}")]
    UnknownBuiltin(String),
}

/// A terminal the generator can draw: either a fixed instance, or a spec
/// that mints a fresh constant each time it is drawn.
#[derive(Clone, Debug, PartialEq)]
pub enum TerminalSpec {
    Named(Terminal),
    EphemeralConstant,
}

impl TerminalSpec {
    pub fn tag(&self) -> TypeTag {
        match self {
            TerminalSpec::Named(t) => t.tag(),
            TerminalSpec::EphemeralConstant => TypeTag::Constant,
        }
    }

    pub fn instantiate(&self) -> Terminal {
        match self {
            TerminalSpec::Named(t) => t.clone(),
            TerminalSpec::EphemeralConstant => Terminal::fresh_constant(),
        }
    }
}

/// A named function usable inside expression text but never emitted as a tree node.
#[derive(Clone)]
pub struct Helper {
    pub name: String,
    pub arity: usize,
    pub func: OpFn,
}

impl std::fmt::Debug for Helper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Helper")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Per-problem catalogue of primitives, terminals and helper functions.
///
/// Read-mostly after setup; share it behind `&` or `Arc` between workers.
#[derive(Debug)]
pub struct Registry {
    name: String,
    ret: TypeTag,
    primitives: BTreeMap<TypeTag, Vec<Arc<Primitive>>>,
    by_name: HashMap<String, Arc<Primitive>>,
    terminals: BTreeMap<TypeTag, Vec<TerminalSpec>>,
    helpers: HashMap<String, Helper>,
    variables: Vec<String>,
    variable_counter: &'static NameCounter,
}

impl Registry {
    pub fn new(name: impl Into<String>, ret: TypeTag) -> Self {
        Self::with_variable_counter(name, ret, names::variable_counter())
    }

    /// Uses `counter` instead of the process-wide variable counter.
    pub fn with_variable_counter(name: impl Into<String>, ret: TypeTag, counter: &'static NameCounter) -> Self {
        Self {
            name: name.into(),
            ret,
            primitives: BTreeMap::new(),
            by_name: HashMap::new(),
            terminals: BTreeMap::new(),
            helpers: HashMap::new(),
            variables: Vec::new(),
            variable_counter: counter,
        }
    }

    /// A `Variable`-rooted registry with the two skeleton primitives
    /// already registered.
    pub fn weighted(name: impl Into<String>) -> Self {
        let mut reg = Self::new(name, TypeTag::Variable);
        for prim in weighted_skeleton() {
            reg.insert_primitive(prim);
        }
        reg
    }

    /// Changes the default root type of generated trees.
    pub fn with_ret(mut self, ret: TypeTag) -> Self {
        self.ret = ret;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default root type of generated trees.
    pub fn ret(&self) -> TypeTag {
        self.ret
    }

    pub fn register_operator(
        &mut self,
        name: impl Into<String>,
        func: OpFn,
        arity: usize,
        args: Vec<TypeTag>,
        ret: TypeTag,
    ) -> Result<Arc<Primitive>, RegistryError> {
        let name = name.into();
        let algebra = Algebra::from_name(&name);
        self.register_primitive(name, func, arity, args, ret, algebra)
    }

    pub fn register_primitive(
        &mut self,
        name: String,
        func: OpFn,
        arity: usize,
        args: Vec<TypeTag>,
        ret: TypeTag,
        algebra: Algebra,
    ) -> Result<Arc<Primitive>, RegistryError> {
        if arity != args.len() {
            return Err(RegistryError::ArityMismatch {
                name,
                arity,
                n_args: args.len(),
            });
        }
        self.check_free(&name)?;
        Ok(self.insert_primitive(Primitive::new(name, args, ret, algebra, func)))
    }

    fn insert_primitive(&mut self, prim: Primitive) -> Arc<Primitive> {
        let prim = Arc::new(prim);
        log::debug!("registry {}: operator {} -> {}", self.name, prim.name, prim.ret);
        self.primitives.entry(prim.ret).or_default().push(Arc::clone(&prim));
        self.by_name.insert(prim.name.clone(), Arc::clone(&prim));
        prim
    }

    /// Registers a stock operator (see [`builtin::BUILTINS`]) under its own name.
    pub fn register_builtin(
        &mut self,
        name: &str,
        args: Vec<TypeTag>,
        ret: TypeTag,
    ) -> Result<Arc<Primitive>, RegistryError> {
        let b = builtin::lookup(name).ok_or_else(|| RegistryError::UnknownBuiltin(name.to_string()))?;
        self.register_primitive(b.name.to_string(), b.op_fn(), b.arity, args, ret, b.algebra)
    }

    /// Registers `wsum(WeightedTerm, Constant) -> WeightedSum` and
    /// `wmul(Constant, Variable) -> WeightedTerm`.
    pub fn register_weighted_skeleton(&mut self) -> Result<(), RegistryError> {
        let skeleton = weighted_skeleton();
        for prim in &skeleton {
            self.check_free(&prim.name)?;
        }
        for prim in skeleton {
            self.insert_primitive(prim);
        }
        Ok(())
    }

    pub fn register_helper(&mut self, name: impl Into<String>, arity: usize, func: OpFn) -> Result<(), RegistryError> {
        let name = name.into();
        self.check_free(&name)?;
        self.helpers.insert(name.clone(), Helper { name, arity, func });
        Ok(())
    }

    /// Adds a fixed terminal; variable terminals also join the declared variable list.
    pub fn add_terminal(&mut self, terminal: Terminal) -> Result<(), RegistryError> {
        self.check_free(&terminal.name)?;
        if terminal.kind == TerminalKind::Variable {
            self.variables.push(terminal.name.clone());
        }
        self.terminals
            .entry(terminal.tag())
            .or_default()
            .push(TerminalSpec::Named(terminal));
        Ok(())
    }

    /// Lets `Any`-typed obligations draw freshly minted constants.
    pub fn add_ephemeral_constant(&mut self) {
        let specs = self.terminals.entry(TypeTag::Constant).or_default();
        if !specs.contains(&TerminalSpec::EphemeralConstant) {
            specs.push(TerminalSpec::EphemeralConstant);
        }
    }

    /// Mints a fresh variable, records it as a terminal and returns its name.
    pub fn new_variable(&mut self) -> String {
        let name = self.variable_counter.mint();
        self.variables.push(name.clone());
        self.terminals
            .entry(TypeTag::Variable)
            .or_default()
            .push(TerminalSpec::Named(Terminal::variable(name.clone())));
        name
    }

    /// Mints a fresh constant name from the process-wide counter.
    pub fn new_constant(&self) -> String {
        names::new_constant()
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variable_index(name).is_some()
    }

    pub fn primitive(&self, name: &str) -> Option<&Arc<Primitive>> {
        self.by_name.get(name)
    }

    pub fn helper(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn helpers(&self) -> impl Iterator<Item = &Helper> {
        self.helpers.values()
    }

    pub fn primitives(&self) -> impl Iterator<Item = &Arc<Primitive>> {
        self.primitives.values().flatten()
    }

    pub fn n_primitives(&self) -> usize {
        self.by_name.len()
    }

    /// Primitives whose return type can stand in for `tag`.
    pub fn primitives_returning(&self, tag: TypeTag) -> Vec<&Arc<Primitive>> {
        self.primitives
            .iter()
            .filter(|(ret, _)| ret.is_subtype_of(tag))
            .flat_map(|(_, ps)| ps)
            .collect()
    }

    /// Terminal specs whose type can stand in for `tag`.
    pub fn terminals_of(&self, tag: TypeTag) -> Vec<&TerminalSpec> {
        self.terminals
            .iter()
            .filter(|(t, _)| t.is_subtype_of(tag))
            .flat_map(|(_, ts)| ts)
            .collect()
    }

    /// The primitive with exactly this signature, used for the weighted skeletons.
    pub fn primitive_with_signature(&self, args: &[TypeTag], ret: TypeTag) -> Option<&Arc<Primitive>> {
        self.primitives.get(&ret)?.iter().find(|p| p.args == args)
    }

    fn check_free(&self, name: &str) -> Result<(), RegistryError> {
        let taken = self.by_name.contains_key(name)
            || self.helpers.contains_key(name)
            || self.variables.iter().any(|v| v == name)
            || self
                .terminals
                .values()
                .flatten()
                .any(|t| matches!(t, TerminalSpec::Named(n) if n.name == name));
        if taken {
            Err(RegistryError::DuplicateName(name.to_string()))
        } else {
            Ok(())
        }
    }
}

fn weighted_skeleton() -> [Primitive; 2] {
    [
        Primitive::new(
            WEIGHTED_SUM,
            vec![TypeTag::WeightedTerm, TypeTag::Constant],
            TypeTag::WeightedSum,
            Algebra::Add,
            Arc::new(|a: &[f64]| a[0] + a[1]),
        ),
        Primitive::new(
            WEIGHTED_PRODUCT,
            vec![TypeTag::Constant, TypeTag::Variable],
            TypeTag::WeightedTerm,
            Algebra::Mul,
            Arc::new(|a: &[f64]| a[0] * a[1]),
        ),
    ]
}

//! Type-directed random tree construction.
//!
//! Trees are produced in preorder from an explicit stack of `(depth, type)`
//! obligations. Each step either terminates the obligation (a terminal, or
//! one of the fixed weighted skeletons) or expands it with a primitive whose
//! argument types become new obligations one level deeper.

use core::fmt;
use std::sync::Arc;

use fastrand::Rng;

use crate::grammar::TypeTag;
use crate::node::{Node, Primitive, Terminal};
use crate::random::{choose, usize_range_inclusive};
use crate::registry::Registry;

/// Which registry category came up empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Category {
    Primitive,
    Terminal,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Primitive => "primitive",
            Category::Terminal => "terminal",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Nothing registered can fill an obligation of type `tag`. Callers
    /// usually retry with a fresh draw.
    #[error("no {kind} of type {tag} is registered")]
    Exhausted { kind: Category, tag: TypeTag },
    #[error("min_height {min} exceeds max_height {max}")]
    InvalidHeights { min: usize, max: usize },
}

/// Decides at every obligation whether growth stops there.
pub trait ContinuationPolicy {
    /// `true` terminates the obligation, `false` expands it.
    fn terminate(&self, rng: &mut Rng, height: usize, depth: usize, tag: TypeTag) -> bool;
}

/// Stops exactly when the terminal emission for `tag` would pass the
/// target height: `depth + tag.reach() > height`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Full;

impl ContinuationPolicy for Full {
    fn terminate(&self, _rng: &mut Rng, height: usize, depth: usize, tag: TypeTag) -> bool {
        depth + tag.reach() > height
    }
}

/// Like [`Full`], but below the root also stops with probability `terminal_ratio`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Grow {
    pub terminal_ratio: f64,
}

impl Default for Grow {
    fn default() -> Self {
        Self { terminal_ratio: 0.5 }
    }
}

impl ContinuationPolicy for Grow {
    fn terminate(&self, rng: &mut Rng, height: usize, depth: usize, tag: TypeTag) -> bool {
        Full.terminate(rng, height, depth, tag) || (depth > 0 && rng.f64() < self.terminal_ratio)
    }
}

impl<F> ContinuationPolicy for F
where
    F: Fn(usize, usize, TypeTag) -> bool,
{
    fn terminate(&self, _rng: &mut Rng, height: usize, depth: usize, tag: TypeTag) -> bool {
        self(height, depth, tag)
    }
}

/// Draws a target height uniformly from `min_height..=max_height` and
/// builds one tree rooted at `root` (the registry's return type when `None`).
pub fn generate<P: ContinuationPolicy + ?Sized>(
    rng: &mut Rng,
    registry: &Registry,
    min_height: usize,
    max_height: usize,
    policy: &P,
    root: Option<TypeTag>,
) -> Result<Vec<Node>, GenerationError> {
    if min_height > max_height {
        return Err(GenerationError::InvalidHeights {
            min: min_height,
            max: max_height,
        });
    }
    let height = usize_range_inclusive(rng, min_height..=max_height);
    let root = root.unwrap_or(registry.ret());

    let mut expr: Vec<Node> = Vec::new();
    let mut stack: Vec<(usize, TypeTag)> = vec![(0, root)];

    while let Some((depth, tag)) = stack.pop() {
        if policy.terminate(rng, height, depth, tag) {
            emit_terminal(rng, registry, tag, &mut expr)?;
            continue;
        }
        match tag {
            TypeTag::Constant => expr.push(Terminal::fresh_constant().into()),
            TypeTag::Variable if rng.bool() => expr.push(pick_terminal(rng, registry, tag)?.into()),
            _ => {
                let prim = pick_primitive(rng, registry, tag)?;
                // Reversed so the leftmost argument is popped first.
                stack.extend(prim.args.iter().rev().map(|&t| (depth + 1, t)));
                expr.push(prim.into());
            }
        }
    }

    log::trace!("generated {} nodes at height {} from {}", expr.len(), height, root);
    Ok(expr)
}

/// Every branch aims for the drawn height.
pub fn generate_full(
    rng: &mut Rng,
    registry: &Registry,
    min_height: usize,
    max_height: usize,
    root: Option<TypeTag>,
) -> Result<Vec<Node>, GenerationError> {
    generate(rng, registry, min_height, max_height, &Full, root)
}

/// Branches may stop early; see [`Grow`].
pub fn generate_grow(
    rng: &mut Rng,
    registry: &Registry,
    min_height: usize,
    max_height: usize,
    terminal_ratio: f64,
    root: Option<TypeTag>,
) -> Result<Vec<Node>, GenerationError> {
    generate(rng, registry, min_height, max_height, &Grow { terminal_ratio }, root)
}

fn emit_terminal(rng: &mut Rng, registry: &Registry, tag: TypeTag, expr: &mut Vec<Node>) -> Result<(), GenerationError> {
    match tag {
        TypeTag::WeightedSum => {
            let sum = skeleton(registry, &[TypeTag::WeightedTerm, TypeTag::Constant], TypeTag::WeightedSum)?;
            expr.push(sum.into());
            emit_terminal(rng, registry, TypeTag::WeightedTerm, expr)?;
            expr.push(Terminal::fresh_constant().into());
        }
        TypeTag::WeightedTerm => {
            let product = skeleton(registry, &[TypeTag::Constant, TypeTag::Variable], TypeTag::WeightedTerm)?;
            let var = pick_terminal(rng, registry, TypeTag::Variable)?;
            expr.push(product.into());
            expr.push(Terminal::fresh_constant().into());
            expr.push(var.into());
        }
        TypeTag::Constant => expr.push(Terminal::fresh_constant().into()),
        _ => expr.push(pick_terminal(rng, registry, tag)?.into()),
    }
    Ok(())
}

fn skeleton(registry: &Registry, args: &[TypeTag], ret: TypeTag) -> Result<Arc<Primitive>, GenerationError> {
    registry
        .primitive_with_signature(args, ret)
        .cloned()
        .ok_or(GenerationError::Exhausted {
            kind: Category::Primitive,
            tag: ret,
        })
}

fn pick_primitive(rng: &mut Rng, registry: &Registry, tag: TypeTag) -> Result<Arc<Primitive>, GenerationError> {
    let eligible = registry.primitives_returning(tag);
    choose(rng, &eligible).cloned().ok_or(GenerationError::Exhausted {
        kind: Category::Primitive,
        tag,
    })
}

fn pick_terminal(rng: &mut Rng, registry: &Registry, tag: TypeTag) -> Result<Terminal, GenerationError> {
    let eligible = registry.terminals_of(tag);
    choose(rng, &eligible)
        .map(|spec| spec.instantiate())
        .ok_or(GenerationError::Exhausted {
            kind: Category::Terminal,
            tag,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_utils;

    fn affine_registry() -> Registry {
        let mut reg = Registry::weighted("affine");
        reg.new_variable();
        reg.new_variable();
        reg
    }

    #[test]
    fn weighted_sum_terminates_into_the_skeleton() {
        let reg = affine_registry();
        let mut rng = Rng::with_seed(0);
        let nodes = generate_full(&mut rng, &reg, 0, 0, Some(TypeTag::WeightedSum)).unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names.len(), 5);
        assert_eq!(names[0], "wsum");
        assert_eq!(names[1], "wmul");
        assert!(nodes[2].is_constant());
        assert!(nodes[3].is_variable());
        assert!(nodes[4].is_constant());
        assert_eq!(node_utils::count_depth(&nodes), 3);
    }

    #[test]
    fn weighted_term_terminates_into_the_product() {
        let reg = affine_registry();
        let mut rng = Rng::with_seed(1);
        let nodes = generate_full(&mut rng, &reg, 1, 1, Some(TypeTag::WeightedTerm)).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].name(), "wmul");
        assert!(nodes[1].is_constant() && nodes[2].is_variable());
    }

    #[test]
    fn constants_are_always_fresh() {
        let reg = affine_registry();
        let mut rng = Rng::with_seed(2);
        let a = generate_full(&mut rng, &reg, 3, 3, Some(TypeTag::Constant)).unwrap();
        let b = generate_full(&mut rng, &reg, 3, 3, Some(TypeTag::Constant)).unwrap();
        assert_eq!(a.len(), 1);
        assert_ne!(a[0].name(), b[0].name());
    }

    #[test]
    fn missing_skeleton_is_reported_by_type() {
        let mut reg = Registry::new("bare", TypeTag::Variable);
        reg.new_variable();
        let mut rng = Rng::with_seed(0);
        let err = generate_full(&mut rng, &reg, 0, 0, Some(TypeTag::WeightedTerm)).unwrap_err();
        assert_eq!(
            err,
            GenerationError::Exhausted {
                kind: Category::Primitive,
                tag: TypeTag::WeightedTerm
            }
        );
    }

    #[test]
    fn missing_terminals_are_reported_by_type() {
        let reg = Registry::weighted("empty");
        let mut rng = Rng::with_seed(0);
        let err = generate_full(&mut rng, &reg, 0, 0, None).unwrap_err();
        assert_eq!(
            err,
            GenerationError::Exhausted {
                kind: Category::Terminal,
                tag: TypeTag::Variable
            }
        );
    }

    #[test]
    fn inverted_height_range_is_rejected() {
        let reg = affine_registry();
        let mut rng = Rng::with_seed(0);
        assert_eq!(
            generate_full(&mut rng, &reg, 3, 1, None).unwrap_err(),
            GenerationError::InvalidHeights { min: 3, max: 1 }
        );
    }

    #[test]
    fn closures_act_as_policies() {
        let reg = affine_registry();
        let mut rng = Rng::with_seed(4);
        let always_stop = |_: usize, _: usize, _: TypeTag| true;
        let nodes = generate(&mut rng, &reg, 5, 5, &always_stop, None).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_variable());
    }

    #[test]
    fn full_policy_is_type_sensitive() {
        let mut rng = Rng::with_seed(0);
        assert!(!Full.terminate(&mut rng, 3, 0, TypeTag::WeightedSum));
        assert!(Full.terminate(&mut rng, 3, 1, TypeTag::WeightedSum));
        assert!(!Full.terminate(&mut rng, 3, 1, TypeTag::WeightedTerm));
        assert!(Full.terminate(&mut rng, 3, 2, TypeTag::WeightedTerm));
        assert!(!Full.terminate(&mut rng, 3, 2, TypeTag::Variable));
        assert!(Full.terminate(&mut rng, 3, 3, TypeTag::Variable));
    }
}

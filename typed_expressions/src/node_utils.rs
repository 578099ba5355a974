use crate::node::Node;

/// Folds a preorder sequence bottom-up.
///
/// Walking the sequence in reverse turns preorder into a postfix-like
/// stream where each primitive finds its children on top of the stack,
/// leftmost child topmost.
pub fn tree_mapreduce<R>(
    nodes: &[Node],
    mut f_leaf: impl FnMut(&Node) -> R,
    mut f_branch: impl FnMut(&Node) -> R,
    mut op: impl FnMut(R, Vec<R>) -> R,
) -> R {
    let mut stack: Vec<R> = Vec::with_capacity(nodes.len());
    for n in nodes.iter().rev() {
        let a = n.arity();
        if a == 0 {
            stack.push(f_leaf(n));
            continue;
        }
        let start = stack.len().checked_sub(a).expect("invalid preorder (stack underflow)");
        let mut children = stack.split_off(start);
        children.reverse();
        let parent = f_branch(n);
        stack.push(op(parent, children));
    }
    assert_eq!(stack.len(), 1, "invalid preorder (did not reduce to one root)");
    stack.pop().expect("non-empty stack")
}

/// Height in levels; a lone leaf has depth 1.
pub fn count_depth(nodes: &[Node]) -> usize {
    tree_mapreduce(
        nodes,
        |_| 1usize,
        |_| 0usize,
        |_, children| children.iter().copied().max().unwrap_or(0) + 1,
    )
}

/// Depth of every node with the root at 0, aligned with `nodes`.
pub fn node_depths(nodes: &[Node]) -> Vec<usize> {
    let mut depths = Vec::with_capacity(nodes.len());
    let mut pending: Vec<usize> = vec![0];
    for n in nodes {
        let d = pending.pop().expect("invalid preorder (too many nodes)");
        depths.push(d);
        pending.extend(std::iter::repeat_n(d + 1, n.arity()));
    }
    depths
}

/// True when the sequence encodes exactly one rooted tree: arity
/// bookkeeping never runs dry before the end and nothing is left over.
pub fn is_valid_preorder(nodes: &[Node]) -> bool {
    let mut open: usize = 1;
    for n in nodes {
        if open == 0 {
            return false;
        }
        open = open - 1 + n.arity();
    }
    open == 0
}

/// Exclusive end index of the subtree rooted at `begin`.
pub fn subtree_end(nodes: &[Node], begin: usize) -> usize {
    let mut open = 1usize;
    let mut end = begin;
    while open > 0 {
        open = open - 1 + nodes[end].arity();
        end += 1;
    }
    end
}

pub fn count_nodes(nodes: &[Node]) -> usize {
    nodes.len()
}

pub fn count_constant_nodes(nodes: &[Node]) -> usize {
    nodes.iter().filter(|n| n.is_constant()).count()
}

pub fn count_variable_nodes(nodes: &[Node]) -> usize {
    nodes.iter().filter(|n| n.is_variable()).count()
}

pub fn count_primitive_nodes(nodes: &[Node]) -> usize {
    nodes.iter().filter(|n| matches!(n, Node::Primitive(_))).count()
}

/// Distinct constant names in order of first appearance.
pub fn constant_names(nodes: &[Node]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for n in nodes.iter().filter(|n| n.is_constant()) {
        if !out.contains(&n.name()) {
            out.push(n.name());
        }
    }
    out
}

use crate::node::Node;

/// Terminal names may arrive quoted from other notations; the text form never quotes.
pub fn strip_quotes(name: &str) -> String {
    name.chars().filter(|&ch| ch != '\'' && ch != '"').collect()
}

fn combine(name: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(name.len() + 2 + args.iter().map(|a| a.len() + 2).sum::<usize>());
    out.push_str(name);
    out.push('(');
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(a);
    }
    out.push(')');
    out
}

/// Renders a preorder sequence in call notation, e.g. `add(mul(c1, x1), c2)`.
///
/// A malformed sequence renders as a placeholder that no parser accepts.
pub fn string_tree(nodes: &[Node]) -> String {
    try_string_tree(nodes).unwrap_or_else(|| format!("<invalid preorder of {} nodes>", nodes.len()))
}

/// `None` unless `nodes` reduces to exactly one root.
pub fn try_string_tree(nodes: &[Node]) -> Option<String> {
    let mut stack: Vec<String> = Vec::with_capacity(nodes.len());

    for n in nodes.iter().rev() {
        match n {
            Node::Terminal(t) => stack.push(strip_quotes(&t.name)),
            Node::Primitive(p) => {
                let start = stack.len().checked_sub(p.arity())?;
                // Reverse traversal leaves the leftmost argument on top.
                let mut args = stack.split_off(start);
                args.reverse();
                stack.push(combine(&p.name, &args));
            }
        }
    }

    match stack.len() {
        1 => stack.pop(),
        _ => None,
    }
}

use super::{RuleId, Severity, ValidationWarning};
use crate::core::workflow_graph::schema::Node;
use std::collections::BTreeSet;

const MAX_SUGGESTIONS: usize = 3;

/// Flag nodes whose type is not in `known_types`, suggesting up to three
/// close matches.
pub fn validate_node_types(nodes: &[Node], known_types: &BTreeSet<String>) -> Vec<ValidationWarning> {
    nodes
        .iter()
        .filter(|node| !known_types.contains(&node.node_type))
        .map(|node| {
            let suggestions = suggest_types(&node.node_type, known_types);
            let suggestion = if suggestions.is_empty() {
                None
            } else {
                Some(format!("did you mean: {}", suggestions.join(", ")))
            };
            ValidationWarning::new(
                RuleId::UnknownNodeType,
                Severity::Error,
                Some(node.name.clone()),
                format!("node '{}' has unknown type '{}'", node.name, node.node_type),
                suggestion,
            )
        })
        .collect()
}

/// Candidates whose unqualified name contains / is contained in the unknown
/// one, or lies within `max(2, 20% of the longer name)` edits of it.
pub fn suggest_types(node_type: &str, known_types: &BTreeSet<String>) -> Vec<String> {
    let wanted = unqualified(node_type).to_lowercase();
    let mut out = Vec::new();
    for candidate in known_types {
        if out.len() >= MAX_SUGGESTIONS {
            break;
        }
        let name = unqualified(candidate).to_lowercase();
        let contained = !wanted.is_empty() && (name.contains(&wanted) || wanted.contains(&name));
        let longer = wanted.chars().count().max(name.chars().count());
        let threshold = 2.max(longer / 5);
        if contained || levenshtein(&wanted, &name) <= threshold {
            out.push(candidate.clone());
        }
    }
    out
}

fn unqualified(node_type: &str) -> &str {
    node_type.rsplit('.').next().unwrap_or(node_type)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b_chars.len()]
}

use std::collections::BTreeSet;

use crate::diagram::DiagramMap;
use crate::rule::Rule;

pub const ALL: &str = "all";
pub const NODES: &str = "nodes";
pub const SUBGRAPHS: &str = "subgraphs";

/// Resolves a rule's `elements` scope to element ids.
///
/// Without `elements` every node and subgraph is targeted. Reserved tokens expand
/// to their category and are also kept in the result themselves; entries that
/// name no element are kept too and skipped when actions are applied.
pub fn resolve_targets(rule: &Rule, map: &DiagramMap) -> BTreeSet<String> {
    let Some(elements) = &rule.elements else {
        return map
            .node_ids()
            .chain(map.subgraph_ids())
            .map(str::to_string)
            .collect();
    };

    let mut targets = BTreeSet::new();
    for entry in elements {
        if entry == ALL || entry == NODES {
            targets.extend(map.node_ids().map(str::to_string));
        }
        if entry == ALL || entry == SUBGRAPHS {
            targets.extend(map.subgraph_ids().map(str::to_string));
        }
        targets.insert(entry.clone());
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{Node, Subgraph};
    use pretty_assertions::assert_eq;

    fn sample() -> DiagramMap {
        let mut map = DiagramMap::new();
        map.nodes.push(Node::new("a"));
        map.nodes.push(Node::new("b"));
        map.subgraphs.push(Subgraph::new("g"));
        map
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn omitted_elements_targets_everything() {
        assert_eq!(resolve_targets(&Rule::new("r"), &sample()), set(&["a", "b", "g"]));
    }

    #[test]
    fn nodes_token_expands_and_stays_literal() {
        let rule = Rule::new("r").with_elements(["nodes"]);
        let targets = resolve_targets(&rule, &sample());
        assert_eq!(targets.len(), 3);
        assert_eq!(targets, set(&["a", "b", "nodes"]));
    }

    #[test]
    fn subgraphs_and_all_tokens() {
        let rule = Rule::new("r").with_elements(["subgraphs"]);
        assert_eq!(resolve_targets(&rule, &sample()), set(&["g", "subgraphs"]));
        let rule = Rule::new("r").with_elements(["all"]);
        assert_eq!(resolve_targets(&rule, &sample()), set(&["a", "all", "b", "g"]));
    }

    #[test]
    fn explicit_ids_are_deduplicated() {
        let rule = Rule::new("r").with_elements(["a", "a", "missing"]);
        assert_eq!(resolve_targets(&rule, &sample()), set(&["a", "missing"]));
    }
}

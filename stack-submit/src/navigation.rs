//! Rendering the "navigation comment" posted to each change in a submitted
//! stack: a tree of every change reachable from trunk, with merged-and-
//! deleted ancestors folded in as synthetic nodes, so reviewers can jump
//! between related changes without leaving the forge.

use stack_graph::BranchGraph;
use stack_store::TrackedBranch;

/// The marker this tool looks for to recognize (and update in place) a
/// navigation comment it posted earlier, rather than posting a new one.
pub const NAV_COMMENT_MARKER: &str = "<!-- gs:navigation comment -->";

/// One node in the rendered stack tree: either a real tracked branch's
/// change, or a synthetic entry for a change that used to sit downstack and
/// was merged and deleted.
#[derive(Debug, Clone)]
pub struct StackedChange {
    /// What to print for this node: `#<change-id>` if known, else the
    /// branch's own name.
    pub label: String,
    /// The current tracked branch this node represents, if any.
    pub branch: Option<String>,
    /// Whether this is the change the comment is being rendered for.
    pub is_current: bool,
    /// Children, nearest-upstack first.
    pub children: Vec<StackedChange>,
}

fn change_label(branch: &TrackedBranch) -> String {
    match &branch.change {
        Some(change) => format!("#{}", change.change_id),
        None => branch.name.clone(),
    }
}

fn build_node(graph: &BranchGraph, branch: &TrackedBranch, current: &str) -> StackedChange {
    let mut children: Vec<StackedChange> = graph
        .list_above(&branch.name)
        .into_iter()
        .map(|child| build_node(graph, child, current))
        .collect();
    children.sort_by(|a, b| a.label.cmp(&b.label));

    let mut node = StackedChange {
        label: change_label(branch),
        branch: Some(branch.name.clone()),
        is_current: branch.name == current,
        children,
    };

    // Fold merged-and-deleted ancestors in as synthetic wrapper nodes, so the
    // oldest merge ends up outermost (closest to trunk) and `branch`'s own
    // node stays the innermost leaf of the chain.
    for change_id in branch.merged_downstack.iter().rev() {
        node = StackedChange {
            label: format!("#{change_id}"),
            branch: None,
            is_current: false,
            children: vec![node],
        };
    }
    node
}

/// Build the full forest of every tracked branch's change, rooted at the
/// branches based directly on trunk, with `current` marked.
pub fn build_forest(graph: &BranchGraph, current: &str) -> Vec<StackedChange> {
    let mut roots: Vec<&TrackedBranch> = graph.branches().filter(|b| b.base.is_none()).collect();
    roots.sort_by(|a, b| a.name.cmp(&b.name));
    roots
        .into_iter()
        .map(|branch| build_node(graph, branch, current))
        .collect()
}

fn render_node(node: &StackedChange, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let marker = if node.is_current { " ◀" } else { "" };
    out.push_str(&format!("{indent}- {}{marker}\n", node.label));
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// Render the Markdown body of a navigation comment from `forest`.
pub fn render_navigation_comment(forest: &[StackedChange]) -> String {
    let mut body = String::from("**Stack navigation**\n\n");
    for root in forest {
        render_node(root, 0, &mut body);
    }
    body.push_str("\n---\n");
    body.push_str(NAV_COMMENT_MARKER);
    body.push('\n');
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_git::testing::ScratchRepo;
    use stack_git::NonZeroOid;
    use stack_store::{ChangeMetadata, ForgeKind, MetadataStore};
    use std::str::FromStr;

    fn zero_oid() -> NonZeroOid {
        NonZeroOid::from_str("1111111111111111111111111111111111111111").unwrap()
    }

    #[test]
    fn marks_the_current_branch_and_folds_merged_ancestors() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        stack_store::upsert_branch(
            &store,
            TrackedBranch {
                name: "feat2".to_owned(),
                base: None,
                base_hash: zero_oid(),
                upstream_branch: None,
                change: Some(ChangeMetadata {
                    forge: ForgeKind::Github,
                    change_id: "124".to_owned(),
                    nav_comment_id: None,
                }),
                merged_downstack: vec!["123".to_owned()],
            },
        )?;

        let graph = BranchGraph::load(&store)?;
        let forest = build_forest(&graph, "feat2");
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].label, "#123");
        assert!(!forest[0].is_current);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].label, "#124");
        assert!(forest[0].children[0].is_current);

        let rendered = render_navigation_comment(&forest);
        assert!(rendered.starts_with("**Stack navigation**"));
        assert!(rendered.contains("- #123"));
        assert!(rendered.contains("  - #124 ◀"));
        assert!(rendered.trim_end().ends_with(NAV_COMMENT_MARKER));
        Ok(())
    }
}

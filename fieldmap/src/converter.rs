use blocktree::{BlockNode, BlockTree, NodeId, TemplateEntry};
use tracing::debug;

/// Convert a block tree into the editor template array.
///
/// Freeform nodes with blank HTML are dropped together with their subtree.
/// An entry gets a children element only when at least one child is kept.
pub fn convert(tree: &BlockTree) -> Vec<TemplateEntry> {
    // Collect kept nodes in pre-order, then assemble entries from the back so
    // every child entry exists before its parent is built.
    let mut kept: Vec<NodeId> = Vec::with_capacity(tree.len());
    let mut walk = tree.pre_order();
    while let Some((id, node)) = walk.next() {
        if node.is_semantically_empty() {
            walk.skip_children(id);
            continue;
        }
        kept.push(id);
    }

    let mut built: Vec<Option<TemplateEntry>> = (0..tree.len()).map(|_| None).collect();
    for &id in kept.iter().rev() {
        let Some(node) = tree.get(id) else { continue };
        let children = node
            .children()
            .iter()
            .filter_map(|child| built[child.index()].take())
            .collect();
        built[id.index()] = Some(TemplateEntry {
            name: node.name.clone(),
            attrs: node.attrs.clone(),
            children,
        });
    }

    let template: Vec<TemplateEntry> = tree
        .roots()
        .iter()
        .filter_map(|root| built[root.index()].take())
        .collect();
    debug!(
        nodes = tree.len(),
        kept = kept.len(),
        entries = template.len(),
        "converted block tree to template"
    );
    template
}

/// [`convert`] for a nested block sequence.
pub fn convert_blocks(blocks: &[BlockNode]) -> Vec<TemplateEntry> {
    convert(&BlockTree::from_slice(blocks))
}

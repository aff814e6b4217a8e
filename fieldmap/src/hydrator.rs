use blocktree::{BlockNode, BlockTree, StructuredRecord, field_mappings};
use serde_json::Value;
use tracing::{debug, trace};

/// Return a copy of `tree` with every mapped attribute overwritten from `record`.
///
/// A field is applied only when the record holds a non-null value for it; the
/// attribute is created if the node does not have it yet. Fields no node maps
/// are ignored. The input tree is left untouched.
pub fn hydrate(tree: &BlockTree, record: &StructuredRecord) -> BlockTree {
    let mut hydrated = tree.clone();
    let mut applied = 0usize;

    for (id, node) in hydrated.nodes_mut() {
        let updates: Vec<(String, Value)> = field_mappings(&node.attrs)
            .filter(|mapping| record.is_set(mapping.field))
            .filter_map(|mapping| {
                record
                    .get(mapping.field)
                    .map(|value| (mapping.attribute.to_string(), value.clone()))
            })
            .collect();

        for (attribute, value) in updates {
            trace!(node = %id, attribute = %attribute, "hydrated attribute");
            node.attrs.insert(attribute, value);
            applied += 1;
        }
    }

    debug!(nodes = tree.len(), fields = record.len(), applied, "hydrated block tree");
    hydrated
}

/// [`hydrate`] for a nested block sequence.
pub fn hydrate_blocks(blocks: &[BlockNode], record: &StructuredRecord) -> Vec<BlockNode> {
    hydrate(&BlockTree::from_slice(blocks), record).into_nodes()
}

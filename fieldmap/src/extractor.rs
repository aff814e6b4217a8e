use blocktree::{BlockNode, BlockTree, StructuredRecord, field_mappings};
use tracing::{debug, trace};

/// Extract the structured record declared by the tree's field mappings.
///
/// Nodes are visited in pre-order and every mapped, set attribute is written
/// to the record, so a later node overwrites a field written earlier. In
/// particular a descendant wins over its ancestors and over earlier siblings.
/// Attributes that are missing or null are skipped.
pub fn extract(tree: &BlockTree) -> StructuredRecord {
    let mut record = StructuredRecord::new();
    for (id, node) in tree.pre_order() {
        for mapping in field_mappings(&node.attrs) {
            let Some(value) = node.attrs.get(mapping.attribute).filter(|v| !v.is_null()) else {
                continue;
            };
            trace!(node = %id, attribute = mapping.attribute, field = mapping.field, "extracted field");
            record.insert(mapping.field, value.clone());
        }
    }
    debug!(nodes = tree.len(), fields = record.len(), "extracted record");
    record
}

/// [`extract`] for a nested block sequence.
pub fn extract_blocks(blocks: &[BlockNode]) -> StructuredRecord {
    extract(&BlockTree::from_slice(blocks))
}

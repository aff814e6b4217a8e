use std::fmt;

use crate::block::{Attrs, BlockNode};

/// Index of a node inside a [`BlockTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node stored in the arena. Children are referenced by id and only
/// [`BlockTree::push`] links them, which keeps the arena acyclic.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: Option<String>,
    pub attrs: Attrs,
    pub inner_html: String,
    children: Vec<NodeId>,
}

impl TreeNode {
    pub fn new(name: Option<String>, attrs: Attrs, inner_html: impl Into<String>) -> Self {
        TreeNode {
            name,
            attrs,
            inner_html: inner_html.into(),
            children: Vec::new(),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_semantically_empty(&self) -> bool {
        crate::block::is_semantically_empty(self.name.as_deref(), &self.inner_html)
    }
}

/// Flat arena form of a block tree.
///
/// Every walk over the arena uses an explicit worklist, so arbitrarily deep
/// content never grows the call stack. Nodes are stored in pre-order: a
/// child's id is always greater than its parent's.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockTree {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the arena by taking ownership of a nested tree.
    pub fn from_nodes(blocks: Vec<BlockNode>) -> Self {
        let mut tree = BlockTree::new();
        let mut stack: Vec<(Option<NodeId>, BlockNode)> =
            blocks.into_iter().rev().map(|block| (None, block)).collect();

        while let Some((parent, mut block)) = stack.pop() {
            let inner_blocks = std::mem::take(&mut block.inner_blocks);
            let id = tree.push(
                parent,
                TreeNode {
                    name: block.name.take(),
                    attrs: std::mem::take(&mut block.attrs),
                    inner_html: std::mem::take(&mut block.inner_html),
                    children: Vec::with_capacity(inner_blocks.len()),
                },
            );
            stack.extend(inner_blocks.into_iter().rev().map(|child| (Some(id), child)));
        }

        tree
    }

    /// Build the arena from a borrowed nested tree, copying each node once.
    pub fn from_slice(blocks: &[BlockNode]) -> Self {
        let mut tree = BlockTree::new();
        let mut stack: Vec<(Option<NodeId>, &BlockNode)> =
            blocks.iter().rev().map(|block| (None, block)).collect();

        while let Some((parent, block)) = stack.pop() {
            let id = tree.push(
                parent,
                TreeNode {
                    name: block.name.clone(),
                    attrs: block.attrs.clone(),
                    inner_html: block.inner_html.clone(),
                    children: Vec::with_capacity(block.inner_blocks.len()),
                },
            );
            stack.extend(block.inner_blocks.iter().rev().map(|child| (Some(id), child)));
        }

        tree
    }

    /// Rebuild the nested form. Nodes are assembled from the last id
    /// backwards, so every child is finished before its parent needs it.
    pub fn into_nodes(self) -> Vec<BlockNode> {
        let BlockTree { mut nodes, roots } = self;
        let mut built: Vec<Option<BlockNode>> = (0..nodes.len()).map(|_| None).collect();

        while let Some(node) = nodes.pop() {
            let index = nodes.len();
            let inner_blocks = node
                .children
                .iter()
                .filter_map(|child| built[child.0].take())
                .collect();
            built[index] = Some(BlockNode {
                name: node.name,
                attrs: node.attrs,
                inner_blocks,
                inner_html: node.inner_html,
            });
        }

        roots
            .iter()
            .filter_map(|root| built[root.0].take())
            .collect()
    }

    /// Append a node under `parent` (or as a root) and return its id.
    /// Children already listed on `node` are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not issued by this tree.
    pub fn push(&mut self, parent: Option<NodeId>, mut node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.children.clear();
        self.nodes.push(node);
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0)
    }

    /// All nodes in storage order, which is pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut TreeNode)> {
        self.nodes
            .iter_mut()
            .enumerate()
            .map(|(i, node)| (NodeId(i), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first pre-order walk over the tree structure.
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Number of levels in the deepest branch (0 for an empty tree).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().map(|&id| (id, 1)).collect();
        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(self.nodes[id.0].children.iter().map(|&child| (child, level + 1)));
        }
        deepest
    }
}

/// Iterator returned by [`BlockTree::pre_order`].
pub struct PreOrder<'a> {
    tree: &'a BlockTree,
    stack: Vec<NodeId>,
}

impl PreOrder<'_> {
    /// Do not descend into the children of the node that was just yielded.
    pub fn skip_children(&mut self, id: NodeId) {
        let count = self.tree.nodes[id.0].children.len();
        let keep = self.stack.len().saturating_sub(count);
        self.stack.truncate(keep);
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let tree = self.tree;
        let node = &tree.nodes[id.0];
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<BlockNode> {
        let mut quote = Attrs::new();
        quote.insert("citation".into(), json!("anon"));
        vec![
            BlockNode::new("core/group", Attrs::new()).with_inner_blocks(vec![
                BlockNode::new("core/heading", Attrs::new()),
                BlockNode::new("core/quote", quote).with_inner_blocks(vec![BlockNode::new(
                    "core/paragraph",
                    Attrs::new(),
                )]),
            ]),
            BlockNode::freeform("\n\n"),
            BlockNode::new("core/separator", Attrs::new()),
        ]
    }

    fn names<'a>(items: impl Iterator<Item = (NodeId, &'a TreeNode)>) -> Vec<Option<&'a str>> {
        items.map(|(_, node)| node.name.as_deref()).collect()
    }

    #[test]
    fn nested_round_trip_is_lossless() {
        let blocks = sample();
        assert_eq!(BlockTree::from_slice(&blocks).into_nodes(), blocks);
        assert_eq!(BlockTree::from_nodes(blocks.clone()).into_nodes(), blocks);
    }

    #[test]
    fn storage_order_is_pre_order() {
        let tree = BlockTree::from_nodes(sample());
        let expected = vec![
            Some("core/group"),
            Some("core/heading"),
            Some("core/quote"),
            Some("core/paragraph"),
            None,
            Some("core/separator"),
        ];
        assert_eq!(names(tree.pre_order()), expected);
        assert_eq!(names(tree.nodes()), expected);
        assert_eq!(tree.roots().len(), 3);
    }

    #[test]
    fn skip_children_prunes_subtree() {
        let tree = BlockTree::from_nodes(sample());
        let mut walk = tree.pre_order();
        let mut seen = Vec::new();
        while let Some((id, node)) = walk.next() {
            seen.push(node.name.clone());
            if node.name.as_deref() == Some("core/quote") {
                walk.skip_children(id);
            }
        }
        assert!(!seen.contains(&Some("core/paragraph".to_string())));
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn depth_counts_levels() {
        assert_eq!(BlockTree::new().depth(), 0);
        assert_eq!(BlockTree::from_nodes(sample()).depth(), 3);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut tree = BlockTree::new();
        let mut parent = None;
        for _ in 0..100_000 {
            let node = TreeNode::new(Some("core/group".into()), Attrs::new(), "");
            let id = tree.push(parent, node);
            parent = Some(id);
        }
        assert_eq!(tree.pre_order().count(), 100_000);
        assert_eq!(tree.depth(), 100_000);
    }

    #[test]
    fn push_links_children_only_through_the_tree() {
        let mut tree = BlockTree::new();
        let root = tree.push(None, TreeNode::new(Some("core/group".into()), Attrs::new(), ""));
        let child = tree.push(Some(root), TreeNode::new(None, Attrs::new(), "<hr>"));
        assert_eq!(tree.get(root).unwrap().children(), &[child]);

        // A copy of a linked node comes back without its child links.
        let copy = tree.get(root).cloned().unwrap();
        let again = tree.push(Some(child), copy);
        assert!(tree.get(again).unwrap().children().is_empty());
        assert_eq!(tree.pre_order().count(), 3);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    #[should_panic]
    fn push_rejects_a_foreign_parent() {
        let mut other = BlockTree::new();
        other.push(None, TreeNode::new(None, Attrs::new(), "<hr>"));
        let foreign = other.push(None, TreeNode::new(None, Attrs::new(), "<hr>"));
        BlockTree::new().push(Some(foreign), TreeNode::new(None, Attrs::new(), ""));
    }

    #[test]
    fn deep_nested_form_drops_without_recursing() {
        let mut tree = BlockTree::new();
        let mut parent = None;
        for _ in 0..200_000 {
            let node = TreeNode::new(Some("core/group".into()), Attrs::new(), "");
            parent = Some(tree.push(parent, node));
        }
        let nested = tree.into_nodes();
        assert_eq!(nested.len(), 1);
        drop(nested);
    }
}

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::block::Attrs;

/// One entry of an editor template array.
///
/// Serializes as `[name, attrs]`, or `[name, attrs, children]` when the entry
/// has children.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub name: Option<String>,
    pub attrs: Attrs,
    pub children: Vec<TemplateEntry>,
}

impl TemplateEntry {
    pub fn new(name: Option<String>, attrs: Attrs) -> Self {
        TemplateEntry {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    /// Levels of nesting including this entry.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((entry, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(entry.children.iter().map(|child| (child, level + 1)));
        }
        deepest
    }
}

impl Drop for TemplateEntry {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut entry) = pending.pop() {
            pending.append(&mut entry.children);
        }
    }
}

impl Serialize for TemplateEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.children.is_empty() { 2 } else { 3 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.name)?;
        seq.serialize_element(&self.attrs)?;
        if !self.children.is_empty() {
            seq.serialize_element(&self.children)?;
        }
        seq.end()
    }
}

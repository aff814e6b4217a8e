pub mod mapping;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Insertion-ordered attribute object of a block.
/// Template consumers depend on attribute order, so it must survive every transformation.
pub type Attrs = Map<String, Value>;

/// One node of a parsed content tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockNode {
    /// Registered block type, e.g. `core/paragraph`.
    /// `None` marks a raw HTML fragment between blocks.
    #[serde(default, alias = "blockName")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_attrs")]
    pub attrs: Attrs,
    #[serde(default, rename = "innerBlocks")]
    pub inner_blocks: Vec<BlockNode>,
    #[serde(default, rename = "innerHTML")]
    pub inner_html: String,
}

impl BlockNode {
    pub fn new(name: impl Into<String>, attrs: Attrs) -> Self {
        BlockNode {
            name: Some(name.into()),
            attrs,
            inner_blocks: Vec::new(),
            inner_html: String::new(),
        }
    }

    /// A raw HTML fragment (no block type).
    pub fn freeform(inner_html: impl Into<String>) -> Self {
        BlockNode {
            name: None,
            attrs: Attrs::new(),
            inner_blocks: Vec::new(),
            inner_html: inner_html.into(),
        }
    }

    pub fn with_inner_blocks(mut self, inner_blocks: Vec<BlockNode>) -> Self {
        self.inner_blocks = inner_blocks;
        self
    }

    pub fn with_inner_html(mut self, inner_html: impl Into<String>) -> Self {
        self.inner_html = inner_html.into();
        self
    }

    /// True for a freeform fragment whose HTML is blank.
    pub fn is_semantically_empty(&self) -> bool {
        is_semantically_empty(self.name.as_deref(), &self.inner_html)
    }
}

/// Nested blocks are released through a worklist, one flat list at a time.
impl Drop for BlockNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.inner_blocks);
        while let Some(mut block) = pending.pop() {
            pending.append(&mut block.inner_blocks);
        }
    }
}

pub(crate) fn is_semantically_empty(name: Option<&str>, inner_html: &str) -> bool {
    name.is_none() && inner_html.trim().is_empty()
}

/// Presence test used for both attribute values and record fields:
/// a JSON null counts as "not set".
pub fn is_set(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

/// An empty attribute set arrives as `[]` from producers that cannot tell an
/// empty list from an empty map; anything else must be an object.
fn deserialize_attrs<'de, D>(deserializer: D) -> Result<Attrs, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        Value::Array(items) if items.is_empty() => Ok(Attrs::new()),
        Value::Null => Ok(Attrs::new()),
        other => Err(serde::de::Error::custom(format!(
            "invalid type: attrs must be an object, got {}",
            json_type_name(&other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

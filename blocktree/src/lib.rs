//! Block tree model shared by the field-mapping transformations.

pub mod block;
pub mod parser;
pub mod record;
pub mod template;
pub mod tree;

pub use block::mapping::{FieldMapping, field_mappings};
pub use block::{Attrs, BlockNode};
pub use record::StructuredRecord;
pub use template::TemplateEntry;
pub use tree::{BlockTree, NodeId, TreeNode};

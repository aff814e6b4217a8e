use blocktree::parser::{ParseError, Parser};
use blocktree::{BlockNode, BlockTree, StructuredRecord, TemplateEntry};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::{converter, extractor, hydrator};

pub type ContentId = u64;

/// A content item as returned by the content store.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: ContentId,
    /// Content type identifier, e.g. `company`.
    pub content_type: String,
    /// Serialized block markup.
    pub body: String,
}

/// A data type template item. Its body defines the block layout expected
/// for content of the type named by its title.
#[derive(Debug, Clone, PartialEq)]
pub struct DataType {
    pub title: String,
    pub body: String,
}

impl DataType {
    /// Content type identifier this data type applies to.
    pub fn slug(&self) -> String {
        self.title.to_lowercase()
    }
}

/// Read access to stored content and data types.
pub trait ContentStore {
    fn fetch(&self, id: ContentId) -> Option<ContentItem>;

    /// Data types in store order.
    fn data_types(&self) -> Vec<DataType>;
}

/// Turns a serialized body into a block tree.
pub trait BlockParser {
    fn parse_blocks(&self, body: &str) -> Result<Vec<BlockNode>, Vec<ParseError>>;
}

/// Reads bodies stored as the JSON block-tree form.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBlockParser;

impl BlockParser for JsonBlockParser {
    fn parse_blocks(&self, body: &str) -> Result<Vec<BlockNode>, Vec<ParseError>> {
        Parser::new(body.to_string(), 0).parse()
    }
}

/// Arguments for registering the content type a data type describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTypeRegistration {
    pub slug: String,
    pub label: String,
    pub public: bool,
    pub show_in_menu: bool,
    pub show_in_rest: bool,
    pub icon: String,
    pub template: Vec<TemplateEntry>,
    pub template_lock: String,
}

/// Wires the content store, the body parser and the tree transformations.
pub struct Orchestrator<'a, S: ContentStore, P: BlockParser = JsonBlockParser> {
    store: &'a S,
    parser: P,
}

impl<'a, S: ContentStore> Orchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Orchestrator {
            store,
            parser: JsonBlockParser,
        }
    }
}

impl<'a, S: ContentStore, P: BlockParser> Orchestrator<'a, S, P> {
    pub fn with_parser(store: &'a S, parser: P) -> Self {
        Orchestrator { store, parser }
    }

    /// First data type whose lower-cased title equals `content_type`.
    pub fn find_data_type(&self, content_type: &str) -> Option<DataType> {
        let found = self
            .store
            .data_types()
            .into_iter()
            .find(|data_type| data_type.slug() == content_type);
        debug!(content_type, found = found.is_some(), "data type lookup");
        found
    }

    /// Extract the structured record of a content item.
    ///
    /// Returns `Ok(None)` when no data type describes the item's content type.
    pub fn resolve_record(&self, id: ContentId) -> Result<Option<StructuredRecord>, ResolveError> {
        let item = self.fetch(id)?;
        if self.find_data_type(&item.content_type).is_none() {
            return Ok(None);
        }
        let blocks = self.parse(&format!("content item {}", id), &item.body)?;
        Ok(Some(extractor::extract(&BlockTree::from_nodes(blocks))))
    }

    /// Hydrate the matching data type's own block tree with the record
    /// extracted from a content item.
    ///
    /// Returns `Ok(None)` when no data type describes the item's content type.
    pub fn hydrated_template(&self, id: ContentId) -> Result<Option<Vec<BlockNode>>, ResolveError> {
        let item = self.fetch(id)?;
        let Some(data_type) = self.find_data_type(&item.content_type) else {
            return Ok(None);
        };
        let content = self.parse(&format!("content item {}", id), &item.body)?;
        let record = extractor::extract(&BlockTree::from_nodes(content));
        let template = self.parse(&format!("data type '{}'", data_type.title), &data_type.body)?;
        let hydrated = hydrator::hydrate(&BlockTree::from_nodes(template), &record);
        Ok(Some(hydrated.into_nodes()))
    }

    /// Registration arguments for every data type in the store.
    ///
    /// A data type whose body cannot be parsed is skipped; its error is
    /// returned next to the registrations that succeeded.
    pub fn register_data_types(&self) -> (Vec<DataTypeRegistration>, Vec<ResolveError>) {
        let mut registrations = Vec::new();
        let mut skipped = Vec::new();

        for data_type in self.store.data_types() {
            let source_name = format!("data type '{}'", data_type.title);
            match self.parse(&source_name, &data_type.body) {
                Ok(blocks) => registrations.push(DataTypeRegistration {
                    slug: data_type.slug(),
                    label: data_type.title.clone(),
                    public: true,
                    show_in_menu: true,
                    show_in_rest: true,
                    icon: "dashicons-admin-site".to_string(),
                    template: converter::convert(&BlockTree::from_nodes(blocks)),
                    template_lock: "insert".to_string(),
                }),
                Err(error) => {
                    warn!(title = %data_type.title, "skipping data type: {}", error);
                    skipped.push(error);
                }
            }
        }

        (registrations, skipped)
    }

    fn fetch(&self, id: ContentId) -> Result<ContentItem, ResolveError> {
        self.store.fetch(id).ok_or(ResolveError::ContentNotFound(id))
    }

    fn parse(&self, source_name: &str, body: &str) -> Result<Vec<BlockNode>, ResolveError> {
        self.parser
            .parse_blocks(body)
            .map_err(|errors| ResolveError::parse(source_name, errors))
    }
}

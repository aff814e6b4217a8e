use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use fieldmap::{ContentId, ContentItem, ContentStore, DataType};

/// A site manifest: the data types and content items the orchestrator reads.
///
/// ```toml
/// [[data_type]]
/// title = "Company"
/// blocks = "company.json"
///
/// [[content]]
/// id = 12
/// type = "company"
/// blocks = "acme.json"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteManifest {
    #[serde(default, rename = "data_type")]
    pub data_types: Vec<DataTypeEntry>,

    #[serde(default)]
    pub content: Vec<ContentEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataTypeEntry {
    pub title: String,

    /// JSON block tree file, relative to the manifest.
    #[serde(default)]
    pub blocks: Option<PathBuf>,

    /// Inline JSON block tree.
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentEntry {
    pub id: ContentId,

    /// Content type identifier, matched against lower-cased data type titles.
    #[serde(rename = "type")]
    pub content_type: String,

    #[serde(default)]
    pub blocks: Option<PathBuf>,

    #[serde(default)]
    pub body: Option<String>,
}

/// Read an entry's block tree from its file or its inline body.
fn read_body(
    blocks: &Option<PathBuf>,
    body: &Option<String>,
    base_dir: &Path,
    what: &str,
) -> Result<String, String> {
    match (blocks, body) {
        (Some(_), Some(_)) => Err(format!("{}: set either `blocks` or `body`, not both", what)),
        (None, None) => Err(format!("{}: missing `blocks` or `body`", what)),
        (None, Some(body)) => Ok(body.clone()),
        (Some(path), None) => {
            let path = base_dir.join(path);
            std::fs::read_to_string(&path)
                .map_err(|e| format!("{}: cannot read '{}': {}", what, path.display(), e))
        }
    }
}

/// A loaded site. Bodies are read eagerly so lookups cannot fail on I/O.
#[derive(Debug, Default)]
pub struct Site {
    items: Vec<ContentItem>,
    data_types: Vec<DataType>,
}

impl Site {
    pub fn load(path: &Path) -> Result<Site, String> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Site::from_manifest_str(&source, &base_dir)
    }

    pub fn from_manifest_str(source: &str, base_dir: &Path) -> Result<Site, String> {
        let manifest: SiteManifest =
            toml::from_str(source).map_err(|e| format!("TOML parse error: {}", e))?;

        let mut site = Site::default();
        for entry in &manifest.data_types {
            let what = format!("data type '{}'", entry.title);
            site.data_types.push(DataType {
                title: entry.title.clone(),
                body: read_body(&entry.blocks, &entry.body, base_dir, &what)?,
            });
        }

        let mut seen = HashSet::new();
        for entry in &manifest.content {
            if !seen.insert(entry.id) {
                return Err(format!("duplicate content id {}", entry.id));
            }
            let what = format!("content item {}", entry.id);
            site.items.push(ContentItem {
                id: entry.id,
                content_type: entry.content_type.clone(),
                body: read_body(&entry.blocks, &entry.body, base_dir, &what)?,
            });
        }

        tracing::debug!(
            data_types = site.data_types.len(),
            items = site.items.len(),
            "loaded site manifest"
        );
        Ok(site)
    }
}

impl ContentStore for Site {
    fn fetch(&self, id: ContentId) -> Option<ContentItem> {
        self.items.iter().find(|item| item.id == id).cloned()
    }

    fn data_types(&self) -> Vec<DataType> {
        self.data_types.clone()
    }
}

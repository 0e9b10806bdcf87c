use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::search_context::SearchContext;

/// `file.location` value of products held on disk.
pub const STORAGE_ONLINE: &str = "on_disk";
/// `file.location` value of products archived to tape.
pub const STORAGE_OFFLINE: &str = "on_tape";

/// Whether a reported total is exact or only a lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TotalRelation {
    #[default]
    #[serde(rename = "exact")]
    Exact,
    #[serde(rename = "at-least")]
    AtLeast,
}

impl TotalRelation {
    /// Map the engine's `hits.total.relation` flag (`eq` / `gte`).
    pub fn from_engine(relation: &str) -> Self {
        match relation {
            "gte" => TotalRelation::AtLeast,
            _ => TotalRelation::Exact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub records: Vec<ResultRecord>,
    pub total: u64,
    pub relation: TotalRelation,
}

/// One catalogue entry as returned by the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: String,
    pub document: CatalogueDocument,
    /// The stored document exactly as indexed.
    pub source: serde_json::Value,
}

impl ResultRecord {
    /// Only a `source` that is not a JSON object fails; sections with an
    /// unexpected shape are read as absent.
    pub fn new(id: impl Into<String>, source: serde_json::Value) -> Result<Self, serde_json::Error> {
        let document = serde_json::from_value(source.clone())?;
        Ok(Self { id: id.into(), document, source })
    }
}

/// Read a field, treating null or a value of the wrong shape as the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Read a scalar as text, so numeric times or names still render.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        value @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)) => Some(value.to_string()),
        _ => None,
    };
    Ok(text)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatalogueDocument {
    #[serde(deserialize_with = "lenient")]
    pub temporal: Option<TemporalExtent>,
    #[serde(deserialize_with = "lenient")]
    pub spatial: Option<SpatialExtent>,
    #[serde(deserialize_with = "lenient")]
    pub misc: Option<ProductMisc>,
    #[serde(deserialize_with = "lenient")]
    pub file: Option<FileLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TemporalExtent {
    #[serde(deserialize_with = "lenient_text")]
    pub start_time: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpatialExtent {
    #[serde(deserialize_with = "lenient")]
    pub geometries: Option<SpatialGeometries>,
}

/// The footprint is indexed twice: once for geo-shape queries, once for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpatialGeometries {
    #[serde(deserialize_with = "lenient")]
    pub search: Option<StoredGeometry>,
    #[serde(deserialize_with = "lenient")]
    pub display: Option<StoredGeometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoredGeometry {
    /// Empty when the stored geometry has no type.
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub kind: String,
    pub coordinates: serde_json::Value,
}

/// Free-form product metadata harvested from the product manifests. Keys are
/// the manifest's own labels, e.g. `Satellite` or `Start Orbit Number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProductMisc {
    #[serde(deserialize_with = "lenient")]
    pub platform: BTreeMap<String, serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub orbit_info: BTreeMap<String, serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub product_info: BTreeMap<String, serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub quality_info: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLocation {
    #[serde(deserialize_with = "lenient_text")]
    pub directory: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub filename: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub data_file: Option<String>,
    pub data_file_size: Option<serde_json::Value>,
    /// Comma separated, present for products split over several files.
    #[serde(deserialize_with = "lenient_text")]
    pub data_files: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub data_file_sizes: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub metadata_file: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub quicklook_file: Option<String>,
}

/// A data file of a product and its size in bytes, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub name: String,
    pub size: Option<String>,
}

impl FileLocation {
    pub fn is_online(&self) -> bool {
        self.location.as_deref() == Some(STORAGE_ONLINE)
    }

    pub fn is_offline(&self) -> bool {
        self.location.as_deref() == Some(STORAGE_OFFLINE)
    }

    pub fn is_multi_file(&self) -> bool {
        self.data_files.is_some()
    }

    /// Data files of the product. Multi-file products list their names and
    /// sizes as parallel comma separated strings.
    pub fn data_file_list(&self) -> Vec<DataFile> {
        if let Some(names) = &self.data_files {
            let sizes = self
                .data_file_sizes
                .as_deref()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect::<Vec<_>>())
                .unwrap_or_default();
            return names
                .split(',')
                .map(|name| name.trim())
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(i, name)| DataFile {
                    name: name.to_string(),
                    size: sizes.get(i).filter(|s| !s.is_empty()).cloned(),
                })
                .collect();
        }
        match &self.data_file {
            Some(name) if !name.is_empty() => vec![DataFile {
                name: name.clone(),
                size: self.data_file_size.as_ref().map(value_to_string),
            }],
            _ => vec![],
        }
    }
}

/// Render a scalar metadata value the way it appears in the manifest.
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Search results digested for one output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedResult {
    pub title: String,
    pub subtitle: Option<String>,
    pub count: i64,
    pub start_index: i64,
    pub start_page: i64,
    pub total_results: u64,
    pub relation: TotalRelation,
    pub records: Vec<ResultRecord>,
    pub query: SearchContext,
    pub generated_at: DateTime<Utc>,
}

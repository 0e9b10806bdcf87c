//! The fixed set of OpenSearch parameters and the per-request context built from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pagination::Pagination;
use crate::search_const::{COUNT_DEFAULT, COUNT_MAX, START_INDEX_DEFAULT};

/// Every query parameter the service recognises. Declaration order is the
/// order parameters are echoed back to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SearchParam {
    #[serde(rename = "platform")]
    Platform,
    #[serde(rename = "mission")]
    Mission,
    #[serde(rename = "instrument")]
    Instrument,
    #[serde(rename = "productType")]
    ProductType,
    #[serde(rename = "dataFormat")]
    DataFormat,
    #[serde(rename = "dataOnline")]
    DataOnline,
    #[serde(rename = "uid")]
    Uid,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "orbitNumber")]
    OrbitNumber,
    #[serde(rename = "relativeOrbitNumber")]
    RelativeOrbitNumber,
    #[serde(rename = "orbitDirection")]
    OrbitDirection,
    #[serde(rename = "resolution")]
    Resolution,
    #[serde(rename = "sensorMode")]
    SensorMode,
    #[serde(rename = "polarisationChannels")]
    PolarisationChannels,
    #[serde(rename = "bbox")]
    Bbox,
    #[serde(rename = "geometry")]
    Geometry,
    #[serde(rename = "startDate")]
    StartDate,
    #[serde(rename = "endDate")]
    EndDate,
    #[serde(rename = "minCloudCoverPercentage")]
    MinCloudCoverPercentage,
    #[serde(rename = "maxCloudCoverPercentage")]
    MaxCloudCoverPercentage,
    #[serde(rename = "maximumRecords")]
    MaximumRecords,
    #[serde(rename = "startRecord")]
    StartRecord,
    #[serde(rename = "startPage")]
    StartPage,
    #[serde(rename = "q")]
    Q,
}

impl SearchParam {
    pub const ALL: [SearchParam; 24] = [
        SearchParam::Platform,
        SearchParam::Mission,
        SearchParam::Instrument,
        SearchParam::ProductType,
        SearchParam::DataFormat,
        SearchParam::DataOnline,
        SearchParam::Uid,
        SearchParam::Name,
        SearchParam::OrbitNumber,
        SearchParam::RelativeOrbitNumber,
        SearchParam::OrbitDirection,
        SearchParam::Resolution,
        SearchParam::SensorMode,
        SearchParam::PolarisationChannels,
        SearchParam::Bbox,
        SearchParam::Geometry,
        SearchParam::StartDate,
        SearchParam::EndDate,
        SearchParam::MinCloudCoverPercentage,
        SearchParam::MaxCloudCoverPercentage,
        SearchParam::MaximumRecords,
        SearchParam::StartRecord,
        SearchParam::StartPage,
        SearchParam::Q,
    ];

    /// Name of the parameter on the query string.
    pub fn name(self) -> &'static str {
        match self {
            SearchParam::Platform => "platform",
            SearchParam::Mission => "mission",
            SearchParam::Instrument => "instrument",
            SearchParam::ProductType => "productType",
            SearchParam::DataFormat => "dataFormat",
            SearchParam::DataOnline => "dataOnline",
            SearchParam::Uid => "uid",
            SearchParam::Name => "name",
            SearchParam::OrbitNumber => "orbitNumber",
            SearchParam::RelativeOrbitNumber => "relativeOrbitNumber",
            SearchParam::OrbitDirection => "orbitDirection",
            SearchParam::Resolution => "resolution",
            SearchParam::SensorMode => "sensorMode",
            SearchParam::PolarisationChannels => "polarisationChannels",
            SearchParam::Bbox => "bbox",
            SearchParam::Geometry => "geometry",
            SearchParam::StartDate => "startDate",
            SearchParam::EndDate => "endDate",
            SearchParam::MinCloudCoverPercentage => "minCloudCoverPercentage",
            SearchParam::MaxCloudCoverPercentage => "maxCloudCoverPercentage",
            SearchParam::MaximumRecords => "maximumRecords",
            SearchParam::StartRecord => "startRecord",
            SearchParam::StartPage => "startPage",
            SearchParam::Q => "q",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|param| param.name() == name)
    }
}

/// Recognised parameters of one request. A parameter that is not in the map is
/// unconstrained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchContext {
    values: BTreeMap<SearchParam, String>,
}

impl SearchContext {
    /// Build a context from raw query-string pairs, applying the paging
    /// defaults. Unknown keys and empty values are dropped; a repeated key
    /// keeps its last value.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut context = Self::default();
        for (key, value) in pairs {
            let Some(param) = SearchParam::from_name(key.as_ref()) else {
                continue;
            };
            let value = value.as_ref();
            if value.is_empty() {
                context.values.remove(&param);
            } else {
                context.values.insert(param, value.to_string());
            }
        }
        context.apply_defaults();
        context
    }

    /// A context constraining only the record identifier.
    pub fn for_uid(uid: impl Into<String>) -> Self {
        let mut context = Self::default();
        context.set(SearchParam::Uid, uid);
        context
    }

    fn apply_defaults(&mut self) {
        let count = match self.get(SearchParam::MaximumRecords).map(|v| v.trim().parse::<i64>()) {
            Some(Ok(count)) => count.min(COUNT_MAX),
            _ => COUNT_DEFAULT,
        };
        self.set(SearchParam::MaximumRecords, count.to_string());

        if !self.contains(SearchParam::StartPage) && !self.contains(SearchParam::StartRecord) {
            self.set(SearchParam::StartRecord, START_INDEX_DEFAULT.to_string());
        }
    }

    pub fn get(&self, param: SearchParam) -> Option<&str> {
        self.values.get(&param).map(|v| v.as_str())
    }

    pub fn contains(&self, param: SearchParam) -> bool {
        self.values.contains_key(&param)
    }

    pub fn set(&mut self, param: SearchParam, value: impl Into<String>) {
        self.values.insert(param, value.into());
    }

    pub fn remove(&mut self, param: SearchParam) {
        self.values.remove(&param);
    }

    /// Parameters carrying a value, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SearchParam, &str)> {
        self.values.iter().map(|(param, value)| (*param, value.as_str()))
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::from_context(self)
    }
}

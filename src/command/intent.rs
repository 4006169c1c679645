//! Intent tags and typed parameter shapes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The classified purpose of a command. A closed tag set; anything the
/// classifier cannot place lands on `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Search,
    CreateAlbum,
    Edit,
    Filter,
    Sort,
    #[default]
    Unknown,
}

impl Intent {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "search" => Intent::Search,
            "create_album" => Intent::CreateAlbum,
            "edit" => Intent::Edit,
            "filter" => Intent::Filter,
            "sort" => Intent::Sort,
            _ => Intent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Search => "search",
            Intent::CreateAlbum => "create_album",
            Intent::Edit => "edit",
            Intent::Filter => "filter",
            Intent::Sort => "sort",
            Intent::Unknown => "unknown",
        }
    }
}

// Unrecognized tags deserialize to Unknown rather than erroring; the model
// is not trusted to stay inside the enumerated set.
impl<'de> Deserialize<'de> for Intent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Intent::from_tag(&tag))
    }
}

/// Classifier output: an intent tag plus the raw parameter map exactly as
/// the model produced it. The map is persisted verbatim; handlers parse
/// their own typed view from it.
#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            parameters: Map::new(),
        }
    }
}

/// Parameters the search handler understands. Unknown extra fields are kept
/// for forward compatibility but otherwise ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(dead_code)]
pub struct SearchParameters {
    pub query: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub person: Option<String>,
    pub object: Option<String>,
    pub scene: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchParameters {
    pub fn from_map(parameters: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(parameters.clone())).unwrap_or_default()
    }
}

/// Parameters the create-album handler understands.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(dead_code)]
pub struct CreateAlbumParameters {
    pub album_name: Option<String>,
    pub description: Option<String>,
    pub query: Option<String>,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreateAlbumParameters {
    pub fn from_map(parameters: &Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(parameters.clone())).unwrap_or_default()
    }
}

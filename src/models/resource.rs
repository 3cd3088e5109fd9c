//! Resource data structure.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of learning resource attached to a module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Video,
    #[default]
    Document,
    Download,
    Link,
    Article,
    Exercise,
    Pdf,
}

impl ResourceType {
    /// Parse a stored type string, `None` for anything unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            "download" => Some(Self::Download),
            "link" => Some(Self::Link),
            "article" => Some(Self::Article),
            "exercise" => Some(Self::Exercise),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Document => "document",
            Self::Download => "download",
            Self::Link => "link",
            Self::Article => "article",
            Self::Exercise => "exercise",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-populated resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,

    pub title: String,

    #[serde(rename = "type")]
    pub kind: ResourceType,

    pub description: String,

    /// Target URL (empty for resources without a link)
    #[serde(default)]
    pub url: String,

    pub created_at: String,

    pub updated_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,

    /// Fields this crate does not model, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

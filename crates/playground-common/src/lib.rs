//! Shared domain and wire types for Idea Playground.
//!
//! The server (`idea-playground`) persists and serves these types; the board
//! client deserializes them and mutates them locally. JSON field names match
//! the REST surface, so `createdAt`/`updatedAt` and the camelCase request
//! fields are renamed explicitly.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Ideas ─────────────────────────────────────────────────────────────

/// Weighted link from one idea to another. Nothing checks that `idea`
/// still exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectedIdea {
    pub idea: String,
    pub relation_strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
    #[serde(default)]
    pub field: String,
    pub readiness: i64,
    pub complexity: i64,
    #[serde(default)]
    pub potentially_connected_idea: Option<ConnectedIdea>,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            field: String::new(),
            readiness: 1,
            complexity: 1,
            potentially_connected_idea: None,
        }
    }
}

/// A persisted idea, without its id. The id travels next to it: as the key
/// of the `ideas` map in list responses, or flattened in `IdeaRecord`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_json: Option<Value>,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub sub_ideas: Vec<String>,
    pub order: i64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl Idea {
    /// Merge the fields present in `patch`. Timestamps are left alone;
    /// refreshing `updated_at` is the store's job.
    pub fn apply_patch(&mut self, patch: &IdeaPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(content_json) = &patch.content_json {
            self.content_json = content_json.clone();
        }
        if let Some(dims) = &patch.dimensions {
            if let Some(field) = &dims.field {
                self.dimensions.field = field.clone();
            }
            if let Some(readiness) = dims.readiness {
                self.dimensions.readiness = readiness;
            }
            if let Some(complexity) = dims.complexity {
                self.dimensions.complexity = complexity;
            }
            if let Some(link) = &dims.potentially_connected_idea {
                self.dimensions.potentially_connected_idea = link.clone();
            }
        }
        if let Some(sub_ideas) = &patch.sub_ideas {
            self.sub_ideas = sub_ideas.clone();
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdeaRecord {
    pub id: String,
    #[serde(flatten)]
    pub idea: Idea,
}

/// Body of `POST /api/ideas`. Any `order` or timestamp the caller sends is
/// ignored; the server assigns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewIdea {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_json: Option<Value>,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub sub_ideas: Vec<String>,
}

/// Body of `PUT /api/ideas/:id`. Absent fields are left unchanged; for the
/// nullable fields an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdeaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_json: Option<Option<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<DimensionsPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_ideas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DimensionsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<i64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub potentially_connected_idea: Option<Option<ConnectedIdea>>,
}

impl IdeaPatch {
    /// Patch that only moves an idea to another readiness level.
    pub fn readiness(readiness: i64) -> Self {
        Self {
            dimensions: Some(DimensionsPatch {
                readiness: Some(readiness),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Full-content save of an edited idea. `order` is deliberately not
    /// carried so a save never repositions the idea.
    pub fn from_idea(idea: &Idea) -> Self {
        Self {
            title: Some(idea.title.clone()),
            content: Some(idea.content.clone()),
            content_json: Some(idea.content_json.clone()),
            dimensions: Some(DimensionsPatch {
                field: Some(idea.dimensions.field.clone()),
                readiness: Some(idea.dimensions.readiness),
                complexity: Some(idea.dimensions.complexity),
                potentially_connected_idea: Some(
                    idea.dimensions.potentially_connected_idea.clone(),
                ),
            }),
            sub_ideas: Some(idea.sub_ideas.clone()),
            order: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Distinguishes a missing field (`None`) from an explicit `null`
/// (`Some(None)`). Must be paired with `#[serde(default)]`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ── Filters ───────────────────────────────────────────────────────────

/// Exact-match filters on the three dimensions. Unset filters match
/// everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdeaFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<i64>,
}

impl IdeaFilters {
    pub fn matches(&self, dimensions: &Dimensions) -> bool {
        self.field.as_ref().is_none_or(|f| *f == dimensions.field)
            && self.readiness.is_none_or(|r| r == dimensions.readiness)
            && self.complexity.is_none_or(|c| c == dimensions.complexity)
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_none() && self.readiness.is_none() && self.complexity.is_none()
    }
}

// ── Request / response bodies ─────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdeasResponse {
    pub ideas: BTreeMap<String, Idea>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderRequest {
    #[serde(rename = "reorderedIds")]
    pub reordered_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidateTitleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "excludeId", default, skip_serializing_if = "Option::is_none")]
    pub exclude_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleValidation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_title: Option<String>,
}

impl TitleValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            conflicting_id: None,
            conflicting_title: None,
        }
    }

    pub fn conflict(id: String, title: String) -> Self {
        Self {
            is_valid: false,
            conflicting_id: Some(id),
            conflicting_title: Some(title),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub environment: String,
}

// ── Dimensions registry ───────────────────────────────────────────────

/// Config key under which the registry document is stored.
pub const DIMENSIONS_CONFIG_KEY: &str = "dimensions";

/// Registry served when none has been stored.
pub fn default_dimensions_registry() -> Value {
    serde_json::json!({
        "dimensions_registry": {
            "core_dimensions": {
                "max_dimensions": 4,
                "field": {
                    "description": "Domain of knowledge/application",
                    "values": [
                        "AI Infrastructure",
                        "DevOps",
                        "EdTech",
                        "Legal/Policy",
                        "Network Security",
                        "Philosophy",
                        "QA/Testing",
                        "Software Architecture",
                        "UI/UX Engineering"
                    ]
                },
                "readiness": {
                    "description": "How close to implementation (1-10)",
                    "scale": {
                        "1-2": "Research question only",
                        "3-4": "Concept defined, needs development",
                        "5-6": "Design complete, implementation started",
                        "7-8": "Working prototype/draft",
                        "9-10": "Ready to deploy/publish"
                    }
                },
                "complexity": {
                    "description": "Technical/conceptual difficulty (1-10)",
                    "scale": {
                        "1-2": "Trivial implementation",
                        "3-4": "Standard patterns apply",
                        "5-6": "Some novel challenges",
                        "7-8": "Significant technical/conceptual challenges",
                        "9-10": "Fundamental/unsolved problems"
                    }
                }
            }
        }
    })
}

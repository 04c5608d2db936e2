//! Declaration of the document index: fields, HNSW parameters, semantic configuration.

use serde::Serialize;

/// Name shared by the HNSW algorithm, vector profile, and semantic configuration.
pub const DEFAULT_CONFIGURATION_NAME: &str = "default";
/// HNSW bi-directional link count.
pub const HNSW_M: u32 = 4;
/// HNSW candidate list size during construction.
pub const HNSW_EF_CONSTRUCTION: u32 = 400;
/// HNSW candidate list size during search.
pub const HNSW_EF_SEARCH: u32 = 500;
/// Similarity metric used by the vector field.
pub const HNSW_METRIC: &str = "cosine";

/// Complete index definition sent by the provisioner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Field declarations in document order.
    pub fields: Vec<FieldDefinition>,
    /// HNSW algorithm and profile.
    pub vector_search: VectorSearch,
    /// Semantic ranking configuration.
    pub semantic: SemanticSettings,
}

/// One index field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Field name as it appears in documents.
    pub name: String,
    /// EDM type, e.g. `Edm.String`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether this field is the document key.
    #[serde(skip_serializing_if = "is_false")]
    pub key: bool,
    /// Full-text (or vector) searchable.
    pub searchable: bool,
    /// Usable in `$filter` expressions.
    pub filterable: bool,
    /// Returned in search results.
    pub retrievable: bool,
    /// Lucene analyzer for searchable strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// Vector length for vector fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// Vector profile name for vector fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

/// Vector search section of the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorSearch {
    /// Algorithm configurations.
    pub algorithms: Vec<HnswAlgorithm>,
    /// Profiles binding fields to algorithms.
    pub profiles: Vec<VectorProfile>,
}

/// HNSW algorithm configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswAlgorithm {
    /// Configuration name.
    pub name: String,
    /// Always `hnsw`.
    pub kind: String,
    /// Graph parameters.
    pub hnsw_parameters: HnswParameters,
}

/// Graph parameters for HNSW.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParameters {
    /// Neighbor count per node.
    pub m: u32,
    /// Candidate list size while building.
    pub ef_construction: u32,
    /// Candidate list size while querying.
    pub ef_search: u32,
    /// Distance metric.
    pub metric: String,
}

/// Named vector profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorProfile {
    /// Profile name referenced by vector fields.
    pub name: String,
    /// Algorithm configuration name.
    pub algorithm: String,
}

/// Semantic section of the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticSettings {
    /// Named configurations.
    pub configurations: Vec<SemanticConfiguration>,
}

/// One semantic ranking configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticConfiguration {
    /// Configuration name referenced by semantic queries.
    pub name: String,
    /// Fields the ranker reads.
    pub prioritized_fields: PrioritizedFields,
}

/// Title and content fields used by the semantic ranker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedFields {
    /// Title field.
    pub title_field: SemanticField,
    /// Content fields in priority order.
    pub prioritized_content_fields: Vec<SemanticField>,
}

/// Reference to a field by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticField {
    /// Field name.
    pub field_name: String,
}

impl IndexSchema {
    /// Build the document index definition for `name` with vectors of length `dimensions`.
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        let default_name = DEFAULT_CONFIGURATION_NAME.to_string();
        Self {
            name: name.into(),
            fields: vec![
                FieldDefinition {
                    key: true,
                    filterable: true,
                    ..FieldDefinition::simple("id", "Edm.String")
                },
                FieldDefinition {
                    analyzer: Some("standard.lucene".into()),
                    ..FieldDefinition::searchable("content")
                },
                FieldDefinition::searchable("title"),
                FieldDefinition {
                    filterable: true,
                    ..FieldDefinition::simple("language", "Edm.String")
                },
                FieldDefinition {
                    filterable: true,
                    ..FieldDefinition::simple("entities", "Collection(Edm.String)")
                },
                FieldDefinition {
                    searchable: true,
                    dimensions: Some(dimensions),
                    vector_search_profile: Some(default_name.clone()),
                    ..FieldDefinition::simple("contentVector", "Collection(Edm.Single)")
                },
            ],
            vector_search: VectorSearch {
                algorithms: vec![HnswAlgorithm {
                    name: default_name.clone(),
                    kind: "hnsw".into(),
                    hnsw_parameters: HnswParameters {
                        m: HNSW_M,
                        ef_construction: HNSW_EF_CONSTRUCTION,
                        ef_search: HNSW_EF_SEARCH,
                        metric: HNSW_METRIC.into(),
                    },
                }],
                profiles: vec![VectorProfile {
                    name: default_name.clone(),
                    algorithm: default_name.clone(),
                }],
            },
            semantic: SemanticSettings {
                configurations: vec![SemanticConfiguration {
                    name: default_name,
                    prioritized_fields: PrioritizedFields {
                        title_field: SemanticField {
                            field_name: "title".into(),
                        },
                        prioritized_content_fields: vec![SemanticField {
                            field_name: "content".into(),
                        }],
                    },
                }],
            },
        }
    }

    /// Declared vector length of `contentVector`.
    pub fn vector_dimensions(&self) -> Option<usize> {
        self.fields
            .iter()
            .find(|field| field.name == "contentVector")
            .and_then(|field| field.dimensions)
    }
}

impl FieldDefinition {
    fn simple(name: &str, kind: &str) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            key: false,
            searchable: false,
            filterable: false,
            retrievable: true,
            analyzer: None,
            dimensions: None,
            vector_search_profile: None,
        }
    }

    fn searchable(name: &str) -> Self {
        Self {
            searchable: true,
            ..Self::simple(name, "Edm.String")
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

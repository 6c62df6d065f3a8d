//! Data types exchanged with the Vectara API.
//!
//! Only the subset of the REST schema the toolkit actually touches is
//! modelled here: documents, corpora, and the search / generation / chat
//! parameter blocks used by chat. Every optional field is skipped on
//! serialization so requests stay minimal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document or part metadata. Keys are kept in sorted order, which makes the
/// JSON serialization of a [`Document`] canonical.
pub type Metadata = serde_json::Map<String, Value>;

/// The only document type the toolkit indexes.
pub const CORE_DOCUMENT_TYPE: &str = "core";

fn default_document_type() -> String {
    CORE_DOCUMENT_TYPE.to_string()
}

/// The service may send `"metadata": null` for a document without metadata.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Metadata, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Metadata>::deserialize(deserializer)?.unwrap_or_default())
}

/// A core document: an id plus an ordered list of text parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(rename = "type", default = "default_document_type")]
    pub doc_type: String,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Metadata::is_empty"
    )]
    pub metadata: Metadata,
    /// List endpoints omit parts, so this defaults to empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_parts: Vec<DocumentPart>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            doc_type: default_document_type(),
            metadata: Metadata::new(),
            document_parts: Vec::new(),
        }
    }

    pub fn with_part(mut self, text: impl Into<String>) -> Self {
        self.document_parts.push(DocumentPart::new(text));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One text section of a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl DocumentPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
            context: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Corpora
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAttributeType {
    Integer,
    ListInteger,
    RealNumber,
    ListRealNumber,
    Text,
    ListText,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAttributeLevel {
    Document,
    Part,
}

/// A metadata field the corpus indexes for filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterAttribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub indexed: bool,
    #[serde(rename = "type")]
    pub attr_type: FilterAttributeType,
    pub level: FilterAttributeLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusCustomDimension {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub indexing_default: f64,
    #[serde(default)]
    pub querying_default: f64,
}

/// A corpus as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_attributes: Vec<FilterAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_dimensions: Vec<CorpusCustomDimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Parameters for `POST /v2/corpora`.
///
/// Immutable value; use [`CorpusBuilder`] to assemble one step by step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCorpusRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_are_answers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_are_questions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_attributes: Vec<FilterAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_dimensions: Vec<CorpusCustomDimension>,
}

impl CreateCorpusRequest {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            key: Some(key.into()),
            ..Default::default()
        }
    }
}

/// Consuming builder for [`CreateCorpusRequest`].
///
/// ```rust
/// use vectara_kit::models::{CorpusBuilder, FilterAttributeLevel, FilterAttributeType};
///
/// let request = CorpusBuilder::new("Product docs")
///     .key("product_docs")
///     .description("Manuals and release notes")
///     .add_attribute("lang", "Document language", true, FilterAttributeType::Text, FilterAttributeLevel::Document)
///     .build();
/// assert_eq!(request.filter_attributes.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    request: CreateCorpusRequest,
}

impl CorpusBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            request: CreateCorpusRequest {
                name: Some(name.into()),
                ..Default::default()
            },
        }
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            request: CreateCorpusRequest {
                name: Some(name.into()),
                ..self.request
            },
        }
    }

    pub fn key(self, key: impl Into<String>) -> Self {
        Self {
            request: CreateCorpusRequest {
                key: Some(key.into()),
                ..self.request
            },
        }
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        Self {
            request: CreateCorpusRequest {
                description: Some(description.into()),
                ..self.request
            },
        }
    }

    pub fn add_attribute(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        indexed: bool,
        attr_type: FilterAttributeType,
        level: FilterAttributeLevel,
    ) -> Self {
        let mut request = self.request;
        request.filter_attributes.push(FilterAttribute {
            name: name.into(),
            description: Some(description.into()),
            indexed,
            attr_type,
            level,
        });
        Self { request }
    }

    pub fn add_dimension(
        self,
        name: impl Into<String>,
        indexing_default: f64,
        querying_default: f64,
    ) -> Self {
        let mut request = self.request;
        request.custom_dimensions.push(CorpusCustomDimension {
            name: name.into(),
            description: None,
            indexing_default,
            querying_default,
        });
        Self { request }
    }

    pub fn build(self) -> CreateCorpusRequest {
        self.request
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Query / chat parameters
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedSearchCorpus {
    pub corpus_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexical_interpolation: Option<f32>,
}

impl KeyedSearchCorpus {
    pub fn new(corpus_key: impl Into<String>) -> Self {
        Self {
            corpus_key: corpus_key.into(),
            metadata_filter: None,
            lexical_interpolation: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters_before: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters_after: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences_before: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences_after: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reranker {
    CustomerReranker {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reranker_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reranker_name: Option<String>,
    },
    Mmr {
        diversity_bias: f32,
    },
    None,
}

/// The `search` block of a query or chat request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCorporaParameters {
    #[serde(default)]
    pub corpora: Vec<KeyedSearchCorpus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_configuration: Option<ContextConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reranker: Option<Reranker>,
}

impl SearchCorporaParameters {
    /// Search a single corpus with service defaults.
    pub fn for_corpus(corpus_key: impl Into<String>) -> Self {
        Self {
            corpora: vec![KeyedSearchCorpus::new(corpus_key)],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationParameters {
    pub style: String,
}

/// The `generation` block of a query or chat request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_preset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_used_search_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_characters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<ModelParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<CitationParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_factual_consistency_score: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
}

/// Per-request transport settings. Never serialized into a request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub timeout_in_seconds: Option<u64>,
    pub additional_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_metadata: Option<Metadata>,
}

/// Response to a chat start or chat turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factual_consistency_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_serialization_is_key_ordered() {
        let doc = Document::new("doc-1")
            .with_part("hello")
            .with_metadata("zeta", 1)
            .with_metadata("alpha", "a");
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.find("\"alpha\"").unwrap() < json.find("\"zeta\"").unwrap());
        assert!(json.contains("\"type\":\"core\""));
    }

    #[test]
    fn test_listed_document_without_parts() {
        let doc: Document = serde_json::from_value(json!({
            "id": "ABC",
            "metadata": {"sha256": "abcd"}
        }))
        .unwrap();
        assert_eq!(doc.id, "ABC");
        assert!(doc.document_parts.is_empty());
        assert_eq!(doc.doc_type, "core");
    }

    #[test]
    fn test_listed_document_with_null_metadata() {
        let doc: Document = serde_json::from_str(r#"{"id":"A","metadata":null}"#).unwrap();
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_builder_returns_fresh_values() {
        let base = CorpusBuilder::new("name").key("key");
        let with_description = base.clone().description("described");
        assert_eq!(base.build().description, None);
        assert_eq!(
            with_description.build().description.as_deref(),
            Some("described")
        );
    }

    #[test]
    fn test_reranker_tagging() {
        let reranker = Reranker::CustomerReranker {
            reranker_id: Some("rnk_272725719".into()),
            reranker_name: None,
        };
        assert_eq!(
            serde_json::to_value(&reranker).unwrap(),
            json!({"type": "customer_reranker", "reranker_id": "rnk_272725719"})
        );
    }

    #[test]
    fn test_create_corpus_request_skips_empty_fields() {
        let request = CreateCorpusRequest::new("Lab", "lab_key");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "Lab", "key": "lab_key"})
        );
    }
}

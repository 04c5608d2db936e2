//! Wire types for the document-analysis REST API.

use serde::Deserialize;

/// Language recorded when the service detects none.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Text, language and entities extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedDocument {
    /// Paragraph contents joined by a single space.
    pub content: String,
    /// First detected locale, [`DEFAULT_LANGUAGE`] otherwise.
    pub language: String,
    /// Entity contents in detection order.
    pub entities: Vec<String>,
}

impl From<AnalyzeResult> for AnalyzedDocument {
    fn from(result: AnalyzeResult) -> Self {
        let content = result
            .paragraphs
            .into_iter()
            .map(|paragraph| paragraph.content)
            .collect::<Vec<_>>()
            .join(" ");
        let language = result
            .languages
            .into_iter()
            .next()
            .map(|language| language.locale)
            .filter(|locale| !locale.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let entities = result
            .entities
            .into_iter()
            .map(|entity| entity.content)
            .collect();

        Self {
            content,
            language,
            entities,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeOperation {
    pub(crate) status: OperationStatus,
    #[serde(default)]
    pub(crate) analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    pub(crate) error: Option<OperationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OperationError {
    #[serde(default)]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) message: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnalyzeResult {
    #[serde(default)]
    pub(crate) paragraphs: Vec<TextItem>,
    #[serde(default)]
    pub(crate) languages: Vec<DetectedLanguage>,
    #[serde(default)]
    pub(crate) entities: Vec<TextItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextItem {
    #[serde(default)]
    pub(crate) content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetectedLanguage {
    #[serde(default)]
    pub(crate) locale: String,
}

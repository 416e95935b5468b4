//! Response models for the Content Safety text operations.
//!
//! These are decoded leniently: missing fields take their defaults and
//! fields the service adds later are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtectedMaterialResult {
    pub protected_material_analysis: ProtectedMaterialAnalysis,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtectedMaterialAnalysis {
    pub detected: bool,
    pub code_citations: Vec<CodeCitation>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeCitation {
    pub license: String,
    pub source_urls: Vec<String>,
}

impl ProtectedMaterialResult {
    pub fn detected(&self) -> bool {
        self.protected_material_analysis.detected
    }
}

impl fmt::Display for ProtectedMaterialResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = &self.protected_material_analysis;
        writeln!(f, "Final decision: {}", analysis.detected)?;
        for citation in &analysis.code_citations {
            writeln!(f, "License: {}", citation.license)?;
            writeln!(f, "Source URLs:")?;
            for url in &citation.source_urls {
                writeln!(f, "{url}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShieldPromptResult {
    pub user_prompt_analysis: Option<AttackAnalysis>,
    pub documents_analysis: Vec<AttackAnalysis>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttackAnalysis {
    pub attack_detected: bool,
}

impl ShieldPromptResult {
    /// True when the prompt or any document was flagged.
    pub fn attack_detected(&self) -> bool {
        self.user_prompt_analysis
            .is_some_and(|analysis| analysis.attack_detected)
            || self
                .documents_analysis
                .iter()
                .any(|analysis| analysis.attack_detected)
    }
}

impl fmt::Display for ShieldPromptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(analysis) = self.user_prompt_analysis {
            writeln!(f, "User prompt attack detected: {}", analysis.attack_detected)?;
        }
        for (index, analysis) in self.documents_analysis.iter().enumerate() {
            writeln!(
                f,
                "Document {index} attack detected: {}",
                analysis.attack_detected
            )?;
        }
        Ok(())
    }
}

/// Error envelope returned with non-2xx statuses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiErrorResponse {
    pub error: Option<ApiError>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub target: Option<String>,
    pub innererror: Option<ApiInnerError>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiInnerError {
    pub code: Option<String>,
    pub innererror: Option<String>,
}

impl ApiErrorResponse {
    /// Extracts the envelope from a response body, if the body is one and it
    /// names at least a code or a message.
    pub fn parse(body: &[u8]) -> Option<ApiError> {
        let response: Self = sonic_rs::from_slice(body).ok()?;
        response
            .error
            .filter(|error| error.code.is_some() || error.message.is_some())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code.as_deref().unwrap_or("Unknown");
        match &self.message {
            Some(message) => write!(f, "{code}: {message}"),
            None => f.write_str(code),
        }
    }
}

//! Request bodies for the Content Safety text operations.
//!
//! Every field defaults when absent and unknown fields are ignored, so a body
//! read back from disk or stdin never fails on shape alone.

use serde::{Deserialize, Serialize};

/// Body of `text:detectProtectedMaterialForCode`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectedMaterialRequest {
    pub code: String,
}

impl ProtectedMaterialRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Body of `text:shieldPrompt`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShieldPromptRequest {
    pub user_prompt: String,
    pub documents: Vec<String>,
}

impl ShieldPromptRequest {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            documents: Vec::new(),
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.documents.push(document.into());
        self
    }

    pub fn with_documents<I, S>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.documents.extend(documents.into_iter().map(Into::into));
        self
    }
}

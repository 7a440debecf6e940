//! Query request types

use serde::{Deserialize, Serialize};

/// What the caller wants done with the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Structured analysis of a document (key clauses, issues)
    Analyze,
    /// Free-form question answered against reference documents
    Chat,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Analyze => "analyze",
            Purpose::Chat => "chat",
        }
    }
}

/// A reference document supplied alongside the main text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRef {
    pub name: String,
    pub text: String,
}

impl ContextRef {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// An analysis or chat request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    raw_text: String,
    purpose: Purpose,
    context_refs: Vec<ContextRef>,
    max_output_tokens: Option<u32>,
    preferred_model: Option<String>,
}

impl QueryRequest {
    pub fn new(purpose: Purpose, raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            purpose,
            context_refs: Vec::new(),
            max_output_tokens: None,
            preferred_model: None,
        }
    }

    /// Analyze a document's text
    pub fn analyze(raw_text: impl Into<String>) -> Self {
        Self::new(Purpose::Analyze, raw_text)
    }

    /// Ask a question; the document goes in as a context reference
    pub fn chat(question: impl Into<String>) -> Self {
        Self::new(Purpose::Chat, question)
    }

    pub fn with_context(mut self, context: ContextRef) -> Self {
        self.context_refs.push(context);
        self
    }

    pub fn with_contexts(mut self, contexts: impl IntoIterator<Item = ContextRef>) -> Self {
        self.context_refs.extend(contexts);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_preferred_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.preferred_model = if model.trim().is_empty() {
            None
        } else {
            Some(model)
        };
        self
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    pub fn context_refs(&self) -> &[ContextRef] {
        &self.context_refs
    }

    pub fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    pub fn preferred_model(&self) -> Option<&str> {
        self.preferred_model.as_deref()
    }
}

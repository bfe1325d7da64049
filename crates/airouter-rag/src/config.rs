/// RAG Orchestrator tunables (design doc §4.11, §6's configuration
/// enumeration). Defaults mirror `rag/context_builder.py`'s environment
/// variables (`RAG_MAX_CONTEXT_TOKENS`, `RAG_CHARS_PER_TOKEN`,
/// `RAG_INCLUDE_METADATA`).
#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    pub max_context_tokens: u32,
    pub chars_per_token: f32,
    pub include_metadata: bool,

    /// Answer returned when retrieval comes back empty (design doc §7's
    /// propagation policy for `retrieval_empty`).
    pub no_information_answer: String,

    pub redact_pii: bool,

    /// Minimum answer/citation word-overlap ratio below which the
    /// hallucination detector raises its flag, keyed by strictness level
    /// (stricter prompts demand tighter grounding).
    pub hallucination_floor_lenient: f32,
    pub hallucination_floor_normal: f32,
    pub hallucination_floor_strict: f32,

    pub max_query_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 3000,
            chars_per_token: 4.0,
            include_metadata: true,
            no_information_answer:
                "I don't have enough information in the available sources to answer this question."
                    .to_string(),
            redact_pii: true,
            hallucination_floor_lenient: 0.10,
            hallucination_floor_normal: 0.20,
            hallucination_floor_strict: 0.35,
            max_query_chars: 8000,
        }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    pub fn hallucination_floor(&self, strictness: crate::models::StrictnessLevel) -> f32 {
        use crate::models::StrictnessLevel::*;
        match strictness {
            Lenient => self.hallucination_floor_lenient,
            Normal => self.hallucination_floor_normal,
            Strict => self.hallucination_floor_strict,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    max_context_tokens: Option<u32>,
    chars_per_token: Option<f32>,
    include_metadata: Option<bool>,
    no_information_answer: Option<String>,
    redact_pii: Option<bool>,
    max_query_chars: Option<usize>,
}

impl RagConfigBuilder {
    pub fn max_context_tokens(mut self, tokens: u32) -> Self {
        self.max_context_tokens = Some(tokens);
        self
    }

    pub fn chars_per_token(mut self, ratio: f32) -> Self {
        self.chars_per_token = Some(ratio);
        self
    }

    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = Some(include);
        self
    }

    pub fn no_information_answer(mut self, answer: impl Into<String>) -> Self {
        self.no_information_answer = Some(answer.into());
        self
    }

    pub fn redact_pii(mut self, redact: bool) -> Self {
        self.redact_pii = Some(redact);
        self
    }

    pub fn max_query_chars(mut self, chars: usize) -> Self {
        self.max_query_chars = Some(chars);
        self
    }

    pub fn build(self) -> RagConfig {
        let defaults = RagConfig::default();
        RagConfig {
            max_context_tokens: self.max_context_tokens.unwrap_or(defaults.max_context_tokens),
            chars_per_token: self.chars_per_token.unwrap_or(defaults.chars_per_token),
            include_metadata: self.include_metadata.unwrap_or(defaults.include_metadata),
            no_information_answer: self.no_information_answer.unwrap_or(defaults.no_information_answer),
            redact_pii: self.redact_pii.unwrap_or(defaults.redact_pii),
            max_query_chars: self.max_query_chars.unwrap_or(defaults.max_query_chars),
            ..defaults
        }
    }
}

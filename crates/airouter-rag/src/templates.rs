//! Step 6 of the RAG pipeline (design doc §4.11, §9 Design Notes: "a static
//! map from name to (system preamble, user body template, declared variable
//! set)"). The six templates and their exact bodies are ported verbatim
//! from `rag/prompt_manager.py`'s `_load_default_templates`.

use std::collections::HashMap;

use crate::models::StrictnessLevel;

/// A named prompt template. Unlike `rag/prompt_manager.py`'s runtime
/// `str.format` substitution (which silently returns the raw template on a
/// missing variable), placeholder substitution here is a plain string
/// replace: every call site in [`crate::pipeline::RagPipeline`] supplies the
/// full variable set a template declares, so a placeholder surviving
/// substitution is a caller bug, not a request-time condition (design doc
/// §9: "missing variables are a programmer error surfaced at load time").
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub system_prompt: &'static str,
    pub user_prompt_template: &'static str,
    pub variables: &'static [&'static str],
}

impl PromptTemplate {
    pub fn format(&self, vars: &HashMap<&str, String>) -> String {
        let mut rendered = self.user_prompt_template.to_string();
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }
        rendered
    }

    /// Design doc §4.11 step 6 ("strictness level selects among template
    /// variants") and the glossary's "how aggressively the model is
    /// instructed to stay grounded": scales the template's base system
    /// preamble by strictness rather than forking the six templates into
    /// eighteen near-duplicates, so each template stays the single source of
    /// truth for its subject matter while strictness governs only how hard
    /// it insists on staying grounded in the retrieved context.
    pub fn system_prompt_for(&self, strictness: StrictnessLevel) -> String {
        match strictness {
            StrictnessLevel::Strict => format!(
                "{}\n\nSTRICT MODE: Answer using ONLY the provided context documents. \
If the documents do not fully support an answer, say so explicitly instead of \
inferring or guessing, and do not introduce any fact that is not directly \
traceable to a cited document.",
                self.system_prompt
            ),
            StrictnessLevel::Normal => self.system_prompt.to_string(),
            StrictnessLevel::Lenient => format!(
                "{}\n\nYou may supplement the provided context with your general \
knowledge when the documents are incomplete, but prefer and prioritize the \
provided context whenever it is relevant.",
                self.system_prompt
            ),
        }
    }
}

const STANDARD: PromptTemplate = PromptTemplate {
    name: "standard",
    description: "Standard RAG with citations",
    system_prompt: "You are a helpful AI assistant specializing in legal information.\n\
Your task is to answer questions based ONLY on the provided context documents.\n\
If the context doesn't contain enough information to answer the question, clearly state that.\n\
Always cite your sources using [1], [2], etc. to reference the documents.\n\
Be precise, accurate, and cite relevant sections of the law or precedents.",
    user_prompt_template: "Context Documents:\n\
{context}\n\n\
Question: {query}\n\n\
Instructions:\n\
1. Answer the question based on the context above\n\
2. Cite sources using [1], [2], etc.\n\
3. If you're uncertain, say so\n\
4. Be concise but thorough\n\n\
Answer:",
    variables: &["context", "query"],
};

const LEGAL_ANALYSIS: PromptTemplate = PromptTemplate {
    name: "legal_analysis",
    description: "Detailed legal analysis with structure",
    system_prompt: "You are an expert legal AI assistant with deep knowledge of Indian law.\n\
Analyze legal questions with precision, citing relevant statutes, case law, and precedents.\n\
Structure your analysis clearly and always distinguish between settled law and interpretation.\n\
Cite all sources explicitly.",
    user_prompt_template: "Legal Context:\n\
{context}\n\n\
Legal Question: {query}\n\n\
Please provide a comprehensive legal analysis that includes:\n\
1. **Relevant Law**: Cite applicable statutes, sections, and provisions\n\
2. **Case Precedents**: Reference relevant case law if available\n\
3. **Analysis**: Apply the law to the specific question\n\
4. **Conclusion**: Provide a clear answer based on the analysis\n\
5. **Caveats**: Note any limitations or areas requiring expert review\n\n\
Analysis:",
    variables: &["context", "query"],
};

const CONVERSATIONAL: PromptTemplate = PromptTemplate {
    name: "conversational",
    description: "Multi-turn conversational RAG",
    system_prompt: "You are a friendly AI legal assistant engaged in a conversation.\n\
Maintain context from previous messages and provide helpful, conversational responses.\n\
Always ground your answers in the provided documents and previous conversation.\n\
Cite sources when making factual claims.",
    user_prompt_template: "Previous Conversation:\n\
{conversation_history}\n\n\
Current Context:\n\
{context}\n\n\
User's Question: {query}\n\n\
Respond naturally while:\n\
- Referencing previous discussion if relevant\n\
- Citing sources from the context\n\
- Maintaining a conversational tone\n\
- Asking clarifying questions if needed\n\n\
Response:",
    variables: &["conversation_history", "context", "query"],
};

const SUMMARIZATION: PromptTemplate = PromptTemplate {
    name: "summarization",
    description: "Document summarization",
    system_prompt: "You are an AI that creates concise, accurate summaries of legal documents.\n\
Focus on key points, important dates, parties involved, and legal implications.\n\
Preserve critical details while removing redundancy.",
    user_prompt_template: "Documents to Summarize:\n\
{context}\n\n\
Create a summary that covers:\n\
- Main topic/issue\n\
- Key parties or entities\n\
- Important dates and deadlines\n\
- Critical legal points\n\
- Outcome or current status (if applicable)\n\n\
Summary:",
    variables: &["context"],
};

const COMPARISON: PromptTemplate = PromptTemplate {
    name: "comparison",
    description: "Compare multiple sources",
    system_prompt: "You are an AI that compares and contrasts multiple legal sources.\n\
Identify similarities, differences, conflicts, and complementary aspects.\n\
Present your comparison in a clear, structured format.",
    user_prompt_template: "Sources to Compare:\n\
{context}\n\n\
Question: {query}\n\n\
Provide a structured comparison:\n\
1. **Common Ground**: What the sources agree on\n\
2. **Differences**: Where sources diverge or conflict\n\
3. **Hierarchy**: Which source takes precedence (if applicable)\n\
4. **Synthesis**: Integrated understanding\n\
5. **Implications**: What this means for the question\n\n\
Comparison:",
    variables: &["context", "query"],
};

const FOLLOW_UP: PromptTemplate = PromptTemplate {
    name: "follow_up",
    description: "Generate follow-up questions",
    system_prompt: "You generate relevant follow-up questions based on a query and answer.\n\
Questions should help users explore the topic more deeply or clarify edge cases.",
    user_prompt_template: "Original Query: {query}\n\n\
Answer Provided: {answer}\n\n\
Context Used: {context}\n\n\
Generate 2 relevant follow-up questions that:\n\
- Explore related aspects of the topic\n\
- Help clarify potential ambiguities\n\
- Guide further research\n\
- Are natural next questions a user might ask\n\n\
Format as JSON array:\n\
[\n\
  {{\"question\": \"...\", \"reasoning\": \"...\", \"priority\": 1}},\n\
  {{\"question\": \"...\", \"reasoning\": \"...\", \"priority\": 2}}\n\
]\n\n\
Follow-up Questions:",
    variables: &["query", "answer", "context"],
};

/// Fixed registry of the six built-in templates (design doc §4.11 step 6:
/// "one of: standard, legal analysis, conversational, summarization,
/// comparison, follow-up").
pub struct TemplateRegistry {
    templates: HashMap<&'static str, PromptTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        for template in [STANDARD, LEGAL_ANALYSIS, CONVERSATIONAL, SUMMARIZATION, COMPARISON, FOLLOW_UP] {
            templates.insert(template.name, template);
        }
        Self { templates }
    }

    /// Falls back to `standard` for an unknown name, mirroring
    /// `PromptManager.format_prompt`'s own fallback.
    pub fn get(&self, name: &str) -> &PromptTemplate {
        self.templates.get(name).unwrap_or_else(|| &self.templates["standard"])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.templates.keys().copied().collect()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_loads_all_six_templates() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.names().len(), 6);
        for name in ["standard", "legal_analysis", "conversational", "summarization", "comparison", "follow_up"] {
            assert!(registry.names().contains(&name));
        }
    }

    #[test]
    fn unknown_template_falls_back_to_standard() {
        let registry = TemplateRegistry::new();
        assert_eq!(registry.get("nonexistent").name, "standard");
    }

    #[test]
    fn format_substitutes_named_placeholders() {
        let registry = TemplateRegistry::new();
        let template = registry.get("standard");
        let mut vars = HashMap::new();
        vars.insert("context", "some context".to_string());
        vars.insert("query", "what is X?".to_string());
        let rendered = template.format(&vars);
        assert!(rendered.contains("some context"));
        assert!(rendered.contains("what is X?"));
        assert!(!rendered.contains("{context}"));
    }

    #[test]
    fn follow_up_template_declares_answer_variable() {
        let registry = TemplateRegistry::new();
        assert!(registry.get("follow_up").variables.contains(&"answer"));
    }

    #[test]
    fn strictness_scales_the_system_preamble_without_changing_the_base() {
        let registry = TemplateRegistry::new();
        let template = registry.get("standard");

        let normal = template.system_prompt_for(StrictnessLevel::Normal);
        assert_eq!(normal, template.system_prompt);

        let strict = template.system_prompt_for(StrictnessLevel::Strict);
        assert!(strict.starts_with(template.system_prompt));
        assert!(strict.contains("STRICT MODE"));

        let lenient = template.system_prompt_for(StrictnessLevel::Lenient);
        assert!(lenient.starts_with(template.system_prompt));
        assert_ne!(lenient, strict);
    }
}

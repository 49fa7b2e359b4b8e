use std::sync::Arc;

use common::{domain::Message, error::AppError, llm::LlmClient};
use regex::Regex;
use std::sync::OnceLock;

use crate::service::RetrievedChunk;

const NO_INFORMATION_ANSWER: &str =
    "I don't have enough information in the provided sources to answer this question.";
const MAX_HISTORY_MESSAGES: usize = 5;
const MAX_HISTORY_CHARS: usize = 500;
const SNIPPET_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are a research assistant. Answer the question using only the \
numbered sources provided. Attach a [n] marker to every factual claim, referencing the source \
number it came from, using [1], [2], and so on. If the sources do not cover the question, say so \
explicitly rather than guessing.";

#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    pub citation_index: usize,
    pub document_id: String,
    pub chunk_id: String,
    pub document_title: Option<String>,
    pub document_url: String,
    pub char_start: usize,
    pub char_end: usize,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub answer_text: String,
    pub citations: Vec<Citation>,
    pub sources_used: usize,
}

pub struct RagAnswerer {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl RagAnswerer {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, model: String) -> Self {
        Self { llm, model }
    }

    /// Builds a numbered-source prompt, invokes the LLM, and extracts `[n]`
    /// citations from the answer. Returns a fixed no-information
    /// answer with no citations when `retrieved` is empty.
    #[tracing::instrument(skip(self, question, retrieved, conversation_history))]
    pub async fn answer(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
        conversation_history: Option<&[Message]>,
    ) -> Result<AnswerResult, AppError> {
        if retrieved.is_empty() {
            return Ok(AnswerResult {
                answer_text: NO_INFORMATION_ANSWER.to_string(),
                citations: Vec::new(),
                sources_used: 0,
            });
        }

        let source_block = build_source_block(retrieved);
        let mut user_prompt = String::new();
        if let Some(history) = conversation_history {
            let formatted = format_history(history);
            if !formatted.is_empty() {
                user_prompt.push_str(&formatted);
                user_prompt.push_str("\n\n");
            }
        }
        user_prompt.push_str(&source_block);
        user_prompt.push_str("\n\nQuestion: ");
        user_prompt.push_str(question);

        let answer_text = self.llm.chat(&self.model, SYSTEM_PROMPT, &user_prompt).await?;
        let citations = extract_citations(&answer_text, retrieved);

        Ok(AnswerResult {
            answer_text,
            citations,
            sources_used: retrieved.len(),
        })
    }
}

fn build_source_block(retrieved: &[RetrievedChunk]) -> String {
    let mut block = String::from("Sources:\n");
    for (index, hit) in retrieved.iter().enumerate() {
        let title = hit.document.title.as_deref().unwrap_or(&hit.document.url);
        block.push_str(&format!(
            "[{}] {} ({})\n{}\n\n",
            index + 1,
            title,
            hit.document.url,
            hit.chunk.content
        ));
    }
    block
}

fn format_history(history: &[Message]) -> String {
    let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    history[start..]
        .iter()
        .map(|message| {
            let role = match message.role {
                common::domain::MessageRole::User => "User",
                common::domain::MessageRole::Assistant => "Assistant",
            };
            let content = truncate_chars(&message.content, MAX_HISTORY_CHARS);
            format!("{role}: {content}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

fn citation_regex() -> &'static Regex {
    static CITATION_REGEX: OnceLock<Regex> = OnceLock::new();
    CITATION_REGEX.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("static citation regex"))
}

/// Scans `answer_text` for `[k]` markers, keeping the first occurrence of
/// each distinct, in-range `k` in order of first mention.
fn extract_citations(answer_text: &str, retrieved: &[RetrievedChunk]) -> Vec<Citation> {
    let mut seen = Vec::new();
    let mut citations = Vec::new();

    for capture in citation_regex().captures_iter(answer_text) {
        let Ok(index) = capture[1].parse::<usize>() else {
            continue;
        };
        if index == 0 || index > retrieved.len() || seen.contains(&index) {
            continue;
        }
        seen.push(index);

        let hit = &retrieved[index - 1];
        let snippet = build_snippet(&hit.chunk.content);
        citations.push(Citation {
            citation_index: index,
            document_id: hit.document.id.clone(),
            chunk_id: hit.chunk.id.clone(),
            document_title: hit.document.title.clone(),
            document_url: hit.document.url.clone(),
            char_start: hit.chunk.char_start,
            char_end: hit.chunk.char_end,
            snippet,
        });
    }

    citations
}

fn build_snippet(content: &str) -> String {
    if content.chars().count() <= SNIPPET_CHARS {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(SNIPPET_CHARS).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{Chunk, Document};

    fn retrieved_chunk(content: &str, url: &str, title: Option<&str>) -> RetrievedChunk {
        let mut document = Document::new("notebook-1".into(), url.into());
        document.title = title.map(str::to_string);
        let chunk = Chunk::new(document.id.clone(), content.into(), 0, content.len(), 0, 10);
        RetrievedChunk {
            chunk,
            document,
            score: 0.9,
        }
    }

    struct ScriptedLlm {
        response: String,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat(&self, _model: &str, _system: &str, _user: &str) -> Result<String, AppError> {
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn empty_retrieval_yields_fixed_answer_without_citations() {
        let answerer = RagAnswerer::new(
            Arc::new(ScriptedLlm {
                response: "unused".into(),
            }),
            "gpt".into(),
        );
        let result = answerer.answer("What is it?", &[], None).await.unwrap();
        assert_eq!(result.answer_text, NO_INFORMATION_ANSWER);
        assert!(result.citations.is_empty());
        assert_eq!(result.sources_used, 0);
    }

    #[tokio::test]
    async fn citations_are_deduped_and_ordered_by_first_mention() {
        let retrieved = vec![
            retrieved_chunk("alpha content", "https://a.example", Some("Alpha")),
            retrieved_chunk("beta content", "https://b.example", Some("Beta")),
        ];
        let answerer = RagAnswerer::new(
            Arc::new(ScriptedLlm {
                response: "Beta says [2]. Alpha confirms [1]. Again [2]. Out of range [9].".into(),
            }),
            "gpt".into(),
        );

        let result = answerer.answer("q", &retrieved, None).await.unwrap();
        assert_eq!(result.sources_used, 2);
        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.citations[0].citation_index, 2);
        assert_eq!(result.citations[0].document_url, "https://b.example");
        assert_eq!(result.citations[1].citation_index, 1);
        assert_eq!(result.citations[1].document_url, "https://a.example");
    }

    #[test]
    fn history_is_capped_to_the_last_five_messages_and_truncated() {
        let mut history = Vec::new();
        for i in 0..8 {
            history.push(Message::user(format!("message {i}")));
        }
        history.push(Message::assistant("x".repeat(600)));

        let formatted = format_history(&history);
        assert_eq!(formatted.lines().count(), MAX_HISTORY_MESSAGES);
        assert!(formatted.lines().last().unwrap().chars().count() <= MAX_HISTORY_CHARS + "Assistant: ".len());
        assert!(!formatted.contains("message 0"));
    }
}

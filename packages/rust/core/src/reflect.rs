//! Reflective-question generation with lenient structured-output parsing.
//!
//! A second, independent generation call produces a small set of reflective
//! prompts about using automated assistance. Generation output is parsed
//! leniently — reasoning wrappers are stripped and every brace-delimited
//! candidate is tried longest-first — and the parsing heuristic is isolated
//! here so stricter validation can later replace it without touching callers.
//! The caller always receives a non-empty list.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{error, instrument};

use studybundle_shared::{ActivityNotifier, StudyBundleError, Task};

use crate::llm::{ChatClient, ChatMessage, ChatRequest};

/// Fallback question when generation or parsing fails entirely.
const DEFAULT_QUESTION: &str = "What did you learn from this experience?";

const REFLECT_SYSTEM_PROMPT: &str = "You are an AI assistant specialized in educational \
    psychology and ethical reflection. Your task is to generate a series of reflective \
    questions for a student who is considering using an LLM or similar tool to complete a \
    specific academic assignment. The goal of these questions is to prompt the student to \
    pause, think critically about their decision, and consider the implications of using the \
    tool versus completing the assignment themselves. Root the questions in consequences \
    analysis, values clarification, motivational interviewing, cognitive behavioral \
    principles, and principles of learning and skill development. Make the questions as \
    relevant and specific as possible to the learning objectives and content of the \
    assignment. Output JSON format: {\"questions\": [\"Q1\", \"Q2\", ...]}";

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

/// Structured payload expected from the generation collaborator.
#[derive(Debug, Deserialize)]
struct QuestionSet {
    questions: Vec<String>,
}

/// Generates reflective questions for a task; never fails the caller.
pub struct ReflectionGenerator {
    client: Arc<dyn ChatClient>,
    model: String,
    notifier: Arc<dyn ActivityNotifier>,
}

impl ReflectionGenerator {
    pub fn new(
        client: Arc<dyn ChatClient>,
        model: impl Into<String>,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            notifier,
        }
    }

    /// Produce a non-empty list of reflective questions for `task`.
    #[instrument(skip_all, fields(task = %task.name))]
    pub async fn generate(&self, course_name: &str, task: &Task) -> Vec<String> {
        let user_prompt = format!(
            "Generate between 5 and 8 distinct questions to present to a student who is \
             considering using an LLM to solve the following homework assignment. The tone of \
             the questions should be neutral and reflective, not accusatory or preachy.\n\n\
             - CLASS: {course_name}\n\
             - ASSIGNMENT: {name}\n\
             - DESCRIPTION: {description}\n\n\
             Questions should be open-ended, focus on learning consequences, ethics, and \
             personal growth, avoid accusatory language, and be concise (max 15 words each).\n\n\
             The only output should be in JSON format: {{\"questions\": [\"Q1\", \"Q2\", ...]}}",
            name = task.name,
            description = task.description
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(REFLECT_SYSTEM_PROMPT),
                ChatMessage::user(user_prompt),
            ],
            temperature: 0.3,
            max_tokens: None,
        };

        let raw = match self.client.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "reflective question generation failed");
                self.notifier.notify("Error_reflective_questions_generation");
                return vec![DEFAULT_QUESTION.to_string()];
            }
        };

        match parse_question_set(&raw) {
            Some(questions) => {
                self.notifier.notify(&format!(
                    "Reflective_questions_generated_{}",
                    questions.len()
                ));
                questions
            }
            None => {
                let err = StudyBundleError::ResponseParse(
                    "no well-formed question structure in response".into(),
                );
                error!(error = %err, "reflective question parsing failed");
                self.notifier.notify("Error_reflective_questions_parse");
                vec![DEFAULT_QUESTION.to_string()]
            }
        }
    }
}

/// Lenient parse of the collaborator's structured output.
///
/// Strips `<think>` wrappers, then tries every brace-delimited substring of
/// the remaining text longest-first; the whole cleaned text is the final
/// candidate. An empty question list counts as a parse failure.
pub(crate) fn parse_question_set(raw: &str) -> Option<Vec<String>> {
    let cleaned = THINK_RE.replace_all(raw, "");
    let cleaned: &str = cleaned.as_ref();

    let opens: Vec<usize> = cleaned.char_indices().filter(|(_, c)| *c == '{').map(|(i, _)| i).collect();
    let closes: Vec<usize> = cleaned.char_indices().filter(|(_, c)| *c == '}').map(|(i, _)| i + 1).collect();

    let mut candidates: Vec<&str> = Vec::new();
    for &start in &opens {
        for &end in &closes {
            if end > start {
                candidates.push(&cleaned[start..end]);
            }
        }
    }
    candidates.sort_by_key(|c| std::cmp::Reverse(c.len()));

    for candidate in candidates {
        if let Ok(parsed) = serde_json::from_str::<QuestionSet>(candidate) {
            if !parsed.questions.is_empty() {
                return Some(parsed.questions);
            }
        }
    }

    serde_json::from_str::<QuestionSet>(cleaned.trim())
        .ok()
        .filter(|set| !set.questions.is_empty())
        .map(|set| set.questions)
}

#[cfg(test)]
mod tests {
    use studybundle_shared::SilentActivity;

    use super::*;
    use crate::testing::{FailChat, ReplyChat};

    fn sample_task() -> Task {
        Task {
            id: 3,
            name: "Problem set 4".into(),
            description: "Prove the theorem.".into(),
            links: vec![],
            video_ids: vec![],
        }
    }

    #[test]
    fn parses_think_wrapped_payload() {
        let raw = "<think>reasoning</think>{\"questions\":[\"Q1\",\"Q2\"]}";
        assert_eq!(
            parse_question_set(raw),
            Some(vec!["Q1".to_string(), "Q2".to_string()])
        );
    }

    #[test]
    fn parses_payload_embedded_in_prose() {
        let raw = "Here you go:\n{\"questions\": [\"Why this tool?\"]}\nHope that helps!";
        assert_eq!(parse_question_set(raw), Some(vec!["Why this tool?".to_string()]));
    }

    #[test]
    fn prefers_longest_valid_candidate() {
        // The outer object is valid and longer than the inner fragment.
        let raw = "{\"questions\": [\"A {braced} question\", \"B\"]}";
        assert_eq!(
            parse_question_set(raw),
            Some(vec!["A {braced} question".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn rejects_garbage_and_empty_lists() {
        assert_eq!(parse_question_set("no structure here"), None);
        assert_eq!(parse_question_set("{\"questions\": []}"), None);
        assert_eq!(parse_question_set("{\"other\": 1}"), None);
    }

    #[tokio::test]
    async fn generation_failure_returns_default_question() {
        let generator = ReflectionGenerator::new(
            Arc::new(FailChat),
            "test-model",
            Arc::new(SilentActivity),
        );
        let questions = generator.generate("CS 101", &sample_task()).await;
        assert_eq!(questions, vec![DEFAULT_QUESTION.to_string()]);
    }

    #[tokio::test]
    async fn unparseable_output_returns_default_question() {
        let generator = ReflectionGenerator::new(
            Arc::new(ReplyChat("I cannot answer in JSON.".into())),
            "test-model",
            Arc::new(SilentActivity),
        );
        let questions = generator.generate("CS 101", &sample_task()).await;
        assert_eq!(questions, vec![DEFAULT_QUESTION.to_string()]);
    }

    #[tokio::test]
    async fn well_formed_output_yields_question_list() {
        let generator = ReflectionGenerator::new(
            Arc::new(ReplyChat(
                "<think>hmm</think>{\"questions\":[\"Q1\",\"Q2\",\"Q3\"]}".into(),
            )),
            "test-model",
            Arc::new(SilentActivity),
        );
        let questions = generator.generate("CS 101", &sample_task()).await;
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0], "Q1");
    }
}

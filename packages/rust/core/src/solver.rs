//! Prompt assembly and solution generation.
//!
//! Combines a task's name, cleaned description, and aggregated bundle into
//! one generation request. Callers always receive a [`SolutionArtifact`]:
//! generation failure degrades to a placeholder answer, and persistence
//! failures are logged without aborting generation.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, instrument, warn};

use studybundle_shared::{ActivityNotifier, Result, SolutionArtifact, StudyBundleError, Task};

use crate::llm::{ChatClient, ChatMessage, ChatRequest};

const SOLVER_SYSTEM_PROMPT: &str = "You are a helpful assistant that completes university \
    homework concisely and accurately, adhering to specified formats like MLA.";

/// Generates and persists one solution artifact per task.
pub struct SolutionGenerator {
    client: Arc<dyn ChatClient>,
    model: String,
    output_dir: PathBuf,
    notifier: Arc<dyn ActivityNotifier>,
}

impl SolutionGenerator {
    /// Create a generator writing artifacts into `output_dir`.
    pub fn new(
        client: Arc<dyn ChatClient>,
        model: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| StudyBundleError::io(&output_dir, e))?;
        Ok(Self {
            client,
            model: model.into(),
            output_dir,
            notifier,
        })
    }

    /// Assemble the prompt, request a solution, and persist both artifacts.
    #[instrument(skip_all, fields(task = %task.name))]
    pub async fn generate(
        &self,
        task: &Task,
        bundle: &str,
        supplementary_parts: usize,
    ) -> SolutionArtifact {
        let prompt = build_prompt(task, bundle);
        self.notifier.notify(&format!(
            "Generated_prompt_length_{}_for_{}",
            prompt.len(),
            task.name
        ));

        let stem = sanitize_name(&task.name);
        let prompt_path = self.persist(&format!("full_prompt_{stem}.txt"), &prompt);
        if let Some(path) = &prompt_path {
            self.notifier
                .notify(&format!("Saved_prompt_to_{}", path.display()));
        }

        self.notifier
            .notify(&format!("Generating_solution_for_{}", task.name));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SOLVER_SYSTEM_PROMPT),
                ChatMessage::user(prompt.clone()),
            ],
            temperature: 0.3,
            max_tokens: None,
        };

        let (answer, answer_path) = match self.client.complete(request).await {
            Ok(answer) => {
                self.notifier.notify(&format!(
                    "Received_solution_length_{}_for_{}",
                    answer.len(),
                    task.name
                ));
                let path = self.persist(&format!("{stem}_answer.md"), &answer);
                if let Some(path) = &path {
                    self.notifier
                        .notify(&format!("Saved_answer_to_{}", path.display()));
                }
                (answer, path)
            }
            Err(e) => {
                error!(task = %task.name, error = %e, "solution generation failed");
                self.notifier
                    .notify(&format!("Failed_solution_generation_{}", task.name));
                (format!("[Error generating solution via API: {e}]"), None)
            }
        };

        SolutionArtifact {
            prompt_len: prompt.len(),
            prompt,
            answer,
            supplementary_parts,
            prompt_path,
            answer_path,
        }
    }

    /// Write an artifact; failures are logged, never propagated.
    fn persist(&self, filename: &str, content: &str) -> Option<PathBuf> {
        let path = self.output_dir.join(filename);
        match std::fs::write(&path, content) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not persist artifact");
                None
            }
        }
    }
}

/// Embed the task and its bundle into the solution request.
fn build_prompt(task: &Task, bundle: &str) -> String {
    format!(
        "You are an expert academic assistant. Your task is to provide a comprehensive solution \
         for the following university-level assignment.\n\
         Please analyze the assignment description and any supplementary content (files, \
         transcripts) carefully and generate a complete response.\n\
         Only provide the answer to the question in an appropriate format. That means a proper \
         MLA essay format for a question that wants an essay response, simple python code if the \
         result is for a python notebook, or others as appropriate to the assignment's \
         requirements. Do not restate my question or offer a follow up question.\n\n\
         --- ASSIGNMENT DETAILS ---\n\
         Assignment Name: {name}\n\
         Description (cleaned):\n\
         {description}\n\
         --- END OF ASSIGNMENT DETAILS ---\n\n\
         --- SUPPLEMENTARY CONTENT (Files & Transcripts) ---\n\
         {bundle}\n\
         --- END OF SUPPLEMENTARY CONTENT ---\n\n\
         Please provide your solution below:",
        name = task.name,
        description = task.description,
        bundle = bundle
    )
}

/// Filesystem-safe stem derived from a task name (first 50 characters).
pub(crate) fn sanitize_name(name: &str) -> String {
    name.chars()
        .take(50)
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

//! Core pipeline orchestration and domain logic for studybundle.
//!
//! This crate ties together content extraction, bounded fetching, transcript
//! retrieval, and summarization into the end-to-end task pipeline
//! ([`TaskPipeline`]), plus the collaborator clients it depends on.

pub mod aggregate;
pub mod interpret;
pub mod llm;
pub mod pipeline;
pub mod reflect;
pub mod solver;
pub mod source;
pub mod summarize;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::Aggregator;
pub use interpret::FileInterpreter;
pub use llm::{ChatClient, ChatMessage, ChatRequest, OpenAiChatClient};
pub use pipeline::{PipelineConfig, TaskPipeline};
pub use reflect::ReflectionGenerator;
pub use solver::SolutionGenerator;
pub use source::{LmsClient, TaskSource};
pub use summarize::Summarizer;
pub use transcript::{TimedTextClient, TranscriptRetriever, TranscriptSource};

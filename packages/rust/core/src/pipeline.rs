//! End-to-end task pipeline: aggregate supplementary sources → assemble
//! prompt → generate solution artifact.
//!
//! This is the only place the components are composed; everything is passed
//! in explicitly at construction, no ambient globals. The pipeline never
//! raises past this layer for per-task work: `solve` always returns a
//! [`SolutionArtifact`].

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use studybundle_fetch::BoundedFetcher;
use studybundle_shared::{
    ActivityNotifier, PipelineLimits, Result, SolutionArtifact, Task, render_bundle,
};

use crate::aggregate::Aggregator;
use crate::interpret::FileInterpreter;
use crate::llm::ChatClient;
use crate::reflect::ReflectionGenerator;
use crate::solver::SolutionGenerator;
use crate::summarize::Summarizer;
use crate::transcript::{TranscriptRetriever, TranscriptSource};

/// Configuration for building a [`TaskPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scratch directory for downloaded resources.
    pub downloads_dir: PathBuf,
    /// Directory where prompt/answer artifacts are written.
    pub output_dir: PathBuf,
    /// Resource bounds.
    pub limits: PipelineLimits,
    /// Model for summarization and reflective questions.
    pub summary_model: String,
    /// Model for solution generation.
    pub solver_model: String,
}

/// The assembled pipeline for one session.
pub struct TaskPipeline {
    aggregator: Aggregator,
    solver: SolutionGenerator,
    reflection: ReflectionGenerator,
    notifier: Arc<dyn ActivityNotifier>,
}

impl TaskPipeline {
    /// Wire up all components from explicit collaborators.
    pub fn new(
        config: &PipelineConfig,
        chat: Arc<dyn ChatClient>,
        transcripts: Arc<dyn TranscriptSource>,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Result<Self> {
        let summarizer = Summarizer::new(
            Arc::clone(&chat),
            config.summary_model.clone(),
            config.limits.summary_max_words,
            Arc::clone(&notifier),
        );

        let fetcher = Arc::new(BoundedFetcher::new(
            &config.downloads_dir,
            config.limits.max_file_size,
            config.limits.download_timeout,
            Arc::clone(&notifier),
        )?);

        let interpreter = FileInterpreter::new(summarizer.clone(), Arc::clone(&notifier));
        let retriever = TranscriptRetriever::new(transcripts, summarizer, Arc::clone(&notifier));

        let aggregator = Aggregator::new(
            fetcher,
            interpreter,
            retriever,
            Arc::clone(&notifier),
            config.limits.max_concurrency,
        );

        let solver = SolutionGenerator::new(
            Arc::clone(&chat),
            config.solver_model.clone(),
            &config.output_dir,
            Arc::clone(&notifier),
        )?;

        let reflection = ReflectionGenerator::new(
            chat,
            config.summary_model.clone(),
            Arc::clone(&notifier),
        );

        Ok(Self {
            aggregator,
            solver,
            reflection,
            notifier,
        })
    }

    /// Aggregate a task's supplementary sources and generate its solution.
    #[instrument(skip_all, fields(task = %task.name, links = task.links.len(), videos = task.video_ids.len()))]
    pub async fn solve(&self, task: &Task) -> SolutionArtifact {
        self.notifier
            .notify(&format!("Start_processing_task_{}", task.name));
        self.notifier.notify(&format!(
            "Details_{}_DescLen_{}_Links_{}_Videos_{}",
            task.name,
            task.description.len(),
            task.links.len(),
            task.video_ids.len()
        ));

        let fragments = self.aggregator.aggregate(task).await;
        debug_assert_eq!(fragments.len(), task.links.len() + task.video_ids.len());

        let bundle = render_bundle(&fragments);
        let artifact = self.solver.generate(task, &bundle, fragments.len()).await;

        info!(
            task = %task.name,
            parts = artifact.supplementary_parts,
            prompt_len = artifact.prompt_len,
            "task solved"
        );
        artifact
    }

    /// Generate reflective questions for a task; always non-empty.
    pub async fn reflective_questions(&self, course_name: &str, task: &Task) -> Vec<String> {
        self.reflection.generate(course_name, task).await
    }
}

//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use studybundle_core::pipeline::{PipelineConfig, TaskPipeline};
use studybundle_core::source::{LmsClient, TaskSource};
use studybundle_core::{ChatClient, OpenAiChatClient, TimedTextClient, TranscriptSource};
use studybundle_shared::{
    ActivityNotifier, AppConfig, PipelineLimits, init_config, load_config, read_secret,
    validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// studybundle — assemble context bundles for academic tasks and generate solutions.
#[derive(Parser)]
#[command(
    name = "studybundle",
    version,
    about = "Harvest a task's supplementary sources into one bundle and generate a solution.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Probe connectivity to the task source.
    Check,

    /// List available courses.
    Courses,

    /// List a course's tasks with their reference counts.
    Tasks {
        /// Course identifier.
        #[arg(long)]
        course: u64,
    },

    /// Aggregate supplementary sources and generate solutions.
    Solve {
        /// Course identifier.
        #[arg(long)]
        course: u64,

        /// Solve only this task (defaults to every task of the course).
        #[arg(long)]
        task: Option<u64>,

        /// Also generate reflective questions for each solved task.
        #[arg(long)]
        reflect: bool,

        /// Output directory for artifacts (overrides config).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "studybundle=info",
        1 => "studybundle=debug",
        _ => "studybundle=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Check => cmd_check().await,
        Command::Courses => cmd_courses().await,
        Command::Tasks { course } => cmd_tasks(course).await,
        Command::Solve {
            course,
            task,
            reflect,
            out,
        } => cmd_solve(course, task, reflect, out.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Spinner-backed activity notifier
// ---------------------------------------------------------------------------

/// Activity notifier rendering statuses on an indicatif spinner.
struct SpinnerActivity {
    spinner: ProgressBar,
}

impl SpinnerActivity {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ActivityNotifier for SpinnerActivity {
    fn notify(&self, status: &str) {
        self.spinner.set_message(status.to_string());
    }
}

// ---------------------------------------------------------------------------
// Collaborator wiring
// ---------------------------------------------------------------------------

fn lms_client(config: &AppConfig, notifier: Arc<dyn ActivityNotifier>) -> Result<LmsClient> {
    if config.lms.base_url.is_empty() {
        return Err(eyre!(
            "no task source configured — set [lms].base_url in the config file"
        ));
    }
    let token = read_secret(&config.lms.api_token_env)?;
    Ok(LmsClient::new(&config.lms.base_url, token, notifier)?)
}

fn chat_client(config: &AppConfig) -> Result<Arc<dyn ChatClient>> {
    let key = read_secret(&config.llm.api_key_env)?;
    Ok(Arc::new(OpenAiChatClient::new(&config.llm.base_url, key)?))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_check() -> Result<()> {
    let config = load_config()?;
    let spinner = Arc::new(SpinnerActivity::new());
    let lms = lms_client(&config, spinner.clone())?;

    let ok = lms.check_connection().await;
    spinner.finish();

    if ok {
        println!("Task source connection OK ({})", config.lms.base_url);
        Ok(())
    } else {
        Err(eyre!(
            "task source connection failed ({})",
            config.lms.base_url
        ))
    }
}

async fn cmd_courses() -> Result<()> {
    let config = load_config()?;
    let spinner = Arc::new(SpinnerActivity::new());
    let lms = lms_client(&config, spinner.clone())?;

    let courses = lms.list_courses().await;
    spinner.finish();

    if courses.is_empty() {
        println!("No courses available.");
        return Ok(());
    }

    println!();
    for course in &courses {
        println!("  {:>8}  {}", course.id, course.name);
    }
    println!();
    println!("  {} course(s)", courses.len());
    Ok(())
}

async fn cmd_tasks(course: u64) -> Result<()> {
    let config = load_config()?;
    let spinner = Arc::new(SpinnerActivity::new());
    let lms = lms_client(&config, spinner.clone())?;

    let tasks = lms.list_tasks(course).await;
    spinner.finish();

    if tasks.is_empty() {
        println!("No tasks found for course {course}.");
        return Ok(());
    }

    println!();
    for task in &tasks {
        println!(
            "  {:>8}  {}  ({} link(s), {} video(s))",
            task.id,
            task.name,
            task.links.len(),
            task.video_ids.len()
        );
    }
    println!();
    println!("  {} task(s)", tasks.len());
    Ok(())
}

async fn cmd_solve(course: u64, task_id: Option<u64>, reflect: bool, out: Option<&str>) -> Result<()> {
    let config = load_config()?;
    // Validate the generation key before doing anything
    validate_api_key(&config)?;

    let spinner = Arc::new(SpinnerActivity::new());
    let notifier: Arc<dyn ActivityNotifier> = spinner.clone();

    let lms = lms_client(&config, Arc::clone(&notifier))?;
    let chat = chat_client(&config)?;
    let limits = PipelineLimits::from(&config);
    let transcripts: Arc<dyn TranscriptSource> =
        Arc::new(TimedTextClient::new(limits.download_timeout)?);

    let output_dir = out
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));

    let pipeline_config = PipelineConfig {
        downloads_dir: PathBuf::from(&config.defaults.downloads_dir),
        output_dir,
        limits,
        summary_model: config.llm.summary_model.clone(),
        solver_model: config.llm.solver_model.clone(),
    };

    let pipeline = TaskPipeline::new(&pipeline_config, chat, transcripts, Arc::clone(&notifier))?;

    let mut tasks = lms.list_tasks(course).await;
    if let Some(id) = task_id {
        tasks.retain(|t| t.id == id);
        if tasks.is_empty() {
            spinner.finish();
            return Err(eyre!("task {id} not found in course {course}"));
        }
    }
    if tasks.is_empty() {
        spinner.finish();
        return Err(eyre!("no tasks found for course {course}"));
    }

    let course_name = lms
        .list_courses()
        .await
        .into_iter()
        .find(|c| c.id == course)
        .map(|c| c.name)
        .unwrap_or_else(|| format!("Course {course}"));

    info!(course, tasks = tasks.len(), "solving tasks");

    for task in &tasks {
        let artifact = pipeline.solve(task).await;

        println!();
        println!("  Task:    {} ({})", task.name, task.id);
        println!(
            "  Sources: {} part(s), prompt {} bytes",
            artifact.supplementary_parts, artifact.prompt_len
        );
        match &artifact.prompt_path {
            Some(path) => println!("  Prompt:  {}", path.display()),
            None => println!("  Prompt:  (not persisted)"),
        }
        match &artifact.answer_path {
            Some(path) => println!("  Answer:  {}", path.display()),
            None => println!("  Answer:  {}", artifact.answer),
        }

        if reflect {
            let questions = pipeline.reflective_questions(&course_name, task).await;
            println!("  Before you use this, consider:");
            for question in questions {
                println!("    - {question}");
            }
        }
    }

    spinner.finish();
    println!();
    println!("  {} task(s) processed", tasks.len());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

//! Task source client.
//!
//! Retrieves courses and tasks from an LMS-style REST collaborator. Raw
//! markup descriptions are run through the content extractor so that a
//! [`Task`] always carries cleaned text plus classified references. Per the
//! propagation policy, retrieval failures surface as `false`/empty results,
//! never as errors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{error, info, instrument};
use url::Url;

use studybundle_shared::{ActivityNotifier, Course, Result, StudyBundleError, Task};

/// User-Agent string for task source requests.
const USER_AGENT: &str = concat!("studybundle/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// TaskSource trait
// ---------------------------------------------------------------------------

/// Abstraction over the task source collaborator. Never mutates upstream state.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Probe connectivity; `false` on any failure.
    async fn check_connection(&self) -> bool;

    /// List available courses; empty on failure.
    async fn list_courses(&self) -> Vec<Course>;

    /// List tasks of a course with descriptions cleaned and references
    /// classified; empty on failure.
    async fn list_tasks(&self, course_id: u64) -> Vec<Task>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UserDto {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CourseDto {
    id: u64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssignmentDto {
    id: u64,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

// ---------------------------------------------------------------------------
// LmsClient
// ---------------------------------------------------------------------------

/// HTTP client for the task source collaborator.
pub struct LmsClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
    notifier: Arc<dyn ActivityNotifier>,
}

impl LmsClient {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        notifier: Arc<dyn ActivityNotifier>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            StudyBundleError::config(format!("invalid task source base URL '{base_url}': {e}"))
        })?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                StudyBundleError::config(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
            notifier,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{path}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.endpoint(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StudyBundleError::Connection(format!("{path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StudyBundleError::Connection(format!(
                "{path}: HTTP {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StudyBundleError::parse(format!("{path}: {e}")))
    }
}

#[async_trait]
impl TaskSource for LmsClient {
    #[instrument(skip(self))]
    async fn check_connection(&self) -> bool {
        self.notifier.notify("Attempting_connection");
        match self.get_json::<UserDto>("users/self").await {
            Ok(user) => {
                let name = user.name.unwrap_or_else(|| "unknown".into());
                info!(user = %name, "task source connection successful");
                self.notifier
                    .notify(&format!("Connection_successful_User_{name}"));
                true
            }
            Err(e) => {
                error!(error = %e, "task source connection failed");
                self.notifier.notify("Connection_failed");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Vec<Course> {
        self.notifier.notify("Fetching_courses");
        match self.get_json::<Vec<CourseDto>>("courses").await {
            Ok(courses) => {
                // Entries without a name are deleted/unavailable courses.
                let list: Vec<Course> = courses
                    .into_iter()
                    .filter_map(|c| {
                        c.name
                            .filter(|n| !n.is_empty())
                            .map(|name| Course { id: c.id, name })
                    })
                    .collect();
                self.notifier
                    .notify(&format!("Fetched_{}_courses", list.len()));
                list
            }
            Err(e) => {
                error!(error = %e, "failed to fetch courses");
                self.notifier.notify("Failed_fetch_courses");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, course_id: u64) -> Vec<Task> {
        self.notifier
            .notify(&format!("Fetching_tasks_course_{course_id}"));
        match self
            .get_json::<Vec<AssignmentDto>>(&format!("courses/{course_id}/assignments"))
            .await
        {
            Ok(assignments) => {
                let tasks: Vec<Task> = assignments
                    .into_iter()
                    .map(|a| {
                        let extracted = studybundle_extract::extract(
                            a.description.as_deref().unwrap_or(""),
                            &self.base_url,
                        );
                        Task {
                            id: a.id,
                            name: a.name,
                            description: extracted.text,
                            links: extracted.links,
                            video_ids: extracted.video_ids,
                        }
                    })
                    .collect();
                self.notifier
                    .notify(&format!("Fetched_{}_tasks", tasks.len()));
                tasks
            }
            Err(e) => {
                error!(course_id, error = %e, "failed to fetch tasks");
                self.notifier.notify("Failed_fetch_tasks");
                Vec::new()
            }
        }
    }
}

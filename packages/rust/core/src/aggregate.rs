//! Concurrent fan-out over a task's supplementary references.
//!
//! Every link and every video identifier yields exactly one fragment,
//! irrespective of success or failure. Items run concurrently and complete
//! in any order; each one writes into an arena slot addressed by its input
//! position, so the assembled bundle always preserves the original link-list
//! order followed by the video-id order. One item's failure never aborts its
//! siblings.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use studybundle_fetch::BoundedFetcher;
use studybundle_shared::{ActivityNotifier, ContentFragment, FragmentKind, Task};

use crate::interpret::FileInterpreter;
use crate::transcript::TranscriptRetriever;

/// Fans out fetch+interpret and transcript+summarize operations per task.
pub struct Aggregator {
    fetcher: Arc<BoundedFetcher>,
    interpreter: FileInterpreter,
    transcripts: TranscriptRetriever,
    notifier: Arc<dyn ActivityNotifier>,
    /// Maximum concurrent operations; 0 means unbounded fan-out.
    max_concurrency: usize,
}

impl Aggregator {
    pub fn new(
        fetcher: Arc<BoundedFetcher>,
        interpreter: FileInterpreter,
        transcripts: TranscriptRetriever,
        notifier: Arc<dyn ActivityNotifier>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            interpreter,
            transcripts,
            notifier,
            max_concurrency,
        }
    }

    /// Produce one fragment per link and per video identifier, in input order.
    #[instrument(skip_all, fields(task = %task.name, links = task.links.len(), videos = task.video_ids.len()))]
    pub async fn aggregate(&self, task: &Task) -> Vec<ContentFragment> {
        let total = task.links.len() + task.video_ids.len();
        let semaphore =
            (self.max_concurrency > 0).then(|| Arc::new(Semaphore::new(self.max_concurrency)));

        let mut handles: Vec<(usize, JoinHandle<ContentFragment>)> = Vec::with_capacity(total);

        for (index, link) in task.links.iter().enumerate() {
            let url = link.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let interpreter = self.interpreter.clone();
            let semaphore = semaphore.clone();

            handles.push((
                index,
                tokio::spawn(async move {
                    let _permit = match semaphore {
                        Some(sem) => Some(sem.acquire_owned().await.expect("semaphore closed")),
                        None => None,
                    };
                    process_link(&fetcher, &interpreter, &url).await
                }),
            ));
        }

        for (offset, video_id) in task.video_ids.iter().enumerate() {
            let index = task.links.len() + offset;
            let id = video_id.clone();
            let transcripts = self.transcripts.clone();
            let semaphore = semaphore.clone();

            handles.push((
                index,
                tokio::spawn(async move {
                    let _permit = match semaphore {
                        Some(sem) => Some(sem.acquire_owned().await.expect("semaphore closed")),
                        None => None,
                    };
                    let body = transcripts.retrieve(&id).await;
                    ContentFragment {
                        kind: FragmentKind::Transcript,
                        label: id,
                        body,
                    }
                }),
            ));
        }

        // Arena indexed by input position; completion order is irrelevant.
        let mut slots: Vec<Option<ContentFragment>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        for (index, handle) in handles {
            let fragment = match handle.await {
                Ok(fragment) => fragment,
                Err(e) => {
                    warn!(index, error = %e, "aggregation item panicked");
                    panicked_item_fragment(task, index, &e.to_string())
                }
            };
            slots[index] = Some(fragment);
        }

        self.notifier.notify(&format!(
            "Processed_{}_links_{}_videos_for_{}",
            task.links.len(),
            task.video_ids.len(),
            task.name
        ));

        slots.into_iter().flatten().collect()
    }
}

/// Fetch and interpret one link; failures become labeled placeholders.
async fn process_link(
    fetcher: &BoundedFetcher,
    interpreter: &FileInterpreter,
    url: &str,
) -> ContentFragment {
    match fetcher.download(url).await {
        Ok(resource) => {
            let filename = resource.file_name();
            let body = interpreter.interpret(resource, url).await;
            ContentFragment {
                kind: FragmentKind::Link,
                label: format!("File: {filename} (from {url})"),
                body,
            }
        }
        Err(e) => {
            warn!(url, error = %e, "link processing failed");
            ContentFragment {
                kind: FragmentKind::Link,
                label: format!("URL: {url}"),
                body: format!("[Download failed for: {url}]"),
            }
        }
    }
}

/// Fragment substituted when an item's task itself died.
fn panicked_item_fragment(task: &Task, index: usize, detail: &str) -> ContentFragment {
    if index < task.links.len() {
        let url = &task.links[index];
        ContentFragment {
            kind: FragmentKind::Link,
            label: format!("URL: {url}"),
            body: format!("[Exception: {detail}]"),
        }
    } else {
        let id = task.video_ids[index - task.links.len()].clone();
        ContentFragment {
            kind: FragmentKind::Transcript,
            label: id,
            body: format!("[Exception: {detail}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use studybundle_shared::{SilentActivity, render_bundle};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::summarize::Summarizer;
    use crate::testing::{FailChat, MapTranscripts, StaggeredTranscripts, TranscriptFixture};
    use crate::transcript::TranscriptSource;

    fn task(links: Vec<String>, video_ids: Vec<String>) -> Task {
        Task {
            id: 1,
            name: "Concurrency homework".into(),
            description: "Explain fan-out.".into(),
            links,
            video_ids,
        }
    }

    fn aggregator(
        downloads_dir: &std::path::Path,
        source: Arc<dyn TranscriptSource>,
        max_concurrency: usize,
    ) -> Aggregator {
        let notifier: Arc<dyn ActivityNotifier> = Arc::new(SilentActivity);
        let summarizer = Summarizer::new(
            Arc::new(FailChat),
            "test-model",
            500,
            Arc::clone(&notifier),
        );
        let fetcher = Arc::new(
            BoundedFetcher::new(
                downloads_dir,
                1024 * 1024,
                Duration::from_secs(2),
                Arc::clone(&notifier),
            )
            .expect("fetcher"),
        );
        let interpreter = FileInterpreter::new(summarizer.clone(), Arc::clone(&notifier));
        let transcripts = TranscriptRetriever::new(source, summarizer, Arc::clone(&notifier));
        Aggregator::new(fetcher, interpreter, transcripts, notifier, max_concurrency)
    }

    #[tokio::test]
    async fn every_reference_yields_exactly_one_fragment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("extracted notes"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let source = MapTranscripts(HashMap::from([(
            "disabled0000".to_string(),
            TranscriptFixture::Disabled,
        )]));
        let agg = aggregator(dir.path(), Arc::new(source), 0);

        let task = task(
            vec![
                format!("{}/missing", server.uri()),
                format!("{}/notes.txt", server.uri()),
            ],
            vec!["disabled0000".into()],
        );

        let fragments = agg.aggregate(&task).await;
        assert_eq!(fragments.len(), task.links.len() + task.video_ids.len());

        // Position 0: the 404 link becomes a download-failure placeholder.
        assert_eq!(fragments[0].kind, FragmentKind::Link);
        assert_eq!(
            fragments[0].body,
            format!("[Download failed for: {}/missing]", server.uri())
        );

        // Position 1: the successful link carries the extracted text.
        assert_eq!(fragments[1].body, "extracted notes");
        assert!(fragments[1].label.starts_with("File: "));

        // Position 2: the disabled transcript names its condition.
        assert_eq!(fragments[2].kind, FragmentKind::Transcript);
        assert_eq!(
            fragments[2].body,
            "[Captions disabled for YouTube video ID: disabled0000]"
        );
    }

    #[tokio::test]
    async fn empty_task_renders_no_content_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let agg = aggregator(dir.path(), Arc::new(MapTranscripts(HashMap::new())), 0);

        let fragments = agg.aggregate(&task(vec![], vec![])).await;
        assert!(fragments.is_empty());
        assert_eq!(render_bundle(&fragments), "[No supplementary content processed.]");
    }

    #[tokio::test]
    async fn fragment_order_matches_input_under_staggered_completion() {
        let dir = tempfile::tempdir().expect("tempdir");

        // Later inputs complete first: delays decrease with input position.
        let ids: Vec<String> = (0..6).map(|i| format!("video{i}00000")).collect();
        let delays: HashMap<String, u64> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), (6 - i as u64) * 20))
            .collect();
        let agg = aggregator(dir.path(), Arc::new(StaggeredTranscripts { delays_ms: delays }), 0);

        let task = task(vec![], ids.clone());
        let fragments = agg.aggregate(&task).await;

        assert_eq!(fragments.len(), ids.len());
        for (fragment, id) in fragments.iter().zip(&ids) {
            assert_eq!(&fragment.label, id);
            assert_eq!(&fragment.body, id);
        }
    }

    #[tokio::test]
    async fn concurrency_cap_preserves_count_and_order() {
        let dir = tempfile::tempdir().expect("tempdir");

        let ids: Vec<String> = (0..5).map(|i| format!("capped{i}00000")).collect();
        let delays: HashMap<String, u64> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), (5 - i as u64) * 10))
            .collect();
        let agg = aggregator(dir.path(), Arc::new(StaggeredTranscripts { delays_ms: delays }), 2);

        let task = task(vec![], ids.clone());
        let fragments = agg.aggregate(&task).await;

        assert_eq!(fragments.len(), ids.len());
        for (fragment, id) in fragments.iter().zip(&ids) {
            assert_eq!(&fragment.label, id);
        }
    }
}

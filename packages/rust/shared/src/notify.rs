//! Activity notification hook.
//!
//! Every significant pipeline step emits a short machine-readable status
//! string through this trait. Implementations are purely observational and
//! must never block or fail the pipeline.

/// Observer for pipeline activity.
pub trait ActivityNotifier: Send + Sync {
    /// Report a short machine-readable status string.
    fn notify(&self, status: &str);
}

/// No-op notifier for headless/test usage.
pub struct SilentActivity;

impl ActivityNotifier for SilentActivity {
    fn notify(&self, _status: &str) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder(Mutex<Vec<String>>);

    impl ActivityNotifier for Recorder {
        fn notify(&self, status: &str) {
            self.0.lock().expect("lock").push(status.to_string());
        }
    }

    #[test]
    fn notifier_receives_statuses() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        recorder.notify("Downloading_https://example.com");
        recorder.notify("Summarizing_text_length_1234");
        let seen = recorder.0.lock().expect("lock");
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("Downloading_"));
    }
}

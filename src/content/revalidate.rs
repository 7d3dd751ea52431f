use std::sync::Mutex;

/// Receives the public paths whose rendered output is stale after a write.
pub trait Revalidate: Send + Sync {
    fn revalidate(&self, path: &str);
}

/// Default hook: there is no page cache in this process, so hints are only
/// logged for whatever sits in front of the server.
pub struct LogRevalidator;

impl Revalidate for LogRevalidator {
    fn revalidate(&self, path: &str) {
        tracing::info!(path, "revalidate");
    }
}

/// Keeps every hint in memory.
#[derive(Default)]
pub struct RecordingRevalidator {
    paths: Mutex<Vec<String>>,
}

impl RecordingRevalidator {
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Revalidate for RecordingRevalidator {
    fn revalidate(&self, path: &str) {
        self.paths
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }
}

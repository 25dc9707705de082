use crate::progress::StatusSink;
use tokio::sync::Mutex as AsyncMutex;

/// Process-wide lock for tests that mutate environment variables.
/// Use `.blocking_lock()` in sync tests and `.lock().await` in async tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Status sink that keeps everything it was shown.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub statuses: Vec<String>,
}

impl StatusSink for RecordingSink {
    fn on_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }
}

// Log Sink - buffers progress lines during an invocation, appends them durably at the end

use crate::domain::{JobId, LogBuffer};
use crate::error::Result;
use crate::port::LogStore;
use std::sync::Arc;
use tracing::debug;

pub struct LogSink {
    job: JobId,
    buffer: LogBuffer,
    store: Arc<dyn LogStore>,
}

impl LogSink {
    pub fn new(job: JobId, store: Arc<dyn LogStore>) -> Self {
        Self {
            job,
            buffer: LogBuffer::new(),
            store,
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.buffer.log(message);
    }

    /// Buffer handed to job definitions
    pub fn buffer_mut(&mut self) -> &mut LogBuffer {
        &mut self.buffer
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Append buffered lines to the job's durable log.
    /// Returns how many lines were written.
    pub async fn flush(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        let lines = self.buffer.take();
        self.store.append(&self.job, &lines).await?;
        debug!(job = %self.job, lines = lines.len(), "Flushed job log");
        Ok(lines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::log_store::mocks::InMemoryLogStore;

    #[tokio::test]
    async fn test_flush_appends_in_order_and_clears() {
        let store = Arc::new(InMemoryLogStore::new());
        let job = JobId::from_identifier("User Import").unwrap();

        let mut sink = LogSink::new(job.clone(), store.clone());
        sink.log("first");
        sink.log("second");
        assert_eq!(sink.flush().await.unwrap(), 2);
        assert_eq!(sink.pending(), 0);

        let mut sink = LogSink::new(job.clone(), store.clone());
        sink.log("third");
        sink.flush().await.unwrap();

        assert_eq!(store.contents(&job), "first\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn test_empty_flush_is_noop() {
        let store = Arc::new(InMemoryLogStore::new());
        let job = JobId::from_identifier("quiet").unwrap();
        let mut sink = LogSink::new(job.clone(), store.clone());
        assert_eq!(sink.flush().await.unwrap(), 0);
        assert_eq!(store.contents(&job), "");
    }
}

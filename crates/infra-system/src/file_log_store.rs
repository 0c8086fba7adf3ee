// File-backed job log
// One append-only file per job: {log_dir}/batch_{slug}.log
use async_trait::async_trait;
use chunkwise_core::domain::JobId;
use chunkwise_core::error::Result;
use chunkwise_core::port::LogStore;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

const TAIL_CHUNK_BYTES: u64 = 8 * 1024;

/// Upper bound on lines returned by one `tail`
pub const MAX_TAIL_LINES: usize = 10_000;

pub struct FileLogStore {
    dir: PathBuf,
}

impl FileLogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, job: &JobId) -> PathBuf {
        self.dir.join(format!("batch_{}.log", job.as_str()))
    }
}

#[async_trait]
impl LogStore for FileLogStore {
    async fn append(&self, job: &JobId, lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(job);

        let mut chunk = String::new();
        for line in lines {
            chunk.push_str(line);
            chunk.push('\n');
        }

        // O_APPEND: concurrent writers interleave whole writes, never truncate
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(chunk.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), lines = lines.len(), "Job log appended");
        Ok(())
    }

    async fn tail(&self, job: &JobId, lines: usize) -> Result<Vec<String>> {
        let lines = lines.min(MAX_TAIL_LINES);
        if lines == 0 {
            return Ok(Vec::new());
        }

        let mut file = match File::open(self.path_for(job)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        // Walk back from the end until the window holds `lines` complete lines
        let mut pos = file.metadata().await?.len();
        let mut window: Vec<u8> = Vec::new();
        while pos > 0 && window.iter().filter(|&&b| b == b'\n').count() <= lines {
            let step = TAIL_CHUNK_BYTES.min(pos);
            pos -= step;

            let mut chunk = vec![0u8; step as usize];
            file.seek(SeekFrom::Start(pos)).await?;
            file.read_exact(&mut chunk).await?;
            chunk.extend_from_slice(&window);
            window = chunk;
        }

        let text = String::from_utf8_lossy(&window);
        let all: Vec<&str> = text.lines().collect();
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].iter().map(|l| l.to_string()).collect())
    }

    fn location(&self, job: &JobId) -> Option<String> {
        Some(self.path_for(job).display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> JobId {
        JobId::from_identifier(name).unwrap()
    }

    #[tokio::test]
    async fn test_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path());
        let id = job("User Import");

        store.append(&id, &["one".to_string()]).await.unwrap();
        store
            .append(&id, &["two".to_string(), "three".to_string()])
            .await
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("batch_user-import.log")).unwrap();
        assert_eq!(content, "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path());
        let id = job("tail");

        assert!(store.tail(&id, 5).await.unwrap().is_empty());

        let lines: Vec<String> = (1..=5).map(|i| format!("line {}", i)).collect();
        store.append(&id, &lines).await.unwrap();

        assert_eq!(store.tail(&id, 2).await.unwrap(), vec!["line 4", "line 5"]);
        assert_eq!(store.tail(&id, 50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_tail_of_a_long_log_spans_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path());
        let id = job("long");

        // Well past several read chunks, with multi-byte text at the seams
        let lines: Vec<String> = (1..=5_000).map(|i| format!("entry {} ✓ naïve", i)).collect();
        store.append(&id, &lines).await.unwrap();

        let tail = store.tail(&id, 3).await.unwrap();
        assert_eq!(
            tail,
            vec!["entry 4998 ✓ naïve", "entry 4999 ✓ naïve", "entry 5000 ✓ naïve"]
        );

        let tail = store.tail(&id, 1_000).await.unwrap();
        assert_eq!(tail.len(), 1_000);
        assert_eq!(tail[0], "entry 4001 ✓ naïve");

        assert_eq!(store.tail(&id, usize::MAX).await.unwrap().len(), 5_000);
        assert!(store.tail(&id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path().join("nested/logs"));
        let id = job("x");

        store.append(&id, &["hello".to_string()]).await.unwrap();
        assert!(store.path_for(&id).exists());
        assert_eq!(
            store.location(&id),
            Some(store.path_for(&id).display().to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_append_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path());
        let id = job("quiet");
        store.append(&id, &[]).await.unwrap();
        assert!(!store.path_for(&id).exists());
    }
}

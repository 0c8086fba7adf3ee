// Per-invocation progress log buffer

/// Append-only ordered buffer of human-readable progress lines,
/// scoped to one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBuffer {
    lines: Vec<String>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn log(&mut self, message: impl Into<String>) {
        self.lines.push(message.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Take every buffered line, leaving the buffer empty
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

// Continuation Signal
// Outcome of one invocation, rendered for whatever driver re-invokes the engine.

use crate::port::MemoryUsage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status of one invocation plus the "come back later" indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationSignal {
    pub identifier: String,
    pub message: String,

    /// Items successfully processed during this invocation
    pub processed: usize,

    /// Items left in the checkpoint after this invocation
    pub remaining: usize,

    /// Driver should re-invoke after `retry_after_ms`
    #[serde(rename = "continue")]
    pub keep_going: bool,
    pub retry_after_ms: u64,

    /// Consecutive invocations without a single success
    pub stalled_invocations: u32,
    pub stalled: bool,

    /// Terminal marker, epoch ms
    pub completed_at: Option<i64>,

    pub memory: MemoryUsage,
}

impl ContinuationSignal {
    /// Work remains: ask the driver to come back
    pub fn incomplete(
        identifier: impl Into<String>,
        processed: usize,
        remaining: usize,
        retry_after: Duration,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            message: format!(
                "Finished processing {} items. There are {} items remaining. \
                 Processing next batch momentarily...",
                processed, remaining
            ),
            processed,
            remaining,
            keep_going: true,
            retry_after_ms: retry_after.as_millis() as u64,
            stalled_invocations: 0,
            stalled: false,
            completed_at: None,
            memory: MemoryUsage::default(),
        }
    }

    /// Queue drained: the driver must stop
    pub fn complete(identifier: impl Into<String>, processed: usize, completed_at: i64) -> Self {
        Self {
            identifier: identifier.into(),
            message: "Finished processing all items.".to_string(),
            processed,
            remaining: 0,
            keep_going: false,
            retry_after_ms: 0,
            stalled_invocations: 0,
            stalled: false,
            completed_at: Some(completed_at),
            memory: MemoryUsage::default(),
        }
    }

    /// A finished job was invoked again without `restart`
    pub fn already_completed(identifier: impl Into<String>, completed_at: i64) -> Self {
        let completed = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(completed_at)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| completed_at.to_string());
        Self {
            message: format!(
                "All items were already processed (completed at {}). Nothing to do.",
                completed
            ),
            ..Self::complete(identifier, 0, completed_at)
        }
    }

    pub fn with_memory(mut self, memory: MemoryUsage) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_stall(mut self, stalled_invocations: u32, threshold: u32) -> Self {
        self.stalled_invocations = stalled_invocations;
        self.stalled = threshold > 0 && stalled_invocations >= threshold;
        if self.stalled {
            self.message.push_str(&format!(
                " No item has succeeded in the last {} invocations.",
                stalled_invocations
            ));
        }
        self
    }

    pub fn should_continue(&self) -> bool {
        self.keep_going
    }

    pub fn retry_after(&self) -> Duration {
        Duration::from_millis(self.retry_after_ms)
    }

    /// Render the status page. Carries a refresh directive only while
    /// the job should continue.
    pub fn render_html(&self) -> String {
        let refresh = if self.keep_going {
            // meta refresh only understands whole seconds
            let secs = self.retry_after_ms.div_ceil(1000).max(1);
            format!("\n    <meta http-equiv=\"refresh\" content=\"{}\">", secs)
        } else {
            String::new()
        };
        let limit = match self.memory.limit_mib() {
            Some(mib) => format!("{:.0} MiB", mib),
            None => "unlimited".to_string(),
        };

        format!(
            "<!doctype html>\n<html>\n  <head>\n    <title>{title}</title>{refresh}\n  </head>\n  \
             <body>\n    <p>{message}</p>\n    <p>Peak memory usage: {peak:.2} MiB</p>\n    \
             <p>Memory limit: {limit}</p>\n  </body>\n</html>\n",
            title = escape_html(&self.identifier),
            refresh = refresh,
            message = escape_html(&self.message),
            peak = self.memory.peak_mib(),
            limit = limit,
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_page_refreshes() {
        let signal = ContinuationSignal::incomplete("User Import", 2, 3, Duration::from_secs(1))
            .with_memory(MemoryUsage {
                peak_bytes: 2 * 1024 * 1024,
                limit_bytes: Some(128 * 1024 * 1024),
            });

        assert!(signal.should_continue());
        let html = signal.render_html();
        assert!(html.contains("<title>User Import</title>"));
        assert!(html.contains(r#"<meta http-equiv="refresh" content="1">"#));
        assert!(html.contains("There are 3 items remaining"));
        assert!(html.contains("Peak memory usage: 2.00 MiB"));
        assert!(html.contains("Memory limit: 128 MiB"));
    }

    #[test]
    fn test_complete_page_does_not_refresh() {
        let signal = ContinuationSignal::complete("User Import", 1, 42);
        assert!(!signal.should_continue());
        assert_eq!(signal.retry_after(), Duration::ZERO);
        let html = signal.render_html();
        assert!(!html.contains("refresh"));
        assert!(html.contains("Finished processing all items."));
        assert!(html.contains("Memory limit: unlimited"));
    }

    #[test]
    fn test_identifier_is_escaped() {
        let html = ContinuationSignal::complete("<script>", 0, 0).render_html();
        assert!(html.contains("<title>&lt;script&gt;</title>"));
    }

    #[test]
    fn test_continue_flag_wire_name() {
        let signal = ContinuationSignal::incomplete("x", 1, 1, Duration::from_millis(1500));
        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(value["continue"], serde_json::json!(true));
        assert_eq!(value["retry_after_ms"], serde_json::json!(1500));
        assert!(signal.render_html().contains(r#"content="2""#));
    }

    #[test]
    fn test_stall_flag() {
        let signal =
            ContinuationSignal::incomplete("x", 0, 4, Duration::from_secs(1)).with_stall(3, 3);
        assert!(signal.stalled);
        assert!(signal.should_continue());
        assert!(signal.message.contains("last 3 invocations"));

        let signal =
            ContinuationSignal::incomplete("x", 0, 4, Duration::from_secs(1)).with_stall(2, 3);
        assert!(!signal.stalled);
    }
}

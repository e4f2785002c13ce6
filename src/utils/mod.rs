//! Utilities module for mdpress
//!
//! Shared helper functions and utilities including:
//! - Trailing debounce on the tokio clock
//! - Text utilities (escaping, slugs)

use std::time::Duration;
use tokio::task::JoinHandle;

/// Trailing debouncer
///
/// Every [`schedule`](Debouncer::schedule) cancels the pending firing and
/// starts a fresh quiet window. Each firing carries a generation number;
/// the owner confirms it with [`complete`](Debouncer::complete), which
/// rejects firings that were superseded or cancelled after their timer
/// had already elapsed.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    /// Restart the quiet window; `fire` runs with the new generation once it elapses
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(generation);
        }));
        generation
    }

    /// Drop the pending firing, if any. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Accept a firing. False for stale generations.
    pub fn complete(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Whether a firing is scheduled and not yet accepted
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Text utilities
pub mod text {
    use regex::Regex;
    use std::sync::OnceLock;

    /// Escape text for inclusion in HTML
    pub fn escape_html(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
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

    /// Lowercase slug with runs of non-alphanumerics collapsed to `-`
    pub fn slugify(text: &str) -> String {
        static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
        let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
        let lower = text.to_lowercase();
        re.replace_all(&lower, "-").trim_matches('-').to_string()
    }

    /// Collapse whitespace runs to single spaces
    pub fn collapse_whitespace(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut in_space = false;
        for c in text.chars() {
            if c.is_whitespace() {
                if !in_space {
                    out.push(' ');
                }
                in_space = true;
            } else {
                out.push(c);
                in_space = false;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<u64>>>, impl Fn() -> Box<dyn FnOnce(u64) + Send>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let make = move || {
            let sink = sink.clone();
            Box::new(move |g| sink.lock().unwrap().push(g)) as Box<dyn FnOnce(u64) + Send>
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_collapses_rapid_triggers() {
        let (fired, make) = recorder();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        let mut last = 0;
        for _ in 0..5 {
            last = debouncer.schedule(make());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*fired.lock().unwrap(), vec![last]);
        assert!(debouncer.complete(last));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_cancel() {
        let (fired, make) = recorder();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        debouncer.schedule(make());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_rejected() {
        let (fired, make) = recorder();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        let first = debouncer.schedule(make());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*fired.lock().unwrap(), vec![first]);

        // Fired but not yet accepted when a new edit arrives
        let second = debouncer.schedule(make());
        assert!(!debouncer.complete(first));
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(debouncer.complete(second));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            text::escape_html("<a href=\"x\">&'"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(text::slugify("Hello World!"), "hello-world");
        assert_eq!(text::slugify("  Rust & PDF: 2024 "), "rust-pdf-2024");
        assert_eq!(text::slugify("!!!"), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(text::collapse_whitespace("a \n\t b"), "a b");
        assert_eq!(text::collapse_whitespace("\nx\n"), " x ");
    }
}

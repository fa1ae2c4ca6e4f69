//! Link liveness checker
//!
//! Absolute links are probed concurrently, one scoped thread per link.
//! Relative links are resolved against the anchor table. Problems are
//! reported as warnings; nothing here fails the conversion.

use std::thread;
use std::time::Duration;

use log::debug;

use crate::logger::Logger;
use crate::markdown::{AnchorTable, LinkKind, LinkMap};
use crate::text_file::TextFile;

/// Decides whether an absolute URL currently answers.
pub trait LinkProbe: Sync {
    fn is_alive(&self, url: &str) -> bool;
}

/// HTTP `HEAD` probe; any 2xx answer within the timeout counts as alive.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    agent: ureq::Agent,
}

impl HttpProbe {
    /// Default per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(5)
            .build();
        Self { agent }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl LinkProbe for HttpProbe {
    fn is_alive(&self, url: &str) -> bool {
        match self.agent.head(url).call() {
            Ok(response) => (200..300).contains(&response.status()),
            Err(err) => {
                debug!("HEAD {} failed: {}", url, err);
                false
            }
        }
    }
}

/// Validates the links of one parsed document.
pub struct Checker<'p> {
    probe: &'p dyn LinkProbe,
}

impl<'p> Checker<'p> {
    pub fn new(probe: &'p dyn LinkProbe) -> Self {
        Self { probe }
    }

    /// Probe absolute links and resolve relative ones; returns once every
    /// probe has finished. Local links are not checked here.
    pub fn check(
        &self,
        file: &TextFile,
        links: &LinkMap,
        anchors: &AnchorTable,
        logger: &dyn Logger,
    ) {
        let absolute: Vec<_> = links
            .values()
            .filter(|link| link.kind == LinkKind::Absolute)
            .collect();
        debug!("Probing {} absolute links", absolute.len());

        thread::scope(|scope| {
            for link in &absolute {
                let probe = self.probe;
                scope.spawn(move || {
                    if !probe.is_alive(&link.address) {
                        logger.warn(&format!(
                            "Link {} at {} is probably broken",
                            link.address,
                            file.position(link.span.start)
                        ));
                    }
                });
            }

            for link in links.values() {
                let Some(fragment) = link.fragment() else {
                    continue;
                };
                if !anchors.contains(fragment) {
                    logger.warn(&format!(
                        "Relative link {} at {} is broken",
                        link.address,
                        file.position(link.span.start)
                    ));
                }
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dialect;
    use crate::logger::MemoryLogger;
    use crate::markdown::parse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers from a fixed list of live URLs and counts calls.
    struct FakeProbe {
        alive: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn new(alive: Vec<&'static str>) -> Self {
            Self {
                alive,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl LinkProbe for FakeProbe {
        fn is_alive(&self, url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.alive.contains(&url)
        }
    }

    fn check(text: &str, probe: &FakeProbe) -> MemoryLogger {
        let logger = MemoryLogger::new();
        let file = Arc::new(TextFile::new(text));
        let parsed = parse(Arc::clone(&file), Dialect::GitHub, &logger).unwrap();
        Checker::new(probe).check(&file, &parsed.links, &parsed.anchors, &logger);
        logger
    }

    #[test]
    fn test_two_broken_links_two_warnings() {
        let probe = FakeProbe::new(vec![]);
        let text = "# Title\n\n[dead](https://dead.example.invalid) and [missing](#nowhere)\n";
        let logger = check(text, &probe);
        let warnings = logger.warnings();
        assert_eq!(warnings.len(), 2, "{:?}", warnings);
        assert!(warnings
            .iter()
            .any(|w| w.starts_with("Link https://dead.example.invalid at ")
                && w.ends_with("is probably broken")));
        assert!(warnings
            .iter()
            .any(|w| w.starts_with("Relative link #nowhere at ") && w.ends_with("is broken")));
    }

    #[test]
    fn test_live_links_are_silent() {
        let probe = FakeProbe::new(vec!["https://ok.example"]);
        let logger = check("# Intro\n\n[a](https://ok.example) [b](#intro)\n", &probe);
        assert!(logger.warnings().is_empty());
    }

    #[test]
    fn test_every_absolute_link_is_probed() {
        let probe = FakeProbe::new(vec!["https://a.example"]);
        let text = "[a](https://a.example) [b](https://b.example) [c](local.md) <https://c.example>\n";
        let logger = check(text, &probe);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
        assert_eq!(logger.warnings().len(), 2);
    }

    #[test]
    fn test_html_links_are_checked() {
        let probe = FakeProbe::new(vec![]);
        let logger = check("<a href=\"#gone\">x</a>\n", &probe);
        assert_eq!(logger.warnings().len(), 1);
        assert!(logger.warnings()[0].starts_with("Relative link #gone at 1:10"));
    }
}

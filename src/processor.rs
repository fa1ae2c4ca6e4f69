//! One-document conversion pipeline.
//!
//! parse → check links → render → validate cut. Each stage only reads what
//! the previous one produced.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::checker::{Checker, HttpProbe, LinkProbe};
use crate::config::ProcessorOptions;
use crate::convert::Converter;
use crate::error::Result;
use crate::local_links::check_local_links;
use crate::logger::Logger;
use crate::markdown::parse;
use crate::postprocess::Postprocessor;
use crate::text_file::TextFile;

/// Runs the conversion pipeline with a fixed set of options.
pub struct Processor<'a> {
    options: ProcessorOptions,
    logger: &'a dyn Logger,
    probe: Option<Box<dyn LinkProbe + 'a>>,
}

impl<'a> Processor<'a> {
    pub fn new(options: ProcessorOptions, logger: &'a dyn Logger) -> Self {
        Self {
            options,
            logger,
            probe: None,
        }
    }

    /// Use `probe` instead of HTTP for absolute links.
    pub fn with_probe(mut self, probe: impl LinkProbe + 'a) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Convert one document.
    ///
    /// Recoverable problems go to the logger; only invariant violations
    /// return an error.
    pub fn process(&self, file: TextFile) -> Result<String> {
        let input = self.options.input_dialect_for(file.data());
        let output = self.options.output_dialect_for(input);
        debug!(
            "Processing {} as {} → {}",
            file.name().unwrap_or("<text>"),
            input,
            output
        );

        let file = Arc::new(file);
        let parsed = parse(Arc::clone(&file), input, self.logger)?;

        if self.options.check_links {
            match &self.probe {
                Some(probe) => {
                    Checker::new(probe.as_ref()).check(&file, &parsed.links, &parsed.anchors, self.logger)
                }
                None => {
                    let probe =
                        HttpProbe::new(Duration::from_millis(self.options.link_check_timeout_ms));
                    Checker::new(&probe).check(&file, &parsed.links, &parsed.anchors, self.logger)
                }
            }
            if let Some(root) = &self.options.root_directory {
                check_local_links(&file, &parsed.links, root, self.logger);
            }
        }

        let text = Converter::new(&parsed, &self.options, output).render()?;
        Postprocessor::postprocess(&text, output, &self.options, self.logger);
        Ok(text)
    }

    /// Convert a string without a display name.
    pub fn process_str(&self, text: &str) -> Result<String> {
        self.process(TextFile::new(text))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

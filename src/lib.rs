//! mdconv - Markdown dialect converter
//!
//! Converts documents between GitHub-flavored Markdown, Habr and Dev.to
//! conventions while keeping everything the options do not touch intact.

pub mod checker;
pub mod config;
pub mod convert;
pub mod error;
pub mod local_links;
pub mod logger;
pub mod markdown;
pub mod postprocess;
pub mod processor;
pub mod text_file;

pub use checker::{Checker, HttpProbe, LinkProbe};
pub use config::{Dialect, ProcessorOptions};
pub use convert::Converter;
pub use error::{Error, Result};
pub use logger::{ConsoleLogger, Logger, MemoryLogger};
pub use processor::Processor;
pub use text_file::{Span, TextFile};

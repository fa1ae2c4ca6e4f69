//! Existence check for links that point into the filesystem.

use std::path::Path;

use crate::logger::Logger;
use crate::markdown::{LinkKind, LinkMap};
use crate::text_file::TextFile;

/// Path part of a local address, without `?query` or `#fragment`.
fn path_part(address: &str) -> &str {
    let end = address.find(['?', '#']).unwrap_or(address.len());
    &address[..end]
}

/// Whether the address carries a URI scheme such as `mailto:` or `ftp:`.
fn has_scheme(address: &str) -> bool {
    match address.find(':') {
        Some(colon) if colon > 1 => address[..colon]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// Warn about local links whose target does not exist under `root`.
pub fn check_local_links(file: &TextFile, links: &LinkMap, root: &Path, logger: &dyn Logger) {
    for link in links.values().filter(|l| l.kind == LinkKind::Local) {
        if has_scheme(&link.address) {
            continue;
        }
        let path = path_part(&link.address);
        if path.is_empty() {
            continue;
        }
        if !root.join(path.trim_start_matches('/')).exists() {
            logger.warn(&format!(
                "File {} at {} does not exist",
                path,
                file.position(link.span.start)
            ));
        }
    }
}

//! Text Codec
//!
//! Bidirectional transform between a [`Tree`] and the persisted,
//! Markdown-flavored bullet format:
//!
//! ```text
//! - Task
//!
//!     notes here
//!
//!     - Sub
//!
//! - Next top-level item
//! ```
//!
//! - a bullet is `- title` after `depth * 4` spaces
//! - an optional body follows after a blank line, indented one level deeper
//! - children follow the body (or the bullet directly), one level deeper
//! - tabs count as four columns; indentation levels truncate
//! - a body line that would read as a bullet is written as `\- ...`
//!
//! Collapse, task and sync fields are not part of the text; see
//! [`OutlineMetadata`] for the sidecar that carries them.

mod metadata;
mod parser;
mod serializer;

pub use metadata::{NodeMetadata, OutlineMetadata, METADATA_VERSION};
pub use parser::{AnomalyKind, ParseAnomaly, ParsedOutline};

use crate::config::EngineConfig;
use crate::models::SortIndexCalculator;
use crate::tree::Tree;

/// Prefix that keeps a bullet-like body line from reading back as a child
pub(crate) const BODY_ESCAPE: char = '\\';

/// Parser/serializer pair configured with indentation widths
#[derive(Debug, Clone, Copy)]
pub struct OutlineCodec {
    indent_width: usize,
    tab_width: usize,
    ordering: SortIndexCalculator,
}

impl Default for OutlineCodec {
    fn default() -> Self {
        Self {
            indent_width: 4,
            tab_width: 4,
            ordering: SortIndexCalculator::default(),
        }
    }
}

impl OutlineCodec {
    pub fn new(indent_width: usize, tab_width: usize) -> Self {
        Self {
            indent_width: indent_width.max(1),
            tab_width,
            ordering: SortIndexCalculator::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            indent_width: config.indent_width.max(1),
            tab_width: config.tab_width,
            ordering: SortIndexCalculator::new(config.sort_index_step),
        }
    }
}

/// Parse with the default four-space codec
pub fn parse(text: &str) -> ParsedOutline {
    OutlineCodec::default().parse(text)
}

/// Serialize with the default four-space codec
pub fn serialize(tree: &Tree) -> String {
    OutlineCodec::default().serialize(tree)
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;

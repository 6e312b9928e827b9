//! Indentation-based outline parser
//!
//! Reads the bullet format line by line with a stack of open bullets. Lines
//! that fit nowhere are recorded as [`ParseAnomaly`] values and skipped; the
//! parse itself never fails. One leading `\` on a body line is an escape and
//! is dropped.

use super::{OutlineCodec, BODY_ESCAPE};
use crate::error::{OutlineError, OutlineResult};
use crate::models::{Node, NodeId};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

/// Kind of malformed input the parser recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Non-bullet text with no open bullet deep enough to own it
    OrphanedLine,
    /// Bullet indented more than one level below its parent
    SkippedIndentLevel,
    /// Body text appearing after the bullet's children
    BodyAfterChildren,
}

/// A recovered-from problem in parsed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseAnomaly {
    /// 1-based line number
    pub line: usize,
    pub kind: AnomalyKind,
    pub text: String,
}

/// Result of parsing: the tree plus everything that had to be repaired
#[derive(Debug, Clone)]
pub struct ParsedOutline {
    pub tree: Tree,
    pub anomalies: Vec<ParseAnomaly>,
}

impl ParsedOutline {
    /// Tree only if the input was well formed
    pub fn into_strict(self) -> OutlineResult<Tree> {
        match self.anomalies.first() {
            Some(anomaly) => Err(OutlineError::parse_anomaly(
                anomaly.line,
                format!("{:?}: {}", anomaly.kind, anomaly.text.trim()),
            )),
            None => Ok(self.tree),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenBullet {
    id: NodeId,
    level: usize,
}

struct LineShape<'a> {
    level: usize,
    columns: usize,
    content: &'a str,
}

impl OutlineCodec {
    /// Parse persisted text into a tree rooted at the invisible root
    pub fn parse(&self, text: &str) -> ParsedOutline {
        let mut tree = Tree::with_ordering(self.ordering);
        let mut anomalies = Vec::new();
        let mut stack: Vec<OpenBullet> = Vec::new();
        let mut pending_blanks = 0usize;

        for (index, raw) in text.split('\n').enumerate() {
            let line_no = index + 1;
            let raw = raw.strip_suffix('\r').unwrap_or(raw);

            if raw.trim().is_empty() {
                pending_blanks += 1;
                continue;
            }

            let shape = self.shape(raw);
            while stack.last().map(|b| b.level >= shape.level).unwrap_or(false) {
                stack.pop();
            }

            if let Some(title) = bullet_title(shape.content) {
                let parent_level = stack.last().map(|b| b.level as isize).unwrap_or(-1);
                if shape.level as isize > parent_level + 1 {
                    anomalies.push(ParseAnomaly {
                        line: line_no,
                        kind: AnomalyKind::SkippedIndentLevel,
                        text: raw.to_string(),
                    });
                }

                let parent = stack.last().map(|b| b.id).unwrap_or_else(|| tree.root_id());
                let node = Node::with_title(title);
                let id = node.id;
                // Fresh ids cannot collide and the parent is attached.
                if tree.add_detached(node).is_ok() {
                    let _ = tree.insert_child(parent, id, None);
                }
                stack.push(OpenBullet {
                    id,
                    level: shape.level,
                });
            } else {
                let Some(owner) = stack.last().copied() else {
                    anomalies.push(ParseAnomaly {
                        line: line_no,
                        kind: AnomalyKind::OrphanedLine,
                        text: raw.to_string(),
                    });
                    pending_blanks = 0;
                    continue;
                };

                let text = self.strip_columns(raw, shape.columns, (owner.level + 1) * self.indent_width);
                let text = text.strip_prefix(BODY_ESCAPE).unwrap_or(text);
                if let Some(node) = tree.get_mut(owner.id) {
                    if node.has_children() {
                        anomalies.push(ParseAnomaly {
                            line: line_no,
                            kind: AnomalyKind::BodyAfterChildren,
                            text: raw.to_string(),
                        });
                    }
                    if !node.body.is_empty() {
                        node.body.push('\n');
                        for _ in 0..pending_blanks {
                            node.body.push('\n');
                        }
                    }
                    node.body.push_str(text);
                }
            }
            pending_blanks = 0;
        }

        for anomaly in &anomalies {
            tracing::debug!(
                "Outline line {} recovered ({:?}): {:?}",
                anomaly.line,
                anomaly.kind,
                anomaly.text
            );
        }
        if !anomalies.is_empty() {
            tracing::warn!("Parsed outline with {} malformed line(s)", anomalies.len());
        }

        ParsedOutline { tree, anomalies }
    }

    fn shape<'a>(&self, line: &'a str) -> LineShape<'a> {
        let mut columns = 0;
        let mut offset = 0;
        for (i, ch) in line.char_indices() {
            match ch {
                ' ' => columns += 1,
                '\t' => columns += self.tab_width,
                _ => {
                    offset = i;
                    break;
                }
            }
            offset = i + ch.len_utf8();
        }
        LineShape {
            level: columns / self.indent_width,
            columns,
            content: &line[offset..],
        }
    }

    /// Drop leading whitespace worth `strip` columns, keeping deeper indentation
    fn strip_columns<'a>(&self, line: &'a str, total: usize, strip: usize) -> &'a str {
        if total <= strip {
            return line.trim_start_matches([' ', '\t']);
        }
        let mut columns = 0;
        for (i, ch) in line.char_indices() {
            if columns >= strip {
                return &line[i..];
            }
            columns += if ch == '\t' { self.tab_width } else { 1 };
        }
        ""
    }
}

fn bullet_title(content: &str) -> Option<&str> {
    if content == "-" {
        Some("")
    } else {
        content.strip_prefix("- ")
    }
}

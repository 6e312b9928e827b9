//! Outline serializer
//!
//! Exact inverse of the parser for titles, bodies, child order and depth.
//! Body lines that would read back as a bullet (or that start with the
//! escape character itself) are written with a leading `\`.

use super::{OutlineCodec, BODY_ESCAPE};
use crate::models::NodeId;
use crate::tree::Tree;

impl OutlineCodec {
    /// Serialize every top-level item of `tree`
    pub fn serialize(&self, tree: &Tree) -> String {
        self.serialize_nodes(tree, tree.children_of(tree.root_id()))
    }

    /// Serialize `ids` (and their descendants) as top-level items, in order
    ///
    /// Used for copying a selection: each id is emitted at depth zero
    /// regardless of where it sits in the tree. Unknown ids are skipped.
    pub fn serialize_nodes(&self, tree: &Tree, ids: &[NodeId]) -> String {
        let mut out = String::new();
        for id in ids {
            if tree.get(*id).is_some() {
                self.write_node(tree, *id, 0, &mut out);
                out.push('\n');
            }
        }
        out
    }

    fn write_node(&self, tree: &Tree, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = tree.get(id) else {
            return;
        };
        let indent = " ".repeat(depth * self.indent_width);
        let body_indent = " ".repeat((depth + 1) * self.indent_width);

        out.push_str(&indent);
        out.push_str("- ");
        // Titles are single-line by contract; fold stray newlines.
        out.push_str(&node.title.replace(['\r', '\n'], " "));
        out.push('\n');

        if node.has_body() {
            out.push('\n');
            for line in node.body.split('\n') {
                if !line.is_empty() {
                    out.push_str(&body_indent);
                    if needs_escape(line) {
                        out.push(BODY_ESCAPE);
                    }
                    out.push_str(line);
                }
                out.push('\n');
            }
            if node.has_children() {
                out.push('\n');
            }
        }

        for child in node.children() {
            self.write_node(tree, *child, depth + 1, out);
        }
    }
}

/// True when `line` must be escaped to stay body text on the next parse
fn needs_escape(line: &str) -> bool {
    let content = line.trim_start_matches([' ', '\t']);
    content == "-" || content.starts_with("- ") || line.starts_with(BODY_ESCAPE)
}

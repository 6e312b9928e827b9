//! Tests for multi-selection commands

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::document::{CommandOutcome, Document};
    use crate::models::NodeId;
    use crate::services::{LockRegistry, OwnerToken};
    use std::sync::Arc;

    fn document(text: &str) -> Document {
        let locks = Arc::new(LockRegistry::new());
        Document::from_text(text, locks, EngineConfig::default()).0
    }

    fn id_of(doc: &Document, title: &str) -> NodeId {
        let tree = doc.tree();
        tree.descendants(tree.root_id())
            .into_iter()
            .find(|id| tree.get(*id).unwrap().title == title)
            .unwrap_or_else(|| panic!("no node titled {:?}", title))
    }

    fn ids(doc: &Document, titles: &[&str]) -> Vec<NodeId> {
        titles.iter().map(|t| id_of(doc, t)).collect()
    }

    fn outline(doc: &Document) -> Vec<String> {
        let tree = doc.tree();
        tree.descendants(tree.root_id())
            .into_iter()
            .map(|id| {
                let depth = tree.depth(id).unwrap();
                format!("{}{}", "  ".repeat(depth - 1), tree.get(id).unwrap().title)
            })
            .collect()
    }

    #[test]
    fn test_expand_selection_grows_level_by_level() {
        let mut doc = document("- A\n    - A1\n        - A1x\n    - A2\n- B\n");
        doc.focus_node(OwnerToken::new(), id_of(&doc, "A1x")).unwrap();
        let version = doc.structure_version();

        assert!(doc.expand_selection().is_applied());
        assert_eq!(doc.selection(), ids(&doc, &["A1x"]));

        assert!(doc.expand_selection().is_applied());
        assert_eq!(doc.selection(), ids(&doc, &["A1", "A1x", "A2"]));

        assert!(doc.expand_selection().is_applied());
        assert_eq!(doc.selection(), ids(&doc, &["A", "A1", "A1x", "A2", "B"]));

        assert_eq!(doc.expand_selection(), CommandOutcome::Unchanged);
        assert_eq!(doc.structure_version(), version);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_expand_mixed_depth_uses_shallowest() {
        let mut doc = document("- A\n    - A1\n        - A1x\n- B\n");
        doc.set_selection(ids(&doc, &["A1x", "A1"]));

        assert!(doc.expand_selection().is_applied());
        assert_eq!(doc.selection(), ids(&doc, &["A", "A1", "A1x", "B"]));

        // Top-level selection cannot grow further
        doc.set_selection(ids(&doc, &["A1x", "B"]));
        assert_eq!(doc.expand_selection(), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_expand_stops_at_zoom_root() {
        let mut doc = document("- A\n    - A1\n        - A1x\n- B\n");
        let a = id_of(&doc, "A");
        doc.zoom_in(a).unwrap();
        doc.set_selection(ids(&doc, &["A1"]));
        assert_eq!(doc.expand_selection(), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_selected_roots_skip_nested_ids() {
        let mut doc = document("- A\n    - A1\n- B\n");
        doc.set_selection(ids(&doc, &["A1", "A", "B"]));
        assert_eq!(doc.selected_roots(), ids(&doc, &["A", "B"]));
    }

    #[test]
    fn test_delete_selection_is_one_undo_step() {
        let mut doc = document("- A\n- B\n    - B1\n- C\n- D\n");
        let window = OwnerToken::new();
        let a = id_of(&doc, "A");
        doc.focus_node(window, a).unwrap();
        doc.set_selection(ids(&doc, &["B", "C"]));

        assert!(doc.delete_selection().unwrap().is_applied());
        assert_eq!(outline(&doc), ["A", "D"]);
        assert!(doc.selection().is_empty());
        assert_eq!(doc.focused_node(), Some(a));
        assert_eq!(doc.trash_entries().len(), 2);
        assert_eq!(doc.history().undo_len(), 1);

        doc.undo();
        assert_eq!(outline(&doc), ["A", "B", "  B1", "C", "D"]);
        assert_eq!(doc.selection(), ids(&doc, &["B", "C"]));
        assert!(doc.trash_entries().is_empty());
    }

    #[test]
    fn test_delete_whole_view_leaves_blank_node() {
        let mut doc = document("- A\n- B\n");
        doc.set_selection(ids(&doc, &["A", "B"]));

        doc.delete_selection().unwrap();
        assert_eq!(doc.tree().len(), 1);
        let only = doc.visible_nodes()[0];
        assert!(doc.tree().get(only).unwrap().title.is_empty());

        doc.undo();
        assert_eq!(outline(&doc), ["A", "B"]);
    }

    #[test]
    fn test_indent_selection_runs_as_one_action() {
        let mut doc = document("- A\n- B\n- C\n- D\n- E\n");
        doc.set_selection(ids(&doc, &["B", "D"]));

        assert!(doc.indent().unwrap().is_applied());
        assert_eq!(outline(&doc), ["A", "  B", "C", "  D", "E"]);
        assert_eq!(doc.history().undo_len(), 1);

        doc.undo();
        assert_eq!(outline(&doc), ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_indent_adjacent_run_moves_together() {
        let mut doc = document("- A\n- B\n- C\n- D\n");
        doc.set_selection(ids(&doc, &["B", "C"]));

        doc.indent().unwrap();
        assert_eq!(outline(&doc), ["A", "  B", "  C", "D"]);
    }

    #[test]
    fn test_outdent_selection_keeps_order() {
        let mut doc = document("- P\n    - A\n    - B\n    - C\n");
        doc.set_selection(ids(&doc, &["A", "C"]));

        assert!(doc.outdent().unwrap().is_applied());
        assert_eq!(outline(&doc), ["P", "  B", "A", "C"]);
        assert_eq!(doc.history().undo_len(), 1);

        doc.undo();
        assert_eq!(outline(&doc), ["P", "  A", "  B", "  C"]);
    }

    #[test]
    fn test_move_selection_up_and_down() {
        let mut doc = document("- A\n- B\n- C\n- D\n");
        doc.set_selection(ids(&doc, &["B", "C"]));

        doc.move_up().unwrap();
        assert_eq!(outline(&doc), ["B", "C", "A", "D"]);
        doc.move_down().unwrap();
        doc.move_down().unwrap();
        assert_eq!(outline(&doc), ["A", "D", "B", "C"]);
        assert_eq!(doc.move_down().unwrap(), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_move_selection_after_target() {
        let mut doc = document("- A\n    - A1\n- B\n- C\n");
        doc.set_selection(ids(&doc, &["A", "B"]));

        doc.move_selection_after(id_of(&doc, "C")).unwrap();
        assert_eq!(outline(&doc), ["C", "A", "  A1", "B"]);
    }

    #[test]
    fn test_move_selection_after_invalid_target() {
        let mut doc = document("- A\n    - A1\n- B\n");
        doc.set_selection(ids(&doc, &["A"]));
        let root = doc.tree().root_id();

        let err = doc.move_selection_after(id_of(&doc, "A1")).unwrap_err();
        assert!(err.is_invalid_structure());
        assert!(doc.move_selection_after(root).unwrap_err().is_invalid_structure());
        assert!(doc
            .move_selection_after(NodeId::new())
            .unwrap_err()
            .is_not_found());
        assert_eq!(outline(&doc), ["A", "  A1", "B"]);
    }

    #[test]
    fn test_copy_selection_emits_roots_at_top_level() {
        let mut doc = document("- A\n    - A1\n- B\n");
        doc.set_selection(ids(&doc, &["A", "A1", "B"]));
        assert_eq!(doc.copy_selection(), "- A\n    - A1\n\n- B\n\n");

        doc.set_selection(ids(&doc, &["A1"]));
        assert_eq!(doc.copy_selection(), "- A1\n\n");
    }

    #[test]
    fn test_selection_ignores_unknown_ids() {
        let mut doc = document("- A\n");
        let root = doc.tree().root_id();
        doc.set_selection([NodeId::new(), root, id_of(&doc, "A")]);
        assert_eq!(doc.selection(), ids(&doc, &["A"]));
        doc.clear_selection();
        assert!(doc.selection().is_empty());
    }
}

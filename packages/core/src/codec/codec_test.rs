//! Tests for the text codec and metadata sidecar

#[cfg(test)]
mod tests {
    use crate::codec::{parse, serialize, AnomalyKind, OutlineCodec, OutlineMetadata};
    use crate::models::{Node, NodeId, TaskState};
    use crate::tree::Tree;

    fn top_titles(tree: &Tree) -> Vec<String> {
        tree.children_of(tree.root_id())
            .iter()
            .map(|id| tree.get(*id).unwrap().title.clone())
            .collect()
    }

    fn child(tree: &Tree, parent: NodeId, index: usize) -> &Node {
        tree.get(tree.children_of(parent)[index]).unwrap()
    }

    #[test]
    fn test_parse_task_with_body_and_child() {
        let parsed = parse("- Task\n\n    notes here\n\n    - Sub\n");
        assert!(parsed.anomalies.is_empty());

        let tree = parsed.tree;
        assert_eq!(top_titles(&tree), ["Task"]);
        let task = child(&tree, tree.root_id(), 0);
        assert_eq!(task.body, "notes here");
        assert_eq!(task.children().len(), 1);
        assert_eq!(child(&tree, task.id, 0).title, "Sub");
    }

    #[test]
    fn test_serialize_reproduces_input() {
        let input = "- Task\n\n    notes here\n\n    - Sub\n";
        let output = serialize(&parse(input).tree);
        assert_eq!(output, "- Task\n\n    notes here\n\n    - Sub\n\n");
        assert_eq!(output.trim_end(), input.trim_end());
    }

    #[test]
    fn test_round_trip_nested_structure() {
        let input = "\
- One
    - One.a
        - One.a.i
    - One.b

- Two

    first body line


    third body line after two blanks

- Three
";
        let first = parse(input).tree;
        let text = serialize(&first);
        let second = parse(&text).tree;
        assert_eq!(serialize(&second), text);

        let two = child(&second, second.root_id(), 1);
        assert_eq!(two.body, "first body line\n\n\nthird body line after two blanks");
        assert_eq!(top_titles(&second), ["One", "Two", "Three"]);
        let one = child(&second, second.root_id(), 0);
        let one_a = child(&second, one.id, 0);
        assert_eq!(child(&second, one_a.id, 0).title, "One.a.i");
    }

    #[test]
    fn test_tabs_count_as_four_spaces() {
        let tree = parse("- Parent\n\t- Child\n\t\t- Grandchild\n").tree;
        let parent = child(&tree, tree.root_id(), 0);
        let kid = child(&tree, parent.id, 0);
        assert_eq!(kid.title, "Child");
        assert_eq!(child(&tree, kid.id, 0).title, "Grandchild");
    }

    #[test]
    fn test_partial_indentation_truncates() {
        // Six spaces is still level one
        let tree = parse("- Parent\n      - Child\n").tree;
        let parent = child(&tree, tree.root_id(), 0);
        assert_eq!(child(&tree, parent.id, 0).title, "Child");
    }

    #[test]
    fn test_orphaned_lines_are_skipped() {
        let parsed = parse("stray text\n- Real item\nnot indented\n");
        assert_eq!(top_titles(&parsed.tree), ["Real item"]);
        assert_eq!(parsed.anomalies.len(), 2);
        assert!(parsed
            .anomalies
            .iter()
            .all(|a| a.kind == AnomalyKind::OrphanedLine));
        assert_eq!(parsed.anomalies[0].line, 1);
        assert_eq!(parsed.anomalies[1].line, 3);
    }

    #[test]
    fn test_skipped_indent_level_attaches_to_nearest_bullet() {
        let parsed = parse("- Parent\n            - Too deep\n");
        assert_eq!(parsed.anomalies.len(), 1);
        assert_eq!(parsed.anomalies[0].kind, AnomalyKind::SkippedIndentLevel);
        let tree = &parsed.tree;
        let parent = child(tree, tree.root_id(), 0);
        assert_eq!(child(tree, parent.id, 0).title, "Too deep");
    }

    #[test]
    fn test_into_strict_reports_first_anomaly() {
        let err = parse("oops\n- fine\n").into_strict().unwrap_err();
        assert!(matches!(
            err,
            crate::error::OutlineError::CodecParseAnomaly { line: 1, .. }
        ));
        assert!(parse("- fine\n").into_strict().is_ok());
    }

    #[test]
    fn test_body_keeps_extra_indentation() {
        let tree = parse("- Code\n\n        indented snippet\n    plain\n").tree;
        assert_eq!(
            child(&tree, tree.root_id(), 0).body,
            "    indented snippet\nplain"
        );
    }

    #[test]
    fn test_crlf_and_empty_bullets() {
        let tree = parse("- First\r\n-\r\n- Third\r\n").tree;
        assert_eq!(top_titles(&tree), ["First", "", "Third"]);
    }

    #[test]
    fn test_empty_input_gives_empty_tree() {
        assert!(parse("").tree.is_empty());
        assert!(parse("\n\n\n").tree.is_empty());
    }

    #[test]
    fn test_serialize_folds_newlines_in_titles() {
        let mut tree = Tree::new();
        let id = tree.add_detached(Node::with_title("a\nb")).unwrap();
        tree.insert_child(tree.root_id(), id, None).unwrap();
        assert_eq!(serialize(&tree), "- a b\n\n");
    }

    #[test]
    fn test_serialize_nodes_emits_selection_at_depth_zero() {
        let tree = parse("- A\n    - B\n        - C\n- D\n").tree;
        let a = child(&tree, tree.root_id(), 0);
        let b = child(&tree, a.id, 0);
        let d = child(&tree, tree.root_id(), 1);
        let text = OutlineCodec::default().serialize_nodes(&tree, &[b.id, d.id]);
        assert_eq!(text, "- B\n    - C\n\n- D\n\n");
    }

    #[test]
    fn test_custom_indent_width() {
        let codec = OutlineCodec::new(2, 2);
        let tree = codec.parse("- A\n  - B\n").tree;
        let a = child(&tree, tree.root_id(), 0);
        assert_eq!(child(&tree, a.id, 0).title, "B");
        assert_eq!(codec.serialize(&tree), "- A\n  - B\n\n");
    }

    #[test]
    fn test_metadata_restores_identity_and_flags() {
        let mut original = parse("- A\n    - B\n- C\n").tree;
        let a = original.children_of(original.root_id())[0];
        let b = original.children_of(a)[0];
        original.get_mut(a).unwrap().collapsed = true;
        original.get_mut(b).unwrap().task = TaskState::Completed;
        original.get_mut(b).unwrap().sync_token = Some("etag-1".to_string());

        let text = serialize(&original);
        let json = OutlineMetadata::capture(&original).to_json().unwrap();

        let reparsed = parse(&text).tree;
        assert_ne!(reparsed.children_of(reparsed.root_id())[0], a);

        let meta = OutlineMetadata::from_json(&json).unwrap();
        let restored = meta.apply(&reparsed).expect("metadata should line up");
        assert_eq!(restored.children_of(restored.root_id())[0], a);
        assert!(restored.get(a).unwrap().collapsed);
        assert_eq!(restored.get(b).unwrap().task, TaskState::Completed);
        assert_eq!(restored.get(b).unwrap().sync_token.as_deref(), Some("etag-1"));
        assert_eq!(
            restored.get(b).unwrap().sort_index,
            original.get(b).unwrap().sort_index
        );
        restored.check_integrity().unwrap();
    }

    #[test]
    fn test_bullet_like_body_lines_stay_in_the_body() {
        let mut tree = parse("- Notes\n- Next\n").tree;
        let notes = tree.children_of(tree.root_id())[0];
        let body = "intro\n- not a child\n  - nor this\n-\n\\literal backslash";
        tree.get_mut(notes).unwrap().body = body.to_string();
        tree.get_mut(notes).unwrap().task = TaskState::Open;

        let text = serialize(&tree);
        assert!(text.contains("    \\- not a child\n"), "{}", text);
        assert!(text.contains("    \\\\literal backslash\n"), "{}", text);

        let reparsed = parse(&text);
        assert!(reparsed.anomalies.is_empty());
        assert_eq!(top_titles(&reparsed.tree), ["Notes", "Next"]);
        let first = child(&reparsed.tree, reparsed.tree.root_id(), 0);
        assert_eq!(first.body, body);
        assert!(first.children().is_empty());

        // Shapes line up, so the sidecar still applies
        let restored = OutlineMetadata::capture(&tree)
            .apply(&reparsed.tree)
            .expect("metadata should line up");
        assert_eq!(restored.get(notes).unwrap().task, TaskState::Open);
    }

    #[test]
    fn test_metadata_ignored_when_text_diverges() {
        let original = parse("- A\n- B\n").tree;
        let meta = OutlineMetadata::capture(&original);

        let edited = parse("- A\n- B edited externally\n").tree;
        assert!(meta.apply(&edited).is_none());

        let grown = parse("- A\n- B\n- C\n").tree;
        assert!(meta.apply(&grown).is_none());
    }
}

//! Performance benchmarks for outliner core operations
//!
//! Run with: `cargo bench -p outliner-core`
//!
//! These benchmarks measure critical path performance:
//! - Text codec throughput (parse and serialize of 1000-node outlines)
//! - Visible-row flattening, done on every render
//! - Structural commands with undo recording
//! - Remote batch merges

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use outliner_core::services::{LockRegistry, OwnerToken, RemoteChange, RemoteNode};
use outliner_core::{Document, EngineConfig, NodeId, OutlineCodec};
use std::collections::HashSet;
use std::sync::Arc;

/// Generate an outline with roughly `node_count` nodes, three levels deep
fn generate_outline(node_count: usize) -> String {
    let mut text = String::new();
    let sections = node_count / 5;

    for i in 0..sections {
        text.push_str(&format!("- Section {}\n\n", i + 1));
        text.push_str(&format!(
            "    Notes for section {} with some descriptive text.\n\n",
            i + 1
        ));
        for j in 0..2 {
            text.push_str(&format!("    - Item {}.{}\n", i + 1, j + 1));
            text.push_str(&format!("        - Detail {}.{}.a\n", i + 1, j + 1));
        }
        text.push('\n');
    }

    text
}

fn document(text: &str) -> Document {
    Document::from_text(text, Arc::new(LockRegistry::new()), EngineConfig::default()).0
}

/// Benchmark parse/serialize of a 1000-node outline
///
/// Target: well under 10ms per direction so loads and autosaves stay invisible
fn bench_codec(c: &mut Criterion) {
    let codec = OutlineCodec::default();
    let text = generate_outline(1000);
    let tree = codec.parse(&text).tree;

    let mut group = c.benchmark_group("codec");
    group.bench_function("parse_1000_nodes", |b| {
        b.iter(|| black_box(codec.parse(black_box(&text))))
    });
    group.bench_function("serialize_1000_nodes", |b| {
        b.iter(|| black_box(codec.serialize(black_box(&tree))))
    });
    group.finish();
}

/// Benchmark flattening the visible rows with a few collapsed sections
fn bench_flatten_visible(c: &mut Criterion) {
    let doc = document(&generate_outline(1000));
    let tree = doc.tree();
    let collapsed: HashSet<NodeId> = tree
        .children_of(tree.root_id())
        .iter()
        .step_by(3)
        .copied()
        .collect();

    c.bench_function("flatten_visible_1000_nodes", |b| {
        b.iter(|| black_box(tree.flatten_visible(tree.root_id(), &collapsed)))
    });
}

/// Benchmark an indent/outdent pair including undo recording
///
/// Target: < 1ms per command on a 1000-node document
fn bench_structural_commands(c: &mut Criterion) {
    let text = generate_outline(1000);

    c.bench_function("indent_outdent_cycle", |b| {
        b.iter_batched(
            || {
                let mut doc = document(&text);
                let window = OwnerToken::new();
                let visible = doc.visible_nodes();
                doc.focus_node(window, visible[visible.len() / 2]).unwrap();
                doc
            },
            |mut doc| {
                doc.indent().unwrap();
                doc.outdent().unwrap();
                doc.undo();
                black_box(doc.structure_version())
            },
            BatchSize::SmallInput,
        )
    });
}

/// Benchmark merging a 100-change remote batch into a 1000-node document
fn bench_remote_merge(c: &mut Criterion) {
    let text = generate_outline(1000);

    c.bench_function("remote_merge_100_changes", |b| {
        b.iter_batched(
            || {
                let doc = document(&text);
                let changes: Vec<RemoteChange> = (0..100)
                    .map(|i| {
                        let mut node = RemoteNode::new(NodeId::new(), format!("Remote {}", i));
                        node.sort_index = i * 7;
                        RemoteChange::Upsert(node)
                    })
                    .collect();
                (doc, changes)
            },
            |(mut doc, changes)| black_box(doc.apply_remote_batch(changes)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_codec,
    bench_flatten_visible,
    bench_structural_commands,
    bench_remote_merge
);
criterion_main!(benches);

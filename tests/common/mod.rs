#![allow(dead_code)]

use cmark_dom::{
	memory::{MemoryBackend, OutputId},
	tree::{ListData, NodeData},
	Kind, NodeId, Reconciler, Tree,
};
use std::{collections::HashSet, sync::Once};
use tracing_subscriber::EnvFilter;

static LOG_INITIALIZED: Once = Once::new();

/// Routes `tracing` output through the test harness. Filtered by `RUST_LOG`.
pub fn init_logging() {
	LOG_INITIALIZED.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	});
}

/// A tree under construction.
pub struct Shape {
	data: NodeData,
	children: Vec<Shape>,
}

pub fn node(data: impl Into<NodeData>, children: impl IntoIterator<Item = Shape>) -> Shape {
	Shape {
		data: data.into(),
		children: children.into_iter().collect(),
	}
}

pub fn leaf(data: impl Into<NodeData>) -> Shape {
	node(data, None)
}

pub fn text(literal: &str) -> Shape {
	leaf(NodeData::text(literal))
}

pub fn paragraph(literal: &str) -> Shape {
	node(Kind::Paragraph, Some(text(literal)))
}

pub fn document(children: impl IntoIterator<Item = Shape>) -> Shape {
	node(Kind::Document, children)
}

pub fn list(list: ListData, items: &[&str]) -> Shape {
	node(NodeData::list(list), items.iter().map(|item| node(Kind::Item, Some(text(item)))))
}

pub fn build(shape: Shape) -> Tree {
	let mut tree = Tree::new(shape.data);
	let root = tree.root();
	attach(&mut tree, root, shape.children);
	tree
}

fn attach(tree: &mut Tree, parent: NodeId, children: Vec<Shape>) {
	for child in children {
		let id = tree.append(parent, child.data);
		attach(tree, id, child.children);
	}
}

pub fn markup_reconciler() -> Reconciler<MemoryBackend> {
	init_logging();
	Reconciler::markup(MemoryBackend::new())
}

pub fn html(reconciler: &Reconciler<MemoryBackend>) -> String {
	let root = *reconciler.output().expect("nothing rendered yet");
	reconciler.backend().to_html(root).unwrap()
}

/// Output of the `index`th child of the retained tree's root.
pub fn root_child_output(reconciler: &Reconciler<MemoryBackend>, index: usize) -> OutputId {
	let tree = reconciler.tree().unwrap();
	let child = tree.children(tree.root()).nth(index).unwrap();
	reconciler.render_state(child).unwrap().output
}

/// Every retained node owns a distinct output,
/// and each container holds exactly its node's children's outputs, in order.
pub fn assert_integrity(reconciler: &Reconciler<MemoryBackend>) {
	assert_eq!(reconciler.pooled(), 0, "reuse pool leaked entries");

	let tree = reconciler.tree().unwrap();
	let backend = reconciler.backend();
	let mut seen = HashSet::new();
	for id in tree.descendants(tree.root()) {
		let state = reconciler.render_state(id).unwrap_or_else(|| panic!("{} is unmaterialized", id));
		assert!(seen.insert(state.output), "{} shares output {}", id, state.output);

		let children: Vec<OutputId> = tree.children(id).map(|child| reconciler.render_state(child).unwrap().output).collect();
		match state.container {
			Some(container) => {
				assert_eq!(backend.children(container), &children[..], "container of {} ({}) is out of sync", id, tree.kind(id));
				for child in children {
					assert_eq!(backend.parent(child), Some(container));
				}
			}
			None => assert!(children.is_empty(), "{} has children but no container", id),
		}
	}
}

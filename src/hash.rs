//! Structural fingerprints.
//!
//! Equal [`NodeHashes::hash`] values are treated as proof of recursive equality of content and shape.
//! The fingerprint is a 32-bit rolling hash and therefore **not** collision-resistant:
//! A collision makes the reconciler reuse output that doesn't match the new content.
//! This is an accepted correctness assumption, not a bug.

use crate::tree::{ListDelimiter, NodeData, NodeId, Tree};
use serde_json::json;

/// `h' = 17 * h + x (mod 2³²)`, seeded with 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollingHash(u32);
impl RollingHash {
	#[must_use]
	pub fn new() -> Self {
		Self(0)
	}

	pub fn update(&mut self, x: u32) {
		self.0 = self.0.wrapping_mul(17).wrapping_add(x);
	}

	/// Folds each UTF-16 code unit of `s`.
	pub fn update_str(&mut self, s: &str) {
		for unit in s.encode_utf16() {
			self.update(u32::from(unit));
		}
	}

	#[must_use]
	pub fn digest(self) -> u32 {
		self.0
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeHashes {
	/// Fingerprint of the node's own content fields.
	pub attr: u32,
	/// Fingerprint of the ordered children's [`hash`](`NodeHashes::hash`)es.
	pub children: u32,
	pub hash: u32,
}

/// Per-node fingerprints of one [`Tree`], indexed by [`NodeId`].
///
/// Nodes not reachable from the root have no entry.
#[derive(Debug, Clone, Default)]
pub struct HashTable(Vec<Option<NodeHashes>>);
impl HashTable {
	#[must_use]
	pub fn get(&self, id: NodeId) -> Option<NodeHashes> {
		self.0.get(id.index()).copied().flatten()
	}

	/// # Panics
	///
	/// Iff `id` wasn't reachable from the root when the table was computed.
	#[must_use]
	pub fn hash(&self, id: NodeId) -> u32 {
		self[id].hash
	}

	/// Whether this table was computed for an arena of `tree`'s current size.
	#[must_use]
	pub fn covers(&self, tree: &Tree) -> bool {
		self.0.len() == tree.capacity()
	}
}
impl core::ops::Index<NodeId> for HashTable {
	type Output = NodeHashes;

	fn index(&self, id: NodeId) -> &Self::Output {
		self.0[id.index()].as_ref().unwrap_or_else(|| panic!("No hashes computed for node {}", id))
	}
}

pub struct HashCalculator;
impl HashCalculator {
	/// Fingerprints every node reachable from `tree`'s root, children before parents.
	#[must_use]
	pub fn compute(tree: &Tree) -> HashTable {
		let mut table = vec![None; tree.capacity()];

		// Iterative post-order: A node is finished once all of its children are.
		let mut stack = vec![(tree.root(), false)];
		while let Some((id, children_done)) = stack.pop() {
			if children_done {
				let mut children = RollingHash::new();
				for child in tree.children(id) {
					let child: &Option<NodeHashes> = &table[child.index()];
					children.update(child.map_or(0, |child| child.hash));
				}
				table[id.index()] = Some(combine(attr_hash(tree.data(id)), children.digest()));
			} else {
				stack.push((id, true));
				stack.extend(tree.children(id).map(|child| (child, false)));
			}
		}

		HashTable(table)
	}
}

fn combine(attr: u32, children: u32) -> NodeHashes {
	let mut hasher = RollingHash::new();
	hasher.update(attr);
	hasher.update(children);
	NodeHashes {
		attr,
		children,
		hash: hasher.digest(),
	}
}

/// Fingerprints the compact JSON text of
/// `[kind, literal, destination, title, info, level, listType, listTight, listStart, listDelimiter]`,
/// with list fields only present on lists.
#[must_use]
pub fn attr_hash(data: &NodeData) -> u32 {
	let list = data.list_data();
	let fields = json!([
		data.kind.name(),
		data.literal,
		data.destination,
		data.title,
		data.info,
		data.level,
		list.map(|list| list.list_type.name()),
		list.map(|list| list.tight),
		list.and_then(|list| list.start),
		list.and_then(|list| list.delimiter).map(ListDelimiter::name)
	]);

	let mut hasher = RollingHash::new();
	hasher.update_str(&fields.to_string());
	hasher.digest()
}

use crate::{
	hash::HashTable,
	tree::{NodeId, Tree},
};
use hashbrown::{hash_map::Entry, HashMap};
use std::collections::VecDeque;
use tracing::trace;

/// A hash-keyed FIFO multiset of evicted nodes of one [`Tree`], alive for one reconciliation pass.
///
/// Every descendant of a pushed node is queued independently, so any sub-subtree can be reused on its own.
/// Entries are [`NodeId`]s into the tree that was passed to [`push`](`ReusePool::push`);
/// all other methods must be called with that same tree and its [`HashTable`].
#[derive(Debug, Default)]
pub struct ReusePool {
	entries: HashMap<u32, VecDeque<NodeId>>,
	len: usize,
}
impl ReusePool {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of queued nodes.
	#[must_use]
	pub fn len(&self) -> usize {
		self.len
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Queues `node` and, recursively, each of its descendants under their respective hash.
	pub fn push(&mut self, tree: &Tree, hashes: &HashTable, node: NodeId) {
		for id in tree.descendants(node) {
			self.push_one(hashes.hash(id), id);
		}
	}

	fn push_one(&mut self, hash: u32, node: NodeId) {
		trace!("Pooling {} under {:#010x}.", node, hash);
		self.entries.entry(hash).or_default().push_back(node);
		self.len += 1;
	}

	/// Pops the oldest node queued under `hash` (this is the reuse pool's `use`).
	///
	/// On a hit, the returned node's descendants are purged (they now belong to the returned subtree),
	/// as are its ancestors (they are no longer intact).
	pub fn take(&mut self, tree: &Tree, hashes: &HashTable, hash: u32) -> Option<NodeId> {
		let node = self.take_one(hash)?;
		for child in tree.children(node) {
			self.delete_subtree(tree, hashes, child);
		}
		for ancestor in tree.ancestors(node) {
			self.delete(hashes.hash(ancestor), ancestor);
		}
		trace!("Took {} from under {:#010x}.", node, hash);
		Some(node)
	}

	fn take_one(&mut self, hash: u32) -> Option<NodeId> {
		match self.entries.entry(hash) {
			Entry::Vacant(_) => None,
			Entry::Occupied(mut occupied) => {
				let node = occupied.get_mut().pop_front();
				if occupied.get().is_empty() {
					occupied.remove();
				}
				if node.is_some() {
					self.len -= 1;
				}
				node
			}
		}
	}

	/// Removes one specific queued entry. Returns whether it was present.
	pub fn delete(&mut self, hash: u32, node: NodeId) -> bool {
		let queue = match self.entries.get_mut(&hash) {
			Some(queue) => queue,
			None => return false,
		};
		let position = match queue.iter().position(|&queued| queued == node) {
			Some(position) => position,
			None => return false,
		};
		queue.remove(position);
		if queue.is_empty() {
			self.entries.remove(&hash);
		}
		self.len -= 1;
		true
	}

	/// [`delete`](`ReusePool::delete`)s `node` and each of its descendants.
	pub fn delete_subtree(&mut self, tree: &Tree, hashes: &HashTable, node: NodeId) {
		for id in tree.descendants(node) {
			self.delete(hashes.hash(id), id);
		}
	}

	/// Drops all entries, returning how many there were.
	pub fn clear(&mut self) -> usize {
		self.entries.clear();
		core::mem::replace(&mut self.len, 0)
	}
}

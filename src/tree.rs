//! An arena-backed document tree with doubly linked child lists.
//!
//! Nodes are addressed by [`NodeId`] and only ever linked under one parent at a time:
//! every linking primitive unlinks the node from its current position first.

use core::{convert::TryFrom, fmt, iter::FusedIterator};

/// Index of a node inside the [`Tree`] that created it.
///
/// Ids are not portable between trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);
impl NodeId {
	#[must_use]
	pub fn index(self) -> usize {
		self.0 as usize
	}
}
impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// The closed set of CommonMark node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
	Document,
	Paragraph,
	Text,
	Emph,
	Strong,
	Link,
	Image,
	Code,
	CodeBlock,
	Html,
	HtmlBlock,
	Header,
	List,
	Item,
	BlockQuote,
	HorizontalRule,
	Softbreak,
	Hardbreak,
}
impl Kind {
	pub const COUNT: usize = 18;

	pub const ALL: [Kind; Kind::COUNT] = [
		Kind::Document,
		Kind::Paragraph,
		Kind::Text,
		Kind::Emph,
		Kind::Strong,
		Kind::Link,
		Kind::Image,
		Kind::Code,
		Kind::CodeBlock,
		Kind::Html,
		Kind::HtmlBlock,
		Kind::Header,
		Kind::List,
		Kind::Item,
		Kind::BlockQuote,
		Kind::HorizontalRule,
		Kind::Softbreak,
		Kind::Hardbreak,
	];

	/// The type name as it appears in the attribute fingerprint.
	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			Kind::Document => "Document",
			Kind::Paragraph => "Paragraph",
			Kind::Text => "Text",
			Kind::Emph => "Emph",
			Kind::Strong => "Strong",
			Kind::Link => "Link",
			Kind::Image => "Image",
			Kind::Code => "Code",
			Kind::CodeBlock => "CodeBlock",
			Kind::Html => "Html",
			Kind::HtmlBlock => "HtmlBlock",
			Kind::Header => "Header",
			Kind::List => "List",
			Kind::Item => "Item",
			Kind::BlockQuote => "BlockQuote",
			Kind::HorizontalRule => "HorizontalRule",
			Kind::Softbreak => "Softbreak",
			Kind::Hardbreak => "Hardbreak",
		}
	}

	pub(crate) fn index(self) -> usize {
		self as usize
	}
}
impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListType {
	Bullet,
	Ordered,
}
impl ListType {
	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			ListType::Bullet => "Bullet",
			ListType::Ordered => "Ordered",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListDelimiter {
	Period,
	Paren,
}
impl ListDelimiter {
	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			ListDelimiter::Period => "Period",
			ListDelimiter::Paren => "Paren",
		}
	}
}

/// List-only content fields. Ignored for every other [`Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListData {
	pub list_type: ListType,
	pub tight: bool,
	pub start: Option<u32>,
	pub delimiter: Option<ListDelimiter>,
}
impl ListData {
	#[must_use]
	pub fn bullet() -> Self {
		Self {
			list_type: ListType::Bullet,
			tight: true,
			start: None,
			delimiter: None,
		}
	}

	#[must_use]
	pub fn ordered(start: u32) -> Self {
		Self {
			list_type: ListType::Ordered,
			tight: true,
			start: Some(start),
			delimiter: Some(ListDelimiter::Period),
		}
	}
}

/// The content of one node, i.e. everything that isn't a tree link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeData {
	pub kind: Kind,
	pub literal: Option<String>,
	pub destination: Option<String>,
	pub title: Option<String>,
	pub info: Option<String>,
	pub level: Option<u32>,
	pub list: Option<ListData>,
}
impl NodeData {
	#[must_use]
	pub fn new(kind: Kind) -> Self {
		Self {
			kind,
			literal: None,
			destination: None,
			title: None,
			info: None,
			level: None,
			list: None,
		}
	}

	pub fn text(literal: impl Into<String>) -> Self {
		Self::new(Kind::Text).with_literal(literal)
	}

	#[must_use]
	pub fn header(level: u32) -> Self {
		Self::new(Kind::Header).with_level(level)
	}

	#[must_use]
	pub fn list(list: ListData) -> Self {
		Self::new(Kind::List).with_list(list)
	}

	pub fn link(destination: impl Into<String>) -> Self {
		Self::new(Kind::Link).with_destination(destination)
	}

	pub fn image(destination: impl Into<String>) -> Self {
		Self::new(Kind::Image).with_destination(destination)
	}

	pub fn code_block(info: Option<String>, literal: impl Into<String>) -> Self {
		Self { info, ..Self::new(Kind::CodeBlock).with_literal(literal) }
	}

	pub fn with_literal(self, literal: impl Into<String>) -> Self {
		Self { literal: Some(literal.into()), ..self }
	}

	pub fn with_destination(self, destination: impl Into<String>) -> Self {
		Self { destination: Some(destination.into()), ..self }
	}

	pub fn with_title(self, title: impl Into<String>) -> Self {
		Self { title: Some(title.into()), ..self }
	}

	#[must_use]
	pub fn with_level(self, level: u32) -> Self {
		Self { level: Some(level), ..self }
	}

	#[must_use]
	pub fn with_list(self, list: ListData) -> Self {
		Self { list: Some(list), ..self }
	}

	/// The list data, but only if this is a [`Kind::List`] node.
	#[must_use]
	pub fn list_data(&self) -> Option<&ListData> {
		match self.kind {
			Kind::List => self.list.as_ref(),
			_ => None,
		}
	}
}
impl From<Kind> for NodeData {
	fn from(kind: Kind) -> Self {
		Self::new(kind)
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links {
	parent: Option<NodeId>,
	first_child: Option<NodeId>,
	last_child: Option<NodeId>,
	prev: Option<NodeId>,
	next: Option<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
	data: NodeData,
	links: Links,
}

/// A document tree. The root is created with the tree and can't be unlinked.
#[derive(Debug, Clone)]
pub struct Tree {
	slots: Vec<Slot>,
	root: NodeId,
}
impl Tree {
	pub fn new(root: impl Into<NodeData>) -> Self {
		Self {
			slots: vec![Slot {
				data: root.into(),
				links: Links::default(),
			}],
			root: NodeId(0),
		}
	}

	#[must_use]
	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Number of arena slots, including detached nodes.
	#[must_use]
	pub fn capacity(&self) -> usize {
		self.slots.len()
	}

	#[must_use]
	pub fn contains(&self, id: NodeId) -> bool {
		id.index() < self.slots.len()
	}

	/// Creates a detached node.
	///
	/// # Panics
	///
	/// Iff the arena outgrows [`u32`] indices.
	pub fn create(&mut self, data: impl Into<NodeData>) -> NodeId {
		let id = NodeId(u32::try_from(self.slots.len()).expect("Tree arena exhausted"));
		self.slots.push(Slot {
			data: data.into(),
			links: Links::default(),
		});
		id
	}

	/// Creates a node and appends it as `parent`'s last child.
	pub fn append(&mut self, parent: NodeId, data: impl Into<NodeData>) -> NodeId {
		let id = self.create(data);
		self.append_child(parent, id);
		id
	}

	#[must_use]
	pub fn data(&self, id: NodeId) -> &NodeData {
		&self.slots[id.index()].data
	}

	pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
		&mut self.slots[id.index()].data
	}

	#[must_use]
	pub fn kind(&self, id: NodeId) -> Kind {
		self.data(id).kind
	}

	#[must_use]
	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.links(id).parent
	}

	#[must_use]
	pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
		self.links(id).first_child
	}

	#[must_use]
	pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
		self.links(id).last_child
	}

	#[must_use]
	pub fn prev(&self, id: NodeId) -> Option<NodeId> {
		self.links(id).prev
	}

	#[must_use]
	pub fn next(&self, id: NodeId) -> Option<NodeId> {
		self.links(id).next
	}

	#[must_use]
	pub fn children(&self, id: NodeId) -> Children<'_> {
		Children {
			tree: self,
			next: self.first_child(id),
		}
	}

	/// `id` and everything below it, in pre-order.
	#[must_use]
	pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
		Descendants {
			tree: self,
			top: id,
			next: Some(id),
		}
	}

	/// Strict ancestors of `id`, innermost first.
	#[must_use]
	pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
		Ancestors {
			tree: self,
			next: self.parent(id),
		}
	}

	/// Whether `ancestor` is `id` or one of its ancestors.
	#[must_use]
	pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
		ancestor == id || self.ancestors(id).any(|a| a == ancestor)
	}

	pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
		self.unlink(child);
		self.link(parent, child, self.last_child(parent), None)
	}

	pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
		self.unlink(child);
		self.link(parent, child, None, self.first_child(parent))
	}

	/// Moves `node` so that it directly precedes `reference`.
	///
	/// # Panics
	///
	/// Iff `reference` is detached.
	pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
		if reference == node {
			return;
		}
		self.unlink(node);
		let parent = self.parent(reference).expect("`insert_before` reference must be linked");
		self.link(parent, node, self.prev(reference), Some(reference))
	}

	/// Moves `node` so that it directly follows `reference`.
	///
	/// # Panics
	///
	/// Iff `reference` is detached.
	pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
		if reference == node {
			return;
		}
		self.unlink(node);
		let parent = self.parent(reference).expect("`insert_after` reference must be linked");
		self.link(parent, node, Some(reference), self.next(reference))
	}

	/// Detaches `node` (with its subtree) from its parent. No-op for detached nodes.
	pub fn unlink(&mut self, node: NodeId) {
		let Links { parent, prev, next, .. } = self.links(node);
		let parent = match parent {
			Some(parent) => parent,
			None => return,
		};

		match prev {
			Some(prev) => self.links_mut(prev).next = next,
			None => self.links_mut(parent).first_child = next,
		}
		match next {
			Some(next) => self.links_mut(next).prev = prev,
			None => self.links_mut(parent).last_child = prev,
		}

		let links = self.links_mut(node);
		links.parent = None;
		links.prev = None;
		links.next = None;
	}

	fn link(&mut self, parent: NodeId, node: NodeId, prev: Option<NodeId>, next: Option<NodeId>) {
		assert_ne!(node, self.root, "The root node can't be linked under another node");
		assert!(!self.is_inclusive_ancestor(node, parent), "Linking {} under {} would create a cycle", node, parent);
		debug_assert_eq!(self.links(node).parent, None, "Only detached nodes can be linked");

		match prev {
			Some(prev) => self.links_mut(prev).next = Some(node),
			None => self.links_mut(parent).first_child = Some(node),
		}
		match next {
			Some(next) => self.links_mut(next).prev = Some(node),
			None => self.links_mut(parent).last_child = Some(node),
		}

		let links = self.links_mut(node);
		links.parent = Some(parent);
		links.prev = prev;
		links.next = next;
	}

	fn links(&self, id: NodeId) -> Links {
		self.slots[id.index()].links
	}

	fn links_mut(&mut self, id: NodeId) -> &mut Links {
		&mut self.slots[id.index()].links
	}
}

pub struct Children<'a> {
	tree: &'a Tree,
	next: Option<NodeId>,
}
impl<'a> Iterator for Children<'a> {
	type Item = NodeId;

	fn next(&mut self) -> Option<Self::Item> {
		let current = self.next?;
		self.next = self.tree.next(current);
		Some(current)
	}
}
impl<'a> FusedIterator for Children<'a> {}

pub struct Descendants<'a> {
	tree: &'a Tree,
	top: NodeId,
	next: Option<NodeId>,
}
impl<'a> Iterator for Descendants<'a> {
	type Item = NodeId;

	fn next(&mut self) -> Option<Self::Item> {
		let current = self.next?;
		let (tree, top) = (self.tree, self.top);
		self.next = tree.first_child(current).or_else(|| {
			let mut cursor = current;
			loop {
				if cursor == top {
					break None;
				}
				if let Some(next) = tree.next(cursor) {
					break Some(next);
				}
				cursor = tree.parent(cursor)?;
			}
		});
		Some(current)
	}
}
impl<'a> FusedIterator for Descendants<'a> {}

pub struct Ancestors<'a> {
	tree: &'a Tree,
	next: Option<NodeId>,
}
impl<'a> Iterator for Ancestors<'a> {
	type Item = NodeId;

	fn next(&mut self) -> Option<Self::Item> {
		let current = self.next?;
		self.next = self.tree.parent(current);
		Some(current)
	}
}
impl<'a> FusedIterator for Ancestors<'a> {}

//! An in-process output tree, for server-side rendering and for inspecting what the [`Reconciler`](`crate::Reconciler`) did.

use crate::{render::Backend, rules::Markup};
use core::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Handle to an object in a [`MemoryBackend`]. Identity, not content, decides equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(usize);
impl Display for OutputId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "@{}", self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
	#[error("Unknown output {0}")]
	Unknown(OutputId),
	#[error("{0} is a text node, so it has neither children nor attributes")]
	NotAnElement(OutputId),
	#[error("{child} is not a child of {container}")]
	NotAChild { container: OutputId, child: OutputId },
	#[error("Inserting {child} into {container} would make it its own ancestor")]
	Cycle { container: OutputId, child: OutputId },
}

#[derive(Debug, Clone)]
enum Content {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
		children: Vec<OutputId>,
	},
	Text(String),
}

#[derive(Debug, Clone)]
struct Object {
	content: Content,
	parent: Option<OutputId>,
}

/// Elements and text nodes in an arena. Objects are never freed, only detached.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
	objects: Vec<Object>,
	mutations: usize,
}

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img"];

impl MemoryBackend {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of objects ever created.
	#[must_use]
	pub fn len(&self) -> usize {
		self.objects.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}

	/// Number of changes to existing objects so far: insertions, removals, attribute and text writes.
	#[must_use]
	pub fn mutations(&self) -> usize {
		self.mutations
	}

	fn get(&self, id: OutputId) -> Result<&Object, MemoryError> {
		self.objects.get(id.0).ok_or(MemoryError::Unknown(id))
	}

	fn get_mut(&mut self, id: OutputId) -> Result<&mut Object, MemoryError> {
		self.objects.get_mut(id.0).ok_or(MemoryError::Unknown(id))
	}

	fn children_mut(&mut self, id: OutputId) -> Result<&mut Vec<OutputId>, MemoryError> {
		match &mut self.get_mut(id)?.content {
			Content::Element { children, .. } => Ok(children),
			Content::Text(_) => Err(MemoryError::NotAnElement(id)),
		}
	}

	fn attributes_mut(&mut self, id: OutputId) -> Result<&mut Vec<(String, String)>, MemoryError> {
		match &mut self.get_mut(id)?.content {
			Content::Element { attributes, .. } => Ok(attributes),
			Content::Text(_) => Err(MemoryError::NotAnElement(id)),
		}
	}

	fn push(&mut self, content: Content) -> OutputId {
		self.objects.push(Object { content, parent: None });
		OutputId(self.objects.len() - 1)
	}

	fn detach(&mut self, child: OutputId) -> Result<(), MemoryError> {
		if let Some(parent) = self.get_mut(child)?.parent.take() {
			self.children_mut(parent)?.retain(|&sibling| sibling != child);
		}
		Ok(())
	}

	#[must_use]
	pub fn parent(&self, id: OutputId) -> Option<OutputId> {
		self.objects.get(id.0)?.parent
	}

	/// Children of an element. Empty for text nodes and unknown handles.
	#[must_use]
	pub fn children(&self, id: OutputId) -> &[OutputId] {
		match self.objects.get(id.0).map(|object| &object.content) {
			Some(Content::Element { children, .. }) => children,
			_ => &[],
		}
	}

	#[must_use]
	pub fn tag(&self, id: OutputId) -> Option<&str> {
		match &self.objects.get(id.0)?.content {
			Content::Element { tag, .. } => Some(tag),
			Content::Text(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, id: OutputId, name: &str) -> Option<&str> {
		match &self.objects.get(id.0)?.content {
			Content::Element { attributes, .. } => attributes.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str()),
			Content::Text(_) => None,
		}
	}

	/// The data of a text node.
	#[must_use]
	pub fn text(&self, id: OutputId) -> Option<&str> {
		match &self.objects.get(id.0)?.content {
			Content::Text(text) => Some(text),
			Content::Element { .. } => None,
		}
	}

	/// Serializes `id` and its descendants. Attributes keep their insertion order.
	///
	/// # Errors
	///
	/// Iff `id` is unknown.
	pub fn to_html(&self, id: OutputId) -> Result<String, MemoryError> {
		let mut html = String::new();
		self.write_html(id, &mut html)?;
		Ok(html)
	}

	fn write_html(&self, id: OutputId, html: &mut String) -> Result<(), MemoryError> {
		match &self.get(id)?.content {
			Content::Text(text) => escape(text, false, html),
			Content::Element { tag, attributes, children } => {
				html.push('<');
				html.push_str(tag);
				for (name, value) in attributes {
					html.push(' ');
					html.push_str(name);
					html.push_str("=\"");
					escape(value, true, html);
					html.push('"');
				}
				html.push('>');
				if VOID_ELEMENTS.contains(&tag.as_str()) && children.is_empty() {
					return Ok(());
				}
				for &child in children {
					self.write_html(child, html)?;
				}
				html.push_str("</");
				html.push_str(tag);
				html.push('>');
			}
		}
		Ok(())
	}
}

fn escape(text: &str, attribute: bool, html: &mut String) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'<' => html.push_str("&lt;"),
			'>' => html.push_str("&gt;"),
			'"' if attribute => html.push_str("&quot;"),
			c => html.push(c),
		}
	}
}

impl Backend for MemoryBackend {
	type Output = OutputId;
	type Error = MemoryError;

	fn insert_before(&mut self, container: &OutputId, child: &OutputId, reference: Option<&OutputId>) -> Result<(), MemoryError> {
		let (container, child) = (*container, *child);
		self.children_mut(container)?;
		self.get(child)?;

		let mut ancestor = Some(container);
		while let Some(current) = ancestor {
			if current == child {
				return Err(MemoryError::Cycle { container, child });
			}
			ancestor = self.get(current)?.parent;
		}

		if let Some(&reference) = reference {
			if self.get(reference)?.parent != Some(container) {
				return Err(MemoryError::NotAChild { container, child: reference });
			}
			if reference == child {
				return Ok(());
			}
		}

		self.detach(child)?;
		let children = self.children_mut(container)?;
		let position = match reference {
			Some(reference) => children.iter().position(|sibling| sibling == reference).unwrap_or(children.len()),
			None => children.len(),
		};
		children.insert(position, child);
		self.get_mut(child)?.parent = Some(container);
		self.mutations += 1;
		Ok(())
	}

	fn remove_child(&mut self, container: &OutputId, child: &OutputId) -> Result<(), MemoryError> {
		if self.get(*child)?.parent != Some(*container) {
			return Err(MemoryError::NotAChild {
				container: *container,
				child: *child,
			});
		}
		self.detach(*child)?;
		self.mutations += 1;
		Ok(())
	}
}

impl Markup for MemoryBackend {
	fn create_element(&mut self, tag: &str) -> Result<OutputId, MemoryError> {
		Ok(self.push(Content::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
			children: Vec::new(),
		}))
	}

	fn create_text(&mut self, text: &str) -> Result<OutputId, MemoryError> {
		Ok(self.push(Content::Text(text.to_owned())))
	}

	fn set_attribute(&mut self, element: &OutputId, name: &str, value: &str) -> Result<(), MemoryError> {
		let attributes = self.attributes_mut(*element)?;
		match attributes.iter_mut().find(|(key, _)| key == name) {
			Some((_, existing)) => value.clone_into(existing),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
		self.mutations += 1;
		Ok(())
	}

	fn remove_attribute(&mut self, element: &OutputId, name: &str) -> Result<(), MemoryError> {
		let attributes = self.attributes_mut(*element)?;
		let before = attributes.len();
		attributes.retain(|(key, _)| key != name);
		if attributes.len() != before {
			self.mutations += 1;
		}
		Ok(())
	}

	/// Like the DOM: Text nodes are rewritten, elements lose all children and gain one text child unless `text` is empty.
	fn set_text_content(&mut self, node: &OutputId, text: &str) -> Result<(), MemoryError> {
		let node = *node;
		if let Content::Text(data) = &mut self.get_mut(node)?.content {
			text.clone_into(data);
			self.mutations += 1;
			return Ok(());
		}

		for child in core::mem::take(self.children_mut(node)?) {
			self.get_mut(child)?.parent = None;
		}
		if !text.is_empty() {
			let text = self.create_text(text)?;
			self.children_mut(node)?.push(text);
			self.get_mut(text)?.parent = Some(node);
		}
		self.mutations += 1;
		Ok(())
	}

	fn text_content(&self, node: &OutputId) -> Result<String, MemoryError> {
		let mut text = String::new();
		let mut stack = vec![*node];
		while let Some(current) = stack.pop() {
			match &self.get(current)?.content {
				Content::Text(data) => text.push_str(data),
				Content::Element { children, .. } => stack.extend(children.iter().rev()),
			}
		}
		Ok(text)
	}

	fn first_child(&self, node: &OutputId) -> Result<Option<OutputId>, MemoryError> {
		self.get(*node)?;
		Ok(self.children(*node).first().copied())
	}
}

#[cfg(test)]
mod tests {
	use super::{MemoryBackend, MemoryError};
	use crate::{render::Backend, rules::Markup};

	#[test]
	fn inserting_moves_instead_of_duplicating() {
		let mut backend = MemoryBackend::new();
		let list = backend.create_element("ul").unwrap();
		let a = backend.create_element("li").unwrap();
		let b = backend.create_element("li").unwrap();
		backend.append_child(&list, &a).unwrap();
		backend.append_child(&list, &b).unwrap();

		backend.insert_before(&list, &b, Some(&a)).unwrap();
		assert_eq!(backend.children(list), &[b, a]);

		let other = backend.create_element("ol").unwrap();
		backend.append_child(&other, &a).unwrap();
		assert_eq!(backend.children(list), &[b]);
		assert_eq!(backend.parent(a), Some(other));
	}

	#[test]
	fn rejects_cycles_and_foreign_references() {
		let mut backend = MemoryBackend::new();
		let outer = backend.create_element("div").unwrap();
		let inner = backend.create_element("div").unwrap();
		let stray = backend.create_element("p").unwrap();
		backend.append_child(&outer, &inner).unwrap();

		assert_eq!(
			backend.append_child(&inner, &outer),
			Err(MemoryError::Cycle { container: inner, child: outer })
		);
		assert_eq!(
			backend.insert_before(&outer, &stray, Some(&stray)),
			Err(MemoryError::NotAChild { container: outer, child: stray })
		);
		assert_eq!(
			backend.remove_child(&inner, &stray),
			Err(MemoryError::NotAChild { container: inner, child: stray })
		);
	}

	#[test]
	fn text_content_replaces_children() {
		let mut backend = MemoryBackend::new();
		let code = backend.create_element("code").unwrap();
		let em = backend.create_element("em").unwrap();
		let text = backend.create_text("x").unwrap();
		backend.append_child(&em, &text).unwrap();
		backend.append_child(&code, &em).unwrap();
		assert_eq!(backend.text_content(&code).unwrap(), "x");

		backend.set_text_content(&code, "a < b").unwrap();
		assert_eq!(backend.parent(em), None);
		assert_eq!(backend.to_html(code).unwrap(), "<code>a &lt; b</code>");

		backend.set_text_content(&code, "").unwrap();
		assert_eq!(backend.to_html(code).unwrap(), "<code></code>");
	}

	#[test]
	fn serializes_attributes_and_void_elements() {
		let mut backend = MemoryBackend::new();
		let p = backend.create_element("p").unwrap();
		let img = backend.create_element("img").unwrap();
		backend.set_attribute(&img, "src", "a.png").unwrap();
		backend.set_attribute(&img, "alt", "\"quoted\" & more").unwrap();
		backend.set_attribute(&img, "src", "b.png").unwrap();
		backend.append_child(&p, &img).unwrap();
		assert_eq!(
			backend.to_html(p).unwrap(),
			r#"<p><img src="b.png" alt="&quot;quoted&quot; &amp; more"></p>"#
		);

		backend.remove_attribute(&img, "alt").unwrap();
		assert_eq!(backend.attribute(img, "alt"), None);
		assert_eq!(backend.attribute(img, "src"), Some("b.png"));
	}
}

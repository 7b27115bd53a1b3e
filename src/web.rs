//! Rendering into the browser DOM through [`web_sys`].

use crate::{render::Backend, rules::Markup};
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

/// A failed DOM call. The thrown value is only kept as its debug representation.
#[derive(Debug, Clone, Error)]
#[error("DOM operation failed: {description}")]
pub struct DomError {
	description: String,
}
impl DomError {
	#[must_use]
	pub fn description(&self) -> &str {
		&self.description
	}
}
impl From<JsValue> for DomError {
	fn from(value: JsValue) -> Self {
		Self {
			description: format!("{:?}", value),
		}
	}
}

/// Creates nodes in one [`Document`]. Outputs are plain [`Node`]s, so the host can place the root output wherever it likes.
#[derive(Debug, Clone)]
pub struct DomBackend {
	document: Document,
}
impl DomBackend {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self { document }
	}

	/// The current window's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	fn element<'a>(node: &'a Node) -> Result<&'a Element, DomError> {
		node.dyn_ref::<Element>().ok_or_else(|| DomError {
			description: format!("Expected an element, found {:?}", node.node_name()),
		})
	}
}

impl Backend for DomBackend {
	type Output = Node;
	type Error = DomError;

	fn insert_before(&mut self, container: &Node, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		container.insert_before(child, reference)?;
		Ok(())
	}

	fn remove_child(&mut self, container: &Node, child: &Node) -> Result<(), DomError> {
		container.remove_child(child)?;
		Ok(())
	}

	fn append_child(&mut self, container: &Node, child: &Node) -> Result<(), DomError> {
		container.append_child(child)?;
		Ok(())
	}
}

impl Markup for DomBackend {
	fn create_element(&mut self, tag: &str) -> Result<Node, DomError> {
		Ok(self.document.create_element(tag)?.into())
	}

	fn create_text(&mut self, text: &str) -> Result<Node, DomError> {
		Ok(self.document.create_text_node(text).into())
	}

	fn set_attribute(&mut self, element: &Node, name: &str, value: &str) -> Result<(), DomError> {
		Self::element(element)?.set_attribute(name, value)?;
		Ok(())
	}

	fn remove_attribute(&mut self, element: &Node, name: &str) -> Result<(), DomError> {
		Self::element(element)?.remove_attribute(name)?;
		Ok(())
	}

	fn set_text_content(&mut self, node: &Node, text: &str) -> Result<(), DomError> {
		node.set_text_content(Some(text));
		Ok(())
	}

	fn text_content(&self, node: &Node) -> Result<String, DomError> {
		Ok(node.text_content().unwrap_or_default())
	}

	fn first_child(&self, node: &Node) -> Result<Option<Node>, DomError> {
		Ok(node.first_child())
	}
}

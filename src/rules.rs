//! The default rule set, for backends that speak (X)HTML-like element trees.

use crate::{
	render::{Backend, RenderState, Rule, RuleTable},
	tree::{Kind, ListType, NodeData},
};
use tracing::{level_filters::STATIC_MAX_LEVEL, warn, Level};

/// Element-tree operations needed by [`markup_rules`].
pub trait Markup: Backend {
	fn create_element(&mut self, tag: &str) -> Result<Self::Output, Self::Error>;
	fn create_text(&mut self, text: &str) -> Result<Self::Output, Self::Error>;
	fn set_attribute(&mut self, element: &Self::Output, name: &str, value: &str) -> Result<(), Self::Error>;
	fn remove_attribute(&mut self, element: &Self::Output, name: &str) -> Result<(), Self::Error>;
	/// Replaces all content of `node` with a single text, like the DOM's ***textContent*** setter.
	fn set_text_content(&mut self, node: &Self::Output, text: &str) -> Result<(), Self::Error>;
	/// Concatenated text of `node` and its descendants.
	fn text_content(&self, node: &Self::Output) -> Result<String, Self::Error>;
	fn first_child(&self, node: &Self::Output) -> Result<Option<Self::Output>, Self::Error>;
}

/// Shared `init` for kinds that render as a single element holding their children.
fn wrap<B: Markup>(backend: &mut B, tag: &str) -> Result<RenderState<B::Output>, B::Error> {
	backend.create_element(tag).map(RenderState::wrapping)
}

macro_rules! wrapping_rules {
	($($name:ident => $tag:literal),*$(,)?) => {$(
		fn $name<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
			wrap(backend, $tag)
		}
	)*};
}

wrapping_rules! {
	init_document => "div",
	init_paragraph => "p",
	init_block_quote => "blockquote",
	init_item => "li",
	init_emph => "em",
	init_strong => "strong",
	init_link => "a",
}

fn optional_attribute<B: Markup>(backend: &mut B, element: &B::Output, name: &str, value: Option<&str>) -> Result<(), B::Error> {
	match value {
		Some(value) => backend.set_attribute(element, name, value),
		None => backend.remove_attribute(element, name),
	}
}

fn init_text<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	backend.create_text("").map(RenderState::leaf)
}

fn update_literal<B: Markup>(backend: &mut B, node: &NodeData, state: &RenderState<B::Output>) -> Result<(), B::Error> {
	backend.set_text_content(&state.output, node.literal.as_deref().unwrap_or_default())
}

fn init_softbreak<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	backend.create_text("\n").map(RenderState::leaf)
}

fn init_hardbreak<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	backend.create_element("br").map(RenderState::leaf)
}

fn init_horizontal_rule<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	backend.create_element("hr").map(RenderState::leaf)
}

fn init_code<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	backend.create_element("code").map(RenderState::leaf)
}

fn update_html<B: Markup>(backend: &mut B, node: &NodeData, state: &RenderState<B::Output>) -> Result<(), B::Error> {
	warn!("Raw HTML is not supported. Rendering it as literal text.");
	update_literal(backend, node, state)
}

fn init_html_block<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	backend.create_element("div").map(RenderState::leaf)
}

fn update_link<B: Markup>(backend: &mut B, node: &NodeData, state: &RenderState<B::Output>) -> Result<(), B::Error> {
	backend.set_attribute(&state.output, "href", node.destination.as_deref().unwrap_or_default())?;
	optional_attribute(backend, &state.output, "title", node.title.as_deref().filter(|title| !title.is_empty()))
}

/// The visible `<img>` is the output. Children (the alt text) accumulate in a detached `<p>`.
fn init_image<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	let image = backend.create_element("img")?;
	let alt = backend.create_element("p")?;
	Ok(RenderState::with_container(image, alt))
}

fn update_image<B: Markup>(backend: &mut B, node: &NodeData, state: &RenderState<B::Output>) -> Result<(), B::Error> {
	backend.set_attribute(&state.output, "src", node.destination.as_deref().unwrap_or_default())?;
	optional_attribute(backend, &state.output, "title", node.title.as_deref().filter(|title| !title.is_empty()))
}

fn image_alt<B: Markup>(backend: &mut B, _: &NodeData, state: &RenderState<B::Output>) -> Result<(), B::Error> {
	let alt = match &state.container {
		Some(container) => backend.text_content(container)?,
		None => String::new(),
	};
	backend.set_attribute(&state.output, "alt", &alt)
}

fn init_list<B: Markup>(backend: &mut B, node: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	match node.list_data().map(|list| list.list_type) {
		Some(ListType::Ordered) => wrap(backend, "ol"),
		Some(ListType::Bullet) => wrap(backend, "ul"),
		None => {
			warn!("List without list data. Rendering it as bullet list.");
			wrap(backend, "ul")
		}
	}
}

fn update_list<B: Markup>(backend: &mut B, node: &NodeData, state: &RenderState<B::Output>) -> Result<(), B::Error> {
	let start = node.list_data().and_then(|list| list.start).filter(|&start| start != 1).map(|start| start.to_string());
	optional_attribute(backend, &state.output, "start", start.as_deref())
}

fn init_header<B: Markup>(backend: &mut B, node: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	let level = node.level.unwrap_or(1);
	let clamped = level.max(1).min(6);
	if STATIC_MAX_LEVEL >= Level::WARN && clamped != level {
		warn!("Header level {} is out of range. Rendering it as <h{}>.", level, clamped);
	}
	wrap(backend, &format!("h{}", clamped))
}

/// `<pre><code>literal</code></pre>`
fn init_code_block<B: Markup>(backend: &mut B, _: &NodeData) -> Result<RenderState<B::Output>, B::Error> {
	let pre = backend.create_element("pre")?;
	let code = backend.create_element("code")?;
	let text = backend.create_text("")?;
	backend.append_child(&code, &text)?;
	backend.append_child(&pre, &code)?;
	Ok(RenderState::leaf(pre))
}

fn update_code_block<B: Markup>(backend: &mut B, node: &NodeData, state: &RenderState<B::Output>) -> Result<(), B::Error> {
	let literal = node.literal.as_deref().unwrap_or_default();
	match backend.first_child(&state.output)? {
		Some(code) => backend.set_text_content(&code, literal),
		None => {
			warn!("Code block lost its <code> element. Writing into <pre> directly.");
			backend.set_text_content(&state.output, literal)
		}
	}
}

/// The table for all [`Kind`]s, with a literal-text fallback.
#[must_use]
pub fn markup_rules<B: Markup>() -> RuleTable<B> {
	let container = Rule::<B>::new;
	RuleTable::new(Rule::<B>::new(init_text::<B>).with_update(update_literal::<B>))
		.with(Kind::Document, container(init_document::<B>))
		.with(Kind::Paragraph, container(init_paragraph::<B>))
		.with(Kind::BlockQuote, container(init_block_quote::<B>))
		.with(Kind::Item, container(init_item::<B>))
		.with(Kind::Emph, container(init_emph::<B>))
		.with(Kind::Strong, container(init_strong::<B>))
		.with(Kind::Header, container(init_header::<B>))
		.with(Kind::List, Rule::<B>::new(init_list::<B>).with_update(update_list::<B>))
		.with(Kind::Link, Rule::<B>::new(init_link::<B>).with_update(update_link::<B>))
		.with(
			Kind::Image,
			Rule::<B>::new(init_image::<B>).with_update(update_image::<B>).with_on_child_updated(image_alt::<B>),
		)
		.with(Kind::Text, Rule::<B>::new(init_text::<B>).with_update(update_literal::<B>))
		.with(Kind::Softbreak, Rule::<B>::new(init_softbreak::<B>))
		.with(Kind::Hardbreak, Rule::<B>::new(init_hardbreak::<B>))
		.with(Kind::HorizontalRule, Rule::<B>::new(init_horizontal_rule::<B>))
		.with(Kind::Code, Rule::<B>::new(init_code::<B>).with_update(update_literal::<B>))
		.with(Kind::CodeBlock, Rule::<B>::new(init_code_block::<B>).with_update(update_code_block::<B>))
		.with(Kind::Html, Rule::<B>::new(init_text::<B>).with_update(update_html::<B>))
		.with(Kind::HtmlBlock, Rule::<B>::new(init_html_block::<B>).with_update(update_html::<B>))
}

use cmark_dom::{
	memory::{MemoryBackend, MemoryError, OutputId},
	tree::{ListData, NodeData},
	Kind, Markup, Reconciler, RenderState, Rule, RuleTable,
};

mod common;
use common::{assert_integrity, build, document, html, leaf, list, markup_reconciler, node, paragraph, text};

fn render(shape: common::Shape) -> String {
	let mut reconciler = markup_reconciler();
	reconciler.update(build(shape)).unwrap();
	assert_integrity(&reconciler);
	html(&reconciler)
}

#[test]
fn inlines() {
	assert_eq!(
		render(document(Some(node(
			Kind::Paragraph,
			vec![
				node(Kind::Strong, Some(text("bold"))),
				leaf(Kind::Softbreak),
				node(Kind::Emph, Some(text("italic"))),
				leaf(Kind::Hardbreak),
				leaf(NodeData::new(Kind::Code).with_literal("x < y")),
				node(NodeData::link("/docs").with_title("Docs"), Some(text("docs"))),
			]
		)))),
		"<div><p><strong>bold</strong>\n<em>italic</em><br><code>x &lt; y</code><a href=\"/docs\" title=\"Docs\">docs</a></p></div>"
	);
}

#[test]
fn blocks() {
	assert_eq!(
		render(document(vec![
			node(NodeData::header(3), Some(text("Section"))),
			node(Kind::BlockQuote, Some(paragraph("quoted"))),
			leaf(Kind::HorizontalRule),
			list(ListData::bullet(), &["one", "two"]),
			list(ListData::ordered(7), &["seven"]),
			leaf(NodeData::code_block(Some("rust".to_owned()), "fn main() {}\n")),
		])),
		"<div><h3>Section</h3><blockquote><p>quoted</p></blockquote><hr>\
		 <ul><li>one</li><li>two</li></ul><ol start=\"7\"><li>seven</li></ol>\
		 <pre><code>fn main() {}\n</code></pre></div>"
	);
}

#[test]
fn header_levels_are_clamped() {
	assert_eq!(render(document(Some(node(NodeData::header(9), Some(text("deep")))))), "<div><h6>deep</h6></div>");
	assert_eq!(render(document(Some(node(NodeData::header(0), Some(text("flat")))))), "<div><h1>flat</h1></div>");
}

#[test]
fn raw_html_is_rendered_as_text() {
	assert_eq!(
		render(document(vec![
			leaf(NodeData::new(Kind::HtmlBlock).with_literal("<section>")),
			node(Kind::Paragraph, Some(leaf(NodeData::new(Kind::Html).with_literal("<b>")))),
		])),
		"<div><div>&lt;section&gt;</div><p>&lt;b&gt;</p></div>"
	);
}

#[test]
fn code_block_update_keeps_elements() {
	let block = |literal: &str| document(Some(leaf(NodeData::code_block(None, literal))));

	let mut reconciler = markup_reconciler();
	reconciler.update(build(block("a"))).unwrap();
	let pre = common::root_child_output(&reconciler, 0);
	let code = reconciler.backend().children(pre)[0];

	reconciler.update(build(block("b"))).unwrap();
	assert_eq!(common::root_child_output(&reconciler, 0), pre);
	assert_eq!(reconciler.backend().children(pre), &[code]);
	assert_eq!(html(&reconciler), "<div><pre><code>b</code></pre></div>");
	assert_eq!(reconciler.last_stats().patched, 1);
}

fn init_section(backend: &mut MemoryBackend, _: &NodeData) -> Result<RenderState<OutputId>, MemoryError> {
	backend.create_element("section").map(RenderState::wrapping)
}

fn init_placeholder(backend: &mut MemoryBackend, node: &NodeData) -> Result<RenderState<OutputId>, MemoryError> {
	backend.create_text(&format!("[{}]", node.kind)).map(RenderState::leaf)
}

#[test]
fn missing_rules_use_the_fallback() {
	common::init_logging();
	let rules = RuleTable::new(Rule::new(init_placeholder)).with(Kind::Document, Rule::new(init_section));
	assert!(rules.contains(Kind::Document));
	assert!(!rules.contains(Kind::Paragraph));

	let mut reconciler = Reconciler::new(MemoryBackend::new(), rules);
	reconciler.update(build(document(vec![paragraph("dropped"), leaf(Kind::HorizontalRule)]))).unwrap();
	// The placeholder has no container, so the paragraph's text stays detached.
	assert_eq!(html(&reconciler), "<section>[Paragraph][HorizontalRule]</section>");
}

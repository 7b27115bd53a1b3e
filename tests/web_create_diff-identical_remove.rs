#![cfg(target_arch = "wasm32")]

use cmark_dom::{tree::NodeData, web::DomBackend, Kind, Reconciler, Stats, Tree};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, Element, HtmlBodyElement, Node};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn paragraph() {
	test_create_diff_identical_remove(
		|| {
			let mut tree = Tree::new(Kind::Document);
			let paragraph = tree.append(tree.root(), Kind::Paragraph);
			tree.append(paragraph, NodeData::text("Hello cmark-dom!"));
			tree
		},
		"<div><p>Hello cmark-dom!</p></div>",
	);
}

#[wasm_bindgen_test]
fn image() {
	test_create_diff_identical_remove(
		|| {
			let mut tree = Tree::new(Kind::Document);
			let paragraph = tree.append(tree.root(), Kind::Paragraph);
			let image = tree.append(paragraph, NodeData::image("logo.png"));
			tree.append(image, NodeData::text("The "));
			let emph = tree.append(image, Kind::Emph);
			tree.append(emph, NodeData::text("logo"));
			tree
		},
		r#"<div><p><img src="logo.png" alt="The logo"></p></div>"#,
	);
}

#[wasm_bindgen_test]
fn code_block() {
	test_create_diff_identical_remove(
		|| {
			let mut tree = Tree::new(Kind::Document);
			tree.append(tree.root(), NodeData::code_block(None, "a < b"));
			tree
		},
		"<div><pre><code>a &lt; b</code></pre></div>",
	);
}

#[wasm_bindgen_test]
fn list_type_change() {
	init_logging();
	let mut reconciler = Reconciler::markup(DomBackend::from_window().unwrap());
	let list = |ordered: bool| {
		let mut tree = Tree::new(Kind::Document);
		let data = if ordered { cmark_dom::tree::ListData::ordered(1) } else { cmark_dom::tree::ListData::bullet() };
		let list = tree.append(tree.root(), NodeData::list(data));
		let item = tree.append(list, Kind::Item);
		tree.append(item, NodeData::text("x"));
		tree
	};

	let root = reconciler.update(list(false)).unwrap();
	let same_root = reconciler.update(list(true)).unwrap();
	assert_eq!(root, same_root);
	assert_eq!(outer_html(&root), "<div><ol><li>x</li></ol></div>");
	assert_eq!(reconciler.last_stats().replaced, 1);
}

fn init_logging() {
	static mut LOG_INITIALIZED: bool = false;
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}
}

fn outer_html(node: &Node) -> String {
	node.dyn_ref::<Element>().unwrap().outer_html()
}

fn test_create_diff_identical_remove(tree: impl Fn() -> Tree, expected: &str) {
	init_logging();

	let body = window().unwrap().document().unwrap().body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	let mut reconciler = Reconciler::markup(DomBackend::from_window().unwrap());

	let root = reconciler.update(tree()).unwrap();
	body.append_child(&root).unwrap();
	assert_eq!(outer_html(&root), expected);

	let again = reconciler.update(tree()).unwrap();
	assert_eq!(again, root);
	assert_eq!(reconciler.last_stats(), Stats::default());
	assert_eq!(outer_html(&root), expected);

	let removed = reconciler.reset().unwrap();
	body.remove_child(&removed).unwrap();
	assert!(!body.contains(Some(&root)));
}

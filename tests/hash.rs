use cmark_dom::{
	hash::{attr_hash, HashCalculator, NodeHashes, RollingHash},
	tree::{ListData, NodeData},
	Kind, Tree,
};

mod common;
use common::{build, document, list, node, paragraph, text};

#[test]
fn rolling_hash_wraps() {
	let mut hasher = RollingHash::new();
	hasher.update(u32::MAX);
	hasher.update(1);
	assert_eq!(hasher.digest(), u32::MAX.wrapping_mul(17).wrapping_add(1));
}

#[test]
fn known_values() {
	let tree = build(document(Some(paragraph("a"))));
	let hashes = HashCalculator::compute(&tree);
	let paragraph = tree.first_child(tree.root()).unwrap();
	let text = tree.first_child(paragraph).unwrap();

	assert_eq!(
		hashes[text],
		NodeHashes {
			attr: 1_014_243_770,
			children: 0,
			hash: 62_274_906,
		}
	);
	assert_eq!(
		hashes[paragraph],
		NodeHashes {
			attr: 3_676_960_689,
			children: 62_274_906,
			hash: 2_441_064_475,
		}
	);
	assert_eq!(
		hashes[tree.root()],
		NodeHashes {
			attr: 2_411_936_698,
			children: 2_441_064_475,
			hash: 494_315_381,
		}
	);

	assert_eq!(HashCalculator::compute(&Tree::new(Kind::Document)).hash(Tree::new(Kind::Document).root()), 2_348_218_202);
}

#[test]
fn attribute_json_text() {
	assert_eq!(attr_hash(&NodeData::list(ListData::bullet())), 3_396_255_901);
	assert_eq!(attr_hash(&NodeData::header(2)), 1_513_903_723);
	assert_eq!(attr_hash(&NodeData::text("say \"hi\"\n")), 604_253_277);
	assert_eq!(attr_hash(&NodeData::text("\u{1}")), 3_295_981_867);
	// UTF-16 code units, including a surrogate pair.
	assert_eq!(attr_hash(&NodeData::text("é😀")), 1_159_587_023);
}

#[test]
fn list_fields_only_count_on_lists() {
	let paragraph = NodeData::new(Kind::Paragraph);
	assert_eq!(attr_hash(&paragraph.clone().with_list(ListData::ordered(3))), attr_hash(&paragraph));
	assert_ne!(attr_hash(&NodeData::list(ListData::ordered(3))), attr_hash(&NodeData::list(ListData::ordered(4))));
}

#[test]
fn equal_trees_hash_equal() {
	let shape = || document(vec![paragraph("a"), list(ListData::ordered(2), &["x", "y"]), node(Kind::HorizontalRule, None)]);
	let (first, second) = (build(shape()), build(shape()));
	assert_eq!(
		HashCalculator::compute(&first).hash(first.root()),
		HashCalculator::compute(&second).hash(second.root())
	);
}

#[test]
fn changes_propagate_to_the_root() {
	let mut tree = build(document(vec![
		node(Kind::BlockQuote, Some(node(Kind::Paragraph, vec![text("a"), text("b")]))),
		paragraph("c"),
	]));
	let before = HashCalculator::compute(&tree);

	let quote = tree.first_child(tree.root()).unwrap();
	let paragraph = tree.first_child(quote).unwrap();
	let b = tree.last_child(paragraph).unwrap();
	tree.data_mut(b).literal = Some("B".to_owned());
	let after = HashCalculator::compute(&tree);

	for id in [b, paragraph, quote, tree.root()].iter().copied() {
		assert_ne!(before.hash(id), after.hash(id), "{} ({}) kept its hash", id, tree.kind(id));
	}
	let untouched = tree.last_child(tree.root()).unwrap();
	assert_eq!(before[untouched], after[untouched]);
	assert_eq!(before[paragraph].attr, after[paragraph].attr);
}

#[test]
fn child_order_matters() {
	let ab = build(document(vec![paragraph("a"), paragraph("b")]));
	let ba = build(document(vec![paragraph("b"), paragraph("a")]));
	assert_ne!(HashCalculator::compute(&ab).hash(ab.root()), HashCalculator::compute(&ba).hash(ba.root()));
}

#[test]
fn detached_nodes_are_skipped() {
	let mut tree = build(document(Some(paragraph("a"))));
	let detached = tree.create(NodeData::text("loose"));
	let hashes = HashCalculator::compute(&tree);
	assert!(hashes.covers(&tree));
	assert_eq!(hashes.get(detached), None);
	assert_eq!(hashes.hash(tree.root()), 494_315_381);
}

//! Incremental rendering of CommonMark-style document trees.
//!
//! A [`Reconciler`] keeps the last rendered [`Tree`] together with its output and, on each
//! [`update`](`Reconciler::update`), fingerprints the new tree, reuses every unchanged subtree and only
//! calls the per-[`Kind`] [`Rule`]s where content actually changed.
//!
//! Output lives in a [`Backend`]: [`MemoryBackend`](`memory::MemoryBackend`) for server-side rendering and tests,
//! or [`DomBackend`](`web::DomBackend`) for the browser.

#![doc(html_root_url = "https://docs.rs/cmark-dom/0.1.0")]
#![warn(clippy::pedantic)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod error;
pub mod hash;
pub mod memory;
pub mod pool;
pub mod reconcile;
pub mod render;
pub mod rules;
pub mod tree;
pub mod web;

pub use error::Error;
pub use reconcile::{Options, Reconciler, Stats};
pub use render::{Backend, RenderState, Rule, RuleTable};
pub use rules::{markup_rules, Markup};
pub use tree::{Kind, NodeData, NodeId, Tree};

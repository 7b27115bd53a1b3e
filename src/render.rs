//! The rendering collaborator: container mutation ([`Backend`]) plus per-[`Kind`] capability triples ([`Rule`]).

use crate::tree::{Kind, NodeData};
use core::fmt::{self, Debug};
use tracing::warn;

/// Output storage the reconciler drives.
///
/// Handles are cheap to clone, and equality is identity.
pub trait Backend {
	type Output: Clone + PartialEq + Debug;
	type Error: std::error::Error + 'static;

	/// Inserts `child` into `container` directly before `reference`, or at the end if `reference` is [`None`].
	///
	/// If `child` is currently attached anywhere (including elsewhere in `container`), it must be moved rather than duplicated.
	fn insert_before(&mut self, container: &Self::Output, child: &Self::Output, reference: Option<&Self::Output>) -> Result<(), Self::Error>;

	fn remove_child(&mut self, container: &Self::Output, child: &Self::Output) -> Result<(), Self::Error>;

	fn append_child(&mut self, container: &Self::Output, child: &Self::Output) -> Result<(), Self::Error> {
		self.insert_before(container, child, None)
	}
}

/// The materialized part of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderState<O> {
	/// What the parent's container holds.
	pub output: O,
	/// Where the outputs of this node's children are attached.
	///
	/// This is often `output` itself, but may be an auxiliary object, or absent for leaves.
	pub container: Option<O>,
}
impl<O> RenderState<O> {
	pub fn leaf(output: O) -> Self {
		Self { output, container: None }
	}

	pub fn with_container(output: O, container: O) -> Self {
		Self {
			output,
			container: Some(container),
		}
	}
}
impl<O: Clone> RenderState<O> {
	/// `output` is also the container.
	pub fn wrapping(output: O) -> Self {
		Self {
			container: Some(output.clone()),
			output,
		}
	}
}

pub type InitFn<B> = fn(&mut B, &NodeData) -> Result<RenderState<<B as Backend>::Output>, <B as Backend>::Error>;
pub type UpdateFn<B> = fn(&mut B, &NodeData, &RenderState<<B as Backend>::Output>) -> Result<(), <B as Backend>::Error>;

/// The capability triple for one node kind.
pub struct Rule<B: Backend> {
	/// Creates the output (and container). Content is applied separately by `update`.
	pub init: InitFn<B>,
	/// Reflects the content fields in the existing output, without structural changes.
	pub update: UpdateFn<B>,
	/// Called once all children are attached or reconciled.
	pub on_child_updated: UpdateFn<B>,
}
impl<B: Backend> Rule<B> {
	/// A rule that only creates output.
	pub fn new(init: InitFn<B>) -> Self {
		Self {
			init,
			update: ignore::<B>,
			on_child_updated: ignore::<B>,
		}
	}

	#[must_use]
	pub fn with_update(self, update: UpdateFn<B>) -> Self {
		Self { update, ..self }
	}

	#[must_use]
	pub fn with_on_child_updated(self, on_child_updated: UpdateFn<B>) -> Self {
		Self { on_child_updated, ..self }
	}
}
impl<B: Backend> Clone for Rule<B> {
	fn clone(&self) -> Self {
		*self
	}
}
impl<B: Backend> Copy for Rule<B> {}
impl<B: Backend> Debug for Rule<B> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Rule")
			.field("init", &(self.init as *const ()))
			.field("update", &(self.update as *const ()))
			.field("on_child_updated", &(self.on_child_updated as *const ()))
			.finish()
	}
}

fn ignore<B: Backend>(_: &mut B, _: &NodeData, _: &RenderState<B::Output>) -> Result<(), B::Error> {
	Ok(())
}

/// Closed dispatch table from [`Kind`] to [`Rule`].
///
/// Kinds without an entry are rendered through the fallback rule, with a warning each time.
pub struct RuleTable<B: Backend> {
	rules: [Option<Rule<B>>; Kind::COUNT],
	fallback: Rule<B>,
}
impl<B: Backend> RuleTable<B> {
	pub fn new(fallback: Rule<B>) -> Self {
		Self {
			rules: [None; Kind::COUNT],
			fallback,
		}
	}

	pub fn set(&mut self, kind: Kind, rule: Rule<B>) -> &mut Self {
		self.rules[kind.index()] = Some(rule);
		self
	}

	#[must_use]
	pub fn with(mut self, kind: Kind, rule: Rule<B>) -> Self {
		self.set(kind, rule);
		self
	}

	#[must_use]
	pub fn contains(&self, kind: Kind) -> bool {
		self.rules[kind.index()].is_some()
	}

	#[must_use]
	pub fn get(&self, kind: Kind) -> Rule<B> {
		match self.rules[kind.index()] {
			Some(rule) => rule,
			None => {
				warn!("No rule for {} nodes. Rendering them through the fallback.", kind);
				self.fallback
			}
		}
	}
}
impl<B: Backend> Debug for RuleTable<B> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RuleTable")
			.field("kinds", &Kind::ALL.iter().filter(|kind| self.contains(**kind)).collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

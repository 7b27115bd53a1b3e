use crate::tree::NodeId;
use thiserror::Error;

/// Faults escaping [`Reconciler::update`](`crate::Reconciler::update`).
///
/// After any of these, the reconciler is poisoned until [`reset`](`crate::Reconciler::reset`).
#[derive(Error, Debug)]
pub enum Error<E: std::error::Error + 'static> {
	#[error("Rendering backend failed: {0}")]
	Backend(#[from] E),

	/// `diff_update` was reached for a hash-equal pair, which callers must short-circuit.
	#[error("Diff requested for identical nodes (hash {hash:#010x})")]
	IdenticalDiff { hash: u32 },

	#[error("Node {0} has no render state")]
	Unmaterialized(NodeId),

	/// A pooled subtree's shape differs from the placeholder it was reused for, i.e. a hash collision.
	#[error("Reused subtree doesn't match its placeholder (hash {hash:#010x})")]
	ShapeMismatch { hash: u32 },

	#[error("Depth limit ({0}) reached")]
	DepthLimit(usize),

	#[error("Reconciler is poisoned by an earlier failure. Call `reset` first.")]
	Poisoned,
}

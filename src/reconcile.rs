use crate::{
	error::Error,
	hash::{HashCalculator, HashTable},
	pool::ReusePool,
	render::{Backend, RenderState, RuleTable},
	rules::{markup_rules, Markup},
	tree::{Kind, NodeData, NodeId, Tree},
};
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
	/// Maximum tree depth that is created or diffed.
	///
	/// Each level costs one native stack frame, so this bounds recursion rather than validating documents:
	/// An otherwise valid tree nested deeper than this (for example 600 block quotes inside each other)
	/// fails with [`Error::DepthLimit`]. Raise it for such input, along with the thread's stack size if needed.
	pub depth_limit: usize,
}
impl Default for Options {
	fn default() -> Self {
		Self { depth_limit: 512 }
	}
}

/// What one [`Reconciler::update`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
	/// Nodes materialized through their rule's `init` (and `update`).
	pub created: usize,
	/// In-place `update`s of persisting output.
	pub patched: usize,
	/// `on_child_updated` calls on persisting output.
	pub child_updates: usize,
	/// Subtrees kept in place by the leading/trailing sibling match.
	pub retained: usize,
	/// Subtrees spliced in from the reuse pool.
	pub reused: usize,
	/// Destructive replacements.
	pub replaced: usize,
	/// Subtrees pushed into the reuse pool.
	pub pooled: usize,
	/// Outputs inserted into a persisting container.
	pub inserted: usize,
	/// Outputs removed from a persisting container.
	pub removed: usize,
}

/// A tree with its fingerprints and (once materialized) per-node render state.
#[derive(Debug)]
struct Materialized<O> {
	tree: Tree,
	hashes: HashTable,
	states: Vec<Option<RenderState<O>>>,
}
impl<O> Materialized<O> {
	fn new(tree: Tree) -> Self {
		let hashes = HashCalculator::compute(&tree);
		let states = (0..tree.capacity()).map(|_| None).collect();
		Self { tree, hashes, states }
	}

	/// Stands in for the previous tree on the first update. Nothing in it is hashed or materialized.
	fn empty() -> Self {
		Self { tree: Tree::new(Kind::Document), hashes: HashTable::default(), states: Vec::new() }
	}

	fn root_hash(&self) -> u32 {
		self.hashes.hash(self.tree.root())
	}

	fn state(&self, id: NodeId) -> Option<&RenderState<O>> {
		self.states.get(id.index()).and_then(Option::as_ref)
	}
}

/// Owns one materialized tree and incrementally re-renders it.
///
/// # Correct Use
///
/// Updates must be serialized: this type is single-threaded and not reentrant,
/// so rules must not call back into the [`Reconciler`] that invoked them.
/// Independent trees need one instance each.
#[derive(Debug)]
pub struct Reconciler<B: Backend> {
	backend: B,
	rules: RuleTable<B>,
	options: Options,
	retained: Option<Materialized<B::Output>>,
	pool: ReusePool,
	stats: Stats,
	poisoned: bool,
	/// The previous root output after a failed update, kept for [`Reconciler::reset`].
	stranded: Option<B::Output>,
}
impl<B: Markup> Reconciler<B> {
	/// A reconciler using [`markup_rules`].
	#[must_use]
	pub fn markup(backend: B) -> Self {
		Self::new(backend, markup_rules())
	}
}
impl<B: Backend> Reconciler<B> {
	#[must_use]
	pub fn new(backend: B, rules: RuleTable<B>) -> Self {
		Self::with_options(backend, rules, Options::default())
	}

	#[must_use]
	pub fn with_options(backend: B, rules: RuleTable<B>, options: Options) -> Self {
		Self {
			backend,
			rules,
			options,
			retained: None,
			pool: ReusePool::new(),
			stats: Stats::default(),
			poisoned: false,
			stranded: None,
		}
	}

	/// Renders `tree`, reusing as much of the previously rendered tree's output as possible,
	/// and returns the root output.
	///
	/// The root output only changes on the first call and when the root itself is replaced destructively.
	/// Placing it is up to the caller.
	///
	/// # Errors
	///
	/// Backend failures and internal faults are passed through. After any error, the reconciler is poisoned:
	/// Its output may be partially wired, and further updates fail with [`Error::Poisoned`] until [`reset`](`Reconciler::reset`).
	#[instrument(skip(self, tree))]
	pub fn update(&mut self, tree: Tree) -> Result<B::Output, Error<B::Error>> {
		if self.poisoned {
			return Err(Error::Poisoned);
		}

		self.stats = Stats::default();
		let mut next = Materialized::new(tree);
		let prev_output = self.output().cloned();
		let result = match self.retained.take() {
			None => {
				let span = trace_span!("Creating initial tree");
				let _enter = span.enter();
				let root = next.tree.root();
				let mut nothing = Materialized::empty();
				let created = self.pass(&mut nothing, &mut next).create(root, 0, true);
				created.map(|()| next)
			}

			Some(prev) if prev.root_hash() == next.root_hash() => {
				trace!("Root hashes match ({:#010x}). Keeping the retained tree.", prev.root_hash());
				Ok(prev)
			}

			Some(mut prev) => {
				let span = trace_span!("Diffing retained tree", prev = prev.root_hash(), next = next.root_hash());
				let _enter = span.enter();
				let (prev_root, next_root) = (prev.tree.root(), next.tree.root());
				let diffed = self.pass(&mut prev, &mut next).diff_update(prev_root, next_root, None, 0);
				if STATIC_MAX_LEVEL >= Level::TRACE {
					let dropped = prev.states.iter().filter(|state| state.is_some()).count();
					trace!("Dropping {} unused render state(s) of the previous tree.", dropped);
				}
				diffed.map(|()| next)
			}
		};

		let discarded = self.pool.clear();
		trace!("Cleared {} unused pool entries.", discarded);

		let result = result.and_then(|retained| {
			let root = retained.tree.root();
			let output = retained.state(root).map(|state| state.output.clone()).ok_or(Error::Unmaterialized(root))?;
			Ok((output, retained))
		});
		match result {
			Ok((output, retained)) => {
				self.retained = Some(retained);
				info!("Reconciliation stats: {:?}", self.stats);
				Ok(output)
			}
			Err(error) => {
				error!("Reconciliation failed: {}", error);
				self.poisoned = true;
				self.stranded = prev_output;
				Err(error)
			}
		}
	}

	/// Forgets the retained tree (and any poisoning), returning its root output so the caller can detach it.
	/// After a failed update, that is the root output from before the failure.
	pub fn reset(&mut self) -> Option<B::Output> {
		self.poisoned = false;
		self.pool.clear();
		self.stats = Stats::default();
		let stranded = self.stranded.take();
		self.retained
			.take()
			.and_then(|retained| retained.state(retained.tree.root()).map(|state| state.output.clone()))
			.or(stranded)
	}

	#[must_use]
	pub fn is_poisoned(&self) -> bool {
		self.poisoned
	}

	/// The root output of the retained tree.
	#[must_use]
	pub fn output(&self) -> Option<&B::Output> {
		let retained = self.retained.as_ref()?;
		retained.state(retained.tree.root()).map(|state| &state.output)
	}

	/// The retained tree. After a no-op update this is the earlier, equal tree, so its [`NodeId`]s stay valid.
	#[must_use]
	pub fn tree(&self) -> Option<&Tree> {
		self.retained.as_ref().map(|retained| &retained.tree)
	}

	#[must_use]
	pub fn hashes(&self) -> Option<&HashTable> {
		self.retained.as_ref().map(|retained| &retained.hashes)
	}

	#[must_use]
	pub fn render_state(&self, id: NodeId) -> Option<&RenderState<B::Output>> {
		self.retained.as_ref()?.state(id)
	}

	/// Number of nodes waiting in the reuse pool. Always 0 between updates.
	#[must_use]
	pub fn pooled(&self) -> usize {
		self.pool.len()
	}

	#[must_use]
	pub fn last_stats(&self) -> Stats {
		self.stats
	}

	#[must_use]
	pub fn options(&self) -> Options {
		self.options
	}

	#[must_use]
	pub fn rules(&self) -> &RuleTable<B> {
		&self.rules
	}

	#[must_use]
	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// Mutating outputs owned by the retained tree through this makes later diffs unreliable.
	pub fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	#[must_use]
	pub fn into_backend(self) -> B {
		self.backend
	}

	fn pass<'a>(&'a mut self, prev: &'a mut Materialized<B::Output>, next: &'a mut Materialized<B::Output>) -> Pass<'a, B> {
		debug_assert!(self.pool.is_empty(), "Reuse pool carried entries across passes");
		Pass {
			backend: &mut self.backend,
			rules: &self.rules,
			pool: &mut self.pool,
			stats: &mut self.stats,
			depth_limit: self.options.depth_limit,
			prev,
			next,
		}
	}
}

/// Whether an attribute change can't be patched in place.
fn is_destructive(prev: &NodeData, next: &NodeData) -> bool {
	prev.kind != next.kind
		|| (prev.kind == Kind::List && prev.list_data().map(|list| list.list_type) != next.list_data().map(|list| list.list_type))
		|| (prev.kind == Kind::Header && prev.level != next.level)
}

/// Moves the render states of `prev`'s subtree at `from` onto the hash-equal subtree of `next` at `to`.
fn transplant<O, E: std::error::Error + 'static>(prev: &mut Materialized<O>, from: NodeId, next: &mut Materialized<O>, to: NodeId) -> Result<(), Error<E>> {
	let mut stack = vec![(from, to)];
	while let Some((from, to)) = stack.pop() {
		let state = prev.states[from.index()].take().ok_or(Error::Unmaterialized(from))?;
		next.states[to.index()] = Some(state);

		let mut from_children = prev.tree.children(from);
		let mut to_children = next.tree.children(to);
		loop {
			match (from_children.next(), to_children.next()) {
				(Some(from), Some(to)) => stack.push((from, to)),
				(None, None) => break,
				_ => return Err(Error::ShapeMismatch { hash: next.hashes.hash(to) }),
			}
		}
	}
	Ok(())
}

/// One reconciliation pass from `prev` to `next`. Render state moves from the former to the latter.
struct Pass<'a, B: Backend> {
	backend: &'a mut B,
	rules: &'a RuleTable<B>,
	pool: &'a mut ReusePool,
	stats: &'a mut Stats,
	depth_limit: usize,
	prev: &'a mut Materialized<B::Output>,
	next: &'a mut Materialized<B::Output>,
}
impl<'a, B: Backend> Pass<'a, B> {
	/// Materializes `node` top-down. With `reuse`, children may be spliced in from the pool.
	fn create(&mut self, node: NodeId, depth: usize, reuse: bool) -> Result<(), Error<B::Error>> {
		if depth >= self.depth_limit {
			return Err(Error::DepthLimit(self.depth_limit));
		}

		let data = self.next.tree.data(node);
		#[cfg(feature = "dangerous-logging")]
		let span = trace_span!("Creating", kind = %data.kind, %node, literal = ?data.literal);
		#[cfg(not(feature = "dangerous-logging"))]
		let span = trace_span!("Creating", kind = %data.kind, %node);
		let _enter = span.enter();

		let rule = self.rules.get(data.kind);
		let state = (rule.init)(self.backend, data)?;
		(rule.update)(self.backend, data, &state)?;
		self.stats.created += 1;
		let container = state.container.clone();
		self.next.states[node.index()] = Some(state);

		let mut child = self.next.tree.first_child(node);
		while let Some(current) = child {
			child = self.next.tree.next(current);
			let output = self.reuse_or_create(current, depth + 1, reuse)?;
			match &container {
				Some(container) => self.backend.append_child(container, &output)?,
				None => error!("{} node {} has children but no container. They stay detached.", self.next.tree.kind(node), node),
			}
		}

		let data = self.next.tree.data(node);
		let state = self.next.state(node).ok_or(Error::Unmaterialized(node))?;
		(rule.on_child_updated)(self.backend, data, state)?;
		Ok(())
	}

	/// Splices a pooled hash-equal subtree in place of `node` if there is one, and creates `node` otherwise.
	fn reuse_or_create(&mut self, node: NodeId, depth: usize, reuse: bool) -> Result<B::Output, Error<B::Error>> {
		if reuse {
			let hash = self.next.hashes.hash(node);
			if let Some(pooled) = self.pool.take(&self.prev.tree, &self.prev.hashes, hash) {
				trace!("Reusing {} for {} ({:#010x}).", pooled, node, hash);
				transplant::<_, B::Error>(self.prev, pooled, self.next, node)?;
				self.stats.reused += 1;
				return self.output(node);
			}
		}

		self.create(node, depth, reuse)?;
		self.output(node)
	}

	/// Patches `prev`'s output to match `next`, or replaces it if the change is destructive.
	///
	/// `prev` and `next` must differ in [`hash`](`crate::hash::NodeHashes::hash`).
	/// `container` is the parent's container, if any.
	fn diff_update(&mut self, prev: NodeId, next: NodeId, container: Option<&B::Output>, depth: usize) -> Result<(), Error<B::Error>> {
		if depth >= self.depth_limit {
			return Err(Error::DepthLimit(self.depth_limit));
		}

		let (prev_hashes, next_hashes) = (self.prev.hashes[prev], self.next.hashes[next]);
		let span = trace_span!("Diffing", kind = %self.next.tree.kind(next), %prev, %next);
		let _enter = span.enter();

		if prev_hashes.hash == next_hashes.hash {
			error!("Diffing identical nodes. Callers must short-circuit on equal hashes.");
			return Err(Error::IdenticalDiff { hash: next_hashes.hash });
		}

		if prev_hashes.attr != next_hashes.attr && is_destructive(self.prev.tree.data(prev), self.next.tree.data(next)) {
			trace!("Destructive change. Replacing the subtree.");
			let output = self.prev_output(prev)?;
			if let Some(container) = container {
				self.backend.remove_child(container, &output)?;
				self.stats.removed += 1;
			}
			self.pool.push(&self.prev.tree, &self.prev.hashes, prev);
			self.stats.pooled += 1;
			self.stats.replaced += 1;
			return self.create(next, depth, false);
		}

		let state = self.prev.states[prev.index()].take().ok_or(Error::Unmaterialized(prev))?;
		let rule = self.rules.get(self.next.tree.kind(next));
		if prev_hashes.attr != next_hashes.attr {
			trace!("Patching attributes.");
			(rule.update)(self.backend, self.next.tree.data(next), &state)?;
			self.stats.patched += 1;
		}
		self.next.states[next.index()] = Some(state);

		self.diff_children(prev, next, depth)?;

		if prev_hashes.children != next_hashes.children {
			let state = self.next.state(next).ok_or(Error::Unmaterialized(next))?;
			(rule.on_child_updated)(self.backend, self.next.tree.data(next), state)?;
			self.stats.child_updates += 1;
		}
		Ok(())
	}

	/// Aligns the child lists of `prev` and `next`: common suffix, then common prefix,
	/// then a positional diff of the first pair of the remaining middle ranges.
	#[allow(clippy::similar_names)]
	fn diff_children(&mut self, prev: NodeId, next: NodeId, depth: usize) -> Result<(), Error<B::Error>> {
		let container = self.next.state(next).and_then(|state| state.container.clone());
		let container = container.as_ref();

		// Trailing match.
		let (mut c1r, mut c2r) = (self.prev.tree.last_child(prev), self.next.tree.last_child(next));
		while let (Some(a), Some(b)) = (c1r, c2r) {
			if self.prev.hashes.hash(a) != self.next.hashes.hash(b) {
				break;
			}
			c1r = self.prev.tree.prev(a);
			c2r = self.next.tree.prev(b);
			self.retain(a, b)?;
		}

		// Exclusive ends of the unmatched ranges.
		let end1 = match c1r {
			Some(a) => self.prev.tree.next(a),
			None => self.prev.tree.first_child(prev),
		};
		let end2 = match c2r {
			Some(b) => self.next.tree.next(b),
			None => self.next.tree.first_child(next),
		};

		// Leading match.
		let (mut c1l, mut c2l) = (self.prev.tree.first_child(prev), self.next.tree.first_child(next));
		while c1l != end1 && c2l != end2 {
			let (a, b) = match (c1l, c2l) {
				(Some(a), Some(b)) => (a, b),
				_ => break,
			};
			if self.prev.hashes.hash(a) != self.next.hashes.hash(b) {
				break;
			}
			c1l = self.prev.tree.next(a);
			c2l = self.next.tree.next(b);
			self.retain(a, b)?;
		}

		let anchor = match end2 {
			Some(b) => Some(self.output(b)?),
			None => None,
		};
		let anchor = anchor.as_ref();

		match (c1l.filter(|_| c1l != end1), c2l.filter(|_| c2l != end2)) {
			(Some(a), Some(b)) => {
				let span = trace_span!("Diffing middle range", first_prev = %a, first_next = %b);
				let _enter = span.enter();

				let mut removed = match end1 {
					Some(end1) => self.prev.tree.prev(end1),
					None => self.prev.tree.last_child(prev),
				};
				while let Some(current) = removed.filter(|&current| current != a) {
					removed = self.prev.tree.prev(current);
					self.remove(container, next, current)?;
				}

				let before = self.prev_output(a)?;
				self.diff_update(a, b, container, depth + 1)?;
				let after = self.output(b)?;
				if after != before {
					self.insert(container, next, &after, anchor)?;
				}

				let mut inserted = self.next.tree.next(b);
				while let Some(current) = inserted.filter(|_| inserted != end2) {
					inserted = self.next.tree.next(current);
					let output = self.reuse_or_create(current, depth + 1, true)?;
					self.insert(container, next, &output, anchor)?;
				}
			}

			(a, b) => {
				let mut inserted = b;
				while let Some(current) = inserted.filter(|_| inserted != end2) {
					inserted = self.next.tree.next(current);
					let output = self.reuse_or_create(current, depth + 1, true)?;
					self.insert(container, next, &output, anchor)?;
				}

				let mut removed = a;
				while let Some(current) = removed.filter(|_| removed != end1) {
					removed = self.prev.tree.next(current);
					self.remove(container, next, current)?;
				}
			}
		}
		Ok(())
	}

	/// Keeps a hash-equal sibling in place. Its output already sits in the right spot.
	fn retain(&mut self, prev: NodeId, next: NodeId) -> Result<(), Error<B::Error>> {
		trace!("Retaining {} as {}.", prev, next);
		transplant::<_, B::Error>(self.prev, prev, self.next, next)?;
		self.stats.retained += 1;
		Ok(())
	}

	/// Detaches `node` of the previous tree from `container` and pools its subtree.
	fn remove(&mut self, container: Option<&B::Output>, parent: NodeId, node: NodeId) -> Result<(), Error<B::Error>> {
		let output = self.prev_output(node)?;
		match container {
			Some(container) => {
				self.backend.remove_child(container, &output)?;
				self.stats.removed += 1;
			}
			None => error!("{} node {} has no container to remove {} from.", self.next.tree.kind(parent), parent, node),
		}
		self.pool.push(&self.prev.tree, &self.prev.hashes, node);
		self.stats.pooled += 1;
		Ok(())
	}

	fn insert(&mut self, container: Option<&B::Output>, parent: NodeId, output: &B::Output, anchor: Option<&B::Output>) -> Result<(), Error<B::Error>> {
		match container {
			Some(container) => {
				self.backend.insert_before(container, output, anchor)?;
				self.stats.inserted += 1;
			}
			None => error!("{} node {} has children but no container. They stay detached.", self.next.tree.kind(parent), parent),
		}
		Ok(())
	}

	fn output(&self, node: NodeId) -> Result<B::Output, Error<B::Error>> {
		self.next.state(node).map(|state| state.output.clone()).ok_or(Error::Unmaterialized(node))
	}

	fn prev_output(&self, node: NodeId) -> Result<B::Output, Error<B::Error>> {
		self.prev.state(node).map(|state| state.output.clone()).ok_or(Error::Unmaterialized(node))
	}
}

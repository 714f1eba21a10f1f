//! Incremental tuple collections with stable / recent / to-add compartments.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use tracing::trace;

use crate::context::Context;
use crate::gallop::gallop;
use crate::relation::Relation;
use crate::tuple::Tuple;

/// A monotonically growing set of tuples, staged for semi-naive evaluation.
///
/// The tuples live in three compartments:
///
/// - `stable`: batches already seen by every rule body in earlier rounds,
///   kept as a short list of geometrically growing relations;
/// - `recent`: the tuples discovered in the previous round, the ones rule
///   bodies must re-examine this round;
/// - `to_add`: relations produced by the current round, not yet visible.
///
/// [`Variable::changed`] advances the state: `recent` retires into
/// `stable`, and `to_add` is collapsed, filtered against everything in
/// `stable`, and becomes the next `recent`. A fixed point is reached when
/// that filter leaves nothing.
///
/// Handles are cheap clones sharing the same compartments, so a variable
/// can be registered with an [`Iteration`](crate::Iteration) and still be
/// fed and drained by the host.
pub struct Variable<T: Tuple> {
    pub(crate) name: String,
    pub(crate) ctx: Context,
    stable: Arc<RwLock<Vec<Relation<T>>>>,
    recent: Arc<RwLock<Relation<T>>>,
    to_add: Arc<Mutex<Vec<Relation<T>>>>,
}

impl<T: Tuple> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            ctx: self.ctx.clone(),
            stable: Arc::clone(&self.stable),
            recent: Arc::clone(&self.recent),
            to_add: Arc::clone(&self.to_add),
        }
    }
}

fn read<C>(lock: &RwLock<C>) -> RwLockReadGuard<'_, C> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<C>(lock: &RwLock<C>) -> std::sync::RwLockWriteGuard<'_, C> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn guard<C>(lock: &Mutex<C>) -> MutexGuard<'_, C> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Tuple> Variable<T> {
    /// Create a variable bound to a context. Most callers go through
    /// [`Iteration::variable`](crate::Iteration::variable) instead, which
    /// also registers the variable for lock-step advancement.
    pub fn new(ctx: &Context, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ctx: ctx.clone(),
            stable: Arc::new(RwLock::new(Vec::new())),
            recent: Arc::new(RwLock::new(Relation::empty())),
            to_add: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The name given at creation, used in trace output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage an already-built relation for the next round.
    pub fn insert_relation(&self, relation: Relation<T>) {
        guard(&self.to_add).push(relation);
    }

    /// Stage a sequence of tuples for the next round.
    pub fn insert(&self, tuples: impl IntoIterator<Item = T>) {
        let relation = Relation::from_vec(&self.ctx, tuples.into_iter().collect());
        self.insert_relation(relation);
    }

    /// Advance the compartments by one round.
    ///
    /// Retires `recent` into `stable`, merging trailing stable batches
    /// whose length is at most twice the candidate's so the batch list
    /// stays geometric. Then collapses `to_add` into one relation and
    /// drops every tuple already present in some stable batch, galloping
    /// along each batch while walking the candidate once. What survives
    /// becomes the new `recent`.
    ///
    /// Returns true iff the new `recent` is non-empty, i.e. iff rule
    /// bodies still have unprocessed tuples to look at.
    pub fn changed(&self) -> bool {
        let mut stable = write(&self.stable);
        let mut recent = write(&self.recent);
        let mut to_add = guard(&self.to_add);

        if !recent.is_empty() {
            let mut batch = std::mem::replace(&mut *recent, Relation::empty());
            while stable
                .last()
                .is_some_and(|last| last.len() <= 2 * batch.len())
            {
                if let Some(last) = stable.pop() {
                    batch = last.merge_ctx(batch, &self.ctx);
                }
            }
            stable.push(batch);
        }

        if !to_add.is_empty() {
            let mut candidate = to_add
                .drain(..)
                .fold(Relation::empty(), |acc, rel| acc.merge_ctx(rel, &self.ctx));
            for batch in stable.iter() {
                let mut cursor: &[T] = batch;
                candidate.elements.retain(|tuple| {
                    cursor = gallop(cursor, |seen| seen < tuple);
                    cursor.first().map_or(true, |seen| seen != tuple)
                });
            }
            *recent = candidate;
        }

        trace!(
            name = %self.name,
            stable_batches = stable.len(),
            recent = recent.len(),
            "variable advanced"
        );
        !recent.is_empty()
    }

    /// Total tuples across all compartments.
    ///
    /// An upper bound on the set size: `to_add` may still hold tuples that
    /// a stable batch already contains. Exact once the variable has
    /// stabilized (empty `recent` and `to_add`).
    pub fn total_len(&self) -> usize {
        let stable: usize = read(&self.stable).iter().map(Relation::len).sum();
        let recent = read(&self.recent).len();
        let to_add: usize = guard(&self.to_add).iter().map(Relation::len).sum();
        stable + recent + to_add
    }

    /// Drain every compartment into a single relation: the variable's
    /// final value. The variable is left empty.
    pub fn complete(self) -> Relation<T> {
        let mut stable = write(&self.stable);
        let mut recent = write(&self.recent);
        let mut to_add = guard(&self.to_add);

        let mut result = stable
            .drain(..)
            .fold(Relation::empty(), |acc, rel| acc.merge_ctx(rel, &self.ctx));
        result = result.merge_ctx(std::mem::replace(&mut *recent, Relation::empty()), &self.ctx);
        to_add
            .drain(..)
            .fold(result, |acc, rel| acc.merge_ctx(rel, &self.ctx))
    }

    /// Read access to the tuples discovered in the previous round.
    ///
    /// This is what rule bodies re-examine; the built-in operators read it
    /// through the same guard. Holding the guard across a call to
    /// [`Variable::changed`] on the same variable will deadlock.
    pub fn recent(&self) -> RwLockReadGuard<'_, Relation<T>> {
        read(&self.recent)
    }

    /// Read access to the stable batches, each sorted and deduplicated,
    /// pairwise disjoint, in decreasing-size order.
    pub fn stable(&self) -> RwLockReadGuard<'_, Vec<Relation<T>>> {
        read(&self.stable)
    }
}

impl<T: Tuple> std::fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("total_len", &self.total_len())
            .finish()
    }
}

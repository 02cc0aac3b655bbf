//! Two-phase optimistic mutations over a shared list.
//!
//! A mutation is applied to the local list immediately and returns a
//! [`Mutation`] token holding the pre-mutation snapshot. Once the server
//! answers, the token is either confirmed (the local change stands) or
//! compensated (the snapshot is restored exactly). Every optimistic change in
//! the crate goes through this type.
//!
//! Items live behind `Arc<Vec<T>>`: a snapshot is a reference-count bump and
//! the first write after it copies the vector (`Arc::make_mut`).

use std::sync::Arc;

/// A local list whose edits can be rolled back.
#[derive(Debug, Clone)]
pub struct OptimisticList<T> {
    items: Arc<Vec<T>>,
    generation: u64,
}

/// Pending optimistic change. Must be handed back to
/// [`OptimisticList::confirm`] or [`OptimisticList::compensate`].
#[must_use = "a pending mutation must be confirmed or compensated"]
#[derive(Debug)]
pub struct Mutation<T> {
    snapshot: Arc<Vec<T>>,
    generation: u64,
    label: &'static str,
}

impl<T> Mutation<T> {
    /// The list as it was before this mutation was applied.
    pub fn snapshot(&self) -> &[T] {
        &self.snapshot
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<T> Default for OptimisticList<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            generation: 0,
        }
    }
}

impl<T: Clone> OptimisticList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Shared handle to the current items (O(1)).
    pub fn shared(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.items)
    }

    /// Counter bumped by every change; lets callers detect interleaving.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Install authoritative server state.
    pub fn replace(&mut self, items: Vec<T>) {
        self.replace_shared(Arc::new(items));
    }

    pub fn replace_shared(&mut self, items: Arc<Vec<T>>) {
        self.items = items;
        self.generation += 1;
    }

    /// Edit in place without keeping a snapshot. Used for changes that are
    /// already authoritative, such as swapping a placeholder for the server's
    /// record after confirmation.
    pub fn edit<F: FnOnce(&mut Vec<T>)>(&mut self, f: F) {
        f(Arc::make_mut(&mut self.items));
        self.generation += 1;
    }

    /// Apply `f` locally and return the token that can undo it.
    pub fn apply<F: FnOnce(&mut Vec<T>)>(&mut self, label: &'static str, f: F) -> Mutation<T> {
        let snapshot = Arc::clone(&self.items);
        f(Arc::make_mut(&mut self.items));
        self.generation += 1;
        tracing::trace!(mutation = label, generation = self.generation, "Applied optimistic change");
        Mutation {
            snapshot,
            generation: self.generation,
            label,
        }
    }

    /// The server accepted the change; drop the snapshot.
    pub fn confirm(&mut self, mutation: Mutation<T>) {
        tracing::trace!(mutation = mutation.label, "Optimistic change confirmed");
    }

    /// The server rejected the change; restore the pre-mutation list.
    ///
    /// Changes applied after this mutation are discarded as well. Overlapping
    /// requests are not sequenced, so the last response to arrive wins.
    pub fn compensate(&mut self, mutation: Mutation<T>) {
        if self.generation != mutation.generation {
            tracing::warn!(
                mutation = mutation.label,
                expected = mutation.generation,
                current = self.generation,
                "Rolling back over later local changes"
            );
        } else {
            tracing::debug!(mutation = mutation.label, "Rolling back optimistic change");
        }
        self.items = mutation.snapshot;
        self.generation += 1;
    }
}

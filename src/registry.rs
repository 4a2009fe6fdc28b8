//! Concurrent probe registry.
//!
//! Live probes form a newest-first chain of reference-counted nodes. The
//! head pointer sits behind a readers-writer lock: writers serialize on it
//! to publish or unlink, readers hold it only long enough to clone the head
//! reference and then traverse the chain with no lock at all. A node's
//! `next` link is written once, before publication, and never again, so a
//! traversal always sees fully constructed entries.
//!
//! Reclamation is deferred through the per-node reference count: `teardown`
//! unlinks the whole chain in one head swap, and each unlinked node is
//! freed only when the last traversal reference to it drops.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::RwLock;

use crate::entry::ProbeEntry;
use crate::hook::HookOps;

struct ProbeNode {
    entry: ProbeEntry,
    next: Option<Arc<ProbeNode>>,
}

impl Drop for ProbeNode {
    fn drop(&mut self) {
        // Dismantle the tail iteratively; recursing through a long chain
        // of nested drops would exhaust the stack.
        let mut next = self.next.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut sole) => next = sole.next.take(),
                // Some traversal still references the tail; its final
                // drop continues the dismantling from there.
                Err(_) => break,
            }
        }
    }
}

/// Position of one live entry within the registry chain.
///
/// Holding a position pins that entry (and the chain behind it) in memory
/// until the position is dropped; the registry's contents are unaffected.
#[derive(Clone)]
pub struct ProbeRef {
    node: Arc<ProbeNode>,
}

impl ProbeRef {
    /// The entry at this position.
    pub fn entry(&self) -> &ProbeEntry {
        &self.node.entry
    }

    /// The next (older) entry in the chain, if any.
    pub fn next(&self) -> Option<ProbeRef> {
        self.node.next.as_ref().map(|node| ProbeRef {
            node: Arc::clone(node),
        })
    }
}

impl core::fmt::Debug for ProbeRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProbeRef")
            .field("entry", &self.node.entry)
            .finish()
    }
}

/// Visitor verdict for [`ProbeRegistry::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Stop,
}

/// The concurrent collection of installed probes.
pub struct ProbeRegistry {
    head: RwLock<Option<Arc<ProbeNode>>>,
    count: AtomicUsize,
}

impl ProbeRegistry {
    pub const fn new() -> Self {
        Self {
            head: RwLock::new(None),
            count: AtomicUsize::new(0),
        }
    }

    /// Publish `entry` at the head of the chain.
    ///
    /// The node is fully built before the head swap, so a concurrent
    /// traversal sees either the old chain or the new one, never a
    /// half-linked node. Returns the position of the new entry.
    pub fn insert(&self, entry: ProbeEntry) -> ProbeRef {
        let mut head = self.head.write();
        let node = Arc::new(ProbeNode {
            entry,
            next: head.take(),
        });
        *head = Some(Arc::clone(&node));
        drop(head);

        self.count.fetch_add(1, Ordering::Relaxed);
        ProbeRef { node }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the newest entry, if any.
    ///
    /// The returned reference keeps that entry and everything behind it
    /// alive for the caller's traversal, independent of later unlinks.
    pub fn head_ref(&self) -> Option<ProbeRef> {
        self.head
            .read()
            .as_ref()
            .map(|node| ProbeRef {
                node: Arc::clone(node),
            })
    }

    /// Iterate the current contents, newest first.
    pub fn iter(&self) -> Iter {
        Iter {
            next: self.head_ref(),
        }
    }

    /// Iterate strictly after `pos`.
    ///
    /// `pos` itself is never re-visited. Entries inserted after `pos` was
    /// recorded sit ahead of it in the chain and are not visited either.
    pub fn iter_after(&self, pos: &ProbeRef) -> Iter {
        Iter { next: pos.next() }
    }

    /// Walk entries, newest first, until `visit` asks to stop.
    ///
    /// `from` selects the continuation point: `None` starts at the current
    /// head, `Some(pos)` resumes strictly after `pos`.
    pub fn for_each<F>(&self, from: Option<&ProbeRef>, mut visit: F)
    where
        F: FnMut(&ProbeRef) -> Walk,
    {
        let iter = match from {
            Some(pos) => self.iter_after(pos),
            None => self.iter(),
        };
        for pos in iter {
            if visit(&pos) == Walk::Stop {
                break;
            }
        }
    }

    /// Unlink every entry and uninstall its hook.
    ///
    /// The unlink is a single head swap; entries stay valid for traversals
    /// already holding references and are reclaimed as those references
    /// drop. Does not wait for in-flight traversals. Idempotent. Returns
    /// the number of entries torn down.
    pub fn teardown(&self, hooks: &dyn HookOps) -> usize {
        let taken = self.head.write().take();

        let mut torn = 0usize;
        let mut cursor = taken.as_ref().map(Arc::clone);
        while let Some(node) = cursor {
            if let Some(handle) = node.entry.hook() {
                hooks.uninstall(handle);
            }
            torn += 1;
            cursor = node.next.as_ref().map(Arc::clone);
        }
        self.count.fetch_sub(torn, Ordering::Relaxed);

        if torn > 0 {
            info!("registry: tore down {} probe(s)", torn);
        }
        torn
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Chain iterator handed out by [`ProbeRegistry::iter`].
pub struct Iter {
    next: Option<ProbeRef>,
}

impl Iterator for Iter {
    type Item = ProbeRef;

    fn next(&mut self) -> Option<ProbeRef> {
        let current = self.next.take()?;
        self.next = current.next();
        Some(current)
    }
}

//! Tree algorithms over the outline forest.
//!
//! Every function here takes the root-level items as a slice and walks
//! the forest through [`ListNode`] handles. None of them hold a lock across
//! calls, so callers must serialize structural changes themselves (the
//! sync client does this with its session guard).
//!
//! Parent lookup is a linear walk. Outlines are small enough that keeping
//! a parent index in sync with optimistic edits is not worth it.

use std::collections::{HashMap, VecDeque};

use flowlist_sync_types::{ListId, ListNode};
use thiserror::Error;

/// Errors from tree algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Reconciliation produced a tree that does not match the server's.
    ///
    /// This is an internal bug; the operation that triggered it is aborted.
    #[error("reconciled tree does not match the canonical tree")]
    ReconciliationMismatch,
}

/// Visit every item level by level, roots first.
///
/// `visit` returning `true` stops the walk. Returns the number of items
/// visited, including the one that stopped it.
pub fn breadth_first_search<F>(roots: &[ListNode], mut visit: F) -> usize
where
    F: FnMut(&ListNode) -> bool,
{
    let mut queue: VecDeque<ListNode> = roots.iter().cloned().collect();
    let mut visited = 0;

    while let Some(node) = queue.pop_front() {
        visited += 1;
        if visit(&node) {
            break;
        }
        if let Some(children) = node.children() {
            queue.extend(children);
        }
    }

    visited
}

/// Total number of items in the forest.
pub fn count(roots: &[ListNode]) -> usize {
    breadth_first_search(roots, |_| false)
}

/// The item with the given id, anywhere in the forest.
pub fn find_by_id(roots: &[ListNode], id: &ListId) -> Option<ListNode> {
    let mut found = None;
    breadth_first_search(roots, |node| {
        if node.has_id(id) {
            found = Some(node.clone());
            true
        } else {
            false
        }
    });
    found
}

/// Whether an item with the given id exists anywhere in the forest.
pub fn contains(roots: &[ListNode], id: &ListId) -> bool {
    find_by_id(roots, id).is_some()
}

/// Whether the given id names a root-level item.
pub fn is_root(roots: &[ListNode], id: &ListId) -> bool {
    roots.iter().any(|root| root.has_id(id))
}

/// The direct parent of the item with the given id.
///
/// `None` for root-level items and for ids not in the forest.
pub fn find_parent(roots: &[ListNode], id: &ListId) -> Option<ListNode> {
    let mut parent = None;
    breadth_first_search(roots, |node| {
        let is_parent = node
            .children()
            .is_some_and(|children| children.iter().any(|c| c.has_id(id)));
        if is_parent {
            parent = Some(node.clone());
        }
        is_parent
    });
    parent
}

/// Items from a root down to `node`, both inclusive.
///
/// The walk follows parents until none is found, so an item that is not in
/// the forest yields just `[node]`.
pub fn ancestry_path(roots: &[ListNode], node: &ListNode) -> Vec<ListNode> {
    let mut path = vec![node.clone()];
    let mut current = node.id();
    while let Some(parent) = find_parent(roots, &current) {
        current = parent.id();
        path.push(parent);
    }
    path.reverse();
    path
}

/// Merge a freshly fetched canonical forest into the one held locally.
///
/// Items whose id already exists in `previous` keep their node object and
/// take the canonical values; unknown ids use the canonical node; items
/// missing from `canonical` are dropped. Handles given out before the call
/// therefore stay valid and observe the new values.
///
/// The merge is first run on deep copies of both forests and checked for
/// value equality against `canonical`. Only when that passes is it applied
/// to the real handles, so on error no item has been touched.
pub fn reconcile(
    previous: &[ListNode],
    canonical: &[ListNode],
) -> Result<Vec<ListNode>, TreeError> {
    let expected = deep_copy(canonical);

    let trial = merge_level(&index_by_id(&deep_copy(previous)), &deep_copy(canonical));
    if trial != expected {
        return Err(TreeError::ReconciliationMismatch);
    }

    Ok(merge_level(&index_by_id(previous), canonical))
}

fn deep_copy(roots: &[ListNode]) -> Vec<ListNode> {
    roots.iter().map(ListNode::snapshot).collect()
}

fn index_by_id(roots: &[ListNode]) -> HashMap<ListId, ListNode> {
    let mut index = HashMap::new();
    breadth_first_search(roots, |node| {
        index.insert(node.id(), node.clone());
        false
    });
    index
}

fn merge_level(index: &HashMap<ListId, ListNode>, canonical: &[ListNode]) -> Vec<ListNode> {
    canonical
        .iter()
        .map(|fresh| {
            let node = match index.get(&fresh.id()) {
                Some(existing) => {
                    existing.copy_from(fresh);
                    existing.clone()
                }
                None => fresh.clone(),
            };
            if let Some(children) = node.children() {
                node.set_children(Some(merge_level(index, &children)));
            }
            node
        })
        .collect()
}

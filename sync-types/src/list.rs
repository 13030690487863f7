//! List items.
//!
//! A [`ListNode`] is a shared handle onto one item of the outline. Cloning
//! the handle does not copy the item: every clone observes the same fields,
//! so a handle given out before a refresh still reads current values after
//! the tree has been reconciled against the server.
//!
//! Equality (`==`) compares values recursively. Use [`ListNode::ptr_eq`] to
//! ask whether two handles refer to the same item object.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ListId;

/// Field values of one list item, using the backend's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListData {
    /// Item identifier.
    pub id: ListId,
    /// Item text.
    #[serde(rename = "nm", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Note attached to the item.
    #[serde(rename = "no", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion time (account-relative seconds); present iff complete.
    #[serde(rename = "cp", default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    /// Last modification time (account-relative seconds).
    #[serde(rename = "lm", default)]
    pub last_modified: i64,
    /// Child items in display order. `None` means no children are present,
    /// which is distinct from an empty list.
    #[serde(rename = "ch", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ListNode>>,
}

impl ListData {
    /// Data for an item with only an id set.
    pub fn new(id: ListId) -> Self {
        Self {
            id,
            name: None,
            description: None,
            completed_at: None,
            last_modified: 0,
            children: None,
        }
    }
}

/// Shared handle onto one list item.
#[derive(Clone)]
pub struct ListNode {
    inner: Arc<RwLock<ListData>>,
}

impl ListNode {
    /// Wrap item data in a new node.
    pub fn new(data: ListData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    /// A locally fabricated item standing in for a create that the server
    /// has not confirmed yet.
    pub fn proxy(
        id: ListId,
        name: Option<String>,
        description: Option<String>,
        last_modified: i64,
    ) -> Self {
        Self::new(ListData {
            id,
            name,
            description,
            completed_at: None,
            last_modified,
            children: None,
        })
    }

    // A panic while a guard was held cannot leave ListData half-written
    // (every write is a plain field assignment), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, ListData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether two handles refer to the same item object.
    pub fn ptr_eq(a: &ListNode, b: &ListNode) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// The item id.
    pub fn id(&self) -> ListId {
        self.read().id.clone()
    }

    /// Check the id without cloning it.
    pub fn has_id(&self, id: &ListId) -> bool {
        self.read().id == *id
    }

    /// The item text.
    pub fn name(&self) -> Option<String> {
        self.read().name.clone()
    }

    /// The note attached to the item.
    pub fn description(&self) -> Option<String> {
        self.read().description.clone()
    }

    /// Completion time, if complete.
    pub fn completed_at(&self) -> Option<i64> {
        self.read().completed_at
    }

    /// Whether the item is complete.
    pub fn is_complete(&self) -> bool {
        self.read().completed_at.is_some()
    }

    /// Last modification time.
    pub fn last_modified(&self) -> i64 {
        self.read().last_modified
    }

    /// Handles onto the children, in order.
    pub fn children(&self) -> Option<Vec<ListNode>> {
        self.read().children.clone()
    }

    /// The child at `index`, if there is one.
    pub fn child(&self, index: usize) -> Option<ListNode> {
        self.read()
            .children
            .as_ref()
            .and_then(|ch| ch.get(index).cloned())
    }

    /// Number of children (0 when none are present).
    pub fn child_count(&self) -> usize {
        self.read().children.as_ref().map_or(0, Vec::len)
    }

    /// A copy of the field values. Children are shared, not copied.
    pub fn data(&self) -> ListData {
        self.read().clone()
    }

    /// Deep value copy with fresh node objects throughout.
    pub fn snapshot(&self) -> ListNode {
        let data = self.data();
        ListNode::new(ListData {
            children: data
                .children
                .map(|ch| ch.iter().map(ListNode::snapshot).collect()),
            ..data
        })
    }

    /// Replace the item text.
    pub fn set_name(&self, name: Option<String>) {
        self.write().name = name;
    }

    /// Replace the note.
    pub fn set_description(&self, description: Option<String>) {
        self.write().description = description;
    }

    /// Set or clear the completion time.
    pub fn set_completed_at(&self, completed_at: Option<i64>) {
        self.write().completed_at = completed_at;
    }

    /// Set the last modification time.
    pub fn set_last_modified(&self, last_modified: i64) {
        self.write().last_modified = last_modified;
    }

    /// Replace the children.
    pub fn set_children(&self, children: Option<Vec<ListNode>>) {
        self.write().children = children;
    }

    /// Mutate the children collection in place.
    pub fn with_children_mut<R>(&self, f: impl FnOnce(&mut Option<Vec<ListNode>>) -> R) -> R {
        f(&mut self.write().children)
    }

    /// Copy every field except the id from `other` into this item.
    ///
    /// Children handles are taken over as-is.
    pub fn copy_from(&self, other: &ListNode) {
        if Self::ptr_eq(self, other) {
            return;
        }
        let source = other.data();
        let mut target = self.write();
        target.name = source.name;
        target.description = source.description;
        target.completed_at = source.completed_at;
        target.last_modified = source.last_modified;
        target.children = source.children;
    }
}

impl From<ListData> for ListNode {
    fn from(data: ListData) -> Self {
        Self::new(data)
    }
}

impl PartialEq for ListNode {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || *self.read() == *other.read()
    }
}

impl fmt::Debug for ListNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read().fmt(f)
    }
}

impl Serialize for ListNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ListNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ListData::deserialize(deserializer).map(ListNode::new)
    }
}

//! Ordered output record with an insertion-point stack.

use crate::OutputId;
use quill_error::{StoryError, StoryErrorKind};
use tracing::{debug, trace};

/// An entry that can live in an [`OutputList`].
pub trait Indexed {
    /// Stable identity of the entry.
    fn id(&self) -> OutputId;

    /// Position assigned by the list, if stored.
    fn index(&self) -> Option<usize>;

    /// Called by the list whenever the entry's position changes.
    fn set_index(&mut self, index: Option<usize>);
}

/// The story's ordered record of emitted outputs.
///
/// Every stored entry's index equals its position. Pushing an insertion
/// point redirects subsequent additions to that position; each addition
/// advances the cursor so siblings land in emission order.
///
/// # Examples
///
/// ```
/// use quill_core::{Indexed, OutputId, OutputList};
///
/// #[derive(Debug)]
/// struct Line { id: OutputId, index: Option<usize> }
///
/// impl Indexed for Line {
///     fn id(&self) -> OutputId { self.id }
///     fn index(&self) -> Option<usize> { self.index }
///     fn set_index(&mut self, index: Option<usize>) { self.index = index; }
/// }
///
/// let line = || Line { id: OutputId::next(), index: None };
/// let mut list = OutputList::new();
/// list.add(line());
/// list.add(line());
///
/// list.push_insertion_point(1).unwrap();
/// let inserted = list.add(line());
/// assert_eq!(inserted, 1);
/// assert_eq!(list.get(2).and_then(|l| l.index()), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct OutputList<T> {
    items: Vec<T>,
    insertion_points: Vec<usize>,
}

impl<T> Default for OutputList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            insertion_points: Vec::new(),
        }
    }
}

impl<T: Indexed> OutputList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry and returns the position it was stored at.
    ///
    /// Appends when no insertion point is active; otherwise inserts at the
    /// top cursor, re-indexes everything after it and advances every cursor
    /// at or past the insertion position.
    pub fn add(&mut self, mut item: T) -> usize {
        let Some(&position) = self.insertion_points.last() else {
            let position = self.items.len();
            item.set_index(Some(position));
            self.items.push(item);
            trace!(position, "Appended output");
            return position;
        };

        item.set_index(Some(position));
        self.items.insert(position, item);
        self.reindex_from(position + 1);
        for cursor in self.insertion_points.iter_mut() {
            if *cursor >= position {
                *cursor += 1;
            }
        }
        trace!(position, "Inserted output at insertion point");
        position
    }

    /// Removes the entry with the given id, re-indexing the remainder.
    pub fn remove(&mut self, id: OutputId) -> Option<T> {
        let position = self.position(id)?;
        let mut removed = self.items.remove(position);
        removed.set_index(None);
        self.reindex_from(position);
        for cursor in self.insertion_points.iter_mut() {
            if *cursor > position {
                *cursor -= 1;
            }
        }
        debug!(%id, position, "Removed output");
        Some(removed)
    }

    /// Redirects subsequent additions to `index`.
    ///
    /// # Errors
    ///
    /// Returns `InsertionPointOutOfRange` if `index` is past the end of the list.
    pub fn push_insertion_point(&mut self, index: usize) -> Result<(), StoryError> {
        if index > self.items.len() {
            return Err(StoryError::new(StoryErrorKind::InsertionPointOutOfRange {
                index,
                len: self.items.len(),
            }));
        }
        self.insertion_points.push(index);
        debug!(index, depth = self.insertion_points.len(), "Pushed insertion point");
        Ok(())
    }

    /// Removes the top insertion point and returns its final cursor.
    ///
    /// # Errors
    ///
    /// Returns `InsertionStackEmpty` if no insertion point is active.
    pub fn pop_insertion_point(&mut self) -> Result<usize, StoryError> {
        let cursor = self
            .insertion_points
            .pop()
            .ok_or_else(|| StoryError::new(StoryErrorKind::InsertionStackEmpty))?;
        debug!(cursor, depth = self.insertion_points.len(), "Popped insertion point");
        Ok(cursor)
    }

    /// Current top cursor, if any.
    pub fn insertion_point(&self) -> Option<usize> {
        self.insertion_points.last().copied()
    }

    /// Number of active insertion points.
    pub fn insertion_depth(&self) -> usize {
        self.insertion_points.len()
    }

    /// Position of the entry with the given id.
    pub fn position(&self, id: OutputId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Entry with the given id.
    pub fn find(&self, id: OutputId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Entries as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every entry and insertion point.
    pub fn clear(&mut self) {
        self.items.clear();
        self.insertion_points.clear();
    }

    /// Drops only the insertion points.
    pub fn clear_insertion_points(&mut self) {
        self.insertion_points.clear();
    }

    fn reindex_from(&mut self, start: usize) {
        for (position, item) in self.items.iter_mut().enumerate().skip(start) {
            item.set_index(Some(position));
        }
    }
}

impl<'a, T> IntoIterator for &'a OutputList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

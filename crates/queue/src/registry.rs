//! Ordered store of queued entries, keyed by [`EntryId`].
//!
//! Every mutation targets one entry by id and touches only the fields it
//! owns, so an executor's progress update can never clobber a thumbnail
//! attached in the meantime. Updates for ids that are gone are no-ops.

use tracing::trace;

use crate::types::{EntryId, EntryStatus, FileEntry};

/// Progress shown while a transfer is still running. 100 is reserved for
/// completed entries.
const MAX_IN_FLIGHT_PROGRESS: u8 = 99;

#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: Vec<FileEntry>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, keeping selection order.
    pub fn push(&mut self, entry: FileEntry) {
        self.entries.push(entry);
    }

    pub fn get(&self, id: EntryId) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_status(&self, status: EntryStatus) -> bool {
        self.entries.iter().any(|e| e.status() == status)
    }

    /// Entries currently `Pending`, in queue order.
    pub fn pending(&self) -> Vec<&FileEntry> {
        self.entries
            .iter()
            .filter(|e| e.status() == EntryStatus::Pending)
            .collect()
    }

    fn get_mut(&mut self, id: EntryId) -> Option<&mut FileEntry> {
        self.entries.iter_mut().find(|e| e.id() == id)
    }

    fn transition(&mut self, id: EntryId, next: EntryStatus) -> bool {
        let Some(entry) = self.get_mut(id) else {
            trace!(entry = %id, ?next, "transition for absent entry ignored");
            return false;
        };
        if !entry.status().can_transition_to(next) {
            trace!(entry = %id, from = ?entry.status(), ?next, "illegal transition ignored");
            return false;
        }
        entry.set_status(next);
        true
    }

    /// `Pending -> Uploading`.
    pub fn mark_uploading(&mut self, id: EntryId) -> bool {
        self.transition(id, EntryStatus::Uploading)
    }

    /// Records transfer progress for an uploading entry.
    ///
    /// Progress never goes backwards and is held at 99 until the entry
    /// completes. Returns the stored value, or `None` if nothing applied.
    pub fn apply_progress(&mut self, id: EntryId, percent: u8) -> Option<u8> {
        let entry = self.get_mut(id)?;
        if entry.status() != EntryStatus::Uploading {
            return None;
        }
        let next = percent.min(MAX_IN_FLIGHT_PROGRESS).max(entry.progress());
        entry.set_progress(next);
        Some(next)
    }

    /// `Uploading -> Completed`, progress 100.
    pub fn mark_completed(&mut self, id: EntryId) -> bool {
        if !self.transition(id, EntryStatus::Completed) {
            return false;
        }
        if let Some(entry) = self.get_mut(id) {
            entry.set_progress(100);
        }
        true
    }

    /// `Pending | Uploading -> Error`. Progress stays where it stopped.
    pub fn mark_failed(&mut self, id: EntryId) -> bool {
        self.transition(id, EntryStatus::Error)
    }

    /// Attaches a preview. Returns `false` if the entry is gone.
    pub fn attach_thumbnail(&mut self, id: EntryId, thumbnail: String) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.set_thumbnail(thumbnail);
                true
            }
            None => false,
        }
    }

    /// Removes an entry whatever its status.
    pub fn remove(&mut self, id: EntryId) -> Option<FileEntry> {
        let index = self.entries.iter().position(|e| e.id() == id)?;
        Some(self.entries.remove(index))
    }

    /// Removes every `Completed` entry, keeping the rest in order.
    /// Returns the ids removed.
    pub fn clear_completed(&mut self) -> Vec<EntryId> {
        let mut removed = Vec::new();
        self.entries.retain(|e| {
            let done = e.status() == EntryStatus::Completed;
            if done {
                removed.push(e.id());
            }
            !done
        });
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileflow_transfer::RawFile;

    fn entry(name: &str, size: u64) -> FileEntry {
        FileEntry::new(RawFile::declared(name, size, "application/octet-stream"))
    }

    fn registry_with(names: &[&str]) -> (EntryRegistry, Vec<EntryId>) {
        let mut reg = EntryRegistry::new();
        let mut ids = Vec::new();
        for name in names {
            let e = entry(name, 10);
            ids.push(e.id());
            reg.push(e);
        }
        (reg, ids)
    }

    #[test]
    fn preserves_insertion_order() {
        let (reg, ids) = registry_with(&["a", "b", "c"]);
        let order: Vec<EntryId> = reg.iter().map(|e| e.id()).collect();
        assert_eq!(order, ids);
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.pending().len(), 3);
    }

    #[test]
    fn lifecycle_to_completed() {
        let (mut reg, ids) = registry_with(&["a"]);
        let id = ids[0];

        assert!(reg.mark_uploading(id));
        assert_eq!(reg.apply_progress(id, 40), Some(40));
        assert!(reg.mark_completed(id));

        let e = reg.get(id).unwrap();
        assert_eq!(e.status(), EntryStatus::Completed);
        assert_eq!(e.progress(), 100);
    }

    #[test]
    fn progress_holds_below_hundred_until_completed() {
        let (mut reg, ids) = registry_with(&["a"]);
        let id = ids[0];
        reg.mark_uploading(id);

        assert_eq!(reg.apply_progress(id, 100), Some(99));
        assert_eq!(reg.get(id).unwrap().status(), EntryStatus::Uploading);
    }

    #[test]
    fn progress_never_regresses() {
        let (mut reg, ids) = registry_with(&["a"]);
        let id = ids[0];
        reg.mark_uploading(id);

        reg.apply_progress(id, 60);
        assert_eq!(reg.apply_progress(id, 30), Some(60));
    }

    #[test]
    fn progress_ignored_unless_uploading() {
        let (mut reg, ids) = registry_with(&["a"]);
        let id = ids[0];
        assert_eq!(reg.apply_progress(id, 50), None);
        assert_eq!(reg.get(id).unwrap().progress(), 0);

        reg.mark_uploading(id);
        reg.mark_failed(id);
        assert_eq!(reg.apply_progress(id, 50), None);
    }

    #[test]
    fn final_states_are_sticky() {
        let (mut reg, ids) = registry_with(&["a", "b"]);
        reg.mark_uploading(ids[0]);
        reg.mark_completed(ids[0]);
        assert!(!reg.mark_failed(ids[0]));
        assert!(!reg.mark_uploading(ids[0]));

        reg.mark_failed(ids[1]);
        assert!(!reg.mark_uploading(ids[1]));
        assert!(!reg.mark_completed(ids[1]));
        assert_eq!(reg.get(ids[1]).unwrap().status(), EntryStatus::Error);
    }

    #[test]
    fn pending_cannot_skip_to_completed() {
        let (mut reg, ids) = registry_with(&["a"]);
        assert!(!reg.mark_completed(ids[0]));
        assert_eq!(reg.get(ids[0]).unwrap().progress(), 0);
    }

    #[test]
    fn updates_to_removed_entry_are_noops() {
        let (mut reg, ids) = registry_with(&["a", "b"]);
        reg.mark_uploading(ids[0]);
        assert!(reg.remove(ids[0]).is_some());

        assert_eq!(reg.apply_progress(ids[0], 50), None);
        assert!(!reg.mark_completed(ids[0]));
        assert!(!reg.attach_thumbnail(ids[0], "data:".into()));
        assert!(reg.remove(ids[0]).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn thumbnail_and_progress_do_not_overwrite_each_other() {
        let (mut reg, ids) = registry_with(&["a"]);
        let id = ids[0];
        reg.mark_uploading(id);
        reg.apply_progress(id, 25);
        reg.attach_thumbnail(id, "data:image/png;base64,AAAA".into());
        reg.apply_progress(id, 50);

        let e = reg.get(id).unwrap();
        assert_eq!(e.progress(), 50);
        assert_eq!(e.thumbnail(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn clear_completed_keeps_others_in_order() {
        let (mut reg, ids) = registry_with(&["done", "failed", "waiting"]);
        reg.mark_uploading(ids[0]);
        reg.mark_completed(ids[0]);
        reg.mark_failed(ids[1]);

        let removed = reg.clear_completed();
        assert_eq!(removed, vec![ids[0]]);

        let left: Vec<(EntryId, EntryStatus)> =
            reg.iter().map(|e| (e.id(), e.status())).collect();
        assert_eq!(
            left,
            vec![
                (ids[1], EntryStatus::Error),
                (ids[2], EntryStatus::Pending)
            ]
        );
    }

    #[test]
    fn has_status_and_clear() {
        let (mut reg, ids) = registry_with(&["a", "b"]);
        assert!(reg.has_status(EntryStatus::Pending));
        assert!(!reg.has_status(EntryStatus::Completed));
        reg.mark_uploading(ids[1]);
        reg.mark_completed(ids[1]);
        assert!(reg.has_status(EntryStatus::Completed));

        reg.clear();
        assert!(reg.is_empty());
    }
}

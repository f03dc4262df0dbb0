//! View store: the in-memory newsletter list the front end renders.
//!
//! Entries are kept head-first (index 0 is shown at the top). The store holds
//! at most one entry per newsletter id. It is owned by a single consumer and
//! mutated only through the router and the feed, so it needs no locking.

use crate::model::{Newsletter, NewsletterDraft};

/// One newsletter in the view, with its local presentation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    pub newsletter: Newsletter,
    /// Arrived live since the last time the view was acknowledged.
    pub fresh: bool,
    /// Local edit in progress; never written into `newsletter` until accepted.
    pub draft: Option<NewsletterDraft>,
}

impl ViewEntry {
    fn new(newsletter: Newsletter, fresh: bool) -> Self {
        Self {
            newsletter,
            fresh,
            draft: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.newsletter.id
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }
}

/// Result of inserting a newsletter at the head of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new entry was added at the front.
    Inserted,
    /// An entry with this id already existed; its fields were refreshed.
    Refreshed,
}

#[derive(Debug, Default, Clone)]
pub struct ViewStore {
    entries: Vec<ViewEntry>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order, newest first.
    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&ViewEntry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    fn get_mut(&mut self, id: i64) -> Option<&mut ViewEntry> {
        self.entries.iter_mut().find(|entry| entry.id() == id)
    }

    /// Inserts `newsletter` at the head, marked fresh.
    ///
    /// An existing entry with the same id keeps its position and edit draft;
    /// only its newsletter fields are replaced.
    pub fn insert_front(&mut self, newsletter: Newsletter) -> Insertion {
        if let Some(entry) = self.get_mut(newsletter.id) {
            entry.newsletter = newsletter;
            entry.fresh = true;
            return Insertion::Refreshed;
        }
        self.entries.insert(0, ViewEntry::new(newsletter, true));
        Insertion::Inserted
    }

    /// Overwrites title and content of an existing entry.
    ///
    /// Returns `false` (and leaves the store untouched) when the id is unknown.
    /// The id and creation timestamp of the entry never change.
    pub fn apply_update(&mut self, newsletter: &Newsletter) -> bool {
        let Some(entry) = self.get_mut(newsletter.id) else {
            return false;
        };
        entry.newsletter.title.clone_from(&newsletter.title);
        entry.newsletter.content.clone_from(&newsletter.content);
        true
    }

    /// Replaces the store with the initial list fetch.
    ///
    /// The service returns newest first, which is also display order; none of
    /// these entries is marked fresh.
    pub fn load_initial(&mut self, newsletters: Vec<Newsletter>) {
        self.entries.clear();
        for newsletter in newsletters {
            if self.get(newsletter.id).is_none() {
                self.entries.push(ViewEntry::new(newsletter, false));
            }
        }
    }

    /// Clears every fresh marker.
    pub fn clear_fresh(&mut self) {
        for entry in &mut self.entries {
            entry.fresh = false;
        }
    }

    /// Starts editing an entry, seeding the draft from its current fields.
    ///
    /// Returns the draft, or `None` for an unknown id. An edit already in
    /// progress is kept as is.
    pub fn begin_edit(&mut self, id: i64) -> Option<&NewsletterDraft> {
        let entry = self.get_mut(id)?;
        if entry.draft.is_none() {
            entry.draft = Some(NewsletterDraft::from(&entry.newsletter));
        }
        entry.draft.as_ref()
    }

    /// Replaces the draft of an entry that is being edited.
    pub fn set_draft(&mut self, id: i64, draft: NewsletterDraft) -> bool {
        match self.get_mut(id) {
            Some(entry) if entry.draft.is_some() => {
                entry.draft = Some(draft);
                true
            }
            _ => false,
        }
    }

    /// Drops the draft, returning the entry to its displayed fields.
    pub fn cancel_edit(&mut self, id: i64) -> bool {
        self.get_mut(id)
            .and_then(|entry| entry.draft.take())
            .is_some()
    }

    /// Removes and returns the draft for submission.
    pub fn take_draft(&mut self, id: i64) -> Option<NewsletterDraft> {
        self.get_mut(id).and_then(|entry| entry.draft.take())
    }
}

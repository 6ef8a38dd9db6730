//! Optimistic persistence of grid changes.
//!
//! The grid applies a [`Change`] locally before anything is saved. A
//! [`TimetableSession`] mirrors that: it applies the change to its copy of
//! the list, sends it to a [`TimetableStore`], and adopts the list the store
//! returns. If the store fails, the copy is rolled back to the snapshot
//! taken before the change and then reloaded from the store on a best-effort
//! basis. All failures are handled the same way.
//!
//! `apply` takes `&mut self`, so a session never has two writes in flight.
//! Writes from different sessions for the same user are not reconciled;
//! the last one wins.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::GridConfig;
use crate::error::{Error, Result};
use crate::item::{validate_list, Change, TimetableItem, UserId};

/// Authoritative per-user storage of timetable items.
///
/// Each user's timetable is one opaque list. A user without a stored
/// timetable has an empty list.
#[async_trait]
pub trait TimetableStore: Send + Sync {
    /// Load a user's items.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn load(&self, user: &UserId) -> Result<Vec<TimetableItem>>;

    /// Apply one change and return the resulting list.
    ///
    /// Adding an item whose id exists replaces it, updating an unknown item
    /// does nothing, deleting filters by id. Stores may assign new ids to
    /// added items.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be saved.
    async fn modify(&self, user: &UserId, change: &Change) -> Result<Vec<TimetableItem>>;

    /// Replace a user's whole list and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be saved.
    async fn replace(&self, user: &UserId, items: &[TimetableItem]) -> Result<Vec<TimetableItem>>;
}

/// One user's timetable, kept in step with a store.
#[derive(Debug)]
pub struct TimetableSession<S> {
    store: S,
    user: UserId,
    items: Vec<TimetableItem>,
    last_error: Option<String>,
}

impl<S: TimetableStore> TimetableSession<S> {
    /// Create a session with an empty list. Call [`refresh`](Self::refresh)
    /// to load the stored items.
    pub fn new(store: S, user: UserId) -> Self {
        Self {
            store,
            user,
            items: Vec::new(),
            last_error: None,
        }
    }

    /// The user this session belongs to.
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// The current item list.
    #[must_use]
    pub fn items(&self) -> &[TimetableItem] {
        &self.items
    }

    /// Message of the last failed write, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reload the list from the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the current list is kept.
    pub async fn refresh(&mut self) -> Result<&[TimetableItem]> {
        self.items = self.store.load(&self.user).await?;
        debug!(user = %self.user, items = self.items.len(), "Loaded timetable");
        Ok(&self.items)
    }

    /// Apply a change locally and persist it.
    ///
    /// # Errors
    ///
    /// Returns the store's error after rolling the list back.
    pub async fn apply(&mut self, change: &Change) -> Result<&[TimetableItem]> {
        let snapshot = self.items.clone();
        change.apply_to(&mut self.items);

        match self.store.modify(&self.user, change).await {
            Ok(items) => {
                debug!(
                    user = %self.user,
                    action = change.action(),
                    id = %change.item_id(),
                    "Saved change"
                );
                self.items = items;
                self.last_error = None;
                Ok(&self.items)
            }
            Err(e) => {
                warn!(
                    user = %self.user,
                    action = change.action(),
                    error = %e,
                    "Failed to save change, rolling back"
                );
                self.items = snapshot;
                self.recover(&e).await;
                Err(e)
            }
        }
    }

    /// Replace the whole list and persist it.
    ///
    /// # Errors
    ///
    /// Returns the store's error after rolling the list back.
    pub async fn replace_all(&mut self, items: Vec<TimetableItem>) -> Result<&[TimetableItem]> {
        let snapshot = std::mem::replace(&mut self.items, items);

        match self.store.replace(&self.user, &self.items).await {
            Ok(items) => {
                debug!(user = %self.user, items = items.len(), "Replaced timetable");
                self.items = items;
                self.last_error = None;
                Ok(&self.items)
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "Failed to replace timetable, rolling back");
                self.items = snapshot;
                self.recover(&e).await;
                Err(e)
            }
        }
    }

    /// Validate a submitted list and make it the user's timetable.
    ///
    /// The list is checked against `grid` before anything changes, so a
    /// rejected list leaves both the session and the store untouched.
    ///
    /// # Errors
    ///
    /// Returns the validation error for a bad list, or the store's error
    /// after rolling the list back.
    pub async fn import(
        &mut self,
        items: Vec<TimetableItem>,
        grid: &GridConfig,
    ) -> Result<&[TimetableItem]> {
        if let Err(e) = validate_list(&items, grid) {
            warn!(user = %self.user, error = %e, "Rejected imported timetable");
            return Err(e);
        }
        self.replace_all(items).await
    }

    async fn recover(&mut self, cause: &Error) {
        self.last_error = Some(cause.to_string());
        match self.store.load(&self.user).await {
            Ok(items) => self.items = items,
            Err(e) => warn!(user = %self.user, error = %e, "Failed to reload timetable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::item::tests::item;
    use crate::item::ItemId;
    use crate::logging::init_test_logging;

    /// In-memory store whose reads and writes can be made to fail.
    #[derive(Debug, Default)]
    struct FakeStore {
        lists: Mutex<HashMap<String, Vec<TimetableItem>>>,
        fail_writes: AtomicBool,
        fail_loads: AtomicBool,
    }

    impl FakeStore {
        fn with(user: &UserId, items: Vec<TimetableItem>) -> Self {
            let store = Self::default();
            store
                .lists
                .lock()
                .unwrap()
                .insert(user.to_string(), items);
            store
        }

        fn stored(&self, user: &UserId) -> Vec<TimetableItem> {
            self.lists
                .lock()
                .unwrap()
                .get(user.as_str())
                .cloned()
                .unwrap_or_default()
        }

        /// Simulate a write from another device.
        fn overwrite(&self, user: &UserId, items: Vec<TimetableItem>) {
            self.lists
                .lock()
                .unwrap()
                .insert(user.to_string(), items);
        }
    }

    #[async_trait]
    impl TimetableStore for FakeStore {
        async fn load(&self, user: &UserId) -> Result<Vec<TimetableItem>> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(Error::store("offline"));
            }
            Ok(self.stored(user))
        }

        async fn modify(&self, user: &UserId, change: &Change) -> Result<Vec<TimetableItem>> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::store("write rejected"));
            }
            let mut items = self.stored(user);
            change.apply_to(&mut items);
            self.overwrite(user, items.clone());
            Ok(items)
        }

        async fn replace(
            &self,
            user: &UserId,
            items: &[TimetableItem],
        ) -> Result<Vec<TimetableItem>> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::store("write rejected"));
            }
            self.overwrite(user, items.to_vec());
            Ok(items.to_vec())
        }
    }

    fn alice() -> UserId {
        UserId::parse("alice").unwrap()
    }

    #[tokio::test]
    async fn test_refresh_loads_items() {
        let store = FakeStore::with(&alice(), vec![item("a", 0, 10, 2)]);
        let mut session = TimetableSession::new(store, alice());
        assert!(session.items().is_empty());

        session.refresh().await.unwrap();
        assert_eq!(session.items().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_unknown_user_is_empty() {
        let mut session = TimetableSession::new(FakeStore::default(), alice());
        assert!(session.refresh().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_persists_change() {
        let mut session = TimetableSession::new(FakeStore::default(), alice());

        session.apply(&Change::Add(item("a", 0, 10, 1))).await.unwrap();
        session.apply(&Change::Update(item("a", 2, 14, 2))).await.unwrap();

        let stored = session.store().stored(&alice());
        assert_eq!(stored, session.items());
        assert_eq!(stored[0].day, 2);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_apply_rolls_back() {
        init_test_logging();
        let store = FakeStore::with(&alice(), vec![item("a", 0, 10, 2)]);
        let mut session = TimetableSession::new(store, alice());
        session.refresh().await.unwrap();

        session.store().fail_writes.store(true, Ordering::SeqCst);
        session.store().fail_loads.store(true, Ordering::SeqCst);

        let err = session
            .apply(&Change::delete(ItemId::new("a")))
            .await
            .unwrap_err();
        assert!(err.is_store_failure());
        assert_eq!(session.items(), &[item("a", 0, 10, 2)]);
        assert_eq!(session.last_error(), Some("timetable store failed: write rejected"));
    }

    #[tokio::test]
    async fn test_failed_apply_refetches_canonical_list() {
        init_test_logging();
        let store = FakeStore::with(&alice(), vec![item("a", 0, 10, 2)]);
        let mut session = TimetableSession::new(store, alice());
        session.refresh().await.unwrap();

        // Another device moved the item meanwhile
        session
            .store()
            .overwrite(&alice(), vec![item("a", 4, 16, 1)]);
        session.store().fail_writes.store(true, Ordering::SeqCst);

        assert!(session.apply(&Change::Add(item("b", 1, 9, 1))).await.is_err());
        assert_eq!(session.items(), &[item("a", 4, 16, 1)]);
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let mut session = TimetableSession::new(FakeStore::default(), alice());

        session.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(session.apply(&Change::Add(item("a", 0, 9, 1))).await.is_err());
        assert!(session.last_error().is_some());
        assert!(session.items().is_empty());

        session.store().fail_writes.store(false, Ordering::SeqCst);
        session.apply(&Change::Add(item("a", 0, 9, 1))).await.unwrap();
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_replace_all() {
        let store = FakeStore::with(&alice(), vec![item("a", 0, 10, 2)]);
        let mut session = TimetableSession::new(store, alice());
        session.refresh().await.unwrap();

        let replacement = vec![item("x", 1, 9, 1), item("y", 1, 10, 1)];
        session.replace_all(replacement.clone()).await.unwrap();
        assert_eq!(session.store().stored(&alice()), replacement);

        session.store().fail_writes.store(true, Ordering::SeqCst);
        assert!(session.replace_all(vec![]).await.is_err());
        assert_eq!(session.items(), replacement.as_slice());
    }

    #[tokio::test]
    async fn test_import_replaces_timetable() {
        let store = FakeStore::with(&alice(), vec![item("a", 0, 10, 2)]);
        let mut session = TimetableSession::new(store, alice());
        session.refresh().await.unwrap();

        let imported = vec![item("x", 0, 10, 1), item("y", 0, 11, 3)];
        session
            .import(imported.clone(), &GridConfig::default())
            .await
            .unwrap();
        assert_eq!(session.items(), imported.as_slice());
        assert_eq!(session.store().stored(&alice()), imported);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_lists() {
        init_test_logging();
        let existing = vec![item("a", 0, 10, 2)];
        let store = FakeStore::with(&alice(), existing.clone());
        let mut session = TimetableSession::new(store, alice());
        session.refresh().await.unwrap();
        let grid = GridConfig::default();

        let overlapping = vec![item("x", 2, 10, 2), item("y", 2, 11, 1)];
        let err = session.import(overlapping, &grid).await.unwrap_err();
        assert!(matches!(err, Error::Overlap { day: 2, .. }));

        let outside = vec![item("x", 0, 17, 2)];
        let err = session.import(outside, &grid).await.unwrap_err();
        assert!(matches!(err, Error::InvalidItem { field: "duration", .. }));

        let huge = vec![item("x", 1, 9, u32::MAX), item("y", 1, 12, 1)];
        let err = session.import(huge, &grid).await.unwrap_err();
        assert!(matches!(err, Error::InvalidItem { field: "duration", .. }));

        assert_eq!(session.items(), existing.as_slice());
        assert_eq!(session.store().stored(&alice()), existing);
        assert!(session.last_error().is_none());
    }
}

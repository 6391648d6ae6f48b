use crate::models::state::PersistedState;
use crate::storage::StateStore;
use log::{debug, error};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Debounce window for state writes; encoder turns arrive far faster than
/// the flash card should see writes.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Shared persisted-state document plus debounced writer.
///
/// Services mutate their slice of the document through [`update`] and the
/// saver schedules one write 500 ms later; every further update within the
/// window replaces the scheduled write. Unknown fields loaded from disk
/// live in the document untouched, so rewrites preserve them.
pub struct StateSaver {
    document: Arc<Mutex<PersistedState>>,
    store: Arc<StateStore>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl StateSaver {
    pub fn new(store: Arc<StateStore>, initial: PersistedState) -> Arc<Self> {
        Arc::new(Self {
            document: Arc::new(Mutex::new(initial)),
            store,
            pending: Mutex::new(None),
        })
    }

    /// Read access to the current document.
    pub fn read<T>(&self, f: impl FnOnce(&PersistedState) -> T) -> T {
        f(&self.document.lock().unwrap())
    }

    /// Mutate the document and (re)schedule the debounced save.
    pub fn update(self: &Arc<Self>, f: impl FnOnce(&mut PersistedState)) {
        f(&mut self.document.lock().unwrap());
        self.schedule();
    }

    fn schedule(self: &Arc<Self>) {
        let mut pending = self.pending.lock().unwrap();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let saver = Arc::clone(self);
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(SAVE_DEBOUNCE).await;
            saver.write_now();
        }));
        debug!("State save scheduled in {:?}", SAVE_DEBOUNCE);
    }

    /// Write immediately; used at shutdown so the debounce window cannot
    /// drop the last mutation.
    pub fn flush(&self) {
        if let Some(previous) = self.pending.lock().unwrap().take() {
            previous.abort();
        }
        self.write_now();
    }

    fn write_now(&self) {
        let snapshot = self.document.lock().unwrap().clone();
        if let Err(e) = self.store.save(&snapshot) {
            error!("State save failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> Arc<StateStore> {
        StateStore::new(std::env::temp_dir().join(format!(
            "led-zone-saver-{}-{}.json",
            name,
            std::process::id()
        )))
    }

    #[tokio::test]
    async fn updates_are_debounced_into_one_write() {
        let store = temp_store("debounce");
        let saver = StateSaver::new(Arc::clone(&store), PersistedState::default());

        for i in 0..10 {
            saver.update(|doc| {
                doc.application.selected_zone_index = i;
            });
        }

        // Before the window elapses nothing is on disk yet.
        assert!(store.load().unwrap().zones.is_empty());
        tokio::time::sleep(SAVE_DEBOUNCE + Duration::from_millis(200)).await;

        let loaded = store.load().unwrap();
        assert_eq!(loaded.application.selected_zone_index, 9);
        let _ = std::fs::remove_file(store.path());
    }

    #[tokio::test]
    async fn flush_writes_immediately() {
        let store = temp_store("flush");
        let saver = StateSaver::new(Arc::clone(&store), PersistedState::default());

        saver.update(|doc| {
            doc.application.edit_mode_on = true;
        });
        saver.flush();

        assert!(store.load().unwrap().application.edit_mode_on);
        let _ = std::fs::remove_file(store.path());
    }
}

use std::{sync::Arc, time::Duration};

use chrono::Local;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    expiry,
    notify::{Notifier, PanelEvent},
    store::{Store, StoreError},
    AppState,
};

/// Periodic sweep task. Each tick removes expired records and fires one
/// revoke notification per removal. A failed cycle is logged and the next
/// tick proceeds; the task only exits on the shutdown signal.
pub async fn run(state: Arc<AppState>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = sweep_once(&state.store, state.notifier.as_ref()) {
                    warn!(error = %err, "sweep cycle failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

/// One sweep cycle under the store lock: load, select markers at or before
/// a single consistent `now`, notify and remove each, persist once.
/// Returns the removed UIDs.
pub fn sweep_once(store: &Store, notifier: &dyn Notifier) -> Result<Vec<String>, StoreError> {
    let now = Local::now().naive_local();
    store.update(|records| {
        let expired: Vec<String> = records
            .iter()
            .filter(|(_, marker)| expiry::is_expired(marker, now))
            .map(|(uid, _)| uid.clone())
            .collect();
        for uid in &expired {
            notifier.notify(PanelEvent::Revoke, uid);
            records.remove(uid);
            info!(uid = %uid, "removed expired uid");
        }
        expired
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tokio::sync::watch;

    use super::*;
    use crate::{
        expiry::Expiry,
        notify::{PanelNotifier, RecordingNotifier},
    };

    #[test]
    fn removes_only_expired_non_permanent_records() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("uid_storage.json")).unwrap();
        store
            .update(|records| {
                records.insert("gone".into(), "2001-01-01 00:00:00".parse().unwrap());
                records.insert("keep".into(), "2999-01-01 00:00:00".parse().unwrap());
                records.insert("forever".into(), Expiry::Permanent);
            })
            .unwrap();

        let notifier = RecordingNotifier::new();
        let removed = sweep_once(&store, &notifier).unwrap();
        assert_eq!(removed, vec!["gone".to_string()]);

        let records = store.load().unwrap();
        assert!(!records.contains_key("gone"));
        assert!(records.contains_key("keep"));
        assert!(records.contains_key("forever"));

        let events = notifier.events.lock().unwrap();
        assert_eq!(*events, vec![(PanelEvent::Revoke, "gone".to_string())]);
    }

    #[test]
    fn empty_store_sweeps_cleanly() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("uid_storage.json")).unwrap();
        let notifier = RecordingNotifier::new();
        assert!(sweep_once(&store, &notifier).unwrap().is_empty());
        assert!(notifier.events.lock().unwrap().is_empty());
    }

    #[test]
    fn cycle_error_surfaces_without_panicking() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("uid_storage.json");
        let store = Store::open(&path).unwrap();
        fs::write(&path, "not json").unwrap();

        let notifier = RecordingNotifier::new();
        assert!(sweep_once(&store, &notifier).is_err());

        // once the file is whole again the next cycle succeeds
        fs::write(&path, "{}").unwrap();
        assert!(sweep_once(&store, &notifier).unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_loop() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("uid_storage.json")).unwrap();
        let state = Arc::new(AppState {
            store,
            notifier: Arc::new(PanelNotifier::new(None, None)),
        });

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run(state, Duration::from_millis(10), rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sweep loop did not stop")
            .unwrap();
    }
}

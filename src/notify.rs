use tracing::{debug, warn};

/// Outward panel events: one provision call per successful add, one revoke
/// call per UID removed by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    Provision,
    Revoke,
}

/// Capability for the outward panel calls. Implementations must not block
/// the caller on network I/O; a notification is never awaited by the store
/// mutation it accompanies.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: PanelEvent, uid: &str);
}

/// Fires GET requests against the configured panel endpoints, passing the
/// UID as a query parameter. Unconfigured endpoints are skipped.
pub struct PanelNotifier {
    client: reqwest::Client,
    add_url: Option<String>,
    remove_url: Option<String>,
}

impl PanelNotifier {
    pub fn new(add_url: Option<String>, remove_url: Option<String>) -> Self {
        PanelNotifier {
            client: reqwest::Client::new(),
            add_url,
            remove_url,
        }
    }
}

impl Notifier for PanelNotifier {
    fn notify(&self, event: PanelEvent, uid: &str) {
        let base = match event {
            PanelEvent::Provision => &self.add_url,
            PanelEvent::Revoke => &self.remove_url,
        };
        let Some(base) = base else {
            debug!(?event, uid, "panel endpoint not configured, skipping");
            return;
        };

        let request = self.client.get(base).query(&[("uid", uid)]);
        let uid = uid.to_string();
        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(?event, uid, "panel notified");
                }
                Ok(response) => {
                    warn!(?event, uid, status = %response.status(), "panel call rejected");
                }
                Err(err) => {
                    warn!(?event, uid, error = %err, "panel call failed");
                }
            }
        });
    }
}

#[cfg(test)]
pub(crate) struct RecordingNotifier {
    pub events: std::sync::Mutex<Vec<(PanelEvent, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, event: PanelEvent, uid: &str) {
        self.events.lock().unwrap().push((event, uid.to_string()));
    }
}

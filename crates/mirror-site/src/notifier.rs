//! Fan-out of generated changes to live consumers.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use mirror_model::Stage;
use tokio::sync::broadcast;

use crate::event::{ChangeNotification, SiteEvent};

/// One-shot flag raised once the initial scan has been generated.
///
/// Clones share the flag.
#[derive(Clone, Default)]
pub struct InitSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl InitSignal {
    pub(crate) fn set(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap() = true;
        condvar.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }

    /// Block until set or `timeout` elapses. Returns whether the flag is set.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let guard = flag.lock().unwrap();
        let (guard, _) = condvar
            .wait_timeout_while(guard, timeout, |set| !*set)
            .unwrap();
        *guard
    }
}

/// Run the `site-notifier` stage until `events` closes.
pub(crate) fn spawn(
    site: String,
    events: mpsc::Receiver<SiteEvent>,
    sender: broadcast::Sender<ChangeNotification>,
    initialized: InitSignal,
) -> io::Result<Stage> {
    Stage::spawn("site-notifier", move || {
        for event in events {
            match event {
                SiteEvent::Initialized => {
                    tracing::info!(site = %site, "site ready");
                    initialized.set();
                }
                SiteEvent::Changed(change) => {
                    tracing::debug!(site = %site, url = %change.url, kind = ?change.kind, "output changed");
                    // No receivers is not an error
                    let _ = sender.send(ChangeNotification {
                        site: site.clone(),
                        url: change.url,
                    });
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SiteChange;
    use mirror_model::{ChangeKind, EntityKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_signal_wait_times_out_until_set() {
        let signal = InitSignal::default();
        assert!(!signal.wait(Duration::from_millis(10)));

        let setter = signal.clone();
        let thread = std::thread::spawn(move || setter.set());
        assert!(signal.wait(Duration::from_secs(5)));
        thread.join().unwrap();
        assert!(signal.is_set());
    }

    #[test]
    fn test_notifier_forwards_changes_and_raises_signal() {
        let (tx, rx) = mpsc::channel();
        let (sender, mut receiver) = broadcast::channel(16);
        let signal = InitSignal::default();
        let stage = spawn("docs".to_owned(), rx, sender, signal.clone()).unwrap();

        tx.send(SiteEvent::Changed(SiteChange {
            kind: ChangeKind::Added,
            entity: EntityKind::Page,
            url: "index.html".to_owned(),
            previous_url: None,
        }))
        .unwrap();
        tx.send(SiteEvent::Initialized).unwrap();
        drop(tx);
        stage.join();

        assert!(signal.is_set());
        let notification = receiver.try_recv().unwrap();
        assert_eq!(
            notification,
            ChangeNotification {
                site: "docs".to_owned(),
                url: "index.html".to_owned(),
            }
        );
        assert_eq!(
            serde_json::to_string(&notification).unwrap(),
            r#"{"site":"docs","url":"index.html"}"#
        );
    }
}

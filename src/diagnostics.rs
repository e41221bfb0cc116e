//! Listener failure reporting.
//!
//! Change listeners run at the end of a write batch while the node holds a
//! downgraded read lock. A panicking listener must not unwind through the
//! lock state machine, so every callback is run behind
//! [`std::panic::catch_unwind`]. Caught failures are logged and also
//! published to every receiver obtained from [`subscribe`], so that test
//! harnesses and tools can surface listener bugs instead of losing them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// A listener callback that panicked during change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// Name of the node whose notification was being delivered
    pub node: String,
    /// Panic payload rendered as text
    pub message: String,
}

static SUBSCRIBERS: Lazy<Mutex<Vec<flume::Sender<ListenerFailure>>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Registers a new receiver for listener failures.
///
/// Receivers only see failures reported after they subscribed. Dropping the
/// receiver unsubscribes it.
#[must_use]
pub fn subscribe() -> flume::Receiver<ListenerFailure> {
    let (tx, rx) = flume::unbounded();
    SUBSCRIBERS.lock().push(tx);
    rx
}

/// Runs `f`, converting a panic into a reported [`ListenerFailure`].
///
/// Returns `false` when `f` panicked.
pub(crate) fn isolate(node: impl FnOnce() -> String, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            report(ListenerFailure {
                node: node(),
                message: panic_message(payload.as_ref()),
            });
            false
        }
    }
}

pub(crate) fn report(failure: ListenerFailure) {
    log::error!(
        "Change listener of node '{}' panicked: {}",
        failure.node,
        failure.message
    );
    let mut subscribers = SUBSCRIBERS.lock();
    subscribers.retain(|tx| tx.send(failure.clone()).is_ok());
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolate_reports_panics() {
        let rx = subscribe();
        let ok = isolate(|| "probe".to_string(), || panic!("listener exploded"));
        assert!(!ok);

        let failure = rx
            .try_iter()
            .find(|f| f.node == "probe")
            .expect("failure should be published");
        assert_eq!(failure.message, "listener exploded");
    }

    #[test]
    fn test_isolate_passes_through_success() {
        let mut ran = false;
        assert!(isolate(|| "quiet".to_string(), || ran = true));
        assert!(ran);
    }
}

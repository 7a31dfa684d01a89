//! Event observer: logs the executor's event stream.

use tokio::sync::mpsc;
use tracing::{info, warn};

use meridian_deploy::Event;

/// Drains the event channel until the executor closes it, logging one line
/// per event.
pub async fn log_events(mut events: mpsc::Receiver<Event>) {
    while let Some(event) = events.recv().await {
        let kind = event.kind.as_str();
        match (&event.error, &event.dependency) {
            (Some(error), _) => {
                warn!(
                    worker = event.worker,
                    event = kind,
                    target = %event.target,
                    error = %error,
                    "deployment event"
                );
            }
            (None, Some(dependency)) => {
                info!(
                    worker = event.worker,
                    event = kind,
                    target = %event.target,
                    dependency = %dependency.target,
                    "deployment event"
                );
            }
            (None, None) => {
                info!(
                    worker = event.worker,
                    event = kind,
                    target = %event.target,
                    "deployment event"
                );
            }
        }
    }
}

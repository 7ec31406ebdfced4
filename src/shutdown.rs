use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

/// Spawns a Ctrl-C watcher and returns the handle it notifies.
///
/// The permit is stored, so a signal arriving while the accept loop is busy
/// is still seen on its next `notified()`. If the signal handler cannot be
/// installed the handle never fires.
pub fn start_shutdown_listener() -> Arc<Notify> {
    let notify = Arc::new(Notify::new());
    let notify_clone = notify.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl C bind error: {}", e);
            return;
        }
        info!("Ctrl+C received");
        notify_clone.notify_one();
    });
    notify
}

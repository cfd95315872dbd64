use tokio::sync::mpsc;
use tracing::{info, warn};

/// One-way events this engine emits. Consumers live outside the discovery
/// path; nothing here feeds back into request handling.
#[derive(Debug, Clone)]
pub enum Event {
    FavoriteSaved { user_id: i64, recipe_id: i64 },
}

/// Fire-and-forget event dispatch over a bounded channel. `enqueue` never
/// blocks and never errors: a full or closed queue is logged and the event
/// dropped, because notification can never fail a save.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Event>,
}

impl Notifier {
    /// Spawn the dispatch worker and return a handle for producers.
    pub fn start(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(dispatch_loop(rx));
        Self { tx }
    }

    pub fn enqueue(&self, event: Event) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("Dropped notification event: {}", e);
        }
    }

    /// A notifier whose events go nowhere.
    #[cfg(test)]
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }
}

async fn dispatch_loop(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match event {
            Event::FavoriteSaved { user_id, recipe_id } => {
                // Delivery itself (mail, push) belongs to an external
                // worker; this engine only hands the event over
                info!(
                    "Dispatching favorite-saved event: user={} recipe={}",
                    user_id, recipe_id
                );
            }
        }
    }
}

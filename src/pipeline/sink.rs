use crate::card::CardResult;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::trace;

/// Callback receiving one outcome per processed frame
pub type ResultHandler = Arc<dyn Fn(Option<CardResult>) + Send + Sync>;

/// Single-consumer result slot.
///
/// The most recently registered handler receives every later outcome. The
/// pipeline worker is the only caller of [`ResultSink::deliver`], so handlers
/// are never invoked concurrently.
#[derive(Default)]
pub struct ResultSink {
    handler: RwLock<Option<ResultHandler>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(Option<CardResult>) + Send + Sync + 'static,
    {
        *self.handler.write() = Some(Arc::new(handler));
    }

    pub fn clear_handler(&self) {
        *self.handler.write() = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    pub(crate) fn deliver(&self, outcome: Option<CardResult>) {
        // Clone out of the lock so a handler may replace itself
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => handler(outcome),
            None => trace!("No result handler registered, discarding outcome"),
        }
    }
}

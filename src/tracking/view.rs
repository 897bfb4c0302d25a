//! Snapshot handed to the rendering surface

use std::sync::Arc;

use tokio::sync::watch;

use super::position::{Coordinate, Viewport};
use super::trail::Trail;

/// Everything the map needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub viewport: Viewport,
    /// Latest device position, or the pinned search result
    pub current_marker: Option<Coordinate>,
    pub trail: Trail,
    pub eta_minutes: Option<i64>,
}

impl SessionView {
    pub fn initial(viewport: Viewport) -> Self {
        Self {
            viewport,
            current_marker: None,
            trail: Trail::empty(),
            eta_minutes: None,
        }
    }
}

/// Single writer, many readers store of the current [`SessionView`].
///
/// Writers always publish a complete new snapshot, readers never observe a
/// half applied update.
#[derive(Debug)]
pub struct ViewStore {
    tx: watch::Sender<Arc<SessionView>>,
}

impl ViewStore {
    pub fn new(initial: SessionView) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));

        Self { tx }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<SessionView> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionView>> {
        self.tx.subscribe()
    }

    /// Derive the next snapshot from the current one and publish it
    pub fn replace<F>(&self, next: F) -> Arc<SessionView>
    where
        F: FnOnce(&SessionView) -> SessionView,
    {
        let mut published = None;
        self.tx.send_modify(|current| {
            let view = Arc::new(next(current));
            published = Some(view.clone());
            *current = view;
        });

        published.unwrap_or_else(|| self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackingError;

    #[tokio::test]
    async fn readers_see_whole_snapshots() -> Result<(), TrackingError> {
        let start = Viewport::new(Coordinate::new(-123.1187, 49.2819)?, 10.0);
        let store = ViewStore::new(SessionView::initial(start));
        let mut rx = store.subscribe();
        let before = store.snapshot();

        let moved = Viewport::new(Coordinate::new(-123.10, 49.30)?, 12.0);
        store.replace(|current| SessionView {
            viewport: moved,
            current_marker: Some(moved.center),
            eta_minutes: Some(4),
            ..current.clone()
        });

        assert!(rx.has_changed().unwrap_or(false));
        let seen = rx.borrow_and_update().clone();
        assert_eq!(moved, seen.viewport);
        assert_eq!(Some(4), seen.eta_minutes);

        // Old handles keep the old snapshot
        assert_eq!(start, before.viewport);
        assert_eq!(None, before.current_marker);

        Ok(())
    }
}

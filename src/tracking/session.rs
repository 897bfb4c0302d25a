//! Tracking session: the poll tick pipeline
//!
//! One tick runs, strictly in this order:
//!
//! 1. session readiness check (not ready ⇒ no-op)
//! 2. trail fetch for `[history start, now)`
//! 3. route/ETA from the latest trail position to the destination
//! 4. notification gate evaluation, publishing on the entering edge
//! 5. a new [`SessionView`] snapshot
//!
//! A failing step ends the tick and leaves the snapshot untouched. A tick
//! that outlives its session never commits, even when it already fired the
//! notification.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::eta::RouteEngine;
use super::gate::{GateDecision, GateState, NotificationGate};
use super::poller::{Liveness, Poller};
use super::position::{Coordinate, Viewport};
use super::resolver::PlaceResolver;
use super::trail::{Trail, TrailBuilder};
use super::view::{SessionView, ViewStore};
use crate::{
    CollaboratorError, Geocoder, NotificationPublisher, PositionsSource, RouteCalculator,
    SessionProvider, TrackingConfig, TrackingError,
};

/// The outside services a session talks to
pub struct Collaborators<S, H, G, R, N> {
    pub session: S,
    pub history: H,
    pub geocoder: G,
    pub routes: R,
    pub publisher: N,
}

/// How a tick ended
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Credentials not ready yet, nothing was fetched
    NotReady,
    /// Another tick was still running
    Skipped,
    /// Session stopped while the tick was in flight, result dropped
    Discarded,
    /// A collaborator failed, the previous snapshot stays
    Failed(TrackingError),
    /// A new snapshot was published
    Committed(Arc<SessionView>),
}

struct Inner<S, H, G, R, N> {
    config: TrackingConfig,
    session: S,
    trails: TrailBuilder<H>,
    routes: RouteEngine<R>,
    resolver: PlaceResolver<G>,
    publisher: N,
    gate: Mutex<NotificationGate>,
    view: ViewStore,
}

impl<S, H, G, R, N> Inner<S, H, G, R, N>
where
    S: SessionProvider,
    H: PositionsSource,
    G: Geocoder,
    R: RouteCalculator,
    N: NotificationPublisher,
{
    /// `Ok(false)` while the credentials are still being provisioned
    async fn ready(&self) -> Result<bool, TrackingError> {
        match self.session.session().await {
            Ok(handle) => {
                debug!(session = %handle.0, "Session ready");
                Ok(true)
            }
            Err(CollaboratorError::Unauthenticated) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_tick(&self, liveness: &Liveness) -> TickOutcome {
        match self.ready().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Session not ready yet, tick is a no-op");
                return TickOutcome::NotReady;
            }
            Err(e) => {
                warn!(error = %e, "Session provider failed");
                return TickOutcome::Failed(e);
            }
        }

        let trail = match self
            .trails
            .fetch_trail(&self.config.device_id, Some(self.config.history_start), None)
            .await
        {
            Ok(trail) => trail,
            Err(e) => return TickOutcome::Failed(e),
        };

        let current = match trail.current() {
            Some(marker) => marker.position,
            None => return self.commit_empty(liveness).await,
        };

        let route = match self
            .routes
            .compute_eta(current, self.config.destination)
            .await
        {
            Ok(route) => route,
            Err(e) => return TickOutcome::Failed(e),
        };

        if !liveness.is_alive() {
            debug!("Session stopped while the tick was in flight, discarding");
            return TickOutcome::Discarded;
        }

        let eta_seconds = route.map(|r| r.duration_seconds);
        let decision = self.gate.lock().await.observe(eta_seconds);
        if decision == GateDecision::Notify {
            self.notify().await;

            // The fire stands, only the view update is dropped
            if !liveness.is_alive() {
                debug!("Session stopped while publishing, discarding");
                return TickOutcome::Discarded;
            }
        }

        let zoom = self.config.tracking_zoom;
        let eta_minutes = route.map(|r| r.eta_minutes());
        let markers = trail.len();
        let view = self.view.replace(move |_| SessionView {
            viewport: Viewport::new(current, zoom),
            current_marker: Some(current),
            trail,
            eta_minutes,
        });

        info!(
            markers,
            longitude = current.longitude(),
            latitude = current.latitude(),
            eta_minutes = ?eta_minutes,
            "Tracking view updated"
        );

        TickOutcome::Committed(view)
    }

    /// No position yet: clear the trail and the ETA, keep the viewport
    async fn commit_empty(&self, liveness: &Liveness) -> TickOutcome {
        if !liveness.is_alive() {
            debug!("Session stopped while the tick was in flight, discarding");
            return TickOutcome::Discarded;
        }

        self.gate.lock().await.observe(None);

        let view = self.view.replace(|current| SessionView {
            viewport: current.viewport,
            current_marker: None,
            trail: Trail::empty(),
            eta_minutes: None,
        });
        info!("Device history is empty, trail cleared");

        TickOutcome::Committed(view)
    }

    /// Publish failures are logged only, the gate stays fired
    async fn notify(&self) {
        let topic = &self.config.notification_topic;
        let message = &self.config.notification_message;

        match self.publisher.publish(topic, message).await {
            Ok(message_id) => {
                info!(
                    topic = %topic,
                    message = %message,
                    message_id = %message_id,
                    "Arrival notification sent"
                )
            }
            Err(e) => {
                error!(
                    topic = %topic,
                    error = %e,
                    "Arrival notification failed, not retrying"
                )
            }
        }
    }
}

/// Live tracking of one device towards a fixed destination
pub struct TrackingSession<S, H, G, R, N> {
    inner: Arc<Inner<S, H, G, R, N>>,
    poller: Poller,
    lifetime: CancellationToken,
}

impl<S, H, G, R, N> TrackingSession<S, H, G, R, N>
where
    S: SessionProvider + 'static,
    H: PositionsSource + 'static,
    G: Geocoder + 'static,
    R: RouteCalculator + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        config: TrackingConfig,
        collaborators: Collaborators<S, H, G, R, N>,
    ) -> Result<Self, TrackingError> {
        config.validate()?;

        let lifetime = CancellationToken::new();
        let poller = Poller::child_of(config.poll_interval(), &lifetime);

        let trails = TrailBuilder::new(collaborators.history, config.tracker_name.clone())
            .history_start(config.history_start);
        let routes = RouteEngine::new(collaborators.routes, config.route_calculator.clone());
        let resolver = PlaceResolver::new(collaborators.geocoder, config.place_index.clone());
        let gate = Mutex::new(NotificationGate::new(config.eta_window));
        let view = ViewStore::new(SessionView::initial(config.initial_viewport));

        let inner = Inner {
            config,
            session: collaborators.session,
            trails,
            routes,
            resolver,
            publisher: collaborators.publisher,
            gate,
            view,
        };

        Ok(Self {
            inner: Arc::new(inner),
            poller,
            lifetime,
        })
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.inner.config
    }

    /// Start polling the device every configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if !self.is_alive() {
            warn!("Session already shut down, not polling");
            return;
        }

        let inner = Arc::clone(&self.inner);
        self.poller.start(move |liveness| {
            let inner = Arc::clone(&inner);
            async move {
                inner.run_tick(&liveness).await;
            }
        });
    }

    /// Stop polling. The session can be started again.
    pub fn stop(&mut self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Tear the session down. In-flight work finishes without committing.
    pub fn shutdown(&mut self) {
        self.poller.stop();
        self.lifetime.cancel();
        info!(device = %self.inner.config.device_id, "Tracking session shut down");
    }

    pub fn is_alive(&self) -> bool {
        !self.lifetime.is_cancelled()
    }

    /// Run one tick right away, unless a tick is already running
    pub async fn track_now(&self) -> TickOutcome {
        let Some(_in_flight) = self.poller.guard().try_enter() else {
            debug!("Tick already running, manual track skipped");
            return TickOutcome::Skipped;
        };

        self.inner
            .run_tick(&Liveness::new(self.lifetime.clone()))
            .await
    }

    /// Centre the map on a place. Returns the place found, if any; without a
    /// match the view is left as it was.
    pub async fn search_place(&self, query: &str) -> Result<Option<Coordinate>, TrackingError> {
        if !self.inner.ready().await? {
            return Err(TrackingError::Unauthenticated);
        }

        let found = self.inner.resolver.resolve(query).await?;

        if let Some(place) = found {
            if !self.is_alive() {
                debug!(query, "Session shut down during the search, discarding");
                return Ok(found);
            }

            let zoom = self.inner.config.search_zoom;
            self.inner.view.replace(|current| SessionView {
                viewport: Viewport::new(place, zoom),
                current_marker: Some(place),
                ..current.clone()
            });
            info!(
                query,
                longitude = place.longitude(),
                latitude = place.latitude(),
                "Map centred on place"
            );
        }

        Ok(found)
    }

    /// Latest snapshot
    pub fn view(&self) -> Arc<SessionView> {
        self.inner.view.snapshot()
    }

    /// Receiver woken on every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionView>> {
        self.inner.view.subscribe()
    }

    pub async fn gate_state(&self) -> GateState {
        self.inner.gate.lock().await.state()
    }
}

impl<S, H, G, R, N> Drop for TrackingSession<S, H, G, R, N> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

//! location2eta - live device tracking with ETA and arrival notification

mod config;
mod error;
pub mod logging;
pub mod sources;
mod tracking;

pub use config::{TrackingConfig, CONFIG_FILE};
pub use error::{CollaboratorError, TrackingError};
pub use sources::{
    FieldsConfiguration, Geocoder, NotificationPublisher, PositionsSource, RouteCalculator,
    RouteLeg, SessionHandle, SessionProvider,
};
pub use tracking::eta::{eta_minutes, RouteEngine, RouteResult};
pub use tracking::gate::{EtaWindow, GateDecision, GateState, NotificationGate};
#[cfg(feature = "gpx")]
pub use tracking::gpx::TrailExport;
pub use tracking::poller::{InFlight, Liveness, Poller, TickGuard, DEFAULT_POLL_INTERVAL_MS};
pub use tracking::position::{Coordinate, DevicePosition, RawPosition, TrailMarker, Viewport};
pub use tracking::resolver::PlaceResolver;
pub use tracking::session::{Collaborators, TickOutcome, TrackingSession};
pub use tracking::trail::{Trail, TrailBuilder, HISTORY_START};
pub use tracking::view::{SessionView, ViewStore};

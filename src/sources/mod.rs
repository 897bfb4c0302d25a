//! Collaborator contracts consumed by the tracking core
//!
//! The core never talks to the network itself. Every outside service is
//! reached through one of these traits and reports failures as a
//! [`CollaboratorError`].

use std::future::Future;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::{CollaboratorError, Coordinate, DevicePosition};

/// Opaque handle proving the credentials are ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle(pub String);

/// Credential/session provider
pub trait SessionProvider: Send + Sync {
    /// Current session, or [`CollaboratorError::Unauthenticated`] while the
    /// credentials are still being provisioned
    fn session(&self) -> impl Future<Output = Result<SessionHandle, CollaboratorError>> + Send;
}

/// Device tracking service
pub trait PositionsSource: Send + Sync {
    /// Positions recorded by the device inside `[since, until)`, in
    /// chronological order
    fn position_history(
        &self,
        tracker: &str,
        device_id: &str,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> impl Future<Output = Result<Vec<DevicePosition>, CollaboratorError>> + Send;
}

/// Geocoding search service
pub trait Geocoder: Send + Sync {
    /// Candidate coordinates for the text, best match first
    fn search_text(
        &self,
        index: &str,
        text: &str,
    ) -> impl Future<Output = Result<Vec<Coordinate>, CollaboratorError>> + Send;
}

/// One leg of a computed route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    pub duration_seconds: f64,
    pub distance_km: Option<f64>,
}

/// Route calculator service
pub trait RouteCalculator: Send + Sync {
    fn calculate_route(
        &self,
        calculator: &str,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<Vec<RouteLeg>, CollaboratorError>> + Send;
}

/// Push notification publisher
pub trait NotificationPublisher: Send + Sync {
    /// Publish the message, returning the delivery message id
    fn publish(
        &self,
        topic: &str,
        message: &str,
    ) -> impl Future<Output = Result<String, CollaboratorError>> + Send;
}

/// Field names used by the record based sources
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldsConfiguration {
    pub device_id: String,
    pub time: String,
    pub coordinates: String,
    pub speed: String,
    pub elevation: String,
    /// Coordinates stored as `lat,lng` instead of `lng,lat`
    pub flip_coordinates: bool,
}

impl Default for FieldsConfiguration {
    fn default() -> Self {
        Self {
            device_id: "device".to_string(),
            time: "time".to_string(),
            coordinates: "coordinates".to_string(),
            speed: "speed".to_string(),
            elevation: "elevation".to_string(),
            flip_coordinates: false,
        }
    }
}

impl FieldsConfiguration {
    pub fn device(mut self, name: &str) -> Self {
        self.device_id = name.to_string();
        self
    }

    pub fn coordinates(mut self, name: &str) -> Self {
        self.coordinates = name.to_string();
        self
    }

    pub fn time(mut self, name: &str) -> Self {
        self.time = name.to_string();
        self
    }

    pub fn flipped(mut self, flip: bool) -> Self {
        self.flip_coordinates = flip;
        self
    }
}

/// Half-open window check shared by the sources
#[cfg(any(feature = "csv", feature = "mongo"))]
pub(crate) fn in_window(time: OffsetDateTime, since: OffsetDateTime, until: OffsetDateTime) -> bool {
    since <= time && time < until
}

#[cfg(feature = "csv")]
mod csv_file;

#[cfg(feature = "csv")]
pub use csv_file::CsvSource;

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::MongoDbSource;

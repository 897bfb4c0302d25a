//! Position and map value objects

use geo::geometry::Point;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::TrackingError;

/// WGS84 coordinate, longitude first like the collaborators send it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    longitude: f64,
    latitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    longitude: f64,
    latitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = TrackingError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.longitude, raw.latitude)
    }
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside [-180,180] x [-90,90]
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, TrackingError> {
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return Err(TrackingError::InvalidCoordinate {
                longitude,
                latitude,
            });
        }

        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Constant coordinates known to be in range
    pub(crate) const fn from_valid(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

impl From<Coordinate> for Point {
    fn from(c: Coordinate) -> Self {
        Point::new(c.longitude, c.latitude)
    }
}

impl TryFrom<Point> for Coordinate {
    type Error = TrackingError;

    fn try_from(p: Point) -> Result<Self, Self::Error> {
        Coordinate::new(p.x(), p.y())
    }
}

/// Map camera. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(center: Coordinate, zoom: f64) -> Self {
        Self { center, zoom }
    }
}

/// Raw version of a recorded position, as the tracking service returns it
#[derive(Debug, Clone, PartialEq)]
pub struct RawPosition {
    pub coordinates: Coordinate,
    pub time: OffsetDateTime,
    pub speed: Option<f64>,
    pub altitude: Option<f64>,
}

impl RawPosition {
    pub fn basic(coordinates: Coordinate, time: OffsetDateTime) -> Self {
        Self {
            coordinates,
            time,
            speed: None,
            altitude: None,
        }
    }
}

/// Position tagged with the device that recorded it
#[derive(Debug, Clone, PartialEq)]
pub struct DevicePosition {
    pub device_id: String,
    pub pos: RawPosition,
}

impl DevicePosition {
    pub fn basic(device_id: String, coordinates: Coordinate, time: OffsetDateTime) -> Self {
        Self {
            device_id,
            pos: RawPosition::basic(coordinates, time),
        }
    }
}

/// One pin of the trail
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailMarker {
    /// 0-based rank inside the fetched batch
    pub sequence_index: usize,
    pub position: Coordinate,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl TrailMarker {
    /// Text drawn on the pin, 1-based
    pub fn label(&self) -> String {
        (self.sequence_index + 1).to_string()
    }
}

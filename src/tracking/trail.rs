//! Trail builder API

use time::macros::datetime;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::position::{DevicePosition, TrailMarker};
use crate::{PositionsSource, TrackingError};

/// Start of the device history when no lower bound is given
pub const HISTORY_START: OffsetDateTime = datetime!(2021-02-02 19:05:07.327 UTC);

/// Ordered device positions, oldest first. Replaced as a whole on every
/// fetch, never appended to.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    markers: Vec<TrailMarker>,
}

impl Trail {
    pub fn empty() -> Self {
        Self { markers: vec![] }
    }

    /// Index the positions in the order they were received
    pub fn from_positions(positions: Vec<DevicePosition>) -> Self {
        let markers = positions
            .into_iter()
            .enumerate()
            .map(|(sequence_index, dpos)| TrailMarker {
                sequence_index,
                position: dpos.pos.coordinates,
                recorded_at: dpos.pos.time,
            })
            .collect();

        Self { markers }
    }

    pub fn markers(&self) -> &[TrailMarker] {
        &self.markers
    }

    /// Most recent known position of the device
    pub fn current(&self) -> Option<&TrailMarker> {
        self.markers.last()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Fetches the device history and shapes it into a [`Trail`]
pub struct TrailBuilder<H> {
    source: H,
    /// Tracker resource name on the tracking service
    tracker: String,
    /// Lower bound used when the caller gives none
    history_start: OffsetDateTime,
}

impl<H> TrailBuilder<H>
where
    H: PositionsSource,
{
    /// Start a new builder instance
    pub fn new(source: H, tracker: String) -> Self {
        Self {
            source,
            tracker,
            history_start: HISTORY_START,
        }
    }

    pub fn history_start(mut self, start: OffsetDateTime) -> Self {
        self.history_start = start;

        self
    }

    /// Fetch the positions inside `[since, until)` and build the trail.
    ///
    /// `since` defaults to the history start and `until` to now. An empty
    /// history is a valid, empty trail.
    pub async fn fetch_trail(
        &self,
        device_id: &str,
        since: Option<OffsetDateTime>,
        until: Option<OffsetDateTime>,
    ) -> Result<Trail, TrackingError> {
        let since = since.unwrap_or(self.history_start);
        let until = until.unwrap_or_else(OffsetDateTime::now_utc);

        let positions = self
            .source
            .position_history(&self.tracker, device_id, since, until)
            .await
            .map_err(|e| {
                warn!(
                    device = device_id,
                    tracker = %self.tracker,
                    error = %e,
                    "Position history fetch failed"
                );
                TrackingError::from(e)
            })?;

        let trail = Trail::from_positions(positions);
        debug!(device = device_id, markers = trail.len(), "Trail fetched");

        Ok(trail)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use time::macros::datetime;
    use time::OffsetDateTime;

    use super::*;
    use crate::{CollaboratorError, Coordinate};

    /// Answers with a fixed batch and remembers the requested window
    struct FixedHistory {
        result: Result<Vec<DevicePosition>, CollaboratorError>,
        windows: Mutex<Vec<(OffsetDateTime, OffsetDateTime)>>,
    }

    impl FixedHistory {
        fn new(result: Result<Vec<DevicePosition>, CollaboratorError>) -> Self {
            Self {
                result,
                windows: Mutex::new(vec![]),
            }
        }
    }

    impl PositionsSource for FixedHistory {
        async fn position_history(
            &self,
            _tracker: &str,
            _device_id: &str,
            since: OffsetDateTime,
            until: OffsetDateTime,
        ) -> Result<Vec<DevicePosition>, CollaboratorError> {
            self.windows.lock().unwrap().push((since, until));
            self.result.clone()
        }
    }

    fn pos(lng: f64, lat: f64, time: OffsetDateTime) -> DevicePosition {
        DevicePosition::basic("dev".to_string(), Coordinate::new(lng, lat).unwrap(), time)
    }

    #[tokio::test]
    async fn indexes_follow_fetch_order() -> Result<(), TrackingError> {
        // Out of chronological order on purpose: the service order wins
        let positions = vec![
            pos(-123.12, 49.28, datetime!(2021-05-24 0:10 UTC)),
            pos(-123.11, 49.29, datetime!(2021-05-24 0:00 UTC)),
            pos(-123.10, 49.30, datetime!(2021-05-24 0:05 UTC)),
        ];
        let builder = TrailBuilder::new(FixedHistory::new(Ok(positions)), "trk".to_string());

        let trail = builder.fetch_trail("dev", None, None).await?;

        let indexes: Vec<usize> = trail.markers().iter().map(|m| m.sequence_index).collect();
        assert_eq!(vec![0, 1, 2], indexes);
        assert_eq!(Coordinate::new(-123.12, 49.28)?, trail.markers()[0].position);
        assert_eq!(
            Some(Coordinate::new(-123.10, 49.30)?),
            trail.current().map(|m| m.position)
        );

        Ok(())
    }

    #[tokio::test]
    async fn empty_history_is_empty_trail() -> Result<(), TrackingError> {
        let builder = TrailBuilder::new(FixedHistory::new(Ok(vec![])), "trk".to_string());

        let trail = builder.fetch_trail("dev", None, None).await?;

        assert!(trail.is_empty());
        assert_eq!(None, trail.current());

        Ok(())
    }

    #[tokio::test]
    async fn default_window() -> Result<(), TrackingError> {
        let source = FixedHistory::new(Ok(vec![]));
        let builder = TrailBuilder::new(source, "trk".to_string());

        let before = OffsetDateTime::now_utc();
        builder.fetch_trail("dev", None, None).await?;
        builder
            .fetch_trail(
                "dev",
                Some(datetime!(2022-01-01 0:00 UTC)),
                Some(datetime!(2022-01-02 0:00 UTC)),
            )
            .await?;

        let windows = builder.source.windows.lock().unwrap().clone();
        assert_eq!(HISTORY_START, windows[0].0);
        assert!(windows[0].1 >= before);
        assert_eq!(
            (datetime!(2022-01-01 0:00 UTC), datetime!(2022-01-02 0:00 UTC)),
            windows[1]
        );

        Ok(())
    }

    #[tokio::test]
    async fn service_failure_is_reported() {
        let builder = TrailBuilder::new(
            FixedHistory::new(Err(CollaboratorError::unavailable("tracking", "503"))),
            "trk".to_string(),
        );

        assert_eq!(
            Err(TrackingError::CollaboratorUnavailable {
                service: "tracking",
                reason: "503".to_string()
            }),
            builder.fetch_trail("dev", None, None).await
        );
    }
}

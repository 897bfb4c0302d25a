//! GPX export of the current trail

use std::collections::BTreeMap;

use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use super::trail::Trail;

/// Seconds covered by one track segment
const SEGMENT_SECONDS: i64 = 300;

pub struct TrailExport {
    /// Device name, number...
    pub device: String,
    /// Route/Track name
    pub name: String,
    /// Data source, eg.: tracker name
    pub source: Option<String>,
}

impl TrailExport {
    pub fn new(device: String, name: String) -> Self {
        Self {
            device,
            name,
            source: None,
        }
    }

    pub fn source(&mut self, source: String) -> &mut Self {
        self.source = Some(source);

        self
    }

    /// Build the track, cut in 5 minute segments
    pub fn track(&self, trail: &Trail) -> Track {
        let mut track = Track::new();
        track.name = Some(self.name.clone());
        track.description = Some(format!("Tracked by `{}`", self.device));
        track.source = self.source.clone();

        let mut markers = trail.markers().to_vec();
        markers.sort_by_key(|m| m.recorded_at);

        let mut segs: BTreeMap<i64, TrackSegment> = BTreeMap::new();

        for marker in markers {
            let ts = marker.recorded_at.unix_timestamp();
            let key = ts - ts.rem_euclid(SEGMENT_SECONDS);

            let tseg = segs.entry(key).or_insert_with(TrackSegment::new);

            let mut wp = Waypoint::new(marker.position.into());
            wp.time = Some(marker.recorded_at.into());
            wp.name = Some(marker.label());

            tseg.points.push(wp);
        }

        track.segments.extend(segs.into_values());

        track
    }

    /// Whole GPX 1.1 document holding the trail
    pub fn document(&self, trail: &Trail) -> Gpx {
        let mut gpx: Gpx = Default::default();
        gpx.version = GpxVersion::Gpx11;
        gpx.creator = Some("location2eta".to_string());
        gpx.tracks = vec![self.track(trail)];

        gpx
    }
}

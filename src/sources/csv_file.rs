//! CSV file source integration
//!
//! Replays a recorded position log as if it were the tracking service.

use std::io::Read;

use csv::{Reader, StringRecord};
use time::format_description::well_known;
use time::OffsetDateTime;
use tracing::debug;

use super::{in_window, FieldsConfiguration, PositionsSource};
use crate::{CollaboratorError, Coordinate, DevicePosition};

/// CSV positions source
pub struct CsvSource {
    positions: Vec<DevicePosition>,
}

impl CsvSource {
    /// Read every row of the file up front
    pub fn new<T>(mut rdr: Reader<T>, fields: Option<FieldsConfiguration>) -> Result<Self, String>
    where
        T: Read,
    {
        let fields = fields.unwrap_or_default();

        let mut header = rdr
            .headers()
            .map_err(|e| format!("Failed on read the header: {}", e))?
            .clone();
        let header_idx = parse_header(&fields, &mut header)?;

        let mut positions = vec![];
        for row in rdr.records() {
            let mut rec = row.map_err(|e| format!("Failed on read some row: {}", e))?;

            if rec.len() < 3 {
                continue;
            }

            let row_pos = parse_row(&header_idx, &fields, &mut rec)
                .map_err(|e| format!("Error with row {:?}: {}", rec, e))?;

            match row_pos {
                Some(dpos) => positions.push(dpos),
                None => debug!(row = ?rec, "Skipping row without usable coordinates"),
            }
        }

        // Tracking services answer in chronological order
        positions.sort_by_key(|p| p.pos.time);

        Ok(Self { positions })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl PositionsSource for CsvSource {
    async fn position_history(
        &self,
        _tracker: &str,
        device_id: &str,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<DevicePosition>, CollaboratorError> {
        Ok(self
            .positions
            .iter()
            .filter(|p| p.device_id == device_id && in_window(p.pos.time, since, until))
            .cloned()
            .collect())
    }
}

/// Field to index map
#[derive(Debug)]
struct FieldsIndex {
    device: usize,
    coordinates: usize,
    time: usize,
    speed: Option<usize>,
    elevation: Option<usize>,
}

fn parse_header(
    fields: &FieldsConfiguration,
    header: &mut StringRecord,
) -> Result<FieldsIndex, String> {
    header.trim();

    let find = |name: &str| header.iter().position(|h| h.to_lowercase() == name);

    let device = find(&fields.device_id).ok_or("Device header not found")?;
    let coordinates = find(&fields.coordinates).ok_or("Coordinates header not found")?;
    let time = find(&fields.time).ok_or("Time header not found")?;

    Ok(FieldsIndex {
        device,
        coordinates,
        time,
        speed: find(&fields.speed),
        elevation: find(&fields.elevation),
    })
}

fn parse_row(
    header: &FieldsIndex,
    fields: &FieldsConfiguration,
    row: &mut StringRecord,
) -> Result<Option<DevicePosition>, String> {
    row.trim();

    let device_id = row
        .get(header.device)
        .ok_or("Device field not found")?
        .to_string();

    let raw_coordinates = row
        .get(header.coordinates)
        .ok_or("Coordinates field not found")?;
    let separator = match raw_coordinates {
        s if s.contains(',') => ",",
        s if s.contains(';') => ";",
        _ => " ",
    };
    let scoordinates: Vec<&str> = raw_coordinates.split(separator).map(|s| s.trim()).collect();
    if scoordinates.len() != 2 {
        return Ok(None);
    }

    let (ilng, ilat) = if fields.flip_coordinates { (1, 0) } else { (0, 1) };

    let (Ok(lat), Ok(lng)) = (
        scoordinates[ilat].parse::<f64>(),
        scoordinates[ilng].parse::<f64>(),
    ) else {
        return Ok(None);
    };

    let Ok(coordinates) = Coordinate::new(lng, lat) else {
        return Ok(None);
    };

    let time = match row.get(header.time) {
        Some(d) => OffsetDateTime::parse(d, &well_known::Rfc3339)
            .map_err(|e| format!("Failed on parse the time: {}", e)),
        None => Err("Time field not found".to_string()),
    }?;

    let mut dpos = DevicePosition::basic(device_id, coordinates, time);

    if let Some(ispeed) = header.speed {
        dpos.pos.speed = row.get(ispeed).and_then(|d| d.parse::<f64>().ok());
    }

    if let Some(ielevation) = header.elevation {
        dpos.pos.altitude = row.get(ielevation).and_then(|d| d.parse::<f64>().ok());
    }

    Ok(Some(dpos))
}

//! Mongodb source integration

use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::Collection;
use time::format_description::well_known;
use time::OffsetDateTime;
use tracing::warn;

use super::{in_window, FieldsConfiguration, PositionsSource};
use crate::{CollaboratorError, Coordinate, DevicePosition};

const SERVICE: &str = "mongodb positions";

/// MongoDB positions source
pub struct MongoDbSource {
    collection: Collection<Document>,
    fields: FieldsConfiguration,
}

impl MongoDbSource {
    pub fn new(collection: Collection<Document>, fields: Option<FieldsConfiguration>) -> Self {
        Self {
            collection,
            fields: fields.unwrap_or_default(),
        }
    }
}

impl PositionsSource for MongoDbSource {
    async fn position_history(
        &self,
        _tracker: &str,
        device_id: &str,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<DevicePosition>, CollaboratorError> {
        // Times may be stored as dates, RFC3339 strings or timestamps, so
        // the window is applied after parsing
        let filter = doc! { self.fields.device_id.clone(): device_id };
        let options = FindOptions::builder()
            .sort(doc! { self.fields.time.clone(): 1 })
            .build();

        let mut cursor = self
            .collection
            .find(filter, options)
            .await
            .map_err(|e| {
                CollaboratorError::unavailable(SERVICE, format!("Failed on fetch the docs: {}", e))
            })?;

        let mut pos = vec![];
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| {
                CollaboratorError::unavailable(SERVICE, format!("Failed on read some doc: {}", e))
            })?
        {
            match parse_doc(&self.fields, &doc) {
                Ok(dpos) if in_window(dpos.pos.time, since, until) => pos.push(dpos),
                Ok(_) => {}
                Err(e) => warn!(doc = %doc, error = %e, "Skipping unreadable position document"),
            }
        }

        pos.sort_by_key(|p| p.pos.time);

        Ok(pos)
    }
}

fn parse_doc(fields: &FieldsConfiguration, doc: &Document) -> Result<DevicePosition, String> {
    let device_id = match doc.get(&fields.device_id) {
        Some(Bson::String(di)) => Ok(di.clone()),
        Some(Bson::Int32(di)) => Ok(di.to_string()),
        Some(Bson::Int64(di)) => Ok(di.to_string()),
        Some(Bson::Double(di)) => Ok(di.to_string()),
        Some(_) => Err("Device field type not supported"),
        None => Err("Device field not found"),
    }?;

    let coordinates = doc
        .get_array(&fields.coordinates)
        .map_err(|e| format!("Failed on access the `coordinates`: {}", e))?;
    if coordinates.len() != 2 {
        return Err("Coordinates size invalid".to_string());
    }

    let (ilng, ilat) = if fields.flip_coordinates { (1, 0) } else { (0, 1) };
    let lat = match coordinates[ilat] {
        Bson::Double(l) => Ok(l),
        _ => Err("Invalid type of latitude".to_string()),
    }?;
    let lng = match coordinates[ilng] {
        Bson::Double(l) => Ok(l),
        _ => Err("Invalid type of longitude".to_string()),
    }?;
    let coordinates = Coordinate::new(lng, lat).map_err(|e| e.to_string())?;

    let time = match doc.get(&fields.time) {
        Some(Bson::String(tm)) => OffsetDateTime::parse(tm, &well_known::Rfc3339)
            .map_err(|e| format!("Failed on parse the time: {}", e)),
        Some(Bson::DateTime(tm)) => Ok(tm.to_time_0_3()),
        Some(Bson::Timestamp(tm)) => OffsetDateTime::from_unix_timestamp(tm.time.into())
            .map_err(|e| format!("Failed on parse the time timestamp: {}", e)),
        Some(_) => Err("Time field type not supported".to_string()),
        None => Err("Time field not found".to_string()),
    }?;

    Ok(DevicePosition::basic(device_id, coordinates, time))
}

#[cfg(test)]
pub mod tests {
    use bson::{doc, DateTime, Document};
    use mongodb::Client;
    use time::macros::datetime;

    use super::{parse_doc, MongoDbSource};
    use crate::{FieldsConfiguration, PositionsSource};

    #[test]
    fn parse_doc_types() -> Result<(), String> {
        let fields = FieldsConfiguration::default();

        let dpos = parse_doc(
            &fields,
            &doc! { "device": 251, "coordinates": [-48.8702222, -26.31832], "time": "2022-02-07T02:13:51Z" },
        )?;
        assert_eq!("251", dpos.device_id);
        assert_eq!(-48.8702222, dpos.pos.coordinates.longitude());
        assert_eq!(datetime!(2022-02-07 2:13:51 UTC), dpos.pos.time);

        assert!(parse_doc(
            &fields,
            &doc! { "device": "AA251", "coordinates": [-48.8702222], "time": "2022-02-07T02:13:51Z" },
        )
        .is_err());

        Ok(())
    }

    async fn collection() -> Result<mongodb::Collection<Document>, String> {
        let client = Client::with_uri_str("mongodb://localhost:27017")
            .await
            .map_err(|e| e.to_string())?;
        let db = client.database("location2eta_tests");
        let collection = db.collection::<Document>("positions");
        collection.drop(None).await.map_err(|e| e.to_string())?;

        Ok(collection)
    }

    #[tokio::test]
    #[ignore = "needs a local mongod"]
    async fn mongo_history() -> Result<(), String> {
        let collection = collection().await?;

        let docs = vec![
            doc! { "device": "AA251", "coordinates": [-48.8902222, -26.31832], "time": DateTime::from_time_0_3(datetime!(2022-02-07 2:13:57 UTC)) },
            doc! { "device": "AA251", "coordinates": [-48.8702222, -26.31832], "time": DateTime::from_time_0_3(datetime!(2022-02-07 2:13:51 UTC)) },
            doc! { "device": "BB100", "coordinates": [-48.8802222, -26.31832], "time": DateTime::from_time_0_3(datetime!(2022-02-07 2:13:55 UTC)) },
            doc! { "device": "AA251", "coordinates": [-48.8802222, -26.31832], "time": "2022-02-07T02:13:53Z" },
            doc! { "device": "AA251", "coordinates": [-48.8602222, -26.31832], "time": "2020-01-01T00:00:00Z" },
        ];
        collection
            .insert_many(docs, None)
            .await
            .map_err(|e| e.to_string())?;

        let source = MongoDbSource::new(collection, None);

        let positions = source
            .position_history(
                "tracker",
                "AA251",
                datetime!(2021-05-24 0:00 UTC),
                datetime!(2023-05-24 0:00 UTC),
            )
            .await
            .map_err(|e| e.to_string())?;
        let times: Vec<_> = positions.iter().map(|p| p.pos.time).collect();
        assert_eq!(
            vec![
                datetime!(2022-02-07 2:13:51 UTC),
                datetime!(2022-02-07 2:13:53 UTC),
                datetime!(2022-02-07 2:13:57 UTC)
            ],
            times
        );

        Ok(())
    }

    #[tokio::test]
    #[ignore = "needs a local mongod"]
    async fn mongo_history_custom_fields() -> Result<(), String> {
        let collection = collection().await?;

        let docs = vec![
            doc! { "dev": "AA251", "coords": [-48.8702222, -26.31832], "dev_time": DateTime::from_time_0_3(datetime!(2022-02-06 1:00 UTC)) },
            doc! { "dev": "AA251", "coords": [-48.8802222, -26.31832], "dev_time": DateTime::from_time_0_3(datetime!(2022-02-06 6:00 UTC)) },
        ];
        collection
            .insert_many(docs, None)
            .await
            .map_err(|e| e.to_string())?;

        let fields = FieldsConfiguration::default()
            .device("dev")
            .coordinates("coords")
            .time("dev_time");
        let source = MongoDbSource::new(collection, Some(fields));

        let positions = source
            .position_history(
                "tracker",
                "AA251",
                datetime!(2022-02-06 0:00 UTC),
                datetime!(2022-02-06 5:00 UTC),
            )
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(1, positions.len());

        Ok(())
    }
}

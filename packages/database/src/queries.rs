//! Location and zip code queries.

use accident_risk_features_models::{LocationRecord, RoadFeatures};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;

const LOCATION_COLUMNS: &str = "Start_Lat, Start_Lng, Amenity, Bump, Crossing, Give_Way, \
     Junction, No_Exit, Railway, Roundabout, Station, Stop, Traffic_Calming, \
     Traffic_Signal, Turning_Loop, Zip_Code";

/// Returns known locations, in random order when `limit` is set.
///
/// With a limit, at most that many rows are sampled at random. Without
/// one, every row is returned in insertion order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub async fn get_all_model_data(
    db: &dyn Database,
    limit: Option<u32>,
) -> Result<Vec<LocationRecord>, DbError> {
    let rows = match limit {
        Some(n) => {
            db.query_raw_params(
                &format!("SELECT {LOCATION_COLUMNS} FROM model_data ORDER BY RANDOM() LIMIT ?"),
                &[DatabaseValue::Int64(i64::from(n))],
            )
            .await?
        }
        None => {
            db.query_raw_params(
                &format!("SELECT {LOCATION_COLUMNS} FROM model_data ORDER BY id"),
                &[],
            )
            .await?
        }
    };

    let locations = rows.iter().map(row_to_location).collect::<Result<Vec<_>, _>>()?;
    log::debug!("Loaded {} locations", locations.len());
    Ok(locations)
}

/// Returns every known location in a zip code.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub async fn get_model_data_by_zip(
    db: &dyn Database,
    zip_code: &str,
) -> Result<Vec<LocationRecord>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {LOCATION_COLUMNS} FROM model_data WHERE Zip_Code = ? ORDER BY id"),
            &[DatabaseValue::String(zip_code.to_string())],
        )
        .await?;

    rows.iter().map(row_to_location).collect()
}

/// Returns every zip code in the `zip_codes` table, sorted.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_all_zip_codes(db: &dyn Database) -> Result<Vec<String>, DbError> {
    let rows = db
        .query_raw_params("SELECT zip_code FROM zip_codes ORDER BY zip_code", &[])
        .await?;

    rows.iter()
        .map(|row| {
            row.to_value("zip_code").map_err(|e| DbError::Conversion {
                message: format!("Failed to parse zip_code: {e}"),
            })
        })
        .collect()
}

/// Inserts locations into `model_data`. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails.
pub async fn insert_locations(
    db: &dyn Database,
    locations: &[LocationRecord],
) -> Result<u64, DbError> {
    let mut inserted = 0u64;

    for location in locations {
        let r = &location.road;
        let mut params = vec![
            DatabaseValue::Real64(location.latitude),
            DatabaseValue::Real64(location.longitude),
        ];
        params.extend(
            [
                r.amenity,
                r.bump,
                r.crossing,
                r.give_way,
                r.junction,
                r.no_exit,
                r.railway,
                r.roundabout,
                r.station,
                r.stop,
                r.traffic_calming,
                r.traffic_signal,
                r.turning_loop,
            ]
            .into_iter()
            .map(|b| DatabaseValue::Int64(i64::from(b))),
        );
        params.push(
            location
                .zip_code
                .as_ref()
                .map_or(DatabaseValue::Null, |z| DatabaseValue::String(z.clone())),
        );

        inserted += db
            .exec_raw_params(
                &format!(
                    "INSERT INTO model_data ({LOCATION_COLUMNS})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                &params,
            )
            .await?;
    }

    Ok(inserted)
}

/// Adds zip codes to `zip_codes`, ignoring ones already present. Returns the
/// number of new rows.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails.
pub async fn insert_zip_codes(db: &dyn Database, zip_codes: &[String]) -> Result<u64, DbError> {
    let mut inserted = 0u64;
    for zip in zip_codes {
        inserted += db
            .exec_raw_params(
                "INSERT OR IGNORE INTO zip_codes (zip_code) VALUES (?)",
                &[DatabaseValue::String(zip.clone())],
            )
            .await?;
    }
    Ok(inserted)
}

fn row_to_location(row: &Row) -> Result<LocationRecord, DbError> {
    let real = |col: &str| -> Result<f64, DbError> {
        row.to_value(col).map_err(|e| DbError::Conversion {
            message: format!("Failed to parse {col}: {e}"),
        })
    };
    let flag = |col: &str| -> bool {
        row.to_value::<Option<i64>>(col)
            .unwrap_or(None)
            .is_some_and(|v| v != 0)
    };

    Ok(LocationRecord {
        latitude: real("Start_Lat")?,
        longitude: real("Start_Lng")?,
        road: RoadFeatures {
            amenity: flag("Amenity"),
            bump: flag("Bump"),
            crossing: flag("Crossing"),
            give_way: flag("Give_Way"),
            junction: flag("Junction"),
            no_exit: flag("No_Exit"),
            railway: flag("Railway"),
            roundabout: flag("Roundabout"),
            station: flag("Station"),
            stop: flag("Stop"),
            traffic_calming: flag("Traffic_Calming"),
            traffic_signal: flag("Traffic_Signal"),
            turning_loop: flag("Turning_Loop"),
        },
        zip_code: row.to_value("Zip_Code").unwrap_or(None),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_db_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "accident_risk_{name}_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn location(latitude: f64, longitude: f64, zip: Option<&str>) -> LocationRecord {
        LocationRecord {
            latitude,
            longitude,
            road: RoadFeatures {
                junction: true,
                traffic_signal: true,
                ..RoadFeatures::default()
            },
            zip_code: zip.map(ToString::to_string),
        }
    }

    async fn seeded(name: &str) -> (Box<dyn Database>, PathBuf) {
        let path = temp_db_path(name);
        let db = crate::create(&path).await.unwrap();
        insert_locations(
            db.as_ref(),
            &[
                location(34.05, -118.25, Some("90012")),
                location(34.06, -118.24, Some("90012")),
                location(33.94, -118.40, Some("90045")),
                location(34.10, -118.30, None),
            ],
        )
        .await
        .unwrap();
        insert_zip_codes(
            db.as_ref(),
            &["90045".to_string(), "90012".to_string(), "90012".to_string()],
        )
        .await
        .unwrap();
        (db, path)
    }

    #[tokio::test]
    async fn reads_back_locations() {
        let (db, path) = seeded("read_back").await;

        let all = get_all_model_data(db.as_ref(), None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!((all[0].latitude - 34.05).abs() < f64::EPSILON);
        assert!(all[0].road.junction);
        assert!(all[0].road.traffic_signal);
        assert!(!all[0].road.railway);
        assert_eq!(all[0].zip_code.as_deref(), Some("90012"));
        assert_eq!(all[3].zip_code, None);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn limit_samples_rows() {
        let (db, path) = seeded("limit").await;

        let sample = get_all_model_data(db.as_ref(), Some(2)).await.unwrap();
        assert_eq!(sample.len(), 2);
        let all = get_all_model_data(db.as_ref(), Some(100)).await.unwrap();
        assert_eq!(all.len(), 4);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn filters_by_zip() {
        let (db, path) = seeded("by_zip").await;

        let rows = get_model_data_by_zip(db.as_ref(), "90012").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.zip_code.as_deref() == Some("90012")));
        assert!(
            get_model_data_by_zip(db.as_ref(), "00000")
                .await
                .unwrap()
                .is_empty()
        );

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn zip_codes_are_unique_and_sorted() {
        let (db, path) = seeded("zip_codes").await;

        let zips = get_all_zip_codes(db.as_ref()).await.unwrap();
        assert_eq!(zips, vec!["90012".to_string(), "90045".to_string()]);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn open_requires_existing_file() {
        let path = temp_db_path("missing");
        let err = crate::open(&path).err().unwrap();
        assert!(matches!(err, DbError::Missing { .. }));
    }
}

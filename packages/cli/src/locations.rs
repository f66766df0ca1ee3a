//! Reads known accident locations from CSV for loading into the locations
//! database.

use std::collections::BTreeSet;
use std::path::Path;

use accident_risk_features::EncodeError;
use accident_risk_features::one_hot::parse_bool;
use accident_risk_features::table::{RawTable, is_null};
use accident_risk_features_models::{LocationRecord, RoadFeatures};

/// Parsed locations plus the distinct zip codes they reference.
#[derive(Debug, Default)]
pub struct LocationFile {
    pub locations: Vec<LocationRecord>,
    pub zip_codes: Vec<String>,
    /// Rows skipped because a coordinate was missing or not a number.
    pub skipped: usize,
}

fn flag(value: &str) -> bool {
    parse_bool(value).unwrap_or_else(|| value.trim().parse::<f64>().is_ok_and(|v| v != 0.0))
}

/// Reads a headed CSV with `Start_Lat`, `Start_Lng`, road flag columns and an
/// optional `Zip_Code`.
///
/// Absent flag columns read as `false`. Only the first five characters of a
/// zip code are kept, so `90045-1234` becomes `90045`.
///
/// # Errors
///
/// * [`EncodeError::MissingColumn`] if either coordinate column is absent
/// * [`EncodeError::Io`] or [`EncodeError::Csv`] if the file cannot be read
pub fn read_locations(path: &Path) -> Result<LocationFile, EncodeError> {
    from_table(&RawTable::from_path(path)?)
}

fn from_table(table: &RawTable) -> Result<LocationFile, EncodeError> {
    let lat = table.require_column("Start_Lat")?;
    let lng = table.require_column("Start_Lng")?;
    let zip = table.column_index("Zip_Code");
    let col = |name: &str| table.column_index(name);

    let flags = [
        col("Amenity"),
        col("Bump"),
        col("Crossing"),
        col("Give_Way"),
        col("Junction"),
        col("No_Exit"),
        col("Railway"),
        col("Roundabout"),
        col("Station"),
        col("Stop"),
        col("Traffic_Calming"),
        col("Traffic_Signal"),
        col("Turning_Loop"),
    ];

    let mut file = LocationFile::default();
    let mut zip_codes = BTreeSet::new();

    for row in table.rows() {
        let (Ok(latitude), Ok(longitude)) = (row[lat].parse::<f64>(), row[lng].parse::<f64>())
        else {
            file.skipped += 1;
            continue;
        };
        if !(latitude.is_finite() && longitude.is_finite()) {
            file.skipped += 1;
            continue;
        }

        let f = flags.map(|i| i.is_some_and(|i| flag(&row[i])));
        let road = RoadFeatures {
            amenity: f[0],
            bump: f[1],
            crossing: f[2],
            give_way: f[3],
            junction: f[4],
            no_exit: f[5],
            railway: f[6],
            roundabout: f[7],
            station: f[8],
            stop: f[9],
            traffic_calming: f[10],
            traffic_signal: f[11],
            turning_loop: f[12],
        };

        let zip_code = zip
            .map(|i| row[i].as_str())
            .filter(|z| !is_null(z))
            .map(|z| z.chars().take(5).collect::<String>());
        if let Some(z) = &zip_code {
            zip_codes.insert(z.clone());
        }

        file.locations.push(LocationRecord {
            latitude,
            longitude,
            road,
            zip_code,
        });
    }

    file.zip_codes = zip_codes.into_iter().collect();
    Ok(file)
}

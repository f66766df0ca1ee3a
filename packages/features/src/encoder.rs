//! The two encoding paths from raw records to [`FeatureVector`]s.

use accident_risk_features_models::{Feature, FeatureVector, IndexKey, QueryRecord};

use crate::{
    EncodeError, START_TIME_COLUMN, TARGET_COLUMN,
    dataset::{QueryTable, TrainingSet},
    one_hot,
    table::RawTable,
    time::{TimeParts, parse_start_time},
};

/// Derived calendar columns appended in place of `Start_Time`.
pub const START_MONTH_COLUMN: &str = "Start_Month";
pub const START_HOUR_COLUMN: &str = "Start_Hour";
pub const START_DAY_COLUMN: &str = "Start_Day";

const LATITUDE_COLUMN: &str = "Start_Lat";
const LONGITUDE_COLUMN: &str = "Start_Lng";

/// Encodes a labeled table for fitting.
///
/// Rows with any missing value are dropped first. The `Target` column is
/// split off as the label vector and `Start_Time` is replaced by its month,
/// hour, and weekday before one-hot encoding.
///
/// # Errors
///
/// * [`EncodeError::MissingColumn`] if `Start_Time` or `Target` is absent
/// * [`EncodeError::NoRows`] if every row had a missing value
/// * [`EncodeError::Data`] if a label is not 0 or 1
/// * [`EncodeError::Timestamp`] if a `Start_Time` cannot be parsed
/// * [`EncodeError::MissingFeatures`] if the encoded columns lack a model
///   feature
pub fn encode_training_table(mut table: RawTable) -> Result<TrainingSet, EncodeError> {
    let target_index = table.require_column(TARGET_COLUMN)?;
    table.require_column(START_TIME_COLUMN)?;

    drop_incomplete(&mut table)?;

    let (_, labels) = table.remove_column(target_index);
    let target = labels
        .iter()
        .enumerate()
        .map(|(row, value)| parse_label(row, value))
        .collect::<Result<Vec<_>, _>>()?;

    let time_index = table.require_column(START_TIME_COLUMN)?;
    let (_, times) = table.remove_column(time_index);
    let times = parse_times(&times)?;
    push_time_columns(&mut table, &times)?;

    let encoded = one_hot::encode(&table, &[START_DAY_COLUMN]);
    let features = encoded.select_features()?;

    log::debug!(
        "Encoded {} training rows from {} columns",
        features.len(),
        encoded.columns.len()
    );

    TrainingSet::new(features, target)
}

/// Encodes an unlabeled table for prediction, keeping each row's
/// identifying [`IndexKey`].
///
/// Same cleaning and one-hot path as [`encode_training_table`]. A `Target`
/// column, if present, is encoded and then ignored by feature selection.
///
/// # Errors
///
/// * [`EncodeError::MissingColumn`] if `Start_Time`, `Start_Lat`, or
///   `Start_Lng` is absent
/// * [`EncodeError::NoRows`] if every row had a missing value
/// * [`EncodeError::Timestamp`] if a `Start_Time` cannot be parsed
/// * [`EncodeError::MissingFeatures`] if the encoded columns lack a model
///   feature
pub fn encode_query_table(mut table: RawTable) -> Result<QueryTable, EncodeError> {
    table.require_column(START_TIME_COLUMN)?;
    table.require_column(LATITUDE_COLUMN)?;
    table.require_column(LONGITUDE_COLUMN)?;

    drop_incomplete(&mut table)?;

    let time_index = table.require_column(START_TIME_COLUMN)?;
    let (_, times) = table.remove_column(time_index);
    let times = parse_times(&times)?;
    push_time_columns(&mut table, &times)?;

    let features = one_hot::encode(&table, &[START_DAY_COLUMN]).select_features()?;

    let index = times
        .into_iter()
        .zip(&features)
        .map(|(time, vector)| {
            IndexKey::new(
                Some(time),
                vector.get(Feature::StartLat),
                vector.get(Feature::StartLng),
            )
        })
        .collect();

    QueryTable::new(index, features)
}

/// Encodes one live query by direct construction.
///
/// The day-of-week slots are set from the timestamp's weekday, so the
/// result always has exactly one `Start_Day_k` equal to 1 regardless of
/// what other rows exist. The four model road flags become 1.0/0.0.
///
/// # Errors
///
/// Returns [`EncodeError::Data`] if a coordinate or weather value is not
/// finite.
pub fn encode_query_record(record: &QueryRecord) -> Result<FeatureVector, EncodeError> {
    let location = &record.location;
    let weather = &record.weather;
    let parts = TimeParts::from(record.start_time);

    let mut vector = FeatureVector::default();
    let numeric = [
        (Feature::StartLat, location.latitude),
        (Feature::StartLng, location.longitude),
        (Feature::TemperatureF, weather.temperature_f),
        (Feature::HumidityPct, weather.humidity_pct),
        (Feature::PressureIn, weather.pressure_in),
        (Feature::WindSpeedMph, weather.wind_speed_mph),
        (Feature::PrecipitationIn, weather.precipitation_in),
    ];
    for (feature, value) in numeric {
        if !value.is_finite() {
            return Err(EncodeError::Data {
                message: format!("{feature} is not a finite number: {value}"),
            });
        }
        vector.set(feature, value);
    }

    let road = &location.road;
    vector.set(Feature::Junction, flag(road.junction));
    vector.set(Feature::Railway, flag(road.railway));
    vector.set(Feature::Station, flag(road.station));
    vector.set(Feature::TurningLoop, flag(road.turning_loop));

    vector.set(Feature::StartMonth, f64::from(parts.month));
    vector.set(Feature::StartHour, f64::from(parts.hour));
    vector.set_day_of_week(parts.day_of_week);

    Ok(vector)
}

/// Encodes a batch of live queries, indexing each by its time and
/// coordinates.
///
/// # Errors
///
/// Returns the first [`EncodeError`] from [`encode_query_record`].
pub fn encode_query_records(records: &[QueryRecord]) -> Result<QueryTable, EncodeError> {
    let mut index = Vec::with_capacity(records.len());
    let mut features = Vec::with_capacity(records.len());

    for record in records {
        features.push(encode_query_record(record)?);
        index.push(IndexKey::new(
            Some(record.start_time),
            record.location.latitude,
            record.location.longitude,
        ));
    }

    QueryTable::new(index, features)
}

const fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

fn drop_incomplete(table: &mut RawTable) -> Result<(), EncodeError> {
    let dropped = table.drop_incomplete_rows();
    if dropped > 0 {
        log::info!(
            "Dropped {dropped} rows with missing values ({} remain)",
            table.len()
        );
    }
    if table.is_empty() {
        return Err(EncodeError::NoRows);
    }
    Ok(())
}

fn parse_label(row: usize, value: &str) -> Result<u8, EncodeError> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .ok()
        .or_else(|| one_hot::parse_bool(value).map(flag));

    match parsed {
        Some(v) if v.abs() < f64::EPSILON => Ok(0),
        Some(v) if (v - 1.0).abs() < f64::EPSILON => Ok(1),
        _ => Err(EncodeError::Data {
            message: format!("{TARGET_COLUMN} on row {row} must be 0 or 1, got {value:?}"),
        }),
    }
}

fn parse_times(values: &[String]) -> Result<Vec<chrono::NaiveDateTime>, EncodeError> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            parse_start_time(value).ok_or_else(|| EncodeError::Timestamp {
                row,
                value: value.clone(),
            })
        })
        .collect()
}

fn push_time_columns(
    table: &mut RawTable,
    times: &[chrono::NaiveDateTime],
) -> Result<(), EncodeError> {
    let parts: Vec<TimeParts> = times.iter().copied().map(TimeParts::from).collect();

    table.push_column(
        START_MONTH_COLUMN,
        parts.iter().map(|p| p.month.to_string()).collect(),
    )?;
    table.push_column(
        START_HOUR_COLUMN,
        parts.iter().map(|p| p.hour.to_string()).collect(),
    )?;
    table.push_column(
        START_DAY_COLUMN,
        parts.iter().map(|p| p.day_of_week.to_string()).collect(),
    )
}

#[cfg(test)]
mod tests {
    use accident_risk_features_models::{
        DAYS_PER_WEEK, FEATURE_COUNT, LocationRecord, RoadFeatures, WeatherReading,
    };
    use chrono::{Duration, NaiveDateTime};

    use super::*;

    const HEADER: &str = "Start_Time,Start_Lat,Start_Lng,Temperature(F),Humidity(%),Pressure(in),\
Wind_Speed(mph),Precipitation(in),Junction,Railway,Station,Turning_Loop,Side,Target";

    /// One row per weekday (2022-03-14 was a Monday) plus a row with a gap.
    fn training_csv() -> String {
        let mut csv = String::from(HEADER);
        csv.push('\n');
        for day in 0..7 {
            let target = day % 2;
            let junction = if day == 3 { "True" } else { "False" };
            csv.push_str(&format!(
                "2022-03-{:02} 0{day}:30:00,34.0{day},-118.2{day},6{day}.0,40,29.9,5.0,0.0,{junction},False,False,False,R,{target}\n",
                14 + day
            ));
        }
        csv.push_str("2022-03-21 10:00:00,34.1,-118.3,,40,29.9,5.0,0.0,False,False,False,False,L,1\n");
        csv
    }

    fn sample_record() -> QueryRecord {
        QueryRecord {
            location: LocationRecord {
                latitude: 34.05,
                longitude: -118.24,
                road: RoadFeatures::default(),
                zip_code: None,
            },
            weather: WeatherReading {
                temperature_f: 65.0,
                humidity_pct: 40.0,
                pressure_in: 29.9,
                wind_speed_mph: 5.0,
                precipitation_in: 0.0,
            },
            start_time: parse_start_time("2022-03-14 08:00:00").unwrap(),
        }
    }

    #[test]
    fn training_table_drops_nulls_and_splits_target() {
        let table = RawTable::from_reader(training_csv().as_bytes()).unwrap();
        let set = encode_training_table(table).unwrap();

        assert_eq!(set.len(), 7);
        assert_eq!(set.target(), &[0, 1, 0, 1, 0, 1, 0]);

        let monday = &set.features()[0];
        assert!((monday.get(Feature::StartMonth) - 3.0).abs() < f64::EPSILON);
        assert!((monday.get(Feature::StartHour) - 0.0).abs() < f64::EPSILON);
        assert_eq!(monday.day_of_week(), Some(0));

        let thursday = &set.features()[3];
        assert_eq!(thursday.day_of_week(), Some(3));
        assert!((thursday.get(Feature::Junction) - 1.0).abs() < f64::EPSILON);
        assert!((thursday.get(Feature::TemperatureF) - 63.0).abs() < f64::EPSILON);
    }

    #[test]
    fn training_table_without_sunday_is_missing_a_feature() {
        let csv: String = training_csv()
            .lines()
            .filter(|line| !line.starts_with("2022-03-20"))
            .map(|line| format!("{line}\n"))
            .collect();
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();

        match encode_training_table(table) {
            Err(EncodeError::MissingFeatures { missing }) => {
                assert_eq!(missing, vec!["Start_Day_6".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn training_table_rejects_bad_labels() {
        let csv = training_csv().replacen(",R,1\n", ",R,2\n", 1);
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        let err = encode_training_table(table).unwrap_err();
        assert!(matches!(err, EncodeError::Data { .. }));
        assert!(err.is_data_error());
    }

    #[test]
    fn training_table_requires_target() {
        let csv = "Start_Time,Start_Lat\n2022-03-14 08:00:00,34.0\n";
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(
            encode_training_table(table),
            Err(EncodeError::MissingColumn { column }) if column == TARGET_COLUMN
        ));
    }

    #[test]
    fn training_table_reports_bad_timestamps() {
        let csv = training_csv().replacen("2022-03-15 01:30:00", "not a time", 1);
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        match encode_training_table(table) {
            Err(EncodeError::Timestamp { row, value }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "not a time");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn training_table_of_only_null_rows_is_empty() {
        let csv = format!(
            "{HEADER}\n2022-03-21 10:00:00,34.1,-118.3,,40,29.9,5.0,0.0,False,False,False,False,L,1\n"
        );
        let table = RawTable::from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(
            encode_training_table(table),
            Err(EncodeError::NoRows)
        ));
    }

    #[test]
    fn query_table_keeps_index() {
        let table = RawTable::from_reader(training_csv().as_bytes()).unwrap();
        let query = encode_query_table(table).unwrap();

        assert_eq!(query.len(), 7);
        let first = &query.index()[0];
        assert_eq!(
            first.start_time,
            Some(parse_start_time("2022-03-14 00:30:00").unwrap())
        );
        assert!((first.latitude - 34.00).abs() < f64::EPSILON);
        assert!((first.longitude - -118.20).abs() < f64::EPSILON);
        assert!(first.zip_code.is_none());
    }

    #[test]
    fn query_record_matches_reference_example() {
        let vector = encode_query_record(&sample_record()).unwrap();

        assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
        assert!((vector.get(Feature::StartMonth) - 3.0).abs() < f64::EPSILON);
        assert!((vector.get(Feature::StartHour) - 8.0).abs() < f64::EPSILON);
        assert!((vector.get(Feature::StartDay0) - 1.0).abs() < f64::EPSILON);
        for day in &Feature::DAYS[1..] {
            assert!(vector.get(*day).abs() < f64::EPSILON, "{day} should be 0");
        }
        for flag in [
            Feature::Junction,
            Feature::Railway,
            Feature::Station,
            Feature::TurningLoop,
        ] {
            assert!(vector.get(flag).abs() < f64::EPSILON);
        }
        assert!((vector.get(Feature::PressureIn) - 29.9).abs() < f64::EPSILON);
        assert!(vector.is_complete());
    }

    #[test]
    fn query_record_sets_one_day_for_every_weekday() {
        let base = sample_record();
        for offset in 0..i64::from(DAYS_PER_WEEK) {
            let mut record = base.clone();
            record.start_time = base.start_time + Duration::days(offset);
            let vector = encode_query_record(&record).unwrap();

            let ones: Vec<Feature> = Feature::DAYS
                .iter()
                .copied()
                .filter(|day| (vector.get(*day) - 1.0).abs() < f64::EPSILON)
                .collect();
            assert_eq!(ones.len(), 1);
            assert_eq!(vector.day_of_week(), u32::try_from(offset).ok());
        }
    }

    #[test]
    fn query_record_casts_road_flags() {
        let mut record = sample_record();
        record.location.road.railway = true;
        record.location.road.crossing = true;
        let vector = encode_query_record(&record).unwrap();
        assert!((vector.get(Feature::Railway) - 1.0).abs() < f64::EPSILON);
        assert!(vector.get(Feature::Junction).abs() < f64::EPSILON);
    }

    #[test]
    fn query_record_rejects_non_finite_values() {
        let mut record = sample_record();
        record.weather.humidity_pct = f64::NAN;
        match encode_query_record(&record) {
            Err(EncodeError::Data { message }) => assert!(message.contains("Humidity(%)")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn query_records_index_by_time_and_location() {
        let record = sample_record();
        let query = encode_query_records(&[record.clone(), record]).unwrap();
        assert_eq!(query.len(), 2);
        assert_eq!(
            query.index()[1].start_time,
            Some(NaiveDateTime::parse_from_str("2022-03-14 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap())
        );
    }
}

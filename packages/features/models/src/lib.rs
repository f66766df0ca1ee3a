#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record, weather, and feature-vector types for accident risk prediction.
//!
//! [`Feature`] is the ordered schema shared by the encoder and the
//! classifier: its variants appear in exactly the order the model was
//! fitted on, and each one displays as the column name used in the
//! training CSV. [`FeatureVector`] is indexed by that enum, so a vector can
//! never have the wrong width or ordering.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of fields in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 20;

/// Number of one-hot day-of-week slots (`Start_Day_0` is Monday).
pub const DAYS_PER_WEEK: u32 = 7;

/// A single model input column, in fitted order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Feature {
    #[serde(rename = "Start_Lat")]
    #[strum(serialize = "Start_Lat")]
    StartLat,
    #[serde(rename = "Start_Lng")]
    #[strum(serialize = "Start_Lng")]
    StartLng,
    #[serde(rename = "Temperature(F)")]
    #[strum(serialize = "Temperature(F)")]
    TemperatureF,
    #[serde(rename = "Humidity(%)")]
    #[strum(serialize = "Humidity(%)")]
    HumidityPct,
    #[serde(rename = "Pressure(in)")]
    #[strum(serialize = "Pressure(in)")]
    PressureIn,
    #[serde(rename = "Wind_Speed(mph)")]
    #[strum(serialize = "Wind_Speed(mph)")]
    WindSpeedMph,
    #[serde(rename = "Precipitation(in)")]
    #[strum(serialize = "Precipitation(in)")]
    PrecipitationIn,
    #[serde(rename = "Junction")]
    #[strum(serialize = "Junction")]
    Junction,
    #[serde(rename = "Railway")]
    #[strum(serialize = "Railway")]
    Railway,
    #[serde(rename = "Station")]
    #[strum(serialize = "Station")]
    Station,
    #[serde(rename = "Turning_Loop")]
    #[strum(serialize = "Turning_Loop")]
    TurningLoop,
    #[serde(rename = "Start_Month")]
    #[strum(serialize = "Start_Month")]
    StartMonth,
    #[serde(rename = "Start_Hour")]
    #[strum(serialize = "Start_Hour")]
    StartHour,
    #[serde(rename = "Start_Day_0")]
    #[strum(serialize = "Start_Day_0")]
    StartDay0,
    #[serde(rename = "Start_Day_1")]
    #[strum(serialize = "Start_Day_1")]
    StartDay1,
    #[serde(rename = "Start_Day_2")]
    #[strum(serialize = "Start_Day_2")]
    StartDay2,
    #[serde(rename = "Start_Day_3")]
    #[strum(serialize = "Start_Day_3")]
    StartDay3,
    #[serde(rename = "Start_Day_4")]
    #[strum(serialize = "Start_Day_4")]
    StartDay4,
    #[serde(rename = "Start_Day_5")]
    #[strum(serialize = "Start_Day_5")]
    StartDay5,
    #[serde(rename = "Start_Day_6")]
    #[strum(serialize = "Start_Day_6")]
    StartDay6,
}

impl Feature {
    /// Every feature in fitted order.
    pub const ALL: [Self; FEATURE_COUNT] = [
        Self::StartLat,
        Self::StartLng,
        Self::TemperatureF,
        Self::HumidityPct,
        Self::PressureIn,
        Self::WindSpeedMph,
        Self::PrecipitationIn,
        Self::Junction,
        Self::Railway,
        Self::Station,
        Self::TurningLoop,
        Self::StartMonth,
        Self::StartHour,
        Self::StartDay0,
        Self::StartDay1,
        Self::StartDay2,
        Self::StartDay3,
        Self::StartDay4,
        Self::StartDay5,
        Self::StartDay6,
    ];

    /// The seven one-hot day-of-week slots, Monday first.
    pub const DAYS: [Self; DAYS_PER_WEEK as usize] = [
        Self::StartDay0,
        Self::StartDay1,
        Self::StartDay2,
        Self::StartDay3,
        Self::StartDay4,
        Self::StartDay5,
        Self::StartDay6,
    ];

    /// Returns all variants of this enum, in fitted order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &Self::ALL
    }

    /// Position of this feature within a [`FeatureVector`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The `Start_Day_k` slot for a day index (0 = Monday .. 6 = Sunday).
    #[must_use]
    pub const fn start_day(day: u32) -> Option<Self> {
        if day < DAYS_PER_WEEK {
            Some(Self::DAYS[day as usize])
        } else {
            None
        }
    }

    /// Column names of every feature, in fitted order.
    #[must_use]
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(ToString::to_string).collect()
    }
}

/// A fixed-width, fixed-order model input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_COUNT],
        }
    }
}

impl FeatureVector {
    /// Wraps raw values that are already in [`Feature::ALL`] order.
    #[must_use]
    pub const fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    #[must_use]
    pub const fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub const fn set(&mut self, feature: Feature, value: f64) {
        self.values[feature.index()] = value;
    }

    /// The values as a slice, in fitted order.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Sets exactly one `Start_Day_k` slot to 1 and clears the other six.
    ///
    /// Out-of-range days leave every slot at 0.
    pub fn set_day_of_week(&mut self, day: u32) {
        for (k, feature) in (0..DAYS_PER_WEEK).zip(Feature::DAYS) {
            self.set(feature, if k == day { 1.0 } else { 0.0 });
        }
    }

    /// Returns the day index whose one-hot slot is set, if exactly one is.
    #[must_use]
    pub fn day_of_week(&self) -> Option<u32> {
        let mut set = (0..DAYS_PER_WEEK)
            .zip(Feature::DAYS)
            .filter(|(_, feature)| self.get(*feature) > 0.5)
            .map(|(k, _)| k);
        let first = set.next()?;
        if set.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Whether every value is finite (no `NaN`/infinite gaps).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// The five weather measurements the model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Temperature in degrees Fahrenheit.
    #[serde(rename = "Temperature(F)")]
    pub temperature_f: f64,
    /// Relative humidity, percent.
    #[serde(rename = "Humidity(%)")]
    pub humidity_pct: f64,
    /// Barometric pressure in the units the model was trained on.
    #[serde(rename = "Pressure(in)")]
    pub pressure_in: f64,
    /// Wind speed in miles per hour.
    #[serde(rename = "Wind_Speed(mph)")]
    pub wind_speed_mph: f64,
    /// Precipitation in inches.
    #[serde(rename = "Precipitation(in)")]
    pub precipitation_in: f64,
}

impl WeatherReading {
    /// The reading as a `(temperature, humidity, pressure, wind, precipitation)`
    /// tuple.
    #[must_use]
    pub const fn as_tuple(&self) -> (f64, f64, f64, f64, f64) {
        (
            self.temperature_f,
            self.humidity_pct,
            self.pressure_in,
            self.wind_speed_mph,
            self.precipitation_in,
        )
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        let (t, h, p, w, r) = self.as_tuple();
        [t, h, p, w, r].iter().all(|v| v.is_finite())
    }
}

/// Boolean road-feature flags for a location.
///
/// Only [`Self::junction`], [`Self::railway`], [`Self::station`], and
/// [`Self::turning_loop`] are model inputs; the rest are carried for API
/// consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct RoadFeatures {
    #[serde(rename = "Amenity", default)]
    pub amenity: bool,
    #[serde(rename = "Bump", default)]
    pub bump: bool,
    #[serde(rename = "Crossing", default)]
    pub crossing: bool,
    #[serde(rename = "Give_Way", default)]
    pub give_way: bool,
    #[serde(rename = "Junction")]
    pub junction: bool,
    #[serde(rename = "No_Exit", default)]
    pub no_exit: bool,
    #[serde(rename = "Railway")]
    pub railway: bool,
    #[serde(rename = "Roundabout", default)]
    pub roundabout: bool,
    #[serde(rename = "Station")]
    pub station: bool,
    #[serde(rename = "Stop", default)]
    pub stop: bool,
    #[serde(rename = "Traffic_Calming", default)]
    pub traffic_calming: bool,
    #[serde(rename = "Traffic_Signal", default)]
    pub traffic_signal: bool,
    #[serde(rename = "Turning_Loop")]
    pub turning_loop: bool,
}

/// A known location from the historical accident data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "Start_Lat")]
    pub latitude: f64,
    #[serde(rename = "Start_Lng")]
    pub longitude: f64,
    #[serde(flatten)]
    pub road: RoadFeatures,
    #[serde(rename = "Zip_Code", default)]
    pub zip_code: Option<String>,
}

impl LocationRecord {
    /// Returns a copy of this location moved to the given coordinates.
    ///
    /// Used when a nearby known location serves as the template for a query
    /// point that has no data of its own.
    #[must_use]
    pub fn relocated(&self, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..self.clone()
        }
    }
}

/// A single live query: a location, its current weather, and a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    pub location: LocationRecord,
    pub weather: WeatherReading,
    pub start_time: NaiveDateTime,
}

/// Identifying, non-feature data carried alongside a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexKey {
    #[serde(rename = "Start_Time")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(rename = "Start_Lat")]
    pub latitude: f64,
    #[serde(rename = "Start_Lng")]
    pub longitude: f64,
    #[serde(rename = "zip_code", default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

impl IndexKey {
    #[must_use]
    pub const fn new(start_time: Option<NaiveDateTime>, latitude: f64, longitude: f64) -> Self {
        Self {
            start_time,
            latitude,
            longitude,
            zip_code: None,
        }
    }

    #[must_use]
    pub fn with_zip_code(mut self, zip_code: impl Into<String>) -> Self {
        self.zip_code = Some(zip_code.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_order_matches_column_names() {
        let names = Feature::names();
        assert_eq!(names.len(), FEATURE_COUNT);
        assert_eq!(names[0], "Start_Lat");
        assert_eq!(names[2], "Temperature(F)");
        assert_eq!(names[6], "Precipitation(in)");
        assert_eq!(names[10], "Turning_Loop");
        assert_eq!(names[13], "Start_Day_0");
        assert_eq!(names[19], "Start_Day_6");
    }

    #[test]
    fn feature_index_is_position_in_all() {
        for (i, feature) in Feature::all().iter().enumerate() {
            assert_eq!(feature.index(), i, "{feature} out of place");
        }
    }

    #[test]
    fn feature_parses_from_column_name() {
        for feature in Feature::all() {
            let parsed: Feature = feature.to_string().parse().unwrap();
            assert_eq!(parsed, *feature);
        }
        assert!("Start_Day_7".parse::<Feature>().is_err());
    }

    #[test]
    fn start_day_slots() {
        assert_eq!(Feature::start_day(0), Some(Feature::StartDay0));
        assert_eq!(Feature::start_day(6), Some(Feature::StartDay6));
        assert_eq!(Feature::start_day(7), None);
    }

    #[test]
    fn set_day_of_week_sets_exactly_one_slot() {
        let mut vector = FeatureVector::default();
        for day in 0..DAYS_PER_WEEK {
            vector.set_day_of_week(day);
            let ones = Feature::DAYS
                .iter()
                .filter(|f| (vector.get(**f) - 1.0).abs() < f64::EPSILON)
                .count();
            assert_eq!(ones, 1);
            assert_eq!(vector.day_of_week(), Some(day));
        }
    }

    #[test]
    fn day_of_week_rejects_ambiguous_vectors() {
        let mut vector = FeatureVector::default();
        assert_eq!(vector.day_of_week(), None);
        vector.set(Feature::StartDay1, 1.0);
        vector.set(Feature::StartDay4, 1.0);
        assert_eq!(vector.day_of_week(), None);
    }

    #[test]
    fn location_record_uses_column_names() {
        let json = serde_json::json!({
            "Start_Lat": 34.05,
            "Start_Lng": -118.25,
            "Amenity": false,
            "Bump": false,
            "Crossing": true,
            "Give_Way": false,
            "Junction": true,
            "No_Exit": false,
            "Railway": false,
            "Roundabout": false,
            "Station": false,
            "Stop": false,
            "Traffic_Calming": false,
            "Traffic_Signal": true,
            "Turning_Loop": false,
            "Zip_Code": "90012"
        });
        let record: LocationRecord = serde_json::from_value(json).unwrap();
        assert!(record.road.junction);
        assert!(record.road.crossing);
        assert_eq!(record.zip_code.as_deref(), Some("90012"));

        let moved = record.relocated(34.0, -118.0);
        assert!((moved.latitude - 34.0).abs() < f64::EPSILON);
        assert_eq!(moved.road, record.road);
    }

    #[test]
    fn index_key_omits_missing_zip_code() {
        let key = IndexKey::new(None, 34.05, -118.24);
        let json = serde_json::to_value(&key).unwrap();
        assert!(json.get("zip_code").is_none());

        let json = serde_json::to_value(key.with_zip_code("90041")).unwrap();
        assert_eq!(json["zip_code"], "90041");
    }
}

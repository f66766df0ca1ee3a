//! Output shapes for a weather reading.

use accident_risk_features_models::WeatherReading;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::WeatherError;

/// Column order shared by the table and tuple shapes.
pub const WEATHER_COLUMNS: [&str; 5] = [
    "Temperature(F)",
    "Humidity(%)",
    "Pressure(in)",
    "Wind_Speed(mph)",
    "Precipitation(in)",
];

/// How a reading is presented to API callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum WeatherFormat {
    /// One-row table with named columns.
    #[default]
    #[strum(serialize = "pd")]
    Table,
    /// Object keyed by column name.
    #[strum(serialize = "dict")]
    Dict,
    /// Bare five-value array.
    #[strum(serialize = "tuple")]
    Tuple,
}

impl WeatherFormat {
    /// Parses a format name.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Format`] for anything other than `pd`, `dict`
    /// or `tuple`.
    pub fn parse(value: &str) -> Result<Self, WeatherError> {
        value.parse().map_err(|_| WeatherError::Format {
            value: value.to_string(),
        })
    }

    #[must_use]
    pub fn render(self, reading: WeatherReading) -> WeatherOutput {
        match self {
            Self::Table => {
                let (t, h, p, w, r) = reading.as_tuple();
                WeatherOutput::Table {
                    columns: WEATHER_COLUMNS,
                    data: vec![[t, h, p, w, r]],
                }
            }
            Self::Dict => WeatherOutput::Dict(reading),
            Self::Tuple => WeatherOutput::Tuple(reading.as_tuple()),
        }
    }
}

/// A rendered reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WeatherOutput {
    Table {
        columns: [&'static str; 5],
        data: Vec<[f64; 5]>,
    },
    Dict(WeatherReading),
    Tuple((f64, f64, f64, f64, f64)),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> WeatherReading {
        WeatherReading {
            temperature_f: 70.0,
            humidity_pct: 50.0,
            pressure_in: 14.7,
            wind_speed_mph: 4.0,
            precipitation_in: 0.0,
        }
    }

    #[test]
    fn parses_known_formats() {
        assert_eq!(WeatherFormat::parse("pd").unwrap(), WeatherFormat::Table);
        assert_eq!(WeatherFormat::parse("dict").unwrap(), WeatherFormat::Dict);
        assert_eq!(WeatherFormat::parse("tuple").unwrap(), WeatherFormat::Tuple);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = WeatherFormat::parse("xml").unwrap_err();
        assert!(matches!(err, WeatherError::Format { ref value } if value == "xml"));
    }

    #[test]
    fn dict_uses_column_names() {
        let json = serde_json::to_value(WeatherFormat::Dict.render(reading())).unwrap();
        assert_eq!(json["Temperature(F)"], 70.0);
        assert_eq!(json["Precipitation(in)"], 0.0);
    }

    #[test]
    fn tuple_is_ordered_array() {
        let json = serde_json::to_value(WeatherFormat::Tuple.render(reading())).unwrap();
        assert_eq!(json, serde_json::json!([70.0, 50.0, 14.7, 4.0, 0.0]));
    }

    #[test]
    fn table_has_one_row() {
        let json = serde_json::to_value(WeatherFormat::Table.render(reading())).unwrap();
        assert_eq!(json["columns"][1], "Humidity(%)");
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0][2], 14.7);
    }
}

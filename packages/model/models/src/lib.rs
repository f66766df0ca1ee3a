#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Prediction results and their output shapes.
//!
//! A [`PredictionTable`] is the row-for-row join of an [`IndexKey`] list with
//! the classifier's labels and probabilities. It can be rendered into any of
//! the [`OutputFormat`]s the API exposes, or written to CSV.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use accident_risk_features_models::IndexKey;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// `Start_Time` layout used when writing predictions.
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An output format name that is not one of the supported shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported output format {value:?}; expected one of: list, dict, pd")]
pub struct FormatError {
    pub value: String,
}

/// Shape of a rendered prediction result.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
pub enum OutputFormat {
    /// A list of row objects.
    #[default]
    #[strum(to_string = "list", serialize = "records")]
    Records,
    /// An object keyed by row position.
    #[strum(to_string = "dict", serialize = "index")]
    Indexed,
    /// Column-oriented arrays, one per field.
    #[strum(to_string = "pd", serialize = "table")]
    Table,
}

impl OutputFormat {
    /// Parses a format name, keeping the rejected value for the error.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if `value` is not a known format name.
    pub fn parse(value: &str) -> Result<Self, FormatError> {
        value.parse().map_err(|_| FormatError {
            value: value.to_string(),
        })
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Records, Self::Indexed, Self::Table]
    }
}

/// One prediction joined to its identifying index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(flatten)]
    pub index: IndexKey,
    /// Predicted class, 0 or 1.
    #[serde(rename = "Pred_Label")]
    pub label: u8,
    /// Probability of class 1.
    #[serde(rename = "Pred_Proba")]
    pub probability: f64,
}

/// A batch of predictions in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionTable {
    rows: Vec<Prediction>,
}

impl From<Vec<Prediction>> for PredictionTable {
    fn from(rows: Vec<Prediction>) -> Self {
        Self { rows }
    }
}

impl PredictionTable {
    #[must_use]
    pub fn rows(&self) -> &[Prediction] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Prediction> {
        self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows predicted as class 1.
    #[must_use]
    pub fn positives(&self) -> usize {
        self.rows.iter().filter(|p| p.label == 1).count()
    }

    /// Renders a copy of this table in the given shape.
    #[must_use]
    pub fn render(&self, format: OutputFormat) -> PredictionOutput {
        self.clone().into_output(format)
    }

    /// Renders this table in the given shape.
    #[must_use]
    pub fn into_output(self, format: OutputFormat) -> PredictionOutput {
        match format {
            OutputFormat::Records => PredictionOutput::Records(self.rows),
            OutputFormat::Indexed => {
                PredictionOutput::Indexed(self.rows.into_iter().enumerate().collect())
            }
            OutputFormat::Table => PredictionOutput::Table(self),
        }
    }

    fn has_zip_codes(&self) -> bool {
        self.rows.iter().any(|p| p.index.zip_code.is_some())
    }

    /// Writes the table as headed CSV.
    ///
    /// The `zip_code` column is only written when at least one row has one.
    ///
    /// # Errors
    ///
    /// Returns [`csv::Error`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let with_zip = self.has_zip_codes();
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["Start_Time", "Start_Lat", "Start_Lng"];
        if with_zip {
            header.push("zip_code");
        }
        header.extend(["Pred_Label", "Pred_Proba"]);
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![
                row.index
                    .start_time
                    .map(|t| t.format(START_TIME_FORMAT).to_string())
                    .unwrap_or_default(),
                row.index.latitude.to_string(),
                row.index.longitude.to_string(),
            ];
            if with_zip {
                record.push(row.index.zip_code.clone().unwrap_or_default());
            }
            record.push(row.label.to_string());
            record.push(row.probability.to_string());
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Writes the table to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`csv::Error`] if the file cannot be created or written.
    pub fn to_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

/// Column-oriented view used to serialize [`OutputFormat::Table`].
#[derive(Serialize)]
struct Columns<'a> {
    #[serde(rename = "Start_Time")]
    start_time: Vec<Option<NaiveDateTime>>,
    #[serde(rename = "Start_Lat")]
    latitude: Vec<f64>,
    #[serde(rename = "Start_Lng")]
    longitude: Vec<f64>,
    #[serde(rename = "zip_code", skip_serializing_if = "Option::is_none")]
    zip_code: Option<Vec<Option<&'a str>>>,
    #[serde(rename = "Pred_Label")]
    label: Vec<u8>,
    #[serde(rename = "Pred_Proba")]
    probability: Vec<f64>,
}

impl Serialize for PredictionTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows = &self.rows;
        Columns {
            start_time: rows.iter().map(|p| p.index.start_time).collect(),
            latitude: rows.iter().map(|p| p.index.latitude).collect(),
            longitude: rows.iter().map(|p| p.index.longitude).collect(),
            zip_code: self
                .has_zip_codes()
                .then(|| rows.iter().map(|p| p.index.zip_code.as_deref()).collect()),
            label: rows.iter().map(|p| p.label).collect(),
            probability: rows.iter().map(|p| p.probability).collect(),
        }
        .serialize(serializer)
    }
}

/// A rendered prediction result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    Records(Vec<Prediction>),
    Indexed(BTreeMap<usize, Prediction>),
    Table(PredictionTable),
}

impl PredictionOutput {
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        match self {
            Self::Records(_) => OutputFormat::Records,
            Self::Indexed(_) => OutputFormat::Indexed,
            Self::Table(_) => OutputFormat::Table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PredictionTable {
        let time = NaiveDateTime::parse_from_str("2022-03-14 08:00:00", START_TIME_FORMAT).unwrap();
        vec![
            Prediction {
                index: IndexKey::new(Some(time), 34.05, -118.24),
                label: 1,
                probability: 0.75,
            },
            Prediction {
                index: IndexKey::new(Some(time), 34.10, -118.30),
                label: 0,
                probability: 0.25,
            },
        ]
        .into()
    }

    #[test]
    fn parses_every_format_alias() {
        assert_eq!(OutputFormat::parse("list").unwrap(), OutputFormat::Records);
        assert_eq!(OutputFormat::parse("records").unwrap(), OutputFormat::Records);
        assert_eq!(OutputFormat::parse("dict").unwrap(), OutputFormat::Indexed);
        assert_eq!(OutputFormat::parse("index").unwrap(), OutputFormat::Indexed);
        assert_eq!(OutputFormat::parse("pd").unwrap(), OutputFormat::Table);
        assert_eq!(OutputFormat::parse("table").unwrap(), OutputFormat::Table);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = OutputFormat::parse("xml").unwrap_err();
        assert_eq!(err.value, "xml");
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn format_displays_canonical_name() {
        let names: Vec<String> = OutputFormat::all().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["list", "dict", "pd"]);
    }

    #[test]
    fn records_serialize_with_column_names() {
        let json = serde_json::to_value(table().render(OutputFormat::Records)).unwrap();
        let first = &json[0];
        assert_eq!(first["Start_Time"], "2022-03-14T08:00:00");
        assert_eq!(first["Pred_Label"], 1);
        assert_eq!(first["Pred_Proba"], 0.75);
        assert!(first.get("zip_code").is_none());
    }

    #[test]
    fn indexed_is_keyed_by_position() {
        let output = table().render(OutputFormat::Indexed);
        assert_eq!(output.format(), OutputFormat::Indexed);
        let json = serde_json::to_value(output).unwrap();
        assert_eq!(json["1"]["Pred_Label"], 0);
    }

    #[test]
    fn table_serializes_columns() {
        let json = serde_json::to_value(table().render(OutputFormat::Table)).unwrap();
        assert_eq!(json["Pred_Label"], serde_json::json!([1, 0]));
        assert_eq!(json["Start_Lat"][1], 34.10);
        assert!(json.get("zip_code").is_none());
    }

    #[test]
    fn csv_includes_zip_code_only_when_present() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Start_Time,Start_Lat,Start_Lng,Pred_Label,Pred_Proba")
        );
        assert_eq!(lines.next(), Some("2022-03-14 08:00:00,34.05,-118.24,1,0.75"));

        let rows: Vec<Prediction> = table()
            .into_rows()
            .into_iter()
            .map(|mut p| {
                p.index = p.index.with_zip_code("90012");
                p
            })
            .collect();
        let mut out = Vec::new();
        PredictionTable::from(rows).write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Start_Time,Start_Lat,Start_Lng,zip_code,"));
        assert!(text.contains(",90012,"));
    }
}

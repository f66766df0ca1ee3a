//! Column type inference and one-hot encoding for raw tables.
//!
//! Every column of a [`RawTable`] becomes one or more numeric columns:
//!
//! - numeric columns pass through unchanged,
//! - boolean columns (`True`/`False` in any case) become `1.0`/`0.0`,
//! - anything else is categorical and expands into one `<column>_<value>`
//!   indicator column per distinct value, sorted by value.
//!
//! Callers can force a column to be categorical even when its values look
//! numeric (the weekday index is the main case).

use std::collections::BTreeSet;

use accident_risk_features_models::{FEATURE_COUNT, Feature, FeatureVector};

use crate::{EncodeError, table::RawTable};

/// How a raw column is turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Categorical,
}

/// Parses a boolean cell.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Infers the kind of a column from its values.
///
/// An empty column is numeric.
pub fn infer_kind<'a>(mut values: impl Iterator<Item = &'a str> + Clone) -> ColumnKind {
    if values.clone().all(|v| v.trim().parse::<f64>().is_ok()) {
        ColumnKind::Numeric
    } else if values.all(|v| parse_bool(v).is_some()) {
        ColumnKind::Boolean
    } else {
        ColumnKind::Categorical
    }
}

/// A fully numeric table produced by [`encode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl EncodedTable {
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Selects the model columns in fitted order.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::MissingFeatures`] naming every model column
    /// this table does not contain.
    pub fn select_features(&self) -> Result<Vec<FeatureVector>, EncodeError> {
        let mut positions = [0_usize; FEATURE_COUNT];
        let mut missing = Vec::new();

        for feature in Feature::all() {
            match self.column_index(feature.as_ref()) {
                Some(i) => positions[feature.index()] = i,
                None => missing.push(feature.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(EncodeError::MissingFeatures { missing });
        }

        Ok(self
            .rows
            .iter()
            .map(|row| {
                let mut values = [0.0; FEATURE_COUNT];
                for (slot, &i) in values.iter_mut().zip(&positions) {
                    *slot = row[i];
                }
                FeatureVector::from_values(values)
            })
            .collect())
    }
}

/// One-hot encodes every column of `table`.
///
/// Plain columns keep their original relative order and the indicator
/// columns are appended after them, grouped by source column.
#[must_use]
pub fn encode(table: &RawTable, force_categorical: &[&str]) -> EncodedTable {
    let row_count = table.len();
    let mut columns = Vec::new();
    let mut plain: Vec<Vec<f64>> = Vec::new();
    let mut dummy_columns = Vec::new();
    let mut dummies: Vec<Vec<f64>> = Vec::new();

    for (index, header) in table.headers().iter().enumerate() {
        let kind = if force_categorical.contains(&header.as_str()) {
            ColumnKind::Categorical
        } else {
            infer_kind(table.column(index))
        };

        match kind {
            ColumnKind::Numeric => {
                columns.push(header.clone());
                plain.push(
                    table
                        .column(index)
                        .map(|v| v.trim().parse().unwrap_or(f64::NAN))
                        .collect(),
                );
            }
            ColumnKind::Boolean => {
                columns.push(header.clone());
                plain.push(
                    table
                        .column(index)
                        .map(|v| if parse_bool(v) == Some(true) { 1.0 } else { 0.0 })
                        .collect(),
                );
            }
            ColumnKind::Categorical => {
                let categories: BTreeSet<&str> = table.column(index).collect();
                log::trace!("One-hot encoding {header} into {} columns", categories.len());
                for category in categories {
                    dummy_columns.push(format!("{header}_{category}"));
                    dummies.push(
                        table
                            .column(index)
                            .map(|v| if v == category { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
        }
    }

    columns.extend(dummy_columns);
    plain.extend(dummies);

    let rows = (0..row_count)
        .map(|r| plain.iter().map(|column| column[r]).collect())
        .collect();

    EncodedTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(ToString::to_string).collect(),
            rows.iter()
                .map(|r| r.iter().map(ToString::to_string).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn infers_column_kinds() {
        assert_eq!(infer_kind(["1", "2.5", "-3"].into_iter()), ColumnKind::Numeric);
        assert_eq!(infer_kind(["True", "false"].into_iter()), ColumnKind::Boolean);
        assert_eq!(infer_kind(["R", "L"].into_iter()), ColumnKind::Categorical);
        assert_eq!(infer_kind(["True", "maybe"].into_iter()), ColumnKind::Categorical);
    }

    #[test]
    fn booleans_cast_to_ones_and_zeros() {
        let encoded = encode(&table(&["Junction"], &[&["True"], &["FALSE"]]), &[]);
        assert_eq!(encoded.columns, vec!["Junction"]);
        assert_eq!(encoded.rows, vec![vec![1.0], vec![0.0]]);
    }

    #[test]
    fn categoricals_expand_sorted() {
        let encoded = encode(
            &table(&["Side", "Start_Lat"], &[&["R", "34.0"], &["L", "35.0"], &["R", "36.0"]]),
            &[],
        );
        assert_eq!(encoded.columns, vec!["Start_Lat", "Side_L", "Side_R"]);
        assert_eq!(encoded.rows[0], vec![34.0, 0.0, 1.0]);
        assert_eq!(encoded.rows[1], vec![35.0, 1.0, 0.0]);
    }

    #[test]
    fn forced_categorical_numeric_column() {
        let encoded = encode(
            &table(&["Start_Day"], &[&["0"], &["6"], &["0"]]),
            &["Start_Day"],
        );
        assert_eq!(encoded.columns, vec!["Start_Day_0", "Start_Day_6"]);
        assert_eq!(encoded.rows[1], vec![0.0, 1.0]);
    }

    #[test]
    fn select_reports_every_missing_feature() {
        let encoded = encode(&table(&["Start_Lat"], &[&["34.0"]]), &[]);
        match encoded.select_features() {
            Err(EncodeError::MissingFeatures { missing }) => {
                assert_eq!(missing.len(), FEATURE_COUNT - 1);
                assert!(missing.contains(&"Start_Day_6".to_string()));
                assert!(!missing.contains(&"Start_Lat".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn select_orders_by_schema() {
        let mut headers: Vec<String> = Feature::names();
        headers.reverse();
        headers.push("Extra".to_string());
        let row: Vec<f64> = (0..=FEATURE_COUNT).map(|i| i as f64).collect();
        let encoded = EncodedTable {
            columns: headers,
            rows: vec![row],
        };

        let vectors = encoded.select_features().unwrap();
        assert_eq!(vectors.len(), 1);
        // Reversed input: Start_Lat was the last schema column, at position 19.
        assert!((vectors[0].get(Feature::StartLat) - 19.0).abs() < f64::EPSILON);
        assert!((vectors[0].get(Feature::StartDay6) - 0.0).abs() < f64::EPSILON);
    }
}

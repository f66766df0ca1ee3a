#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Great-circle distance and nearest-location matching.
//!
//! Points are [`geo::Point`]s in degrees with `x` = longitude and
//! `y` = latitude. Distances use the haversine formula on a sphere whose
//! radius depends on the requested [`Units`].

pub mod nearest;

pub use nearest::{Located, NearestMatch, NearestMatcher, nearest};

use geo::Point;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3956.0;

/// Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance unit system.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Units {
    /// Miles.
    #[default]
    Imperial,
    /// Kilometres.
    Metric,
}

impl Units {
    #[must_use]
    pub const fn earth_radius(self) -> f64 {
        match self {
            Self::Imperial => EARTH_RADIUS_MILES,
            Self::Metric => EARTH_RADIUS_KM,
        }
    }
}

/// Builds a point from latitude and longitude in degrees.
#[must_use]
pub fn point(latitude: f64, longitude: f64) -> Point<f64> {
    Point::new(longitude, latitude)
}

/// Haversine great-circle distance between two points.
#[must_use]
pub fn distance(a: Point<f64>, b: Point<f64>, units: Units) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = b.x().to_radians() - a.x().to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `h` just past 1 for antipodal points.
    2.0 * h.clamp(0.0, 1.0).sqrt().asin() * units.earth_radius()
}

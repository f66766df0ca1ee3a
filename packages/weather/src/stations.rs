//! Weather stations covering the service area.

use accident_risk_geography::{Located, Units, nearest, point};
use geo::Point;
use serde::Deserialize;

/// A ground weather station.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    pub id: String,
    pub icao: String,
    #[serde(default)]
    pub wmo: Option<String>,
    pub name: String,
    pub region: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Metres above sea level.
    pub elevation_m: f64,
}

impl Located for Station {
    fn location(&self) -> Point<f64> {
        point(self.latitude, self.longitude)
    }
}

#[derive(Debug, Deserialize)]
struct StationFile {
    stations: Vec<Station>,
}

const LOS_ANGELES_TOML: &str = include_str!("../stations/los_angeles.toml");

/// Returns every known station.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the file is embedded).
#[must_use]
pub fn all_stations() -> Vec<Station> {
    let file: StationFile = toml::de::from_str(LOS_ANGELES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse station list: {e}"));
    file.stations
}

/// The station nearest to a coordinate and its distance in miles.
#[must_use]
pub fn closest_station(latitude: f64, longitude: f64) -> Option<(Station, f64)> {
    let stations = all_stations();
    let found = nearest(point(latitude, longitude), &stations, Units::Imperial)?;
    Some((found.item.clone(), found.distance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_stations() {
        let stations = all_stations();
        assert_eq!(stations.len(), 3);
        assert!(stations.iter().all(|s| s.region == "CA"));
        assert_eq!(stations[0].icao, "KLAX");
        assert!(stations[1].wmo.is_none());
    }

    #[test]
    fn airport_is_closest_to_lax() {
        let (station, distance) = closest_station(33.94, -118.40).unwrap();
        assert_eq!(station.icao, "KLAX");
        assert!(distance < 2.0);
    }

    #[test]
    fn valley_query_picks_pacoima() {
        let (station, _) = closest_station(34.27, -118.42).unwrap();
        assert_eq!(station.icao, "KWHP");
    }
}

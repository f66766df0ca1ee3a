//! Locations database path from the environment.

use std::path::PathBuf;

/// Path used when `LOCATIONS_DB` is unset.
pub const DEFAULT_LOCATIONS_DB: &str = "locations.db";

/// Resolves the locations database path from `LOCATIONS_DB`.
#[must_use]
pub fn path_from_env() -> PathBuf {
    std::env::var("LOCATIONS_DB")
        .map_or_else(|_| PathBuf::from(DEFAULT_LOCATIONS_DB), PathBuf::from)
}

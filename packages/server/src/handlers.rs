//! HTTP handler functions for the accident risk API.

use accident_risk_database::queries;
use accident_risk_features::encoder::encode_query_records;
use accident_risk_features_models::{LocationRecord, QueryRecord, WeatherReading};
use accident_risk_model_models::OutputFormat;
use accident_risk_server_models::{ApiHealth, ApiStation, CoordinateParams, FormatParams};
use accident_risk_weather::WeatherFormat;
use accident_risk_weather::stations::closest_station;
use actix_web::{HttpResponse, web};

use crate::{ApiError, AppState};

/// `GET /`
///
/// Predictions for the bundled sample queries.
pub async fn index(
    state: web::Data<AppState>,
    params: web::Query<FormatParams>,
) -> Result<HttpResponse, ApiError> {
    let format = OutputFormat::parse(params.prediction_format())?;
    let sample = state
        .sample
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("No sample data loaded".to_string()))?;

    let predictions = state.classifier.predict_query(sample)?;
    Ok(HttpResponse::Ok().json(predictions.into_output(format)))
}

/// `GET /health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_trees: state.classifier.n_trees(),
        locations: state.locations.len(),
    })
}

/// `GET /predict/zip/{zip_code}`
///
/// Every known location in the zip code under the zip code's current
/// weather. Each record carries the zip code.
pub async fn predict_zip(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<FormatParams>,
) -> Result<HttpResponse, ApiError> {
    let format = OutputFormat::parse(params.prediction_format())?;
    let zip_code = path.into_inner();

    let locations = state
        .with_db_timeout(
            "zip code lookup",
            queries::get_model_data_by_zip(state.db.as_ref(), &zip_code),
        )
        .await?;
    if locations.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No known locations in zip code {zip_code}"
        )));
    }

    let weather = state.weather.by_zip(&zip_code).await?;
    predict_locations(&state, &locations, weather, Some(&zip_code), format)
}

/// `GET /predict/coords?lat=..&lon=..`
///
/// Uses the nearest known location as a template for road features, moved
/// to the requested coordinates, under the current weather there.
pub async fn predict_coords(
    state: web::Data<AppState>,
    params: web::Query<CoordinateParams>,
) -> Result<HttpResponse, ApiError> {
    let format = OutputFormat::parse(params.prediction_format())?;
    let (lat, lon) = validate_coordinates(params.lat, params.lon)?;

    let template = state
        .locations
        .find(lat, lon)
        .map(|m| {
            log::debug!(
                "Nearest known location to ({lat}, {lon}) is {:.3} miles away",
                m.distance
            );
            m.item.relocated(lat, lon)
        })
        .ok_or_else(|| ApiError::NotFound("No known locations to match against".to_string()))?;

    let weather = state.weather.by_coordinates(lat, lon).await?;
    predict_locations(&state, &[template], weather, None, format)
}

/// `GET /predict/all`
///
/// Every loaded location under the city forecast.
pub async fn predict_all(
    state: web::Data<AppState>,
    params: web::Query<FormatParams>,
) -> Result<HttpResponse, ApiError> {
    let format = OutputFormat::parse(params.prediction_format())?;
    let weather = state.weather.city_forecast().await?;
    predict_locations(&state, state.locations.candidates(), weather, None, format)
}

/// `GET /zip_codes`
pub async fn zip_codes(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let zips = state
        .with_db_timeout("zip code list", queries::get_all_zip_codes(state.db.as_ref()))
        .await?;
    Ok(HttpResponse::Ok().json(zips))
}

/// `GET /weather?lat=..&lon=..`
///
/// Current weather at a coordinate in the requested weather format.
pub async fn weather(
    state: web::Data<AppState>,
    params: web::Query<CoordinateParams>,
) -> Result<HttpResponse, ApiError> {
    let format = WeatherFormat::parse(params.weather_format())?;
    let (lat, lon) = validate_coordinates(params.lat, params.lon)?;

    let reading = state.weather.by_coordinates(lat, lon).await?;
    Ok(HttpResponse::Ok().json(format.render(reading)))
}

/// `GET /stations/closest?lat=..&lon=..`
pub async fn closest_weather_station(
    params: web::Query<CoordinateParams>,
) -> Result<HttpResponse, ApiError> {
    let (lat, lon) = validate_coordinates(params.lat, params.lon)?;

    let (station, distance_miles) = closest_station(lat, lon)
        .ok_or_else(|| ApiError::NotFound("No weather stations configured".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiStation {
        id: station.id,
        icao: station.icao,
        wmo: station.wmo,
        name: station.name,
        region: station.region,
        timezone: station.timezone,
        latitude: station.latitude,
        longitude: station.longitude,
        elevation_m: station.elevation_m,
        distance_miles,
    }))
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<(f64, f64), ApiError> {
    if !(lat.is_finite() && (-90.0..=90.0).contains(&lat)) {
        return Err(ApiError::Data(format!("Latitude out of range: {lat}")));
    }
    if !(lon.is_finite() && (-180.0..=180.0).contains(&lon)) {
        return Err(ApiError::Data(format!("Longitude out of range: {lon}")));
    }
    Ok((lat, lon))
}

/// Encodes each location with `weather` at the current local time and
/// predicts them as one batch.
fn predict_locations(
    state: &AppState,
    locations: &[LocationRecord],
    weather: WeatherReading,
    zip_code: Option<&str>,
    format: OutputFormat,
) -> Result<HttpResponse, ApiError> {
    let start_time = chrono::Local::now().naive_local();
    let records: Vec<QueryRecord> = locations
        .iter()
        .map(|location| QueryRecord {
            location: location.clone(),
            weather,
            start_time,
        })
        .collect();

    let mut query = encode_query_records(&records)?;
    if let Some(zip_code) = zip_code {
        query = query.with_zip_code(zip_code);
    }

    let predictions = state.classifier.predict_query(&query)?;
    log::debug!(
        "Predicted {} locations, {} positive",
        predictions.len(),
        predictions.positives()
    );
    Ok(HttpResponse::Ok().json(predictions.into_output(format)))
}

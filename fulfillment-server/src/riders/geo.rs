//! Great-circle distance and coordinate checks

use shared::models::RiderProfile;

use crate::utils::{AppError, AppResult, ErrorCode};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two (lat, lon) points in degrees
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Latitude in [-90, 90], longitude in [-180, 180], both finite
pub fn validate_coordinates(latitude: f64, longitude: f64) -> AppResult<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::field_error(
            ErrorCode::InvalidCoordinates,
            "latitude",
            format!("must be between -90 and 90, got {latitude}"),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::field_error(
            ErrorCode::InvalidCoordinates,
            "longitude",
            format!("must be between -180 and 180, got {longitude}"),
        ));
    }
    Ok(())
}

/// Riders with a location, nearest first
///
/// Equal distances go to the rider whose location is freshest.
pub fn rank_by_distance(riders: Vec<RiderProfile>, target: (f64, f64)) -> Vec<(RiderProfile, f64)> {
    let mut ranked: Vec<(RiderProfile, f64)> = riders
        .into_iter()
        .filter_map(|rider| {
            let distance = haversine_km(rider.location()?, target);
            Some((rider, distance))
        })
        .collect();

    ranked.sort_by(|(a, da), (b, db)| {
        da.total_cmp(db)
            .then_with(|| b.last_location_update.cmp(&a.last_location_update))
    });
    ranked
}

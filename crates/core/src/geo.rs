use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates via the haversine
/// formula.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusCheck {
    pub distance_km: f64,
    pub is_within_radius: bool,
}

pub fn validate_radius(
    store_lat: f64,
    store_lng: f64,
    point_lat: f64,
    point_lng: f64,
    max_radius_km: f64,
) -> RadiusCheck {
    let distance_km = haversine_km(store_lat, store_lng, point_lat, point_lng);
    RadiusCheck { distance_km, is_within_radius: distance_km <= max_radius_km }
}

#[cfg(test)]
mod tests {
    use super::{haversine_km, validate_radius};

    #[test]
    fn zero_distance_to_itself() {
        assert_eq!(haversine_km(-23.5505, -46.6333, -23.5505, -46.6333), 0.0);
    }

    #[test]
    fn sao_paulo_to_rio_is_about_357_km() {
        let d = haversine_km(-23.5505, -46.6333, -22.9068, -43.1729);
        assert!((d - 357.0).abs() < 5.0, "got {d} km");
    }

    #[test]
    fn point_beyond_radius_is_rejected() {
        // ~12 km north of the store against a 10 km radius.
        let check = validate_radius(-23.5505, -46.6333, -23.4425, -46.6333, 10.0);
        assert!(!check.is_within_radius);
        assert!(check.distance_km > 10.0);
    }

    #[test]
    fn point_on_the_radius_boundary_is_accepted() {
        let check = validate_radius(-23.5505, -46.6333, -23.5505, -46.6333, 0.0);
        assert!(check.is_within_radius);
    }
}

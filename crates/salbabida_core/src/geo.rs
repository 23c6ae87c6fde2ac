//! crates/salbabida_core/src/geo.rs
//!
//! Great-circle distance on a spherical Earth.

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Haversine distance in kilometres between two points given in degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_POINTS: [(f64, f64); 6] = [
        (13.6252, 123.1826),
        (14.5995, 120.9842),
        (10.3157, 123.8854),
        (-33.8688, 151.2093),
        (0.0, 0.0),
        (89.9, -179.9),
    ];

    #[test]
    fn distance_to_the_same_point_is_zero() {
        for (lat, lon) in SAMPLE_POINTS {
            assert_eq!(distance_km(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        for (lat1, lon1) in SAMPLE_POINTS {
            for (lat2, lon2) in SAMPLE_POINTS {
                let there = distance_km(lat1, lon1, lat2, lon2);
                let back = distance_km(lat2, lon2, lat1, lon1);
                let tolerance = 1e-6 * there.abs().max(1.0);
                assert!((there - back).abs() <= tolerance, "{there} vs {back}");
            }
        }
    }

    #[test]
    fn manila_to_cebu_is_about_570_km() {
        let d = distance_km(14.5995, 120.9842, 10.3157, 123.8854);
        assert!((d - 571.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn small_offsets_match_the_nearest_shelter_scenario() {
        let d = Coordinates::new(13.0, 123.0).distance_to(&Coordinates::new(13.01, 123.01));
        // 0.01 degree on both axes at 13N: 1.112 km north, 1.083 km east.
        assert!((d - 1.55).abs() < 0.05, "got {d}");
    }

    #[test]
    fn validity_rejects_out_of_range_and_nan() {
        assert!(Coordinates::new(13.0, 123.0).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, 181.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}

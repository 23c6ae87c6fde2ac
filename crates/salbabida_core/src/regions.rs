//! crates/salbabida_core/src/regions.rs
//!
//! Philippine provinces and cities the user can pick as their region, with the
//! coordinates the map centres on.

use std::sync::LazyLock;

use crate::domain::HomeLocation;
use crate::geo::Coordinates;

/// Region used when none has been chosen yet.
pub const DEFAULT_REGION: &str = "Camarines Sur";

/// City the weather screen falls back to when neither a weather override nor
/// a region is set.
pub const DEFAULT_WEATHER_CITY: &str = "Sorsogon City";

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl Region {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

const fn region(name: &'static str, latitude: f64, longitude: f64) -> Region {
    Region {
        name,
        latitude,
        longitude,
    }
}

const REGION_TABLE: &[Region] = &[
    // Bicol
    region("Camarines Sur", 13.6252, 123.1826),
    region("Camarines Norte", 14.1389, 122.7632),
    region("Albay", 13.1775, 123.5280),
    region("Sorsogon", 12.9742, 124.0058),
    region("Masbate", 12.3675, 123.6196),
    region("Catanduanes", 13.7089, 124.2422),
    // Metro Manila
    region("Metro Manila", 14.5995, 120.9842),
    // Luzon
    region("Batangas", 13.7565, 121.0583),
    region("Laguna", 14.2691, 121.4113),
    region("Cavite", 14.2456, 120.8786),
    region("Rizal", 14.6037, 121.3084),
    region("Bulacan", 14.7942, 120.8799),
    region("Pampanga", 15.0794, 120.6200),
    region("Zambales", 15.5082, 119.9698),
    region("Pangasinan", 15.8949, 120.2863),
    region("La Union", 16.6159, 120.3209),
    region("Ilocos Sur", 17.2280, 120.5740),
    region("Ilocos Norte", 18.1647, 120.7116),
    region("Cagayan", 17.6132, 121.7270),
    region("Isabela", 16.9754, 121.8107),
    region("Nueva Vizcaya", 16.3301, 121.1710),
    region("Quirino", 16.2900, 121.5370),
    region("Aurora", 15.9784, 121.6323),
    region("Nueva Ecija", 15.5784, 121.1113),
    region("Tarlac", 15.4755, 120.5963),
    // Visayas
    region("Cebu", 10.3157, 123.8854),
    region("Bohol", 9.8500, 124.0000),
    region("Leyte", 10.3725, 124.9815),
    region("Samar", 11.5930, 125.0250),
    region("Iloilo", 10.7202, 122.5621),
    region("Negros Occidental", 10.4113, 123.0438),
    region("Negros Oriental", 9.3092, 123.3051),
    region("Aklan", 11.8166, 122.0942),
    region("Capiz", 11.5530, 122.7405),
    region("Antique", 11.3682, 121.9497),
    region("Guimaras", 10.5894, 122.6277),
    // Mindanao
    region("Davao del Sur", 6.7674, 125.3593),
    region("Davao del Norte", 7.5619, 125.6549),
    region("Davao Oriental", 7.3172, 126.5420),
    region("Davao Occidental", 6.1055, 125.6083),
    region("Davao de Oro", 7.3117, 126.1747),
    region("Zamboanga del Sur", 7.8383, 123.2968),
    region("Zamboanga del Norte", 8.1527, 123.2577),
    region("Zamboanga Sibugay", 7.5222, 122.8198),
    region("Bukidnon", 8.0515, 125.0980),
    region("Misamis Oriental", 8.5046, 124.6220),
    region("Misamis Occidental", 8.3375, 123.7071),
    region("Lanao del Norte", 8.0730, 123.8857),
    region("Lanao del Sur", 7.8232, 124.4365),
    region("South Cotabato", 6.2969, 124.8533),
    region("North Cotabato", 7.1436, 124.8511),
    region("Sultan Kudarat", 6.5069, 124.4198),
    region("Sarangani", 5.9263, 125.2880),
    region("General Santos", 6.1164, 125.1716),
    region("Agusan del Norte", 8.9456, 125.5319),
    region("Agusan del Sur", 8.1527, 126.0165),
    region("Surigao del Norte", 9.7877, 125.4960),
    region("Surigao del Sur", 8.7512, 126.1378),
    region("Dinagat Islands", 10.1280, 125.6082),
    // Palawan
    region("Palawan", 9.8349, 118.7384),
];

static REGIONS: LazyLock<Vec<Region>> = LazyLock::new(|| {
    let mut regions = REGION_TABLE.to_vec();
    regions.sort_by(|a, b| a.name.cmp(b.name));
    regions
});

/// Every known region, sorted by name.
pub fn all_regions() -> &'static [Region] {
    &REGIONS
}

/// Case-insensitive lookup by name.
pub fn find_by_name(name: &str) -> Option<&'static Region> {
    let name = name.trim();
    all_regions()
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(name))
}

pub fn default_region() -> &'static Region {
    find_by_name(DEFAULT_REGION).unwrap_or(&all_regions()[0])
}

/// Where the map opens: the saved home, else the user's own coordinates,
/// else the centre of the selected region (or the default region).
pub fn resolve_map_center(
    home: Option<&HomeLocation>,
    user_location: Option<Coordinates>,
    selected_region: Option<&str>,
) -> Coordinates {
    if let Some(home) = home {
        return home.coordinates();
    }
    if let Some(location) = user_location {
        return location;
    }
    selected_region
        .and_then(find_by_name)
        .unwrap_or_else(default_region)
        .coordinates()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn regions_are_sorted_and_unique() {
        let names: Vec<&str> = all_regions().iter().map(|r| r.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert_eq!(names.first(), Some(&"Agusan del Norte"));
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        assert_eq!(find_by_name(" metro manila ").map(|r| r.name), Some("Metro Manila"));
        assert!(find_by_name("Atlantis").is_none());
    }

    #[test]
    fn default_region_is_camarines_sur() {
        let region = default_region();
        assert_eq!(region.name, "Camarines Sur");
        assert_eq!(region.coordinates(), Coordinates::new(13.6252, 123.1826));
    }

    #[test]
    fn map_center_prefers_home_then_user_then_region() {
        let home = HomeLocation {
            id: Uuid::new_v4(),
            latitude: 13.0,
            longitude: 123.0,
            is_house: true,
            name: "My Home".to_string(),
            created_at: Utc::now(),
        };
        let user = Some(Coordinates::new(14.0, 121.0));

        assert_eq!(resolve_map_center(Some(&home), user, Some("Cebu")), Coordinates::new(13.0, 123.0));
        assert_eq!(resolve_map_center(None, user, Some("Cebu")), Coordinates::new(14.0, 121.0));
        assert_eq!(resolve_map_center(None, None, Some("Cebu")), Coordinates::new(10.3157, 123.8854));
        assert_eq!(resolve_map_center(None, None, Some("Unknown")), default_region().coordinates());
    }
}

// Travel dataset: countries keyed by ISO 3166-1 alpha-3 code, each carrying
// an ordered visit history. The visited-code set used to paint the map is by
// definition the key set of this dataset.
use std::fs;
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// One stay in a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelVisit {
    pub id: String,
    pub city: String,
    pub date_range: String,
    pub purpose: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Display name plus the visit history, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryTravel {
    pub country_name: String,
    #[serde(default)]
    pub visits: Vec<TravelVisit>,
}

/// The whole dataset, keyed by alpha-3 code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TravelData(pub FxHashMap<String, CountryTravel>);

impl TravelData {
    pub fn country(&self, code: &str) -> Option<&CountryTravel> {
        self.0.get(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exactly the key set; the paint layers and the selection controller
    /// both key off this.
    pub fn visited_codes(&self) -> FxHashSet<String> {
        self.0.keys().cloned().collect()
    }

    /// Load a dataset from a JSON file (the `--data` override).
    pub fn load_json(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let data: TravelData = serde_json::from_str(&content)?;
        data.warn_on_malformed_codes();
        Ok(data)
    }

    /// Alpha-3 codes are three ASCII uppercase letters; anything else will
    /// never join against the boundary geometry, so flag it early.
    pub fn warn_on_malformed_codes(&self) {
        for code in self.0.keys() {
            if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
                log::warn!("travel dataset key {code:?} is not an ISO alpha-3 code");
            }
        }
    }

    /// Build the dataset from remote table rows: visits are joined on
    /// `country_code`, kept in `sort_order`, and rows pointing at an unknown
    /// country are dropped.
    pub fn from_rows(countries: Vec<CountryRow>, mut visits: Vec<VisitRow>) -> Self {
        visits.sort_by_key(|v| v.sort_order);
        let mut data: FxHashMap<String, CountryTravel> = countries
            .into_iter()
            .map(|c| {
                (c.code, CountryTravel { country_name: c.country_name, visits: Vec::new() })
            })
            .collect();
        for visit in visits {
            if let Some(country) = data.get_mut(&visit.country_code) {
                country.visits.push(visit.into_visit());
            } else {
                log::warn!("dropping visit {} for unknown country {}", visit.id, visit.country_code);
            }
        }
        let data = TravelData(data);
        data.warn_on_malformed_codes();
        data
    }
}

// --- Remote table rows (snake_case, as stored) ---

#[derive(Debug, Clone, Deserialize)]
pub struct CountryRow {
    pub code: String,
    pub country_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitRow {
    pub id: String,
    pub country_code: String,
    pub city: String,
    pub date_range: String,
    pub purpose: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl VisitRow {
    fn into_visit(self) -> TravelVisit {
        TravelVisit {
            id: self.id,
            city: self.city,
            date_range: self.date_range,
            purpose: self.purpose,
            category: self.category,
            description: self.description,
            highlights: self.highlights,
            image_url: self.image_url,
        }
    }
}

// --- Bundled fallback ---

fn visit(
    id: &str,
    city: &str,
    date_range: &str,
    purpose: &str,
    category: &str,
    description: &str,
    highlights: &[&str],
) -> TravelVisit {
    TravelVisit {
        id: id.to_owned(),
        city: city.to_owned(),
        date_range: date_range.to_owned(),
        purpose: purpose.to_owned(),
        category: category.to_owned(),
        description: description.to_owned(),
        highlights: highlights.iter().map(|h| (*h).to_owned()).collect(),
        image_url: None,
    }
}

/// The dataset shipped with the binary, used until (and unless) the remote
/// store supersedes it.
pub fn fallback() -> TravelData {
    let mut data = FxHashMap::default();
    data.insert(
        "LUX".to_owned(),
        CountryTravel {
            country_name: "Luxembourg".to_owned(),
            visits: vec![visit(
                "luxembourg-2024",
                "Luxembourg City",
                "Jan 2024",
                "Swimming Competition",
                "sports",
                "Competed in the 2024 Euro Meet in Luxembourg City. Placed 3rd in the 200m butterfly.",
                &["Public Transportation", "Biking", "McDonalds", "Castles"],
            )],
        },
    );
    data.insert(
        "JAM".to_owned(),
        CountryTravel {
            country_name: "Jamaica".to_owned(),
            visits: vec![visit(
                "jamaica-2024",
                "Kingston",
                "Dec 2023 - Jan 2024",
                "University Training Camp",
                "education",
                "Varsity Swim Team Training Camp",
                &["Jamaican Patties", "Soccer on the Beach", "Brawl Stars on the Bus"],
            )],
        },
    );
    data.insert(
        "CHL".to_owned(),
        CountryTravel {
            country_name: "Chile".to_owned(),
            visits: vec![visit(
                "santiago-2023",
                "Santiago",
                "Nov 2023",
                "Swimming Competition",
                "sports",
                "Competed in the 2023 Pan American Games in Santiago, Chile. Placed 5th in the 200m butterfly.",
                &["Lulu Merch", "Brawl Stars", "Part I wasn't Sick"],
            )],
        },
    );
    data.insert(
        "ISR".to_owned(),
        CountryTravel {
            country_name: "Israel".to_owned(),
            visits: vec![visit(
                "netanya-2023",
                "Netanya",
                "Sept 2023",
                "Swimming Competition",
                "sports",
                "Competed in the 2023 World Junior Swimming Championships in Netanya, Israel. Placed 7th in the 200m butterfly.",
                &["Racing", "Chinese Team", "Hotel", "Shabbat"],
            )],
        },
    );
    data.insert(
        "ESP".to_owned(),
        CountryTravel {
            country_name: "Spain".to_owned(),
            visits: vec![visit(
                "barcelona-2023",
                "Barcelona",
                "Aug 2023",
                "Staging Camp",
                "sports",
                "World Junior Championship staging camp.",
                &["Exploring", "Training", "Geometry Dash", "Teammates"],
            )],
        },
    );
    TravelData(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visited_codes_are_exactly_the_key_set() {
        let data = fallback();
        let codes = data.visited_codes();
        assert_eq!(codes.len(), data.len());
        for code in data.0.keys() {
            assert!(codes.contains(code));
        }
        assert!(codes.contains("LUX"));
        assert!(codes.contains("JAM"));
        assert!(!codes.contains("FRA"));
    }

    #[test]
    fn fallback_codes_are_well_formed() {
        for code in fallback().0.keys() {
            assert_eq!(code.len(), 3);
            assert!(code.bytes().all(|b| b.is_ascii_uppercase()), "bad code {code}");
        }
    }

    fn country_row(code: &str, name: &str) -> CountryRow {
        CountryRow { code: code.to_owned(), country_name: name.to_owned() }
    }

    fn visit_row(id: &str, code: &str, sort_order: i64) -> VisitRow {
        VisitRow {
            id: id.to_owned(),
            country_code: code.to_owned(),
            city: "City".to_owned(),
            date_range: "2024".to_owned(),
            purpose: "Trip".to_owned(),
            category: "leisure".to_owned(),
            description: String::new(),
            highlights: Vec::new(),
            image_url: None,
            sort_order,
        }
    }

    #[test]
    fn rows_are_joined_and_ordered() {
        let countries = vec![country_row("LUX", "Luxembourg"), country_row("JAM", "Jamaica")];
        let visits = vec![
            visit_row("second", "LUX", 2),
            visit_row("first", "LUX", 1),
            visit_row("kingston", "JAM", 1),
        ];
        let data = TravelData::from_rows(countries, visits);

        let lux = data.country("LUX").unwrap();
        assert_eq!(lux.country_name, "Luxembourg");
        let ids: Vec<&str> = lux.visits.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
        assert_eq!(data.country("JAM").unwrap().visits.len(), 1);
    }

    #[test]
    fn orphan_visits_are_dropped() {
        let countries = vec![country_row("LUX", "Luxembourg")];
        let visits = vec![visit_row("v", "FRA", 1)];
        let data = TravelData::from_rows(countries, visits);
        assert_eq!(data.len(), 1);
        assert!(data.country("LUX").unwrap().visits.is_empty());
        // the consistency invariant survives the bad row
        assert_eq!(data.visited_codes().len(), 1);
    }

    #[test]
    fn countries_without_visits_stay_in_the_dataset() {
        let countries = vec![country_row("FRA", "France")];
        let data = TravelData::from_rows(countries, Vec::new());
        assert!(data.visited_codes().contains("FRA"));
        assert!(data.country("FRA").unwrap().visits.is_empty());
    }

    #[test]
    fn dataset_round_trips_through_json() {
        let data = fallback();
        let json = serde_json::to_string(&data).unwrap();
        let parsed: TravelData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, data);
    }
}

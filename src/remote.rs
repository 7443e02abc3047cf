// Read-only fetch of the hosted travel tables. One background thread, one
// message: the mapped dataset, delivered only if it is non-empty and the map
// is still alive. Anything else keeps the bundled data in effect.
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use serde::de::DeserializeOwned;

use crate::config::RemoteConfig;
use crate::map::Alive;
use crate::travel::{CountryRow, TravelData, VisitRow};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Kick off the one-shot dataset fetch. Returns None when no remote store is
/// configured.
pub fn spawn_fetch(
    remote: &RemoteConfig,
    alive: Alive,
    egui_ctx: eframe::egui::Context,
) -> Option<Receiver<TravelData>> {
    let url = remote.url.clone()?;
    let api_key = remote.api_key.clone();
    let (tx, rx) = bounded(1);

    thread::spawn(move || {
        match fetch_dataset(&url, api_key.as_deref()) {
            Ok(data) if data.is_empty() => {
                log::warn!("remote store returned no countries; keeping bundled data");
            }
            Ok(data) => {
                if alive.check() {
                    let _ = tx.send(data);
                    egui_ctx.request_repaint();
                }
            }
            Err(err) => {
                log::warn!("travel data fetch failed ({err:#}); keeping bundled data");
            }
        }
    });

    Some(rx)
}

fn fetch_dataset(base: &str, api_key: Option<&str>) -> anyhow::Result<TravelData> {
    let base = base.trim_end_matches('/');
    let countries: Vec<CountryRow> =
        get_json(&format!("{base}/rest/v1/countries?select=*"), api_key)?;
    let visits: Vec<VisitRow> =
        get_json(&format!("{base}/rest/v1/visits?select=*&order=sort_order"), api_key)?;
    Ok(TravelData::from_rows(countries, visits))
}

fn get_json<T: DeserializeOwned>(url: &str, api_key: Option<&str>) -> anyhow::Result<T> {
    let mut request = ureq::get(url)
        .timeout(FETCH_TIMEOUT)
        .set("Accept", "application/json");
    if let Some(key) = api_key {
        request = request
            .set("apikey", key)
            .set("Authorization", &format!("Bearer {key}"));
    }
    let body = request.call()?.into_string()?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_is_skipped_without_a_configured_url() {
        let remote = RemoteConfig::default();
        let ctx = eframe::egui::Context::default();
        assert!(spawn_fetch(&remote, Alive::new(), ctx).is_none());
    }

    #[test]
    fn row_payloads_decode() {
        let countries: Vec<CountryRow> =
            serde_json::from_str(r#"[{"code": "LUX", "country_name": "Luxembourg"}]"#).unwrap();
        let visits: Vec<VisitRow> = serde_json::from_str(
            r#"[{
                "id": "luxembourg-2024",
                "country_code": "LUX",
                "city": "Luxembourg City",
                "date_range": "Jan 2024",
                "purpose": "Swimming Competition",
                "category": "sports",
                "description": "Euro Meet",
                "highlights": ["Castles"],
                "image_url": null,
                "sort_order": 1
            }]"#,
        )
        .unwrap();
        let data = TravelData::from_rows(countries, visits);
        assert_eq!(data.country("LUX").unwrap().visits[0].city, "Luxembourg City");
    }
}

use crate::adapters::ForecastSource;
use crate::error::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Areas and formulas known to the forecasting service.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub areas: Vec<String>,
    pub formulas: Vec<String>,
    /// Formulas with sales data per area. An area whose lookup failed is
    /// missing here and uses `formulas`.
    pub area_formulas: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    pub fn formulas_for(&self, area: &str) -> Vec<String> {
        self.area_formulas
            .get(area)
            .unwrap_or(&self.formulas)
            .clone()
    }

    pub fn areas_for(&self, _formula: &str) -> Vec<String> {
        self.areas.clone()
    }
}

/// Fetches the area and formula lists together, then every area's own
/// formula list in parallel. The first two are required; a failed per-area
/// lookup only means that area falls back to the global list. An area that
/// lists no formulas keeps its empty list.
pub async fn load_metadata<S>(source: &S) -> Result<Metadata>
where
    S: ForecastSource + ?Sized,
{
    let (areas, formulas) = futures::try_join!(source.areas(), source.formulas(None))?;
    log::info!(
        "loaded metadata: {} areas, {} formulas",
        areas.len(),
        formulas.len()
    );

    let lookups = join_all(areas.iter().map(|area| async move {
        let result = source.formulas(Some(area.as_str())).await;
        (area, result)
    }))
    .await;

    let mut area_formulas = BTreeMap::new();
    for (area, result) in lookups {
        match result {
            Ok(list) => {
                if list.is_empty() {
                    log::debug!("no formulas listed for area {}", area);
                }
                area_formulas.insert(area.clone(), list);
            }
            Err(e) => log::warn!("failed to fetch formulas for area {}: {}", area, e),
        }
    }

    Ok(Metadata {
        areas,
        formulas,
        area_formulas,
    })
}

//! Building the list of units a run works through

use super::unit::UnitKey;
use crate::storage::{ArtifactStore, Stage, StorageResult};
use crate::url::Domain;
use std::collections::BTreeSet;

/// Every (domain, crawler, extractor) combination, sorted and de-duplicated
pub fn plan_matrix(domains: &[Domain], crawlers: &[String], extractors: &[String]) -> Vec<UnitKey> {
    let mut units = BTreeSet::new();
    for domain in domains {
        for crawler in crawlers {
            for extractor in extractors {
                units.insert(UnitKey::new(domain, crawler, extractor));
            }
        }
    }
    units.into_iter().collect()
}

/// Restricts the units found in an artifact store
///
/// Empty allowlists accept everything.
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    pub domain: Option<Domain>,
    pub crawlers: Vec<String>,
    pub extractors: Vec<String>,
}

impl PlanFilter {
    pub fn accepts(&self, unit: &UnitKey) -> bool {
        let domain_ok = self
            .domain
            .as_ref()
            .map_or(true, |d| d.site_key() == unit.domain.site_key());
        let crawler_ok = self.crawlers.is_empty() || self.crawlers.contains(&unit.crawler);
        let extractor_ok = self.extractors.is_empty() || self.extractors.contains(&unit.extractor);
        domain_ok && crawler_ok && extractor_ok
    }
}

/// Units with a stored extraction, for replaying a previous run
pub fn plan_from_store(
    store: &dyn ArtifactStore,
    filter: &PlanFilter,
) -> StorageResult<Vec<UnitKey>> {
    let units: BTreeSet<UnitKey> = store
        .list_keys(Stage::Extract)?
        .into_iter()
        .filter_map(|key| {
            let extractor = key.extractor?;
            Some(UnitKey::new(&key.domain, &key.crawler, &extractor))
        })
        .filter(|unit| filter.accepts(unit))
        .collect();

    tracing::debug!("Planned {} units from stored extractions", units.len());
    Ok(units.into_iter().collect())
}

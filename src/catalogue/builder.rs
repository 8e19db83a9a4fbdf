use crate::model::{Addon, Catalogue, CatalogueSpec, Source, CATALOGUE_SPEC_VERSION};
use chrono::{DateTime, Utc};

/// Today's date as stamped into a catalogue header
pub fn datestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Builds a catalogue from merged addons
///
/// An empty `sources` slice keeps every addon. The list is sorted by source
/// id, which changes less often than the slugified name.
pub fn build_catalogue(addons: Vec<Addon>, sources: &[Source]) -> Catalogue {
    build_catalogue_at(addons, sources, Utc::now())
}

pub fn build_catalogue_at(addons: Vec<Addon>, sources: &[Source], now: DateTime<Utc>) -> Catalogue {
    let mut addons: Vec<Addon> = addons
        .into_iter()
        .filter(|addon| sources.is_empty() || sources.contains(&addon.source))
        .collect();

    addons.sort_by(|a, b| {
        a.source_id
            .cmp(&b.source_id)
            .then_with(|| a.source.cmp(&b.source))
    });

    Catalogue {
        spec: CatalogueSpec {
            version: CATALOGUE_SPEC_VERSION,
        },
        datestamp: datestamp(now),
        total: addons.len(),
        addon_summary_list: addons,
    }
}

/// Keeps addons matching `predicate`; header preserved, total recomputed
pub fn filter_catalogue<P>(catalogue: &Catalogue, predicate: P) -> Catalogue
where
    P: Fn(&Addon) -> bool,
{
    let addons: Vec<Addon> = catalogue
        .addon_summary_list
        .iter()
        .filter(|addon| predicate(addon))
        .cloned()
        .collect();

    Catalogue {
        spec: catalogue.spec,
        datestamp: catalogue.datestamp.clone(),
        total: addons.len(),
        addon_summary_list: addons,
    }
}

/// Keeps addons updated strictly after `cutoff`
pub fn shorten_catalogue(catalogue: &Catalogue, cutoff: DateTime<Utc>) -> Catalogue {
    filter_catalogue(catalogue, |addon| addon.updated_date > cutoff)
}

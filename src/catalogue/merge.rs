//! Consolidation of partial records into one addon
//!
//! Records are folded in origin order (listing, web detail, API file list,
//! API detail), ties broken by resource URL. A present scalar overwrites the
//! running value; track and tag sets are unioned. A download count of zero
//! counts as "no data".

use crate::model::{Addon, GameTrack, Identity, PartialRecord};
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
struct Fold {
    name: Option<String>,
    label: Option<String>,
    description: Option<String>,
    url: Option<String>,
    updated_date: Option<chrono::DateTime<chrono::Utc>>,
    created_date: Option<chrono::DateTime<chrono::Utc>>,
    download_count: Option<u64>,
    game_tracks: BTreeSet<GameTrack>,
    tags: BTreeSet<String>,
    releases: Vec<crate::model::Release>,
}

fn overwrite(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
        *slot = Some(value.clone());
    }
}

/// Merges every observation of one addon
///
/// Returns `None` when the folded addon cannot be placed in a catalogue:
/// no updated date, or an empty name, label or url.
pub fn merge(identity: &Identity, mut records: Vec<PartialRecord>) -> Option<Addon> {
    records.retain(|r| &r.identity == identity);
    if records.is_empty() {
        return None;
    }

    records.sort_by(|a, b| {
        a.origin
            .cmp(&b.origin)
            .then_with(|| a.resource_url.cmp(&b.resource_url))
    });

    let mut fold = Fold::default();
    for record in &records {
        overwrite(&mut fold.name, &record.name);
        overwrite(&mut fold.label, &record.label);
        overwrite(&mut fold.description, &record.description);
        overwrite(&mut fold.url, &record.url);

        if record.updated_date.is_some() {
            fold.updated_date = record.updated_date;
        }
        if record.created_date.is_some() {
            fold.created_date = record.created_date;
        }
        if let Some(count) = record.download_count.filter(|c| *c > 0) {
            fold.download_count = Some(count);
        }

        fold.game_tracks.extend(record.game_tracks.iter().copied());
        fold.tags.extend(record.tags.iter().cloned());

        if !record.releases.is_empty() {
            fold.releases = record.releases.clone();
        }
    }

    let updated_date = match fold.updated_date {
        Some(date) if date.timestamp() != 0 => date,
        _ => {
            tracing::debug!(identity = %identity, "Dropping addon without an updated date");
            return None;
        }
    };

    let mut game_track_list: Vec<GameTrack> = fold.game_tracks.into_iter().collect();
    if game_track_list.is_empty() {
        game_track_list.push(GameTrack::Retail);
    }

    let label = fold.label.unwrap_or_default();
    let name = fold
        .name
        .unwrap_or_else(|| crate::parser::text::slugify(&label));
    let url = fold.url.unwrap_or_default();

    if name.is_empty() || label.is_empty() || url.is_empty() {
        tracing::debug!(
            identity = %identity,
            label = %label,
            "Dropping addon without a usable name, label or url"
        );
        return None;
    }

    Some(Addon {
        created_date: fold.created_date,
        description: fold.description,
        download_count: fold.download_count,
        game_track_list,
        label,
        latest_releases: fold.releases,
        name,
        source: identity.source,
        source_id: identity.source_id.clone(),
        tag_list: fold.tags.into_iter().collect(),
        updated_date,
        url,
    })
}

/// Merges every accumulated identity, dropping the ones that cannot be placed
pub fn merge_all(grouped: HashMap<Identity, Vec<PartialRecord>>) -> Vec<Addon> {
    let total = grouped.len();
    let addons: Vec<Addon> = grouped
        .into_iter()
        .filter_map(|(identity, records)| merge(&identity, records))
        .collect();

    tracing::info!(
        identities = total,
        merged = addons.len(),
        dropped = total - addons.len(),
        "Merged partial records"
    );
    addons
}

/// Groups a flat list of records by identity
pub fn group_by_identity(records: Vec<PartialRecord>) -> HashMap<Identity, Vec<PartialRecord>> {
    let mut grouped: HashMap<Identity, Vec<PartialRecord>> = HashMap::new();
    for record in records {
        grouped
            .entry(record.identity.clone())
            .or_default()
            .push(record);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OriginKind, Release, Source};
    use chrono::{TimeZone, Utc};

    fn identity() -> Identity {
        Identity::new(Source::Wowinterface, "1234")
    }

    fn record(origin: OriginKind) -> PartialRecord {
        let mut record = PartialRecord::new(
            Source::Wowinterface,
            "1234",
            origin,
            format!("https://example.org/{}", origin),
        );
        record.label = Some("Addon".to_string());
        record.url = Some("https://www.wowinterface.com/downloads/info1234".to_string());
        record
    }

    fn bare(origin: OriginKind) -> PartialRecord {
        PartialRecord::new(
            Source::Wowinterface,
            "1234",
            origin,
            format!("https://example.org/{}", origin),
        )
    }

    fn date(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_higher_origin_wins() {
        let mut listing = record(OriginKind::Listing);
        listing.label = Some("Listing Label".to_string());
        listing.updated_date = Some(date(1));

        let mut api = record(OriginKind::ApiDetail);
        api.label = Some("Api Label".to_string());
        api.updated_date = Some(date(2));

        // Input order must not matter
        let addon = merge(&identity(), vec![api.clone(), listing.clone()]).unwrap();
        assert_eq!(addon.label, "Api Label");
        assert_eq!(addon.updated_date, date(2));

        let addon = merge(&identity(), vec![listing, api]).unwrap();
        assert_eq!(addon.label, "Api Label");
    }

    #[test]
    fn test_absent_fields_do_not_erase() {
        let mut web = record(OriginKind::WebDetail);
        web.description = Some("From the page".to_string());
        web.created_date = Some(date(3));
        web.updated_date = Some(date(5));

        let mut api = record(OriginKind::ApiDetail);
        api.description = Some(String::new());
        api.label = Some("Addon".to_string());

        let addon = merge(&identity(), vec![web, api]).unwrap();
        assert_eq!(addon.description.as_deref(), Some("From the page"));
        assert_eq!(addon.created_date, Some(date(3)));
        assert_eq!(addon.updated_date, date(5));
        assert_eq!(addon.label, "Addon");
        assert_eq!(addon.name, "addon");
    }

    #[test]
    fn test_track_union() {
        let mut listing = record(OriginKind::Listing);
        listing.game_tracks.insert(GameTrack::Classic);
        listing.updated_date = Some(date(1));

        let mut web = record(OriginKind::WebDetail);
        web.game_tracks.insert(GameTrack::Retail);

        let addon = merge(&identity(), vec![listing, web]).unwrap();
        assert_eq!(
            addon.game_track_list,
            vec![GameTrack::Retail, GameTrack::Classic]
        );
    }

    #[test]
    fn test_tags_sorted_and_unioned() {
        let mut web = record(OriginKind::WebDetail);
        web.tags = ["ui", "map"].iter().map(|s| s.to_string()).collect();
        web.updated_date = Some(date(1));

        let mut listing = record(OriginKind::Listing);
        listing.tags = ["coords", "ui"].iter().map(|s| s.to_string()).collect();

        let addon = merge(&identity(), vec![web, listing]).unwrap();
        assert_eq!(addon.tag_list, vec!["coords", "map", "ui"]);
    }

    #[test]
    fn test_missing_updated_date_drops_addon() {
        let mut listing = record(OriginKind::Listing);
        listing.label = Some("No Date".to_string());
        assert!(merge(&identity(), vec![listing]).is_none());
    }

    #[test]
    fn test_epoch_updated_date_drops_addon() {
        let mut listing = record(OriginKind::Listing);
        listing.updated_date = Some(Utc.timestamp_opt(0, 0).unwrap());
        assert!(merge(&identity(), vec![listing]).is_none());
    }

    #[test]
    fn test_empty_tracks_default_to_retail() {
        let mut api = record(OriginKind::ApiDetail);
        api.updated_date = Some(date(1));
        let addon = merge(&identity(), vec![api]).unwrap();
        assert_eq!(addon.game_track_list, vec![GameTrack::Retail]);
    }

    #[test]
    fn test_zero_download_count_does_not_overwrite() {
        let mut listing = record(OriginKind::Listing);
        listing.download_count = Some(500);
        listing.updated_date = Some(date(1));

        let mut api = record(OriginKind::ApiDetail);
        api.download_count = Some(0);

        let addon = merge(&identity(), vec![listing, api]).unwrap();
        assert_eq!(addon.download_count, Some(500));
    }

    #[test]
    fn test_file_list_folds_before_api_detail() {
        let mut file_list = record(OriginKind::ApiFileList);
        file_list.label = Some("From list".to_string());
        file_list.updated_date = Some(date(1));

        let mut detail = record(OriginKind::ApiDetail);
        detail.label = Some("From detail".to_string());

        let addon = merge(&identity(), vec![detail, file_list]).unwrap();
        assert_eq!(addon.label, "From detail");
    }

    #[test]
    fn test_releases_taken_from_latest_origin() {
        let mut web = record(OriginKind::WebDetail);
        web.updated_date = Some(date(1));
        web.releases.push(Release {
            download_url: "https://example.org/web.zip".to_string(),
            version: None,
            game_track: None,
        });

        let mut api = record(OriginKind::ApiDetail);
        api.releases.push(Release {
            download_url: "https://example.org/api.zip".to_string(),
            version: Some("2.0".to_string()),
            game_track: None,
        });

        let addon = merge(&identity(), vec![api, web]).unwrap();
        assert_eq!(addon.latest_releases.len(), 1);
        assert_eq!(addon.latest_releases[0].download_url, "https://example.org/api.zip");
    }

    #[test]
    fn test_foreign_records_ignored() {
        let mut other = PartialRecord::new(Source::Github, "a/b", OriginKind::ApiDetail, "u");
        other.updated_date = Some(date(1));
        assert!(merge(&identity(), vec![other]).is_none());
    }

    #[test]
    fn test_merge_all_drops_undated() {
        let mut dated = record(OriginKind::Listing);
        dated.updated_date = Some(date(1));
        let undated = PartialRecord::new(Source::Wowinterface, "999", OriginKind::Listing, "u");

        let addons = merge_all(group_by_identity(vec![dated, undated]));
        assert_eq!(addons.len(), 1);
        assert_eq!(addons[0].source_id, "1234");
    }

    #[test]
    fn test_each_origin_contributes_its_fields() {
        let mut listing = bare(OriginKind::Listing);
        listing.label = Some("Bag Sorter".to_string());
        listing.url = Some("https://www.wowinterface.com/downloads/info1234".to_string());
        listing.name = Some("bag-sorter".to_string());
        listing.download_count = Some(1200);

        let mut web = bare(OriginKind::WebDetail);
        web.description = Some("Sorts bags.".to_string());

        let mut api = bare(OriginKind::ApiDetail);
        api.updated_date = Some(date(9));

        let addon = merge(&identity(), vec![api, web, listing]).unwrap();
        assert_eq!(addon.name, "bag-sorter");
        assert_eq!(addon.download_count, Some(1200));
        assert_eq!(addon.description.as_deref(), Some("Sorts bags."));
        assert_eq!(addon.updated_date, date(9));
    }

    #[test]
    fn test_label_without_slug_drops_addon() {
        let mut listing = record(OriginKind::Listing);
        listing.label = Some("魔兽助手".to_string());
        listing.updated_date = Some(date(1));
        assert!(merge(&identity(), vec![listing.clone()]).is_none());

        // An explicit name still places it
        listing.name = Some("wow-helper".to_string());
        let addon = merge(&identity(), vec![listing]).unwrap();
        assert_eq!(addon.label, "魔兽助手");
    }

    #[test]
    fn test_missing_url_or_label_drops_addon() {
        let mut no_url = bare(OriginKind::Listing);
        no_url.label = Some("Addon".to_string());
        no_url.updated_date = Some(date(1));
        assert!(merge(&identity(), vec![no_url]).is_none());

        let mut no_label = bare(OriginKind::ApiDetail);
        no_label.name = Some("addon".to_string());
        no_label.url = Some("https://example.org/addon".to_string());
        no_label.updated_date = Some(date(1));
        assert!(merge(&identity(), vec![no_label]).is_none());
    }

    #[test]
    fn test_merge_all_keeps_placeable_addons() {
        let mut good = record(OriginKind::Listing);
        good.label = Some("Good Addon".to_string());
        good.updated_date = Some(date(1));

        let mut unnamed = record(OriginKind::Listing);
        unnamed.identity.source_id = "5678".to_string();
        unnamed.label = Some("魔兽助手".to_string());
        unnamed.updated_date = Some(date(1));

        let addons = merge_all(group_by_identity(vec![good, unnamed]));
        let names: Vec<&str> = addons.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["good-addon"]);
    }
}

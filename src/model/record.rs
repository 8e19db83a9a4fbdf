use super::{GameTrack, Identity, OriginKind, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// One observation of an addon from one fetched resource
///
/// `None` means "this resource said nothing about the field" and never
/// overwrites a value another resource supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialRecord {
    pub identity: Identity,
    pub origin: OriginKind,
    /// URL of the fetched resource that produced this record
    pub resource_url: String,
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub updated_date: Option<DateTime<Utc>>,
    pub created_date: Option<DateTime<Utc>>,
    pub download_count: Option<u64>,
    #[serde(default)]
    pub game_tracks: BTreeSet<GameTrack>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub releases: Vec<Release>,
    pub payload: Option<SourcePayload>,
}

impl PartialRecord {
    pub fn new(
        source: Source,
        source_id: impl Into<String>,
        origin: OriginKind,
        resource_url: impl Into<String>,
    ) -> Self {
        Self {
            identity: Identity::new(source, source_id),
            origin,
            resource_url: resource_url.into(),
            name: None,
            label: None,
            description: None,
            url: None,
            updated_date: None,
            created_date: None,
            download_count: None,
            game_tracks: BTreeSet::new(),
            tags: BTreeSet::new(),
            releases: Vec::new(),
            payload: None,
        }
    }
}

/// A downloadable file for one game track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Release {
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_track: Option<GameTrack>,
}

/// Raw per-source fields kept alongside the normalized ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourcePayload {
    WowiListing {
        category_id: Option<String>,
        updated_text: Option<String>,
        downloads_text: Option<String>,
    },
    WowiWebDetail {
        compatibility: Option<String>,
        categories: Vec<String>,
    },
    WowiFileList(WowiFileListEntry),
    WowiApiDetail(WowiApiDetail),
    GithubRow(GithubRow),
}

/// One entry of the WowInterface API file list
///
/// Field aliases accept the older v3 `UI*` naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WowiFileListEntry {
    #[serde(alias = "UID", deserialize_with = "id_from_number_or_string")]
    pub id: String,
    #[serde(alias = "UIName")]
    pub title: String,
    /// Seconds or milliseconds since the epoch, depending on API generation
    #[serde(default, alias = "UIDate")]
    pub last_update: Option<i64>,
    #[serde(default, alias = "UICATID")]
    pub category_id: Option<serde_json::Value>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default, alias = "UIAuthorName")]
    pub author: Option<String>,
}

/// The first item of a WowInterface API file-details response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WowiApiDetail {
    #[serde(alias = "UID", deserialize_with = "id_from_number_or_string")]
    pub id: String,
    #[serde(alias = "UIName")]
    pub title: String,
    #[serde(default, alias = "UIDate")]
    pub last_update: Option<i64>,
    #[serde(default, alias = "UIDescription")]
    pub description: Option<String>,
    #[serde(default, alias = "UIHitCount")]
    pub downloads: Option<u64>,
    #[serde(default, alias = "UIVersion")]
    pub version: Option<String>,
    #[serde(default, alias = "UIDownload")]
    pub download_uri: Option<String>,
    #[serde(default, alias = "UIFileName")]
    pub file_name: Option<String>,
    #[serde(default, alias = "UIAuthorName")]
    pub author: Option<String>,
    #[serde(default, alias = "UICATID")]
    pub category_id: Option<serde_json::Value>,
}

/// One row of the GitHub addon catalogue CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRow {
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub description: String,
    pub last_updated: String,
    pub flavors: String,
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n.to_string()),
        RawId::Text(s) => Ok(s),
    }
}

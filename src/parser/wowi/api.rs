use crate::config::WowinterfaceConfig;
use crate::model::{
    OriginKind, PartialRecord, Release, Source, SourcePayload, WowiApiDetail, WowiFileListEntry,
};
use crate::parser::text::{game_version_to_track, slugify};
use crate::parser::{ParseError, ParseOutput};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

/// Values above this are milliseconds; the v3 API used seconds
const MILLISECOND_THRESHOLD: i64 = 1_000_000_000_000;

pub(crate) fn epoch_to_date(value: i64) -> Option<DateTime<Utc>> {
    if value <= 0 {
        return None;
    }
    if value > MILLISECOND_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<Vec<T>, ParseError> {
    serde_json::from_slice(body).map_err(|source| ParseError::Json {
        url: url.to_string(),
        source,
    })
}

pub fn parse_file_list(
    config: &WowinterfaceConfig,
    url: &str,
    body: &[u8],
) -> Result<ParseOutput, ParseError> {
    let entries: Vec<WowiFileListEntry> = decode(url, body)?;
    let mut output = ParseOutput::default();

    for entry in entries {
        if entry.id.is_empty() {
            continue;
        }

        let mut record =
            PartialRecord::new(Source::Wowinterface, entry.id.clone(), OriginKind::ApiFileList, url);
        record.label = Some(entry.title.clone());
        record.name = Some(slugify(&entry.title));
        record.url = Some(config.detail_url(&entry.id));
        record.updated_date = entry.last_update.and_then(epoch_to_date);
        record.game_tracks = entry
            .game_versions
            .iter()
            .map(|version| game_version_to_track(version))
            .collect();

        output.urls.push(config.detail_url(&entry.id));
        output.urls.push(config.filedetails_url(&entry.id));

        record.payload = Some(SourcePayload::WowiFileList(entry));
        output.records.push(record);
    }

    tracing::debug!(url = %url, addons = output.records.len(), "Parsed API file list");
    Ok(output)
}

pub fn parse_detail(
    config: &WowinterfaceConfig,
    url: &str,
    body: &[u8],
) -> Result<ParseOutput, ParseError> {
    let items: Vec<WowiApiDetail> = decode(url, body)?;
    let mut output = ParseOutput::default();

    // The API wraps a single addon in an array
    let detail = match items.into_iter().next() {
        Some(detail) => detail,
        None => return Ok(output),
    };

    let mut record =
        PartialRecord::new(Source::Wowinterface, detail.id.clone(), OriginKind::ApiDetail, url);
    record.label = Some(detail.title.clone());
    record.name = Some(slugify(&detail.title));
    record.url = Some(config.detail_url(&detail.id));
    record.updated_date = detail.last_update.and_then(epoch_to_date);
    record.description = detail
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    record.download_count = detail.downloads;

    if let Some(download_url) = detail.download_uri.as_deref().filter(|u| !u.is_empty()) {
        record.releases.push(Release {
            download_url: download_url.to_string(),
            version: detail.version.clone().filter(|v| !v.is_empty()),
            game_track: None,
        });
    }

    record.payload = Some(SourcePayload::WowiApiDetail(detail));
    output.records.push(record);
    Ok(output)
}

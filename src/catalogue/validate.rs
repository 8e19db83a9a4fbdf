//! Structural validation of catalogue files
//!
//! Works on the raw JSON rather than the typed [`Catalogue`](crate::model::Catalogue)
//! so files written by other tools can be checked too.

use crate::model::{GameTrack, Source};
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("failed to read catalogue {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalogue is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation failed: {field} {message}")]
    Field { field: String, message: String },

    #[error("validation failed: total ({total}) must equal the number of addons in addon-summary-list ({actual})")]
    TotalMismatch { total: u64, actual: usize },
}

fn field_error(field: impl Into<String>, message: &str) -> ValidationError {
    ValidationError::Field {
        field: field.into(),
        message: message.to_string(),
    }
}

/// RFC3339 or a bare `YYYY-MM-DD`
pub fn is_valid_date_string(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn required_string<'a>(
    object: &'a Map<String, Value>,
    prefix: &str,
    key: &str,
) -> Result<&'a str, ValidationError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| field_error(format!("{}.{}", prefix, key), "is required and must be a string"))
}

fn non_empty_string<'a>(
    object: &'a Map<String, Value>,
    prefix: &str,
    key: &str,
) -> Result<&'a str, ValidationError> {
    let value = required_string(object, prefix, key)?;
    if value.is_empty() {
        return Err(field_error(
            format!("{}.{}", prefix, key),
            "must be a non-empty string",
        ));
    }
    Ok(value)
}

fn validate_addon(value: &Value, index: usize) -> Result<(), ValidationError> {
    let prefix = format!("addon-summary-list[{}]", index);
    let addon = value
        .as_object()
        .ok_or_else(|| field_error(prefix.clone(), "must be an object"))?;

    let source = required_string(addon, &prefix, "source")?;
    if source.parse::<Source>().is_err() {
        return Err(field_error(
            format!("{}.source", prefix),
            "must be one of: wowinterface, github",
        ));
    }

    non_empty_string(addon, &prefix, "source-id")?;
    non_empty_string(addon, &prefix, "name")?;
    non_empty_string(addon, &prefix, "label")?;

    let updated = required_string(addon, &prefix, "updated-date")?;
    if !is_valid_date_string(updated) {
        return Err(field_error(
            format!("{}.updated-date", prefix),
            "must be a valid RFC3339 or YYYY-MM-DD timestamp",
        ));
    }

    let url = required_string(addon, &prefix, "url")?;
    if Url::parse(url).is_err() {
        return Err(field_error(format!("{}.url", prefix), "must be a valid URL"));
    }

    // Present but null means "unclassified" and is accepted
    let tracks = match addon.get("game-track-list") {
        None => return Err(field_error(format!("{}.game-track-list", prefix), "is required")),
        Some(Value::Null) => &[][..],
        Some(Value::Array(tracks)) => tracks.as_slice(),
        Some(_) => {
            return Err(field_error(
                format!("{}.game-track-list", prefix),
                "must be an array",
            ))
        }
    };
    for (j, track) in tracks.iter().enumerate() {
        let valid = track
            .as_str()
            .map_or(false, |t| t.parse::<GameTrack>().is_ok());
        if !valid {
            return Err(field_error(
                format!("{}.game-track-list[{}]", prefix, j),
                "must be a valid game track",
            ));
        }
    }

    if let Some(created) = addon.get("created-date").and_then(Value::as_str) {
        if !is_valid_date_string(created) {
            return Err(field_error(
                format!("{}.created-date", prefix),
                "must be a valid RFC3339 or YYYY-MM-DD timestamp",
            ));
        }
    }

    if let Some(count) = addon.get("download-count") {
        if count.as_u64().is_none() {
            return Err(field_error(
                format!("{}.download-count", prefix),
                "must be a non-negative integer",
            ));
        }
    }

    if let Some(tags) = addon.get("tag-list") {
        let valid = tags
            .as_array()
            .map_or(false, |tags| tags.iter().all(Value::is_string));
        if !valid {
            return Err(field_error(
                format!("{}.tag-list", prefix),
                "must be an array of strings",
            ));
        }
    }

    Ok(())
}

/// Validates an already-decoded catalogue document
pub fn validate_catalogue_value(document: &Value) -> Result<(), ValidationError> {
    let root = document
        .as_object()
        .ok_or_else(|| field_error("catalogue", "must be an object"))?;

    let spec = root
        .get("spec")
        .and_then(Value::as_object)
        .ok_or_else(|| field_error("spec", "is required and must be an object"))?;
    let version = spec
        .get("version")
        .ok_or_else(|| field_error("spec.version", "is required"))?;
    if !version.as_u64().map_or(false, |v| v >= 1) {
        return Err(field_error("spec.version", "must be an integer >= 1"));
    }

    let datestamp = root
        .get("datestamp")
        .and_then(Value::as_str)
        .ok_or_else(|| field_error("datestamp", "is required and must be a string"))?;
    if !is_valid_date_string(datestamp) {
        return Err(field_error(
            "datestamp",
            "must be a valid date string (RFC3339 or YYYY-MM-DD)",
        ));
    }

    let total = root
        .get("total")
        .and_then(Value::as_u64)
        .ok_or_else(|| field_error("total", "is required and must be a non-negative integer"))?;

    let addons = root
        .get("addon-summary-list")
        .ok_or_else(|| field_error("addon-summary-list", "is required"))?
        .as_array()
        .ok_or_else(|| field_error("addon-summary-list", "must be an array"))?;

    if total != addons.len() as u64 {
        return Err(ValidationError::TotalMismatch {
            total,
            actual: addons.len(),
        });
    }

    for (index, addon) in addons.iter().enumerate() {
        validate_addon(addon, index)?;
    }

    Ok(())
}

pub fn validate_catalogue_json(bytes: &[u8]) -> Result<(), ValidationError> {
    let document: Value = serde_json::from_slice(bytes)?;
    validate_catalogue_value(&document)
}

pub fn validate_catalogue_file(path: &Path) -> Result<(), ValidationError> {
    let bytes = std::fs::read(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    validate_catalogue_json(&bytes)?;
    tracing::debug!(path = %path.display(), "Catalogue is valid");
    Ok(())
}

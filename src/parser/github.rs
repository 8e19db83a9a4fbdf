//! Parser for the community GitHub addon catalogue CSV

use super::csv::parse_csv;
use super::text::{flavor_to_track, slugify};
use super::{utf8, ParseError, ParseOutput, Parser};
use crate::model::{GithubRow, OriginKind, PartialRecord, SourcePayload, Source};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const REQUIRED_COLUMNS: [&str; 3] = ["name", "full_name", "url"];

#[derive(Debug, Default, Clone)]
pub struct GithubParser;

impl GithubParser {
    pub fn new() -> Self {
        Self
    }

    fn row_to_record(resource_url: &str, row: GithubRow) -> Option<PartialRecord> {
        if row.name.is_empty() || row.full_name.is_empty() || row.url.is_empty() {
            tracing::debug!(full_name = %row.full_name, "Skipping incomplete GitHub row");
            return None;
        }

        let updated_date = if row.last_updated.is_empty() {
            None
        } else {
            match DateTime::parse_from_rfc3339(&row.last_updated) {
                Ok(date) => Some(date.with_timezone(&Utc)),
                Err(e) => {
                    tracing::debug!(
                        full_name = %row.full_name,
                        error = %e,
                        "Skipping GitHub row with unparseable last_updated"
                    );
                    return None;
                }
            }
        };

        let mut record = PartialRecord::new(
            Source::Github,
            row.full_name.clone(),
            OriginKind::ApiDetail,
            resource_url,
        );
        record.name = Some(slugify(&row.name));
        record.label = Some(row.name.clone());
        record.url = Some(row.url.clone());
        record.updated_date = updated_date;
        if !row.description.is_empty() {
            record.description = Some(row.description.clone());
        }
        record.game_tracks = row
            .flavors
            .split(',')
            .filter_map(flavor_to_track)
            .collect();
        record.payload = Some(SourcePayload::GithubRow(row));

        Some(record)
    }
}

impl Parser for GithubParser {
    fn parse(&self, url: &str, body: &[u8]) -> Result<ParseOutput, ParseError> {
        let text = utf8(url, body)?;
        let mut rows = parse_csv(text)?.into_iter();

        let header = rows
            .next()
            .ok_or_else(|| ParseError::MissingColumn("name".to_string()))?;
        let index: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        for column in REQUIRED_COLUMNS {
            if !index.contains_key(column) {
                return Err(ParseError::MissingColumn(column.to_string()));
            }
        }

        let mut output = ParseOutput::default();
        for fields in rows {
            let field = |name: &str| {
                index
                    .get(name)
                    .and_then(|&i| fields.get(i))
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default()
            };

            let row = GithubRow {
                name: field("name"),
                full_name: field("full_name"),
                url: field("url"),
                description: field("description"),
                last_updated: field("last_updated"),
                flavors: field("flavors"),
            };

            if let Some(record) = Self::row_to_record(url, row) {
                output.records.push(record);
            }
        }

        tracing::debug!(url = %url, records = output.records.len(), "Parsed GitHub catalogue");
        Ok(output)
    }
}

//! WowInterface parser
//!
//! The site is read through five kinds of resource, told apart by URL:
//!
//! | Kind | Example | Yields |
//! |------|---------|--------|
//! | API file list | `.../v4/game/WOW/filelist.json` | one record per addon, detail + API URLs |
//! | API detail | `.../filedetails/1234.json` | one record |
//! | Addon detail | `/downloads/info1234` | one record |
//! | Category group | `/downloads/index.php`, `/addons.php` | listing and group URLs |
//! | Category listing | `/downloads/index.php?cid=19&...&page=1` | records, pagination + detail URLs |

mod api;
mod html;

use super::{utf8, ParseError, ParseOutput, Parser};
use crate::config::WowinterfaceConfig;
use url::Url;

/// Group pages that list categories rather than addons
pub const CATEGORY_GROUP_PAGES: [&str; 9] = [
    "/downloads/index.php",
    "/addons.php",
    "/downloads/cat39.html",
    "/downloads/cat109.html",
    "/downloads/cat23.html",
    "/downloads/cat28.html",
    "/downloads/cat158.html",
    "/downloads/cat144.html",
    "/downloads/cat145.html",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WowiUrlKind {
    ApiFileList,
    ApiDetail,
    AddonDetail,
    CategoryGroup,
    CategoryListing,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct WowiParser {
    config: WowinterfaceConfig,
}

impl WowiParser {
    pub fn new(config: WowinterfaceConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, url: &str) -> WowiUrlKind {
        if url == self.config.filelist_url() {
            return WowiUrlKind::ApiFileList;
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return WowiUrlKind::Unknown,
        };
        let path = parsed.path();

        if path.contains("/filedetails/") && path.ends_with(".json") {
            return WowiUrlKind::ApiDetail;
        }

        if path.contains("/downloads/info") {
            return WowiUrlKind::AddonDetail;
        }

        let has_query = parsed.query().map_or(false, |q| !q.is_empty());
        if !has_query && CATEGORY_GROUP_PAGES.iter().any(|page| path.ends_with(page)) {
            return WowiUrlKind::CategoryGroup;
        }

        let has_page = parsed
            .query_pairs()
            .any(|(key, value)| key == "page" && !value.is_empty());
        if has_page {
            return WowiUrlKind::CategoryListing;
        }

        WowiUrlKind::Unknown
    }
}

impl Parser for WowiParser {
    fn parse(&self, url: &str, body: &[u8]) -> Result<ParseOutput, ParseError> {
        let kind = self.classify(url);
        tracing::trace!(url = %url, kind = ?kind, "Parsing WowInterface resource");

        match kind {
            WowiUrlKind::ApiFileList => api::parse_file_list(&self.config, url, body),
            WowiUrlKind::ApiDetail => api::parse_detail(&self.config, url, body),
            WowiUrlKind::AddonDetail => {
                html::parse_addon_detail(&self.config, url, utf8(url, body)?)
            }
            WowiUrlKind::CategoryGroup => {
                html::parse_category_group(&self.config, url, utf8(url, body)?)
            }
            WowiUrlKind::CategoryListing => {
                html::parse_category_listing(&self.config, url, utf8(url, body)?)
            }
            WowiUrlKind::Unknown => Err(ParseError::UnknownUrl(url.to_string())),
        }
    }
}

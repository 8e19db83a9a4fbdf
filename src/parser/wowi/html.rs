//! HTML pages of the WowInterface site
//!
//! Selectors:
//! - group pages: `div#colleft div.subcats div.subtitle a`
//! - listing pages: `#filepage div.file` rows, `.pagenav td.alt1 a` pagination
//! - detail pages: `og:title`, `div.postmessage`, `#multitoc`, `div#safe`,
//!   `div.navbar` breadcrumbs, `.infobox div#download a`

use crate::config::WowinterfaceConfig;
use crate::model::{OriginKind, PartialRecord, Release, Source, SourcePayload};
use crate::parser::text::{category_to_tags, parse_game_tracks, slugify};
use crate::parser::{ParseError, ParseOutput};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// WowInterface timestamps look like `09-07-18 01:27 PM` and are UTC
const SITE_DATE_FORMAT: &str = "%m-%d-%y %I:%M %p";

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

fn file_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"id=(\d+)")
}

fn info_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"info(\d+)")
}

fn category_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?:cat|cid=)(\d+)")
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"\d[\d,]*")
}

fn dated_line_re(label: &str) -> Regex {
    Regex::new(&format!(
        r"{}:?\s*(\d{{2}}-\d{{2}}-\d{{2}}\s+\d{{1,2}}:\d{{2}}\s*[AP]M)",
        label
    ))
    .expect("valid regex")
}

fn select<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_doc<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    select(document.root_element(), css)
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a link href against the page URL
///
/// Returns None for empty, fragment-only or non-HTTP(S) links.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

pub(crate) fn parse_site_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&text, SITE_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_count(text: &str) -> Option<u64> {
    digits_re()
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

fn page_url(url: &str) -> Result<Url, ParseError> {
    Url::parse(url).map_err(|_| ParseError::UnknownUrl(url.to_string()))
}

pub fn parse_category_group(
    config: &WowinterfaceConfig,
    url: &str,
    html: &str,
) -> Result<ParseOutput, ParseError> {
    let base = page_url(url)?;
    let document = Html::parse_document(html);
    let mut output = ParseOutput::default();

    for link in select_doc(&document, "div#colleft div.subcats div.subtitle a") {
        let href = match link.value().attr("href") {
            Some(href) => href,
            None => continue,
        };

        let is_group = !href.contains('?')
            && super::CATEGORY_GROUP_PAGES
                .iter()
                .any(|page| href.ends_with(page));

        if is_group {
            if let Some(absolute) = resolve_link(href, &base) {
                output.urls.push(absolute);
            }
        } else if let Some(caps) = category_id_re().captures(href) {
            output.urls.push(config.listing_url(&caps[1], 1));
        }
    }

    tracing::debug!(url = %url, found = output.urls.len(), "Parsed category group");
    Ok(output)
}

pub fn parse_category_listing(
    config: &WowinterfaceConfig,
    url: &str,
    html: &str,
) -> Result<ParseOutput, ParseError> {
    let base = page_url(url)?;
    let category_id = base
        .query_pairs()
        .find(|(key, _)| key == "cid")
        .map(|(_, value)| value.into_owned());
    let document = Html::parse_document(html);
    let mut output = ParseOutput::default();

    for link in select_doc(&document, ".pagenav td.alt1 a") {
        if let Some(absolute) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, &base))
        {
            output.urls.push(absolute);
        }
    }

    for row in select_doc(&document, "#filepage div.file") {
        let link = select(row, "a[href*='fileinfo']").into_iter().find_map(|a| {
            let href = a.value().attr("href")?;
            let caps = file_id_re().captures(href)?;
            Some((caps[1].to_string(), text_of(a)))
        });

        let (source_id, label) = match link {
            Some(found) => found,
            None => continue,
        };

        let mut record =
            PartialRecord::new(Source::Wowinterface, source_id.clone(), OriginKind::Listing, url);
        let detail_url = config.detail_url(&source_id);
        record.name = Some(slugify(&label)).filter(|n| !n.is_empty());
        record.label = Some(label).filter(|l| !l.is_empty());
        record.url = Some(detail_url.clone());

        let updated_text = select(row, "div.updated").into_iter().next().map(text_of);
        record.updated_date = updated_text
            .as_deref()
            .and_then(|t| t.strip_prefix("Updated"))
            .and_then(parse_site_date);

        let downloads_text = select(row, "div.downloads").into_iter().next().map(text_of);
        record.download_count = downloads_text.as_deref().and_then(parse_count);

        record.payload = Some(SourcePayload::WowiListing {
            category_id: category_id.clone(),
            updated_text,
            downloads_text,
        });

        output.urls.push(detail_url);
        output.records.push(record);
    }

    tracing::debug!(
        url = %url,
        addons = output.records.len(),
        links = output.urls.len(),
        "Parsed category listing"
    );
    Ok(output)
}

pub fn parse_addon_detail(
    config: &WowinterfaceConfig,
    url: &str,
    html: &str,
) -> Result<ParseOutput, ParseError> {
    let base = page_url(url)?;
    let source_id = info_id_re()
        .captures(base.path())
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ParseError::MissingId(url.to_string()))?;

    let document = Html::parse_document(html);
    let mut record =
        PartialRecord::new(Source::Wowinterface, source_id.clone(), OriginKind::WebDetail, url);
    record.url = Some(config.detail_url(&source_id));

    if let Some(title) = select_doc(&document, "meta[property='og:title']")
        .into_iter()
        .find_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        record.label = Some(title.to_string());
        record.name = Some(slugify(title)).filter(|n| !n.is_empty());
    }

    record.description = select_doc(&document, "div.postmessage")
        .into_iter()
        .next()
        .map(text_of)
        .filter(|d| !d.is_empty());

    let compatibility = select_doc(&document, "#multitoc")
        .into_iter()
        .next()
        .map(text_of);
    if let Some(text) = &compatibility {
        record.game_tracks = parse_game_tracks(text);
    }

    let info_text = select_doc(&document, "div#safe, div.infobox")
        .into_iter()
        .map(text_of)
        .collect::<Vec<_>>()
        .join(" ");
    record.created_date = dated_line_re("Created")
        .captures(&info_text)
        .and_then(|caps| parse_site_date(&caps[1]));
    record.updated_date = dated_line_re("Updated")
        .captures(&info_text)
        .and_then(|caps| parse_site_date(&caps[1]));

    // Breadcrumbs end with the addon's own category
    let categories: Vec<String> = select_doc(&document, "div.navbar a[href*='cat']")
        .into_iter()
        .map(text_of)
        .filter(|c| !c.is_empty())
        .collect();
    if let Some(category) = categories.last() {
        record.tags = category_to_tags(category);
    }

    for link in select_doc(&document, ".infobox div#download a") {
        let download_url = match link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, &base))
        {
            Some(u) => u,
            None => continue,
        };
        let game_track = link
            .value()
            .attr("title")
            .and_then(|title| parse_game_tracks(title).into_iter().next());
        record.releases.push(Release {
            download_url,
            version: None,
            game_track,
        });
    }

    record.payload = Some(SourcePayload::WowiWebDetail {
        compatibility,
        categories,
    });

    Ok(ParseOutput {
        records: vec![record],
        urls: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GameTrack;
    use chrono::TimeZone;

    fn config() -> WowinterfaceConfig {
        WowinterfaceConfig::default()
    }

    const GROUP_PAGE: &str = r#"<html><body>
        <div id="colleft"><div class="subcats">
          <div class="subtitle"><a href="/downloads/index.php?cid=19">Bags, Bank, Inventory</a></div>
          <div class="subtitle"><a href="cat158.html">WoW Classic</a></div>
          <div class="subtitle"><a href="/downloads/cat39.html">Class &amp; Role Specific</a></div>
          <div class="subtitle"><a>No link</a></div>
        </div></div>
        <a href="/downloads/index.php?cid=99">outside the category list</a>
    </body></html>"#;

    const LISTING_PAGE: &str = r#"<html><body>
        <div class="pagenav"><table><tr>
          <td class="alt1"><a href="/downloads/index.php?cid=19&sb=dec_date&so=desc&pt=f&page=2">2</a></td>
        </tr></table></div>
        <div id="filepage">
          <div class="file">
            <a href="fileinfo.php?s=c33edd26881a&id=23145">Bagnon   Plus</a>
            <div class="updated">Updated 09-07-18 01:27 PM</div>
            <div class="downloads">12,345 Downloads</div>
          </div>
          <div class="file">
            <a href="fileinfo.php?s=some-hash">No id</a>
          </div>
        </div>
    </body></html>"#;

    const DETAIL_PAGE: &str = r#"<html><head>
        <meta property="og:title" content="IceHUD" />
      </head><body>
        <div class="navbar"><a href="/downloads/index.php">Downloads</a>
          <a href="/downloads/cat39.html">Stand-Alone addons</a>
          <a href="/downloads/cat19.html">Map, Coords, Compasses</a></div>
        <div class="infobox">
          <div id="safe">Created: 04-30-10 02:43 AM Updated: 03-21-24 10:05 PM</div>
          <div id="download">
            <a href="/downloads/download8149-IceHUD" title="Retail">Download</a>
            <a href="/downloads/download8149-IceHUD-classic" title="Classic">Classic</a>
          </div>
        </div>
        <div id="multitoc">Compatibility: Plunderstorm (10.2.6), Classic (1.15.1)</div>
        <div class="postmessage">  A heads-up
           display. </div>
        <div class="postmessage">Comment</div>
    </body></html>"#;

    #[test]
    fn test_parse_site_date() {
        assert_eq!(
            parse_site_date("09-07-18 01:27 PM"),
            Some(Utc.with_ymd_and_hms(2018, 9, 7, 13, 27, 0).unwrap())
        );
        assert_eq!(parse_site_date("yesterday"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12,345 Downloads"), Some(12345));
        assert_eq!(parse_count("none"), None);
    }

    #[test]
    fn test_category_group() {
        let url = "https://www.wowinterface.com/downloads/index.php";
        let output = parse_category_group(&config(), url, GROUP_PAGE).unwrap();

        assert!(output.records.is_empty());
        assert_eq!(
            output.urls,
            vec![
                "https://www.wowinterface.com/downloads/index.php?cid=19&sb=dec_date&so=desc&pt=f&page=1"
                    .to_string(),
                "https://www.wowinterface.com/downloads/index.php?cid=158&sb=dec_date&so=desc&pt=f&page=1"
                    .to_string(),
                "https://www.wowinterface.com/downloads/cat39.html".to_string(),
            ]
        );
    }

    #[test]
    fn test_category_listing() {
        let url =
            "https://www.wowinterface.com/downloads/index.php?cid=19&sb=dec_date&so=desc&pt=f&page=1";
        let output = parse_category_listing(&config(), url, LISTING_PAGE).unwrap();

        assert_eq!(output.records.len(), 1);
        let record = &output.records[0];
        assert_eq!(record.identity.source_id, "23145");
        assert_eq!(record.origin, OriginKind::Listing);
        assert_eq!(record.label.as_deref(), Some("Bagnon Plus"));
        assert_eq!(record.name.as_deref(), Some("bagnon-plus"));
        assert_eq!(record.download_count, Some(12345));
        assert_eq!(
            record.updated_date,
            Some(Utc.with_ymd_and_hms(2018, 9, 7, 13, 27, 0).unwrap())
        );
        assert!(matches!(
            &record.payload,
            Some(SourcePayload::WowiListing { category_id: Some(c), .. }) if c == "19"
        ));

        assert!(output.urls.contains(
            &"https://www.wowinterface.com/downloads/index.php?cid=19&sb=dec_date&so=desc&pt=f&page=2"
                .to_string()
        ));
        assert!(output
            .urls
            .contains(&"https://www.wowinterface.com/downloads/info23145".to_string()));
    }

    #[test]
    fn test_addon_detail() {
        let url = "https://www.wowinterface.com/downloads/info8149-IceHUD.html";
        let output = parse_addon_detail(&config(), url, DETAIL_PAGE).unwrap();

        assert!(output.urls.is_empty());
        let record = &output.records[0];
        assert_eq!(record.identity.source_id, "8149");
        assert_eq!(record.origin, OriginKind::WebDetail);
        assert_eq!(record.label.as_deref(), Some("IceHUD"));
        assert_eq!(record.name.as_deref(), Some("icehud"));
        assert_eq!(
            record.url.as_deref(),
            Some("https://www.wowinterface.com/downloads/info8149")
        );
        assert_eq!(record.description.as_deref(), Some("A heads-up display."));
        assert_eq!(
            record.created_date,
            Some(Utc.with_ymd_and_hms(2010, 4, 30, 2, 43, 0).unwrap())
        );
        assert_eq!(
            record.updated_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 21, 22, 5, 0).unwrap())
        );
        assert!(record.game_tracks.contains(&GameTrack::Retail));
        assert!(record.game_tracks.contains(&GameTrack::Classic));
        assert!(record.tags.contains("minimap"));
        assert_eq!(record.releases.len(), 2);
        assert_eq!(record.releases[1].game_track, Some(GameTrack::Classic));
        assert_eq!(
            record.releases[0].download_url,
            "https://www.wowinterface.com/downloads/download8149-IceHUD"
        );
    }

    #[test]
    fn test_addon_detail_without_compatibility_has_no_tracks() {
        let url = "https://www.wowinterface.com/downloads/info1";
        let output = parse_addon_detail(&config(), url, "<html><body></body></html>").unwrap();
        let record = &output.records[0];
        assert!(record.game_tracks.is_empty());
        assert!(record.label.is_none());
        assert!(record.updated_date.is_none());
    }

    #[test]
    fn test_addon_detail_requires_id() {
        let url = "https://www.wowinterface.com/downloads/infoabc";
        let result = parse_addon_detail(&config(), url, "<html></html>");
        assert!(matches!(result, Err(ParseError::MissingId(_))));
    }
}

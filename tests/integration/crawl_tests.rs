//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to stand in for both WowInterface (site and API)
//! and the GitHub catalogue, and drive `scrape`/`write` end-to-end.

use std::path::Path;
use strongbox_catalogue_builder::catalogue::validate_catalogue_file;
use strongbox_catalogue_builder::commands;
use strongbox_catalogue_builder::config::Config;
use strongbox_catalogue_builder::storage::{RunStatus, SqliteStorage, Storage};
use strongbox_catalogue_builder::{CancelSignal, Catalogue, CatalogueError, GameTrack, Source};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Points every source at the mock server and every output into `dir`
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.workers = 4;
    config.crawler.poll_interval_ms = 10;
    config.retry.initial_delay_ms = 10;
    config.retry.max_delay_ms = 20;
    config.cache.enabled = false;
    config.output.state_directory = dir.join("state").display().to_string();
    config.output.database_path = dir.join("state").join("run-state.db").display().to_string();
    config.sources.wowinterface.host = base_url.to_string();
    config.sources.wowinterface.api_host = base_url.to_string();
    config.sources.github.catalogue_url = format!("{}/addons.csv", base_url);
    config
}

fn json(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "application/json")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

const FILE_LIST: &str = r#"[
    {"id": 1001, "title": "Alpha Addon", "lastUpdate": 1700000000000, "gameVersions": ["1.15.0"]},
    {"id": 1002, "title": "Beta Addon", "lastUpdate": 1690000000000, "gameVersions": ["10.1.5"]},
    {"id": 1003, "title": "Gamma Addon"}
]"#;

const DETAIL_1001: &str = r#"[{
    "id": 1001, "title": "Alpha Addon", "lastUpdate": 1700600000000,
    "description": "Does alpha things.", "downloads": 2500, "version": "1.2",
    "downloadUri": "https://cdn.example.org/alpha-1.2.zip"
}]"#;

const DETAIL_1002: &str = r#"[{
    "id": 1002, "title": "Beta Addon", "lastUpdate": 1690000000000, "downloads": 50
}]"#;

const GITHUB_CSV: &str = "\
name,full_name,url,description,last_updated,flavors
Some Addon,owner/some-addon,https://github.com/owner/some-addon,A GitHub addon,2020-05-01T00:00:00Z,\"mainline,wrath\"
";

/// Mounts the whole fake site; the returned server verifies `expect` counts on drop
async fn mount_site() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/v4/game/WOW/filelist.json"))
        .respond_with(json(FILE_LIST))
        .expect(1)
        .mount(&server)
        .await;

    // First API detail request fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/v4/game/WOW/filedetails/1001.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/game/WOW/filedetails/1001.json"))
        .respond_with(json(DETAIL_1001))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/game/WOW/filedetails/1002.json"))
        .respond_with(json(DETAIL_1002))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/game/WOW/filedetails/1003.json"))
        .respond_with(json("[]"))
        .mount(&server)
        .await;

    // Found through the file list and again through the category listing
    Mock::given(method("GET"))
        .and(path("/downloads/info1001"))
        .respond_with(html(
            r#"<html><head><meta property="og:title" content="Alpha Addon" /></head><body>
            <div class="infobox"><div id="safe">Updated: 11-20-23 08:00 AM</div></div>
            <div id="multitoc">Compatibility: Retail (10.2.0)</div>
            <div class="postmessage">Alpha from the site.</div>
            </body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/downloads/info1002"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    // Listing first: the group page mock below matches the same path
    Mock::given(method("GET"))
        .and(path("/downloads/index.php"))
        .and(query_param("cid", "19"))
        .respond_with(html(format!(
            r#"<html><body><div id="filepage">
              <div class="file">
                <a href="{}/downloads/fileinfo.php?id=1001">Alpha Addon</a>
                <div class="updated">Updated 11-01-23 10:00 AM</div>
                <div class="downloads">2,000 Downloads</div>
              </div>
            </div></body></html>"#,
            base
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/downloads/index.php"))
        .respond_with(html(
            r#"<html><body><div id="colleft"><div class="subcats">
              <div class="subtitle"><a href="/downloads/index.php?cid=19">Bags</a></div>
            </div></div></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/addons.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GITHUB_CSV))
        .expect(1)
        .mount(&server)
        .await;

    server
}

fn read_catalogue(path: &Path) -> Catalogue {
    let bytes = std::fs::read(path).expect("catalogue should exist");
    serde_json::from_slice(&bytes).expect("catalogue should parse")
}

#[tokio::test]
async fn test_full_scrape() {
    let server = mount_site().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let summary = commands::scrape(&config, "test-hash", &[], CancelSignal::new())
        .await
        .expect("scrape should succeed");

    assert_eq!(summary.addons, 3);
    assert_eq!(summary.files.len(), 4);
    assert!(summary.stats.urls_rejected >= 2);
    for file in &summary.files {
        assert!(validate_catalogue_file(file).is_ok(), "{} is invalid", file.display());
    }

    let state = dir.path().join("state");
    let full = read_catalogue(&state.join("full-catalogue.json"));
    assert_eq!(full.spec.version, 2);
    assert_eq!(full.total, full.addon_summary_list.len());

    let ids: Vec<&str> = full
        .addon_summary_list
        .iter()
        .map(|a| a.source_id.as_str())
        .collect();
    // 1003 never carried an updated date and is dropped
    assert_eq!(ids, vec!["1001", "1002", "owner/some-addon"]);

    let alpha = &full.addon_summary_list[0];
    assert_eq!(alpha.label, "Alpha Addon");
    assert_eq!(alpha.name, "alpha-addon");
    assert_eq!(alpha.description.as_deref(), Some("Does alpha things."));
    assert_eq!(alpha.download_count, Some(2500));
    assert_eq!(alpha.game_track_list, vec![GameTrack::Retail, GameTrack::Classic]);
    assert_eq!(
        alpha.updated_date.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        "2023-11-21T20:53:20Z"
    );

    let beta = &full.addon_summary_list[1];
    assert_eq!(beta.game_track_list, vec![GameTrack::Retail]);
    assert_eq!(beta.download_count, Some(50));

    let github = &full.addon_summary_list[2];
    assert_eq!(github.source, Source::Github);
    assert_eq!(github.name, "some-addon");
    assert_eq!(
        github.game_track_list,
        vec![GameTrack::Retail, GameTrack::ClassicWotlk]
    );

    let wowi = read_catalogue(&state.join("wowinterface-catalogue.json"));
    assert_eq!(wowi.total, 2);
    let gh = read_catalogue(&state.join("github-catalogue.json"));
    assert_eq!(gh.total, 1);

    // The GitHub addon was last updated before the cutoff
    let short = read_catalogue(&state.join("short-catalogue.json"));
    assert_eq!(short.total, 2);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let run = storage.get_latest_completed_run().unwrap().unwrap();
    assert_eq!(run.id, summary.run_id);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_write_rebuilds_without_network() {
    let server = mount_site().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    commands::scrape(&config, "h", &[], CancelSignal::new())
        .await
        .expect("scrape should succeed");
    let scraped = read_catalogue(&dir.path().join("state").join("full-catalogue.json"));

    // Nothing answers any more; write must only read the database
    drop(server);

    let mut out = Vec::new();
    let rebuilt = commands::write(&config, &[], &[], &mut out).unwrap();
    assert_eq!(
        serde_json::to_value(&rebuilt.addon_summary_list).unwrap(),
        serde_json::to_value(&scraped.addon_summary_list).unwrap()
    );

    let printed: Catalogue = serde_json::from_slice(&out).unwrap();
    assert_eq!(printed.total, 3);

    let target = dir.path().join("github-only.json");
    let github = commands::write(&config, &[Source::Github], &[target.clone()], &mut Vec::new())
        .unwrap();
    assert_eq!(github.total, 1);
    assert!(validate_catalogue_file(&target).is_ok());
}

#[tokio::test]
async fn test_single_source_scrape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/addons.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GITHUB_CSV))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let summary = commands::scrape(&config, "h", &[Source::Github], CancelSignal::new())
        .await
        .unwrap();

    assert_eq!(summary.addons, 1);
    let state = dir.path().join("state");
    assert!(state.join("github-catalogue.json").exists());
    assert!(!state.join("wowinterface-catalogue.json").exists());
}

#[tokio::test]
async fn test_cancelled_scrape_writes_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    let cancel = CancelSignal::new();
    cancel.cancel();

    let result = commands::scrape(&config, "h", &[], cancel).await;
    assert!(matches!(result, Err(CatalogueError::Cancelled)));

    let state = dir.path().join("state");
    assert!(!state.join("full-catalogue.json").exists());

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let latest = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.status, RunStatus::Interrupted);
    assert!(storage.get_latest_completed_run().unwrap().is_none());

    let mut out = Vec::new();
    assert!(matches!(
        commands::write(&config, &[], &[], &mut out),
        Err(CatalogueError::NoCompletedRun(_))
    ));
}

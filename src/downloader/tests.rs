//! Manager and job behavior tests against a mock HTTP site

use super::*;
use crate::translate::NoOpTranslator;
use crate::types::{FileType, JobState};
use async_trait::async_trait;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a downloader wired to a mock server and a temp download directory.
async fn setup(server: &MockServer) -> (TrainerDownloader, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.site.base_url = server.uri();
    config.site.search_timeout = Duration::from_millis(300);
    config.site.page_timeout = Duration::from_millis(500);
    config.render.enabled = false; // no headless browser in tests
    config.download.download_dir = temp_dir.path().to_path_buf();
    config.download.replace_wait = Duration::from_millis(500);
    config.download.progress_interval = Duration::from_millis(50);

    let downloader = TrainerDownloader::new(config).await.unwrap();
    (downloader, temp_dir)
}

fn zip_entry(url: &str, filename: &str) -> VersionEntry {
    VersionEntry {
        filename: filename.to_string(),
        date: "2024-02-21".to_string(),
        size: "1 MB".to_string(),
        downloads: "10".to_string(),
        download_url: url.to_string(),
        file_type: FileType::Zip,
    }
}

/// Collect events until a terminal one for `id` arrives or the timeout hits.
async fn collect_until_terminal(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    id: JobId,
    timeout: Duration,
) -> Vec<Event> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(event)) => {
                let terminal = matches!(
                    &event,
                    Event::Completed { id: e, .. } | Event::Cancelled { id: e } | Event::Failed { id: e, .. }
                    if *e == id
                );
                events.push(event);
                if terminal {
                    return events;
                }
            }
            Ok(Err(_)) | Err(_) => return events,
        }
    }
}

// ── streaming ───────────────────────────────────────────────────────────

#[tokio::test]
async fn download_streams_body_to_disk_and_completes() {
    let server = MockServer::start().await;
    let body = vec![0xABu8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/files/trainer.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let (downloader, temp_dir) = setup(&server).await;
    let mut events = downloader.subscribe();

    let entry = zip_entry(&format!("{}/files/trainer.zip", server.uri()), "trainer");
    let id = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap();

    let received = collect_until_terminal(&mut events, id, Duration::from_secs(5)).await;

    let target = temp_dir.path().join("trainer.zip");
    assert!(
        matches!(received.last(), Some(Event::Completed { path, .. }) if *path == target),
        "expected Completed, got {:?}",
        received.last()
    );
    assert_eq!(std::fs::read(&target).unwrap(), body);

    // Lifecycle ordering: Preparing before Streaming before the terminal event.
    let preparing = received
        .iter()
        .position(|e| matches!(e, Event::Preparing { .. }))
        .unwrap();
    let streaming = received
        .iter()
        .position(|e| matches!(e, Event::Streaming { .. }))
        .unwrap();
    assert!(preparing < streaming);
}

#[tokio::test]
async fn progress_percentages_are_monotonic_and_end_at_100() {
    let server = MockServer::start().await;
    let body = vec![7u8; 1 << 20]; // 1 MB
    Mock::given(method("GET"))
        .and(path("/files/big.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let mut events = downloader.subscribe();

    let entry = zip_entry(&format!("{}/files/big.zip", server.uri()), "big");
    let id = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap();

    let received = collect_until_terminal(&mut events, id, Duration::from_secs(10)).await;

    let percents: Vec<i32> = received
        .iter()
        .filter_map(|e| match e {
            Event::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();

    assert!(!percents.is_empty(), "expected progress samples");
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "progress must be non-decreasing: {percents:?}"
    );
    assert_eq!(*percents.last().unwrap(), 100);
}

#[tokio::test]
async fn completed_job_status_reflects_final_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/s.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 2048]))
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let mut events = downloader.subscribe();

    let entry = zip_entry(&format!("{}/files/s.zip", server.uri()), "s");
    let id = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap();
    collect_until_terminal(&mut events, id, Duration::from_secs(5)).await;

    let status = downloader.current_status().await.unwrap();
    assert_eq!(status.id, id);
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.bytes_downloaded, 2048);
    assert_eq!(status.total_bytes, Some(2048));
}

#[tokio::test]
async fn failed_download_leaves_partial_file_and_emits_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/missing.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let mut events = downloader.subscribe();

    let entry = zip_entry(&format!("{}/files/missing.zip", server.uri()), "missing");
    let id = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap();

    let received = collect_until_terminal(&mut events, id, Duration::from_secs(5)).await;
    assert!(matches!(received.last(), Some(Event::Failed { .. })));

    let status = downloader.current_status().await.unwrap();
    assert_eq!(status.state, JobState::Failed);
}

// ── cancellation ────────────────────────────────────────────────────────

#[tokio::test]
async fn cancellation_stops_the_job_and_removes_the_partial_file() {
    let server = MockServer::start().await;
    // Response delayed long enough for the cancel to land mid-transfer.
    Mock::given(method("GET"))
        .and(path("/files/slow.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![9u8; 256 * 1024])
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let (downloader, temp_dir) = setup(&server).await;
    let mut events = downloader.subscribe();

    let entry = zip_entry(&format!("{}/files/slow.zip", server.uri()), "slow");
    let id = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    downloader.cancel().await;

    let received = collect_until_terminal(&mut events, id, Duration::from_secs(5)).await;

    // The terminal event is Cancelled, and nothing follows it.
    assert!(
        matches!(received.last(), Some(Event::Cancelled { id: e }) if *e == id),
        "expected Cancelled, got {:?}",
        received.last()
    );
    assert!(!temp_dir.path().join("slow.zip").exists());

    // No further events after cancellation was observed.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(
        events.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));

    // The slot was released, so there is no current job.
    assert!(downloader.current_status().await.is_none());
}

// ── replacement ─────────────────────────────────────────────────────────

#[tokio::test]
async fn new_download_supersedes_the_streaming_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/first.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![1u8; 128 * 1024])
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/second.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![2u8; 4096]))
        .mount(&server)
        .await;

    let (downloader, temp_dir) = setup(&server).await;
    let mut events = downloader.subscribe();

    let first = zip_entry(&format!("{}/files/first.zip", server.uri()), "first");
    let first_id = downloader
        .start_download(&first, DownloadOptions::default())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = zip_entry(&format!("{}/files/second.zip", server.uri()), "second");
    let second_id = downloader
        .start_download(&second, DownloadOptions::default())
        .await
        .unwrap();
    assert_ne!(first_id, second_id);

    // The second job completes; the superseded first job eventually observes
    // cancellation (its response outlives the bounded wait) and cleans up.
    let mut saw_first_cancelled = false;
    let mut saw_second_completed = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(6);
    while !(saw_first_cancelled && saw_second_completed) {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let event = tokio::time::timeout(remaining, events.recv())
            .await
            .expect("timed out waiting for replacement events")
            .unwrap();
        match event {
            Event::Cancelled { id } if id == first_id => saw_first_cancelled = true,
            Event::Completed { id, .. } if id == second_id => saw_second_completed = true,
            _ => {}
        }
    }

    assert!(temp_dir.path().join("second.zip").exists());
    assert!(!temp_dir.path().join("first.zip").exists());

    let status = downloader.current_status().await.unwrap();
    assert_eq!(status.id, second_id);
}

// ── collisions and naming ───────────────────────────────────────────────

#[tokio::test]
async fn rename_collision_appends_numeric_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/trainer.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8; 1024]))
        .mount(&server)
        .await;

    let (downloader, temp_dir) = setup(&server).await;
    std::fs::write(temp_dir.path().join("trainer.zip"), "existing").unwrap();
    std::fs::write(temp_dir.path().join("trainer_1.zip"), "existing too").unwrap();

    let mut events = downloader.subscribe();
    let entry = zip_entry(&format!("{}/files/trainer.zip", server.uri()), "trainer");
    let id = downloader
        .start_download(
            &entry,
            DownloadOptions {
                collision: Some(FileCollisionAction::Rename),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let received = collect_until_terminal(&mut events, id, Duration::from_secs(5)).await;
    let expected = temp_dir.path().join("trainer_2.zip");
    assert!(
        matches!(received.last(), Some(Event::Completed { path, .. }) if *path == expected)
    );
    assert_eq!(std::fs::read(&expected).unwrap(), vec![5u8; 1024]);
    // Pre-existing files are untouched.
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("trainer.zip")).unwrap(),
        "existing"
    );
}

#[tokio::test]
async fn skip_collision_fails_the_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/trainer.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8; 1024]))
        .mount(&server)
        .await;

    let (downloader, temp_dir) = setup(&server).await;
    std::fs::write(temp_dir.path().join("trainer.zip"), "existing").unwrap();

    let mut events = downloader.subscribe();
    let entry = zip_entry(&format!("{}/files/trainer.zip", server.uri()), "trainer");
    let id = downloader
        .start_download(
            &entry,
            DownloadOptions {
                collision: Some(FileCollisionAction::Skip),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let received = collect_until_terminal(&mut events, id, Duration::from_secs(5)).await;
    assert!(matches!(received.last(), Some(Event::Failed { .. })));
    assert_eq!(
        std::fs::read_to_string(temp_dir.path().join("trainer.zip")).unwrap(),
        "existing"
    );
}

#[tokio::test]
async fn invalid_download_url_is_rejected_before_spawning() {
    let server = MockServer::start().await;
    let (downloader, _temp_dir) = setup(&server).await;

    let entry = zip_entry("not a url", "trainer");
    let error = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidUrl(_)));

    let entry = zip_entry("ftp://example.com/trainer.zip", "trainer");
    let error = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidUrl(_)));
}

#[tokio::test]
async fn shutdown_rejects_new_downloads() {
    let server = MockServer::start().await;
    let (downloader, _temp_dir) = setup(&server).await;

    downloader.shutdown().await;

    let entry = zip_entry(&format!("{}/files/x.zip", server.uri()), "x");
    let error = downloader
        .start_download(&entry, DownloadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, Error::ShuttingDown));
}

// ── search and page extraction ──────────────────────────────────────────

const SEARCH_FIXTURE: &str = r#"
<html><body>
  <article class="post">
    <h2 class="post-title"><a href="/trainer/elden-ring-trainer/">Elden Ring Trainer</a></h2>
    <div class="post-details-day">21</div>
    <div class="post-details-month">Feb</div>
    <div class="post-details-year">2024</div>
  </article>
</body></html>
"#;

const DETAIL_FIXTURE: &str = r#"
<html><body>
<div class="download-attachments">
  <table>
    <tr class="zip">
      <td><a href="/download.php?id=1">Elden Ring Trainer</a></td>
      <td>2024-02-21</td><td>1.2 MB</td><td>10234</td>
    </tr>
  </table>
</div>
</body></html>
"#;

#[tokio::test]
async fn search_parses_results_and_rebuilds_the_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("s", "elden ring"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SEARCH_FIXTURE)
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let results = downloader.search("elden ring").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Elden Ring Trainer");
    assert_eq!(results[0].date, "21 Feb 2024");
    assert_eq!(downloader.catalog().search_results().await, results);
}

#[tokio::test]
async fn unreachable_site_yields_empty_search_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    // Seed the catalog, then verify the failed cycle replaces it with nothing.
    downloader
        .catalog()
        .replace_search_results(vec![SearchResult {
            title: "stale".to_string(),
            url: "https://flingtrainer.com/stale".to_string(),
            date: String::new(),
        }])
        .await;

    let results = downloader.search("anything").await;

    assert!(results.is_empty());
    assert!(downloader.catalog().search_results().await.is_empty());
}

#[tokio::test]
async fn trainer_page_extracts_versions_via_plain_fetch_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trainer/elden-ring-trainer/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(DETAIL_FIXTURE)
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let entries = downloader
        .trainer_page(&format!("{}/trainer/elden-ring-trainer/", server.uri()))
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, "Elden Ring Trainer.zip");
    assert_eq!(entries[0].file_type, FileType::Zip);
    assert_eq!(downloader.catalog().versions().await, entries);
}

#[tokio::test]
async fn trainer_page_propagates_fetch_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trainer/gone/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let error = downloader
        .trainer_page(&format!("{}/trainer/gone/", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Fetch(_)));
}

// ── translation ─────────────────────────────────────────────────────────

struct FixedTranslator(Option<String>);

#[async_trait]
impl NameTranslator for FixedTranslator {
    async fn translate(
        &self,
        _query: &str,
        on_progress: TranslationProgress<'_>,
    ) -> crate::error::Result<Option<String>> {
        on_progress("resolving name");
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[tokio::test]
async fn search_translated_prefers_the_translators_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("s", "Elden Ring"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SEARCH_FIXTURE)
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let translator = FixedTranslator(Some("Elden Ring".to_string()));
    let results = downloader
        .search_translated("艾尔登法环", &translator, &|_msg| {})
        .await;

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn search_translated_falls_back_to_the_raw_term() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("s", "raw term"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(SEARCH_FIXTURE)
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&server)
        .await;

    let (downloader, _temp_dir) = setup(&server).await;
    let results = downloader
        .search_translated("raw term", &NoOpTranslator, &|_msg| {})
        .await;

    assert_eq!(results.len(), 1);
}

use catalog_harvest::config::Config;
use catalog_harvest::crawler::{spawn_run, Harvester};
use catalog_harvest::output::MemorySink;
use catalog_harvest::{FetchError, HarvestError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration serving UTF-8 pages
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.fetch.source_encoding = "utf-8".to_string();
    config.fetch.randomize_user_agent = false;
    config.fetch.per_domain_delay_ms = 0;
    config.fetch.request_timeout_secs = 5;
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 10;
    config
}

/// Builds an index page with one catalog item per href
fn index_page(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| format!(r#"<li><a href="{}">chapter</a></li>"#, href))
        .collect();
    format!(
        r#"<html><body><div id="catalog"><ul>{}</ul></div></body></html>"#,
        items
    )
}

fn detail_page(text: &str) -> String {
    format!(
        r#"<html><body><div class="nav">menu</div><div class="txtnav">{}</div></body></html>"#,
        text
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failed_page_is_omitted() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/book/",
        index_page(&["/book/0.html", "/book/1.html", "/book/2.html"]),
    )
    .await;
    mount_page(&server, "/book/0.html", detail_page("alpha")).await;
    mount_page(&server, "/book/2.html", detail_page("gamma")).await;
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let output_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(&create_test_config()).unwrap();
    let summary = harvester
        .run_to_dir(&format!("{}/book/", server.uri()), output_dir.path())
        .await
        .expect("Run failed");

    let output = std::fs::read_to_string(output_dir.path().join("novel.txt")).unwrap();
    assert_eq!(output, "alpha\ngamma\n");

    assert_eq!(summary.entry_count, 3);
    assert_eq!(summary.succeeded_count, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].position, 1);
    assert_eq!(summary.failures[0].attempts, 3);
    assert!(matches!(
        summary.failures[0].error,
        FetchError::Http { status: 500, .. }
    ));
    assert_eq!(
        summary.output_path.as_deref(),
        Some(output_dir.path().join("novel.txt").as_path())
    );
}

#[tokio::test]
async fn test_empty_catalog_yields_empty_output() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/", "<html><body>No chapters yet</body></html>".to_string()).await;

    let output_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(&create_test_config()).unwrap();
    let summary = harvester
        .run_to_dir(&format!("{}/book/", server.uri()), output_dir.path())
        .await
        .expect("Run failed");

    assert_eq!(summary.entry_count, 0);
    assert_eq!(summary.succeeded_count, 0);
    assert!(summary.failures.is_empty());

    let output = std::fs::read_to_string(output_dir.path().join("novel.txt")).unwrap();
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_page_recovers_after_retries() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/", index_page(&["1.html"])).await;

    // First two attempts fail, the third succeeds
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/book/1.html", detail_page("third time lucky")).await;

    let harvester = Harvester::new(&create_test_config()).unwrap();
    let mut sink = MemorySink::new();
    let summary = harvester
        .run(&format!("{}/book/", server.uri()), &mut sink)
        .await
        .expect("Run failed");

    assert_eq!(sink.contents(), "third time lucky\n");
    assert_eq!(summary.succeeded_count, 1);
    assert!(summary.failures.is_empty());
    assert!(summary.output_path.is_none());
}

#[tokio::test]
async fn test_discovery_failure_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let harvester = Harvester::new(&create_test_config()).unwrap();
    let mut sink = MemorySink::new();
    let result = harvester
        .run(&format!("{}/book/", server.uri()), &mut sink)
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Discovery(FetchError::Http { status: 404, .. }))
    ));
    assert!(sink.entries().is_empty());
    assert!(!sink.is_finished());
}

#[tokio::test]
async fn test_discovery_failure_keeps_existing_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let output_dir = TempDir::new().unwrap();
    let output_path = output_dir.path().join("novel.txt");
    std::fs::write(&output_path, "previous complete novel\n").unwrap();

    let harvester = Harvester::new(&create_test_config()).unwrap();
    let result = harvester
        .run_to_dir(&format!("{}/book/", server.uri()), output_dir.path())
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::Discovery(FetchError::Http { status: 503, .. }))
    ));
    assert_eq!(
        std::fs::read_to_string(&output_path).unwrap(),
        "previous complete novel\n"
    );
    assert!(!output_dir.path().join("novel.txt.part").exists());
}

#[tokio::test]
async fn test_output_follows_catalog_order() {
    let server = MockServer::start().await;
    let hrefs: Vec<String> = (0..10).map(|i| format!("{}.html", i)).collect();
    let href_refs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
    mount_page(&server, "/book/", index_page(&href_refs)).await;

    // Earlier chapters respond last
    for i in 0..10u64 {
        Mock::given(method("GET"))
            .and(path(format!("/book/{}.html", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_page(&format!("chapter {}", i)))
                    .set_delay(Duration::from_millis((10 - i) * 20)),
            )
            .mount(&server)
            .await;
    }

    let harvester = Harvester::new(&create_test_config()).unwrap();
    let mut sink = MemorySink::new();
    let summary = harvester
        .run(&format!("{}/book/", server.uri()), &mut sink)
        .await
        .expect("Run failed");

    let expected: Vec<String> = (0..10).map(|i| format!("chapter {}", i)).collect();
    assert_eq!(sink.entries(), expected.as_slice());
    assert_eq!(summary.succeeded_count, 10);
}

#[tokio::test]
async fn test_missing_content_counts_as_failure() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/", index_page(&["1.html", "2.html"])).await;
    mount_page(&server, "/book/1.html", "<html><body>moved</body></html>".to_string()).await;
    mount_page(&server, "/book/2.html", detail_page("beta")).await;

    let harvester = Harvester::new(&create_test_config()).unwrap();
    let mut sink = MemorySink::new();
    let summary = harvester
        .run(&format!("{}/book/", server.uri()), &mut sink)
        .await
        .expect("Run failed");

    assert_eq!(sink.contents(), "beta\n");
    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(
        summary.failures[0].error,
        FetchError::MissingContent { .. }
    ));
}

#[tokio::test]
async fn test_gbk_pages_end_to_end() {
    let server = MockServer::start().await;
    let index_html = index_page(&["1.html"]);
    let detail_html = detail_page("第一章 你好");
    let (index, _, _) = encoding_rs::GBK.encode(&index_html);
    let (detail, _, _) = encoding_rs::GBK.encode(&detail_html);

    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(index.into_owned()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(detail.into_owned()))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.fetch.source_encoding = "gbk".to_string();

    let output_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(&config).unwrap();
    harvester
        .run_to_dir(&format!("{}/book/", server.uri()), output_dir.path())
        .await
        .expect("Run failed");

    let output = std::fs::read_to_string(output_dir.path().join("novel.txt")).unwrap();
    assert_eq!(output, "第一章 你好\n");
}

#[tokio::test]
async fn test_malformed_gbk_byte_keeps_page() {
    let server = MockServer::start().await;
    let index_html = index_page(&["1.html"]);
    let (index, _, _) = encoding_rs::GBK.encode(&index_html);
    let mut detail = b"<html><body><div class=\"txtnav\">".to_vec();
    detail.extend_from_slice(&[0xC4, 0xE3, 0xBA, 0xC3, 0x81]);
    detail.extend_from_slice(b" more text</div></body></html>");

    Mock::given(method("GET"))
        .and(path("/book/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(index.into_owned()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(detail))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.fetch.source_encoding = "gbk".to_string();

    let harvester = Harvester::new(&config).unwrap();
    let mut sink = MemorySink::new();
    let summary = harvester
        .run(&format!("{}/book/", server.uri()), &mut sink)
        .await
        .expect("Run failed");

    assert_eq!(summary.succeeded_count, 1);
    assert!(summary.failures.is_empty());
    let text = &sink.entries()[0];
    assert!(text.starts_with("你好"));
    assert!(text.contains('\u{FFFD}'));
    assert!(text.ends_with("more text"));
}

#[tokio::test]
async fn test_strict_decoding_fails_page_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/", index_page(&["1.html", "2.html"])).await;
    mount_page(&server, "/book/2.html", detail_page("beta")).await;
    let mut detail = detail_page("").into_bytes();
    detail.push(0xFF);
    Mock::given(method("GET"))
        .and(path("/book/1.html"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(detail))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.fetch.lossy_decoding = false;

    let harvester = Harvester::new(&config).unwrap();
    let mut sink = MemorySink::new();
    let summary = harvester
        .run(&format!("{}/book/", server.uri()), &mut sink)
        .await
        .expect("Run failed");

    assert_eq!(sink.contents(), "beta\n");
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].attempts, 1);
    assert!(matches!(
        summary.failures[0].error,
        FetchError::Decode { .. }
    ));
}

#[tokio::test]
async fn test_discover_lists_entries() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/", index_page(&["1.html", "/other/2.html"])).await;

    let harvester = Harvester::new(&create_test_config()).unwrap();
    let entries = harvester
        .discover(&format!("{}/book/", server.uri()))
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[0].source_url.as_str(),
        format!("{}/book/1.html", server.uri())
    );
    assert_eq!(
        entries[1].source_url.as_str(),
        format!("{}/other/2.html", server.uri())
    );
}

#[tokio::test]
async fn test_spawned_run_completes() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/", index_page(&["1.html"])).await;
    mount_page(&server, "/book/1.html", detail_page("alpha")).await;

    let output_dir = TempDir::new().unwrap();
    let harvester = Arc::new(Harvester::new(&create_test_config()).unwrap());
    let handle = spawn_run(
        harvester,
        format!("{}/book/", server.uri()),
        output_dir.path(),
    );

    let summary = handle.wait().await.expect("Run failed");
    assert_eq!(summary.succeeded_count, 1);
    assert!(summary.status_message().contains("novel.txt"));
}

#[tokio::test]
async fn test_spawned_run_can_be_cancelled() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/", index_page(&["1.html", "2.html"])).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(detail_page("slow"))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let output_dir = TempDir::new().unwrap();
    let output_path = output_dir.path().join("novel.txt");
    std::fs::write(&output_path, "previous complete novel\n").unwrap();

    let harvester = Arc::new(Harvester::new(&create_test_config()).unwrap());
    let handle = spawn_run(
        harvester,
        format!("{}/book/", server.uri()),
        output_dir.path(),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!handle.is_finished());
    handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("Cancelled run did not stop");
    assert!(matches!(result, Err(HarvestError::Cancelled)));
    assert_eq!(
        std::fs::read_to_string(&output_path).unwrap(),
        "previous complete novel\n"
    );
}

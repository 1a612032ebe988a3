use catalog_harvest::config::{load_config, Backoff};
use catalog_harvest::crawler::Harvester;
use catalog_harvest::output::MemorySink;
use catalog_harvest::{ConfigError, HarvestError};
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_config_file_drives_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.html"))
        .and(header("referer", "https://example.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<dl id="list"><dd><a href="a.html">A</a></dd><dd><a href="b.html">B</a></dd></dl>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<div id="content">first</div>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<div id="content">second</div>"#))
        .mount(&server)
        .await;

    let file = write_config(
        r##"
[fetch]
source-encoding = "utf-8"
randomize-user-agent = false
per-domain-delay-ms = 0

[fetch.headers]
Referer = "https://example.com/"

[retry]
max-attempts = 2
base-delay-ms = 5
backoff = "constant"

[pipeline]
concurrency-limit = 4
catalog-selector = "#list dd"
content-selector = "#content"
output-file-name = "book.txt"
"##,
    );

    let config = load_config(file.path()).expect("Failed to load config");
    assert_eq!(config.retry.backoff, Backoff::Constant);

    let harvester = Harvester::new(&config).unwrap();
    assert_eq!(harvester.concurrency_limit(), 4);

    let mut sink = MemorySink::new();
    let summary = harvester
        .run(&format!("{}/list.html", server.uri()), &mut sink)
        .await
        .expect("Run failed");

    assert_eq!(sink.contents(), "first\nsecond\n");
    assert_eq!(summary.entry_count, 2);

    let output_dir = tempfile::TempDir::new().unwrap();
    harvester
        .run_to_dir(&format!("{}/list.html", server.uri()), output_dir.path())
        .await
        .expect("Run failed");
    assert!(output_dir.path().join("book.txt").exists());
}

#[test]
fn test_invalid_config_rejected_by_harvester() {
    let file = write_config(
        r#"
[pipeline]
content-selector = "div["
"#,
    );

    let result = load_config(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidSelector { .. })));

    let mut config = catalog_harvest::Config::default();
    config.fetch.source_encoding = "klingon".to_string();
    assert!(matches!(
        Harvester::new(&config),
        Err(HarvestError::Config(ConfigError::UnknownEncoding(_)))
    ));
}

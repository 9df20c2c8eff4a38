//! Integration tests for the mirror engine
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! mirrors end-to-end into temporary directories.

use site_mirror::{Mirror, MirrorConfig, MirrorError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

fn raw(body: &'static [u8], mime: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, mime)
}

/// Mounts a GET mock for `route` that must be hit exactly `times` times
async fn mount(server: &MockServer, route: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Creates a test configuration rooted at the mock server
fn create_test_config(server_uri: &str, out: &Path, max_depth: u32) -> MirrorConfig {
    MirrorConfig::new(Url::parse(&format!("{}/", server_uri)).unwrap())
        .with_output_dir(out)
        .with_max_depth(max_depth)
        .with_timeout(Duration::from_secs(5))
        .with_concurrency(4)
}

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("missing {}: {}", rel, e))
}

#[tokio::test]
async fn test_full_mirror_rewrites_links() {
    let mock_server = MockServer::start().await;

    let index = r#"<!doctype html>
<html>
<head>
  <link rel="stylesheet" href="/static/style.css">
  <script src="/static/app.js"></script>
</head>
<body>
  <img src="/img/logo.png">
  <a href="/page">Go page</a>
</body>
</html>"#;

    mount(&mock_server, "/", html(index), 1).await;
    mount(&mock_server, "/page", html("<html><body>PAGE</body></html>"), 1).await;
    mount(
        &mock_server,
        "/static/app.js",
        raw(b"console.log('ok')", "application/javascript").set_delay(Duration::from_millis(50)),
        1,
    )
    .await;
    mount(
        &mock_server,
        "/static/style.css",
        raw(b"body{background:#fff}", "text/css").set_delay(Duration::from_millis(50)),
        1,
    )
    .await;
    mount(&mock_server, "/img/logo.png", raw(&[0x89, 0x50], "image/png"), 1).await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 1)).unwrap();
    let report = mirror.run().await.expect("Mirror failed");

    let root = mirror.root_dir();
    for file in [
        "index.html",
        "page/index.html",
        "static/app.js",
        "static/style.css",
        "img/logo.png",
    ] {
        assert!(root.join(file).is_file(), "expected file {}", file);
    }

    let idx = read(root, "index.html");
    assert!(idx.contains(r#"href="static/style.css""#), "{}", idx);
    assert!(idx.contains(r#"src="static/app.js""#), "{}", idx);
    assert!(idx.contains(r#"src="img/logo.png""#), "{}", idx);
    assert!(idx.contains(r#"href="page/index.html""#), "{}", idx);

    assert_eq!(read(root, "static/app.js"), "console.log('ok')");
    assert_eq!(std::fs::read(root.join("img/logo.png")).unwrap(), vec![0x89, 0x50]);

    assert_eq!(report.tally.pages_saved, 2);
    assert_eq!(report.tally.assets_saved, 3);
    assert_eq!(report.tally.failures, 0);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_depth_zero_fetches_start_page_and_assets_only() {
    let mock_server = MockServer::start().await;

    mount(
        &mock_server,
        "/",
        html(r#"<link rel="icon" href="/favicon.ico"><a href="/page">Page</a>"#),
        1,
    )
    .await;
    mount(&mock_server, "/favicon.ico", raw(b"ico", "image/x-icon"), 1).await;
    mount(&mock_server, "/page", html("<html></html>"), 0).await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 0)).unwrap();
    mirror.run().await.expect("Mirror failed");

    let root = mirror.root_dir();
    assert!(root.join("favicon.ico").is_file());
    assert!(!root.join("page").exists());

    // The link is still rewritten even though the page was not fetched
    let idx = read(root, "index.html");
    assert!(idx.contains(r#"href="page/index.html""#), "{}", idx);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_depth_one_stops_at_second_level() {
    let mock_server = MockServer::start().await;

    mount(&mock_server, "/", html(r#"<a href="/level1">1</a>"#), 1).await;
    mount(
        &mock_server,
        "/level1",
        html(r#"<a href="/level2">2</a><img src="/level1.png">"#),
        1,
    )
    .await;
    mount(&mock_server, "/level1.png", raw(b"png", "image/png"), 1).await;
    mount(&mock_server, "/level2", html("<html></html>"), 0).await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 1)).unwrap();
    mirror.run().await.expect("Mirror failed");

    let root = mirror.root_dir();
    assert!(root.join("level1/index.html").is_file());
    assert!(root.join("level1.png").is_file());
    assert!(!root.join("level2").exists());

    let level1 = read(root, "level1/index.html");
    assert!(level1.contains(r#"href="../level2/index.html""#), "{}", level1);
    assert!(level1.contains(r#"src="../level1.png""#), "{}", level1);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_shared_references_fetched_once() {
    let mock_server = MockServer::start().await;

    let shared = r#"
        <link rel="stylesheet" href="/shared.css">
        <script src="/shared.js"></script>
        <a href="/">home</a><a href="/a">a</a><a href="/b">b</a><a href="/b#again">b</a>
    "#;

    mount(&mock_server, "/", html(shared), 1).await;
    mount(&mock_server, "/a", html(shared), 1).await;
    mount(&mock_server, "/b", html(shared), 1).await;
    mount(&mock_server, "/shared.css", raw(b"css", "text/css"), 1).await;
    mount(&mock_server, "/shared.js", raw(b"js", "text/javascript"), 1).await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 3)).unwrap();
    let report = mirror.run().await.expect("Mirror failed");

    assert_eq!(report.tally.pages_saved, 3);
    assert_eq!(report.tally.assets_saved, 2);
    assert_eq!(report.distinct_pages, 3);
    assert_eq!(report.distinct_assets, 2);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5, "each URL fetched exactly once");

    mock_server.verify().await;
}

#[tokio::test]
async fn test_cross_host_references_are_not_followed() {
    let site = MockServer::start().await;
    let elsewhere = MockServer::start().await;

    let external_page = format!("{}/external", elsewhere.uri());
    let external_img = format!("{}/external.png", elsewhere.uri());

    mount(
        &site,
        "/",
        html(format!(
            r#"<a href="{}">out</a><img src="{}"><a href="https://example.invalid/x">x</a>"#,
            external_page, external_img
        )),
        1,
    )
    .await;
    mount(&elsewhere, "/external", html("<html></html>"), 0).await;
    mount(&elsewhere, "/external.png", raw(b"png", "image/png"), 0).await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&site.uri(), out.path(), 2)).unwrap();
    let report = mirror.run().await.expect("Mirror failed");

    let idx = read(mirror.root_dir(), "index.html");
    assert!(idx.contains(&format!(r#"href="{}""#, external_page)), "{}", idx);
    assert!(idx.contains(&format!(r#"src="{}""#, external_img)), "{}", idx);
    assert!(idx.contains(r#"href="https://example.invalid/x""#), "{}", idx);

    assert_eq!(report.tally.pages_saved, 1);
    assert_eq!(report.tally.assets_saved, 0);

    // Only the site's own directory exists in the output
    let entries: Vec<_> = std::fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);

    site.verify().await;
    elsewhere.verify().await;
}

#[tokio::test]
async fn test_failed_jobs_do_not_abort_the_run() {
    let mock_server = MockServer::start().await;

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/missing">gone</a><a href="/ok">ok</a><img src="/broken.png">"#),
        1,
    )
    .await;
    mount(&mock_server, "/ok", html("<html>fine</html>"), 1).await;
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    // /missing falls through to wiremock's default 404

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 1)).unwrap();
    let report = mirror.run().await.expect("per-job failures must not fail the run");

    let root = mirror.root_dir();
    assert!(root.join("index.html").is_file());
    assert!(root.join("ok/index.html").is_file());
    assert!(!root.join("missing").exists());
    assert!(!root.join("broken.png").exists());

    assert_eq!(report.tally.pages_saved, 2);
    assert_eq!(report.tally.failures, 2);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_query_strings_map_to_distinct_files() {
    let mock_server = MockServer::start().await;

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/list?page=1">1</a><a href="/list?page=2">2</a>"#),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(html("<html>list</html>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 1)).unwrap();
    mirror.run().await.expect("Mirror failed");

    let list_dir = mirror.root_dir().join("list");
    let mut names: Vec<String> = std::fs::read_dir(&list_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    for name in &names {
        assert!(name.starts_with("index-") && name.ends_with(".html"), "{}", name);
        let idx = read(mirror.root_dir(), "index.html");
        assert!(idx.contains(&format!(r#"href="list/{}""#, name)), "{}", idx);
    }

    mock_server.verify().await;
}

#[tokio::test]
async fn test_escaped_names_browse_offline() {
    let mock_server = MockServer::start().await;

    mount(
        &mock_server,
        "/",
        html(r#"<img src="/my%20logo.png"><a href="/caf%C3%A9">cafe</a><a href="/list?a=1&amp;b=2">list</a>"#),
        1,
    )
    .await;
    mount(&mock_server, "/my%20logo.png", raw(b"png", "image/png"), 1).await;
    mount(&mock_server, "/caf%C3%A9", html("<html>menu</html>"), 1).await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("a", "1"))
        .and(query_param("b", "2"))
        .respond_with(html("<html>list</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 1)).unwrap();
    let report = mirror.run().await.expect("Mirror failed");
    assert_eq!(report.tally.failures, 0);

    let root = mirror.root_dir();
    assert!(root.join("my logo.png").is_file());
    assert!(root.join("café/index.html").is_file());

    let index = root.join("index.html");
    let idx = read(root, "index.html");
    assert!(idx.contains(r#"src="my%20logo.png""#), "{}", idx);
    assert!(idx.contains(r#"href="caf%C3%A9/index.html""#), "{}", idx);

    // Every rewritten reference resolves to a file the way a browser would
    let page_url = Url::from_file_path(&index).unwrap();
    for reference in ["my%20logo.png", "caf%C3%A9/index.html"] {
        let target = page_url.join(reference).unwrap().to_file_path().unwrap();
        assert!(target.is_file(), "{} -> {:?}", reference, target);
    }

    mock_server.verify().await;
}

#[tokio::test]
async fn test_non_html_page_saved_verbatim() {
    let mock_server = MockServer::start().await;

    mount(&mock_server, "/", html(r#"<a href="/report.pdf">report</a>"#), 1).await;
    mount(
        &mock_server,
        "/report.pdf",
        raw(b"%PDF-1.4 <a href=\"/x\">", "application/pdf"),
        1,
    )
    .await;
    mount(&mock_server, "/x", html("<html></html>"), 0).await;

    let out = tempfile::tempdir().unwrap();
    let mirror = Mirror::new(create_test_config(&mock_server.uri(), out.path(), 2)).unwrap();
    mirror.run().await.expect("Mirror failed");

    assert_eq!(
        read(mirror.root_dir(), "report.pdf"),
        "%PDF-1.4 <a href=\"/x\">"
    );

    mock_server.verify().await;
}

#[tokio::test]
async fn test_asset_cap_limits_fetches() {
    let mock_server = MockServer::start().await;

    mount(
        &mock_server,
        "/",
        html(r#"<img src="/1.png"><img src="/2.png"><img src="/3.png">"#),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(raw(b"png", "image/png"))
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path(), 0).with_max_assets(Some(2));
    let mirror = Mirror::new(config).unwrap();
    let report = mirror.run().await.expect("Mirror failed");

    assert_eq!(report.tally.assets_saved, 2);
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_global_timeout_returns_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html("<html></html>").set_delay(Duration::from_secs(60)))
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path(), 1)
        .with_timeout(Duration::from_millis(300));
    let mirror = Mirror::new(config).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), mirror.run())
        .await
        .expect("run must not hang past its deadline");

    match result {
        Err(MirrorError::Timeout { timeout }) => {
            assert_eq!(timeout, Duration::from_millis(300));
        }
        other => panic!("expected timeout, got {:?}", other.map(|r| r.tally)),
    }
}

#[tokio::test]
async fn test_timeout_keeps_files_already_written() {
    let mock_server = MockServer::start().await;

    mount(
        &mock_server,
        "/",
        html(r#"<a href="/slow">slow</a><img src="/fast.png">"#),
        1,
    )
    .await;
    mount(&mock_server, "/fast.png", raw(b"png", "image/png"), 1).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<html></html>").set_delay(Duration::from_secs(60)))
        .mount(&mock_server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(&mock_server.uri(), out.path(), 1)
        .with_timeout(Duration::from_millis(800));
    let mirror = Mirror::new(config).unwrap();

    let result = mirror.run().await;
    assert!(matches!(result, Err(MirrorError::Timeout { .. })));

    assert!(mirror.root_dir().join("index.html").is_file());
    assert!(mirror.root_dir().join("fast.png").is_file());
    assert!(!mirror.root_dir().join("slow").exists());
}

/// Starts a minimal HTTP server that records the peak number of requests
/// being handled at the same time
async fn spawn_counting_server(fan_out: usize) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let index: String = (0..fan_out)
        .map(|i| format!(r#"<a href="/p{i}">p</a><img src="/i{i}.png">"#))
        .collect();

    let peak_out = Arc::clone(&peak);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            let index = index.clone();

            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                let route = head.split_whitespace().nth(1).unwrap_or("/").to_string();

                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(40)).await;
                current.fetch_sub(1, Ordering::SeqCst);

                let body = if route == "/" {
                    index
                } else {
                    "<html><body>leaf</body></html>".to_string()
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}", addr), peak_out)
}

#[tokio::test]
async fn test_concurrency_never_exceeds_worker_count() {
    let (uri, peak) = spawn_counting_server(8).await;

    let out = tempfile::tempdir().unwrap();
    let config = create_test_config(&uri, out.path(), 1).with_concurrency(2);
    let mirror = Mirror::new(config).unwrap();
    let report = mirror.run().await.expect("Mirror failed");

    assert_eq!(report.tally.pages_saved, 9);
    assert_eq!(report.tally.assets_saved, 8);

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak >= 1, "server saw no requests");
    assert!(peak <= 2, "concurrency exceeded limit: peak={}", peak);
}

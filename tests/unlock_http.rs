use std::time::Duration;

use linkunlock_rs::{
    BypassResult, DispatchOutcome, FailureKind, LinkBundle, LinkUnlocker, ServiceFamily,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MOBILE_UA: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36";

fn bundle(outcome: DispatchOutcome) -> LinkBundle {
    match outcome {
        DispatchOutcome::Resolved(BypassResult::Found(bundle)) => bundle,
        other => panic!("expected links, got {other:?}"),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn hubdrive_alias_resolves_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/abc123"))
        .and(header("user-agent", MOBILE_UA))
        .respond_with(html(
            r#"<a class="btn" href="https://hubcloud.one/drive/abc123">HubCloud Server</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let unlocker = LinkUnlocker::builder()
        .with_alias(ServiceFamily::HubDrive, r"127\.0\.0\.1:\d+/drive/")
        .build()
        .unwrap();

    let bundle = bundle(unlocker.handle(&format!("{}/drive/abc123", server.uri())).await);
    assert_eq!(bundle.family, ServiceFamily::HubDrive);
    assert_eq!(bundle.single_url(), Some("https://hubcloud.one/drive/abc123"));
}

#[tokio::test]
async fn photolinx_cookie_and_token_flow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photolinx/file1"))
        .respond_with(
            html(
                r#"<h1>file1.mkv</h1>
                <button id="generate_url" data-token="tok-1" data-uid="uid-7">Generate</button>"#,
            )
            .insert_header("set-cookie", "PHPSESSID=sess-42; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/action"))
        .and(header("cookie", "PHPSESSID=sess-42"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(body_json(json!({
            "type": "DOWNLOAD_GENERATE",
            "payload": {"access_token": "tok-1", "uid": "uid-7"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"download_url": "/dl/file1.mkv"})))
        .expect(1)
        .mount(&server)
        .await;

    let unlocker = LinkUnlocker::builder()
        .with_alias(ServiceFamily::PhotoLinx, r"127\.0\.0\.1:\d+/photolinx/")
        .build()
        .unwrap();

    let bundle = bundle(unlocker.handle(&format!("{}/photolinx/file1", server.uri())).await);
    assert_eq!(bundle.file_name.as_deref(), Some("file1.mkv"));
    assert_eq!(
        bundle.single_url().map(str::to_string),
        Some(format!("{}/dl/file1.mkv", server.uri()))
    );
}

#[tokio::test]
async fn photolinx_without_cookie_never_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photolinx/file2"))
        .respond_with(html(r#"<button id="generate_url" data-token="t" data-uid="u"></button>"#))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let unlocker = LinkUnlocker::builder()
        .with_alias(ServiceFamily::PhotoLinx, r"127\.0\.0\.1:\d+/photolinx/")
        .build()
        .unwrap();

    let outcome = unlocker.handle(&format!("{}/photolinx/file2", server.uri())).await;
    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::Session));
}

#[tokio::test]
async fn gdflix_follows_manifest_domain_and_crawls_servers() {
    let server = MockServer::start().await;
    let live = server.uri();

    Mock::given(method("GET"))
        .and(path("/urls.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "gdflix": live })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file/abc"))
        .respond_with(html(
            r#"<ul>
                 <li class="list-group-item">Name : Movie.2024.mkv</li>
                 <li class="list-group-item">Size : 2.1GB</li>
               </ul>
               <div class="text-center">
                 <a href="https://direct.example/dl/1">DIRECT DL [10GBPS]</a>
                 <a href="/zfile/abc">Index Links</a>
                 <a href="/instant/1">Instant DL [10GBPS]</a>
                 <a href="https://gofile.io/d/xyz">GoFile</a>
               </div>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zfile/abc"))
        .respond_with(html(
            r#"<a class="btn btn-outline-info" href="/zfile/abc/s1">Server 1</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zfile/abc/s1"))
        .respond_with(html(
            r#"<div class="mb-4"><a href="https://index.example/Movie.2024.mkv">Download</a></div>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/instant/1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "https://gate.example/?url=https://cdn.example/Movie.2024.mkv"),
        )
        .mount(&server)
        .await;

    let unlocker = LinkUnlocker::builder()
        .with_manifest_url(format!("{live}/urls.json"))
        .build()
        .unwrap();

    let bundle = bundle(unlocker.handle("https://gdflix.old/file/abc").await);
    assert_eq!(bundle.family, ServiceFamily::GDFlix);
    assert_eq!(bundle.file_name.as_deref(), Some("Movie.2024.mkv"));
    assert_eq!(bundle.file_size.as_deref(), Some("2.1GB"));

    let labelled: Vec<(&str, &str)> = bundle
        .links
        .iter()
        .map(|link| (link.kind.as_str(), link.url.as_str()))
        .collect();
    assert_eq!(
        labelled,
        vec![
            ("Direct", "https://direct.example/dl/1"),
            ("Index", "https://index.example/Movie.2024.mkv"),
            ("Instant DL", "https://cdn.example/Movie.2024.mkv"),
            ("GoFile", "https://gofile.io/d/xyz"),
        ]
    );
}

#[tokio::test]
async fn fastilinks_csrf_post_reveals_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fasti/abc"))
        .respond_with(
            html(
                r#"<form method="post">
                     <input type="hidden" name="_csrf_token_abc123" value="tok-9">
                   </form>"#,
            )
            .insert_header("set-cookie", "PHPSESSID=fs-1; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fasti/abc"))
        .and(header("cookie", "PHPSESSID=fs-1"))
        .and(body_string_contains("_csrf_token_abc123=tok-9"))
        .respond_with(html(
            r#"<div class="well"><a href="https://hubdrive.space/file/1">HubDrive</a></div>
               <a class="btn-download" href="https://gdflix.dev/file/2">GDFlix</a>
               <a class="btn-download" href="https://hubdrive.space/file/1">dup</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let unlocker = LinkUnlocker::builder()
        .with_alias(ServiceFamily::FastiLinks, r"127\.0\.0\.1:\d+/fasti/")
        .build()
        .unwrap();

    let bundle = bundle(unlocker.handle(&format!("{}/fasti/abc", server.uri())).await);
    let urls: Vec<&str> = bundle.urls().collect();
    assert_eq!(urls, vec!["https://hubdrive.space/file/1", "https://gdflix.dev/file/2"]);
    assert_eq!(
        bundle.to_json(),
        json!({
            "links": [
                {"type": "FastiLinks", "url": "https://hubdrive.space/file/1"},
                {"type": "FastiLinks", "url": "https://gdflix.dev/file/2"}
            ]
        })
    );
}

#[tokio::test]
async fn slow_and_failing_sites_become_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/slow"))
        .respond_with(html("<p>late</p>").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/broken"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let unlocker = LinkUnlocker::builder()
        .with_alias(ServiceFamily::HubDrive, r"127\.0\.0\.1:\d+/drive/")
        .with_request_timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let slow = unlocker.handle(&format!("{}/drive/slow", server.uri())).await;
    assert_eq!(slow.failure().map(|f| f.kind), Some(FailureKind::Timeout));

    let broken = unlocker.handle(&format!("{}/drive/broken", server.uri())).await;
    let failure = broken.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Transport);
    assert!(failure.message.contains("502"));

    let metrics = unlocker.metrics().unwrap().snapshot();
    assert_eq!(metrics.global.failures, 2);
}

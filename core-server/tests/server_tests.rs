//! End-to-end tests for the loopback stream server, exercised over real
//! HTTP with `reqwest`. Servers are created with port 0 so parallel tests
//! never contend for the fixed default port.

use core_server::{ServerError, StreamServer};
use reqwest::header;
use reqwest::StatusCode;
use std::path::PathBuf;
use tempfile::TempDir;

fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn write_media_file(dir: &TempDir, name: &str, len: usize) -> (PathBuf, Vec<u8>) {
    let path = dir.path().join(name);
    let bytes = patterned_bytes(len);
    tokio::fs::write(&path, &bytes).await.unwrap();
    (path, bytes)
}

async fn hls_fixture(dir: &TempDir) -> PathBuf {
    let hls_dir = dir.path().join("job");
    tokio::fs::create_dir_all(&hls_dir).await.unwrap();
    tokio::fs::write(
        hls_dir.join("master.m3u8"),
        "#EXTM3U\n#EXTINF:4.00000,\nsegment_00000.ts\n",
    )
    .await
    .unwrap();
    tokio::fs::write(hls_dir.join("segment_00000.ts"), b"\x47segmentdata").await.unwrap();
    hls_dir
}

#[tokio::test(flavor = "multi_thread")]
async fn full_request_returns_entire_file() {
    let dir = TempDir::new().unwrap();
    let (path, bytes) = write_media_file(&dir, "movie.mp4", 100_000).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();

    let response = reqwest::get(handle.url()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCEPT_RANGES).unwrap(),
        "bytes"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "100000"
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), bytes.as_slice());
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_full_range_returns_200() {
    let dir = TempDir::new().unwrap();
    let (path, _bytes) = write_media_file(&dir, "movie.mp4", 50_000).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(handle.url())
        .header(header::RANGE, "bytes=0-49999")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_RANGE).is_none());
    assert_eq!(response.bytes().await.unwrap().len(), 50_000);
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_ranges_on_ten_megabyte_file() {
    let dir = TempDir::new().unwrap();
    let (path, bytes) = write_media_file(&dir, "movie.mp4", 10_000_000).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();
    let client = reqwest::Client::new();

    // Mid-file range.
    let response = client
        .get(handle.url())
        .header(header::RANGE, "bytes=500000-999999")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 500000-999999/10000000"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        "500000"
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(body.as_ref(), &bytes[500_000..1_000_000]);

    // Suffix range: the last 1000 bytes.
    let response = client
        .get(handle.url())
        .header(header::RANGE, "bytes=-1000")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 9999000-9999999/10000000"
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), &bytes[9_999_000..]);

    // Open-ended range.
    let response = client
        .get(handle.url())
        .header(header::RANGE, "bytes=9999990-")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.bytes().await.unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn range_past_end_of_file_is_416() {
    let dir = TempDir::new().unwrap();
    let (path, _bytes) = write_media_file(&dir, "movie.mp4", 1000).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(handle.url())
        .header(header::RANGE, "bytes=1000-")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test(flavor = "multi_thread")]
async fn non_overlapping_ranges_reassemble_the_file() {
    let dir = TempDir::new().unwrap();
    let (path, bytes) = write_media_file(&dir, "movie.mp4", 10_000).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();
    let client = reqwest::Client::new();

    let mut assembled = Vec::new();
    for range in ["bytes=0-1233", "bytes=1234-9999"] {
        let response = client
            .get(handle.url())
            .header(header::RANGE, range)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assembled.extend_from_slice(&response.bytes().await.unwrap());
    }

    assert_eq!(assembled, bytes);
}

#[tokio::test(flavor = "multi_thread")]
async fn cleanup_is_idempotent_and_unregisters_the_route() {
    let dir = TempDir::new().unwrap();
    let (path, _bytes) = write_media_file(&dir, "movie.mp4", 1000).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();
    let url = handle.url().to_string();

    assert_eq!(reqwest::get(&url).await.unwrap().status(), StatusCode::OK);
    assert_eq!(server.active_sessions(), 1);

    handle.cleanup();
    handle.cleanup();
    assert_eq!(server.active_sessions(), 0);
    assert_eq!(
        reqwest::get(&url).await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn sessions_coexist_independently() {
    let dir = TempDir::new().unwrap();
    let (first_path, first_bytes) = write_media_file(&dir, "a.mp4", 2000).await;
    let (second_path, second_bytes) = write_media_file(&dir, "b.mp4", 3000).await;

    let server = StreamServer::new(0);
    let first = server.register_file(&first_path).await.unwrap();
    let second = server.register_file(&second_path).await.unwrap();
    assert_ne!(first.url(), second.url());

    assert_eq!(
        reqwest::get(first.url()).await.unwrap().bytes().await.unwrap().as_ref(),
        first_bytes.as_slice()
    );
    assert_eq!(
        reqwest::get(second.url()).await.unwrap().bytes().await.unwrap().as_ref(),
        second_bytes.as_slice()
    );

    // Cleaning one leaves the other servable.
    first.cleanup();
    assert_eq!(
        reqwest::get(second.url()).await.unwrap().status(),
        StatusCode::OK
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn non_get_methods_are_rejected() {
    let dir = TempDir::new().unwrap();
    let (path, _bytes) = write_media_file(&dir, "movie.mp4", 100).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();

    let client = reqwest::Client::new();
    let response = client.post(handle.url()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_sessions_and_routes_are_404() {
    let dir = TempDir::new().unwrap();
    let (path, _bytes) = write_media_file(&dir, "movie.mp4", 100).await;

    let server = StreamServer::new(0);
    let handle = server.register_file(&path).await.unwrap();
    let port = server.bound_port().unwrap();

    // Valid UUID, no such session.
    let url = format!(
        "http://127.0.0.1:{}/stream/{}",
        port,
        uuid::Uuid::new_v4()
    );
    assert_eq!(reqwest::get(&url).await.unwrap().status(), StatusCode::NOT_FOUND);

    // Not a UUID at all.
    let url = format!("http://127.0.0.1:{}/stream/not-a-uuid", port);
    assert_eq!(reqwest::get(&url).await.unwrap().status(), StatusCode::NOT_FOUND);

    // Unknown route.
    let url = format!("http://127.0.0.1:{}/health", port);
    assert_eq!(reqwest::get(&url).await.unwrap().status(), StatusCode::NOT_FOUND);

    // A file session is not an HLS session.
    let url = format!("http://127.0.0.1:{}/hls/{}", port, handle.id());
    assert_eq!(reqwest::get(&url).await.unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn hls_playlist_and_segments_are_served() {
    let dir = TempDir::new().unwrap();
    let hls_dir = hls_fixture(&dir).await;

    let server = StreamServer::new(0);
    let handle = server.register_hls(&hls_dir, "master.m3u8").await.unwrap();
    assert!(handle.url().ends_with("/master.m3u8"));

    // Playlist by its URL.
    let response = reqwest::get(handle.url()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.apple.mpegurl"
    );
    assert!(response.text().await.unwrap().contains("#EXTINF"));

    // Segment relative to the playlist.
    let segment_url = handle.url().replace("master.m3u8", "segment_00000.ts");
    let response = reqwest::get(&segment_url).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp2t"
    );

    // The bare session route serves the playlist too.
    let bare_url = handle.url().trim_end_matches("/master.m3u8").to_string();
    let response = reqwest::get(&bare_url).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("#EXTINF"));

    // Missing segment.
    let missing_url = handle.url().replace("master.m3u8", "segment_99999.ts");
    assert_eq!(
        reqwest::get(&missing_url).await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn hls_requests_cannot_escape_the_session_directory() {
    let dir = TempDir::new().unwrap();
    let hls_dir = hls_fixture(&dir).await;
    tokio::fs::write(dir.path().join("secret.txt"), b"keep out").await.unwrap();

    let server = StreamServer::new(0);
    let handle = server.register_hls(&hls_dir, "master.m3u8").await.unwrap();

    // Encoded dot-dot survives URL normalization and reaches the server,
    // where the traversal guard strips it.
    let escape_url = handle.url().replace("master.m3u8", "%2e%2e/secret.txt");
    let response = reqwest::get(&escape_url).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn hls_registration_requires_the_playlist() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty");
    tokio::fs::create_dir_all(&empty).await.unwrap();

    let server = StreamServer::new(0);
    let result = server.register_hls(&empty, "master.m3u8").await;
    assert!(matches!(result, Err(ServerError::InvalidRequest(_))));
    // A failed registration never starts the listener.
    assert!(server.bound_port().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn taken_port_falls_back_to_ephemeral() {
    let dir = TempDir::new().unwrap();
    let (path, _bytes) = write_media_file(&dir, "movie.mp4", 100).await;

    // Occupy a port, then ask the server for that same port.
    let occupied = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let taken_port = occupied.local_addr().unwrap().port();

    let server = StreamServer::new(taken_port);
    let handle = server.register_file(&path).await.unwrap();

    let bound = server.bound_port().unwrap();
    assert_ne!(bound, taken_port);
    assert!(handle.url().contains(&format!("127.0.0.1:{}", bound)));
    assert_eq!(reqwest::get(handle.url()).await.unwrap().status(), StatusCode::OK);
}

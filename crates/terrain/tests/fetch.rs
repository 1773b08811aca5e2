//! Loading terrain over HTTP from a local one-shot server.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use glam::Vec3;
use terrain::{Error, Fetcher, MeshEncoder, TerrainService, TerrainState};

/// Accept one connection, read the request head, then hand the stream to `respond`.
fn serve(respond: impl FnOnce(TcpStream) + Send + 'static) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
            line.clear();
        }
        respond(reader.into_inner());
    });
    format!("http://{addr}/terrain.bin")
}

fn write_response(mut stream: TcpStream, status: &str, body: &[u8]) {
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .unwrap();
    stream.write_all(body).unwrap();
}

/// Serve a single response on an ephemeral port and return its URL.
fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    serve(move |stream| write_response(stream, status, &body))
}

fn floor_at(y: f32) -> Vec<u8> {
    let mut encoder = MeshEncoder::new();
    encoder.push_world_triangle([Vec3::new(0.0, y, 0.0), Vec3::new(4.0, y, 0.0), Vec3::new(0.0, y, 4.0)]);
    encoder.encode().unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn load_url_activates_terrain() {
    init_tracing();
    let url = serve_once("200 OK", floor_at(2.0));

    let service = TerrainService::default();
    let terrain = service.load_url(&Fetcher::new(), &url).await.unwrap().unwrap();
    assert_eq!(terrain.mesh().len(), 1);
    assert_eq!(service.state(), TerrainState::Decoded);
    assert!((service.query_height(1.0, 1.0, -1.0) - 2.0).abs() < 1e-3);
}

#[tokio::test]
async fn load_url_reports_http_status() {
    init_tracing();
    let url = serve_once("404 Not Found", Vec::new());

    let service = TerrainService::default();
    let err = service.load_url(&Fetcher::new(), &url).await.unwrap_err();
    assert!(matches!(err, Error::Status(404)), "{err}");
    assert_eq!(service.state(), TerrainState::Unloaded);
}

#[tokio::test]
async fn load_url_rejects_garbage_body() {
    init_tracing();
    let url = serve_once("200 OK", b"not a terrain".to_vec());

    let service = TerrainService::default();
    let err = service.load_url(&Fetcher::new(), &url).await.unwrap_err();
    assert!(matches!(err, Error::Format(_)), "{err}");
    assert_eq!(service.state(), TerrainState::Unloaded);
}

#[tokio::test]
async fn dropping_load_url_abandons_the_load() {
    init_tracing();
    // Accept the request and never answer it.
    let url = serve(|stream| {
        thread::sleep(Duration::from_secs(10));
        drop(stream);
    });

    let service = TerrainService::default();
    let fetcher = Fetcher::new();
    let result =
        tokio::time::timeout(Duration::from_millis(200), service.load_url(&fetcher, &url)).await;
    assert!(result.is_err(), "fetch should still be pending");
    assert_eq!(service.state(), TerrainState::Unloaded);
    assert!(service.current().is_none());
}

#[tokio::test]
async fn fetched_buffer_arriving_after_newer_load_is_discarded() {
    init_tracing();
    let (release, gate) = mpsc::channel::<()>();
    let url = serve(move |stream| {
        gate.recv().unwrap();
        write_response(stream, "200 OK", &floor_at(2.0));
    });

    let service = TerrainService::default();
    let fetcher = Fetcher::new();
    let (fetched, newer) = tokio::join!(service.load_url(&fetcher, &url), async {
        while service.state() != TerrainState::Loading {
            tokio::task::yield_now().await;
        }
        let newer = service.load_bytes(floor_at(7.0)).unwrap().unwrap();
        release.send(()).unwrap();
        newer
    });

    assert!(fetched.unwrap().is_none());
    let current = service.current().unwrap();
    assert!(std::sync::Arc::ptr_eq(&current, &newer));
    assert_eq!(service.state(), TerrainState::Decoded);
    assert!((service.query_height(1.0, 1.0, -1.0) - 7.0).abs() < 1e-3);
}

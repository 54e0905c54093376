//! End-to-end composition over a real pixel surface.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use teaser_common::config::UploadConfig;
use teaser_common::error::{TeaserError, TeaserResult};
use teaser_compositor::{
    decode_image, GridCompositor, HostFetcher, HttpTransport, ImageSurface, LoadState,
    RasterSurface, SourceFetcher,
};

const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);
const GREEN: Rgba<u8> = Rgba([20, 220, 20, 255]);
const BLUE: Rgba<u8> = Rgba([20, 20, 220, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

fn png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbaImage::from_pixel(width, height, color)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[derive(Default)]
struct StaticFetcher {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl StaticFetcher {
    fn serve(self: &Arc<Self>, name: &str, bytes: Vec<u8>) {
        self.blobs.lock().unwrap().insert(name.to_string(), bytes);
    }
}

#[async_trait::async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, source: &str) -> TeaserResult<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .ok_or_else(|| TeaserError::load(format!("{source}: not found")))
    }

    fn name(&self) -> &str {
        "static"
    }
}

fn pixel_at(surface: &ImageSurface, x: u32, y: u32) -> Rgba<u8> {
    *surface.pixels().get_pixel(x, y)
}

#[tokio::test]
async fn test_sources_land_in_their_cells() {
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.serve("red", png(20, 20, RED));
    fetcher.serve("green", png(20, 20, GREEN));
    fetcher.serve("blue", png(20, 20, BLUE));

    let mut c = GridCompositor::new(ImageSurface::new(40, 40, BLACK), fetcher);
    c.set_source(0, "red").unwrap();
    c.set_source(1, "green").unwrap();
    c.set_source(3, "blue").unwrap();
    c.settle().await;

    let surface = c.surface();
    assert_eq!(pixel_at(surface, 5, 5), RED);
    assert_eq!(pixel_at(surface, 30, 5), GREEN);
    assert_eq!(pixel_at(surface, 5, 30), BLACK, "cell 2 has no source");
    assert_eq!(pixel_at(surface, 30, 30), BLUE);
}

#[tokio::test]
async fn test_source_is_stretched_to_cell() {
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.serve("tiny", png(2, 3, GREEN));

    let mut c = GridCompositor::new(ImageSurface::new(90, 30, BLACK), fetcher);
    c.set_dimensions("3x1").unwrap();
    c.set_source(1, "tiny").unwrap();
    c.settle().await;

    let surface = c.surface();
    for (x, y) in [(31, 1), (45, 15), (58, 28)] {
        assert_eq!(pixel_at(surface, x, y), GREEN, "({x},{y})");
    }
    assert_eq!(pixel_at(surface, 29, 15), BLACK);
    assert_eq!(pixel_at(surface, 60, 15), BLACK);
}

#[tokio::test]
async fn test_reshape_moves_loaded_cells() {
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.serve("a", png(10, 10, RED));
    fetcher.serve("d", png(10, 10, BLUE));

    let mut c = GridCompositor::new(ImageSurface::new(40, 40, BLACK), fetcher);
    c.set_source(0, "a").unwrap();
    c.set_source(3, "d").unwrap();
    c.settle().await;

    // 2x2 -> 4x1: cell 3 becomes the rightmost quarter of a single row.
    c.set_dimensions([4u32, 1]).unwrap();
    assert_eq!(c.regions().len(), 4);
    let surface = c.surface();
    assert_eq!(pixel_at(surface, 5, 20), RED);
    assert_eq!(pixel_at(surface, 35, 20), BLUE);
    assert_eq!(pixel_at(surface, 15, 20), BLACK);
}

#[tokio::test]
async fn test_failed_source_leaves_placeholder() {
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.serve("junk", b"not an image".to_vec());

    let mut c = GridCompositor::new(ImageSurface::new(20, 20, BLACK), fetcher);
    c.set_dimensions("1,1").unwrap();
    c.set_source(0, "junk").unwrap();
    c.settle().await;

    assert!(matches!(c.region(0).unwrap().state(), LoadState::Failed(_)));
    assert_eq!(pixel_at(c.surface(), 10, 10), BLACK);
}

#[tokio::test]
async fn test_export_png_roundtrips_surface() {
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.serve("red", png(8, 8, RED));

    let mut c = GridCompositor::new(ImageSurface::new(16, 8, BLACK), fetcher);
    c.set_dimensions("2,1").unwrap();
    c.set_output_format("png").unwrap();
    c.set_source(0, "red").unwrap();
    c.settle().await;

    let encoded = c.export().unwrap();
    assert_eq!(encoded.mime_type(), "image/png");
    let decoded = decode_image(&encoded.bytes).unwrap();
    assert_eq!(&decoded, c.surface().pixels());
}

#[tokio::test]
async fn test_host_fetcher_reads_local_files() {
    let dir = std::env::temp_dir().join(format!("teaser-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cell.png");
    std::fs::write(&path, png(4, 4, GREEN)).unwrap();

    let mut c = GridCompositor::new(
        ImageSurface::new(10, 10, BLACK),
        Arc::new(HostFetcher::new(HttpTransport::new().unwrap())),
    );
    c.set_dimensions("1,1").unwrap();
    c.set_source(0, path.to_string_lossy()).unwrap();
    c.settle().await;

    assert!(c.region(0).unwrap().is_loaded());
    assert_eq!(pixel_at(c.surface(), 5, 5), GREEN);
    std::fs::remove_dir_all(dir).ok();
}

/// Accept one PUT, reply with `status_line`, and hand back the body.
async fn upload_sink(status_line: &'static str) -> (String, tokio::task::JoinHandle<(String, Vec<u8>)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap();
            }
            let done = line == "\r\n";
            head.push_str(&line);
            if done {
                break;
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).await.unwrap();
        let response = format!("{status_line}\r\nContent-Length: 0\r\n\r\n");
        reader.get_mut().write_all(response.as_bytes()).await.unwrap();
        reader.get_mut().shutdown().await.ok();
        (head, body)
    });
    (format!("http://{addr}/teasers/7"), handle)
}

#[tokio::test]
async fn test_save_puts_encoded_surface() {
    let fetcher = Arc::new(StaticFetcher::default());
    fetcher.serve("blue", png(12, 12, BLUE));

    let mut c = GridCompositor::new(ImageSurface::new(24, 12, BLACK), fetcher);
    c.set_dimensions("2,1").unwrap();
    c.set_source(1, "blue").unwrap();

    let (url, server) = upload_sink("HTTP/1.1 204 No Content").await;
    let transport = HttpTransport::from_config(&UploadConfig {
        cookie: Some("session=abc".to_string()),
        ..Default::default()
    })
    .unwrap();
    // No explicit settle: save waits for the pending load itself.
    let status = c.save(&url, &transport).await.unwrap();
    assert_eq!(status, 204);

    let (head, body) = server.await.unwrap();
    assert!(head.starts_with("PUT /teasers/7 HTTP/1.1\r\n"));
    let head = head.to_ascii_lowercase();
    assert!(head.contains("content-type: image/jpeg\r\n"));
    assert!(head.contains("cookie: session=abc\r\n"));

    let uploaded = decode_image(&body).unwrap();
    assert_eq!(uploaded.dimensions(), (c.surface().width(), c.surface().height()));
    let right = uploaded.get_pixel(18, 6);
    assert!(right[2] > 150 && right[0] < 80, "blue cell survived encoding: {right:?}");
}

#[tokio::test]
async fn test_save_reports_server_error() {
    let fetcher = Arc::new(StaticFetcher::default());
    let mut c = GridCompositor::new(ImageSurface::new(8, 8, BLACK), fetcher);

    let (url, server) = upload_sink("HTTP/1.1 500 Server Error").await;
    let err = c.save(&url, &HttpTransport::new().unwrap()).await.unwrap_err();
    assert_eq!(err.to_string(), "500: Server Error");
    server.await.unwrap();
}

struct PanickingFetcher;

#[async_trait::async_trait]
impl SourceFetcher for PanickingFetcher {
    async fn fetch(&self, source: &str) -> TeaserResult<Vec<u8>> {
        panic!("cannot fetch {source}");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

#[tokio::test]
async fn test_save_completes_when_a_fetch_panics() {
    let mut c = GridCompositor::new(ImageSurface::new(8, 8, BLACK), Arc::new(PanickingFetcher));
    c.set_dimensions("1,1").unwrap();
    c.set_source(0, "boom.png").unwrap();

    let (url, server) = upload_sink("HTTP/1.1 204 No Content").await;
    let status = tokio::time::timeout(
        Duration::from_secs(10),
        c.save(&url, &HttpTransport::new().unwrap()),
    )
    .await
    .expect("save resolves")
    .unwrap();
    assert_eq!(status, 204);
    assert!(matches!(c.region(0).unwrap().state(), LoadState::Failed(_)));
    server.await.unwrap();
}

/// Serve `response` to every connection until the test ends.
async fn hostile_source(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                }
                reader.get_mut().write_all(response).await.ok();
                reader.get_mut().shutdown().await.ok();
            });
        }
    });
    format!("http://{addr}/cell.png")
}

#[tokio::test]
async fn test_hostile_sources_settle_as_failed() {
    let responses: [&'static [u8]; 3] = [
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nabcd\r\nffffffffffffffff\r\n",
        b"HTTP/1.1 200 OK\r\nContent-Length: 99999999999999\r\n\r\nabc",
        b"HTTP/1.1 200 OK\r\nContent-Length: abc\r\n\r\nabc",
    ];

    let mut c = GridCompositor::new(
        ImageSurface::new(30, 10, BLACK),
        Arc::new(HostFetcher::new(HttpTransport::new().unwrap())),
    );
    c.set_dimensions("3,1").unwrap();
    for (index, response) in responses.into_iter().enumerate() {
        let url = hostile_source(response).await;
        c.set_source(index, url).unwrap();
    }

    tokio::time::timeout(Duration::from_secs(10), c.settle())
        .await
        .expect("every load reports back");
    assert_eq!(c.pending_loads(), 0);
    for region in c.regions() {
        assert!(matches!(region.state(), LoadState::Failed(_)), "{region:?}");
    }
}

#[tokio::test]
async fn test_stalled_source_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(stream);
    });

    let http = HttpTransport::from_config(&UploadConfig {
        timeout_secs: 1,
        ..Default::default()
    })
    .unwrap();
    let mut c = GridCompositor::new(ImageSurface::new(10, 10, BLACK), Arc::new(HostFetcher::new(http)));
    c.set_dimensions("1,1").unwrap();
    c.set_source(0, format!("http://{addr}/slow.png")).unwrap();

    tokio::time::timeout(Duration::from_secs(10), c.settle())
        .await
        .expect("timeout surfaces as a failed load");
    match c.region(0).unwrap().state() {
        LoadState::Failed(reason) => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("unexpected state {other:?}"),
    }
}

use std::path::{Path, PathBuf};

use serde_json::{Value, json};

/// Write a GeoJSON FeatureCollection of points with the given properties
pub fn write_geojson(dir: &Path, name: &str, features: &[Value]) -> PathBuf {
    let features: Vec<Value> = features
        .iter()
        .enumerate()
        .map(|(i, props)| {
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [10.0 + i as f64, 45.0]},
                "properties": props,
            })
        })
        .collect();
    let doc = json!({"type": "FeatureCollection", "features": features});
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    path
}

/// Low-lying, wet parcels flood; high, dry ones do not
pub fn flood_training_features() -> Vec<Value> {
    let mut features = Vec::new();
    for i in 0..12 {
        let step = i as f64 * 0.02;
        features.push(json!({"elevation": 0.05 + step, "rainfall": 0.9 - step, "flooded": 1}));
        features.push(json!({"elevation": 0.75 + step, "rainfall": 0.1 + step, "flooded": 0}));
    }
    features
}

pub fn write_rgb_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

pub fn write_gray_tiff(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = image::GrayImage::from_fn(width, height, |x, _| image::Luma([(x * 10 % 256) as u8]));
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Minimal HTTP/1.1 server on 127.0.0.1: `GET /scene.png` returns `png`,
/// every other path is a 404. Returns the base URL.
pub async fn serve_png(png: Vec<u8>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let png = png.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, content_type, body) = if path == "/scene.png" {
                    ("200 OK", "image/png", png)
                } else {
                    ("404 Not Found", "text/plain", b"not found".to_vec())
                };
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    content_type,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

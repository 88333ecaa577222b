mod common;

use std::time::Duration;

use common::fixtures::{png_bytes, serve_png, write_geojson, write_gray_tiff, write_rgb_png};
use geoinfer::io::{open_image, open_vector_layer};
use geoinfer::{AttributeValue, Error, RasterSource, RecordPayload, VectorSource};
use serde_json::json;

#[test]
fn nonexistent_path_is_source_unavailable_without_records() {
    let result = VectorSource::open("/no/such/dataset.geojson", 1);
    assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
    let result = RasterSource::open("/no/such/raster.tif", None);
    assert!(matches!(result, Err(Error::SourceUnavailable { .. })));
}

#[test]
fn band_five_on_single_band_raster_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_gray_tiff(dir.path(), "one_band.tif", 8, 4);
    let err = RasterSource::open(&path, Some(5)).unwrap_err();
    assert!(matches!(
        err,
        Error::IndexOutOfRange {
            kind: "band",
            index: 5,
            available: 1
        }
    ));
}

#[test]
fn single_band_is_replicated_to_grey_rgb() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_gray_tiff(dir.path(), "grey.tif", 8, 4);
    let mut records = RasterSource::open(&path, Some(1)).unwrap();
    assert_eq!(records.metadata().width, 8);
    assert_eq!(records.metadata().height, 4);
    assert_eq!(records.metadata().band_count, 1);
    match records.next().map(|r| r.payload) {
        Some(RecordPayload::Image(img)) => {
            assert_eq!(img.shape(), [4, 8, 3]);
            // pixel (x=3, y=0) has value 30 in every channel
            assert_eq!(&img.data[9..12], &[30, 30, 30]);
        }
        other => panic!("expected image record, got {:?}", other),
    }
    assert!(records.next().is_none());
}

#[test]
fn layer_index_is_one_based_and_checked() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_geojson(dir.path(), "one.geojson", &[json!({"a": 1})]);
    assert!(matches!(
        VectorSource::open(&path, 0),
        Err(Error::IndexOutOfRange { kind: "layer", .. })
    ));
    assert!(matches!(
        VectorSource::open(&path, 2),
        Err(Error::IndexOutOfRange {
            kind: "layer",
            index: 2,
            available: 1
        })
    ));
}

#[test]
fn vector_features_become_attribute_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_geojson(
        dir.path(),
        "parcels.geojson",
        &[
            json!({"elevation": 12.5, "soil": "clay", "count": 3}),
            json!({"elevation": 7.0, "soil": "sand", "count": 1}),
        ],
    );
    let records = VectorSource::open(&path, 1).unwrap();
    assert_eq!(records.metadata().feature_count, 2);
    assert_eq!(records.metadata().layer_count, 1);

    let all: Vec<_> = records.collect();
    assert_eq!(all.len(), 2);
    match &all[0].payload {
        RecordPayload::Attributes(attrs) => {
            assert_eq!(attrs.get("elevation"), Some(&AttributeValue::Real(12.5)));
            assert_eq!(attrs.get("soil"), Some(&AttributeValue::Text("clay".into())));
            assert!(matches!(attrs.get("count"), Some(AttributeValue::Integer(3))));
            assert_eq!(attrs.get("centroid_x"), Some(&AttributeValue::Real(10.0)));
            assert_eq!(attrs.get("centroid_y"), Some(&AttributeValue::Real(45.0)));
        }
        other => panic!("expected attributes, got {:?}", other),
    }
}

#[tokio::test]
async fn async_readers_honour_deadlines_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let png = write_rgb_png(dir.path(), "rgb.png", 6, 5);
    let (meta, image) = open_image(png.to_str().unwrap(), None, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!((meta.width, meta.height), (6, 5));
    assert_eq!(image.shape(), [5, 6, 3]);
    // pixel (x=2, y=1) is [2, 1, 128]
    let offset = (6 + 2) * 3;
    assert_eq!(&image.data[offset..offset + 3], &[2, 1, 128]);

    let err = open_vector_layer(&dir.path().join("missing.gpkg"), 1, Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
}

#[tokio::test]
async fn url_image_is_fetched_and_decoded() {
    let base = serve_png(png_bytes(7, 4)).await;
    let url = format!("{}/scene.png", base);
    let (meta, image) = open_image(&url, Some(1), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(meta.location, url);
    assert_eq!((meta.width, meta.height, meta.band_count), (7, 4, 3));
    assert_eq!(image.shape(), [4, 7, 3]);
    // pixel (x=5, y=2) is [5, 2, 128]
    let offset = (2 * 7 + 5) * 3;
    assert_eq!(&image.data[offset..offset + 3], &[5, 2, 128]);
}

#[tokio::test]
async fn url_error_status_is_source_unavailable() {
    let base = serve_png(png_bytes(2, 2)).await;
    let err = open_image(&format!("{}/missing.png", base), None, Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
}

#[tokio::test]
async fn refused_connection_is_source_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = open_image(&format!("http://{}/scene.png", addr), None, Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
}

#[tokio::test]
async fn url_image_has_only_band_one() {
    let base = serve_png(png_bytes(2, 2)).await;
    let err = open_image(&format!("{}/scene.png", base), Some(2), Duration::from_secs(30))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::IndexOutOfRange {
            kind: "band",
            index: 2,
            available: 1
        }
    ));
}

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "watermarker_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn fs_sink_writes_and_overwrites() {
    let tmp = temp_dir("fs_sink");
    std::fs::create_dir_all(&tmp).unwrap();
    let path = tmp.join("out.jpg");

    let first = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0])));
    FsImageSink.save(&first, &path, ImageFormat::Jpeg).unwrap();
    let second =
        DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(6, 2, image::Rgba([9, 9, 9, 90])));
    FsImageSink.save(&second, &path, ImageFormat::Jpeg).unwrap();

    let back = image::open(&path).unwrap();
    assert_eq!((back.width(), back.height()), (6, 2));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn fs_sink_reports_missing_directory() {
    let tmp = temp_dir("fs_sink_missing");
    let img = DynamicImage::ImageRgb8(image::RgbImage::new(1, 1));
    let err = FsImageSink
        .save(&img, &tmp.join("nope").join("a.png"), ImageFormat::Png)
        .unwrap_err();
    assert!(err.to_string().contains("write marked image"));
}

#[test]
fn in_memory_sink_records_saves() {
    let sink = InMemorySink::new();
    assert!(sink.is_empty());
    let img = DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
    sink.save(&img, Path::new("a.png"), ImageFormat::Png).unwrap();
    sink.save(&img, Path::new("b.png"), ImageFormat::Png).unwrap();
    assert_eq!(sink.len(), 2);
    assert_eq!(sink.paths(), vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
    assert!(sink.get(Path::new("b.png")).is_some());
    assert!(sink.get(Path::new("c.png")).is_none());
}

use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use markflow::{
    Alignment, DataPaths, MarkflowConfig,
    batch::{BatchEvent, BatchJob, run_batch},
    library::WatermarkLibrary,
    tray::ImageTray,
    watermark::{LogoVariant, WatermarkError, WatermarkSpec},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct Fixture {
    _temp_dir: TempDir,
    paths: DataPaths,
    photos: PathBuf,
    output: PathBuf,
    library: WatermarkLibrary,
}

/// Data directory with a white and a black logo imported, plus an empty photo folder.
fn setup() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let paths = DataPaths::new(temp_dir.path().join("data"), None);
    let photos = temp_dir.path().join("photos");
    let output = temp_dir.path().join("output");
    let assets = temp_dir.path().join("assets");
    std::fs::create_dir_all(&photos).unwrap();
    std::fs::create_dir_all(&assets).unwrap();

    RgbaImage::from_pixel(100, 50, Rgba([255, 255, 255, 255]))
        .save(assets.join("white.png"))
        .unwrap();
    RgbaImage::from_pixel(100, 50, Rgba([0, 0, 0, 255]))
        .save(assets.join("black.png"))
        .unwrap();

    let library = WatermarkLibrary::open(&paths.watermark_directory).unwrap();
    let report = library.import([assets.join("white.png"), assets.join("black.png")]);
    assert_eq!(report.imported.len(), 2);

    Fixture {
        _temp_dir: temp_dir,
        paths,
        photos,
        output,
        library,
    }
}

fn write_photo(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(400, 200, Rgb(color)).save(&path).unwrap();
    path
}

fn job(fixture: &Fixture, config: &MarkflowConfig, items: Vec<PathBuf>) -> BatchJob {
    let spec = WatermarkSpec::from_config(config, &fixture.paths.watermark_directory).unwrap();
    BatchJob {
        items,
        spec: Arc::new(spec),
        output_directory: fixture.output.clone(),
        jpeg_quality: config.jpeg_quality,
    }
}

#[tokio::test]
async fn test_batch_watermarks_every_photo() {
    let fixture = setup();
    let mut config = MarkflowConfig::default();
    fixture
        .library
        .select("white.png", &mut config, &fixture.paths.config_file)
        .unwrap();
    config.alignment = Alignment::Right;
    config.bottom_margin = 10.0;

    let first = write_photo(&fixture.photos, "first.png", [0, 0, 0]);
    let second = write_photo(&fixture.photos, "second.jpg", [0, 0, 0]);

    let report = run_batch(job(&fixture, &config, vec![first, second]), None)
        .await
        .unwrap();

    assert_eq!(report.succeeded.len(), 2);
    assert!(report.failed.is_empty());
    assert!(report.finished_at >= report.started_at);

    // 20% of 400 = 80x40 logo, 20px margin, right aligned: (300, 140)
    let output = image::open(fixture.output.join("first.png")).unwrap();
    assert_eq!(output.dimensions(), (400, 200));
    let rgb = output.to_rgb8();
    assert_eq!(rgb.get_pixel(340, 160), &Rgb([255, 255, 255]));
    assert_eq!(rgb.get_pixel(10, 10), &Rgb([0, 0, 0]));
    assert!(fixture.output.join("second.jpg").exists());
}

#[tokio::test]
async fn test_batch_continues_after_failures() {
    let fixture = setup();
    let config = MarkflowConfig {
        use_logo: Some("white.png".to_string()),
        ..Default::default()
    };

    let good = write_photo(&fixture.photos, "good.png", [10, 10, 10]);
    let broken = fixture.photos.join("broken.jpg");
    std::fs::write(&broken, b"not an image").unwrap();
    let missing = fixture.photos.join("missing.png");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = run_batch(
        job(&fixture, &config, vec![broken.clone(), missing, good.clone()]),
        Some(tx),
    )
    .await
    .unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].0, broken);
    assert_eq!(report.succeeded, vec![(good, fixture.output.join("good.png"))]);

    let mut started = 0;
    let mut finished = 0;
    let mut failed = 0;
    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::Started { total, .. } => {
                assert_eq!(total, 3);
                started += 1;
            }
            BatchEvent::Finished { .. } => finished += 1,
            BatchEvent::Failed { .. } => failed += 1,
        }
    }
    assert_eq!((started, finished, failed), (3, 1, 2));
}

#[tokio::test]
async fn test_auto_invert_uses_alternate_on_bright_photos() {
    let fixture = setup();
    let config = MarkflowConfig {
        use_logo: Some("white.png".to_string()),
        alternate_logo: Some("black.png".to_string()),
        auto_invert: true,
        ..Default::default()
    };

    let bright = write_photo(&fixture.photos, "bright.png", [250, 250, 250]);
    let dark = write_photo(&fixture.photos, "dark.png", [5, 5, 5]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    run_batch(job(&fixture, &config, vec![bright, dark]), Some(tx))
        .await
        .unwrap();

    let mut variants = Vec::new();
    while let Some(event) = rx.recv().await {
        if let BatchEvent::Finished { variant, .. } = event {
            variants.push(variant);
        }
    }
    assert_eq!(variants, vec![LogoVariant::Alternate, LogoVariant::Primary]);

    // Center aligned, 80x40 logo, 10px margin: logo spans y 150..190
    let bright_out = image::open(fixture.output.join("bright.png")).unwrap().to_rgb8();
    assert_eq!(bright_out.get_pixel(200, 170), &Rgb([0, 0, 0]));
    let dark_out = image::open(fixture.output.join("dark.png")).unwrap().to_rgb8();
    assert_eq!(dark_out.get_pixel(200, 170), &Rgb([255, 255, 255]));
}

#[tokio::test]
async fn test_output_next_to_source_gets_suffix() {
    let fixture = setup();
    let config = MarkflowConfig {
        use_logo: Some("white.png".to_string()),
        ..Default::default()
    };
    let source = write_photo(&fixture.photos, "inplace.png", [0, 0, 0]);

    let mut job = job(&fixture, &config, vec![source.clone()]);
    job.output_directory = fixture.photos.clone();
    let report = run_batch(job, None).await.unwrap();

    assert_eq!(
        report.succeeded[0].1,
        fixture.photos.join("inplace_watermarked.png")
    );
    // The original is untouched
    let original = image::open(&source).unwrap().to_rgb8();
    assert_eq!(original.get_pixel(200, 170), &Rgb([0, 0, 0]));
}

#[tokio::test]
async fn test_same_file_name_in_different_folders_keeps_both() {
    let fixture = setup();
    let config = MarkflowConfig {
        use_logo: Some("white.png".to_string()),
        ..Default::default()
    };
    std::fs::create_dir_all(fixture.photos.join("2023")).unwrap();
    std::fs::create_dir_all(fixture.photos.join("2024")).unwrap();
    write_photo(&fixture.photos.join("2023"), "IMG_0001.png", [10, 0, 0]);
    write_photo(&fixture.photos.join("2024"), "IMG_0001.png", [0, 10, 0]);

    let mut tray = ImageTray::new();
    tray.add(&fixture.photos);
    assert_eq!(tray.len(), 2);

    let report = run_batch(job(&fixture, &config, tray.paths().to_vec()), None)
        .await
        .unwrap();

    let outputs: Vec<_> = report.succeeded.iter().map(|(_, out)| out.clone()).collect();
    assert_eq!(
        outputs,
        vec![
            fixture.output.join("IMG_0001.png"),
            fixture.output.join("IMG_0001_1.png"),
        ]
    );

    // Each output carries its own photo's pixels
    let first = image::open(&outputs[0]).unwrap().to_rgb8();
    let second = image::open(&outputs[1]).unwrap().to_rgb8();
    assert_eq!(first.get_pixel(5, 5), &Rgb([10, 0, 0]));
    assert_eq!(second.get_pixel(5, 5), &Rgb([0, 10, 0]));
}

#[tokio::test]
async fn test_rerun_does_not_pick_up_earlier_outputs() {
    let fixture = setup();
    let config = MarkflowConfig {
        use_logo: Some("white.png".to_string()),
        ..Default::default()
    };
    write_photo(&fixture.photos, "photo.png", [0, 0, 0]);
    // Output directory nested inside the folder being watermarked
    let output = fixture.photos.join("output");

    for _ in 0..2 {
        let mut tray = ImageTray::new();
        tray.exclude(&output);
        tray.add(&fixture.photos);
        assert_eq!(tray.paths(), &[fixture.photos.join("photo.png")]);

        let mut job = job(&fixture, &config, tray.paths().to_vec());
        job.output_directory = output.clone();
        let report = run_batch(job, None).await.unwrap();
        assert_eq!(report.succeeded.len(), 1);
    }

    let mut written: Vec<_> = std::fs::read_dir(&output)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    written.sort();
    assert_eq!(written, vec!["photo.png"]);
}

#[test]
fn test_spec_requires_a_selected_logo() {
    let fixture = setup();

    let result = WatermarkSpec::from_config(
        &MarkflowConfig::default(),
        &fixture.paths.watermark_directory,
    );
    assert!(matches!(result, Err(WatermarkError::NoLogoSelected)));

    let config = MarkflowConfig {
        use_logo: Some("gone.png".to_string()),
        ..Default::default()
    };
    let result = WatermarkSpec::from_config(&config, &fixture.paths.watermark_directory);
    assert!(matches!(result, Err(WatermarkError::LogoNotFound(_))));
}

#[test]
fn test_missing_alternate_falls_back_to_inversion() {
    let fixture = setup();
    let config = MarkflowConfig {
        use_logo: Some("white.png".to_string()),
        alternate_logo: Some("gone.png".to_string()),
        ..Default::default()
    };
    let spec = WatermarkSpec::from_config(&config, &fixture.paths.watermark_directory).unwrap();
    assert!(spec.alternate.is_none());
}

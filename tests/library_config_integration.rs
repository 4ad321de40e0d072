use markflow::{
    Alignment, DataPaths, MarkflowConfig,
    library::{LibraryError, WatermarkLibrary},
    startup_checks::perform_startup_checks,
    tray::ImageTray,
};
use tempfile::TempDir;

fn write_logo(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(8, 4, image::Rgba([255, 255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn test_library_choices_survive_a_restart() {
    let temp_dir = TempDir::new().unwrap();
    let paths = DataPaths::new(temp_dir.path(), None);
    let library = WatermarkLibrary::open(&paths.watermark_directory).unwrap();
    let logo = write_logo(temp_dir.path(), "logo.png");
    let dark = write_logo(temp_dir.path(), "dark.png");
    library.import([&logo, &dark]);

    let mut config = MarkflowConfig::load(&paths.config_file).unwrap();
    library.select("logo.png", &mut config, &paths.config_file).unwrap();
    config.set("alternate_logo", "dark.png").unwrap();
    config.set("alignment", "right").unwrap();
    config.save(&paths.config_file).unwrap();

    library
        .rename("dark.png", "night", &mut config, &paths.config_file)
        .unwrap();

    let reloaded = MarkflowConfig::load(&paths.config_file).unwrap();
    assert_eq!(reloaded.use_logo.as_deref(), Some("logo.png"));
    assert_eq!(reloaded.alternate_logo.as_deref(), Some("night.png"));
    assert_eq!(reloaded.alignment, Alignment::Right);

    assert!(matches!(
        library.delete("night.png", &reloaded),
        Err(LibraryError::SelectedWatermark(_))
    ));
    assert!(perform_startup_checks(&paths, &MarkflowConfig {
        output_directory: temp_dir.path().join("out"),
        ..reloaded
    })
    .is_ok());
}

#[test]
fn test_hand_edited_config_is_preserved() {
    let temp_dir = TempDir::new().unwrap();
    let paths = DataPaths::new(temp_dir.path(), None);
    std::fs::write(
        &paths.config_file,
        r#"{"Use_logo": "brand.png", "window_geometry": [10, 20], "logo_size": 35}"#,
    )
    .unwrap();

    let mut config = MarkflowConfig::load(&paths.config_file).unwrap();
    assert_eq!(config.use_logo.as_deref(), Some("brand.png"));
    assert_eq!(config.logo_size, 35.0);

    config.set("bottom_margin", "8").unwrap();
    config.save(&paths.config_file).unwrap();

    let raw = std::fs::read_to_string(&paths.config_file).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["window_geometry"], serde_json::json!([10, 20]));
    assert_eq!(value["Use_logo"], "brand.png");
    assert_eq!(value["bottom_margin"], 8.0);
}

#[tokio::test]
async fn test_tray_intake_reports_unreadable_photos() {
    let temp_dir = TempDir::new().unwrap();
    let photos = temp_dir.path().join("photos");
    std::fs::create_dir_all(photos.join("nested")).unwrap();
    write_logo(&photos, "a.png");
    write_logo(&photos.join("nested"), "b.png");
    std::fs::write(photos.join("broken.jpg"), b"garbage").unwrap();
    std::fs::write(photos.join("notes.txt"), b"not a photo").unwrap();

    let mut tray = ImageTray::new();
    tray.add_all([&photos]);
    // Adding the same folder twice changes nothing
    tray.add_all([&photos]);
    assert_eq!(tray.len(), 3);

    let items = tray.intake().await.unwrap();
    let ok: Vec<_> = items.iter().filter(|i| i.is_ok()).collect();
    assert_eq!(ok.len(), 2);
    assert!(ok.iter().all(|i| i.dimensions == Some((8, 4))));

    let broken = items.iter().find(|i| !i.is_ok()).unwrap();
    assert_eq!(broken.display_name, "broken.jpg");
    assert!(
        broken
            .error
            .as_deref()
            .unwrap()
            .starts_with("Failed to load image")
    );
}

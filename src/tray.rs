use crate::watermark::exif::camera_description;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of probing one added photo.
#[derive(Debug, Clone, PartialEq)]
pub struct TrayItem {
    pub path: PathBuf,
    pub display_name: String,
    pub dimensions: Option<(u32, u32)>,
    pub camera: Option<String>,
    pub error: Option<String>,
}

impl TrayItem {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read just enough of a file to know whether it can be watermarked.
pub fn probe(path: &Path) -> TrayItem {
    let mut item = TrayItem {
        path: path.to_path_buf(),
        display_name: display_name(path),
        dimensions: None,
        camera: None,
        error: None,
    };

    if !path.is_file() {
        item.error = Some(format!("File not found: {}", path.display()));
        return item;
    }

    match image::image_dimensions(path) {
        Ok(dimensions) => {
            item.dimensions = Some(dimensions);
            item.camera = camera_description(path);
        }
        Err(e) => item.error = Some(format!("Failed to load image: {}", e)),
    }

    item
}

/// Ordered, de-duplicated list of photos waiting to be watermarked.
#[derive(Debug, Clone, Default)]
pub struct ImageTray {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
    /// Directories never entered when expanding a folder
    excluded: Vec<PathBuf>,
}

impl ImageTray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip everything below `directory` when expanding folders, so earlier
    /// outputs are not picked up again. Paths added by name are unaffected.
    pub fn exclude(&mut self, directory: impl AsRef<Path>) {
        let directory = directory.as_ref();
        let directory = directory
            .canonicalize()
            .unwrap_or_else(|_| directory.to_path_buf());
        debug!("Excluding {:?} from folder intake", directory);
        self.excluded.push(directory);
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.excluded.iter().any(|dir| path.starts_with(dir))
    }

    /// Add a file, or every photo below a directory.
    ///
    /// Returns how many new entries were added; paths already in the tray
    /// are skipped. Files are added even if they do not exist yet so intake
    /// can report them.
    pub fn add(&mut self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0
                        || !(entry.file_type().is_dir() && self.is_excluded(entry.path()))
                })
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping unreadable entry under {:?}: {}", path, e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| crate::is_image(&entry.file_name().to_string_lossy()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            debug!("Found {} photos under {:?}", found.len(), path);
            found.into_iter().filter(|p| self.insert(p.clone())).count()
        } else {
            usize::from(self.insert(path.to_path_buf()))
        }
    }

    pub fn add_all<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths.into_iter().map(|p| self.add(p)).sum()
    }

    fn insert(&mut self, path: PathBuf) -> bool {
        if self.seen.contains(&path) {
            return false;
        }
        self.seen.insert(path.clone());
        self.paths.push(path);
        true
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        if !self.seen.remove(path) {
            return false;
        }
        self.paths.retain(|p| p != path);
        true
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    /// Probe every entry in order on a blocking worker thread.
    pub async fn intake(&self) -> std::io::Result<Vec<TrayItem>> {
        probe_all(self.paths.clone(), probe).await
    }
}

async fn probe_all(
    paths: Vec<PathBuf>,
    probe: fn(&Path) -> TrayItem,
) -> std::io::Result<Vec<TrayItem>> {
    tokio::task::spawn_blocking(move || paths.iter().map(|p| probe(p)).collect::<Vec<_>>())
        .await
        .map_err(|e| {
            warn!("Intake worker failed: {}", e);
            std::io::Error::other(e)
        })
}

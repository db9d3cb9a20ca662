use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions picked up by discovery, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp", "gif"];

/// A discovered submission and the photographer folder it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub photographer: Option<String>,
    pub subfolder: Option<String>,
    pub relative_path: PathBuf,
}

impl ImageRecord {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Recursively collect every supported image under `root`, in traversal
/// order.
///
/// A file whose immediate parent directory is named differently from `root`
/// takes that parent's name as photographer and subfolder; files directly in
/// `root` get neither. Only the immediate parent counts, however deep the
/// file sits.
pub fn find_all_images(root: &Path) -> Vec<ImageRecord> {
    let root_name = root.file_name();
    let mut images = Vec::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !is_supported_image(path) {
            continue;
        }

        let parent_name = path.parent().and_then(Path::file_name);
        let photographer = classify(parent_name, root_name);
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        debug!(
            "Found image {:?} (photographer: {:?})",
            relative_path, photographer
        );

        images.push(ImageRecord {
            path: path.to_path_buf(),
            subfolder: photographer.clone(),
            photographer,
            relative_path,
        });
    }

    images
}

fn classify(parent_name: Option<&OsStr>, root_name: Option<&OsStr>) -> Option<String> {
    match parent_name {
        Some(parent) if Some(parent) != root_name => Some(parent.to_string_lossy().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"stub").unwrap();
    }

    fn submissions() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("submissions");
        std::fs::create_dir_all(&root).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_every_supported_extension_found_once() {
        let (_temp_dir, root) = submissions();
        for ext in SUPPORTED_EXTENSIONS {
            touch(&root.join(format!("photo.{}", ext)));
            touch(&root.join(format!("UPPER.{}", ext.to_uppercase())));
        }
        touch(&root.join("notes.txt"));
        touch(&root.join("raw.cr2"));
        touch(&root.join("noextension"));

        let images = find_all_images(&root);
        assert_eq!(images.len(), SUPPORTED_EXTENSIONS.len() * 2);

        let mut names: Vec<String> = images.iter().map(ImageRecord::file_name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), images.len());
        assert!(!names.iter().any(|n| n.ends_with(".txt") || n.ends_with(".cr2")));
    }

    #[test]
    fn test_root_level_file_has_no_photographer() {
        let (_temp_dir, root) = submissions();
        touch(&root.join("A.jpg"));

        let images = find_all_images(&root);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].photographer, None);
        assert_eq!(images[0].subfolder, None);
        assert_eq!(images[0].relative_path, PathBuf::from("A.jpg"));
    }

    #[test]
    fn test_subfolder_names_photographer() {
        let (_temp_dir, root) = submissions();
        touch(&root.join("Jane").join("A.jpg"));

        let images = find_all_images(&root);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].photographer.as_deref(), Some("Jane"));
        assert_eq!(images[0].subfolder.as_deref(), Some("Jane"));
        assert_eq!(images[0].relative_path, Path::new("Jane").join("A.jpg"));
    }

    #[test]
    fn test_deep_nesting_uses_immediate_parent() {
        let (_temp_dir, root) = submissions();
        touch(&root.join("Jane").join("Sub").join("A.jpg"));

        let images = find_all_images(&root);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].photographer.as_deref(), Some("Sub"));
    }

    #[test]
    fn test_directories_with_image_extension_are_skipped() {
        let (_temp_dir, root) = submissions();
        std::fs::create_dir_all(root.join("folder.jpg")).unwrap();
        touch(&root.join("folder.jpg").join("inside.png"));

        let images = find_all_images(&root);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].photographer.as_deref(), Some("folder.jpg"));
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_all_images(&temp_dir.path().join("absent")).is_empty());
    }
}

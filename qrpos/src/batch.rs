//! Image discovery for batch uploads

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use qrpos_types::Error;

/// Extensions picked up from a folder, compared case-insensitively
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Image files directly inside `dir`, sorted by path
///
/// Subdirectories are not descended into.
pub fn image_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();

    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(dir.to_path_buf()),
        _ => Error::Unreadable(format!("{}: {}", dir.display(), e)),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::Unreadable(format!("{}: {}", dir.display(), e)))?
            .path();

        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

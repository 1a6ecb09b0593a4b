//! Image assets and the pre-transfer validator

use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;

use bytes::Bytes;
use image::ImageReader;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Size and dimension policy enforced before any upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub max_bytes: u64,
}

impl ImageLimits {
    /// Display panel limits: 320x480, 80 KiB
    pub const DISPLAY: Self = Self {
        max_width: 320,
        max_height: 480,
        max_bytes: 80 * 1024,
    };

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(Error::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if width > self.max_width {
            return Err(Error::TooWide {
                width,
                max: self.max_width,
            });
        }
        if height > self.max_height {
            return Err(Error::TooTall {
                height,
                max: self.max_height,
            });
        }
        Ok(())
    }
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self::DISPLAY
    }
}

/// Validated image ready for transfer
///
/// Only the header is decoded to learn the dimensions; the payload is sent
/// to the device byte for byte.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    data: Bytes,
    width: u32,
    height: u32,
}

impl ImageAsset {
    /// Validate an image file against the display limits
    ///
    /// Checks run in order: existence, byte size, width, height.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with_limits(path, &ImageLimits::DISPLAY)
    }

    /// Validate an image file against custom limits
    pub fn from_path_with_limits(path: impl AsRef<Path>, limits: &ImageLimits) -> Result<Self> {
        let path = path.as_ref();

        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Unreadable(format!("{}: {}", path.display(), e)),
        })?;

        if !metadata.is_file() {
            return Err(Error::Unreadable(format!("{} is not a file", path.display())));
        }

        if let Err(e) = limits.check_size(metadata.len()) {
            warn!("Rejected {}: {}", path.display(), e);
            return Err(e);
        }

        // The file may have grown since the metadata call
        let data = fs::File::open(path)
            .and_then(|file| read_capped(file, limits))
            .map_err(|e| Error::Unreadable(format!("{}: {}", path.display(), e)))?;

        if let Err(e) = limits.check_size(data.len() as u64) {
            warn!("Rejected {}: {}", path.display(), e);
            return Err(e);
        }

        let (width, height) = dimensions(&data)
            .map_err(|e| Error::Unreadable(format!("{}: {}", path.display(), e)))?;

        if let Err(e) = limits.check_dimensions(width, height) {
            warn!("Rejected {}: {}", path.display(), e);
            return Err(e);
        }

        let asset = Self {
            data: Bytes::from(data),
            width,
            height,
        };

        debug!("Image validation passed: {} ({})", path.display(), asset);

        Ok(asset)
    }

    /// Validate an in-memory image (e.g. a freshly rendered QR code)
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        Self::from_bytes_with_limits(data, &ImageLimits::DISPLAY)
    }

    /// Validate an in-memory image against custom limits
    pub fn from_bytes_with_limits(data: impl Into<Bytes>, limits: &ImageLimits) -> Result<Self> {
        let data = data.into();

        limits.check_size(data.len() as u64)?;

        let (width, height) = dimensions(&data).map_err(Error::Unreadable)?;

        limits.check_dimensions(width, height)?;

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Raw file bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Read at most one byte past the size limit
fn read_capped(reader: impl Read, limits: &ImageLimits) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader
        .take(limits.max_bytes.saturating_add(1))
        .read_to_end(&mut data)?;
    Ok(data)
}

/// Decode only the header
fn dimensions(data: &[u8]) -> std::result::Result<(u32, u32), String> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}

impl fmt::Display for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}, {:.1}KB",
            self.width,
            self.height,
            self.data.len() as f64 / 1024.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_valid_image() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "ok.png", 320, 480);

        let asset = ImageAsset::from_path(&path).unwrap();
        assert_eq!(asset.width(), 320);
        assert_eq!(asset.height(), 480);
        assert_eq!(asset.len() as u64, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = ImageAsset::from_path(dir.path().join("nope.png"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_too_wide() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "wide.png", 321, 10);
        let result = ImageAsset::from_path(&path);
        assert!(matches!(result, Err(Error::TooWide { width: 321, max: 320 })));
    }

    #[test]
    fn test_too_tall() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "tall.png", 10, 481);
        let result = ImageAsset::from_path(&path);
        assert!(matches!(result, Err(Error::TooTall { height: 481, max: 480 })));
    }

    #[test]
    fn test_too_large_checked_before_decoding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.jpeg");
        fs::write(&path, vec![0u8; 80 * 1024 + 1]).unwrap();

        let result = ImageAsset::from_path(&path);
        assert!(matches!(result, Err(Error::TooLarge { size, .. }) if size == 80 * 1024 + 1));
    }

    #[test]
    fn test_read_capped_stops_past_limit() {
        let limits = ImageLimits {
            max_bytes: 16,
            ..ImageLimits::DISPLAY
        };

        let data = read_capped(Cursor::new(vec![7u8; 4096]), &limits).unwrap();
        assert_eq!(data.len(), 17);
        assert!(matches!(limits.check_size(data.len() as u64), Err(Error::TooLarge { .. })));

        let data = read_capped(Cursor::new(vec![7u8; 16]), &limits).unwrap();
        assert_eq!(data.len(), 16);
        assert!(limits.check_size(data.len() as u64).is_ok());
    }

    #[test]
    fn test_from_path_sends_bytes_it_measured() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "ok.png", 40, 30);
        let on_disk = fs::read(&path).unwrap();

        let asset = ImageAsset::from_path(&path).unwrap();
        assert_eq!(asset.data().as_ref(), on_disk.as_slice());
        assert_eq!((asset.width(), asset.height()), (40, 30));
    }

    #[test]
    fn test_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.jpeg");
        fs::write(&path, b"definitely not an image").unwrap();

        let result = ImageAsset::from_path(&path);
        assert!(matches!(result, Err(Error::Unreadable(_))));
    }

    #[test]
    fn test_directory_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let result = ImageAsset::from_path(dir.path());
        assert!(matches!(result, Err(Error::Unreadable(_))));
    }

    #[test]
    fn test_from_bytes() {
        let asset = ImageAsset::from_bytes(png_bytes(100, 200)).unwrap();
        assert_eq!((asset.width(), asset.height()), (100, 200));

        let wide = ImageAsset::from_bytes(png_bytes(400, 10));
        assert!(matches!(wide, Err(Error::TooWide { .. })));
    }

    #[test]
    fn test_custom_limits() {
        let limits = ImageLimits {
            max_width: 50,
            max_height: 50,
            max_bytes: 1024 * 1024,
        };
        let result = ImageAsset::from_bytes_with_limits(png_bytes(60, 10), &limits);
        assert!(matches!(result, Err(Error::TooWide { width: 60, max: 50 })));
    }
}

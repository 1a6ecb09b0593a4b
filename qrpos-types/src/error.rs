use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Image validation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Image too wide: {width}px (max: {max}px)")]
    TooWide { width: u32, max: u32 },

    #[error("Image too tall: {height}px (max: {max}px)")]
    TooTall { height: u32, max: u32 },

    #[error("Image file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unreadable image: {0}")]
    Unreadable(String),
}

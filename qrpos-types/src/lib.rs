//! Type definitions for qrpos

pub mod error;
pub mod image_asset;
pub mod port_info;
pub mod report;

pub use error::{Error, Result};
pub use image_asset::{ImageAsset, ImageLimits};
pub use port_info::PortInfo;
pub use report::{BatchEntry, BatchReport, TransferReport};

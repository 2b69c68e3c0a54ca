pub mod annotation;
pub mod batch;
pub mod cli;
pub mod color_adjust;
pub mod config;
pub mod error;
pub mod frame_extractor;
pub mod image_io;
pub mod image_rotator;
pub mod logging;
pub mod mask_compositor;
pub mod overlay;
pub mod visualize;

pub use batch::{BatchReport, FileOutcome, FileStatus};
pub use config::AppConfig;
pub use error::{PrepError, PrepResult};

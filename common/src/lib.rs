pub mod buffer2;
pub mod file_format;
pub mod serde_format;

pub use buffer2::Buffer2;
pub use file_format::{FileExtensionError, SerdeFormat};
pub use serde_format::{deserialize, serialize};

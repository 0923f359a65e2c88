//! Utility modules.

pub mod file;
pub mod text;

pub use file::{
    calculate_checksum, file_size_mb, find_pdf_files, has_supported_extension, validate_pdf_file,
};
pub use text::clean_text;

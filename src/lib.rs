pub mod cli;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::{AppError, PipelineError};
pub use models::{Config, OutputFormat, PdfSource};
pub use services::{OnnxPipeline, QaPipeline};

// Adapters layer: concrete record sources behind the `RecordSource` port.

pub mod file;
pub mod http;

pub use file::FileSource;
pub use http::HttpSource;

use crate::config::cli::LocalStorage;
use crate::domain::ports::RecordSource;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// File source when `source_dir` is set, the REST backend otherwise.
pub fn build_source(
    api_base: &str,
    source_dir: Option<&str>,
    timeout: Duration,
    headers: Option<&HashMap<String, String>>,
) -> Result<Arc<dyn RecordSource>> {
    match source_dir {
        Some(dir) => {
            tracing::info!("📁 Reading records from {}", dir);
            Ok(Arc::new(FileSource::new(LocalStorage::new(dir.to_string()))))
        }
        None => {
            tracing::info!("🌐 Reading records from {}", api_base);
            Ok(Arc::new(HttpSource::with_options(api_base, timeout, headers)?))
        }
    }
}

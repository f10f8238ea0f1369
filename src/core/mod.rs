pub mod chronology;
pub mod engine;
pub mod pipeline;
pub mod slots;

pub use crate::domain::model::{OrderedPortfolio, Section, Snapshot};
pub use crate::domain::ports::{ConfigProvider, Pipeline, RecordSource, Storage};
pub use crate::utils::error::Result;

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{build_source, FileSource, HttpSource};
pub use config::{cli::LocalStorage, Cli, CliConfig, Command};
pub use core::{
    chronology::{effective_key, month_index, rank, EffectiveKey},
    engine::OrderEngine,
    pipeline::PortfolioPipeline,
    slots::{assign, assign_with, group_by_category},
};
pub use domain::model::{Period, PeriodRecord, Positionable, PositionableItem, Section};
pub use utils::error::{OrderError, Result};

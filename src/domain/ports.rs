use crate::domain::model::{OrderedPortfolio, Section, Snapshot};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// What to do when one section cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFailurePolicy {
    /// Order an empty list for the section and keep going.
    #[default]
    Empty,
    Abort,
}

/// Output files the load phase writes besides the per-section JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputOptions {
    pub csv: bool,
    pub zip: bool,
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn sections(&self) -> Vec<Section>;
    fn output_options(&self) -> OutputOptions;
    fn concurrent_requests(&self) -> usize;
    fn on_fetch_failure(&self) -> FetchFailurePolicy;
    /// Fixed seed for the slot shuffle; `None` seeds from OS entropy.
    fn shuffle_seed(&self) -> Option<u64>;
}

/// The backend the portfolio keeps its catalogues in.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn list(&self, section: Section) -> Result<Vec<Value>>;
    async fn get(&self, section: Section, id: &str) -> Result<Option<Value>>;
    async fn delete(&self, section: Section, id: &str) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Snapshot>;
    async fn transform(&self, snapshot: Snapshot) -> Result<OrderedPortfolio>;
    async fn load(&self, portfolio: OrderedPortfolio) -> Result<String>;
}

use crate::core::{chronology, slots};
use crate::domain::model::{
    Education, Experience, OrderedItems, OrderedPortfolio, OrderedSection, Project, Section,
    SectionFetch, Skill, Snapshot,
};
use crate::domain::ports::{ConfigProvider, FetchFailurePolicy, Pipeline, RecordSource, Storage};
use crate::utils::error::{OrderError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const BUNDLE_FILE: &str = "portfolio_order.zip";
pub const SKILL_COLUMNS_FILE: &str = "habilidades_por_categoria.json";

/// Fetches the configured sections, orders each one and writes the result.
pub struct PortfolioPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    source: Arc<dyn RecordSource>,
    sections: Option<Vec<Section>>,
}

impl<S: Storage, C: ConfigProvider> PortfolioPipeline<S, C> {
    pub fn new(storage: S, config: C, source: Arc<dyn RecordSource>) -> Self {
        Self {
            storage,
            config,
            source,
            sections: None,
        }
    }

    /// Restricts the run to `sections` instead of the configured ones.
    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = Some(sections);
        self
    }

    fn selected_sections(&self) -> Vec<Section> {
        self.sections
            .clone()
            .unwrap_or_else(|| self.config.sections())
    }

    fn shuffle_rng(&self) -> StdRng {
        match self.config.shuffle_seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Orders one fetched section. Documents that fail to decode are skipped.
pub fn order_section(fetch: SectionFetch, rng: &mut StdRng) -> OrderedSection {
    let SectionFetch {
        section,
        documents,
        fetch_error,
    } = fetch;
    tracing::debug!(
        "Ordering {} {} documents ({:?})",
        documents.len(),
        section,
        section.strategy()
    );

    let (items, skipped) = match section {
        Section::Experience => {
            let (records, skipped) = decode::<Experience>(section, documents);
            (OrderedItems::Experience(chronology::rank(records)), skipped)
        }
        Section::Education => {
            let (records, skipped) = decode::<Education>(section, documents);
            (OrderedItems::Education(chronology::rank(records)), skipped)
        }
        Section::Skills => {
            let (records, skipped) = decode::<Skill>(section, documents);
            let skills = slots::assign_with(records, rng);
            let columns = slots::group_by_category(&skills);
            (OrderedItems::Skills { skills, columns }, skipped)
        }
        Section::Projects => {
            let (records, skipped) = decode::<Project>(section, documents);
            (OrderedItems::Projects(slots::assign_with(records, rng)), skipped)
        }
    };

    OrderedSection {
        section,
        items,
        skipped,
        fetch_error,
    }
}

fn decode<T: DeserializeOwned>(section: Section, documents: Vec<Value>) -> (Vec<T>, usize) {
    let mut skipped = 0;
    let records = documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<T>(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping malformed {} record: {}", section, e);
                None
            }
        })
        .collect();
    (records, skipped)
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    generated_at: String,
    seed: Option<u64>,
    sections: Vec<ManifestEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    section: Section,
    title: &'a str,
    count: usize,
    skipped: usize,
    fetch_error: Option<&'a str>,
    order: Vec<String>,
}

fn section_json(items: &OrderedItems) -> Result<Vec<u8>> {
    let data = match items {
        OrderedItems::Experience(records) => serde_json::to_vec_pretty(records)?,
        OrderedItems::Education(records) => serde_json::to_vec_pretty(records)?,
        OrderedItems::Skills { skills, .. } => serde_json::to_vec_pretty(skills)?,
        OrderedItems::Projects(records) => serde_json::to_vec_pretty(records)?,
    };
    Ok(data)
}

fn section_csv(items: &OrderedItems) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["rank", "id", "label", "detail"])?;
    for (rank, listing) in items.listings().into_iter().enumerate() {
        writer.write_record([
            (rank + 1).to_string(),
            listing.id().to_string(),
            listing.label(),
            listing.detail(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| OrderError::IoError(e.into_error()))
}

fn bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file(name.as_str(), SimpleFileOptions::default())?;
        zip.write_all(data)?;
    }
    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PortfolioPipeline<S, C> {
    async fn extract(&self) -> Result<Snapshot> {
        let permits = Arc::new(Semaphore::new(self.config.concurrent_requests().max(1)));
        let mut tasks = JoinSet::new();

        for section in self.selected_sections() {
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (section, source.list(section).await)
            });
        }

        let mut fetched = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (section, result) = joined
                .map_err(|e| OrderError::processing(format!("fetch task failed: {}", e)))?;

            match result {
                Ok(documents) => {
                    tracing::info!("Fetched {} {} records", documents.len(), section);
                    fetched.push(SectionFetch {
                        section,
                        documents,
                        fetch_error: None,
                    });
                }
                Err(e) => match self.config.on_fetch_failure() {
                    FetchFailurePolicy::Abort => return Err(e),
                    FetchFailurePolicy::Empty => {
                        tracing::warn!("Fetching {} failed, ordering it empty: {}", section, e);
                        fetched.push(SectionFetch {
                            section,
                            documents: Vec::new(),
                            fetch_error: Some(e.to_string()),
                        });
                    }
                },
            }
        }

        // 依區段固定順序輸出
        fetched.sort_by_key(|f| f.section);
        Ok(Snapshot { sections: fetched })
    }

    async fn transform(&self, snapshot: Snapshot) -> Result<OrderedPortfolio> {
        let mut rng = self.shuffle_rng();
        let sections = snapshot
            .sections
            .into_iter()
            .map(|fetch| order_section(fetch, &mut rng))
            .collect();
        Ok(OrderedPortfolio { sections })
    }

    async fn load(&self, portfolio: OrderedPortfolio) -> Result<String> {
        let options = self.config.output_options();
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        for ordered in &portfolio.sections {
            let resource = ordered.section.resource();
            files.push((format!("{}.json", resource), section_json(&ordered.items)?));

            if let OrderedItems::Skills { columns, .. } = &ordered.items {
                files.push((
                    SKILL_COLUMNS_FILE.to_string(),
                    serde_json::to_vec_pretty(columns)?,
                ));
            }

            if options.csv {
                files.push((format!("{}.csv", resource), section_csv(&ordered.items)?));
            }
        }

        let manifest = Manifest {
            generated_at: chrono::Utc::now().to_rfc3339(),
            seed: self.config.shuffle_seed(),
            sections: portfolio
                .sections
                .iter()
                .map(|s| ManifestEntry {
                    section: s.section,
                    title: s.section.title(),
                    count: s.items.len(),
                    skipped: s.skipped,
                    fetch_error: s.fetch_error.as_deref(),
                    order: s.items.ids(),
                })
                .collect(),
        };
        files.push((
            MANIFEST_FILE.to_string(),
            serde_json::to_vec_pretty(&manifest)?,
        ));

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }

        let base = self.config.output_path().trim_end_matches('/');
        if options.zip {
            let zip_data = bundle(&files)?;
            tracing::debug!("Writing {} ({} bytes)", BUNDLE_FILE, zip_data.len());
            self.storage.write_file(BUNDLE_FILE, &zip_data).await?;
            return Ok(format!("{}/{}", base, BUNDLE_FILE));
        }

        Ok(format!("{}/{}", base, MANIFEST_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::OutputOptions;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_json(&self, path: &str) -> Option<Value> {
            let files = self.files.lock().await;
            files
                .get(path)
                .and_then(|data| serde_json::from_slice(data).ok())
        }

        async fn names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.files.lock().await.keys().cloned().collect();
            names.sort();
            names
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                OrderError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        sections: Vec<Section>,
        options: OutputOptions,
        policy: FetchFailurePolicy,
        seed: Option<u64>,
    }

    impl MockConfig {
        fn new(sections: Vec<Section>) -> Self {
            Self {
                sections,
                options: OutputOptions::default(),
                policy: FetchFailurePolicy::Empty,
                seed: Some(5),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn output_path(&self) -> &str {
            "test_output"
        }

        fn sections(&self) -> Vec<Section> {
            self.sections.clone()
        }

        fn output_options(&self) -> OutputOptions {
            self.options
        }

        fn concurrent_requests(&self) -> usize {
            2
        }

        fn on_fetch_failure(&self) -> FetchFailurePolicy {
            self.policy
        }

        fn shuffle_seed(&self) -> Option<u64> {
            self.seed
        }
    }

    /// In-memory backend; sections missing from the map fail to fetch.
    struct MockSource {
        data: HashMap<Section, Vec<Value>>,
    }

    #[async_trait]
    impl RecordSource for MockSource {
        async fn list(&self, section: Section) -> Result<Vec<Value>> {
            self.data
                .get(&section)
                .cloned()
                .ok_or_else(|| OrderError::BackendStatusError {
                    status: 503,
                    url: format!("mock://{}", section),
                })
        }

        async fn get(&self, _section: Section, _id: &str) -> Result<Option<Value>> {
            Ok(None)
        }

        async fn delete(&self, _section: Section, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn source(data: Vec<(Section, Value)>) -> Arc<dyn RecordSource> {
        let data = data
            .into_iter()
            .map(|(section, value)| match value {
                Value::Array(items) => (section, items),
                other => (section, vec![other]),
            })
            .collect();
        Arc::new(MockSource { data })
    }

    #[tokio::test]
    async fn test_experience_is_ranked() {
        let pipeline = PortfolioPipeline::new(
            MockStorage::new(),
            MockConfig::new(vec![Section::Experience]),
            source(vec![(
                Section::Experience,
                json!([
                    {"id": "A", "mesInicio": "Enero", "anoInicio": 2020, "mesFin": "Diciembre", "anoFin": 2022, "trabajoActivo": false},
                    {"id": "B", "mesInicio": "Enero", "anoInicio": 2022, "trabajoActivo": true},
                    {"id": "C", "mesInicio": "Junio", "anoInicio": "2023", "mesFin": "Junio", "anoFin": "2023"}
                ]),
            )]),
        );

        let snapshot = pipeline.extract().await.unwrap();
        let portfolio = pipeline.transform(snapshot).await.unwrap();
        let ordered = portfolio.section(Section::Experience).unwrap();
        assert_eq!(ordered.items.ids(), vec!["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_projects_pinned_and_malformed_skipped() {
        let pipeline = PortfolioPipeline::new(
            MockStorage::new(),
            MockConfig::new(vec![Section::Projects]),
            source(vec![(
                Section::Projects,
                json!([
                    {"id": "a", "nombre": "A"},
                    {"id": "b", "nombre": "B"},
                    "not an object",
                    {"id": "c", "nombre": "C", "posicion": 1},
                    {"id": "d", "nombre": "D"}
                ]),
            )]),
        );

        let snapshot = pipeline.extract().await.unwrap();
        let portfolio = pipeline.transform(snapshot).await.unwrap();
        let ordered = portfolio.section(Section::Projects).unwrap();
        assert_eq!(ordered.skipped, 1);
        assert_eq!(ordered.items.len(), 4);
        assert_eq!(ordered.items.ids()[0], "c");
    }

    #[tokio::test]
    async fn test_project_with_both_position_keys_is_kept() {
        let pipeline = PortfolioPipeline::new(
            MockStorage::new(),
            MockConfig::new(vec![Section::Projects]),
            source(vec![(
                Section::Projects,
                json!([
                    {"id": "a"},
                    {"id": "b", "position": 2, "posicion": 2},
                    {"id": "c"}
                ]),
            )]),
        );

        let snapshot = pipeline.extract().await.unwrap();
        let portfolio = pipeline.transform(snapshot).await.unwrap();
        let ordered = portfolio.section(Section::Projects).unwrap();
        assert_eq!(ordered.skipped, 0);
        assert_eq!(ordered.items.ids()[1], "b");
    }

    #[tokio::test]
    async fn test_fetch_failure_orders_empty_section() {
        let pipeline = PortfolioPipeline::new(
            MockStorage::new(),
            MockConfig::new(vec![Section::Skills, Section::Education]),
            source(vec![(Section::Education, json!([{"id": "e"}]))]),
        );

        let snapshot = pipeline.extract().await.unwrap();
        assert_eq!(snapshot.sections.len(), 2);
        assert_eq!(snapshot.sections[0].section, Section::Education);

        let skills = &snapshot.sections[1];
        assert!(skills.documents.is_empty());
        assert!(skills.fetch_error.as_deref().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_failure_can_abort() {
        let mut config = MockConfig::new(vec![Section::Skills]);
        config.policy = FetchFailurePolicy::Abort;
        let pipeline = PortfolioPipeline::new(MockStorage::new(), config, source(vec![]));

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, OrderError::BackendStatusError { .. }));
    }

    async fn skill_order(data: Value) -> Vec<String> {
        let pipeline = PortfolioPipeline::new(
            MockStorage::new(),
            MockConfig::new(vec![Section::Skills]),
            source(vec![(Section::Skills, data)]),
        );
        let snapshot = pipeline.extract().await.unwrap();
        pipeline.transform(snapshot).await.unwrap().sections[0]
            .items
            .ids()
    }

    #[tokio::test]
    async fn test_same_seed_same_order() {
        let data: Vec<Value> = (0..12)
            .map(|i| json!({"id": i, "name": format!("s{}", i)}))
            .collect();
        let first = skill_order(Value::Array(data.clone())).await;
        let second = skill_order(Value::Array(data)).await;
        assert_eq!(first.len(), 12);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_writes_section_files_and_manifest() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new(vec![Section::Skills]);
        config.options = OutputOptions {
            csv: true,
            zip: true,
        };
        let pipeline = PortfolioPipeline::new(
            storage.clone(),
            config,
            source(vec![(
                Section::Skills,
                json!([
                    {"id": 1, "name": "Java", "category": "Backend", "position": 1},
                    {"id": 2, "name": "React", "category": "Frontend", "position": 2},
                    {"id": 3, "name": "Spring", "category": "Backend", "position": 3}
                ]),
            )]),
        );

        let snapshot = pipeline.extract().await.unwrap();
        let portfolio = pipeline.transform(snapshot).await.unwrap();
        let path = pipeline.load(portfolio).await.unwrap();
        assert_eq!(path, "test_output/portfolio_order.zip");

        assert_eq!(
            storage.names().await,
            vec![
                "habilidades.csv",
                "habilidades.json",
                "habilidades_por_categoria.json",
                "manifest.json",
                "portfolio_order.zip",
            ]
        );

        let columns = storage.get_json(SKILL_COLUMNS_FILE).await.unwrap();
        assert_eq!(columns[0]["category"], "Backend");
        assert_eq!(columns[0]["skills"].as_array().unwrap().len(), 2);

        let manifest = storage.get_json(MANIFEST_FILE).await.unwrap();
        assert_eq!(manifest["seed"], 5);
        assert_eq!(manifest["sections"][0]["section"], "habilidades");
        assert_eq!(manifest["sections"][0]["order"], json!(["1", "2", "3"]));
    }
}

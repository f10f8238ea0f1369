use crate::domain::model::Section;
use crate::domain::ports::{RecordSource, Storage};
use crate::utils::error::{OrderError, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Offline source: one `{resource}.json` array per section, read through a [`Storage`].
#[derive(Debug, Clone)]
pub struct FileSource<S: Storage> {
    storage: S,
}

impl<S: Storage> FileSource<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn file_name(section: Section) -> String {
        format!("{}.json", section.resource())
    }

    async fn read_documents(&self, section: Section) -> Result<Vec<Value>> {
        let path = Self::file_name(section);
        let bytes = match self.storage.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(OrderError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} not found, section is empty", path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            _ => Err(OrderError::processing(format!(
                "{} must contain a JSON array",
                path
            ))),
        }
    }
}

/// The `id` of a stored document, compared as text so `7` and `"7"` match.
pub fn document_id(document: &Value) -> Option<String> {
    match document.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl<S: Storage> RecordSource for FileSource<S> {
    async fn list(&self, section: Section) -> Result<Vec<Value>> {
        self.read_documents(section).await
    }

    async fn get(&self, section: Section, id: &str) -> Result<Option<Value>> {
        Ok(self
            .read_documents(section)
            .await?
            .into_iter()
            .find(|doc| document_id(doc).as_deref() == Some(id)))
    }

    async fn delete(&self, section: Section, id: &str) -> Result<()> {
        let documents = self.read_documents(section).await?;
        let before = documents.len();
        let kept: Vec<Value> = documents
            .into_iter()
            .filter(|doc| document_id(doc).as_deref() != Some(id))
            .collect();

        if kept.len() == before {
            return Err(OrderError::NotFoundError {
                section: section.resource().to_string(),
                id: id.to_string(),
            });
        }

        let data = serde_json::to_vec_pretty(&kept)?;
        self.storage
            .write_file(&Self::file_name(section), &data)
            .await
    }
}

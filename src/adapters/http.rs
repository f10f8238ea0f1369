use crate::domain::model::Section;
use crate::domain::ports::RecordSource;
use crate::utils::error::{OrderError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Reads and deletes portfolio records over the backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    api_base: Url,
}

impl HttpSource {
    pub fn new(api_base: &str) -> Result<Self> {
        Self::with_options(api_base, Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
    }

    pub fn with_options(
        api_base: &str,
        timeout: Duration,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| OrderError::InvalidConfigValueError {
            field: "api_base".to_string(),
            value: api_base.to_string(),
            reason: e.to_string(),
        })?;

        let mut default_headers = HeaderMap::new();
        for (key, value) in headers.into_iter().flatten() {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                OrderError::InvalidConfigValueError {
                    field: "source.headers".to_string(),
                    value: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                OrderError::InvalidConfigValueError {
                    field: format!("source.headers.{}", key),
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()?;

        Ok(Self { client, api_base })
    }

    /// `{base}/api/{resource}` or `{base}/api/{resource}/{id}`.
    pub fn endpoint(&self, section: Section, id: Option<&str>) -> Result<Url> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                OrderError::config(format!("{} cannot be used as an API base", self.api_base))
            })?;
            segments.pop_if_empty().push("api").push(section.resource());
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn list(&self, section: Section) -> Result<Vec<Value>> {
        let url = self.endpoint(section, None)?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(OrderError::BackendStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        match response.json::<Value>().await? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            // 單一物件包成陣列
            Value::Object(obj) => {
                tracing::warn!("{} returned a single object, treating it as a list", url);
                Ok(vec![Value::Object(obj)])
            }
            other => Err(OrderError::processing(format!(
                "{} returned {} instead of a list",
                url,
                json_kind(&other)
            ))),
        }
    }

    async fn get(&self, section: Section, id: &str) -> Result<Option<Value>> {
        let url = self.endpoint(section, Some(id))?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => match response.json::<Value>().await? {
                Value::Null => Ok(None),
                value => Ok(Some(value)),
            },
            status => Err(OrderError::BackendStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn delete(&self, section: Section, id: &str) -> Result<()> {
        let url = self.endpoint(section, Some(id))?;
        tracing::debug!("DELETE {}", url);

        let response = self.client.delete(url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(OrderError::NotFoundError {
                section: section.resource().to_string(),
                id: id.to_string(),
            }),
            status if status.is_success() => Ok(()),
            status => Err(OrderError::BackendStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_building() {
        let source = HttpSource::new("http://localhost:8080/").unwrap();
        assert_eq!(
            source.endpoint(Section::Projects, None).unwrap().as_str(),
            "http://localhost:8080/api/proyectos"
        );
        assert_eq!(
            source
                .endpoint(Section::Education, Some("a b"))
                .unwrap()
                .as_str(),
            "http://localhost:8080/api/formaciones/a%20b"
        );

        let nested = HttpSource::new("https://example.com/portfolio").unwrap();
        assert_eq!(
            nested.endpoint(Section::Skills, None).unwrap().as_str(),
            "https://example.com/portfolio/api/habilidades"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(HttpSource::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let server = MockServer::start();
        let list_mock = server.mock(|when, then| {
            when.method(GET).path("/api/habilidades");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!([{"id": 1, "name": "Rust"}, {"id": 2, "name": "Java"}]));
        });
        let get_mock = server.mock(|when, then| {
            when.method(GET).path("/api/habilidades/2");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"id": 2, "name": "Java"}));
        });
        let missing_mock = server.mock(|when, then| {
            when.method(GET).path("/api/habilidades/9");
            then.status(404);
        });

        let source = HttpSource::new(&server.base_url()).unwrap();
        let items = source.list(Section::Skills).await.unwrap();
        assert_eq!(items.len(), 2);

        let item = source.get(Section::Skills, "2").await.unwrap();
        assert_eq!(item, Some(json!({"id": 2, "name": "Java"})));
        assert_eq!(source.get(Section::Skills, "9").await.unwrap(), None);

        list_mock.assert();
        get_mock.assert();
        missing_mock.assert();
    }

    #[tokio::test]
    async fn test_list_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/proyectos");
            then.status(500);
        });

        let source = HttpSource::new(&server.base_url()).unwrap();
        let err = source.list(Section::Projects).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::BackendStatusError { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_maps_not_found() {
        let server = MockServer::start();
        let ok_mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/experiencias/1");
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/api/experiencias/2");
            then.status(404);
        });

        let source = HttpSource::new(&server.base_url()).unwrap();
        source.delete(Section::Experience, "1").await.unwrap();
        ok_mock.assert();

        let err = source.delete(Section::Experience, "2").await.unwrap_err();
        assert!(matches!(err, OrderError::NotFoundError { .. }));
    }

    #[tokio::test]
    async fn test_default_headers_are_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/formaciones")
                .header("x-portfolio-client", "order");
            then.status(200).json_body(json!([]));
        });

        let headers = HashMap::from([("x-portfolio-client".to_string(), "order".to_string())]);
        let source =
            HttpSource::with_options(&server.base_url(), Duration::from_secs(5), Some(&headers))
                .unwrap();
        assert!(source.list(Section::Education).await.unwrap().is_empty());
        mock.assert();
    }
}

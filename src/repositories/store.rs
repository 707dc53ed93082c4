use async_trait::async_trait;
use serde_json::Value;

pub mod memory;

/// Narrow client for the backing store: single-row lookups, inserts that
/// return the stored row, and filtered patches. Adapters manage their own
/// connections; separate calls are not transactional with one another.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    async fn find_one(&self, table: &str, filter: (&str, &str))
        -> Result<Option<Value>, StoreError>;

    async fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError>;

    async fn update(
        &self,
        table: &str,
        filter: (&str, &str),
        patch: Value,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("store rejected request with status {0}: {1}")]
    Rejected(u16, String),
    #[error("unexpected store response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}

/// REST adapter speaking the PostgREST conventions of the hosted store:
/// `{url}/rest/v1/{table}` with `apikey` and bearer authentication, filters
/// as `column=eq.value` query parameters.
pub struct RestStore {
    url: String,
    service_key: String,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(url: String, service_key: String) -> Self {
        Self {
            url,
            service_key,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }

    fn rows_from(body: &str) -> Result<Vec<Value>, StoreError> {
        Ok(serde_json::from_str(body)?)
    }
}

#[async_trait]
impl StoreClient for RestStore {
    async fn find_one(
        &self,
        table: &str,
        filter: (&str, &str),
    ) -> Result<Option<Value>, StoreError> {
        let (column, value) = filter;

        let response = self
            .client
            .get(self.table_url(table))
            .query(&[(column, format!("eq.{}", value)), ("limit", "1".to_string())])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Rejected(status.as_u16(), body));
        }

        let mut rows = Self::rows_from(&body)?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.remove(0)))
        }
    }

    async fn insert(&self, table: &str, record: Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.service_key)
            .header("Prefer", "return=representation")
            .bearer_auth(&self.service_key)
            .json(&record)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Rejected(status.as_u16(), body));
        }

        let mut rows = Self::rows_from(&body)?;
        if rows.is_empty() {
            return Err(StoreError::Adapter("insert returned no row".into()));
        }

        Ok(rows.remove(0))
    }

    async fn update(
        &self,
        table: &str,
        filter: (&str, &str),
        patch: Value,
    ) -> Result<(), StoreError> {
        let (column, value) = filter;

        let response = self
            .client
            .patch(self.table_url(table))
            .query(&[(column, format!("eq.{}", value))])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&patch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(StoreError::Rejected(status.as_u16(), body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn table_url_ignores_trailing_slash() {
        let store = RestStore::new(
            "http://localhost:54321/".to_string(),
            "service-role-key".to_string(),
        );
        assert_that!(store.table_url("referrals"))
            .is_equal_to("http://localhost:54321/rest/v1/referrals".to_string());
    }
}

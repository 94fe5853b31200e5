// src/fetch/client.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::{future::Future, sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

use super::{
    auth::TokenCache,
    ids::extract_id,
    types::{
        BatchCreateData, BatchCreateRequest, Envelope, NewRecord, SearchData, SearchRequest,
    },
};
use crate::process::normalize::{fields, NormalizedRecord};

/// One page of the identifier projection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdPage {
    pub ids: Vec<String>,
    pub has_more: bool,
    pub page_token: Option<String>,
}

/// The two remote operations the sync routine depends on.
pub trait TableStore {
    /// Fetch one page of stored document ids.
    fn search_ids_page(
        &self,
        page_token: Option<&str>,
        page_size: usize,
    ) -> impl Future<Output = Result<IdPage>> + Send;

    /// Insert `records` in one request; returns how many the store accepted.
    fn batch_create(
        &self,
        records: &[NormalizedRecord],
    ) -> impl Future<Output = Result<usize>> + Send;
}

/// Normalise an api base so relative joins land under it.
pub fn parse_api_base(raw: &str) -> Result<Url> {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).with_context(|| format!("parsing api base {}", raw))
}

/// Open-api client for one table.
pub struct BitableClient {
    http: Client,
    auth: Arc<TokenCache>,
    search_url: Url,
    batch_create_url: Url,
    timeout: Duration,
}

impl BitableClient {
    pub fn new(
        http: Client,
        auth: Arc<TokenCache>,
        api_base: &Url,
        app_token: &str,
        table_id: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let records = api_base
            .join(&format!(
                "bitable/v1/apps/{}/tables/{}/records/",
                app_token, table_id
            ))
            .context("building records url")?;
        Ok(Self {
            http,
            auth,
            search_url: records.join("search")?,
            batch_create_url: records.join("batch_create")?,
            timeout,
        })
    }

    async fn post<B, T>(&self, url: &Url, query: &[(&str, String)], body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let token = self.auth.token().await?;
        let envelope: Envelope<T> = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .query(query)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?
            .error_for_status()
            .with_context(|| format!("non-success status from {}", url))?
            .json()
            .await
            .with_context(|| format!("decoding response from {}", url))?;
        Ok(envelope.into_data()?)
    }
}

impl TableStore for BitableClient {
    async fn search_ids_page(&self, page_token: Option<&str>, page_size: usize) -> Result<IdPage> {
        let mut query = vec![("page_size", page_size.to_string())];
        if let Some(tok) = page_token {
            query.push(("page_token", tok.to_string()));
        }
        let body = SearchRequest {
            field_names: [fields::DOCUMENT_ID],
        };

        let data: SearchData = self.post(&self.search_url, &query, &body).await?;
        let ids: Vec<String> = data
            .items
            .unwrap_or_default()
            .iter()
            .filter_map(|item| item.fields.get(fields::DOCUMENT_ID))
            .filter_map(extract_id)
            .collect();
        debug!(count = ids.len(), has_more = data.has_more, "id page");

        Ok(IdPage {
            ids,
            has_more: data.has_more,
            page_token: data.page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn batch_create(&self, records: &[NormalizedRecord]) -> Result<usize> {
        let body = BatchCreateRequest {
            records: records
                .iter()
                .map(|r| NewRecord {
                    fields: r.to_fields(),
                })
                .collect(),
        };
        let query = [("user_id_type", "open_id".to_string())];

        let data: BatchCreateData = self.post(&self.batch_create_url, &query, &body).await?;
        Ok(data.records.map(|r| r.len()).unwrap_or(0))
    }
}

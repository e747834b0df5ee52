use crate::error::{FarmError, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use tracing::debug;

/// Thin PostgREST client authenticated with the Supabase service-role key.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

/// PostgREST query string builder. Filters use the `column=op.value` form.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("{}.{}", op, value)));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lt", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, "is", "null")
    }

    /// `*` is the PostgREST wildcard.
    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.filter(column, "like", pattern)
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.params.push(("order".into(), format!("{}.{}", column, dir)));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".into(), n.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str, query: &Query) -> RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .query(query.params())
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        // Unique and foreign-key violations surface as 409.
        if status == reqwest::StatusCode::CONFLICT {
            return Err(FarmError::Conflict(message));
        }
        Err(FarmError::Backend { status: status.as_u16(), message })
    }

    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        debug!("select {} {:?}", table, query.params());
        let resp = self.request(Method::GET, table, query).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn select_one<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Option<T>> {
        let rows: Vec<T> = self.select(table, &query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<()> {
        let resp = self
            .request(Method::POST, table, &Query::new())
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn upsert<T: Serialize + ?Sized>(&self, table: &str, row: &T, on_conflict: &str) -> Result<()> {
        let query = Query { params: vec![("on_conflict".into(), on_conflict.to_string())] };
        let resp = self
            .request(Method::POST, table, &query)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Returns the number of rows the filter matched.
    pub async fn update<T: Serialize + ?Sized>(&self, table: &str, query: &Query, patch: &T) -> Result<usize> {
        let resp = self
            .request(Method::PATCH, table, query)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::check(resp).await?.json().await?;
        Ok(rows.len())
    }

    /// Returns the number of rows deleted.
    pub async fn delete(&self, table: &str, query: &Query) -> Result<usize> {
        let resp = self
            .request(Method::DELETE, table, query)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = Self::check(resp).await?.json().await?;
        Ok(rows.len())
    }
}

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::SupabaseError;

/// Thin client for the REST table API of the project.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl RestClient {
    pub fn new(
        http: reqwest::Client,
        project_url: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, SupabaseError> {
        let base_url = Url::parse(project_url)?.join("rest/v1/")?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Builds the URL of a table with the given query parameters.
    pub fn table_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, SupabaseError> {
        let mut url = self.base_url.join(table)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Fetches the rows of `table` matching `query`, e.g.
    /// `[("select", "*"), ("order", "created_at.desc")]`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, SupabaseError> {
        let url = self.table_url(table, query)?;
        let rows = self
            .request(reqwest::Method::GET, url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<T>>()
            .await?;
        Ok(rows)
    }

    /// Deletes the rows of `table` whose `column` equals `value`.
    pub async fn delete_eq(&self, table: &str, column: &str, value: &str) -> Result<(), SupabaseError> {
        let filter = format!("eq.{value}");
        let url = self.table_url(table, &[(column, filter.as_str())])?;
        self.request(reqwest::Method::DELETE, url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Inserts one row into `table`.
    pub async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<(), SupabaseError> {
        let url = self.table_url(table, &[])?;
        self.request(reqwest::Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Applies `changes` to the rows of `table` whose `column` equals
    /// `value`.
    pub async fn update_eq<T: Serialize + ?Sized>(
        &self,
        table: &str,
        column: &str,
        value: &str,
        changes: &T,
    ) -> Result<(), SupabaseError> {
        let filter = format!("eq.{value}");
        let url = self.table_url(table, &[(column, filter.as_str())])?;
        self.request(reqwest::Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(changes)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Issues the cheapest possible query against `table` so the hosted
    /// database stays active.
    pub async fn keep_alive(&self, table: &str) -> Result<(), SupabaseError> {
        let rows: Vec<serde_json::Value> = self.select(table, &[("select", "id"), ("limit", "1")]).await?;
        log::debug!("Keep-alive query returned {} row(-s)", rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_urls_under_rest_prefix() {
        let client =
            RestClient::new(reqwest::Client::new(), "https://project.supabase.co", "anon").unwrap();

        let url = client
            .table_url("work_entries", &[("select", "*"), ("order", "created_at.desc")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/rest/v1/work_entries?select=*&order=created_at.desc"
        );

        let url = client.table_url("work_entries", &[("id", "eq.42")]).unwrap();
        assert_eq!(url.query(), Some("id=eq.42"));
    }
}

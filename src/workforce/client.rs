//! HTTP client for the workforce document store.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

use crate::cache::{RemoteFetch, RemoteStore, RemoteWriter};
use crate::config::{Config, RemoteConfig};

use super::types::{Absence, CompanyScope, Contract, Employee, EmployeeScope, Shift, WeekScope};

/// Workforce API client
#[derive(Clone)]
pub struct WorkforceClient {
  http: reqwest::Client,
  base_url: Url,
}

impl WorkforceClient {
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid remote base URL {}: {}", config.base_url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("Remote base URL cannot be a base: {}", base_url));
    }

    let mut headers = HeaderMap::new();
    if let Some(token) = Config::get_api_token() {
      let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid API token: {}", e))?;
      headers.insert(AUTHORIZATION, value);
    }

    let mut builder = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .default_headers(headers);
    if !config.system_proxy {
      builder = builder.no_proxy();
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// `<base>/companies/<company>/<collection>[/<id>]?<query>`
  fn url(&self, company_id: &str, path: &[&str], query: &[(&str, String)]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments
        .pop_if_empty()
        .push("companies")
        .push(company_id)
        .extend(path);
    }
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query);
    }
    url
  }

  /// Fetch a collection. Only `[]` means the scope has no records; a `404`
  /// usually means a wrong base URL or route and must not evict the cache.
  async fn list<T: DeserializeOwned>(&self, url: Url) -> RemoteFetch<T> {
    let response = match self.http.get(url.clone()).send().await {
      Ok(response) => response,
      Err(e) => return RemoteFetch::Failed(format!("GET {} failed: {}", url, e)),
    };

    let status = response.status();
    if !status.is_success() {
      return RemoteFetch::Failed(format!("GET {} returned {}", url, status));
    }

    match response.json::<Vec<T>>().await {
      Ok(items) if items.is_empty() => RemoteFetch::Empty,
      Ok(items) => RemoteFetch::Items(items),
      Err(e) => RemoteFetch::Failed(format!("Failed to parse response from {}: {}", url, e)),
    }
  }

  async fn put<T: Serialize + Sync>(&self, url: Url, entity: &T) -> Result<()> {
    let response = self
      .http
      .put(url.clone())
      .json(entity)
      .send()
      .await
      .map_err(|e| eyre!("PUT {} failed: {}", url, e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(eyre!("PUT {} returned {}", url, status));
    }
    Ok(())
  }
}

#[async_trait]
impl RemoteStore<Employee> for WorkforceClient {
  async fn fetch(&self, scope: &CompanyScope) -> RemoteFetch<Employee> {
    self.list(self.url(&scope.company_id, &["employees"], &[])).await
  }
}

#[async_trait]
impl RemoteStore<Shift> for WorkforceClient {
  async fn fetch(&self, scope: &WeekScope) -> RemoteFetch<Shift> {
    let query = [
      ("from", scope.week_start.to_string()),
      ("to", scope.week_end().to_string()),
    ];
    self
      .list(self.url(&scope.company_id, &["shifts"], &query))
      .await
  }
}

#[async_trait]
impl RemoteStore<Contract> for WorkforceClient {
  async fn fetch(&self, scope: &EmployeeScope) -> RemoteFetch<Contract> {
    let query = [("employee", scope.employee_id.clone())];
    self
      .list(self.url(&scope.company_id, &["contracts"], &query))
      .await
  }
}

#[async_trait]
impl RemoteStore<Absence> for WorkforceClient {
  async fn fetch(&self, scope: &CompanyScope) -> RemoteFetch<Absence> {
    self.list(self.url(&scope.company_id, &["absences"], &[])).await
  }
}

#[async_trait]
impl RemoteWriter<Employee> for WorkforceClient {
  async fn update(&self, entity: &Employee) -> Result<String> {
    let url = self.url(&entity.company_id, &["employees", entity.id.as_str()], &[]);
    self.put(url, entity).await?;
    Ok(entity.id.clone())
  }
}

#[async_trait]
impl RemoteWriter<Absence> for WorkforceClient {
  async fn update(&self, entity: &Absence) -> Result<String> {
    let url = self.url(&entity.company_id, &["absences", entity.id.as_str()], &[]);
    self.put(url, entity).await?;
    Ok(entity.id.clone())
  }
}

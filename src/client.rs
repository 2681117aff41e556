//! Blocking HTTP client for a running site's JSON API.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};

use crate::error::SiteError;
use crate::models::page::Page;
use crate::models::settings::{Settings, SettingsPatch};
use crate::resolver::PageLookup;
use crate::theme::SettingsRemote;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Talks to `<base_url>/api`. Serves both as the page lookup for resolving
/// paths remotely and as the settings store behind `ThemeState`.
pub struct SiteClient {
    client: Client,
    base_url: String,
}

impl SiteClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SiteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SiteError::FetchFailure(format!("HTTP client error: {}", e)))?;
        Ok(SiteClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Each slug segment is percent-encoded, so `#`, `?` and `%` stay part
    /// of the slug.
    fn page_url(&self, slug: &str) -> Result<Url, SiteError> {
        let mut url = Url::parse(&self.url("/pages/slug")).map_err(|e| {
            SiteError::FetchFailure(format!("invalid server URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                SiteError::FetchFailure(format!("server URL {} cannot take a path", self.base_url))
            })?
            .extend(slug.split('/'));
        Ok(url)
    }
}

fn error_body(resp: Response) -> String {
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text);
    format!("server returned {}: {}", status, message)
}

impl PageLookup for SiteClient {
    fn page_by_slug(&self, slug: &str) -> Result<Option<Page>, SiteError> {
        let resp = self
            .client
            .get(self.page_url(slug)?)
            .send()
            .map_err(|e| SiteError::FetchFailure(format!("page request failed: {}", e)))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(SiteError::FetchFailure(error_body(resp)));
        }

        resp.json::<Page>()
            .map(Some)
            .map_err(|e| SiteError::FetchFailure(format!("page JSON parse error: {}", e)))
    }
}

impl SettingsRemote for SiteClient {
    fn get_settings(&self) -> Result<Option<Settings>, SiteError> {
        let resp = self
            .client
            .get(self.url("/settings"))
            .send()
            .map_err(|e| SiteError::FetchFailure(format!("settings request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(SiteError::FetchFailure(error_body(resp)));
        }

        resp.json::<Option<Settings>>()
            .map_err(|e| SiteError::FetchFailure(format!("settings JSON parse error: {}", e)))
    }

    fn create_settings(&self, patch: &SettingsPatch) -> Result<Settings, SiteError> {
        let resp = self
            .client
            .post(self.url("/settings"))
            .json(patch)
            .send()
            .map_err(|e| SiteError::PersistenceFailure(format!("create request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(SiteError::PersistenceFailure(error_body(resp)));
        }

        resp.json::<Settings>().map_err(|e| {
            SiteError::PersistenceFailure(format!("settings JSON parse error: {}", e))
        })
    }

    fn update_settings(&self, id: i64, patch: &SettingsPatch) -> Result<Settings, SiteError> {
        let resp = self
            .client
            .put(self.url(&format!("/settings/{}", id)))
            .json(patch)
            .send()
            .map_err(|e| SiteError::PersistenceFailure(format!("update request failed: {}", e)))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SiteError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(SiteError::PersistenceFailure(error_body(resp)));
        }

        resp.json::<Settings>().map_err(|e| {
            SiteError::PersistenceFailure(format!("settings JSON parse error: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = SiteClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/settings"), "http://localhost:8000/api/settings");
    }

    #[test]
    fn page_slugs_are_percent_encoded() {
        let client = SiteClient::new("http://localhost:8000", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.page_url("notes/rust").unwrap().as_str(),
            "http://localhost:8000/api/pages/slug/notes/rust"
        );
        assert_eq!(
            client.page_url("c#x?y z%").unwrap().as_str(),
            "http://localhost:8000/api/pages/slug/c%23x%3Fy%20z%25"
        );
    }

    #[test]
    fn unreachable_server_is_a_fetch_failure() {
        // Port 9 (discard) is not expected to run an HTTP server
        let client = SiteClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            client.get_settings(),
            Err(SiteError::FetchFailure(_))
        ));
        assert!(matches!(
            client.create_settings(&SettingsPatch::default()),
            Err(SiteError::PersistenceFailure(_))
        ));
    }
}

//! DevTools HTTP endpoint: list, open, activate and close page targets.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::SurfaceError;

/// One debuggable target as reported by `/json/list`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Target id.
    pub id: String,
    /// Target type (`page`, `service_worker`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Current URL.
    #[serde(default)]
    pub url: String,
    /// Current title.
    #[serde(default)]
    pub title: String,
    /// WebSocket URL for the target's protocol session.
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl TargetInfo {
    /// Whether this target is a top-level page.
    pub fn is_page(&self) -> bool {
        self.kind == "page"
    }
}

/// Client for the browser's DevTools HTTP endpoint.
#[derive(Clone, Debug)]
pub struct Discovery {
    http: Client,
    base: String,
}

impl Discovery {
    /// Client for `endpoint` (e.g. `http://127.0.0.1:9222`).
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: Client::new(),
            base: endpoint.trim_end_matches('/').to_owned(),
        }
    }

    /// Base URL of the endpoint.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Open page targets, in the browser's order.
    pub async fn pages(&self) -> Result<Vec<TargetInfo>, SurfaceError> {
        let targets: Vec<TargetInfo> = self
            .http
            .get(format!("{}/json/list", self.base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(targets.into_iter().filter(TargetInfo::is_page).collect())
    }

    /// The page target with `id`.
    pub async fn page(&self, id: &str) -> Result<TargetInfo, SurfaceError> {
        self.pages()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| SurfaceError::NoTarget(format!("page {id} is gone")))
    }

    /// Open a new page on `url`.
    pub async fn open(&self, url: &str) -> Result<TargetInfo, SurfaceError> {
        debug!(url, "opening page target");
        Ok(self
            .http
            .put(format!("{}/json/new?{}", self.base, urlencoding::encode(url)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Bring a page to the foreground.
    pub async fn activate(&self, id: &str) -> Result<(), SurfaceError> {
        let _ = self
            .http
            .get(format!("{}/json/activate/{id}", self.base))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_list_deserializes() {
        let json = r#"[
            {"id": "A1", "type": "page", "url": "https://a.test/", "title": "A",
             "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/A1"},
            {"id": "W1", "type": "service_worker", "url": "https://a.test/sw.js"}
        ]"#;
        let targets: Vec<TargetInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets[0].is_page());
        assert!(!targets[1].is_page());
        assert_eq!(
            targets[0].web_socket_debugger_url.as_deref(),
            Some("ws://127.0.0.1:9222/devtools/page/A1")
        );
        assert_eq!(targets[1].title, "");
    }

    #[test]
    fn base_trims_trailing_slash() {
        assert_eq!(Discovery::new("http://127.0.0.1:9222/").base(), "http://127.0.0.1:9222");
    }
}

use std::fmt;

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use remora_core::constants::{DEFAULT_HOME_URL, DEFAULT_JPEG_QUALITY};
use remora_core::{ImageFormat, Modifiers, TabDirection};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::connection::{CdpConnection, CdpEvent};
use super::discovery::Discovery;
use super::scripts;
use crate::errors::SurfaceError;
use crate::surface::{Capture, ElementRef, RenderSurface, SurfaceEvent};

/// Where the browser lives and how to drive it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CdpConfig {
    /// DevTools HTTP endpoint, e.g. `http://127.0.0.1:9222`.
    pub endpoint: String,
    /// Page for `Home` and new tabs.
    pub home_url: String,
    /// Screenshot JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// Viewport override applied to each attached tab.
    pub viewport: Option<(u32, u32)>,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9222".into(),
            home_url: DEFAULT_HOME_URL.into(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            viewport: None,
        }
    }
}

#[derive(Deserialize)]
struct FocusedElement {
    id: String,
    tag: String,
    editable: bool,
}

/// What a raw page event means for the bridge.
#[derive(Debug, PartialEq)]
enum Translated {
    Emit(SurfaceEvent),
    /// The document finished loading; title and URL must be read back.
    Loaded,
}

fn translate(event: &CdpEvent, main_frame: Option<&str>) -> Option<Translated> {
    let is_main = |frame_id: Option<&str>| match (main_frame, frame_id) {
        (Some(main), Some(id)) => main == id,
        (None, _) => true,
        (Some(_), None) => false,
    };
    match event.method.as_str() {
        "Page.frameStartedLoading" => is_main(event.params["frameId"].as_str())
            .then_some(Translated::Emit(SurfaceEvent::LoadStarted)),
        "Page.frameNavigated" => {
            let frame = &event.params["frame"];
            if frame.get("parentId").is_some() {
                return None;
            }
            let url = frame["url"].as_str()?;
            Some(Translated::Emit(SurfaceEvent::UrlChanged(url.to_owned())))
        }
        "Page.navigatedWithinDocument" => {
            if !is_main(event.params["frameId"].as_str()) {
                return None;
            }
            let url = event.params["url"].as_str()?;
            Some(Translated::Emit(SurfaceEvent::UrlChanged(url.to_owned())))
        }
        "Page.loadEventFired" => Some(Translated::Loaded),
        _ => None,
    }
}

/// History entry id `offset` steps from the current one, if there is one.
fn history_entry(history: &Value, offset: i64) -> Option<i64> {
    let current = history["currentIndex"].as_i64()?;
    let entries = history["entries"].as_array()?;
    let target = usize::try_from(current.checked_add(offset)?).ok()?;
    entries.get(target)?["id"].as_i64()
}

fn exception_message(details: &Value) -> String {
    details["exception"]["description"]
        .as_str()
        .or_else(|| details["text"].as_str())
        .unwrap_or("script threw")
        .to_owned()
}

/// A running Chromium driven over the DevTools protocol.
///
/// The protocol session is opened lazily against the active tab and dropped
/// whenever a call fails at the transport level, so a restarted browser or a
/// closed tab is picked up on the next operation.
pub struct CdpSurface {
    discovery: Discovery,
    config: CdpConfig,
    tabs: Vec<String>,
    active: usize,
    conn: Option<CdpConnection>,
    main_frame: Option<String>,
    url: Option<String>,
    events: Vec<SurfaceEvent>,
}

impl fmt::Debug for CdpSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdpSurface")
            .field("endpoint", &self.config.endpoint)
            .field("tabs", &self.tabs)
            .field("active", &self.active)
            .field("attached", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

impl CdpSurface {
    /// Attach to the browser at `config.endpoint`, opening the home page if
    /// it has no page targets.
    pub async fn connect(config: CdpConfig) -> Result<Self, SurfaceError> {
        let discovery = Discovery::new(&config.endpoint);
        let mut surface = Self {
            discovery,
            config,
            tabs: Vec::new(),
            active: 0,
            conn: None,
            main_frame: None,
            url: None,
            events: Vec::new(),
        };
        surface.refresh_tabs().await?;
        let _ = surface.session().await?;
        info!(
            endpoint = %surface.config.endpoint,
            tabs = surface.tabs.len(),
            "attached to browser"
        );
        surface.events.push(SurfaceEvent::TabChanged {
            index: surface.active,
            count: surface.tabs.len(),
        });
        Ok(surface)
    }

    /// Number of known tabs.
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Re-read page targets, keeping the active tab if it still exists.
    async fn refresh_tabs(&mut self) -> Result<(), SurfaceError> {
        let current = self.tabs.get(self.active).cloned();
        let mut pages = self.discovery.pages().await?;
        if pages.is_empty() {
            pages.push(self.discovery.open(&self.config.home_url).await?);
        }
        self.tabs = pages.into_iter().map(|t| t.id).collect();
        let kept = current.and_then(|id| self.tabs.iter().position(|t| *t == id));
        if kept.is_none() {
            self.detach();
        }
        self.active = kept.unwrap_or(0);
        Ok(())
    }

    fn detach(&mut self) {
        self.conn = None;
        self.main_frame = None;
    }

    async fn attach(&mut self) -> Result<CdpConnection, SurfaceError> {
        let id = self
            .tabs
            .get(self.active)
            .ok_or_else(|| SurfaceError::NoTarget("no open tabs".into()))?;
        let target = self.discovery.page(id).await?;
        let ws_url = target
            .web_socket_debugger_url
            .ok_or_else(|| SurfaceError::NoTarget(format!("page {id} is already attached elsewhere")))?;
        let mut conn = CdpConnection::connect(&ws_url).await?;
        let _ = conn.call("Page.enable", json!({})).await?;
        if let Some((width, height)) = self.config.viewport {
            let _ = conn
                .call(
                    "Emulation.setDeviceMetricsOverride",
                    json!({ "width": width, "height": height, "deviceScaleFactor": 1, "mobile": false }),
                )
                .await?;
        }
        let tree = conn.call("Page.getFrameTree", json!({})).await?;
        self.main_frame = tree["frameTree"]["frame"]["id"].as_str().map(str::to_owned);
        self.url = tree["frameTree"]["frame"]["url"].as_str().map(str::to_owned);
        debug!(target = %target.id, url = ?self.url, "attached to tab");
        Ok(conn)
    }

    async fn session(&mut self) -> Result<&mut CdpConnection, SurfaceError> {
        if self.conn.is_none() {
            let conn = self.attach().await?;
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| SurfaceError::NoTarget("no devtools session".into()))
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, SurfaceError> {
        let result = self.session().await?.call(method, params).await;
        if let Err(err) = &result {
            if err.is_transport() {
                warn!(method, %err, "devtools session lost, will reattach");
                self.detach();
            }
        }
        result
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Value, SurfaceError> {
        let mut result = self
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true, "awaitPromise": true }),
            )
            .await?;
        if let Some(details) = result.get("exceptionDetails") {
            return Err(SurfaceError::Protocol(exception_message(details)));
        }
        Ok(result["result"]["value"].take())
    }

    async fn go_history(&mut self, offset: i64) -> Result<(), SurfaceError> {
        let history = self.call("Page.getNavigationHistory", json!({})).await?;
        match history_entry(&history, offset) {
            Some(entry_id) => {
                let _ = self
                    .call("Page.navigateToHistoryEntry", json!({ "entryId": entry_id }))
                    .await?;
            }
            None => debug!(offset, "no history entry, ignoring"),
        }
        Ok(())
    }

    async fn activate(&mut self, index: usize) -> Result<(), SurfaceError> {
        let Some(id) = self.tabs.get(index).cloned() else {
            return Err(SurfaceError::NoTarget(format!("tab {index}")));
        };
        self.discovery.activate(&id).await?;
        if index != self.active {
            self.active = index;
            if let Some(conn) = self.conn.take() {
                conn.close().await;
            }
            self.detach();
        }
        let _ = self.session().await?;
        self.events.push(SurfaceEvent::TabChanged {
            index: self.active,
            count: self.tabs.len(),
        });
        if let Some(url) = self.url.clone() {
            self.events.push(SurfaceEvent::UrlChanged(url));
        }
        let title = self.evaluate(scripts::TITLE).await?;
        if let Some(title) = title.as_str() {
            self.events.push(SurfaceEvent::TitleChanged(title.to_owned()));
        }
        Ok(())
    }

    async fn load_finished(&mut self) -> SurfaceEvent {
        let title = match self.evaluate(scripts::TITLE).await {
            Ok(value) => value.as_str().unwrap_or_default().to_owned(),
            Err(err) => {
                debug!(%err, "could not read title");
                String::new()
            }
        };
        SurfaceEvent::LoadFinished {
            url: self.url.clone().unwrap_or_default(),
            title,
        }
    }
}

#[async_trait]
impl RenderSurface for CdpSurface {
    fn name(&self) -> &'static str {
        "cdp"
    }

    async fn capture_frame(&mut self) -> Result<Option<Capture>, SurfaceError> {
        let quality = self.config.jpeg_quality.clamp(1, 100);
        let result = self
            .call(
                "Page.captureScreenshot",
                json!({ "format": "jpeg", "quality": quality, "fromSurface": true }),
            )
            .await?;
        let encoded = result["data"].as_str().unwrap_or_default();
        if encoded.is_empty() {
            return Ok(None);
        }
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SurfaceError::Protocol(format!("screenshot payload: {e}")))?;
        Ok(Some(Capture::Encoded {
            data: Bytes::from(data),
            format: ImageFormat::Jpeg,
        }))
    }

    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        let result = self.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result["errorText"].as_str() {
            return Err(SurfaceError::Protocol(format!("navigation to {url} failed: {error}")));
        }
        Ok(())
    }

    async fn click(&mut self, x: u32, y: u32) -> Result<(), SurfaceError> {
        let hit = self.evaluate(&scripts::click(x, y)).await?;
        if hit != Value::Bool(true) {
            debug!(x, y, "click hit nothing");
        }
        Ok(())
    }

    async fn scroll(&mut self, delta_y: i64) -> Result<(), SurfaceError> {
        let _ = self.evaluate(&scripts::scroll(delta_y)).await?;
        Ok(())
    }

    async fn focused_element(&mut self) -> Result<Option<ElementRef>, SurfaceError> {
        let value = self.evaluate(&scripts::focused_element()).await?;
        if value.is_null() {
            return Ok(None);
        }
        let focused: FocusedElement = serde_json::from_value(value)
            .map_err(|e| SurfaceError::Protocol(format!("focused element: {e}")))?;
        Ok(Some(ElementRef {
            id: focused.id,
            tag: focused.tag,
            editable: focused.editable,
        }))
    }

    async fn key_input(
        &mut self,
        target: &ElementRef,
        key: &str,
        modifiers: Modifiers,
    ) -> Result<(), SurfaceError> {
        let delivered = self.evaluate(&scripts::key(&target.id, key, modifiers)).await?;
        if delivered == Value::Bool(false) {
            return Err(SurfaceError::NoTarget(format!("element {} is gone", target.id)));
        }
        Ok(())
    }

    async fn switch_tab(&mut self, direction: TabDirection) -> Result<(), SurfaceError> {
        self.refresh_tabs().await?;
        let index = direction.step(self.active, self.tabs.len());
        self.activate(index).await
    }

    async fn new_tab(&mut self) -> Result<(), SurfaceError> {
        let home = self.config.home_url.clone();
        let target = self.discovery.open(&home).await?;
        self.refresh_tabs().await?;
        let index = self
            .tabs
            .iter()
            .position(|id| *id == target.id)
            .ok_or_else(|| SurfaceError::NoTarget(format!("new page {} vanished", target.id)))?;
        self.activate(index).await
    }

    async fn back(&mut self) -> Result<(), SurfaceError> {
        self.go_history(-1).await
    }

    async fn forward(&mut self) -> Result<(), SurfaceError> {
        self.go_history(1).await
    }

    async fn reload(&mut self) -> Result<(), SurfaceError> {
        let _ = self.call("Page.reload", json!({})).await?;
        Ok(())
    }

    async fn home(&mut self) -> Result<(), SurfaceError> {
        let home = self.config.home_url.clone();
        self.navigate(&home).await
    }

    async fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        let raw = match self.conn.as_mut() {
            Some(conn) => {
                let pumped = conn.pump();
                let raw = conn.take_events();
                if let Err(err) = pumped {
                    warn!(%err, "devtools session lost while polling");
                    self.detach();
                }
                raw
            }
            None => Vec::new(),
        };
        for event in &raw {
            match translate(event, self.main_frame.as_deref()) {
                Some(Translated::Emit(surface_event)) => {
                    if let SurfaceEvent::UrlChanged(url) = &surface_event {
                        self.url = Some(url.clone());
                    }
                    self.events.push(surface_event);
                }
                Some(Translated::Loaded) => {
                    let finished = self.load_finished().await;
                    self.events.push(finished);
                }
                None => {}
            }
        }
        std::mem::take(&mut self.events)
    }

    async fn shutdown(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close().await;
        }
        self.detach();
        debug!("devtools session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str, params: Value) -> CdpEvent {
        CdpEvent {
            method: method.into(),
            params,
        }
    }

    #[test]
    fn main_frame_loading_is_reported() {
        let e = event("Page.frameStartedLoading", json!({ "frameId": "MAIN" }));
        assert_eq!(
            translate(&e, Some("MAIN")),
            Some(Translated::Emit(SurfaceEvent::LoadStarted))
        );
        let e = event("Page.frameStartedLoading", json!({ "frameId": "IFRAME" }));
        assert_eq!(translate(&e, Some("MAIN")), None);
    }

    #[test]
    fn only_top_level_navigation_changes_url() {
        let top = event(
            "Page.frameNavigated",
            json!({ "frame": { "id": "MAIN", "url": "https://a.test/" } }),
        );
        assert_eq!(
            translate(&top, Some("MAIN")),
            Some(Translated::Emit(SurfaceEvent::UrlChanged("https://a.test/".into())))
        );
        let child = event(
            "Page.frameNavigated",
            json!({ "frame": { "id": "X", "parentId": "MAIN", "url": "https://ads.test/" } }),
        );
        assert_eq!(translate(&child, Some("MAIN")), None);
    }

    #[test]
    fn same_document_navigation_changes_url() {
        let e = event(
            "Page.navigatedWithinDocument",
            json!({ "frameId": "MAIN", "url": "https://a.test/#b" }),
        );
        assert_eq!(
            translate(&e, Some("MAIN")),
            Some(Translated::Emit(SurfaceEvent::UrlChanged("https://a.test/#b".into())))
        );
    }

    #[test]
    fn load_event_requests_title() {
        let e = event("Page.loadEventFired", json!({ "timestamp": 10.0 }));
        assert_eq!(translate(&e, None), Some(Translated::Loaded));
        assert_eq!(translate(&event("Network.dataReceived", json!({})), None), None);
    }

    #[test]
    fn history_offsets() {
        let history = json!({
            "currentIndex": 1,
            "entries": [{ "id": 10 }, { "id": 11 }, { "id": 12 }]
        });
        assert_eq!(history_entry(&history, -1), Some(10));
        assert_eq!(history_entry(&history, 1), Some(12));
        assert_eq!(history_entry(&history, 2), None);
        assert_eq!(history_entry(&history, -2), None);

        let first = json!({ "currentIndex": 0, "entries": [{ "id": 1 }] });
        assert_eq!(history_entry(&first, -1), None);
        assert_eq!(history_entry(&json!({}), -1), None);
    }

    #[test]
    fn exception_text_prefers_description() {
        let details = json!({ "text": "Uncaught", "exception": { "description": "TypeError: x is null" } });
        assert_eq!(exception_message(&details), "TypeError: x is null");
        assert_eq!(exception_message(&json!({ "text": "Uncaught" })), "Uncaught");
        assert_eq!(exception_message(&json!({})), "script threw");
    }

    #[test]
    fn default_config_points_at_local_browser() {
        let config = CdpConfig::default();
        assert_eq!(config.endpoint, "http://127.0.0.1:9222");
        assert_eq!(config.home_url, DEFAULT_HOME_URL);
        assert!(config.viewport.is_none());
    }

    #[tokio::test]
    async fn connect_fails_without_browser() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = CdpSurface::connect(CdpConfig {
            endpoint: format!("http://{addr}"),
            ..CdpConfig::default()
        })
        .await
        .unwrap_err();
        assert!(err.is_transport());
    }
}

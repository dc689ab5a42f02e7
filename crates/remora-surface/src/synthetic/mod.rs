//! In-process render surface.
//!
//! [`SyntheticSurface`] keeps tabs with back/forward history, a scroll
//! offset and a small element tree per page, and renders its state into
//! frames. It runs without a browser, which makes it the surface of choice
//! for tests and demos.

pub mod dom;
pub mod render;

use async_trait::async_trait;
use remora_core::constants::DEFAULT_HOME_URL;
use remora_core::{Modifiers, TabDirection};
use tracing::debug;

use self::dom::{ClickEffect, Document, KeyEvent};
use crate::errors::SurfaceError;
use crate::surface::{Capture, ElementRef, RenderSurface, SurfaceEvent};

struct Tab {
    history: Vec<String>,
    cursor: usize,
    doc: Document,
    scroll: i64,
}

/// A browser stand-in that renders its own state.
pub struct SyntheticSurface {
    tabs: Vec<Tab>,
    active: usize,
    home_url: String,
    width: u32,
    height: u32,
    events: Vec<SurfaceEvent>,
}

impl SyntheticSurface {
    /// One tab on `home_url`, rendering `width` by `height` frames.
    pub fn new(home_url: impl Into<String>, width: u32, height: u32) -> Self {
        let home_url = home_url.into();
        let mut surface = Self {
            tabs: Vec::new(),
            active: 0,
            home_url,
            width: width.max(1),
            height: height.max(1),
            events: Vec::new(),
        };
        surface.open_tab();
        surface
    }

    /// URL of the active tab.
    pub fn current_url(&self) -> &str {
        &self.tab().doc.url
    }

    /// Number of open tabs.
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Index of the active tab.
    pub fn active_tab(&self) -> usize {
        self.active
    }

    /// Vertical scroll offset of the active tab.
    pub fn scroll_offset(&self) -> i64 {
        self.tab().scroll
    }

    /// Value of the search field on the active page.
    pub fn input_value(&self) -> &str {
        self.tab().doc.input_value()
    }

    /// Key events delivered to the active page.
    pub fn key_log(&self) -> &[KeyEvent] {
        &self.tab().doc.key_log
    }

    /// The active page's element tree.
    pub fn document(&self) -> &Document {
        &self.tab().doc
    }

    fn tab(&self) -> &Tab {
        &self.tabs[self.active]
    }

    fn tab_mut(&mut self) -> &mut Tab {
        &mut self.tabs[self.active]
    }

    fn open_tab(&mut self) {
        let doc = Document::load(&self.home_url, self.width, self.height);
        self.tabs.push(Tab {
            history: vec![self.home_url.clone()],
            cursor: 0,
            doc,
            scroll: 0,
        });
        self.active = self.tabs.len() - 1;
        self.announce_tab();
    }

    fn load(&mut self, url: &str) {
        let doc = Document::load(url, self.width, self.height);
        let title = doc.title.clone();
        let tab = self.tab_mut();
        tab.doc = doc;
        tab.scroll = 0;
        self.events.push(SurfaceEvent::LoadStarted);
        self.events.push(SurfaceEvent::LoadFinished {
            url: url.to_owned(),
            title,
        });
        debug!(url, "synthetic page loaded");
    }

    fn visit(&mut self, url: &str) {
        let tab = self.tab_mut();
        tab.history.truncate(tab.cursor + 1);
        tab.history.push(url.to_owned());
        tab.cursor = tab.history.len() - 1;
        self.load(url);
    }

    fn announce_tab(&mut self) {
        self.events.push(SurfaceEvent::TabChanged {
            index: self.active,
            count: self.tabs.len(),
        });
        let doc = &self.tabs[self.active].doc;
        self.events.push(SurfaceEvent::UrlChanged(doc.url.clone()));
        self.events.push(SurfaceEvent::TitleChanged(doc.title.clone()));
    }

    fn element_ref(&self, id: usize) -> Option<ElementRef> {
        let node = self.tab().doc.nodes.get(id)?;
        Some(ElementRef {
            id: format!("node-{id}"),
            tag: node.tag().to_owned(),
            editable: node.editable(),
        })
    }

    fn resolve(&self, target: &ElementRef) -> Result<usize, SurfaceError> {
        target
            .id
            .strip_prefix("node-")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|id| *id < self.tab().doc.nodes.len())
            .ok_or_else(|| SurfaceError::NoTarget(format!("unknown element {}", target.id)))
    }
}

impl Default for SyntheticSurface {
    fn default() -> Self {
        Self::new(DEFAULT_HOME_URL, 1024, 768)
    }
}

#[async_trait]
impl RenderSurface for SyntheticSurface {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn capture_frame(&mut self) -> Result<Option<Capture>, SurfaceError> {
        let tab = self.tab();
        Ok(Some(Capture::Raw(render::render(
            &tab.doc,
            tab.scroll,
            self.active,
            self.tabs.len(),
            self.width,
            self.height,
        ))))
    }

    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.visit(url);
        Ok(())
    }

    async fn click(&mut self, x: u32, y: u32) -> Result<(), SurfaceError> {
        let doc_y = i64::from(y) + self.tab().scroll;
        let effect = self.tab_mut().doc.click(i64::from(x), doc_y);
        debug!(x, y, ?effect, "synthetic click");
        match effect {
            ClickEffect::Submit(url) | ClickEffect::Follow(url) => self.visit(&url),
            ClickEffect::Focused(_) | ClickEffect::Nothing => {}
        }
        Ok(())
    }

    async fn scroll(&mut self, delta_y: i64) -> Result<(), SurfaceError> {
        let max = (self.tab().doc.height - i64::from(self.height)).max(0);
        let tab = self.tab_mut();
        tab.scroll = (tab.scroll + delta_y).clamp(0, max);
        Ok(())
    }

    async fn focused_element(&mut self) -> Result<Option<ElementRef>, SurfaceError> {
        Ok(self.tab().doc.focused.and_then(|id| self.element_ref(id)))
    }

    async fn key_input(
        &mut self,
        target: &ElementRef,
        key: &str,
        modifiers: Modifiers,
    ) -> Result<(), SurfaceError> {
        let id = self.resolve(target)?;
        if let Some(url) = self.tab_mut().doc.key(id, key, modifiers) {
            self.visit(&url);
        }
        Ok(())
    }

    async fn switch_tab(&mut self, direction: TabDirection) -> Result<(), SurfaceError> {
        self.active = direction.step(self.active, self.tabs.len());
        self.announce_tab();
        Ok(())
    }

    async fn new_tab(&mut self) -> Result<(), SurfaceError> {
        self.open_tab();
        Ok(())
    }

    async fn back(&mut self) -> Result<(), SurfaceError> {
        let tab = self.tab_mut();
        if tab.cursor == 0 {
            return Ok(());
        }
        tab.cursor -= 1;
        let url = tab.history[tab.cursor].clone();
        self.load(&url);
        Ok(())
    }

    async fn forward(&mut self) -> Result<(), SurfaceError> {
        let tab = self.tab_mut();
        if tab.cursor + 1 >= tab.history.len() {
            return Ok(());
        }
        tab.cursor += 1;
        let url = tab.history[tab.cursor].clone();
        self.load(&url);
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), SurfaceError> {
        let url = self.tab().doc.url.clone();
        self.load(&url);
        Ok(())
    }

    async fn home(&mut self) -> Result<(), SurfaceError> {
        let url = self.home_url.clone();
        self.visit(&url);
        Ok(())
    }

    async fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}

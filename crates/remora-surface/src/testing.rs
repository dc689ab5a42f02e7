//! A recording surface for tests.
//!
//! [`RecordingSurface`] applies nothing; it records every call into a
//! [`SurfaceLog`] that stays readable after the surface has been moved into
//! a [`SurfaceHost`](crate::SurfaceHost).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use remora_core::{Modifiers, TabDirection};
use tokio::sync::Notify;

use crate::errors::SurfaceError;
use crate::surface::{Capture, ElementRef, RenderSurface, SurfaceEvent};

/// One recorded surface call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceCall {
    /// `navigate(url)`.
    Navigate(String),
    /// `click(x, y)`.
    Click(u32, u32),
    /// `scroll(delta_y)`.
    Scroll(i64),
    /// `key_input(target, key, modifiers)`.
    Key {
        /// Target element id.
        target: String,
        /// Key value.
        key: String,
        /// Modifiers as delivered.
        modifiers: Modifiers,
    },
    /// `switch_tab(direction)`.
    SwitchTab(TabDirection),
    /// `new_tab()`.
    NewTab,
    /// `back()`.
    Back,
    /// `forward()`.
    Forward,
    /// `reload()`.
    Reload,
    /// `home()`.
    Home,
}

#[derive(Default)]
struct LogInner {
    calls: Vec<SurfaceCall>,
    captures: usize,
}

/// Shared record of the calls made to a [`RecordingSurface`].
#[derive(Clone, Default)]
pub struct SurfaceLog {
    inner: Arc<Mutex<LogInner>>,
    changed: Arc<Notify>,
}

impl SurfaceLog {
    /// Every applied call, in order.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of `capture_frame` calls.
    pub fn capture_calls(&self) -> usize {
        self.inner.lock().captures
    }

    /// Wait until at least `n` calls were recorded, then return them all.
    ///
    /// Returns whatever was recorded when `timeout` elapses.
    pub async fn wait_for_calls(&self, n: usize, timeout: Duration) -> Vec<SurfaceCall> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            let calls = self.calls();
            if calls.len() >= n {
                return calls;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.calls();
            }
        }
    }

    fn record(&self, call: SurfaceCall) {
        self.inner.lock().calls.push(call);
        self.changed.notify_waiters();
    }

    fn count_capture(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.captures += 1;
        inner.captures
    }
}

/// Fake surface that records calls and captures small solid frames.
pub struct RecordingSurface {
    log: SurfaceLog,
    focus: Option<ElementRef>,
    fail: HashSet<&'static str>,
    fail_next_capture: bool,
    empty_captures: bool,
    events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    /// A surface whose focused element is an editable `input-1`.
    pub fn new() -> Self {
        Self {
            log: SurfaceLog::default(),
            focus: Some(ElementRef {
                id: "input-1".into(),
                tag: "input".into(),
                editable: true,
            }),
            fail: HashSet::new(),
            fail_next_capture: false,
            empty_captures: false,
            events: Vec::new(),
        }
    }

    /// Handle to the call log.
    pub fn log(&self) -> SurfaceLog {
        self.log.clone()
    }

    /// Replace the focused element.
    pub fn set_focus(&mut self, focus: Option<ElementRef>) {
        self.focus = focus;
    }

    /// Make every call of this kind (`Command::kind` label) fail.
    pub fn fail_on(&mut self, kind: &'static str) {
        let _ = self.fail.insert(kind);
    }

    /// Make the next capture return an error.
    pub fn fail_next_capture(&mut self) {
        self.fail_next_capture = true;
    }

    /// Make captures return `None`.
    pub fn set_empty_captures(&mut self, empty: bool) {
        self.empty_captures = empty;
    }

    fn run(&self, kind: &'static str, call: SurfaceCall) -> Result<(), SurfaceError> {
        if self.fail.contains(kind) {
            return Err(SurfaceError::Protocol(format!("{kind} rejected")));
        }
        self.log.record(call);
        Ok(())
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderSurface for RecordingSurface {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn capture_frame(&mut self) -> Result<Option<Capture>, SurfaceError> {
        let n = self.log.count_capture();
        if std::mem::take(&mut self.fail_next_capture) {
            return Err(SurfaceError::Protocol("capture rejected".into()));
        }
        if self.empty_captures {
            return Ok(None);
        }
        #[allow(clippy::cast_possible_truncation)]
        let shade = (n % 256) as u8;
        Ok(Some(Capture::Raw(RgbaImage::from_pixel(
            16,
            12,
            Rgba([shade, 128, 255 - shade, 255]),
        ))))
    }

    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        self.run("navigate", SurfaceCall::Navigate(url.to_owned()))?;
        self.events.push(SurfaceEvent::LoadStarted);
        self.events.push(SurfaceEvent::LoadFinished {
            url: url.to_owned(),
            title: url.to_owned(),
        });
        Ok(())
    }

    async fn click(&mut self, x: u32, y: u32) -> Result<(), SurfaceError> {
        self.run("click", SurfaceCall::Click(x, y))
    }

    async fn scroll(&mut self, delta_y: i64) -> Result<(), SurfaceError> {
        self.run("scroll", SurfaceCall::Scroll(delta_y))
    }

    async fn focused_element(&mut self) -> Result<Option<ElementRef>, SurfaceError> {
        Ok(self.focus.clone())
    }

    async fn key_input(
        &mut self,
        target: &ElementRef,
        key: &str,
        modifiers: Modifiers,
    ) -> Result<(), SurfaceError> {
        self.run(
            "key_input",
            SurfaceCall::Key {
                target: target.id.clone(),
                key: key.to_owned(),
                modifiers,
            },
        )
    }

    async fn switch_tab(&mut self, direction: TabDirection) -> Result<(), SurfaceError> {
        self.run("switch_tab", SurfaceCall::SwitchTab(direction))
    }

    async fn new_tab(&mut self) -> Result<(), SurfaceError> {
        self.run("new_tab", SurfaceCall::NewTab)
    }

    async fn back(&mut self) -> Result<(), SurfaceError> {
        self.run("back", SurfaceCall::Back)
    }

    async fn forward(&mut self) -> Result<(), SurfaceError> {
        self.run("forward", SurfaceCall::Forward)
    }

    async fn reload(&mut self) -> Result<(), SurfaceError> {
        self.run("reload", SurfaceCall::Reload)
    }

    async fn home(&mut self) -> Result<(), SurfaceError> {
        self.run("home", SurfaceCall::Home)
    }

    async fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }
}

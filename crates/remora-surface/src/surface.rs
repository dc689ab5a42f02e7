//! The render surface capability.

use async_trait::async_trait;
use bytes::Bytes;
use image::RgbaImage;
use remora_core::{ImageFormat, Modifiers, TabDirection};

use crate::errors::SurfaceError;

/// Output of one capture call.
#[derive(Clone, Debug)]
pub enum Capture {
    /// Unencoded pixels; the capture loop encodes them.
    Raw(RgbaImage),
    /// Bytes the engine already encoded; passed through untouched.
    Encoded {
        /// Encoded image.
        data: Bytes,
        /// Encoding of `data`.
        format: ImageFormat,
    },
}

/// Handle to a page element, as returned by
/// [`RenderSurface::focused_element`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementRef {
    /// Surface-specific identifier.
    pub id: String,
    /// Lowercase tag name.
    pub tag: String,
    /// Whether the element holds an editable value.
    pub editable: bool,
}

/// Asynchronous notification from the engine (load progress, title, tabs).
///
/// Surfaces buffer these and hand them over through
/// [`RenderSurface::poll_events`], so they are consumed on the same
/// serialized context that drives the surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A navigation started in the active tab.
    LoadStarted,
    /// The active tab finished loading.
    LoadFinished {
        /// Final URL.
        url: String,
        /// Document title.
        title: String,
    },
    /// The active tab's URL changed.
    UrlChanged(String),
    /// The active tab's title changed.
    TitleChanged(String),
    /// The active tab or the number of tabs changed.
    TabChanged {
        /// Index of the active tab.
        index: usize,
        /// Number of open tabs.
        count: usize,
    },
}

/// A browser engine driven from one serialized context.
///
/// Every method takes `&mut self`: whoever owns the surface is the only one
/// who can touch it, which is exactly the single-context rule the engine
/// needs.
#[async_trait]
pub trait RenderSurface: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Snapshot the active tab. `Ok(None)` means there is nothing to show yet.
    async fn capture_frame(&mut self) -> Result<Option<Capture>, SurfaceError>;

    /// Load an absolute URL in the active tab.
    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError>;

    /// Pointer-down/up/click at viewport coordinates, delivered to the
    /// nearest ancestor of the hit element that accepts clicks.
    async fn click(&mut self, x: u32, y: u32) -> Result<(), SurfaceError>;

    /// Scroll the active tab vertically by a signed delta.
    async fn scroll(&mut self, delta_y: i64) -> Result<(), SurfaceError>;

    /// The element that currently has keyboard focus, if any.
    async fn focused_element(&mut self) -> Result<Option<ElementRef>, SurfaceError>;

    /// Deliver one key press to `target`.
    ///
    /// `Enter` submits the enclosing form and `Backspace` truncates the
    /// field's value; printable characters are appended.
    async fn key_input(
        &mut self,
        target: &ElementRef,
        key: &str,
        modifiers: Modifiers,
    ) -> Result<(), SurfaceError>;

    /// Activate the neighbouring tab.
    async fn switch_tab(&mut self, direction: TabDirection) -> Result<(), SurfaceError>;

    /// Open a tab on the home page and activate it.
    async fn new_tab(&mut self) -> Result<(), SurfaceError>;

    /// History back in the active tab.
    async fn back(&mut self) -> Result<(), SurfaceError>;

    /// History forward in the active tab.
    async fn forward(&mut self) -> Result<(), SurfaceError>;

    /// Reload the active tab.
    async fn reload(&mut self) -> Result<(), SurfaceError>;

    /// Load the home page in the active tab.
    async fn home(&mut self) -> Result<(), SurfaceError>;

    /// Drain engine notifications that arrived since the last call.
    async fn poll_events(&mut self) -> Vec<SurfaceEvent>;

    /// Release engine resources. Called once when the host stops.
    async fn shutdown(&mut self) {}
}

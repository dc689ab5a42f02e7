//! On-demand screenshots kept in the asset directory, and the generated
//! `gallery.html` that lists them next to a link to the live view.
//!
//! Screenshot files are named `screenshot_<host>_<YYYYmmdd>_<HHMMSS>_<ms>.<ext>`
//! after the page and capture time of the frame they hold, so the gallery can
//! be rebuilt from a directory listing alone.

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use remora_core::constants::LIVE_VIEW_FILE;
use remora_core::metrics::SCREENSHOTS_SAVED_TOTAL;
use remora_core::{Frame, ImageFormat};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::ApiError;
use crate::server::AppState;

/// Name of the generated listing page inside the asset directory.
pub const GALLERY_FILE: &str = "gallery.html";

const PREFIX: &str = "screenshot_";

/// Slug used when the page has no host (blank tab, `about:` pages, no URL).
const NO_HOST: &str = "homepage";

/// File name for a screenshot of `url` captured at `captured_at`.
pub fn screenshot_name(url: Option<&str>, captured_at: DateTime<Utc>, format: ImageFormat) -> String {
    format!(
        "{PREFIX}{}_{}_{:03}.{}",
        host_slug(url),
        captured_at.format("%Y%m%d_%H%M%S"),
        captured_at.timestamp_subsec_millis(),
        format.extension()
    )
}

fn host_slug(url: Option<&str>) -> String {
    let host = url
        .and_then(|u| u.split_once("://"))
        .map_or("", |(_, rest)| {
            let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
            let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
            host.split(':').next().unwrap_or_default()
        });
    let slug: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if slug.is_empty() { NO_HOST.to_owned() } else { slug }
}

/// One listed screenshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// File name inside the asset directory.
    pub file: String,
    /// Capture time recovered from the file name.
    pub captured: NaiveDateTime,
}

impl Entry {
    /// Parse a directory entry; `None` for anything that is not a screenshot.
    pub fn parse(file: &str) -> Option<Self> {
        let stem = file.strip_prefix(PREFIX)?;
        let (stem, ext) = stem.rsplit_once('.')?;
        if ext != ImageFormat::Jpeg.extension() && ext != ImageFormat::Png.extension() {
            return None;
        }
        let mut fields = stem.rsplitn(4, '_');
        let millis: u32 = fields.next()?.parse().ok()?;
        let time = fields.next()?;
        let date = fields.next()?;
        fields.next()?;
        let captured = NaiveDateTime::parse_from_str(&format!("{date}_{time}"), "%Y%m%d_%H%M%S")
            .ok()?
            .checked_add_signed(chrono::Duration::milliseconds(i64::from(millis)))?;
        Some(Self {
            file: file.to_owned(),
            captured,
        })
    }
}

/// Screenshot store rooted at the asset directory.
#[derive(Clone, Debug)]
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    /// Store in `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Path of the generated listing page.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(GALLERY_FILE)
    }

    /// Persist `frame` under a timestamped name and regenerate the listing.
    ///
    /// Returns the new file name.
    pub async fn save(&self, frame: &Frame, url: Option<&str>) -> io::Result<String> {
        let name = screenshot_name(url, frame.captured_at, frame.format);
        self.write_atomic(&name, &frame.data).await?;
        let listed = self.rebuild().await?;
        debug!(file = %name, listed, "gallery rebuilt");
        Ok(name)
    }

    /// Screenshots currently in the directory, newest first.
    pub async fn entries(&self) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(entries),
            Err(error) => return Err(error),
        };
        while let Some(item) = dir.next_entry().await? {
            if let Some(entry) = item.file_name().to_str().and_then(Entry::parse) {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| b.captured.cmp(&a.captured).then_with(|| b.file.cmp(&a.file)));
        Ok(entries)
    }

    /// Rewrite `gallery.html` from the directory listing. Returns how many
    /// screenshots it lists.
    pub async fn rebuild(&self) -> io::Result<usize> {
        let entries = self.entries().await?;
        self.write_atomic(GALLERY_FILE, render(&entries).as_bytes())
            .await?;
        Ok(entries.len())
    }

    async fn write_atomic(&self, name: &str, data: &[u8]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{name}.{}.tmp", uuid::Uuid::now_v7()));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, self.dir.join(name)).await
    }
}

/// The listing page for `entries`.
pub fn render(entries: &[Entry]) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Screenshots</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; margin: 20px; }}\n\
         .live {{ display: block; margin: 20px 0; padding: 10px; background: #4caf50; color: #fff; text-align: center; text-decoration: none; border-radius: 5px; }}\n\
         .shot {{ margin-bottom: 30px; padding: 10px; border: 1px solid #ddd; border-radius: 5px; }}\n\
         .shot img {{ max-width: 100%; }}\n\
         .when {{ color: #666; font-size: 0.8em; margin-bottom: 5px; }}\n\
         </style>\n</head>\n<body>\n<h1>Screenshots</h1>\n\
         <a class=\"live\" href=\"/\">Live view</a>\n\
         <p><a href=\"/{LIVE_VIEW_FILE}\">Latest frame</a></p>\n"
    );
    if entries.is_empty() {
        html.push_str("<p>No screenshots yet.</p>\n");
    }
    for entry in entries {
        let file = escape(&entry.file);
        html.push_str(&format!(
            "<div class=\"shot\">\n<div class=\"when\">Captured: {}</div>\n\
             <a href=\"/{file}\"><img src=\"/{file}\" alt=\"{file}\"></a>\n</div>\n",
            entry.captured.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Body of a successful `GET /screenshot`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResponse {
    /// Path of the saved image.
    pub file: String,
    /// Sequence number of the frame that was saved.
    pub frame_seq: u64,
    /// Path of the listing page.
    pub gallery: String,
}

/// GET /screenshot
pub async fn screenshot_handler(
    State(state): State<AppState>,
) -> Result<Json<ScreenshotResponse>, ApiError> {
    let frame = state
        .frames
        .latest()
        .ok_or(ApiError::NotFound("no frame captured yet"))?;
    let url = state.status.borrow().url.clone();
    let gallery = Gallery::new(&state.config.asset_dir);
    let file = gallery
        .save(&frame, url.as_deref())
        .await
        .map_err(|error| {
            warn!(dir = %state.config.asset_dir.display(), %error, "screenshot save failed");
            ApiError::Storage(error.to_string())
        })?;
    counter!(SCREENSHOTS_SAVED_TOTAL).increment(1);
    info!(file = %file, seq = frame.seq, "screenshot saved");
    Ok(Json(ScreenshotResponse {
        file: format!("/{file}"),
        frame_seq: frame.seq,
        gallery: format!("/{GALLERY_FILE}"),
    }))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::TimeZone;
    use remora_core::FrameBuffer;

    use super::*;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, s).unwrap() + chrono::Duration::milliseconds(i64::from(ms))
    }

    fn frame(data: &'static [u8], captured_at: DateTime<Utc>) -> Frame {
        Frame {
            seq: 1,
            data: Bytes::from_static(data),
            format: ImageFormat::Jpeg,
            captured_at,
        }
    }

    #[test]
    fn name_uses_host_and_capture_time() {
        let name = screenshot_name(
            Some("https://news.example.com:8443/a/b?q=1"),
            at(9, 5, 7, 42),
            ImageFormat::Jpeg,
        );
        assert_eq!(name, "screenshot_news_example_com_20261019_090507_042.jpg");
    }

    #[test]
    fn hostless_pages_are_homepage() {
        for url in [None, Some("about:blank"), Some("file:///tmp/x.html")] {
            let name = screenshot_name(url, at(0, 0, 0, 0), ImageFormat::Png);
            assert_eq!(name, "screenshot_homepage_20261019_000000_000.png", "{url:?}");
        }
    }

    #[test]
    fn userinfo_is_not_part_of_the_host() {
        let name = screenshot_name(Some("http://me:pw@b.test/"), at(1, 2, 3, 4), ImageFormat::Jpeg);
        assert!(name.starts_with("screenshot_b_test_"), "{name}");
    }

    #[test]
    fn entry_parse_round_trips_names() {
        let name = screenshot_name(Some("https://a.test/"), at(12, 30, 0, 250), ImageFormat::Jpeg);
        let entry = Entry::parse(&name).unwrap();
        assert_eq!(entry.captured, at(12, 30, 0, 250).naive_utc());
        assert!(Entry::parse("live_view.jpg").is_none());
        assert!(Entry::parse("screenshot_a_test_20261019_123000_250.gif").is_none());
        assert!(Entry::parse("screenshot_notes.jpg").is_none());
    }

    #[test]
    fn render_escapes_and_links_live_view() {
        let entry = Entry {
            file: "screenshot_<x>_20261019_000000_000.jpg".into(),
            captured: at(0, 0, 0, 0).naive_utc(),
        };
        let html = render(&[entry]);
        assert!(html.contains("href=\"/\""));
        assert!(html.contains(LIVE_VIEW_FILE));
        assert!(html.contains("screenshot_&lt;x&gt;_"));
        assert!(!html.contains("<x>"));
        assert!(html.contains("Captured: 2026-10-19 00:00:00"));
        assert!(render(&[]).contains("No screenshots yet"));
    }

    #[tokio::test]
    async fn save_writes_image_and_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(&dir.path().join("assets"));

        let older = gallery
            .save(&frame(b"one", at(8, 0, 0, 0)), Some("https://z.test/"))
            .await
            .unwrap();
        let newer = gallery
            .save(&frame(b"two", at(9, 0, 0, 0)), Some("https://a.test/"))
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("assets").join(&older)).unwrap(), b"one");
        let listed: Vec<String> = gallery.entries().await.unwrap().into_iter().map(|e| e.file).collect();
        assert_eq!(listed, vec![newer.clone(), older.clone()]);

        let html = std::fs::read_to_string(gallery.index_path()).unwrap();
        let newer_at = html.find(&newer).unwrap();
        let older_at = html.find(&older).unwrap();
        assert!(newer_at < older_at);

        let leftovers = std::fs::read_dir(dir.path().join("assets"))
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn rebuild_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LIVE_VIEW_FILE), b"live").unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html>").unwrap();
        let gallery = Gallery::new(dir.path());
        assert_eq!(gallery.rebuild().await.unwrap(), 0);

        let frames = FrameBuffer::new();
        let _ = frames.publish(Bytes::from_static(b"img"), ImageFormat::Png);
        let _ = gallery.save(&frames.latest().unwrap(), None).await.unwrap();
        assert_eq!(gallery.rebuild().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(&dir.path().join("absent"));
        assert!(gallery.entries().await.unwrap().is_empty());
    }
}

//! Rasterizes a [`Document`] so every state change is visible in the stream.

use image::{Rgba, RgbaImage};

use super::dom::{Document, Rect, Role};

const TAB_STRIP: i64 = 24;

/// Render the visible part of `doc` into a `width` by `height` frame.
///
/// The background hue is derived from the URL, the tab strip shows which
/// tab is active, and a text field grows one cell per character typed.
pub fn render(
    doc: &Document,
    scroll: i64,
    tab_index: usize,
    tab_count: usize,
    width: u32,
    height: u32,
) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, background(&doc.url));
    let w = i64::from(width);

    // tab strip
    let count = i64::try_from(tab_count.max(1)).unwrap_or(1);
    let tab_w = (w / count).max(1);
    for i in 0..tab_count {
        let idx = i64::try_from(i).unwrap_or(0);
        let colour = if i == tab_index {
            Rgba([250, 250, 250, 255])
        } else {
            Rgba([150, 150, 160, 255])
        };
        fill(&mut img, Rect { x: idx * tab_w + 1, y: 0, w: tab_w - 2, h: TAB_STRIP - 2 }, colour);
    }

    for (id, node) in doc.nodes.iter().enumerate().skip(1) {
        let rect = Rect {
            y: node.rect.y - scroll + TAB_STRIP,
            ..node.rect
        };
        let colour = match node.role {
            Role::Container => continue,
            Role::Form => Rgba([235, 235, 240, 255]),
            Role::TextInput => Rgba([255, 255, 255, 255]),
            Role::Button => Rgba([66, 133, 244, 255]),
            Role::Glyph => Rgba([255, 255, 255, 255]),
            Role::Link(_) => Rgba([26, 13, 171, 255]),
        };
        fill(&mut img, rect, colour);
        if doc.focused == Some(id) {
            outline(&mut img, rect, Rgba([255, 140, 0, 255]));
        }
        if node.role == Role::TextInput {
            let chars = i64::try_from(node.value.chars().count()).unwrap_or(i64::MAX);
            let cells = chars.min((rect.w - 8) / 8);
            for c in 0..cells {
                fill(
                    &mut img,
                    Rect { x: rect.x + 4 + c * 8, y: rect.y + 10, w: 6, h: rect.h - 20 },
                    Rgba([32, 32, 32, 255]),
                );
            }
        }
    }

    // scroll position indicator on the right edge
    let h = i64::from(height);
    if doc.height > h {
        let thumb_h = (h * h / doc.height).max(8);
        let thumb_y = scroll * (h - thumb_h) / (doc.height - h).max(1);
        fill(&mut img, Rect { x: w - 6, y: thumb_y, w: 5, h: thumb_h }, Rgba([90, 90, 90, 255]));
    }
    img
}

fn background(url: &str) -> Rgba<u8> {
    // FNV-1a over the URL, folded into a pastel colour
    let hash = url
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
    let [r, g, b, ..] = hash.to_le_bytes();
    Rgba([160 + r / 3, 160 + g / 3, 160 + b / 3, 255])
}

fn fill(img: &mut RgbaImage, rect: Rect, colour: Rgba<u8>) {
    let (iw, ih) = (i64::from(img.width()), i64::from(img.height()));
    let x0 = rect.x.clamp(0, iw);
    let x1 = (rect.x + rect.w).clamp(0, iw);
    let y0 = rect.y.clamp(0, ih);
    let y1 = (rect.y + rect.h).clamp(0, ih);
    for y in y0..y1 {
        for x in x0..x1 {
            if let (Ok(px), Ok(py)) = (u32::try_from(x), u32::try_from(y)) {
                img.put_pixel(px, py, colour);
            }
        }
    }
}

fn outline(img: &mut RgbaImage, rect: Rect, colour: Rgba<u8>) {
    let Rect { x, y, w, h } = rect;
    fill(img, Rect { x, y, w, h: 2 }, colour);
    fill(img, Rect { x, y: y + h - 2, w, h: 2 }, colour);
    fill(img, Rect { x, y, w: 2, h }, colour);
    fill(img, Rect { x: x + w - 2, y, w: 2, h }, colour);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_requested_size() {
        let doc = Document::load("http://a", 320, 240);
        let img = render(&doc, 0, 0, 1, 320, 240);
        assert_eq!(img.dimensions(), (320, 240));
    }

    #[test]
    fn different_urls_render_differently() {
        let a = render(&Document::load("http://a", 320, 240), 0, 0, 1, 320, 240);
        let b = render(&Document::load("http://b", 320, 240), 0, 0, 1, 320, 240);
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn typing_changes_frame() {
        let mut doc = Document::load("http://a", 320, 240);
        let before = render(&doc, 0, 0, 1, 320, 240);
        doc.nodes[super::super::dom::INPUT].value.push('x');
        let after = render(&doc, 0, 0, 1, 320, 240);
        assert_ne!(before.as_raw(), after.as_raw());
    }

    #[test]
    fn scrolling_changes_frame() {
        let doc = Document::load("http://a", 320, 240);
        let top = render(&doc, 0, 0, 1, 320, 240);
        let down = render(&doc, 100, 0, 1, 320, 240);
        assert_ne!(top.as_raw(), down.as_raw());
    }

    #[test]
    fn offscreen_rects_are_clipped() {
        let mut img = RgbaImage::new(10, 10);
        fill(&mut img, Rect { x: -5, y: -5, w: 100, h: 8 }, Rgba([1, 2, 3, 255]));
        assert_eq!(img.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
        assert_eq!(img.get_pixel(9, 2), &Rgba([1, 2, 3, 255]));
        assert_eq!(img.get_pixel(0, 3), &Rgba([0, 0, 0, 0]));
        assert_eq!(img.get_pixel(0, 5), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn rect_entirely_above_view_paints_nothing() {
        let mut img = RgbaImage::new(10, 10);
        fill(&mut img, Rect { x: 0, y: -5, w: 10, h: 3 }, Rgba([1, 2, 3, 255]));
        assert!(img.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }
}

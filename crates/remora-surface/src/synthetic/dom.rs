//! A tiny element tree with hit testing and form editing.

use remora_core::{Modifiers, is_modifier_key};

/// Axis-aligned rectangle in document coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width.
    pub w: i64,
    /// Height.
    pub h: i64,
}

impl Rect {
    const fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the point lies inside.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && x < self.x + self.w && y >= self.y && y < self.y + self.h
    }
}

/// What an element is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// Non-interactive block.
    Container,
    /// A form; submitting it navigates.
    Form,
    /// Editable single-line field.
    TextInput,
    /// Submit button.
    Button,
    /// Decorative child (an icon inside a button).
    Glyph,
    /// Hyperlink.
    Link(String),
}

impl Role {
    fn tag(&self) -> &'static str {
        match self {
            Self::Container => "div",
            Self::Form => "form",
            Self::TextInput => "input",
            Self::Button => "button",
            Self::Glyph => "span",
            Self::Link(_) => "a",
        }
    }

    fn accepts_click(&self) -> bool {
        matches!(self, Self::TextInput | Self::Button | Self::Link(_))
    }
}

/// One element.
#[derive(Clone, Debug)]
pub struct Node {
    /// Parent index, `None` for the root.
    pub parent: Option<usize>,
    /// Element kind.
    pub role: Role,
    /// Layout box.
    pub rect: Rect,
    /// Current value (text inputs only).
    pub value: String,
}

impl Node {
    /// Lowercase tag name.
    pub fn tag(&self) -> &'static str {
        self.role.tag()
    }

    /// Whether the element holds an editable value.
    pub fn editable(&self) -> bool {
        self.role == Role::TextInput
    }
}

/// A synthesized key event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    /// `keydown` with the key value.
    Down(String),
    /// `keyup` with the key value.
    Up(String),
}

/// What a click did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickEffect {
    /// Focus moved to this element.
    Focused(usize),
    /// A form was submitted; navigate to the URL.
    Submit(String),
    /// A link was followed; navigate to the URL.
    Follow(String),
    /// The click landed on nothing interactive.
    Nothing,
}

/// One loaded page.
#[derive(Clone, Debug)]
pub struct Document {
    /// Page URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Elements, parents before children.
    pub nodes: Vec<Node>,
    /// Focused element index.
    pub focused: Option<usize>,
    /// Key events delivered so far.
    pub key_log: Vec<KeyEvent>,
    /// Scrollable document height.
    pub height: i64,
}

/// Index of the search field in every synthesized document.
pub const INPUT: usize = 2;
/// Index of the submit button.
pub const BUTTON: usize = 3;
/// Index of the glyph nested in the submit button.
pub const GLYPH: usize = 4;
/// Index of the link.
pub const LINK: usize = 5;

impl Document {
    /// Lay out the standard page for `url` in a `width` by `height` viewport.
    pub fn load(url: &str, width: u32, height: u32) -> Self {
        let w = i64::from(width.max(240));
        let h = i64::from(height.max(160));
        let base = url.trim_end_matches('/');
        let node = |parent, role, rect| Node {
            parent,
            role,
            rect,
            value: String::new(),
        };
        let nodes = vec![
            node(None, Role::Container, Rect::new(0, 0, w, h * 3)),
            node(Some(0), Role::Form, Rect::new(20, 60, w - 40, 80)),
            node(Some(1), Role::TextInput, Rect::new(30, 80, w - 150, 40)),
            node(Some(1), Role::Button, Rect::new(w - 110, 80, 80, 40)),
            node(Some(3), Role::Glyph, Rect::new(w - 90, 90, 40, 20)),
            node(
                Some(0),
                Role::Link(format!("{base}/next")),
                Rect::new(30, 170, 160, 28),
            ),
        ];
        Self {
            url: url.to_owned(),
            title: title_for(url),
            nodes,
            focused: None,
            key_log: Vec::new(),
            height: h * 3,
        }
    }

    /// Deepest element containing the point.
    pub fn hit_test(&self, x: i64, y: i64) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, n)| n.rect.contains(x, y))
            .map(|(i, _)| i)
    }

    /// Nearest element at or above `id` that accepts clicks.
    pub fn click_target(&self, mut id: usize) -> Option<usize> {
        loop {
            let node = self.nodes.get(id)?;
            if node.role.accepts_click() {
                return Some(id);
            }
            id = node.parent?;
        }
    }

    /// Nearest form at or above `id`.
    pub fn enclosing_form(&self, mut id: usize) -> Option<usize> {
        loop {
            let node = self.nodes.get(id)?;
            if node.role == Role::Form {
                return Some(id);
            }
            id = node.parent?;
        }
    }

    /// Click at document coordinates.
    pub fn click(&mut self, x: i64, y: i64) -> ClickEffect {
        let Some(target) = self.hit_test(x, y).and_then(|hit| self.click_target(hit)) else {
            self.focused = None;
            return ClickEffect::Nothing;
        };
        match self.nodes[target].role.clone() {
            Role::TextInput => {
                self.focused = Some(target);
                ClickEffect::Focused(target)
            }
            Role::Button => {
                self.focused = Some(target);
                self.submit_from(target)
                    .map_or(ClickEffect::Focused(target), ClickEffect::Submit)
            }
            Role::Link(href) => ClickEffect::Follow(href),
            Role::Container | Role::Form | Role::Glyph => ClickEffect::Nothing,
        }
    }

    /// Deliver a key to element `id`. Returns a URL when the key submits a form.
    pub fn key(&mut self, id: usize, key: &str, modifiers: Modifiers) -> Option<String> {
        self.key_log.push(KeyEvent::Down(key.to_owned()));
        match key {
            "Enter" => {
                self.key_log.push(KeyEvent::Up(key.to_owned()));
                self.submit_from(id)
            }
            "Backspace" => {
                if let Some(node) = self.nodes.get_mut(id).filter(|n| n.editable()) {
                    let _ = node.value.pop();
                }
                None
            }
            k if is_modifier_key(k) => None,
            _ => {
                let mut chars = key.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    if !modifiers.is_shortcut() {
                        if let Some(node) = self.nodes.get_mut(id).filter(|n| n.editable()) {
                            node.value.push(ch);
                        }
                    }
                }
                None
            }
        }
    }

    /// Value of the search field.
    pub fn input_value(&self) -> &str {
        &self.nodes[INPUT].value
    }

    fn submit_from(&self, id: usize) -> Option<String> {
        let form = self.enclosing_form(id)?;
        let query = self
            .nodes
            .iter()
            .filter(|n| n.editable() && self.enclosing_form_of(n) == Some(form))
            .map(|n| n.value.as_str())
            .next()
            .unwrap_or_default();
        let base = self.url.trim_end_matches('/');
        Some(format!("{base}/search?q={}", urlencoding::encode(query)))
    }

    fn enclosing_form_of(&self, node: &Node) -> Option<usize> {
        node.parent.and_then(|p| self.enclosing_form(p))
    }
}

/// Title shown for a URL: host and path without the scheme.
pub fn title_for(url: &str) -> String {
    let rest = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .trim_end_matches('/');
    if rest.is_empty() { url.to_owned() } else { rest.to_owned() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::load("http://example.com/", 400, 300)
    }

    fn centre(doc: &Document, id: usize) -> (i64, i64) {
        let r = doc.nodes[id].rect;
        (r.x + r.w / 2, r.y + r.h / 2)
    }

    #[test]
    fn hit_test_finds_deepest() {
        let doc = doc();
        let (x, y) = centre(&doc, GLYPH);
        assert_eq!(doc.hit_test(x, y), Some(GLYPH));
        assert_eq!(doc.hit_test(5, 5), Some(0));
        assert_eq!(doc.hit_test(-1, 5), None);
    }

    #[test]
    fn glyph_click_walks_up_to_button() {
        let doc = doc();
        assert_eq!(doc.click_target(GLYPH), Some(BUTTON));
        assert_eq!(doc.click_target(0), None);
        assert_eq!(doc.enclosing_form(GLYPH), Some(1));
    }

    #[test]
    fn click_input_focuses() {
        let mut doc = doc();
        let (x, y) = centre(&doc, INPUT);
        assert_eq!(doc.click(x, y), ClickEffect::Focused(INPUT));
        assert_eq!(doc.focused, Some(INPUT));
    }

    #[test]
    fn click_glyph_submits_form() {
        let mut doc = doc();
        doc.nodes[INPUT].value = "rust lang".into();
        let (x, y) = centre(&doc, GLYPH);
        assert_eq!(
            doc.click(x, y),
            ClickEffect::Submit("http://example.com/search?q=rust%20lang".into())
        );
    }

    #[test]
    fn click_link_follows() {
        let mut doc = doc();
        let (x, y) = centre(&doc, LINK);
        assert_eq!(doc.click(x, y), ClickEffect::Follow("http://example.com/next".into()));
    }

    #[test]
    fn click_background_clears_focus() {
        let mut doc = doc();
        doc.focused = Some(INPUT);
        assert_eq!(doc.click(5, 250), ClickEffect::Nothing);
        assert_eq!(doc.focused, None);
    }

    #[test]
    fn typing_appends_and_backspace_truncates() {
        let mut doc = doc();
        for key in ["h", "i", "!"] {
            assert_eq!(doc.key(INPUT, key, Modifiers::default()), None);
        }
        assert_eq!(doc.input_value(), "hi!");
        let _ = doc.key(INPUT, "Backspace", Modifiers::default());
        assert_eq!(doc.input_value(), "hi");
    }

    #[test]
    fn backspace_on_empty_field_is_harmless() {
        let mut doc = doc();
        let _ = doc.key(INPUT, "Backspace", Modifiers::default());
        assert_eq!(doc.input_value(), "");
    }

    #[test]
    fn enter_sends_down_up_and_submits() {
        let mut doc = doc();
        let _ = doc.key(INPUT, "q", Modifiers::default());
        let url = doc.key(INPUT, "Enter", Modifiers::default());
        assert_eq!(url.as_deref(), Some("http://example.com/search?q=q"));
        assert_eq!(
            &doc.key_log[1..],
            &[KeyEvent::Down("Enter".into()), KeyEvent::Up("Enter".into())]
        );
    }

    #[test]
    fn modifier_key_is_keydown_only() {
        let mut doc = doc();
        let _ = doc.key(INPUT, "Shift", Modifiers::default().with_key("Shift"));
        assert_eq!(doc.key_log, vec![KeyEvent::Down("Shift".into())]);
        assert_eq!(doc.input_value(), "");
    }

    #[test]
    fn shortcut_does_not_type() {
        let mut doc = doc();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        let _ = doc.key(INPUT, "a", ctrl);
        assert_eq!(doc.input_value(), "");
    }

    #[test]
    fn named_keys_do_not_type() {
        let mut doc = doc();
        let _ = doc.key(INPUT, "ArrowLeft", Modifiers::default());
        assert_eq!(doc.input_value(), "");
    }

    #[test]
    fn title_strips_scheme() {
        assert_eq!(title_for("https://www.google.com"), "www.google.com");
        assert_eq!(title_for("http://a/b/"), "a/b");
        assert_eq!(title_for("about:blank"), "about:blank");
    }
}

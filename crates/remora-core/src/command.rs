//! Remote-control commands relayed from viewers to the render surface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One discrete remote-control instruction.
///
/// Commands are immutable once constructed and carry no response channel:
/// dispatch is fire-and-forget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Load a URL in the active tab.
    Navigate {
        /// Normalized absolute URL.
        url: String,
    },
    /// Synthesize a pointer click at viewport coordinates.
    Click {
        /// Horizontal viewport coordinate in CSS pixels.
        x: u32,
        /// Vertical viewport coordinate in CSS pixels.
        y: u32,
    },
    /// Scroll the page vertically.
    Scroll {
        /// Scroll direction.
        direction: ScrollDirection,
        /// Distance in CSS pixels.
        amount: u32,
    },
    /// Deliver a key press to the focused element.
    KeyInput {
        /// DOM `KeyboardEvent.key` value (e.g. `"a"`, `"Enter"`, `"Backspace"`).
        key: String,
        /// Modifier state at the time of the press.
        modifiers: Modifiers,
    },
    /// Activate the previous or next tab.
    SwitchTab {
        /// Which neighbour to activate.
        direction: TabDirection,
    },
    /// Open a new tab on the home page and activate it.
    NewTab,
    /// Go back in the active tab's history.
    Back,
    /// Go forward in the active tab's history.
    Forward,
    /// Reload the active tab.
    Reload,
    /// Load the home page in the active tab.
    Home,
}

impl Command {
    /// Stable snake_case label, used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::Scroll { .. } => "scroll",
            Self::KeyInput { .. } => "key_input",
            Self::SwitchTab { .. } => "switch_tab",
            Self::NewTab => "new_tab",
            Self::Back => "back",
            Self::Forward => "forward",
            Self::Reload => "reload",
            Self::Home => "home",
        }
    }
}

/// Vertical scroll direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Towards the top of the page.
    Up,
    /// Towards the bottom of the page.
    Down,
}

impl ScrollDirection {
    /// Signed vertical delta for `amount` pixels (up is negative).
    pub fn signed(self, amount: u32) -> i64 {
        match self {
            Self::Up => -i64::from(amount),
            Self::Down => i64::from(amount),
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(ParseDirectionError::new(other, "up, down")),
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tab cycling direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabDirection {
    /// The tab to the left, wrapping to the last.
    Prev,
    /// The tab to the right, wrapping to the first.
    Next,
}

impl TabDirection {
    /// Index reached from `current` among `count` tabs, wrapping at both ends.
    pub fn step(self, current: usize, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        match self {
            Self::Prev => (current + count - 1) % count,
            Self::Next => (current + 1) % count,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prev => "prev",
            Self::Next => "next",
        }
    }
}

impl FromStr for TabDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prev" => Ok(Self::Prev),
            "next" => Ok(Self::Next),
            other => Err(ParseDirectionError::new(other, "prev, next")),
        }
    }
}

impl fmt::Display for TabDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognised direction value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid direction '{value}' (expected one of: {expected})")]
pub struct ParseDirectionError {
    /// The rejected input.
    pub value: String,
    /// Accepted values, comma separated.
    pub expected: &'static str,
}

impl ParseDirectionError {
    fn new(value: &str, expected: &'static str) -> Self {
        Self {
            value: value.to_owned(),
            expected,
        }
    }
}

/// Keyboard modifier state, as reported by the viewer page.
///
/// Deserializes from `{"ctrl":bool,"shift":bool,"alt":bool}`; missing fields
/// default to `false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Control held.
    pub ctrl: bool,
    /// Shift held.
    pub shift: bool,
    /// Alt / Option held.
    pub alt: bool,
    /// Meta / Command held.
    pub meta: bool,
}

impl Modifiers {
    /// Whether any modifier is held.
    pub fn any(self) -> bool {
        self.ctrl || self.shift || self.alt || self.meta
    }

    /// Whether a shortcut modifier (anything but shift) is held.
    pub fn is_shortcut(self) -> bool {
        self.ctrl || self.alt || self.meta
    }

    /// Fold in the modifier implied by pressing a modifier key itself.
    ///
    /// Pressing `Shift` alone reports `shift = true` even if the viewer did
    /// not, and likewise for `Control`, `Alt` and `Meta`.
    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        match key {
            "Shift" => self.shift = true,
            "Control" => self.ctrl = true,
            "Alt" => self.alt = true,
            "Meta" => self.meta = true,
            _ => {}
        }
        self
    }
}

/// Whether `key` names a bare modifier key.
pub fn is_modifier_key(key: &str) -> bool {
    matches!(key, "Shift" | "Control" | "Alt" | "Meta")
}

/// Normalize user-entered navigation input into an absolute URL.
///
/// Trims whitespace and prefixes `http://` when no `http`/`https` scheme is
/// present. Returns `None` for empty input.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_owned())
    } else {
        Some(format!("http://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn kind_labels_are_snake_case() {
        let commands = [
            Command::Navigate { url: "http://a".into() },
            Command::Click { x: 1, y: 2 },
            Command::Scroll {
                direction: ScrollDirection::Down,
                amount: 10,
            },
            Command::KeyInput {
                key: "a".into(),
                modifiers: Modifiers::default(),
            },
            Command::SwitchTab {
                direction: TabDirection::Next,
            },
            Command::NewTab,
            Command::Back,
            Command::Forward,
            Command::Reload,
            Command::Home,
        ];
        for command in &commands {
            let kind = command.kind();
            assert!(kind.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn scroll_direction_parses_exact_values() {
        assert_eq!("up".parse::<ScrollDirection>(), Ok(ScrollDirection::Up));
        assert_eq!("down".parse::<ScrollDirection>(), Ok(ScrollDirection::Down));
        assert_matches!("sideways".parse::<ScrollDirection>(), Err(e) if e.value == "sideways");
        assert!("UP".parse::<ScrollDirection>().is_err());
        assert!("".parse::<ScrollDirection>().is_err());
    }

    #[test]
    fn scroll_direction_signs_amount() {
        assert_eq!(ScrollDirection::Up.signed(50), -50);
        assert_eq!(ScrollDirection::Down.signed(50), 50);
        assert_eq!(ScrollDirection::Up.signed(0), 0);
    }

    #[test]
    fn tab_direction_parses() {
        assert_eq!("prev".parse::<TabDirection>(), Ok(TabDirection::Prev));
        assert_eq!("next".parse::<TabDirection>(), Ok(TabDirection::Next));
        let err = "left".parse::<TabDirection>().unwrap_err();
        assert!(err.to_string().contains("prev, next"));
    }

    #[test]
    fn tab_direction_wraps() {
        assert_eq!(TabDirection::Next.step(2, 3), 0);
        assert_eq!(TabDirection::Prev.step(0, 3), 2);
        assert_eq!(TabDirection::Next.step(0, 1), 0);
        assert_eq!(TabDirection::Prev.step(0, 0), 0);
    }

    #[test]
    fn modifiers_deserialize_partial_json() {
        let m: Modifiers = serde_json::from_str(r#"{"ctrl":true}"#).unwrap();
        assert!(m.ctrl);
        assert!(!m.shift);
        assert!(!m.alt);
        assert!(!m.meta);
        let empty: Modifiers = serde_json::from_str("{}").unwrap();
        assert!(!empty.any());
    }

    #[test]
    fn modifiers_fold_in_modifier_key() {
        let m = Modifiers::default().with_key("Shift");
        assert!(m.shift);
        assert!(!m.is_shortcut());
        let m = Modifiers::default().with_key("Control");
        assert!(m.ctrl && m.is_shortcut());
        let m = Modifiers::default().with_key("a");
        assert!(!m.any());
    }

    #[test]
    fn modifier_keys_detected() {
        assert!(is_modifier_key("Shift"));
        assert!(is_modifier_key("Meta"));
        assert!(!is_modifier_key("Enter"));
        assert!(!is_modifier_key("s"));
    }

    #[test]
    fn normalize_url_adds_scheme() {
        assert_eq!(normalize_url("example.com").as_deref(), Some("http://example.com"));
        assert_eq!(
            normalize_url("  https://example.com/a?b=c ").as_deref(),
            Some("https://example.com/a?b=c")
        );
        assert_eq!(normalize_url("HTTP://EXAMPLE.COM").as_deref(), Some("HTTP://EXAMPLE.COM"));
        assert_eq!(normalize_url("   "), None);
        assert_eq!(normalize_url(""), None);
    }

    #[test]
    fn command_serializes_with_type_tag() {
        let json = serde_json::to_value(Command::Click { x: 10, y: 20 }).unwrap();
        assert_eq!(json["type"], "click");
        assert_eq!(json["x"], 10);
        let json = serde_json::to_value(Command::Scroll {
            direction: ScrollDirection::Up,
            amount: 5,
        })
        .unwrap();
        assert_eq!(json["direction"], "up");
    }
}

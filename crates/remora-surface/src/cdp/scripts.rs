//! JavaScript snippets evaluated in the page via `Runtime.evaluate`.
//!
//! Every interpolated string goes through `serde_json::to_string`, which
//! yields a valid JS string literal, so keys and ids can never break out of
//! the script.

use remora_core::{Modifiers, is_modifier_key};

/// Attribute used to tag the focused element so key input can find it again.
pub const ELEMENT_ATTR: &str = "data-remora-id";

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Click at viewport coordinates, retargeted to the nearest actionable
/// ancestor of the hit element. Evaluates to `true` when something was hit.
pub fn click(x: u32, y: u32) -> String {
    format!(
        r"(() => {{
  const hit = document.elementFromPoint({x}, {y});
  if (!hit) return false;
  const el = hit.closest('a, button, input, textarea, select, label, summary, [onclick], [role=button], [tabindex]') || hit;
  const init = {{ bubbles: true, cancelable: true, view: window, clientX: {x}, clientY: {y}, button: 0 }};
  el.dispatchEvent(new PointerEvent('pointerdown', init));
  el.dispatchEvent(new MouseEvent('mousedown', init));
  if (typeof el.focus === 'function') el.focus();
  el.dispatchEvent(new PointerEvent('pointerup', init));
  el.dispatchEvent(new MouseEvent('mouseup', init));
  el.click();
  return true;
}})()"
    )
}

/// Scroll the window by a signed vertical delta.
pub fn scroll(delta_y: i64) -> String {
    format!("window.scrollBy(0, {delta_y})")
}

/// Describe the focused element, tagging it so [`key`] can address it.
/// Evaluates to `{id, tag, editable}`, or `null` when focus rests on the
/// document body.
pub fn focused_element() -> String {
    format!(
        r"(() => {{
  const el = document.activeElement;
  if (!el || el === document.body || el === document.documentElement) return null;
  if (!el.hasAttribute('{ELEMENT_ATTR}')) {{
    window.__remoraSeq = (window.__remoraSeq || 0) + 1;
    el.setAttribute('{ELEMENT_ATTR}', String(window.__remoraSeq));
  }}
  const tag = el.tagName.toLowerCase();
  const editable = tag === 'input' || tag === 'textarea' || el.isContentEditable === true;
  return {{ id: el.getAttribute('{ELEMENT_ATTR}'), tag, editable }};
}})()"
    )
}

/// Deliver one key to the element tagged `element_id`.
///
/// Keydown always fires. `Enter` also fires keyup and submits the enclosing
/// form; `Backspace` truncates the field's value; a printable character is
/// appended unless a shortcut modifier is held; bare modifier keys only get
/// the keydown. Evaluates to `false` if the element is gone.
pub fn key(element_id: &str, key: &str, modifiers: Modifiers) -> String {
    let selector = js_string(&format!("[{ELEMENT_ATTR}=\"{element_id}\"]"));
    let bare = is_modifier_key(key);
    let key = js_string(key);
    let Modifiers {
        ctrl,
        shift,
        alt,
        meta,
    } = modifiers;
    format!(
        r"(() => {{
  const el = document.querySelector({selector});
  if (!el) return false;
  const key = {key};
  const init = {{ key, bubbles: true, cancelable: true, ctrlKey: {ctrl}, shiftKey: {shift}, altKey: {alt}, metaKey: {meta} }};
  const field = el.tagName === 'INPUT' || el.tagName === 'TEXTAREA';
  const notify = () => el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new KeyboardEvent('keydown', init));
  if (key === 'Enter') {{
    el.dispatchEvent(new KeyboardEvent('keyup', init));
    const form = el.form || el.closest('form');
    if (form) {{
      if (typeof form.requestSubmit === 'function') form.requestSubmit(); else form.submit();
    }}
  }} else if (key === 'Backspace') {{
    if (field && el.value.length > 0) {{ el.value = el.value.slice(0, -1); notify(); }}
  }} else if ({bare}) {{
  }} else if ([...key].length === 1 && !({ctrl} || {alt} || {meta})) {{
    if (field) {{ el.value += key; notify(); }}
  }}
  return true;
}})()"
    )
}

/// Evaluates to the document title.
pub const TITLE: &str = "document.title";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_embeds_coordinates_and_closest() {
        let js = click(12, 34);
        assert!(js.contains("elementFromPoint(12, 34)"));
        assert!(js.contains("closest("));
        assert!(js.contains("'pointerdown'"));
        assert!(js.contains("'mouseup'"));
    }

    #[test]
    fn scroll_is_signed() {
        assert_eq!(scroll(-50), "window.scrollBy(0, -50)");
        assert_eq!(scroll(120), "window.scrollBy(0, 120)");
    }

    #[test]
    fn bare_modifier_flag_follows_key() {
        let js = key("7", "Control", Modifiers::default().with_key("Control"));
        assert!(js.contains("} else if (true) {"));
        assert!(js.contains("ctrlKey: true"));
        let js = key("7", "a", Modifiers::default());
        assert!(js.contains("} else if (false) {"));
        assert!(!js.contains("'Shift'"));
    }

    #[test]
    fn key_escapes_quotes() {
        let js = key("7", "'", Modifiers::default());
        assert!(js.contains(r#"const key = "'";"#));
        let js = key("7", "\"", Modifiers::default());
        assert!(js.contains(r#"const key = "\"";"#));
        let js = key("7", "\\", Modifiers::default());
        assert!(js.contains(r#"const key = "\\";"#));
    }

    #[test]
    fn key_carries_modifiers() {
        let js = key(
            "1",
            "a",
            Modifiers {
                ctrl: true,
                shift: false,
                alt: false,
                meta: true,
            },
        );
        assert!(js.contains("ctrlKey: true"));
        assert!(js.contains("shiftKey: false"));
        assert!(js.contains("metaKey: true"));
    }

    #[test]
    fn key_targets_tagged_element() {
        let js = key("42", "Enter", Modifiers::default());
        assert!(js.contains(r#"[data-remora-id=\"42\"]"#));
        assert!(js.contains("requestSubmit"));
    }

    #[test]
    fn focused_element_tags_element() {
        let js = focused_element();
        assert!(js.contains("document.activeElement"));
        assert!(js.contains(ELEMENT_ATTR));
    }
}

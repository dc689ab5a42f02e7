//! Query-string validation for control routes.
//!
//! Every parser is strict: a missing, empty or malformed value is a
//! [`ApiError::BadRequest`], never a silent default. Coordinates must be
//! non-negative integers; scroll amounts may carry a fractional part and are
//! rounded to the nearest pixel.

use std::collections::HashMap;

use remora_core::{Command, Modifiers, ScrollDirection, TabDirection, normalize_url};

use crate::errors::ApiError;

/// Raw query parameters.
pub type Query = HashMap<String, String>;

/// A required, non-empty parameter.
pub fn required<'a>(query: &'a Query, name: &str) -> Result<&'a str, ApiError> {
    match query.get(name).map(String::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::bad_request(format!("missing parameter '{name}'"))),
    }
}

/// A viewport coordinate: a non-negative integer.
pub fn coordinate(query: &Query, name: &str) -> Result<u32, ApiError> {
    let raw = required(query, name)?.trim();
    raw.parse::<u32>().map_err(|_| {
        ApiError::bad_request(format!("parameter '{name}' must be a non-negative integer, got '{raw}'"))
    })
}

/// A scroll distance: a finite non-negative number, rounded.
pub fn amount(query: &Query, name: &str) -> Result<u32, ApiError> {
    let raw = required(query, name)?.trim();
    let invalid =
        || ApiError::bad_request(format!("parameter '{name}' must be a non-negative number, got '{raw}'"));
    let value: f64 = raw.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    let rounded = value.round();
    if rounded > f64::from(u32::MAX) {
        return Err(invalid());
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(rounded as u32)
}

/// An enumerated value parsed through `FromStr`.
pub fn enumerated<T>(query: &Query, name: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    required(query, name)?
        .parse()
        .map_err(|e: T::Err| ApiError::bad_request(format!("parameter '{name}': {e}")))
}

/// Optional JSON modifier object; absent or empty means no modifiers.
pub fn modifiers(query: &Query) -> Result<Modifiers, ApiError> {
    match query.get("modifiers").map(|m| m.trim()) {
        None | Some("") => Ok(Modifiers::default()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ApiError::bad_request(format!("parameter 'modifiers' is not valid JSON: {e}"))),
    }
}

/// `/navigate?url=`
pub fn navigate(query: &Query) -> Result<Command, ApiError> {
    let raw = required(query, "url")?;
    let url = normalize_url(raw).ok_or_else(|| ApiError::bad_request("missing parameter 'url'"))?;
    Ok(Command::Navigate { url })
}

/// `/click?x=&y=`
pub fn click(query: &Query) -> Result<Command, ApiError> {
    Ok(Command::Click {
        x: coordinate(query, "x")?,
        y: coordinate(query, "y")?,
    })
}

/// `/scroll?direction=&amount=`
pub fn scroll(query: &Query) -> Result<Command, ApiError> {
    Ok(Command::Scroll {
        direction: enumerated::<ScrollDirection>(query, "direction")?,
        amount: amount(query, "amount")?,
    })
}

/// `/type?key=&modifiers=`
///
/// A single space is a valid key, so `key` is only rejected when absent or
/// truly empty.
pub fn key_input(query: &Query) -> Result<Command, ApiError> {
    let key = match query.get("key") {
        Some(key) if !key.is_empty() => key.clone(),
        _ => return Err(ApiError::bad_request("missing parameter 'key'")),
    };
    Ok(Command::KeyInput {
        key,
        modifiers: modifiers(query)?,
    })
}

/// `/switch_tab?direction=`
pub fn switch_tab(query: &Query) -> Result<Command, ApiError> {
    Ok(Command::SwitchTab {
        direction: enumerated::<TabDirection>(query, "direction")?,
    })
}

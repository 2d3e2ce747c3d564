//! Non-destructive field substitution.
//!
//! Rewrites the quoted value of a single top-level field and leaves every
//! other byte of the manifest alone, including comments and formatting.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::mask::{depth_at, mask_comments};

static NAME_FIELD: LazyLock<Regex> = LazyLock::new(|| field_pattern("Name"));
static DESCRIPTION_FIELD: LazyLock<Regex> = LazyLock::new(|| field_pattern("Description"));

/// `"Key" : "value"` where the value may contain escaped quotes.
fn field_pattern(key: &str) -> Regex {
    Regex::new(&format!(r#""(?i:{key})"\s*:\s*"((?:[^"\\]|\\.)*)""#))
        .expect("field pattern is valid")
}

/// A manifest field the patcher can rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestField {
    Name,
    Description,
}

impl ManifestField {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            ManifestField::Name => "Name",
            ManifestField::Description => "Description",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            ManifestField::Name => &NAME_FIELD,
            ManifestField::Description => &DESCRIPTION_FIELD,
        }
    }
}

/// Replace the value of `field` with `value`.
///
/// Returns the input unchanged when `value` is empty/absent or the field has
/// no top-level quoted value outside comments.
#[must_use]
pub fn patch_field(text: &str, field: ManifestField, value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return text.to_string();
    };

    let masked = mask_comments(text);
    let target = field
        .pattern()
        .captures_iter(&masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            (depth_at(&masked, whole.start()) == Some(1)).then(|| caps.get(1))?
        })
        .next();
    let Some(inner) = target else {
        return text.to_string();
    };

    let escaped = escape_json_string(value);
    if text[inner.range()] == escaped {
        return text.to_string();
    }

    let mut patched = String::with_capacity(text.len() - inner.len() + escaped.len());
    patched.push_str(&text[..inner.start()]);
    patched.push_str(&escaped);
    patched.push_str(&text[inner.end()..]);
    patched
}

/// Apply Name and Description independently. Idempotent.
#[must_use]
pub fn apply_translation(text: &str, name: Option<&str>, description: Option<&str>) -> String {
    let patched = patch_field(text, ManifestField::Name, name);
    patch_field(&patched, ManifestField::Description, description)
}

/// Escape `value` as the interior of a JSON string literal.
#[must_use]
pub fn escape_json_string(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Whether `text` contains a CJK ideograph.
#[must_use]
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}'
            | '\u{3400}'..='\u{4dbf}'
            | '\u{f900}'..='\u{faff}'
            | '\u{20000}'..='\u{2a6df}')
    })
}

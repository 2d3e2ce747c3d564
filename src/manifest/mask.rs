//! Byte-preserving masking of the non-JSON parts of a manifest.
//!
//! Manifests allow `//` and `/* */` comments, a UTF-8 BOM and trailing
//! commas. Instead of deleting those, every masked byte is replaced by an
//! ASCII space so offsets in the masked text map 1:1 onto the raw text.

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Blank out comments, a leading BOM and trailing commas.
///
/// The result has exactly the same byte length as `text` and is valid JSON
/// whenever `text` is valid "relaxed" JSON.
#[must_use]
pub fn mask_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    if bytes.starts_with(BOM) {
        out[..BOM.len()].fill(b' ');
        i = BOM.len();
    }

    let mut in_string = false;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }
        match (b, bytes.get(i + 1)) {
            (b'"', _) => {
                in_string = true;
                i += 1;
            }
            (b'/', Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            (b'/', Some(b'*')) => {
                let start = i;
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                let end = (i + 2).min(bytes.len());
                for (offset, slot) in out[start..end].iter_mut().enumerate() {
                    // Keep line breaks so parse errors still report useful lines.
                    if !matches!(bytes[start + offset], b'\n' | b'\r') {
                        *slot = b' ';
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }

    blank_trailing_commas(&mut out);
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Replace `,` followed (after whitespace) by `}` or `]` with a space.
fn blank_trailing_commas(out: &mut [u8]) {
    let mut in_string = false;
    let mut i = 0;
    while i < out.len() {
        let b = out[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == b',' {
            let next = out[i + 1..]
                .iter()
                .find(|c| !c.is_ascii_whitespace())
                .copied();
            if matches!(next, Some(b'}' | b']')) {
                out[i] = b' ';
            }
        }
        i += 1;
    }
}

/// Object/array nesting depth at byte `pos` of masked text.
///
/// Returns `None` when `pos` lies inside a string literal.
#[must_use]
pub fn depth_at(masked: &str, pos: usize) -> Option<usize> {
    let bytes = masked.as_bytes();
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut i = 0;
    while i < pos.min(bytes.len()) {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        i += 1;
    }
    if in_string {
        None
    } else {
        Some(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_line_comments_preserving_length() {
        let text = "{\n  // the name\n  \"Name\": \"A\"\n}";
        let masked = mask_comments(text);
        assert_eq!(masked.len(), text.len());
        assert!(!masked.contains("the name"));
        let v: serde_json::Value = serde_json::from_str(&masked).unwrap();
        assert_eq!(v["Name"], "A");
    }

    #[test]
    fn keeps_slashes_inside_strings() {
        let text = r#"{"Url": "https://example.com/a//b"} // trailing"#;
        let masked = mask_comments(text);
        assert!(masked.contains("https://example.com/a//b"));
        assert!(!masked.contains("trailing"));
    }

    #[test]
    fn masks_block_comments_and_trailing_commas() {
        let text = "{ /* Mod\n info */ \"Name\": \"A\", \"Keys\": [\"x\",], }";
        let masked = mask_comments(text);
        assert_eq!(masked.len(), text.len());
        let v: serde_json::Value = serde_json::from_str(&masked).unwrap();
        assert_eq!(v["Keys"][0], "x");
    }

    #[test]
    fn masks_bom() {
        let text = "\u{feff}{\"Name\": \"A\"}";
        let masked = mask_comments(text);
        assert_eq!(masked.len(), text.len());
        assert!(serde_json::from_str::<serde_json::Value>(&masked).is_ok());
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let text = r#"{"Name": "say \"// hi\""}"#;
        let masked = mask_comments(text);
        assert_eq!(masked, text);
    }

    #[test]
    fn depth_at_tracks_nesting_and_strings() {
        let text = r#"{"A": {"Name": "x"}, "Name": "y"}"#;
        let nested = text.find("\"Name\"").unwrap();
        let top = text.rfind("\"Name\"").unwrap();
        assert_eq!(depth_at(text, nested), Some(2));
        assert_eq!(depth_at(text, top), Some(1));
        assert_eq!(depth_at(text, nested + 2), None);
    }
}

//! Tolerant JSON helpers for the pending command feed
//!
//! The remote store answers with a JSON array of flat objects. These helpers
//! work on the raw text:
//! - [`split_array`] cuts the array into top-level object blobs by brace
//!   depth, ignoring braces inside string values
//! - [`FieldPattern`] pulls one field out of an object blob, first as a
//!   quoted string, then as a bare token (numbers, booleans, `null`)

use regex::Regex;
use thiserror::Error;

/// Structural problems found while splitting an array blob
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    #[error("blob is not framed as an array")]
    NotAnArray,
}

/// Top-level objects of an array blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitArray<'a> {
    /// Every object that closed, in order
    pub objects: Vec<&'a str>,
    /// False when the content ended inside an object or string, or held a
    /// stray `}`; objects closed before the damage are still listed
    pub balanced: bool,
}

/// Split a bracketed array blob into its top-level object blobs.
///
/// Objects completed before any structural damage are still returned,
/// with `balanced` cleared. Only missing `[` ... `]` framing is an error.
pub fn split_array(blob: &str) -> Result<SplitArray<'_>, SplitError> {
    let content = array_content(blob).ok_or(SplitError::NotAnArray)?;
    let (objects, balanced) = scan_objects(content);
    Ok(SplitArray { objects, balanced })
}

/// Strip whitespace and the outer brackets
fn array_content(blob: &str) -> Option<&str> {
    let trimmed = blob.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('[') || !trimmed.ends_with(']') {
        return None;
    }
    Some(trimmed[1..trimmed.len() - 1].trim())
}

/// Scan array content and return the object blobs plus whether the scan
/// ended outside any object and string.
fn scan_objects(content: &str) -> (Vec<&str>, bool) {
    let mut objects = Vec::new();
    let mut in_string = false;
    let mut depth: u32 = 0;
    let mut start: Option<usize> = None;
    // Run of consecutive backslashes directly before the current char
    let mut backslashes = 0usize;
    let mut stray_close = false;

    for (i, c) in content.char_indices() {
        if c == '"' && backslashes % 2 == 0 {
            in_string = !in_string;
        }

        if !in_string {
            match c {
                '{' => {
                    if depth == 0 {
                        start = Some(i);
                    }
                    depth += 1;
                }
                '}' => {
                    if depth == 0 {
                        stray_close = true;
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            if let Some(s) = start.take() {
                                objects.push(&content[s..=i]);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
    }

    let balanced = depth == 0 && !in_string && !stray_close;
    (objects, balanced)
}

/// Compiled lookup for one key in an object blob.
///
/// Quoted values are returned with `\"` and `\\` unescaped exactly once.
/// Bare tokens are returned verbatim, except `null`, which is absent.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    quoted: Regex,
    bare: Regex,
}

impl FieldPattern {
    /// Build the patterns for `key`, matched literally
    pub fn new(key: &str) -> Result<Self, regex::Error> {
        let key = regex::escape(key);
        Ok(Self {
            quoted: Regex::new(&format!(r#""{key}":\s*"((?:\\.|[^\\"])*)""#))?,
            bare: Regex::new(&format!(r#""{key}":\s*([^,}}\]\s]*)"#))?,
        })
    }

    /// Extract the value from an object blob
    pub fn extract(&self, object: &str) -> Option<String> {
        if let Some(caps) = self.quoted.captures(object) {
            let raw = caps.get(1).map_or("", |m| m.as_str());
            return Some(unescape(raw));
        }

        let caps = self.bare.captures(object)?;
        let token = caps.get(1).map_or("", |m| m.as_str()).replace('"', "");
        if token == "null" {
            return None;
        }
        Some(token)
    }
}

/// Undo one level of quote and backslash escaping, quotes first
fn unescape(raw: &str) -> String {
    raw.replace("\\\"", "\"").replace("\\\\", "\\")
}

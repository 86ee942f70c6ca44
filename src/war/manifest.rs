//! Parser for `META-INF/MANIFEST.MF` main attributes.
//!
//! Follows the jar manifest wire format: `Name: value` lines, with lines
//! starting with a single space continuing the previous value. Only the main
//! section (up to the first blank line) is read; per-entry sections are
//! irrelevant here.

use std::collections::HashMap;

/// Main attributes of a jar manifest.
#[derive(Debug, Clone, Default)]
pub struct JarManifest {
    attributes: HashMap<String, String>,
}

impl JarManifest {
    pub fn parse(raw: &str) -> Self {
        let mut attributes = HashMap::new();
        let mut current: Option<(String, String)> = None;

        for line in raw.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break;
            }
            if let Some(continuation) = line.strip_prefix(' ') {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(continuation);
                }
                continue;
            }
            if let Some((name, value)) = current.take() {
                attributes.insert(name, value);
            }
            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim_start().to_string()));
            }
        }
        if let Some((name, value)) = current {
            attributes.insert(name, value);
        }

        Self { attributes }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

//! Enforces log intake constraints on a built [`LogRecord`].
//!
//! Attributes and tags run through independent, strictly ordered stages.
//! Every stage sees the full output of the previous one and never brings
//! back something an earlier stage dropped. Nothing here fails: invalid
//! content is dropped, renamed or truncated and a [`Diagnostic`] is
//! reported for it.

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingDiagnostics};
use crate::encoding;
use crate::record::{Attributes, EncodableValue, LogAttributes, LogRecord};
use std::collections::HashSet;
use std::sync::Arc;

/// Intake limits applied by [`RecordSanitizer`].
pub mod constraints {
    /// Attribute names the intake assigns its own meaning to.
    pub const RESERVED_ATTRIBUTE_NAMES: [&str; 9] = [
        "host",
        "message",
        "status",
        "service",
        "source",
        "error.kind",
        "error.message",
        "error.stack",
        "ddtags",
    ];

    /// Tag keys (the part before the first `:`) the intake assigns its
    /// own meaning to.
    pub const RESERVED_TAG_KEYS: [&str; 4] = ["host", "device", "source", "service"];

    /// Number of `.` separators kept in an attribute name; later ones
    /// become `_`.
    pub const MAX_NESTED_SEPARATORS: usize = 8;

    pub const MAX_ATTRIBUTES: usize = 256;
    pub const MAX_TAGS: usize = 100;
    pub const MAX_TAG_LENGTH: usize = 200;
}

/// Applies intake constraints to records, reporting every change to an
/// injected [`DiagnosticSink`].
#[derive(Clone)]
pub struct RecordSanitizer {
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for RecordSanitizer {
    fn default() -> Self {
        Self::new(Arc::new(TracingDiagnostics))
    }
}

impl RecordSanitizer {
    pub fn new(diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self { diagnostics }
    }

    /// Return a copy of `record` whose user attributes and tags satisfy
    /// the intake constraints. All other fields, including internal
    /// attributes, are passed through unchanged.
    pub fn sanitize(&self, record: LogRecord) -> LogRecord {
        let occupied = encoding::occupied_keys(&record);
        let LogAttributes {
            user_attributes,
            internal_attributes,
        } = record.attributes;

        LogRecord {
            attributes: LogAttributes {
                user_attributes: self.sanitize_user_attributes(user_attributes, &occupied),
                internal_attributes,
            },
            tags: record.tags.map(|tags| self.sanitize_tags(tags)),
            ..record
        }
    }

    /// Sanitize attributes on their own. Only the fixed record keys count
    /// as collisions here; [`sanitize`](Self::sanitize) also checks the
    /// keys taken by the record's user info and internal attributes.
    pub fn sanitize_attributes(&self, attributes: Attributes) -> Attributes {
        self.sanitize_user_attributes(attributes, &HashSet::new())
    }

    fn sanitize_user_attributes(
        &self,
        attributes: Attributes,
        occupied: &HashSet<String>,
    ) -> Attributes {
        let attributes = self.drop_empty_keys(attributes);
        let attributes = self.drop_reserved_keys(attributes);
        let attributes = self.escape_nested_keys(attributes);
        let attributes = self.drop_field_collisions(attributes, occupied);
        self.cap_attributes(attributes)
    }

    pub fn sanitize_tags(&self, tags: Vec<String>) -> Vec<String> {
        let tags = lowercase(tags);
        let tags = self.drop_invalid_start(tags);
        let tags = self.replace_illegal_characters(tags);
        let tags = self.strip_trailing_colons(tags);
        let tags = self.truncate(tags);
        let tags = self.drop_reserved_tag_keys(tags);
        self.cap_tags(tags)
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }

    fn drop_empty_keys(&self, mut attributes: Attributes) -> Attributes {
        if attributes.remove("").is_some() {
            self.report(Diagnostic::error("Attribute key is empty. This attribute will be ignored."));
        }
        attributes
    }

    fn drop_reserved_keys(&self, attributes: Attributes) -> Attributes {
        attributes
            .into_iter()
            .filter(|(key, _)| {
                let reserved = constraints::RESERVED_ATTRIBUTE_NAMES.contains(&key.as_str());
                if reserved {
                    self.report(Diagnostic::error(format!(
                        "'{key}' is a reserved attribute name. This attribute will be ignored."
                    )));
                }
                !reserved
            })
            .collect()
    }

    fn escape_nested_keys(&self, attributes: Attributes) -> Attributes {
        let mut renamed: Vec<(String, String, EncodableValue)> = Vec::new();
        let mut kept = Attributes::new();

        for (key, value) in attributes {
            let escaped = escape_nesting(&key);
            if escaped == key {
                kept.insert(key, value);
            } else {
                renamed.push((key, escaped, value));
            }
        }

        for (original, escaped, value) in renamed {
            if kept.contains_key(&escaped) {
                self.report(Diagnostic::error(format!(
                    "Attribute '{original}' was renamed to '{escaped}', which is already in use. \
                     This attribute will be ignored."
                )));
                continue;
            }
            self.report(Diagnostic::warning(format!(
                "Attribute '{original}' exceeds the nesting limit and was renamed to '{escaped}'."
            )));
            kept.insert(escaped, value);
        }
        kept
    }

    /// Drop attributes the encoder could not write because a record field
    /// already uses the key.
    fn drop_field_collisions(
        &self,
        attributes: Attributes,
        occupied: &HashSet<String>,
    ) -> Attributes {
        attributes
            .into_iter()
            .filter(|(key, _)| {
                let taken =
                    encoding::FIXED_KEYS.contains(&key.as_str()) || occupied.contains(key);
                if taken {
                    self.report(Diagnostic::error(format!(
                        "Attribute '{key}' collides with a log record field. \
                         This attribute will be ignored."
                    )));
                }
                !taken
            })
            .collect()
    }

    fn cap_attributes(&self, attributes: Attributes) -> Attributes {
        let excess = attributes.len().saturating_sub(constraints::MAX_ATTRIBUTES);
        if excess == 0 {
            return attributes;
        }
        self.report(Diagnostic::error(format!(
            "Number of attributes exceeds the limit of {}. {excess} attribute(s) will be ignored.",
            constraints::MAX_ATTRIBUTES
        )));
        attributes
            .into_iter()
            .take(constraints::MAX_ATTRIBUTES)
            .collect()
    }

    fn drop_invalid_start(&self, tags: Vec<String>) -> Vec<String> {
        tags.into_iter()
            .filter(|tag| match tag.chars().next() {
                None => {
                    self.report(Diagnostic::error("Tag is empty and will be ignored."));
                    false
                }
                Some(first) if !first.is_ascii_lowercase() => {
                    self.report(Diagnostic::error(format!(
                        "Tag '{tag}' starts with an invalid character and will be ignored."
                    )));
                    false
                }
                Some(_) => true,
            })
            .collect()
    }

    fn replace_illegal_characters(&self, tags: Vec<String>) -> Vec<String> {
        self.rewrite(tags, "contains illegal characters", |tag| {
            tag.chars()
                .map(|c| if is_allowed_tag_char(c) { c } else { '_' })
                .collect()
        })
    }

    fn strip_trailing_colons(&self, tags: Vec<String>) -> Vec<String> {
        self.rewrite(tags, "ends with ':'", |tag| tag.trim_end_matches(':').to_string())
    }

    fn truncate(&self, tags: Vec<String>) -> Vec<String> {
        self.rewrite(tags, "is too long", |tag| {
            tag.chars().take(constraints::MAX_TAG_LENGTH).collect()
        })
    }

    fn drop_reserved_tag_keys(&self, tags: Vec<String>) -> Vec<String> {
        tags.into_iter()
            .filter(|tag| {
                let Some((key, _)) = tag.split_once(':') else {
                    return true;
                };
                let reserved = constraints::RESERVED_TAG_KEYS.contains(&key);
                if reserved {
                    self.report(Diagnostic::error(format!(
                        "'{key}' is a reserved tag key. Tag '{tag}' will be ignored."
                    )));
                }
                !reserved
            })
            .collect()
    }

    fn cap_tags(&self, mut tags: Vec<String>) -> Vec<String> {
        let excess = tags.len().saturating_sub(constraints::MAX_TAGS);
        if excess > 0 {
            self.report(Diagnostic::error(format!(
                "Number of tags exceeds the limit of {}. {excess} tag(s) will be ignored.",
                constraints::MAX_TAGS
            )));
            tags.truncate(constraints::MAX_TAGS);
        }
        tags
    }

    /// Apply `f` to every tag, warning for each tag it changed.
    fn rewrite(
        &self,
        tags: Vec<String>,
        reason: &str,
        f: impl Fn(&str) -> String,
    ) -> Vec<String> {
        tags.into_iter()
            .map(|tag| {
                let rewritten = f(&tag);
                if rewritten != tag {
                    self.report(Diagnostic::warning(format!(
                        "Tag '{tag}' {reason} and was changed to '{rewritten}'."
                    )));
                }
                rewritten
            })
            .collect()
    }
}

fn lowercase(tags: Vec<String>) -> Vec<String> {
    tags.into_iter().map(|tag| tag.to_lowercase()).collect()
}

fn is_allowed_tag_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | ':' | '.' | '/' | '-')
}

/// Replace every `.` past the allowed nesting depth with `_`.
fn escape_nesting(key: &str) -> String {
    let mut separators = 0;
    key.chars()
        .map(|c| {
            if c != '.' {
                return c;
            }
            separators += 1;
            if separators > constraints::MAX_NESTED_SEPARATORS {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_nesting_keeps_shallow_keys() {
        assert_eq!(escape_nesting("a.b.c"), "a.b.c");
        assert_eq!(escape_nesting("a.b.c.d.e.f.g.h.i"), "a.b.c.d.e.f.g.h.i");
        assert_eq!(escape_nesting("..."), "...");
    }

    #[test]
    fn escape_nesting_escapes_deep_keys() {
        assert_eq!(escape_nesting("a.b.c.d.e.f.g.h.i.j.k"), "a.b.c.d.e.f.g.h.i_j_k");
        assert_eq!(escape_nesting(".........."), "........__");
    }

    #[test]
    fn allowed_tag_characters() {
        for c in "az09_:./-".chars() {
            assert!(is_allowed_tag_char(c), "{c}");
        }
        for c in "A #é,".chars() {
            assert!(!is_allowed_tag_char(c), "{c}");
        }
    }
}

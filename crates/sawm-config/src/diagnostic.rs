// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config diagnostics: figment errors rendered through miette.
//!
//! Unknown keys get a Jaro-Winkler "did you mean" suggestion. Unknown keys
//! and type mismatches are pointed at in the TOML source when the offending
//! line can be found.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Below this similarity no suggestion is offered.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(sawm::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a key in this section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(sawm::config::invalid_type))]
    InvalidType {
        /// Dotted path, e.g. `queue.max_attempts`.
        key: String,
        detail: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(sawm::config::missing_key))]
    MissingKey { key: String },

    /// A value that parsed but breaks a cross-field or range rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(sawm::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(sawm::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// The TOML texts a figment was built from, keyed by display path.
struct Sources<'a>(&'a [(String, String)]);

impl Sources<'_> {
    /// Pick the source the error came from. With a single source (an inline
    /// string or an explicit `--config` file) that one is used directly.
    fn for_error(&self, error: &figment::Error) -> Option<&(String, String)> {
        let origin = error
            .metadata
            .as_ref()
            .and_then(|m| m.source.as_ref())
            .and_then(|s| match s {
                figment::Source::File(path) => Some(path.display().to_string()),
                _ => None,
            });
        match origin {
            Some(path) => self.0.iter().find(|(p, _)| *p == path),
            None if self.0.len() == 1 => self.0.first(),
            None => None,
        }
    }

    /// Span of `field` under `section` in the error's source file.
    fn locate(
        &self,
        error: &figment::Error,
        section: &[String],
        field: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some((path, content)) = self.for_error(error) else {
            return (None, None);
        };
        match find_key_offset(content, section, field) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            ),
            None => (None, None),
        }
    }
}

/// Flatten a figment error into one diagnostic per underlying failure.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let sources = Sources(toml_sources);
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = sources.locate(&error, &path, field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.to_string(),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((field, section)) => sources.locate(&error, section, field),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Byte offset of `field` inside the `[section]` table of `content`.
///
/// An empty section searches the top-level keys before the first header.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let header = section.first().map(|s| format!("[{s}]"));
    let mut in_section = header.is_none();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_section = header.as_deref() == Some(trimmed.trim_end());
        } else if in_section
            && let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }

    None
}

/// Closest valid key above [`SUGGESTION_THRESHOLD`].
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each diagnostic to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

//! Perceptual signs: lazy pointers into body faculties.
//!
//! Grammar (bit-exact): `%{<norm>}<id>?(<signifier>)` where `<id>` is
//! optional lowercase hex of at most 8 chars. The norm and signifier may
//! contain any character except their own closing delimiter.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Well-known norms. The router treats norms as an open set; these are the
/// ones the compiler emits.
pub mod norm {
    pub const FILE_LOCATION: &str = "file_location";
    pub const PROMPT_LOCATION: &str = "prompt_location";
    pub const SCRIPT_LOCATION: &str = "script_location";
    pub const SAVE_PATH: &str = "save_path";
    pub const TRUTH_VALUE: &str = "truth_value";
    pub const LITERAL: &str = "literal";
    pub const IN_MEMORY: &str = "in-memory";
}

/// A perceptual sign: `%{norm}id(signifier)`.
///
/// The sign is a pointer, not a value. It is transmuted to concrete data by
/// the perception router exactly once, during a sequence's MVP step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PerceptualSign {
    norm: String,
    id: Option<String>,
    signifier: String,
}

/// Errors from parsing a sign string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignParseError {
    #[error("sign must start with `%{{`")]
    MissingPrefix,
    #[error("unterminated norm (no closing `}}`)")]
    UnterminatedNorm,
    #[error("sign id must be lowercase hex of at most 8 chars, got `{0}`")]
    BadId(String),
    #[error("missing `(` after norm")]
    MissingSignifier,
    #[error("signifier must end with `)`")]
    UnterminatedSignifier,
}

impl PerceptualSign {
    pub fn new(norm: impl Into<String>, signifier: impl Into<String>) -> Self {
        Self {
            norm: norm.into(),
            id: None,
            signifier: signifier.into(),
        }
    }

    pub fn with_id(
        norm: impl Into<String>,
        id: impl Into<String>,
        signifier: impl Into<String>,
    ) -> Result<Self, SignParseError> {
        let id = id.into();
        if !is_valid_id(&id) {
            return Err(SignParseError::BadId(id));
        }
        Ok(Self {
            norm: norm.into(),
            id: Some(id),
            signifier: signifier.into(),
        })
    }

    /// Shorthand for `%{truth_value}(True)` / `%{truth_value}(False)`.
    pub fn truth(value: bool) -> Self {
        Self::new(norm::TRUTH_VALUE, if value { "True" } else { "False" })
    }

    pub fn norm(&self) -> &str {
        &self.norm
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The raw payload, without invoking any faculty.
    pub fn signifier(&self) -> &str {
        &self.signifier
    }

    /// Parse the canonical sign form. The whole input must be one sign.
    pub fn parse(input: &str) -> Result<Self, SignParseError> {
        let rest = input
            .strip_prefix("%{")
            .ok_or(SignParseError::MissingPrefix)?;
        let norm_end = rest.find('}').ok_or(SignParseError::UnterminatedNorm)?;
        let norm = &rest[..norm_end];
        let rest = &rest[norm_end + 1..];

        let paren = rest.find('(').ok_or(SignParseError::MissingSignifier)?;
        let id = &rest[..paren];
        if !id.is_empty() && !is_valid_id(id) {
            return Err(SignParseError::BadId(id.to_string()));
        }

        let rest = &rest[paren + 1..];
        let signifier = rest
            .strip_suffix(')')
            .ok_or(SignParseError::UnterminatedSignifier)?;

        Ok(Self {
            norm: norm.to_string(),
            id: (!id.is_empty()).then(|| id.to_string()),
            signifier: signifier.to_string(),
        })
    }

    /// Does `input` look like a sign? Cheap check used by annotation parsing.
    pub fn looks_like(input: &str) -> bool {
        input.starts_with("%{") && input.ends_with(')')
    }
}

fn is_valid_id(id: &str) -> bool {
    id.len() <= 8 && !id.is_empty() && id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

impl std::fmt::Display for PerceptualSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "%{{{}}}{}({})",
            self.norm,
            self.id.as_deref().unwrap_or(""),
            self.signifier
        )
    }
}

impl std::str::FromStr for PerceptualSign {
    type Err = SignParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Signs serialize as their canonical string form so repositories and
// snapshots stay human-readable.
impl Serialize for PerceptualSign {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PerceptualSign {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}


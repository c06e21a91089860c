use serde::{Deserialize, Serialize};

/// Default number of spaces per indent level
pub const DEFAULT_INDENTATION: u8 = 2;

/// Default number of blank lines between top-level declarations
pub const DEFAULT_NEWLINES_BETWEEN_DECLS: u8 = 2;

/// Layout strategy for conditional expressions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IfStyle {
    #[default]
    Indented,
    Hanging,
}

impl IfStyle {
    /// Only the exact token `hanging` selects [`IfStyle::Hanging`].
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("hanging") => IfStyle::Hanging,
            _ => IfStyle::Indented,
        }
    }
}

/// Bracket and spacing layout for tuple literals.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TupleStyle {
    Compact,
    #[default]
    Spaced,
}

impl TupleStyle {
    /// Only the exact token `compact` selects [`TupleStyle::Compact`].
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("compact") => TupleStyle::Compact,
            _ => TupleStyle::Spaced,
        }
    }
}

/// The option set handed to the engine for a single format request.
///
/// Fields are private: a config is built once from [`RawOptions`] and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatterConfig {
    indentation: u8,
    if_style: IfStyle,
    tuple_style: TupleStyle,
    newlines_between_decls: u8,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            indentation: DEFAULT_INDENTATION,
            if_style: IfStyle::default(),
            tuple_style: TupleStyle::default(),
            newlines_between_decls: DEFAULT_NEWLINES_BETWEEN_DECLS,
        }
    }
}

impl FormatterConfig {
    pub fn indentation(&self) -> u8 {
        self.indentation
    }

    pub fn if_style(&self) -> IfStyle {
        self.if_style
    }

    pub fn tuple_style(&self) -> TupleStyle {
        self.tuple_style
    }

    pub fn newlines_between_decls(&self) -> u8 {
        self.newlines_between_decls
    }
}

/// Option fields the control surface can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum OptionField {
    Indentation,
    IfStyle,
    TupleStyle,
    NewlinesBetweenDecls,
}

/// Option values exactly as the control surface holds them, unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    pub indentation: Option<String>,
    pub if_style: Option<String>,
    pub tuple_style: Option<String>,
    pub newlines_between_decls: Option<String>,
}

impl RawOptions {
    pub fn set(&mut self, field: OptionField, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            OptionField::Indentation => self.indentation = value,
            OptionField::IfStyle => self.if_style = value,
            OptionField::TupleStyle => self.tuple_style = value,
            OptionField::NewlinesBetweenDecls => self.newlines_between_decls = value,
        }
    }

    pub fn get(&self, field: OptionField) -> Option<&str> {
        match field {
            OptionField::Indentation => self.indentation.as_deref(),
            OptionField::IfStyle => self.if_style.as_deref(),
            OptionField::TupleStyle => self.tuple_style.as_deref(),
            OptionField::NewlinesBetweenDecls => self.newlines_between_decls.as_deref(),
        }
    }
}

/// Builds a [`FormatterConfig`] from raw option values.
///
/// Never fails. Every field is parsed on its own and anything malformed,
/// out of range or missing silently becomes the field's default.
pub fn build(raw: &RawOptions) -> FormatterConfig {
    FormatterConfig {
        indentation: positive_or(raw.indentation.as_deref(), DEFAULT_INDENTATION),
        if_style: IfStyle::from_raw(raw.if_style.as_deref()),
        tuple_style: TupleStyle::from_raw(raw.tuple_style.as_deref()),
        // 0 is treated like a missing value
        newlines_between_decls: positive_or(
            raw.newlines_between_decls.as_deref(),
            DEFAULT_NEWLINES_BETWEEN_DECLS,
        ),
    }
}

/// Anything outside `1..=255` becomes `default`.
fn positive_or(raw: Option<&str>, default: u8) -> u8 {
    raw.and_then(parse_leading_int)
        .and_then(|value| u8::try_from(value).ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

/// Parses the leading base-10 integer of `raw`, ignoring leading whitespace
/// and any trailing garbage (`"4px"` is 4). Returns `None` without digits.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

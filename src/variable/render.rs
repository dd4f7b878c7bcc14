//! Display-base formatting of leaf values.
//!
//! A format override reformats the displayed text without re-querying the
//! backend. The conversion is reversible: the parsed text is cached before
//! the first conversion and restored byte-for-byte on reset.

use super::VariableNode;
use strum_macros::{Display, EnumString};

/// Display base override for a numeric leaf value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum ValueFormat {
    /// The backend's own rendering.
    #[default]
    #[strum(serialize = "auto")]
    Auto,
    #[strum(serialize = "dec")]
    Decimal,
    #[strum(serialize = "hex")]
    Hex,
    #[strum(serialize = "oct")]
    Octal,
    /// Escaped character rendering of the low byte.
    #[strum(serialize = "char")]
    Ascii,
}

impl VariableNode {
    pub fn format(&self) -> ValueFormat {
        self.format
    }

    /// Change the display base. Applies only to values shaped like
    /// `<integer>` with an optional quoted annotation (`99 'c'`); pointers
    /// are exempt. Setting [`ValueFormat::Auto`] restores the originally
    /// parsed text exactly.
    pub fn set_format(&mut self, format: ValueFormat) {
        if format == self.format {
            return;
        }
        if format == ValueFormat::Auto {
            if let Some(original) = self.original_value.take() {
                self.value = original;
            }
            self.format = ValueFormat::Auto;
            return;
        }
        if self.pointer {
            return;
        }
        let Some(int) = convertible_int(self.raw_value()) else {
            return;
        };
        if self.original_value.is_none() {
            self.original_value = Some(self.value.clone());
        }
        self.value = format_int(int, format);
        self.format = format;
    }

    /// Install a freshly parsed value, re-applying any display-base
    /// override to the new text.
    pub(crate) fn set_value(&mut self, value: String) {
        self.original_value = None;
        self.value = value;
        if self.format != ValueFormat::Auto {
            let format = self.format;
            self.format = ValueFormat::Auto;
            self.set_format(format);
        }
    }
}

/// Parse values shaped like `<integer>[ '<annotation>']`. Anything else is
/// not convertible.
fn convertible_int(value: &str) -> Option<i128> {
    let value = value.trim();
    let (number, rest) = match value.find(' ') {
        Some(at) => (&value[..at], value[at + 1..].trim()),
        None => (value, ""),
    };
    if !rest.is_empty() && !is_quoted_annotation(rest) {
        return None;
    }
    let digits = number.strip_prefix('-').unwrap_or(number);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

fn is_quoted_annotation(text: &str) -> bool {
    (text.starts_with('\'') && text.len() >= 2 && text.ends_with('\''))
        || (text.starts_with('"') && text.len() >= 2 && text.ends_with('"'))
}

fn format_int(value: i128, format: ValueFormat) -> String {
    match format {
        ValueFormat::Auto | ValueFormat::Decimal => value.to_string(),
        ValueFormat::Hex => format!("0x{:08x}", value as u64),
        ValueFormat::Octal => format!("0{:o}", value as u64),
        ValueFormat::Ascii => escape_char((value as u64 & 0xff) as u8),
    }
}

fn escape_char(byte: u8) -> String {
    let escaped = match byte {
        0 => return "'\\000'".to_string(),
        0x07 => "\\a",
        0x08 => "\\b",
        0x09 => "\\t",
        0x0a => "\\n",
        0x0b => "\\v",
        0x0c => "\\f",
        0x0d => "\\r",
        b'\'' => "\\'",
        b'\\' => "\\\\",
        b if (0x20..0x7f).contains(&b) => {
            return format!("'{}'", b as char);
        }
        b => return format!("'\\{b:03o}'"),
    };
    format!("'{escaped}'")
}

//! Text format of the settings file.
//!
//! An INI file read and written with `rust-ini`: a `[General]` section of
//! `key = value` pairs, `#` or `;` comment lines. Keys are matched
//! case-insensitively and legacy names are translated on read; canonical
//! names are always written. Reserved characters in values are escaped on
//! write so every accepted value reads back unchanged.

use std::collections::BTreeMap;
use std::io;

use ini::{EscapePolicy, Ini, ParseOption, WriteOption};

use crate::error::CoreError;
use crate::settings::schema::{canonical_key, SettingsRecord};

/// Section every setting is written under.
pub const SECTION_NAME: &str = "General";

/// Parse settings text into canonical-key raw strings.
///
/// Keys outside any section are read as if they were in `General`. Other
/// sections and unknown keys are ignored so the file may carry unrelated
/// entries. A key repeated later in the file wins. Quotes are kept as part
/// of the value.
pub fn parse(text: &str) -> Result<BTreeMap<String, String>, CoreError> {
    let options = ParseOption {
        enabled_quote: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_str_opt(text, options).map_err(|e| CoreError::Parse {
        line: e.line,
        message: e.msg.to_string(),
    })?;

    let mut values = BTreeMap::new();
    for (section, properties) in ini.iter() {
        let in_general = match section {
            None => true,
            Some(name) => name.trim().eq_ignore_ascii_case(SECTION_NAME),
        };
        if !in_general {
            continue;
        }
        for (raw_key, raw_value) in properties.iter() {
            if let Some(key) = canonical_key(raw_key) {
                values.insert(key.to_string(), raw_value.trim().to_string());
            }
        }
    }

    Ok(values)
}

/// Render a record in schema order under the `[General]` section.
pub fn render(record: &SettingsRecord) -> io::Result<String> {
    let mut ini = Ini::new();
    for (key, value) in record.iter_schema_order() {
        ini.set_to(Some(SECTION_NAME), key.to_string(), value.to_string());
    }

    let mut out = Vec::new();
    ini.write_to_opt(
        &mut out,
        WriteOption {
            escape_policy: EscapePolicy::Reserved,
            kv_separator: " = ",
            ..WriteOption::default()
        },
    )?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

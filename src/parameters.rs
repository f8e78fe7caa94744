//! Transport-agnostic key/value parameters exchanged with the HTTP layer.
//!
//! Keys are dot-namespaced (`state`, `position.blinds`, `config.slatTime`, ...).
//! Values are always text; the typed accessors below decode and encode the
//! four value shapes used by the device handlers. Decoding returns `None` for
//! missing, malformed or out-of-range text, encoding never fails.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter bag. Ordered so that serialized output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Boolean state, `"on"` or `"off"`.
    pub fn get_state(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            "on" => Some(true),
            "off" => Some(false),
            _ => None,
        }
    }

    pub fn set_state(&mut self, name: &str, value: bool) {
        self.insert(name, if value { "on" } else { "off" });
    }

    /// Raw byte in decimal, `0..=255`.
    pub fn get_byte(&self, name: &str) -> Option<u8> {
        parse_decimal(self.get(name)?, 3).and_then(|v| u8::try_from(v).ok())
    }

    pub fn set_byte(&mut self, name: &str, value: u8) {
        self.insert(name, value.to_string());
    }

    /// Percentage with at most two decimal digits, `0..=99`.
    pub fn get_percentage(&self, name: &str) -> Option<u8> {
        parse_decimal(self.get(name)?, 2).map(|v| v as u8)
    }

    /// Values above 99 are written as 99; 0xff is the device "on" sentinel and
    /// is reported through [`Parameters::set_state`] instead.
    pub fn set_percentage(&mut self, name: &str, value: u8) {
        self.insert(name, value.min(99).to_string());
    }

    /// 16 bit word in decimal, `0..=65535`.
    pub fn get_word(&self, name: &str) -> Option<u16> {
        parse_decimal(self.get(name)?, 5).and_then(|v| u16::try_from(v).ok())
    }

    pub fn set_word(&mut self, name: &str, value: u16) {
        self.insert(name, value.to_string());
    }

    /// 32 bit value in decimal, used for four byte configuration registers.
    pub fn get_long(&self, name: &str) -> Option<u32> {
        parse_decimal(self.get(name)?, 10).and_then(|v| u32::try_from(v).ok())
    }

    pub fn set_long(&mut self, name: &str, value: u32) {
        self.insert(name, value.to_string());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// Plain ASCII digits only: no sign, no whitespace, bounded length.
fn parse_decimal(text: &str, max_digits: usize) -> Option<u64> {
    if text.is_empty() || text.len() > max_digits {
        return None;
    }
    text.bytes().try_fold(0u64, |acc, ch| {
        ch.is_ascii_digit().then(|| acc * 10 + u64::from(ch - b'0'))
    })
}

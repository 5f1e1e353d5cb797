use std::fmt;

use super::*;

/// A TXT record: a sequence of character strings.
///
/// DNS-SD uses each string as an `attribute=value` pair (RFC 1464,
/// RFC 6763 section 6). A string without `=` is a boolean attribute.
/// Strings are never empty: packing rejects them and parsing skips them.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TxtResource {
    pub txt: Vec<String>,
}

impl fmt::Display for TxtResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.txt.iter().map(|s| format!("{s:?}")).collect();
        write!(f, "{}", quoted.join(" "))
    }
}

impl TxtResource {
    /// Builds the strings from attribute/value pairs, in order.
    pub fn from_attributes<K, V>(attributes: &[(K, V)]) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut txt = Vec::with_capacity(attributes.len());
        for (key, value) in attributes {
            let (key, value) = (key.as_ref(), value.as_ref());
            if key.is_empty() || key.contains('=') {
                return Err(Error::ErrInvalidAttribute(key.to_owned()));
            }
            txt.push(format!("{key}={value}"));
        }
        Ok(TxtResource { txt })
    }

    /// The strings split into attribute/value pairs, in wire order.
    pub fn attributes(&self) -> Result<Vec<(String, String)>> {
        self.txt.iter().map(|s| parse_attribute(s)).collect()
    }

    pub(crate) fn pack(&self, w: &mut Writer) -> Result<()> {
        if self.txt.is_empty() {
            // RFC 6763 section 6.1: an empty TXT record is a single zero byte.
            w.write_u8(0);
            return Ok(());
        }
        if self.txt.iter().any(String::is_empty) {
            return Err(Error::ErrEmptyTxtString);
        }
        w.write_strings(&self.txt)
    }

    pub(crate) fn unpack(r: &mut Reader<'_>) -> Result<Self> {
        Ok(TxtResource {
            txt: r.read_strings()?,
        })
    }
}

/// Splits `attribute=value` at the first `=`.
///
/// The attribute name must not be empty.
pub fn parse_attribute(s: &str) -> Result<(String, String)> {
    let (key, value) = match s.split_once('=') {
        Some((key, value)) => (key, value),
        None => (s, ""),
    };
    if key.is_empty() {
        return Err(Error::ErrInvalidAttribute(s.to_owned()));
    }
    Ok((key.to_owned(), value.to_owned()))
}

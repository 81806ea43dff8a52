//! RFC 3986 percent-encoding used by the signer.
//!
//! Every octet outside the unreserved set `[A-Za-z0-9-._~]` becomes `%XX` with
//! uppercase hex digits. The input is first transcoded to bytes in the
//! requested [`Charset`].

use std::fmt;

use thiserror::Error;

/// Character set used to turn a string into octets before escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// Transcodes `value` into this charset's byte representation.
    pub fn encode(self, value: &str) -> Result<Vec<u8>, EncodingError> {
        match self {
            Charset::Utf8 => Ok(value.as_bytes().to_vec()),
            Charset::Iso8859_1 => value
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| self.unmappable(c)))
                .collect(),
            Charset::UsAscii => value
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        Ok(c as u8)
                    } else {
                        Err(self.unmappable(c))
                    }
                })
                .collect(),
        }
    }

    fn unmappable(self, character: char) -> EncodingError {
        EncodingError::Unmappable {
            charset: self,
            character,
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Charset::Utf8 => "UTF-8",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::UsAscii => "US-ASCII",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("character {character:?} cannot be represented in {charset}")]
    Unmappable { charset: Charset, character: char },
}

/// Percent-encodes `value` after transcoding it with `charset`.
pub fn percent_encode(value: &str, charset: Charset) -> Result<String, EncodingError> {
    let bytes = charset.encode(value)?;
    Ok(urlencoding::encode_binary(&bytes).into_owned())
}

/// Like [`percent_encode`], with an absent value treated as the empty string.
pub fn percent_encode_opt(value: Option<&str>, charset: Charset) -> Result<String, EncodingError> {
    percent_encode(value.unwrap_or_default(), charset)
}

/// UTF-8 percent-encoding. Cannot fail since every `str` is valid UTF-8.
pub fn form_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

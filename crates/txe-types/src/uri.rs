use std::fmt;

use crate::error::UriError;

/// The identifier scheme. Retained transaction artifacts on disk carry it
/// as a filename prefix, which is what the retention sweep filters on.
pub const SCHEME: &str = "tcm";

/// Item type assumed when the type segment is absent.
const DEFAULT_ITEM_TYPE: u32 = 16;

/// Structured identifier for an item moving through the exchange.
///
/// The textual form is `tcm:<pub>-<item>[-<type>][-v<version>]`, where an
/// absent type means [type 16](DEFAULT_ITEM_TYPE) and an absent version
/// means version 0. The whole input must match; embedded or suffixed
/// matches (a state *filename*, say) are rejected, which is what lets the
/// store fall back to plain-name resolution for anything that is not an
/// identifier.
///
/// A valid `ItemUri` is either the all-zero null identifier or has
/// `item_id > 0` and `item_type > 0`. `publication_id` 0 is an ordinary
/// publication; only the fully zero value is special.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemUri {
    publication_id: u32,
    item_id: u32,
    item_type: u32,
    version: u32,
}

impl ItemUri {
    /// Build an identifier from raw field values, applying the same
    /// validation as [`parse`](Self::parse).
    pub fn new(
        publication_id: u32,
        item_id: u32,
        item_type: u32,
        version: u32,
    ) -> Result<Self, UriError> {
        Self::from_fields(publication_id, item_id, item_type, version).ok_or_else(|| {
            UriError::OutOfRange(format!(
                "{}:{}-{}-{}-v{}",
                SCHEME, publication_id, item_id, item_type, version
            ))
        })
    }

    /// The all-zero null identifier, `tcm:0-0-0`.
    pub fn null() -> Self {
        Self {
            publication_id: 0,
            item_id: 0,
            item_type: 0,
            version: 0,
        }
    }

    /// Parse the textual form.
    pub fn parse(text: &str) -> Result<Self, UriError> {
        let malformed = || UriError::Malformed(text.to_string());

        let rest = text
            .strip_prefix(SCHEME)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(malformed)?;

        let segments: Vec<&str> = rest.split('-').collect();
        let (publication_id, item_id, item_type, version) = match segments.as_slice() {
            [p, i] => (
                parse_field(p, text)?,
                parse_field(i, text)?,
                DEFAULT_ITEM_TYPE,
                0,
            ),
            [p, i, third] => {
                // The third segment is either the type or an early
                // version marker ("tcm:2-255-v3" means type 16).
                let (item_type, version) = match third.strip_prefix('v') {
                    Some(v) => (DEFAULT_ITEM_TYPE, parse_field(v, text)?),
                    None => (parse_field(third, text)?, 0),
                };
                (
                    parse_field(p, text)?,
                    parse_field(i, text)?,
                    item_type,
                    version,
                )
            }
            [p, i, t, fourth] => {
                let v = fourth.strip_prefix('v').ok_or_else(malformed)?;
                (
                    parse_field(p, text)?,
                    parse_field(i, text)?,
                    parse_field(t, text)?,
                    parse_field(v, text)?,
                )
            }
            _ => return Err(malformed()),
        };

        Self::from_fields(publication_id, item_id, item_type, version)
            .ok_or_else(|| UriError::OutOfRange(text.to_string()))
    }

    /// Whether the text parses as a valid identifier.
    pub fn is_valid(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    /// Whether this is the all-zero null identifier.
    pub fn is_null(&self) -> bool {
        self.publication_id == 0 && self.item_id == 0 && self.item_type == 0 && self.version == 0
    }

    pub fn publication_id(&self) -> u32 {
        self.publication_id
    }

    pub fn item_id(&self) -> u32 {
        self.item_id
    }

    pub fn item_type(&self) -> u32 {
        self.item_type
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn from_fields(
        publication_id: u32,
        item_id: u32,
        item_type: u32,
        version: u32,
    ) -> Option<Self> {
        let uri = Self {
            publication_id,
            item_id,
            item_type,
            version,
        };
        if uri.is_null() || (item_id > 0 && item_type > 0) {
            Some(uri)
        } else {
            None
        }
    }
}

/// A single numeric segment: ASCII digits only (no sign, no whitespace),
/// fitting in a `u32`.
fn parse_field(segment: &str, uri: &str) -> Result<u32, UriError> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UriError::Malformed(uri.to_string()));
    }
    segment
        .parse()
        .map_err(|_| UriError::OutOfRange(uri.to_string()))
}

impl fmt::Display for ItemUri {
    /// Reconstructs the canonical textual form: the version segment
    /// appears only when the version is positive, and the type segment is
    /// omitted when the type is the default 16 and no version follows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version > 0 {
            write!(
                f,
                "{}:{}-{}-{}-v{}",
                SCHEME, self.publication_id, self.item_id, self.item_type, self.version
            )
        } else if self.item_type == DEFAULT_ITEM_TYPE {
            write!(f, "{}:{}-{}", SCHEME, self.publication_id, self.item_id)
        } else {
            write!(
                f,
                "{}:{}-{}-{}",
                SCHEME, self.publication_id, self.item_id, self.item_type
            )
        }
    }
}

impl fmt::Debug for ItemUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemUri({})", self)
    }
}

//! Codec bridge between structured values and wire bytes.
//!
//! Two formats are supported: JSON through `serde_json` and XML through
//! `quick-xml`'s serde integration.

use crate::{Error, MediaType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Wire format of a structured body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    /// Format handling the given media type, if any.
    pub fn for_media_type(media: &MediaType) -> Option<Self> {
        if media.is_json() {
            Some(Format::Json)
        } else if media.is_xml() {
            Some(Format::Xml)
        } else {
            None
        }
    }

    /// Canonical media type of this format.
    pub fn media_type(&self) -> MediaType {
        match self {
            Format::Json => MediaType::json(),
            Format::Xml => MediaType::xml(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("json"),
            Format::Xml => f.write_str("xml"),
        }
    }
}

/// Serialize a value in the given format.
pub fn encode<T: Serialize + ?Sized>(value: &T, format: Format) -> Result<Vec<u8>, Error> {
    match format {
        Format::Json => serde_json::to_vec(value)
            .map_err(|e| Error::NotMarshallable(format!("JSON serialization failed: {}", e))),
        Format::Xml => quick_xml::se::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| Error::NotMarshallable(format!("XML serialization failed: {}", e))),
    }
}

/// Deserialize a value from bytes in the given format.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<T, Error> {
    match format {
        Format::Json => serde_json::from_slice(bytes)
            .map_err(|e| Error::UnreadableBody(format!("invalid JSON body: {}", e))),
        Format::Xml => quick_xml::de::from_reader(bytes)
            .map_err(|e| Error::UnreadableBody(format!("invalid XML body: {}", e))),
    }
}

/// A value an operation returns for marshalling through the codec bridge.
pub trait Marshallable: Send {
    fn marshal(&self, format: Format) -> Result<Vec<u8>, Error>;
}

impl<T: Serialize + Send> Marshallable for T {
    fn marshal(&self, format: Format) -> Result<Vec<u8>, Error> {
        encode(self, format)
    }
}

//! Media types and content negotiation.
//!
//! Request bodies are decoded in the format negotiated from the operation's
//! consumed types and the body's `Content-Type`; response entities are encoded
//! in the format negotiated from the produced types and the `Accept` header.
//!
//! ```
//! use keystone_core::media::{choose_encode_media, Accept, MediaType, negotiate_media_type};
//!
//! let accept = Accept::parse("application/xml;q=0.5, application/json");
//! let available = vec![MediaType::xml(), MediaType::json()];
//! assert_eq!(negotiate_media_type(&accept, &available), Some(&MediaType::json()));
//!
//! // No preference: the first allowed entry wins.
//! assert_eq!(choose_encode_media(None, None), MediaType::xml());
//! ```

use crate::{Error, Format};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Media types accepted or produced when an operation declares none.
pub fn default_media_types() -> Vec<MediaType> {
    vec![MediaType::xml(), MediaType::json()]
}

/// Represents a media type (MIME type) with optional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// The type (e.g., "application", "text")
    pub type_: String,
    /// The subtype (e.g., "json", "xml")
    pub subtype: String,
    /// Optional parameters (e.g., charset=utf-8)
    pub params: HashMap<String, String>,
}

impl MediaType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// `application/json`
    pub fn json() -> Self {
        Self::new("application", "json")
    }

    /// `application/xml`
    pub fn xml() -> Self {
        Self::new("application", "xml")
    }

    /// `text/plain`
    pub fn plain_text() -> Self {
        Self::new("text", "plain")
    }

    /// `application/octet-stream`
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// `application/x-www-form-urlencoded`
    pub fn form_urlencoded() -> Self {
        Self::new("application", "x-www-form-urlencoded")
    }

    /// `multipart/form-data`
    pub fn multipart_form_data() -> Self {
        Self::new("multipart", "form-data")
    }

    /// `*/*`
    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse a media type from a string (without quality value).
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split(';');

        let type_subtype = parts.next()?.trim();
        let (type_, subtype) = type_subtype.split_once('/')?;
        let type_ = type_.trim().to_lowercase();
        let subtype = subtype.trim().to_lowercase();
        if type_.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut params = HashMap::new();
        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                let key = key.trim().to_lowercase();
                // Skip quality parameter
                if key != "q" {
                    params.insert(key, value.trim().trim_matches('"').to_string());
                }
            }
        }

        Some(Self {
            type_,
            subtype,
            params,
        })
    }

    /// Check if this media type matches another (considering wildcards).
    ///
    /// Parameters are ignored.
    pub fn matches(&self, other: &MediaType) -> bool {
        let type_matches = self.type_ == "*" || other.type_ == "*" || self.type_ == other.type_;
        let subtype_matches =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        type_matches && subtype_matches
    }

    /// Same type and subtype, ignoring parameters and wildcards.
    pub fn essence_eq(&self, other: &MediaType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }

    pub fn is_any(&self) -> bool {
        self.type_ == "*" && self.subtype == "*"
    }

    /// `application/json` or any `+json` suffix type.
    pub fn is_json(&self) -> bool {
        self.subtype == "json" || self.subtype.ends_with("+json")
    }

    /// `application/xml`, `text/xml` or any `+xml` suffix type.
    pub fn is_xml(&self) -> bool {
        self.subtype == "xml" || self.subtype.ends_with("+xml")
    }

    /// Get the full MIME type string.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Get the full MIME type string with parameters.
    pub fn to_header_value(&self) -> String {
        let mut result = self.mime_type();
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort();
        for (key, value) in params {
            result.push_str(&format!("; {}={}", key, value));
        }
        result
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_header_value())
    }
}

/// Represents a parsed `Accept` header with quality values.
#[derive(Debug, Clone, Default)]
pub struct Accept {
    /// Media types with their quality values, sorted by preference.
    pub media_types: Vec<(MediaType, f32)>,
}

impl Accept {
    /// An Accept header that accepts anything.
    pub fn new() -> Self {
        Self {
            media_types: vec![(MediaType::any(), 1.0)],
        }
    }

    /// Parse an Accept header string.
    ///
    /// ```
    /// use keystone_core::media::Accept;
    ///
    /// let accept = Accept::parse("application/json, text/html;q=0.9, */*;q=0.1");
    /// assert_eq!(accept.media_types.len(), 3);
    /// ```
    pub fn parse(header: &str) -> Self {
        let mut media_types: Vec<(MediaType, f32)> = header
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                let (media_part, quality) = Self::extract_quality(part);
                MediaType::parse(media_part).map(|mt| (mt, quality))
            })
            .collect();

        // Highest quality first, then most specific
        media_types.sort_by(|a, b| match b.1.partial_cmp(&a.1) {
            Some(Ordering::Equal) | None => Self::specificity(&b.0).cmp(&Self::specificity(&a.0)),
            Some(ord) => ord,
        });

        Self { media_types }
    }

    fn extract_quality(s: &str) -> (&str, f32) {
        // Offsets come from `s` itself so slicing stays on char boundaries.
        let mut from = 0;
        while let Some(found) = s[from..].find(';') {
            let at = from + found;
            let param = s[at + 1..].split(';').next().unwrap_or_default();
            if let Some((key, value)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("q") {
                    let quality = value.trim().parse::<f32>().unwrap_or(1.0).clamp(0.0, 1.0);
                    return (&s[..at], quality);
                }
            }
            from = at + 1;
        }
        (s, 1.0)
    }

    fn specificity(mt: &MediaType) -> u8 {
        let mut score = 0u8;
        if mt.type_ != "*" {
            score += 2;
        }
        if mt.subtype != "*" {
            score += 1;
        }
        score
    }

    /// Check if a media type is acceptable.
    pub fn accepts(&self, media_type: &MediaType) -> bool {
        self.quality_for(media_type) > 0.0
    }

    /// Get the quality value for a specific media type.
    pub fn quality_for(&self, media_type: &MediaType) -> f32 {
        self.media_types
            .iter()
            .find(|(mt, _)| mt.matches(media_type))
            .map(|(_, quality)| *quality)
            .unwrap_or(0.0)
    }

    /// Get the preferred media type from this Accept header.
    pub fn preferred(&self) -> Option<&MediaType> {
        self.media_types.first().map(|(mt, _)| mt)
    }
}

/// Negotiate the best media type from available options.
///
/// On equal quality and specificity the earlier entry of `available` wins.
pub fn negotiate_media_type<'a>(
    accept: &Accept,
    available: &'a [MediaType],
) -> Option<&'a MediaType> {
    let mut best: Option<(&'a MediaType, f32, u8)> = None;

    for available_mt in available {
        let quality = accept.quality_for(available_mt);
        if quality <= 0.0 {
            continue;
        }
        let specificity = Accept::specificity(available_mt);
        match &best {
            Some((_, best_q, best_s)) if quality < *best_q || (quality == *best_q && specificity <= *best_s) => {}
            _ => best = Some((available_mt, quality, specificity)),
        }
    }

    best.map(|(mt, _, _)| mt)
}

/// Choose the format a request body is decoded with.
///
/// The body's content type must appear in the consumed types (default XML and
/// JSON). Without a content type JSON is preferred when allowed, otherwise the
/// first consumed type decides.
pub fn choose_decode_format(
    consumes: Option<&[MediaType]>,
    content_type: Option<&str>,
) -> Result<Format, Error> {
    let defaults;
    let allowed = match consumes {
        Some(types) if !types.is_empty() => types,
        _ => {
            defaults = default_media_types();
            &defaults[..]
        }
    };

    match content_type {
        Some(raw) => {
            let media = MediaType::parse(raw)
                .ok_or_else(|| Error::InvalidContentType(raw.to_string()))?;
            if !allowed.iter().any(|a| a.matches(&media)) {
                return Err(Error::InvalidContentType(format!(
                    "{} is not one of the accepted types",
                    media.mime_type()
                )));
            }
            Format::for_media_type(&media).ok_or_else(|| {
                Error::InvalidContentType(format!("no codec for {}", media.mime_type()))
            })
        }
        None => {
            if allowed.iter().any(MediaType::is_json) {
                return Ok(Format::Json);
            }
            allowed
                .iter()
                .find_map(Format::for_media_type)
                .ok_or_else(|| Error::InvalidContentType("no decodable type accepted".into()))
        }
    }
}

/// Choose the media type a response entity is encoded as.
///
/// The `Accept` header wins when it matches one of the produced types
/// (default XML and JSON); otherwise the first produced type is used.
pub fn choose_encode_media(produces: Option<&[MediaType]>, accept: Option<&str>) -> MediaType {
    let defaults;
    let allowed = match produces {
        Some(types) if !types.is_empty() => types,
        _ => {
            defaults = default_media_types();
            &defaults[..]
        }
    };

    let negotiated = accept
        .map(Accept::parse)
        .and_then(|accept| negotiate_media_type(&accept, allowed).cloned());

    negotiated
        .or_else(|| allowed.first().cloned())
        .unwrap_or_else(MediaType::xml)
}

// Marshalling of operation results into responses

use crate::media::choose_encode_media;
use crate::{ContentPart, Error, Format, HttpResponse, Marshallable, MediaType};
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::io::Read;

/// The value an operation produced, before marshalling.
pub enum Reply {
    /// Nothing: an empty 200 response
    Empty,
    /// Opaque bytes
    Bytes(Bytes),
    /// An opaque body read to completion
    Stream(Box<dyn Read + Send>),
    /// Text in the first produced media type
    Text(String),
    /// A marshalled scalar, always `text/plain`
    Scalar(String),
    /// A fully formed content part
    Content(ContentPart),
    /// A fully formed response
    Response(HttpResponse),
    /// A structured value encoded in the negotiated format
    Entity(Box<dyn Marshallable>),
}

impl Reply {
    pub fn stream<R: Read + Send + 'static>(reader: R) -> Self {
        Reply::Stream(Box::new(reader))
    }

    pub fn entity<T: Serialize + Send + 'static>(value: T) -> Self {
        Reply::Entity(Box::new(value))
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Empty => f.write_str("Empty"),
            Reply::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Reply::Stream(_) => f.write_str("Stream"),
            Reply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Reply::Scalar(text) => f.debug_tuple("Scalar").field(text).finish(),
            Reply::Content(part) => f.debug_tuple("Content").field(part).finish(),
            Reply::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Reply::Entity(_) => f.write_str("Entity"),
        }
    }
}

/// Marks a serializable value for marshalling through the codec bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity<T>(pub T);

/// Conversion of an operation's return value into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply {
        Reply::Empty
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply {
        Reply::Text(self)
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply {
        Reply::Text(self.to_string())
    }
}

impl IntoReply for Vec<u8> {
    fn into_reply(self) -> Reply {
        Reply::Bytes(Bytes::from(self))
    }
}

impl IntoReply for Bytes {
    fn into_reply(self) -> Reply {
        Reply::Bytes(self)
    }
}

impl IntoReply for ContentPart {
    fn into_reply(self) -> Reply {
        Reply::Content(self)
    }
}

impl IntoReply for HttpResponse {
    fn into_reply(self) -> Reply {
        Reply::Response(self)
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        match self {
            Some(value) => value.into_reply(),
            None => Reply::Empty,
        }
    }
}

impl<T: Serialize + Send + 'static> IntoReply for Entity<T> {
    fn into_reply(self) -> Reply {
        Reply::Entity(Box::new(self.0))
    }
}

macro_rules! impl_scalar_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                fn into_reply(self) -> Reply {
                    Reply::Scalar(self.to_string())
                }
            }
        )*
    };
}

impl_scalar_reply!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char
);

/// Turn a reply into the outbound response.
///
/// `produces` are the operation's produced media types, `accept` the raw
/// `Accept` header of the request.
pub fn produce_response(
    reply: Reply,
    produces: Option<&[MediaType]>,
    accept: Option<&str>,
) -> Result<HttpResponse, Error> {
    let first_produced = || produces.and_then(|types| types.first()).map(MediaType::to_header_value);

    match reply {
        Reply::Empty => Ok(HttpResponse::empty()),
        Reply::Bytes(bytes) => Ok(HttpResponse::ok().with_content(
            first_produced().unwrap_or_else(|| MediaType::octet_stream().mime_type()),
            bytes,
        )),
        Reply::Stream(mut reader) => {
            let mut body = Vec::new();
            reader.read_to_end(&mut body).map_err(Error::internal_with)?;
            Ok(HttpResponse::ok().with_content(
                first_produced().unwrap_or_else(|| MediaType::octet_stream().mime_type()),
                body,
            ))
        }
        Reply::Text(text) => Ok(HttpResponse::ok().with_content(
            first_produced().unwrap_or_else(|| MediaType::plain_text().mime_type()),
            text,
        )),
        Reply::Scalar(text) => {
            Ok(HttpResponse::ok().with_content(MediaType::plain_text().mime_type(), text))
        }
        Reply::Content(part) => Ok(HttpResponse::from_part(part)),
        Reply::Response(response) => Ok(response),
        Reply::Entity(entity) => {
            let media = choose_encode_media(produces, accept);
            let format = Format::for_media_type(&media).ok_or_else(|| {
                Error::NotMarshallable(format!("no codec produces {}", media.mime_type()))
            })?;
            let body = entity.marshal(format)?;
            Ok(HttpResponse::ok().with_content(media.to_header_value(), body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Greeting {
        text: String,
    }

    fn greeting() -> Reply {
        Entity(Greeting {
            text: "hi".into(),
        })
        .into_reply()
    }

    #[test]
    fn test_bytes_default_to_octet_stream() {
        let response = produce_response(vec![1u8, 2, 3].into_reply(), None, None).unwrap();
        assert_eq!(response.content_type(), Some("application/octet-stream"));
        assert_eq!(response.body_ref(), &[1, 2, 3]);

        let produces = [MediaType::new("image", "png")];
        let response = produce_response(vec![1u8].into_reply(), Some(&produces), None).unwrap();
        assert_eq!(response.content_type(), Some("image/png"));
    }

    #[test]
    fn test_stream_is_read_to_completion() {
        let reply = Reply::stream(std::io::Cursor::new(b"streamed".to_vec()));
        let response = produce_response(reply, None, None).unwrap();
        assert_eq!(response.body_ref(), b"streamed");
        assert_eq!(response.content_type(), Some("application/octet-stream"));
    }

    #[test]
    fn test_text_uses_first_produced_type() {
        let response = produce_response("hello".into_reply(), None, None).unwrap();
        assert_eq!(response.content_type(), Some("text/plain"));

        let produces = [MediaType::new("text", "html")];
        let response = produce_response("<b>hi</b>".into_reply(), Some(&produces), None).unwrap();
        assert_eq!(response.content_type(), Some("text/html"));
    }

    #[test]
    fn test_scalar_is_plain_text() {
        let produces = [MediaType::json()];
        let response = produce_response(42u32.into_reply(), Some(&produces), None).unwrap();
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.body_ref(), b"42");
    }

    #[test]
    fn test_entity_negotiation() {
        let response = produce_response(greeting(), None, Some("application/json")).unwrap();
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body_ref(), br#"{"text":"hi"}"#);

        let response = produce_response(greeting(), None, None).unwrap();
        assert_eq!(response.content_type(), Some("application/xml"));
        assert_eq!(response.body_ref(), b"<Greeting><text>hi</text></Greeting>");
    }

    #[test]
    fn test_entity_without_codec_is_not_marshallable() {
        let produces = [MediaType::new("text", "csv")];
        let err = produce_response(greeting(), Some(&produces), None).unwrap_err();
        assert!(matches!(err, Error::NotMarshallable(_)));
    }

    #[test]
    fn test_none_and_unit_are_empty() {
        let response = produce_response(Option::<String>::None.into_reply(), None, None).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());

        let response = produce_response(().into_reply(), None, None).unwrap();
        assert_eq!(response, HttpResponse::empty());
    }

    #[test]
    fn test_ready_responses_pass_through() {
        let ready = HttpResponse::new(201).with_header("Location", "/orders/1");
        let response = produce_response(ready.clone().into_reply(), None, None).unwrap();
        assert_eq!(response, ready);

        let part = ContentPart::empty()
            .with_header("Content-Type", "text/csv")
            .with_body("a,b");
        let response = produce_response(part.into_reply(), None, None).unwrap();
        assert_eq!(response.content_type(), Some("text/csv"));
        assert_eq!(response.headers.get("Content-Length"), Some(&"3".to_string()));
    }
}

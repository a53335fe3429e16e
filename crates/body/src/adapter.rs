//! Request adapter.
//!
//! Decoded results are merged onto the request through a small capability
//! trait instead of a concrete request type, so bare `http` requests and
//! framework wrappers share the same attachment path. The provided impl
//! stores the [`ParsedBody`] in the request extensions.

use http::Request;

use crate::value::{BodyValue, FileMap, ParsedBody};

/// Capability of carrying a parsed body.
pub trait AttachBody {
    /// Merges the decode result onto the request.
    fn attach_body(&mut self, parsed: ParsedBody);

    /// The attached result, if any.
    fn parsed_body(&self) -> Option<&ParsedBody>;

    fn has_parsed_body(&self) -> bool {
        self.parsed_body().is_some()
    }

    /// The decoded body value; for multipart this is the field map side.
    fn body_value(&self) -> Option<&BodyValue> {
        self.parsed_body().map(ParsedBody::value)
    }

    /// The file map of a multipart body, kept separate from the fields.
    fn body_files(&self) -> Option<&FileMap> {
        self.parsed_body().and_then(ParsedBody::files)
    }
}

impl<B> AttachBody for Request<B> {
    fn attach_body(&mut self, parsed: ParsedBody) {
        self.extensions_mut().insert(parsed);
    }

    fn parsed_body(&self) -> Option<&ParsedBody> {
        self.extensions().get::<ParsedBody>()
    }
}

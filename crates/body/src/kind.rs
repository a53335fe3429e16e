//! Content-type classification.
//!
//! Classification is ordered and first-match-wins: json, then urlencoded
//! form, then text (including XML), then multipart. A kind only matches when
//! it is enabled in the options, and a missing or unparseable `Content-Type`
//! header classifies as no kind at all.

use std::fmt;

use http::HeaderMap;
use http::header::CONTENT_TYPE;
use mime::Mime;

use crate::options::BodyOptions;

/// Media types decoded by the json codec.
const JSON_MEDIA_TYPES: [&str; 4] = [
    "application/json",
    "application/json-patch+json",
    "application/vnd.api+json",
    "application/csp-report",
];

/// The logical category a request body is decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Form,
    Text,
    Multipart,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentKind::Json => "json",
            ContentKind::Form => "form",
            ContentKind::Text => "text",
            ContentKind::Multipart => "multipart",
        };
        f.write_str(name)
    }
}

/// Picks the content kind for a request, `None` when nothing applies.
pub fn classify(headers: &HeaderMap, options: &BodyOptions) -> Option<ContentKind> {
    let media_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())?;

    if options.json_enabled() && is_json(&media_type) {
        Some(ContentKind::Json)
    } else if options.urlencoded_enabled() && is_urlencoded(&media_type) {
        Some(ContentKind::Form)
    } else if options.text_enabled() && is_text(&media_type) {
        Some(ContentKind::Text)
    } else if options.multipart_enabled() && media_type.type_() == mime::MULTIPART {
        Some(ContentKind::Multipart)
    } else {
        None
    }
}

fn is_json(media_type: &Mime) -> bool {
    JSON_MEDIA_TYPES.contains(&media_type.essence_str())
}

fn is_urlencoded(media_type: &Mime) -> bool {
    media_type.type_() == mime::APPLICATION && media_type.subtype() == mime::WWW_FORM_URLENCODED
}

fn is_text(media_type: &Mime) -> bool {
    media_type.type_() == mime::TEXT
        || media_type.suffix() == Some(mime::XML)
        || (media_type.type_() == mime::APPLICATION && media_type.subtype() == mime::XML)
}

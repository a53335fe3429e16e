//! Scalar codecs: json, urlencoded form and plain text.
//!
//! Each codec collects the body through [`Limited`] so the per-kind size
//! limit is enforced while the bytes are read, then hands the collected
//! buffer to the matching deserializer.

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use tracing::trace;

use crate::body::SharedBody;
use crate::error::{BodyError, BoxError};
use crate::kind::ContentKind;
use crate::options::{FormOptions, FormStyle, JsonOptions, TextOptions};
use crate::value::{BodyValue, ParsedBody};

pub(super) async fn json<B>(
    body: &SharedBody<B>,
    options: JsonOptions,
    encoding: &str,
) -> Result<ParsedBody, BodyError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    ensure_utf8(encoding)?;
    let raw = collect(body, ContentKind::Json, options.limit).await?;

    if options.strict && !starts_with_object_or_array(&raw) {
        return Err(BodyError::malformed(
            ContentKind::Json,
            "strict mode requires a top-level object or array",
        ));
    }

    let value: Value =
        serde_json::from_slice(&raw).map_err(|e| BodyError::malformed(ContentKind::Json, e))?;

    Ok(ParsedBody::new(BodyValue::Json(value), options.include_unparsed.then(|| raw.clone())))
}

pub(super) async fn form<B>(
    body: &SharedBody<B>,
    options: FormOptions,
    encoding: &str,
) -> Result<ParsedBody, BodyError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    ensure_utf8(encoding)?;
    let raw = collect(body, ContentKind::Form, options.limit).await?;

    let payload = std::str::from_utf8(&raw)
        .map_err(|_| BodyError::malformed(ContentKind::Form, "body is not valid utf-8"))?;
    let value = match options.style {
        FormStyle::Simple => decode_simple_form(payload)?,
        FormStyle::Nested => decode_nested_form(payload)?,
    };

    Ok(ParsedBody::new(BodyValue::Form(value), options.include_unparsed.then(|| raw.clone())))
}

pub(super) async fn text<B>(
    body: &SharedBody<B>,
    options: TextOptions,
    encoding: &str,
) -> Result<ParsedBody, BodyError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    ensure_utf8(encoding)?;
    let raw = collect(body, ContentKind::Text, options.limit).await?;

    let text = String::from_utf8(raw.to_vec())
        .map_err(|_| BodyError::malformed(ContentKind::Text, "body is not valid utf-8"))?;

    Ok(ParsedBody::new(BodyValue::Text(text), options.include_unparsed.then(|| raw.clone())))
}

/// Flat key/value decoding; repeated keys promote to ordered arrays so the
/// resulting object keeps every submitted value in arrival order.
fn decode_simple_form(raw: &str) -> Result<Value, BodyError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
        .map_err(|e| BodyError::malformed(ContentKind::Form, e))?;

    let mut object = serde_json::Map::new();
    for (key, value) in pairs {
        match object.entry(key) {
            serde_json::map::Entry::Vacant(entry) => {
                entry.insert(Value::String(value));
            }
            serde_json::map::Entry::Occupied(mut entry) => match entry.get_mut() {
                Value::Array(items) => items.push(Value::String(value)),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, Value::String(value)]);
                }
            },
        }
    }
    Ok(Value::Object(object))
}

/// Bracket-syntax decoding into nested objects.
fn decode_nested_form(raw: &str) -> Result<Value, BodyError> {
    let object: serde_json::Map<String, Value> =
        serde_qs::from_str(raw).map_err(|e| BodyError::malformed(ContentKind::Form, e))?;
    Ok(Value::Object(object))
}

/// Collects the whole body, failing with `PayloadTooLarge` as soon as the
/// byte count passes `limit`.
async fn collect<B>(
    body: &SharedBody<B>,
    kind: ContentKind,
    limit: usize,
) -> Result<Bytes, BodyError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let raw = body
        .apply(|b| async move {
            Limited::new(b, limit).collect().await.map(|collected| collected.to_bytes()).map_err(
                |e| {
                    if e.is::<LengthLimitError>() {
                        BodyError::PayloadTooLarge { kind, limit: limit as u64 }
                    } else {
                        BodyError::stream(e)
                    }
                },
            )
        })
        .await?;

    trace!(%kind, bytes = raw.len(), "collected request body");
    Ok(raw)
}

fn starts_with_object_or_array(raw: &[u8]) -> bool {
    raw.iter().find(|b| !b.is_ascii_whitespace()).is_some_and(|b| *b == b'{' || *b == b'[')
}

fn ensure_utf8(encoding: &str) -> Result<(), BodyError> {
    if encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8") {
        Ok(())
    } else {
        Err(BodyError::UnsupportedEncoding(encoding.to_string()))
    }
}

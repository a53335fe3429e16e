//! Codec dispatch.

mod multipart;
mod scalar;

use bytes::Bytes;
use http::HeaderMap;
use http_body::Body;

use crate::body::SharedBody;
use crate::error::{BodyError, BoxError};
use crate::kind::ContentKind;
use crate::options::BodyOptions;
use crate::value::ParsedBody;

/// Routes one classified request body to its codec.
pub(crate) async fn decode<B>(
    kind: ContentKind,
    headers: &HeaderMap,
    body: &SharedBody<B>,
    options: &BodyOptions,
) -> Result<ParsedBody, BodyError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError> + 'static,
{
    match kind {
        ContentKind::Json => scalar::json(body, options.json_options(), options.encoding()).await,
        ContentKind::Form => scalar::form(body, options.form_options(), options.encoding()).await,
        ContentKind::Text => scalar::text(body, options.text_options(), options.encoding()).await,
        ContentKind::Multipart => multipart::multipart(headers, body, options.multipart_options())
            .await
            .map(|(fields, files)| ParsedBody::multipart(fields, files)),
    }
}

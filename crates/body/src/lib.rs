//! Content-type driven request body parsing middleware.
//!
//! [`BodyParser`] inspects the `Content-Type` header of an incoming request,
//! dispatches to one of four decoding strategies and attaches the result to
//! the request for downstream handlers:
//!
//! - **json**: `application/json` and the json-family media types, decoded
//!   with `serde_json`
//! - **form**: `application/x-www-form-urlencoded`, decoded with
//!   `serde_urlencoded` (flat) or `serde_qs` (nested)
//! - **text**: any `text/*` or XML media type
//! - **multipart**: `multipart/form-data` via `multer`, aggregated into
//!   field and file maps; repeated names promote from scalars to ordered
//!   lists
//!
//! Only requests whose method is in the configured eligible set are parsed;
//! everything else passes through untouched. Per-kind size limits are
//! enforced while the body is read and surface as
//! [`BodyError::PayloadTooLarge`].
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::Full;
//! use micro_body::{AttachBody, BodyOptions, BodyParser};
//!
//! # async fn demo() -> Result<(), micro_body::BodyError> {
//! let parser = BodyParser::with_options(BodyOptions::default().with_multipart(true));
//!
//! let req = Request::post("/players")
//!     .header("content-type", "application/json")
//!     .body(Full::new(Bytes::from(r#"{"name":"imed"}"#)))
//!     .unwrap();
//!
//! let req = parser.parse(req).await?;
//! assert!(req.has_parsed_body());
//! # Ok(())
//! # }
//! ```

mod adapter;
mod body;
mod codec;
mod error;
mod kind;
mod options;
mod parser;
mod value;

pub use adapter::AttachBody;
pub use body::SharedBody;
pub use error::{BodyError, BoxError};
pub use kind::{ContentKind, classify};
pub use options::{
    BodyOptions, DEFAULT_FORM_LIMIT, DEFAULT_JSON_LIMIT, DEFAULT_TEXT_LIMIT, FileBeginHook,
    FormOptions, FormStyle, JsonOptions, MultipartOptions, TextOptions,
};
pub use parser::BodyParser;
pub use value::{BodyValue, FieldMap, FileInfo, FileMap, MultiMap, OneOrMany, ParsedBody};

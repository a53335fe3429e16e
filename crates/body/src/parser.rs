//! The middleware itself.
//!
//! [`BodyParser`] runs once per request: gate on the eligible-methods set,
//! classify the `Content-Type`, dispatch to the matching codec and attach the
//! result. It holds nothing but the shared read-only options, so one instance
//! serves any number of concurrent requests.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request};
use http_body::Body;
use tracing::{debug, trace, warn};

use crate::adapter::AttachBody;
use crate::body::SharedBody;
use crate::codec;
use crate::error::{BodyError, BoxError};
use crate::kind::classify;
use crate::options::BodyOptions;
use crate::value::ParsedBody;

/// Content-type driven request body parsing middleware.
///
/// ```no_run
/// use bytes::Bytes;
/// use http::Request;
/// use http_body_util::Full;
/// use micro_body::{AttachBody, BodyParser};
///
/// # async fn demo() -> Result<(), micro_body::BodyError> {
/// let parser = BodyParser::new();
///
/// let req = Request::post("/players")
///     .header("content-type", "application/json")
///     .body(Full::new(Bytes::from(r#"{"name":"imed"}"#)))
///     .unwrap();
///
/// let req = parser.parse(req).await?;
/// if let Some(value) = req.body_value() {
///     println!("decoded: {value:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BodyParser {
    options: Arc<BodyOptions>,
}

impl BodyParser {
    /// Middleware with the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: BodyOptions) -> Self {
        Self { options: Arc::new(options) }
    }

    pub fn options(&self) -> &BodyOptions {
        &self.options
    }

    /// Whether requests with this method get their body parsed.
    pub fn should_parse(&self, method: &Method) -> bool {
        self.options.parses_method(method)
    }

    /// Parses one request, the bare-request shape.
    ///
    /// The body is moved into a [`SharedBody`] slot either way. Requests with
    /// an ineligible method pass through untouched: nothing is attached and
    /// the body stays consumable. Otherwise the classified codec runs and the
    /// [`ParsedBody`] lands in the request extensions; an unclassifiable
    /// content type attaches the empty result without reading any body bytes.
    pub async fn parse<B>(&self, req: Request<B>) -> Result<Request<SharedBody<B>>, BodyError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError> + 'static,
    {
        let (parts, body) = req.into_parts();
        let mut req = Request::from_parts(parts, SharedBody::new(body));

        if !self.should_parse(req.method()) {
            trace!(method = %req.method(), "method not eligible, passing request through");
            return Ok(req);
        }

        let parsed = match classify(req.headers(), &self.options) {
            None => {
                debug!("no configured content kind matched, attaching empty body");
                ParsedBody::empty()
            }
            Some(kind) => {
                debug!(%kind, "decoding request body");
                let body = req.body().clone();
                codec::decode(kind, req.headers(), &body, &self.options)
                    .await
                    .inspect_err(|e| warn!(%kind, error = %e, "body decode failed"))?
            }
        };

        req.attach_body(parsed);
        Ok(req)
    }

    /// Parses one request and hands it to `next`, the framework shape with a
    /// continuation. Decode failures short-circuit before `next` runs.
    pub async fn handle<B, F, Fut>(&self, req: Request<B>, next: F) -> Result<Fut::Output, BodyError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError> + 'static,
        F: FnOnce(Request<SharedBody<B>>) -> Fut,
        Fut: Future,
    {
        let req = self.parse(req).await?;
        Ok(next(req).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use serde_json::json;

    use crate::value::BodyValue;

    fn json_request(method: Method, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri("/players")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    #[tokio::test]
    async fn ineligible_method_passes_through_unchanged() {
        let parser = BodyParser::new();
        let req = json_request(Method::GET, r#"{"name":"imed"}"#);

        let req = parser.parse(req).await.unwrap();

        assert!(!req.has_parsed_body());
        // the body was not consumed
        assert!(req.body().can_consume().await);
    }

    #[tokio::test]
    async fn post_json_attaches_decoded_value() {
        let parser = BodyParser::new();
        let req = json_request(Method::POST, r#"{"name":"imed"}"#);

        let req = parser.parse(req).await.unwrap();

        assert_eq!(req.parsed_body().unwrap().json(), Some(&json!({"name": "imed"})));
        assert!(!req.body().can_consume().await);
    }

    #[tokio::test]
    async fn put_and_patch_are_eligible_by_default() {
        let parser = BodyParser::new();
        for method in [Method::PUT, Method::PATCH] {
            let req = json_request(method, r#"{"ok":true}"#);
            let req = parser.parse(req).await.unwrap();
            assert!(req.has_parsed_body());
        }
    }

    #[tokio::test]
    async fn unmatched_content_type_attaches_empty_without_consuming() {
        let parser = BodyParser::new();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header("content-type", "application/octet-stream")
            .body(Full::new(Bytes::from_static(b"opaque")))
            .unwrap();

        let req = parser.parse(req).await.unwrap();

        assert!(req.parsed_body().unwrap().is_empty());
        assert!(req.body().can_consume().await);
    }

    #[tokio::test]
    async fn missing_content_type_attaches_empty() {
        let parser = BodyParser::new();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/ping")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let req = parser.parse(req).await.unwrap();
        assert!(req.parsed_body().unwrap().is_empty());
    }

    #[tokio::test]
    async fn form_body_decodes_with_default_options() {
        let parser = BodyParser::new();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from_static(b"name=imed&level=10")))
            .unwrap();

        let req = parser.parse(req).await.unwrap();
        assert_eq!(req.parsed_body().unwrap().json(), Some(&json!({"name": "imed", "level": "10"})));
    }

    #[tokio::test]
    async fn oversized_body_fails_and_attaches_nothing() {
        let options = BodyOptions::default().with_text_limit(10);
        let parser = BodyParser::with_options(options);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/notes")
            .header("content-type", "text/plain")
            .body(Full::new(Bytes::from_static(b"longer than ten bytes")))
            .unwrap();

        let err = parser.parse(req).await.unwrap_err();
        assert!(err.is_payload_too_large());
    }

    #[tokio::test]
    async fn custom_parsed_methods_replace_the_default_set() {
        let options = BodyOptions::default().with_parsed_methods(["delete"]);
        let parser = BodyParser::with_options(options);

        let req = json_request(Method::POST, r#"{"ignored":true}"#);
        let req = parser.parse(req).await.unwrap();
        assert!(!req.has_parsed_body());

        let req = json_request(Method::DELETE, r#"{"seen":true}"#);
        let req = parser.parse(req).await.unwrap();
        assert_eq!(req.parsed_body().unwrap().json(), Some(&json!({"seen": true})));
    }

    #[tokio::test]
    async fn handle_runs_the_continuation_with_the_parsed_request() {
        let parser = BodyParser::new();
        let req = json_request(Method::POST, r#"{"name":"imed"}"#);

        let name = parser
            .handle(req, |req| async move {
                match req.body_value() {
                    Some(BodyValue::Json(value)) => value["name"].as_str().unwrap().to_string(),
                    _ => panic!("expected a json body"),
                }
            })
            .await
            .unwrap();

        assert_eq!(name, "imed");
    }

    #[tokio::test]
    async fn handle_short_circuits_on_decode_failure() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let parser = BodyParser::new();
        let req = json_request(Method::POST, "{broken");

        let called = Arc::new(AtomicBool::new(false));
        let called_in_next = Arc::clone(&called);
        let result = parser
            .handle(req, move |_req| {
                called_in_next.store(true, Ordering::SeqCst);
                async {}
            })
            .await;

        assert!(result.is_err());
        assert!(!called.load(Ordering::SeqCst));
    }
}

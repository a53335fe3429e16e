//! Middleware configuration.
//!
//! [`BodyOptions`] is built once per middleware instance and shared read-only
//! across every request it handles. All fields have documented defaults, so
//! `BodyOptions::default()` is a fully usable configuration.

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use http::Method;
use tracing::warn;

use crate::value::FileInfo;

/// Default maximum json body size (1 MiB).
pub const DEFAULT_JSON_LIMIT: usize = 1024 * 1024;

/// Default maximum urlencoded form body size (56 KiB).
pub const DEFAULT_FORM_LIMIT: usize = 56 * 1024;

/// Default maximum text body size (56 KiB).
pub const DEFAULT_TEXT_LIMIT: usize = 56 * 1024;

/// Hook invoked with the field name and the mutable file descriptor before a
/// file's first byte is written, allowing the destination to be renamed.
pub type FileBeginHook = Arc<dyn Fn(&str, &mut FileInfo) + Send + Sync>;

/// How urlencoded form bodies are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStyle {
    /// Flat key/value pairs; repeated keys promote to ordered lists.
    #[default]
    Simple,
    /// Bracket syntax decoded into nested objects (`a[b]=1`).
    Nested,
}

/// Configuration for the body parsing middleware.
#[derive(Debug, Clone)]
pub struct BodyOptions {
    json: bool,
    urlencoded: bool,
    text: bool,
    multipart: bool,
    json_limit: usize,
    form_limit: usize,
    text_limit: usize,
    json_strict: bool,
    encoding: String,
    form_style: FormStyle,
    include_unparsed: bool,
    parsed_methods: HashSet<Method>,
    multipart_options: MultipartOptions,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            json: true,
            urlencoded: true,
            text: true,
            multipart: false,
            json_limit: DEFAULT_JSON_LIMIT,
            form_limit: DEFAULT_FORM_LIMIT,
            text_limit: DEFAULT_TEXT_LIMIT,
            json_strict: true,
            encoding: "utf-8".to_string(),
            form_style: FormStyle::Simple,
            include_unparsed: false,
            parsed_methods: HashSet::from([Method::POST, Method::PUT, Method::PATCH]),
            multipart_options: MultipartOptions::default(),
        }
    }
}

impl BodyOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable json decoding. Default: enabled.
    #[must_use]
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    /// Enable or disable urlencoded form decoding. Default: enabled.
    #[must_use]
    pub fn with_urlencoded(mut self, enabled: bool) -> Self {
        self.urlencoded = enabled;
        self
    }

    /// Enable or disable text decoding. Default: enabled.
    #[must_use]
    pub fn with_text(mut self, enabled: bool) -> Self {
        self.text = enabled;
        self
    }

    /// Enable or disable multipart decoding. Default: disabled.
    #[must_use]
    pub fn with_multipart(mut self, enabled: bool) -> Self {
        self.multipart = enabled;
        self
    }

    /// Maximum json body size in bytes. Default: 1 MiB.
    #[must_use]
    pub fn with_json_limit(mut self, limit: usize) -> Self {
        self.json_limit = limit;
        self
    }

    /// Maximum urlencoded form body size in bytes. Default: 56 KiB.
    #[must_use]
    pub fn with_form_limit(mut self, limit: usize) -> Self {
        self.form_limit = limit;
        self
    }

    /// Maximum text body size in bytes. Default: 56 KiB.
    #[must_use]
    pub fn with_text_limit(mut self, limit: usize) -> Self {
        self.text_limit = limit;
        self
    }

    /// When set, json bodies must have a top-level object or array.
    /// Default: strict.
    #[must_use]
    pub fn with_json_strict(mut self, strict: bool) -> Self {
        self.json_strict = strict;
        self
    }

    /// Declared character encoding of scalar bodies. Only UTF-8 is supported;
    /// any other value makes scalar decodes fail with `UnsupportedEncoding`.
    /// Default: `utf-8`.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Decoding style for urlencoded forms. Default: [`FormStyle::Simple`].
    #[must_use]
    pub fn with_form_style(mut self, style: FormStyle) -> Self {
        self.form_style = style;
        self
    }

    /// When set, the raw collected bytes are kept on the parsed result next
    /// to the decoded value (json, form and text only). Default: off.
    #[must_use]
    pub fn with_include_unparsed(mut self, include: bool) -> Self {
        self.include_unparsed = include;
        self
    }

    /// Replaces the set of HTTP methods eligible for body parsing. Names are
    /// case-insensitive; unrecognizable names are skipped with a warning.
    /// Default: `POST`, `PUT`, `PATCH`.
    #[must_use]
    pub fn with_parsed_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parsed_methods = methods
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().to_ascii_uppercase();
                match Method::from_bytes(name.as_bytes()) {
                    Ok(method) => Some(method),
                    Err(_) => {
                        warn!(method = %name, "skipping invalid parsed method name");
                        None
                    }
                }
            })
            .collect();
        self
    }

    /// Pass-through options for the multipart collaborator.
    #[must_use]
    pub fn with_multipart_options(mut self, options: MultipartOptions) -> Self {
        self.multipart_options = options;
        self
    }

    pub fn json_enabled(&self) -> bool {
        self.json
    }

    pub fn urlencoded_enabled(&self) -> bool {
        self.urlencoded
    }

    pub fn text_enabled(&self) -> bool {
        self.text
    }

    pub fn multipart_enabled(&self) -> bool {
        self.multipart
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn parses_method(&self, method: &Method) -> bool {
        self.parsed_methods.contains(method)
    }

    pub fn multipart_options(&self) -> &MultipartOptions {
        &self.multipart_options
    }

    /// Derived option bundle for the json codec.
    pub fn json_options(&self) -> JsonOptions {
        JsonOptions {
            limit: self.json_limit,
            strict: self.json_strict,
            include_unparsed: self.include_unparsed,
        }
    }

    /// Derived option bundle for the form codec.
    pub fn form_options(&self) -> FormOptions {
        FormOptions {
            limit: self.form_limit,
            style: self.form_style,
            include_unparsed: self.include_unparsed,
        }
    }

    /// Derived option bundle for the text codec.
    pub fn text_options(&self) -> TextOptions {
        TextOptions { limit: self.text_limit, include_unparsed: self.include_unparsed }
    }
}

/// Per-codec view of the options consumed by the json decoder.
#[derive(Debug, Clone, Copy)]
pub struct JsonOptions {
    pub limit: usize,
    pub strict: bool,
    pub include_unparsed: bool,
}

/// Per-codec view of the options consumed by the form decoder.
#[derive(Debug, Clone, Copy)]
pub struct FormOptions {
    pub limit: usize,
    pub style: FormStyle,
    pub include_unparsed: bool,
}

/// Per-codec view of the options consumed by the text decoder.
#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    pub limit: usize,
    pub include_unparsed: bool,
}

/// Pass-through options for the multipart collaborator.
#[derive(Clone, Default)]
pub struct MultipartOptions {
    upload_dir: Option<PathBuf>,
    max_file_size: Option<u64>,
    max_fields: Option<usize>,
    on_file_begin: Option<FileBeginHook>,
}

impl MultipartOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory files are spooled into. Default: the platform temp dir.
    #[must_use]
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    /// Maximum size of a single file attachment in bytes. Default: unlimited.
    #[must_use]
    pub fn with_max_file_size(mut self, limit: u64) -> Self {
        self.max_file_size = Some(limit);
        self
    }

    /// Maximum number of parts (fields and files). Default: unlimited.
    #[must_use]
    pub fn with_max_fields(mut self, limit: usize) -> Self {
        self.max_fields = Some(limit);
        self
    }

    /// Hook fired before each file is written, see [`FileBeginHook`].
    #[must_use]
    pub fn with_on_file_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut FileInfo) + Send + Sync + 'static,
    {
        self.on_file_begin = Some(Arc::new(hook));
        self
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir.clone().unwrap_or_else(env::temp_dir)
    }

    pub fn max_file_size(&self) -> Option<u64> {
        self.max_file_size
    }

    pub fn max_fields(&self) -> Option<usize> {
        self.max_fields
    }

    pub fn on_file_begin(&self) -> Option<&FileBeginHook> {
        self.on_file_begin.as_ref()
    }
}

impl fmt::Debug for MultipartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartOptions")
            .field("upload_dir", &self.upload_dir)
            .field("max_file_size", &self.max_file_size)
            .field("max_fields", &self.max_fields)
            .field("on_file_begin", &self.on_file_begin.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = BodyOptions::default();

        assert!(options.json_enabled());
        assert!(options.urlencoded_enabled());
        assert!(options.text_enabled());
        assert!(!options.multipart_enabled());

        assert_eq!(options.json_options().limit, DEFAULT_JSON_LIMIT);
        assert!(options.json_options().strict);
        assert_eq!(options.form_options().limit, DEFAULT_FORM_LIMIT);
        assert_eq!(options.form_options().style, FormStyle::Simple);
        assert_eq!(options.text_options().limit, DEFAULT_TEXT_LIMIT);
        assert!(!options.json_options().include_unparsed);
        assert_eq!(options.encoding(), "utf-8");
    }

    #[test]
    fn default_methods_are_post_put_patch() {
        let options = BodyOptions::default();

        assert!(options.parses_method(&Method::POST));
        assert!(options.parses_method(&Method::PUT));
        assert!(options.parses_method(&Method::PATCH));
        assert!(!options.parses_method(&Method::GET));
        assert!(!options.parses_method(&Method::DELETE));
    }

    #[test]
    fn parsed_methods_are_case_normalized() {
        let options = BodyOptions::default().with_parsed_methods(["delete", "Post"]);

        assert!(options.parses_method(&Method::DELETE));
        assert!(options.parses_method(&Method::POST));
        assert!(!options.parses_method(&Method::PUT));
    }

    #[test]
    fn multipart_upload_dir_falls_back_to_temp_dir() {
        let options = MultipartOptions::default();
        assert_eq!(options.upload_dir(), env::temp_dir());

        let options = MultipartOptions::default().with_upload_dir("/var/uploads");
        assert_eq!(options.upload_dir(), PathBuf::from("/var/uploads"));
    }
}

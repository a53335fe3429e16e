//! Multipart aggregation.
//!
//! The body is handed to `multer` as a byte stream and drained part by part.
//! Text parts land in the field map, file parts are spooled to disk and land
//! in the file map as [`FileInfo`] descriptors; both maps apply the
//! scalar-to-list promotion rule on repeated names. Parts carrying no field
//! name are skipped with a warning. Any mid-stream failure
//! aborts the whole aggregation: spooled files are removed and no partial
//! maps are returned.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::body::SharedBody;
use crate::error::{BodyError, BoxError};
use crate::kind::ContentKind;
use crate::options::MultipartOptions;
use crate::value::{FieldMap, FileInfo, FileMap};

/// Sequence for unique spool file names; one shared counter is enough since
/// names also embed a nanosecond timestamp.
static SPOOL_SEQ: AtomicU64 = AtomicU64::new(0);

pub(super) async fn multipart<B>(
    headers: &HeaderMap,
    body: &SharedBody<B>,
    options: &MultipartOptions,
) -> Result<(FieldMap, FileMap), BodyError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError> + 'static,
{
    let boundary = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|content_type| multer::parse_boundary(content_type).ok())
        .ok_or_else(|| {
            BodyError::malformed(ContentKind::Multipart, "missing or invalid multipart boundary")
        })?;

    body.apply(|b| aggregate(b, boundary, options)).await
}

async fn aggregate<B>(
    body: B,
    boundary: String,
    options: &MultipartOptions,
) -> Result<(FieldMap, FileMap), BodyError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError> + 'static,
{
    let mut parts = multer::Multipart::new(body.into_data_stream(), boundary);

    let mut fields = FieldMap::new();
    let mut files = FileMap::new();
    let mut spooled: Vec<PathBuf> = Vec::new();

    match drain(&mut parts, options, &mut fields, &mut files, &mut spooled).await {
        Ok(()) => Ok((fields, files)),
        Err(e) => {
            warn!(error = %e, "multipart aggregation aborted, removing spooled files");
            for path in spooled {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %remove_err, "failed to remove spooled file");
                }
            }
            Err(e)
        }
    }
}

async fn drain(
    parts: &mut multer::Multipart<'static>,
    options: &MultipartOptions,
    fields: &mut FieldMap,
    files: &mut FileMap,
    spooled: &mut Vec<PathBuf>,
) -> Result<(), BodyError> {
    let upload_dir = options.upload_dir();
    let mut part_count = 0usize;

    while let Some(mut field) = parts.next_field().await? {
        part_count += 1;
        if let Some(max) = options.max_fields()
            && part_count > max
        {
            return Err(BodyError::malformed(
                ContentKind::Multipart,
                format!("more than {max} parts"),
            ));
        }

        let Some(name) = field.name().map(str::to_string) else {
            warn!("skipping multipart part without a field name");
            continue;
        };

        if field.file_name().is_some() {
            let mut info = FileInfo {
                file_name: field.file_name().map(str::to_string),
                content_type: field.content_type().map(|m| m.to_string()),
                path: spool_path(&upload_dir),
                size: 0,
            };
            if let Some(hook) = options.on_file_begin() {
                hook(&name, &mut info);
            }
            debug!(field = %name, path = %info.path.display(), "spooling multipart file");

            if let Some(parent) = info.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut out = tokio::fs::File::create(&info.path).await?;
            spooled.push(info.path.clone());

            while let Some(chunk) = field.chunk().await? {
                info.size += chunk.len() as u64;
                if let Some(max) = options.max_file_size()
                    && info.size > max
                {
                    return Err(BodyError::PayloadTooLarge {
                        kind: ContentKind::Multipart,
                        limit: max,
                    });
                }
                out.write_all(&chunk).await?;
            }
            out.flush().await?;

            files.insert(name, info);
        } else {
            let value = field.text().await?;
            fields.insert(name, value);
        }
    }

    Ok(())
}

fn spool_path(dir: &Path) -> PathBuf {
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let seq = SPOOL_SEQ.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("upload_{stamp}_{seq}"))
}

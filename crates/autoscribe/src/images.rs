use crate::filename::{format_file_date, sanitize_topic};
use crate::persist::{ensure_dir, secondary_path};
use autoscribe_core::{MessageData, PartData};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Subdirectory, next to each transcript, that holds extracted images.
pub const IMAGES_SUBDIR: &str = "images";

/// Title length used in image filenames; independent of the transcript
/// topic limit so image names stay readable even with long titles.
const IMAGE_TITLE_LENGTH: usize = 50;

#[allow(clippy::unwrap_used)]
static INLINE_IMAGE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/([a-zA-Z]+);base64,(.+)$").unwrap());

/// Whether `url` is a self-describing inline-encoded image payload.
pub fn is_inline_image_url(url: &str) -> bool {
    INLINE_IMAGE_URL.is_match(url)
}

fn parse_inline_image(url: &str) -> Option<(String, &str)> {
    let captures = INLINE_IMAGE_URL.captures(url)?;
    let format = captures.get(1)?.as_str().to_ascii_lowercase();
    let payload = captures.get(2)?.as_str();
    Some((format, payload))
}

/// One image-extraction pass over the messages of a render.
///
/// Inline-encoded image parts are decoded and written under the `images`
/// subdirectory next to the transcript (and mirrored under the secondary
/// root when configured), and the part is rewritten in place to reference
/// the saved file by relative path. The pass owns the per-render image
/// index, so names stay monotonically increasing in document order across
/// the root session's messages and every embedded child's.
///
/// This must run to completion before formatting: the formatter renders
/// whatever reference the part carries at that point.
pub struct ImagePass {
    images_dir: PathBuf,
    secondary_images_dir: Option<PathBuf>,
    name_prefix: String,
    next_index: usize,
}

impl ImagePass {
    /// Prepares a pass for the transcript at `transcript_path`.
    pub fn new(
        transcript_path: &Path,
        session_title: &str,
        created_at: DateTime<Utc>,
        primary_root: &Path,
        secondary_root: Option<&Path>,
    ) -> Self {
        let transcript_dir = transcript_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let images_dir = transcript_dir.join(IMAGES_SUBDIR);
        let secondary_images_dir =
            secondary_root.map(|root| secondary_path(&images_dir, primary_root, root));
        let name_prefix = format!(
            "{}-{}",
            format_file_date(created_at),
            sanitize_topic(session_title, IMAGE_TITLE_LENGTH)
        );
        Self {
            images_dir,
            secondary_images_dir,
            name_prefix,
            next_index: 0,
        }
    }

    /// Extracts every qualifying image part in `messages`, mutating parts
    /// in place. A failed decode or write leaves the part untouched so it
    /// degrades to an unresolved inline reference in the output.
    pub async fn process(&mut self, messages: &mut [MessageData]) {
        for message in messages.iter_mut() {
            for part in &mut message.parts {
                let PartData::File {
                    url,
                    mime,
                    local_path,
                    ..
                } = part
                else {
                    continue;
                };
                if !mime.starts_with("image/") || !is_inline_image_url(url) {
                    continue;
                }
                if let Some(relative) = self.save_image(url).await {
                    *local_path = Some(relative);
                    self.next_index += 1;
                }
            }
        }
    }

    /// Decodes and writes one inline image to the primary images directory
    /// and, independently, to the secondary one. Returns the reference
    /// relative to the transcript on primary success; the secondary write
    /// is best-effort and never affects the returned reference.
    async fn save_image(&self, url: &str) -> Option<String> {
        let (format, payload) = parse_inline_image(url)?;
        let bytes = match STANDARD.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode inline image payload");
                return None;
            }
        };

        let extension = if format == "jpeg" { "jpg" } else { format.as_str() };
        let image_name = format!("{}-{}.{}", self.name_prefix, self.next_index, extension);

        if !write_image(&self.images_dir, &image_name, &bytes).await {
            return None;
        }

        if let Some(secondary_dir) = &self.secondary_images_dir {
            // Mirrored from the decoded source bytes, not copied from the
            // primary artifact; a secondary failure stands alone.
            write_image(secondary_dir, &image_name, &bytes).await;
        }

        Some(format!("{IMAGES_SUBDIR}/{image_name}"))
    }
}

async fn write_image(dir: &Path, name: &str, bytes: &[u8]) -> bool {
    if !ensure_dir(dir).await {
        return false;
    }
    let path = dir.join(name);
    match tokio::fs::write(&path, bytes).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write image");
            false
        }
    }
}

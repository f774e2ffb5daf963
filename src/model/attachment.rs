use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use time::OffsetDateTime;

pub const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Audio,
}

impl AttachmentKind {
    /// Anything that is not an image is filed as audio.
    pub fn for_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::Audio
        }
    }
}

/// A file embedded in a note as a self-describing data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub src: String,
    pub name: String,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime: &str, bytes: &[u8]) -> Self {
        let uri = DataUri {
            mime: mime.to_string(),
            data: bytes.to_vec(),
        };
        Self {
            kind: AttachmentKind::for_mime(mime),
            src: uri.to_string(),
            name: name.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("reading attachment {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let mime = mime_guess::from_path(path).first_raw().unwrap_or(DEFAULT_MIME);
        tracing::debug!(%name, mime, bytes = bytes.len(), "encoded attachment");
        Ok(Self::new(name, mime, &bytes))
    }

    /// Audio captured in-app, named `recording-<millis>.<subtype>`.
    pub fn recording(mime: &str, bytes: &[u8], at: OffsetDateTime) -> Self {
        let millis = at.unix_timestamp_nanos() / 1_000_000;
        let subtype = mime
            .split('/')
            .nth(1)
            .and_then(|rest| rest.split(';').next())
            .filter(|ext| !ext.is_empty())
            .unwrap_or("webm");
        let mut attachment = Self::new(format!("recording-{millis}.{subtype}"), mime, bytes);
        attachment.kind = AttachmentKind::Audio;
        attachment
    }

    pub fn data_uri(&self) -> Result<DataUri, DataUriError> {
        self.src.parse()
    }

    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        self.data_uri().map(|uri| uri.data)
    }

    /// Writes the decoded payload into `dir` under the attachment's name.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let bytes = self
            .decode()
            .with_context(|| format!("decoding attachment {}", self.name))?;
        let file_name = Path::new(&self.name)
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "attachment".into());
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let target = dir.join(file_name);
        fs::write(&target, bytes)
            .with_context(|| format!("writing attachment {}", target.display()))?;
        Ok(target)
    }
}

#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("data URI must start with `data:`")]
    MissingScheme,
    #[error("data URI has no `,` separating header and payload")]
    MissingPayload,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// `data:<mime>;base64,<payload>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub data: Vec<u8>,
}

impl DataUri {
    /// Media type without parameters, e.g. `audio/webm` for `audio/webm;codecs=opus`.
    pub fn essence(&self) -> &str {
        self.mime.split(';').next().unwrap_or_default().trim()
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let rest = raw
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingPayload)?;
        let (mime, encoded) = match header.strip_suffix(";base64") {
            Some(mime) => (mime, true),
            None => (header, false),
        };
        let data = if encoded {
            STANDARD.decode(payload.trim())?
        } else {
            payload.as_bytes().to_vec()
        };
        let mime = if mime.is_empty() {
            "text/plain".to_string()
        } else {
            mime.to_string()
        };
        Ok(Self { mime, data })
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn parses_canvas_style_uri() -> anyhow::Result<()> {
        let uri: DataUri = "data:image/png;base64,iVBORw0KGgo=".parse()?;
        assert_eq!(uri.mime, "image/png");
        assert_eq!(&uri.data[1..4], b"PNG");
        Ok(())
    }

    #[test]
    fn keeps_mime_parameters() -> anyhow::Result<()> {
        let uri: DataUri = "data:audio/webm;codecs=opus;base64,AAEC".parse()?;
        assert_eq!(uri.mime, "audio/webm;codecs=opus");
        assert_eq!(uri.essence(), "audio/webm");
        assert_eq!(uri.data, vec![0, 1, 2]);
        Ok(())
    }

    #[test]
    fn rejects_malformed_uris() {
        assert_matches!(
            "image/png;base64,AAAA".parse::<DataUri>(),
            Err(DataUriError::MissingScheme)
        );
        assert_matches!(
            "data:image/png;base64".parse::<DataUri>(),
            Err(DataUriError::MissingPayload)
        );
        assert_matches!(
            "data:image/png;base64,@@@".parse::<DataUri>(),
            Err(DataUriError::Base64(_))
        );
    }

    #[test]
    fn file_attachment_infers_kind_from_extension() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let image = temp.path().join("Photo.JPG");
        fs::write(&image, [0xff, 0xd8, 0xff])?;
        let voice = temp.path().join("memo.wav");
        fs::write(&voice, b"RIFF")?;

        let image = Attachment::from_file(&image)?;
        assert_eq!(image.kind, AttachmentKind::Image);
        assert_eq!(image.name, "Photo.JPG");
        assert!(image.src.starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.decode()?, vec![0xff, 0xd8, 0xff]);

        let voice = Attachment::from_file(&voice)?;
        assert_eq!(voice.kind, AttachmentKind::Audio);
        assert_eq!(voice.decode()?, b"RIFF".to_vec());
        Ok(())
    }

    #[test]
    fn unknown_extension_is_stored_as_octet_stream() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let blob = temp.path().join("capture.zzz");
        fs::write(&blob, b"??")?;
        let attachment = Attachment::from_file(&blob)?;
        assert!(attachment.src.starts_with("data:application/octet-stream;base64,"));
        assert_eq!(attachment.kind, AttachmentKind::Audio);
        Ok(())
    }

    #[test]
    fn export_writes_decoded_bytes_without_directories() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let attachment = Attachment::new("../../evil.png", "image/png", b"png!");
        let path = attachment.export_to(temp.path())?;
        assert_eq!(path, temp.path().join("evil.png"));
        assert_eq!(fs::read(&path)?, b"png!".to_vec());
        Ok(())
    }

    #[test]
    fn recordings_are_named_after_timestamp_and_subtype() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp");
        let recording = Attachment::recording("audio/webm;codecs=opus", b"abc", at);
        assert_eq!(recording.name, "recording-1700000000000.webm");
        assert_eq!(recording.kind, AttachmentKind::Audio);
    }
}

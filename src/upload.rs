use crate::error::EyeGridError;
use crate::store::{ImageRecord, Side};
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

pub const PNG_MEDIA_TYPE: &str = "image/png";

/// A file picked for upload, with the media type the picker declared for it.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub path: PathBuf,
    pub media_type: Option<String>,
}

impl UploadFile {
    pub fn new(path: impl Into<PathBuf>, media_type: Option<String>) -> Self {
        Self {
            path: path.into(),
            media_type,
        }
    }

    // Declared type comes from the extension only, never from sniffing contents.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let media_type = media_type_for_path(&path).map(str::to_string);
        Self { path, media_type }
    }

    pub fn is_png(&self) -> bool {
        self.media_type.as_deref() == Some(PNG_MEDIA_TYPE)
    }
}

pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|v| v.to_str())?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some(PNG_MEDIA_TYPE),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

pub fn encode_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

pub(crate) fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

/// Reads one accepted file into a record. Pixel data is not decoded here.
pub fn read_upload(file: &UploadFile) -> Result<ImageRecord, EyeGridError> {
    let bytes = std::fs::read(&file.path)?;
    let media_type = file.media_type.as_deref().unwrap_or(PNG_MEDIA_TYPE);
    Ok(ImageRecord::new(encode_data_uri(media_type, &bytes)))
}

#[derive(Debug)]
pub(crate) struct Completion {
    pub side: Side,
    pub path: PathBuf,
    pub result: Result<ImageRecord, EyeGridError>,
}

/// Runs file reads on the rayon pool and hands completions back to the owner.
///
/// The owner is the only writer of the image lists; it applies completions in
/// the order they arrive, which is completion order rather than start order.
pub(crate) struct Uploader {
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: usize,
}

impl Uploader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Starts a read. Returns false when the file was ignored for its type.
    pub fn start(&mut self, side: Side, file: UploadFile) -> bool {
        if !file.is_png() {
            tracing::debug!(
                side = side.as_str(),
                path = %file.path.display(),
                media_type = file.media_type.as_deref().unwrap_or("unknown"),
                "ignoring non-png upload"
            );
            return false;
        }
        let tx = self.tx.clone();
        self.in_flight += 1;
        rayon::spawn(move || {
            let result = read_upload(&file);
            let _ = tx.send(Completion {
                side,
                path: file.path,
                result,
            });
        });
        true
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    // Queues a finished read as if a worker had sent it, so tests pick the arrival order.
    #[cfg(test)]
    pub fn deliver(&mut self, completion: Completion) {
        self.in_flight += 1;
        let _ = self.tx.send(completion);
    }

    pub fn try_next(&mut self) -> Option<Completion> {
        let completion = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }

    pub fn next_blocking(&mut self) -> Option<Completion> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }
}

use crate::canvas::Document;
use crate::error::EyeGridError;
use crate::paper::{Dpi, PaperSize};
use crate::print::{PrintHost, PrintJob, document_to_pdf};
use crate::raster::document_to_png;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

pub fn export_file_name(paper: PaperSize, dpi: Dpi) -> String {
    format!("print-{}-{}dpi.png", paper.as_str(), dpi.get())
}

/// Rasterizes `surface` at `dpi / 96` and writes the PNG into `dir`.
///
/// The file appears under its final name only once fully written; on any
/// error nothing is left behind.
pub fn export_raster(
    surface: &Document,
    dpi: Dpi,
    paper: PaperSize,
    dir: &Path,
) -> Result<PathBuf, EyeGridError> {
    let png = document_to_png(surface, dpi.scale())?;
    let target = dir.join(export_file_name(paper, dpi));
    write_atomically(&target, &png)?;
    Ok(target)
}

fn write_atomically(target: &Path, bytes: &[u8]) -> Result<(), EyeGridError> {
    let file_name = target
        .file_name()
        .and_then(|v| v.to_str())
        .ok_or_else(|| {
            EyeGridError::InvalidConfiguration("export target has no file name".to_string())
        })?;
    // Overlapping exports of the same name must not share a temp file.
    let temp = target.with_file_name(format!(
        ".{}.{}.{}.part",
        file_name,
        std::process::id(),
        next_temp_id()
    ));
    if let Err(err) = std::fs::write(&temp, bytes).and_then(|_| std::fs::rename(&temp, target)) {
        let _ = std::fs::remove_file(&temp);
        return Err(err.into());
    }
    Ok(())
}

fn next_temp_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// An export running in the background. Dropping it does not cancel the job.
pub struct PendingExport {
    rx: Receiver<Option<PathBuf>>,
}

impl PendingExport {
    /// Blocks until the job ends; `None` means it failed and was logged.
    pub fn wait(self) -> Option<PathBuf> {
        self.rx.recv().ok().flatten()
    }
}

pub(crate) fn spawn_export(
    surface: Document,
    dpi: Dpi,
    paper: PaperSize,
    dir: PathBuf,
) -> PendingExport {
    let (tx, rx) = mpsc::channel();
    rayon::spawn(move || {
        let outcome = match export_raster(&surface, dpi, paper, &dir) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "exported page");
                Some(path)
            }
            Err(err) => {
                tracing::error!(
                    paper = paper.as_str(),
                    dpi = dpi.get(),
                    error = %err,
                    "png export failed"
                );
                None
            }
        };
        let _ = tx.send(outcome);
    });
    PendingExport { rx }
}

/// Hands the page to the host print flow. Failures are logged and go no further.
pub(crate) fn print_surface(surface: &Document, paper: PaperSize, host: &Arc<dyn PrintHost>) {
    let job = PrintJob {
        title: format!("print-{}", paper.as_str()),
        paper: paper.as_str().to_string(),
    };
    let result = document_to_pdf(surface, &job.title).and_then(|pdf| host.print(&pdf, &job));
    match result {
        Ok(()) => tracing::debug!(paper = paper.as_str(), "print job handed to host"),
        Err(err) => tracing::warn!(paper = paper.as_str(), error = %err, "print did not complete"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ImageRecord, ImageSet, Side};
    use crate::surface::render_surface;
    use crate::upload::encode_data_uri;

    #[test]
    fn file_name_embeds_paper_and_dpi() {
        assert_eq!(
            export_file_name(PaperSize::A5, Dpi::parse("150")),
            "print-A5-150dpi.png"
        );
        assert_eq!(
            export_file_name(PaperSize::A4, Dpi::default()),
            "print-A4-300dpi.png"
        );
    }

    #[test]
    fn export_writes_png_at_requested_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let surface = render_surface(PaperSize::A5.config(), &ImageSet::default());
        let path = export_raster(&surface, Dpi::clamped(96), PaperSize::A5, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "print-A5-96dpi.png");
        let img = image::open(&path).unwrap();
        // 148mm x 210mm at 96 dpi
        assert_eq!((img.width(), img.height()), (559, 794));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn failed_export_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = ImageSet::default();
        set.push(Side::Left, ImageRecord::new(encode_data_uri("image/png", b"junk")));
        let surface = render_surface(PaperSize::A5.config(), &set);
        let pending = spawn_export(
            surface,
            Dpi::clamped(72),
            PaperSize::A5,
            dir.path().to_path_buf(),
        );
        assert!(pending.wait().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn overlapping_exports_of_one_name_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let surface = render_surface(PaperSize::A5.config(), &ImageSet::default());
        let first = spawn_export(
            surface.clone(),
            Dpi::clamped(72),
            PaperSize::A5,
            dir.path().to_path_buf(),
        );
        let second = spawn_export(
            surface,
            Dpi::clamped(72),
            PaperSize::A5,
            dir.path().to_path_buf(),
        );
        let first = first.wait().unwrap();
        let second = second.wait().unwrap();
        assert_eq!(first, second);
        assert!(image::open(&first).is_ok());
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["print-A5-72dpi.png".to_string()]);
    }

    #[test]
    fn temp_names_differ_per_write() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("print-A4-96dpi.png");
        write_atomically(&target, b"one").unwrap();
        write_atomically(&target, b"two").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"two");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let surface = render_surface(PaperSize::A5.config(), &ImageSet::default());
        let err = export_raster(
            &surface,
            Dpi::clamped(72),
            PaperSize::A5,
            Path::new("/nonexistent/eyegrid/out"),
        )
        .unwrap_err();
        assert!(matches!(err, EyeGridError::Io(_)));
    }
}

use crate::canvas::Document;
use crate::error::EyeGridError;
use crate::export::{PendingExport, print_surface, spawn_export};
use crate::layout::{Cell, layout};
use crate::paper::{Dpi, PaperSize};
use crate::print::{PrintHost, SystemPrinter};
use crate::store::{Dimension, ImageSet, Side};
use crate::surface::render_surface;
use crate::upload::{Completion, UploadFile, Uploader};
use std::path::PathBuf;
use std::sync::Arc;

/// Application state for one sheet: image lists, paper choice and export DPI.
///
/// Every mutation goes through a method here. Layout and surface are derived
/// on demand from the current state and never cached.
pub struct Session {
    images: ImageSet,
    paper: PaperSize,
    dpi: Dpi,
    download_dir: PathBuf,
    printer: Arc<dyn PrintHost>,
    uploader: Uploader,
}

#[derive(Clone)]
pub struct SessionBuilder {
    paper: PaperSize,
    dpi: Dpi,
    download_dir: PathBuf,
    printer: Option<Arc<dyn PrintHost>>,
    print_command: Option<PathBuf>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            paper: PaperSize::default(),
            dpi: Dpi::default(),
            download_dir: PathBuf::from("."),
            printer: None,
            print_command: None,
        }
    }

    pub fn paper(mut self, paper: PaperSize) -> Self {
        self.paper = paper;
        self
    }

    pub fn dpi(mut self, dpi: Dpi) -> Self {
        self.dpi = dpi;
        self
    }

    // Where exported PNGs land. Must exist when the session is built.
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    // Program that receives the PDF on stdin. Ignored when a print host is set.
    pub fn print_command(mut self, program: impl Into<PathBuf>) -> Self {
        self.print_command = Some(program.into());
        self
    }

    pub fn print_host(mut self, host: Arc<dyn PrintHost>) -> Self {
        self.printer = Some(host);
        self
    }

    pub fn build(self) -> Result<Session, EyeGridError> {
        if !self.download_dir.is_dir() {
            return Err(EyeGridError::InvalidConfiguration(format!(
                "download directory {} does not exist",
                self.download_dir.display()
            )));
        }
        let printer = match (self.printer, self.print_command) {
            (Some(host), _) => host,
            (None, Some(program)) => Arc::new(SystemPrinter::new(program)) as Arc<dyn PrintHost>,
            (None, None) => Arc::new(SystemPrinter::default()) as Arc<dyn PrintHost>,
        };
        Ok(Session {
            images: ImageSet::default(),
            paper: self.paper,
            dpi: self.dpi,
            download_dir: self.download_dir,
            printer,
            uploader: Uploader::new(),
        })
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn images(&self) -> &ImageSet {
        &self.images
    }

    pub fn paper(&self) -> PaperSize {
        self.paper
    }

    pub fn dpi(&self) -> Dpi {
        self.dpi
    }

    pub fn download_dir(&self) -> &std::path::Path {
        &self.download_dir
    }

    /// Starts reading `file` for `side`. Non-PNG files are dropped silently.
    ///
    /// The record is appended later, when [`Session::poll_uploads`] or
    /// [`Session::wait_for_uploads`] picks up the completed read.
    pub fn upload(&mut self, side: Side, file: UploadFile) -> bool {
        self.uploader.start(side, file)
    }

    pub fn pending_uploads(&self) -> usize {
        self.uploader.in_flight()
    }

    /// Appends every read that has finished so far. Returns how many records were added.
    pub fn poll_uploads(&mut self) -> usize {
        let mut added = 0;
        while let Some(completion) = self.uploader.try_next() {
            added += self.apply_completion(completion);
        }
        added
    }

    pub fn wait_for_uploads(&mut self) -> usize {
        let mut added = self.poll_uploads();
        while let Some(completion) = self.uploader.next_blocking() {
            added += self.apply_completion(completion);
        }
        added
    }

    fn apply_completion(&mut self, completion: Completion) -> usize {
        let Completion { side, path, result } = completion;
        match result {
            Ok(record) => {
                self.images.push(side, record);
                tracing::debug!(
                    side = side.as_str(),
                    path = %path.display(),
                    count = self.images.side(side).len(),
                    "image added"
                );
                1
            }
            Err(err) => {
                tracing::warn!(
                    side = side.as_str(),
                    path = %path.display(),
                    error = %err,
                    "upload read failed"
                );
                0
            }
        }
    }

    pub fn remove(&mut self, side: Side, index: usize) {
        if self.images.remove(side, index).is_some() {
            tracing::debug!(side = side.as_str(), index, "image removed");
        }
    }

    pub fn resize(&mut self, side: Side, index: usize, dimension: Dimension, raw: &str) {
        if !self.images.resize(side, index, dimension, raw) {
            tracing::debug!(
                side = side.as_str(),
                index,
                dimension = dimension.as_str(),
                value = raw,
                "dimension edit rejected"
            );
        }
    }

    pub fn set_paper_size(&mut self, paper: PaperSize) {
        self.paper = paper;
        tracing::debug!(paper = paper.as_str(), "paper size changed");
    }

    /// Selects a preset by name. Unknown names keep the current preset.
    pub fn set_paper_name(&mut self, raw: &str) {
        match PaperSize::from_str(raw) {
            Some(paper) => self.set_paper_size(paper),
            None => tracing::debug!(value = raw, "unknown paper size ignored"),
        }
    }

    pub fn set_dpi(&mut self, raw: &str) {
        self.dpi = Dpi::parse(raw);
        tracing::debug!(dpi = self.dpi.get(), "export dpi changed");
    }

    pub fn layout(&self) -> Vec<Cell> {
        layout(self.paper.config(), &self.images)
    }

    pub fn surface(&self) -> Document {
        render_surface(self.paper.config(), &self.images)
    }

    pub fn print(&self) {
        print_surface(&self.surface(), self.paper, &self.printer);
    }

    /// Starts a PNG export of the page as it is right now.
    pub fn export_png(&self) -> PendingExport {
        spawn_export(
            self.surface(),
            self.dpi,
            self.paper,
            self.download_dir.clone(),
        )
    }
}

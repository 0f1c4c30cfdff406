//! Two-column sheets of left and right eye images, sized in millimetres, for
//! printing or PNG export.
//!
//! A [`Session`] owns the image lists and the paper/DPI choice. Layout and the
//! render surface are rebuilt from that state whenever they are asked for.

mod canvas;
mod error;
mod export;
mod layout;
pub mod logging;
mod paper;
mod print;
mod raster;
mod session;
mod store;
mod surface;
mod types;
mod upload;

pub use canvas::{Canvas, Command, Document};
pub use error::EyeGridError;
pub use export::{PendingExport, export_file_name, export_raster};
pub use layout::{Cell, cells_per_side, layout};
pub use paper::{Dpi, PaperConfig, PaperSize};
pub use print::{PrintHost, PrintJob, SystemPrinter, document_to_pdf};
pub use raster::{document_to_png, raster_size};
pub use session::{Session, SessionBuilder};
pub use store::{DEFAULT_IMAGE_MM, Dimension, ImageRecord, ImageSet, Side};
pub use surface::{GRID_COLUMNS, cell_rect, render_surface};
pub use types::{Color, Pt, Rect, Size};
pub use upload::{UploadFile, encode_data_uri, media_type_for_path, read_upload};

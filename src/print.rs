use crate::canvas::{Command, Document};
use crate::error::EyeGridError;
use crate::types::Color;
use crate::upload::parse_data_uri;
use image::GenericImageView;
use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command as Process, Stdio};

/// Writes the page as a one-page PDF whose MediaBox is the paper size, so a
/// printer reproduces the physical millimeter dimensions.
pub fn document_to_pdf(document: &Document, title: &str) -> Result<Vec<u8>, EyeGridError> {
    let mut doc = lopdf::Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut xobjects = Dictionary::new();
    let mut names: HashMap<&str, String> = HashMap::new();
    for (idx, (id, uri)) in document.images.iter().enumerate() {
        let image_id = add_image_xobject(&mut doc, id, uri)?;
        let name = format!("Im{}", idx + 1);
        xobjects.set(name.as_bytes().to_vec(), image_id);
        names.insert(id.as_str(), name);
    }

    let page_w = document.page_size.width.to_f32();
    let page_h = document.page_size.height.to_f32();
    let content = content_stream(document, &names, page_h);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => xobjects,
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal("eyegrid"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn add_image_xobject(
    doc: &mut lopdf::Document,
    id: &str,
    uri: &str,
) -> Result<ObjectId, EyeGridError> {
    let (_, data) = parse_data_uri(uri)
        .ok_or_else(|| EyeGridError::Asset(format!("image {id} is not a data uri")))?;
    let decoded = image::load_from_memory(&data)
        .map_err(|e| EyeGridError::Asset(format!("image {id} could not be decoded: {e}")))?;
    let (width, height) = decoded.dimensions();

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if has_alpha {
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        dict.set("SMask", smask_id);
    }
    Ok(doc.add_object(Stream::new(dict, rgb)))
}

// PDF user space has a bottom-left origin; surface commands use top-left.
fn content_stream(document: &Document, names: &HashMap<&str, String>, page_h: f32) -> String {
    let mut out = String::new();
    for cmd in &document.commands {
        match cmd {
            Command::SaveState => out.push_str("q\n"),
            Command::RestoreState => out.push_str("Q\n"),
            Command::SetFillColor(Color { r, g, b }) => {
                out.push_str(&format!("{} {} {} rg\n", fmt_num(*r), fmt_num(*g), fmt_num(*b)));
            }
            Command::ClipRect {
                x,
                y,
                width,
                height,
            } => {
                let pdf_y = page_h - y.to_f32() - height.to_f32();
                out.push_str(&format!(
                    "{} {} {} {} re W n\n",
                    fmt_num(x.to_f32()),
                    fmt_num(pdf_y),
                    fmt_num(width.to_f32()),
                    fmt_num(height.to_f32())
                ));
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                let pdf_y = page_h - y.to_f32() - height.to_f32();
                out.push_str(&format!(
                    "{} {} {} {} re f\n",
                    fmt_num(x.to_f32()),
                    fmt_num(pdf_y),
                    fmt_num(width.to_f32()),
                    fmt_num(height.to_f32())
                ));
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                let Some(name) = names.get(resource_id.as_str()) else {
                    continue;
                };
                let pdf_y = page_h - y.to_f32() - height.to_f32();
                out.push_str(&format!(
                    "q {} 0 0 {} {} {} cm /{} Do Q\n",
                    fmt_num(width.to_f32()),
                    fmt_num(height.to_f32()),
                    fmt_num(x.to_f32()),
                    fmt_num(pdf_y),
                    name
                ));
            }
        }
    }
    out
}

fn fmt_num(value: f32) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// The host environment's print flow. There is no success signal back to the
/// session; implementations report trouble only through their own error.
pub trait PrintHost: Send + Sync {
    fn print(&self, pdf: &[u8], job: &PrintJob) -> Result<(), EyeGridError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub title: String,
    pub paper: String,
}

/// Spools the PDF to a system print command on stdin (`lp` style).
#[derive(Debug, Clone)]
pub struct SystemPrinter {
    program: PathBuf,
}

impl SystemPrinter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemPrinter {
    fn default() -> Self {
        Self::new("lp")
    }
}

impl PrintHost for SystemPrinter {
    fn print(&self, pdf: &[u8], job: &PrintJob) -> Result<(), EyeGridError> {
        let mut child = Process::new(&self.program)
            .arg("-t")
            .arg(&job.title)
            .arg("-o")
            .arg(format!("media={}", job.paper))
            .arg("-o")
            .arg("fit-to-page=false")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(pdf)?;
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(EyeGridError::Print(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }
        Ok(())
    }
}

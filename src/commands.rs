//! Line commands: one per user action on a session.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use eyegrid::{Dimension, PendingExport, Session, Side, UploadFile};

pub const HELP: &str = "\
commands:
  upload <left|right> <path>...     add PNG images to a side
  remove <left|right> <index>       drop an image
  width <left|right> <index> <mm>   set printed width
  height <left|right> <index> <mm>  set printed height
  paper <a4|a5>                     choose the paper preset
  dpi <value>                       set export resolution (72-1200)
  show                              list images and the cell grid
  print                             send the sheet to the printer
  export                            write the sheet as PNG
  wait                              finish pending uploads and exports
  help                              this text
  quit                              exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Upload { side: Side, paths: Vec<PathBuf> },
    Remove { side: Side, index: usize },
    Resize {
        side: Side,
        index: usize,
        dimension: Dimension,
        value: String,
    },
    Paper(String),
    Dpi(String),
    Show,
    Print,
    Export,
    Wait,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Blank,
    Action(Action),
    /// Known command with arguments that do not parse. Dropped without output.
    Malformed,
    Unknown(String),
}

pub fn parse_line(line: &str) -> Line {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Line::Blank;
    };
    if head.starts_with('#') {
        return Line::Blank;
    }
    let args: Vec<&str> = words.collect();
    let action = match head.to_ascii_lowercase().as_str() {
        "upload" => match args.split_first() {
            Some((side, paths)) if !paths.is_empty() => Side::from_str(side).map(|side| {
                Action::Upload {
                    side,
                    paths: paths.iter().map(|path| PathBuf::from(*path)).collect(),
                }
            }),
            _ => None,
        },
        "remove" => match args.as_slice() {
            [side, index] => Side::from_str(side)
                .zip(index.parse::<usize>().ok())
                .map(|(side, index)| Action::Remove { side, index }),
            _ => None,
        },
        "width" => parse_resize(Dimension::Width, &args),
        "height" => parse_resize(Dimension::Height, &args),
        "paper" => match args.as_slice() {
            [name] => Some(Action::Paper(name.to_string())),
            _ => None,
        },
        // Any text is accepted here; the session clamps or defaults it.
        "dpi" => Some(Action::Dpi(args.join(" "))),
        "show" => Some(Action::Show),
        "print" => Some(Action::Print),
        "export" => Some(Action::Export),
        "wait" => Some(Action::Wait),
        "help" | "?" => Some(Action::Help),
        "quit" | "exit" => Some(Action::Quit),
        _ => return Line::Unknown(head.to_string()),
    };
    action.map_or(Line::Malformed, Line::Action)
}

fn parse_resize(dimension: Dimension, args: &[&str]) -> Option<Action> {
    match args {
        [side, index, value] => {
            let side = Side::from_str(side)?;
            let index = index.parse::<usize>().ok()?;
            Some(Action::Resize {
                side,
                index,
                dimension,
                value: value.to_string(),
            })
        }
        _ => None,
    }
}

/// Drives `session` from `input` until `quit` or end of input.
///
/// Exports still running when input ends are waited for so their files land.
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    out: &mut W,
    interactive: bool,
) -> io::Result<()> {
    let mut exports: Vec<PendingExport> = Vec::new();
    let mut lines = input.lines();
    loop {
        if interactive {
            write!(out, "> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        session.poll_uploads();
        match parse_line(&line) {
            Line::Blank | Line::Malformed => {}
            Line::Unknown(word) => writeln!(out, "unknown command `{word}`; try `help`")?,
            Line::Action(Action::Quit) => break,
            Line::Action(action) => apply(session, action, &mut exports, out)?,
        }
    }
    session.wait_for_uploads();
    finish_exports(exports, out)
}

fn apply<W: Write>(
    session: &mut Session,
    action: Action,
    exports: &mut Vec<PendingExport>,
    out: &mut W,
) -> io::Result<()> {
    match action {
        Action::Upload { side, paths } => {
            for path in paths {
                session.upload(side, UploadFile::from_path(path));
            }
        }
        Action::Remove { side, index } => session.remove(side, index),
        Action::Resize {
            side,
            index,
            dimension,
            value,
        } => session.resize(side, index, dimension, &value),
        Action::Paper(name) => session.set_paper_name(&name),
        Action::Dpi(raw) => session.set_dpi(&raw),
        Action::Show => write!(out, "{}", render_show(session))?,
        Action::Print => session.print(),
        Action::Export => exports.push(session.export_png()),
        Action::Wait => {
            session.wait_for_uploads();
            finish_exports(std::mem::take(exports), out)?;
        }
        Action::Help => writeln!(out, "{HELP}")?,
        Action::Quit => {}
    }
    Ok(())
}

fn finish_exports<W: Write>(exports: Vec<PendingExport>, out: &mut W) -> io::Result<()> {
    for pending in exports {
        if let Some(path) = pending.wait() {
            writeln!(out, "exported {}", path.display())?;
        }
    }
    Ok(())
}

pub fn render_show(session: &Session) -> String {
    let paper = session.paper().config();
    let mut text = String::new();
    let _ = writeln!(
        text,
        "paper {} ({} x {} mm, {} rows), export {} dpi",
        paper.name,
        paper.width_mm,
        paper.height_mm,
        paper.grid_rows,
        session.dpi()
    );
    let pending = session.pending_uploads();
    if pending > 0 {
        let _ = writeln!(text, "{pending} upload(s) still reading");
    }
    for side in [Side::Left, Side::Right] {
        let records = session.images().side(side);
        if records.is_empty() {
            let _ = writeln!(text, "{side}: none");
            continue;
        }
        let _ = writeln!(text, "{side}:");
        for (index, record) in records.iter().enumerate() {
            let _ = writeln!(
                text,
                "  [{index}] {:.1} x {:.1} mm  {}",
                record.width_mm,
                record.height_mm,
                &record.fingerprint()[..12]
            );
        }
    }
    let _ = writeln!(text, "cells:");
    for cell in session.layout() {
        let shown = match cell.image {
            Some(index) => format!("{}[{index}]", cell.side),
            None => "empty".to_string(),
        };
        let _ = writeln!(
            text,
            "  {:>2}  row {}  {:<5}  {shown}",
            cell.index, cell.row, cell.side
        );
    }
    text
}

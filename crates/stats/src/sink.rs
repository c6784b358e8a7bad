//! Flat-file sinks for collected data.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use nbaflow_core::PlayerId;

use crate::error::SinkError;
use crate::requests::Headshot;
use crate::table::{Table, cell_text};

const SEPARATOR: char = ',';

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one CSV row, quoting only the fields that need it.
pub fn write_row<W: Write, C: AsRef<str>>(mut w: W, row: &[C]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{SEPARATOR}")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Header line followed by every row.
pub fn write_table<W: Write>(mut w: W, table: &Table) -> io::Result<()> {
    write_row(&mut w, table.columns())?;
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        write_row(&mut w, &cells)?;
    }
    w.flush()
}

/// Write `table` as CSV to `path`, creating parent directories.
pub fn write_csv(table: &Table, path: &Path) -> Result<PathBuf, SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let write_err = |source| SinkError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = fs::File::create(path).map_err(write_err)?;
    write_table(BufWriter::new(file), table).map_err(write_err)?;

    info!(path = %path.display(), rows = table.len(), "table written");
    Ok(path.to_path_buf())
}

/// Save each headshot as `<player_id>.png` under `dir`.
pub fn write_headshots(dir: &Path, headshots: &[Headshot]) -> Result<Vec<PathBuf>, SinkError> {
    ensure_directory(dir)?;

    let mut written = Vec::with_capacity(headshots.len());
    for headshot in headshots {
        let path = dir.join(headshot.file_name());
        fs::write(&path, &headshot.bytes).map_err(|source| SinkError::Write {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    info!(dir = %dir.display(), images = written.len(), "headshots written");
    Ok(written)
}

/// Save a copy of the `template` image as `<player_id>.png` for each of
/// `player_ids`, so players without an official headshot still get one.
pub fn write_template_headshots(
    dir: &Path,
    template: &Path,
    player_ids: &[PlayerId],
) -> Result<Vec<PathBuf>, SinkError> {
    let bytes = fs::read(template).map_err(|source| SinkError::Read {
        path: template.to_path_buf(),
        source,
    })?;
    let stand_ins: Vec<_> = player_ids
        .iter()
        .map(|&player_id| Headshot {
            player_id,
            bytes: bytes.clone(),
        })
        .collect();
    write_headshots(dir, &stand_ins)
}

pub fn ensure_directory(path: &Path) -> Result<(), SinkError> {
    fs::create_dir_all(path).map_err(|source| SinkError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

//! CSV export of rendered frames, one row per glyph.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::scene::Scene;

/// Column header for frame export.
const HEADER: &str = "timestep,layer,entity,value,color,size";

/// Streams scenes to CSV as they are produced.
pub struct FrameWriter<W: Write> {
    wtr: csv::Writer<W>,
    rows: usize,
}

impl FrameWriter<io::BufWriter<File>> {
    /// Creates `path` and writes the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if file creation or writing fails.
    pub fn create(path: &Path) -> csv::Result<Self> {
        let file = File::create(path)?;
        Self::new(io::BufWriter::new(file))
    }
}

impl<W: Write> FrameWriter<W> {
    /// Wraps any writer and writes the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn new(writer: W) -> csv::Result<Self> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);
        wtr.write_record(HEADER.split(','))?;
        Ok(Self { wtr, rows: 0 })
    }

    /// Writes one row per glyph. Empty cells stand for absent values.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_scene(&mut self, scene: &Scene) -> csv::Result<()> {
        for g in &scene.glyphs {
            self.wtr.write_record(&[
                scene.timestep.to_string(),
                g.layer.key().to_string(),
                g.entity.clone().unwrap_or_default(),
                g.value.map(|v| format!("{v:.6}")).unwrap_or_default(),
                g.color.to_string(),
                g.size().map(|s| format!("{s:.4}")).unwrap_or_default(),
            ])?;
            self.rows += 1;
        }
        Ok(())
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flushes and returns the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn finish(self) -> io::Result<W> {
        self.wtr.into_inner().map_err(|e| e.into_error())
    }
}

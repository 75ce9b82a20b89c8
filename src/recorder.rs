use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::psth::HistogramSnapshot;

/// Writes one `time<TAB>value` line per bin.
pub fn write_histogram<W: Write>(writer: &mut W, snapshot: &HistogramSnapshot) -> io::Result<()> {
    for (time, value) in snapshot.time_axis.iter().zip(&snapshot.values) {
        writeln!(writer, "{}\t{}", time, value)?;
    }
    Ok(())
}

/// Saves a snapshot as a tab-separated text file, replacing any existing file.
pub fn save_histogram(path: &Path, snapshot: &HistogramSnapshot) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_histogram(&mut w, snapshot)?;
    w.flush()?;
    info!("histogram saved to {} ({} bins)", path.display(), snapshot.len());
    Ok(())
}

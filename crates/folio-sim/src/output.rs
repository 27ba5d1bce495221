use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// Global JSONL file writer. Set once in main(), read by emit().
static JSONL_WRITER: OnceLock<Mutex<BufWriter<File>>> = OnceLock::new();

/// Build the report path, ensuring the directory exists.
/// Pattern: `<dir>/folio-sim_<mode>_<YYYYMMDD-HHMMSS>.jsonl`
pub fn resolve_report_path(dir: &Path, mode: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let base = format!("folio-sim_{mode}_{timestamp}");

    let candidate = dir.join(format!("{base}.jsonl"));
    if !candidate.exists() {
        return Ok(candidate);
    }
    let mut i = 2;
    loop {
        let candidate = dir.join(format!("{base}_{i}.jsonl"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        i += 1;
    }
}

/// Initialize the global JSONL file writer.
pub fn init_jsonl_writer(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    JSONL_WRITER
        .set(Mutex::new(BufWriter::new(file)))
        .map_err(|_| io::Error::new(io::ErrorKind::AlreadyExists, "JSONL writer already set"))
}

/// Append a line to the report file, if one was configured.
pub fn write_jsonl_line(line: &str) {
    if let Some(writer) = JSONL_WRITER.get() {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }
}

//! The printer-connection seam.
//!
//! The kernel never talks to printer hardware; it asks a `PrinterConnector`
//! for a writable descriptor and hands that descriptor to the last pipeline
//! stage. The default connector appends to a per-printer file under a spool
//! directory, which doubles as the observation point for tests.

use std::fs::OpenOptions;
use std::io;
use std::os::fd::OwnedFd;
use std::path::PathBuf;

/// Supplies a writable byte sink for a named printer.
///
/// Called by the scheduler immediately before a pipeline launch; the returned
/// descriptor is inherited by the pipeline and closed everywhere else.
pub trait PrinterConnector: Send + Sync {
    fn connect(&self, name: &str, type_name: &str) -> io::Result<OwnedFd>;
}

/// Connector that appends each printer's output to `<dir>/<name>.out`.
#[derive(Debug)]
pub struct SpoolDirConnector {
    dir: PathBuf,
}

impl SpoolDirConnector {
    /// Create the connector, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The file a printer's bytes land in.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.out"))
    }
}

impl PrinterConnector for SpoolDirConnector {
    fn connect(&self, name: &str, _type_name: &str) -> io::Result<OwnedFd> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.output_path(name))?;
        Ok(OwnedFd::from(file))
    }
}

/// Connector that discards all printer output.
#[derive(Debug, Default)]
pub struct NullConnector;

impl PrinterConnector for NullConnector {
    fn connect(&self, _name: &str, _type_name: &str) -> io::Result<OwnedFd> {
        let file = OpenOptions::new().write(true).open("/dev/null")?;
        Ok(OwnedFd::from(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::IntoRawFd;

    #[test]
    fn spool_dir_connector_creates_appendable_file() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SpoolDirConnector::new(dir.path().join("spool")).unwrap();

        let fd = connector.connect("alice", "pdf").unwrap();
        let mut file = std::fs::File::from(fd);
        file.write_all(b"hello").unwrap();
        drop(file);

        let content = std::fs::read(connector.output_path("alice")).unwrap();
        assert_eq!(content, b"hello");
    }

    #[test]
    fn null_connector_yields_valid_fd() {
        let fd = NullConnector.connect("alice", "pdf").unwrap();
        assert!(fd.into_raw_fd() >= 0);
    }
}

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::RegistryError;
use crate::persistence::Registry;
use crate::types::AgentEndpoint;

/// Text registry, one `<host>:<port>` per line. Rewritten in full on
/// every store and truncated on clear.
#[derive(Clone, Debug)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileRegistry { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn truncate(&self) -> Result<File, RegistryError> {
        Ok(OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?)
    }
}

impl Registry for FileRegistry {
    fn store(&self, endpoints: &[AgentEndpoint]) -> Result<(), RegistryError> {
        let mut out = BufWriter::new(self.truncate()?);
        for endpoint in endpoints {
            writeln!(out, "{}", endpoint)?;
        }
        out.flush()?;
        debug!("wrote {} endpoints to {}", endpoints.len(), self.path.display());
        Ok(())
    }

    /// A missing file reads as an empty registry. Blank lines are skipped.
    fn load(&self) -> Result<Vec<AgentEndpoint>, RegistryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut endpoints = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let endpoint = line.parse().map_err(|_| RegistryError::Malformed {
                line: idx + 1,
                content: line.clone(),
            })?;
            endpoints.push(endpoint);
        }
        Ok(endpoints)
    }

    fn clear(&self) -> Result<(), RegistryError> {
        self.truncate()?;
        Ok(())
    }
}

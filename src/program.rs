use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::RunnerError;
use crate::python::LanguagePython;

/// The source of the guest, read once at the start of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestProgram {
    path: PathBuf,
    source: Vec<u8>,
}

impl GuestProgram {
    /// Read the program at `path`.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<GuestProgram, RunnerError> {
        let path = path.into();
        match std::fs::read(&path) {
            Ok(source) => {
                debug!("Guest program {} is {} bytes", path.display(), source.len());
                Ok(GuestProgram { path, source })
            }
            Err(source) => Err(RunnerError::MissingProgram { path, source }),
        }
    }

    /// Where the program was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The source, as it was read.
    pub fn source(&self) -> &[u8] {
        &self.source
    }
}

/// The whole standard input of the guest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer(Vec<u8>);

impl InputBuffer {
    /// Read the input at `path`; a missing file is an empty input.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<InputBuffer, RunnerError> {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(content) => Ok(InputBuffer(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No input file at {}, using an empty input", path.display());
                Ok(InputBuffer::default())
            }
            Err(source) => Err(RunnerError::UnreadableInput {
                path: path.to_owned(),
                source,
            }),
        }
    }

    /// The content of the input.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the buffer returning its content.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for InputBuffer {
    fn from(content: &str) -> Self {
        InputBuffer(content.as_bytes().to_vec())
    }
}

/// Private scratch directory where the guest runs. It's deleted on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    program: PathBuf,
}

impl Workspace {
    /// Create the directory and write a copy of the program in it, so that the file being
    /// executed cannot change during the run.
    pub fn stage(
        program: &GuestProgram,
        language: &LanguagePython,
    ) -> Result<Workspace, RunnerError> {
        let dir = tempfile::Builder::new()
            .prefix("judge-runner")
            .tempdir()
            .map_err(RunnerError::Staging)?;
        let staged = dir.path().join(language.source_file_name());
        std::fs::write(&staged, program.source()).map_err(RunnerError::Staging)?;
        trace!("Staged {} at {}", program.path().display(), staged.display());
        Ok(Workspace {
            dir,
            program: staged,
        })
    }

    /// The scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The staged copy of the program.
    pub fn program_path(&self) -> &Path {
        &self.program
    }
}

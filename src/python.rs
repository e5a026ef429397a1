use std::path::{Path, PathBuf};

use crate::error::RunnerError;

/// Name of the interpreter used when nothing else is specified.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Prefix of the line the bootstrap writes on stderr when the guest raises an exception. The rest
/// of the line is a JSON object with the `name` and the `message` of the exception.
pub const EXCEPTION_MARKER: &str = "@@judge-runner-exception@@ ";

/// Runs the source given as first argument as `__main__`. An uncaught exception is reported on
/// stderr after the traceback with its `str(e)`, without the suggestions the traceback adds.
const BOOTSTRAP: &str = r#"import json, sys, traceback
path = sys.argv[1]
sys.argv = [path]
with open(path, "rb") as f:
    source = f.read()
try:
    code = compile(source, "<string>", "exec")
    exec(code, {"__name__": "__main__", "__file__": path, "__builtins__": __builtins__})
except Exception as e:
    traceback.print_exc()
    try:
        message = str(e)
    except Exception:
        message = ""
    report = json.dumps({"name": type(e).__name__, "message": message})
    sys.__stderr__.write("\n@MARKER@" + report + "\n")
    sys.__stderr__.flush()
    sys.exit(1)
"#;

/// The Python language: how to run a guest source with a Python 3 interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePython {
    /// Name (looked up in `$PATH`) or path of the interpreter.
    interpreter: String,
}

impl Default for LanguagePython {
    fn default() -> Self {
        LanguagePython::new(DEFAULT_INTERPRETER)
    }
}

impl LanguagePython {
    /// Make a new LanguagePython using the specified interpreter.
    pub fn new<S: Into<String>>(interpreter: S) -> LanguagePython {
        LanguagePython {
            interpreter: interpreter.into(),
        }
    }

    /// The name of the language.
    pub fn name(&self) -> &'static str {
        "Python3"
    }

    /// Name of the file the source is staged as, inside the scratch directory.
    pub fn source_file_name(&self) -> &'static str {
        "solution.py"
    }

    /// Absolute path of the interpreter.
    pub fn runtime_command(&self) -> Result<PathBuf, RunnerError> {
        which::which(&self.interpreter).map_err(|source| RunnerError::InterpreterNotFound {
            name: self.interpreter.clone(),
            source,
        })
    }

    /// Arguments of the interpreter for running the source at `path` as the `__main__` module.
    pub fn runtime_args(&self, path: &Path) -> Vec<String> {
        // -B: the scratch directory is thrown away, don't bother writing bytecode there
        vec![
            "-B".to_owned(),
            "-c".to_owned(),
            BOOTSTRAP.replace("@MARKER@", EXCEPTION_MARKER),
            path.to_string_lossy().into_owned(),
        ]
    }

    /// The whole environment of the interpreter. Nothing of the runner leaks into the guest
    /// except `PATH`.
    pub fn runtime_env(&self, workdir: &Path) -> Vec<(String, String)> {
        vec![
            ("PATH".into(), std::env::var("PATH").unwrap_or_default()),
            ("HOME".into(), workdir.to_string_lossy().into_owned()),
            ("LANG".into(), "C.UTF-8".into()),
            ("LC_ALL".into(), "C.UTF-8".into()),
            ("PYTHONIOENCODING".into(), "utf-8".into()),
            ("PYTHONDONTWRITEBYTECODE".into(), "1".into()),
        ]
    }
}

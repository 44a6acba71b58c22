//! This module implements language related facilities: how a source file is compiled and how the
//! compiled program is executed, plus a per-session cache of compiled programs.
//!

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use invoker::{Executable, Redirection, Runner};

use crate::{ErrorKind, ResultExt, Result};

/// Placeholder substituted with the path to the source file.
const SOURCE_PLACEHOLDER: &str = "{source}";

/// Placeholder substituted with the path to the compiled binary.
const BINARY_PLACEHOLDER: &str = "{binary}";

/// How the path to the binary is derived from the path to the source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryPath {
    /// The binary is the source file without its extension.
    StripExtension,

    /// The source file is executed as is.
    Source,
}

/// Describe how programs written in some language are compiled and executed.
#[derive(Clone, Debug)]
pub struct Language {
    /// The name of the language.
    name: String,

    /// Compiler command line template. `None` if programs need no compilation.
    compiler: Option<Vec<String>>,

    /// Derivation of the binary path.
    binary: BinaryPath,

    /// Command line template executing the binary.
    executable: Vec<String>,
}

fn template(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| (*part).to_owned()).collect()
}

impl Language {
    /// Create a new `Language` instance for programs that are compiled before execution.
    pub fn compiled<T>(name: T, compiler: Vec<String>, executable: Vec<String>) -> Language
        where T: Into<String> {
        Language {
            name: name.into(),
            compiler: Some(compiler),
            binary: BinaryPath::StripExtension,
            executable
        }
    }

    /// Create a new `Language` instance for programs executed from their source files.
    pub fn interpreted<T>(name: T, executable: Vec<String>) -> Language
        where T: Into<String> {
        Language {
            name: name.into(),
            compiler: None,
            binary: BinaryPath::Source,
            executable
        }
    }

    /// Get the language of the given source file, judging by its extension.
    pub fn for_source<T: AsRef<Path>>(source: T) -> Result<Language> {
        let source = source.as_ref();
        let extension = source.extension().and_then(|ext| ext.to_str());

        let language = match extension {
            Some("c") => Language::compiled("c",
                template(&["gcc", "-O2", "-std=c11", "-o", BINARY_PLACEHOLDER,
                    SOURCE_PLACEHOLDER, "-lm"]),
                template(&[BINARY_PLACEHOLDER])),
            Some("cpp") | Some("cc") | Some("cxx") => Language::compiled("cpp",
                template(&["g++", "-O2", "-std=c++17", "-o", BINARY_PLACEHOLDER,
                    SOURCE_PLACEHOLDER]),
                template(&[BINARY_PLACEHOLDER])),
            Some("py") => Language::interpreted("python",
                template(&["python3", BINARY_PLACEHOLDER])),
            Some("sh") => Language::interpreted("bash",
                template(&["bash", BINARY_PLACEHOLDER])),
            None => Language::interpreted("binary", template(&[BINARY_PLACEHOLDER])),
            Some(..) => bail!(ErrorKind::UnknownLanguage(source.display().to_string()))
        };

        Ok(language)
    }

    /// Get the name of the language.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Determine whether programs written in this language need to be compiled.
    pub fn needs_compiler(&self) -> bool {
        self.compiler.is_some()
    }

    /// Get the path to the binary compiled from the given source file.
    pub fn binary_path(&self, source: &Path) -> PathBuf {
        match self.binary {
            BinaryPath::StripExtension => source.with_extension(""),
            BinaryPath::Source => source.to_owned()
        }
    }

    fn substitute(parts: &[String], source: &Path, binary: &Path) -> Vec<String> {
        let source = source.display().to_string();
        let binary = binary.display().to_string();
        parts.iter()
            .map(|part| part.replace(SOURCE_PLACEHOLDER, &source).replace(BINARY_PLACEHOLDER, &binary))
            .collect()
    }

    /// Get the compiler command line for the given source file, if any.
    pub fn compiler_command(&self, source: &Path) -> Option<Vec<String>> {
        self.compiler.as_ref()
            .map(|compiler| Language::substitute(compiler, source, &self.binary_path(source)))
    }

    /// Get the executable running the binary compiled from the given source file. A binary run
    /// directly is never looked up in `PATH`.
    pub fn executable(&self, source: &Path) -> Result<Executable> {
        let binary = self.binary_path(source);
        let name = binary.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| binary.display().to_string());

        let executable = if self.executable.len() == 1 && self.executable[0] == BINARY_PLACEHOLDER {
            Executable::local(&binary)
        } else {
            Executable::new(Language::substitute(&self.executable, source, &binary))?
        };
        Ok(executable.with_name(name))
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Cache of compiled programs, keyed by the absolute path to their sources. A program is
/// compiled at most once per cache, and only when its binary is missing or older than its source.
#[derive(Debug, Default)]
pub struct Compilers {
    cache: HashMap<PathBuf, Executable>,
}

impl Compilers {
    /// Create a new, empty `Compilers` instance.
    pub fn new() -> Compilers {
        Compilers::default()
    }

    /// Get the number of cached programs.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Determine whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Compile the given source file, detecting its language by extension.
    pub fn compile<T: AsRef<Path>>(&mut self, runner: &Runner, source: T) -> Result<Executable> {
        let language = Language::for_source(source.as_ref())?;
        self.compile_with(runner, source, &language)
    }

    /// Compile the given source file written in the given language, and get the executable
    /// running the compiled program.
    pub fn compile_with<T: AsRef<Path>>(&mut self, runner: &Runner, source: T, language: &Language)
        -> Result<Executable> {
        let source = absolute(source.as_ref())?;
        if let Some(executable) = self.cache.get(&source) {
            return Ok(executable.clone());
        }

        let binary = language.binary_path(&source);
        match language.compiler_command(&source) {
            Some(command) => {
                if is_up_to_date(&source, &binary)? {
                    debug!("compile skipped: {}", binary.display());
                } else {
                    info!("compile: {} -> {}", source.display(), binary.display());
                    compile(runner, command, &source)?;
                }
            },
            None => {
                if !source.is_file() {
                    bail!(ErrorKind::CompilationFailed(
                        format!("{}: no such file", source.display())));
                }
            }
        };

        let executable = language.executable(&source)?;
        self.cache.insert(source, executable.clone());
        Ok(executable)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_owned())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Determine whether the binary exists and is not older than the source.
fn is_up_to_date(source: &Path, binary: &Path) -> Result<bool> {
    let source_modified = std::fs::metadata(source)
        .and_then(|metadata| metadata.modified())
        .chain_err(|| ErrorKind::CompilationFailed(format!("{}: no such file", source.display())))?;

    match std::fs::metadata(binary).and_then(|metadata| metadata.modified()) {
        Ok(binary_modified) => Ok(binary_modified >= source_modified),
        Err(..) => Ok(false)
    }
}

fn compile(runner: &Runner, command: Vec<String>, source: &Path) -> Result<()> {
    let compiler = Executable::new(command)?;
    let mut builder = compiler.command(Vec::<String>::new())?;
    builder.working_dir = source.parent().map(Path::to_owned);
    builder.redirections.stdin = Redirection::Null;
    builder.redirections.stderr = Redirection::Capture;

    let result = runner.run(builder)?;
    if !result.is_ok() {
        let message = result.stderr()
            .map(|stderr| String::from_utf8_lossy(stderr).into_owned())
            .unwrap_or_default();
        warn!("compilation of {} failed ({}):\n{}", source.display(), result, message);
        bail!(ErrorKind::CompilationFailed(source.display().to_string()));
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_by_extension() {
        assert_eq!("cpp", Language::for_source("sol.cpp").unwrap().name());
        assert_eq!("c", Language::for_source("sol.c").unwrap().name());
        assert_eq!("python", Language::for_source("gen.py").unwrap().name());
        assert_eq!("binary", Language::for_source("sol").unwrap().name());
        assert!(Language::for_source("sol.unknown").is_err());
    }

    #[test]
    fn test_command_templates() {
        let language = Language::for_source("sol.cpp").unwrap();
        let source = Path::new("/p/sol.cpp");
        assert!(language.needs_compiler());
        assert_eq!(PathBuf::from("/p/sol"), language.binary_path(source));

        let command = language.compiler_command(source).unwrap();
        assert!(command.contains(&"/p/sol.cpp".to_owned()));
        assert!(command.contains(&"/p/sol".to_owned()));

        let executable = language.executable(source).unwrap();
        assert_eq!(&["/p/sol".to_owned()], executable.command_prefix());
        assert_eq!("sol", executable.name());

        let language = Language::for_source("gen.py").unwrap();
        let executable = language.executable(Path::new("/p/gen.py")).unwrap();
        assert_eq!(&["python3".to_owned(), "/p/gen.py".to_owned()], executable.command_prefix());
    }

    #[test]
    fn test_relative_binary_is_local() {
        let language = Language::for_source("sol.cpp").unwrap();
        let executable = language.executable(Path::new("sol.cpp")).unwrap();
        assert_eq!(&["./sol".to_owned()], executable.command_prefix());
        assert_eq!("sol", executable.name());

        let language = Language::for_source("checker").unwrap();
        let executable = language.executable(Path::new("checker")).unwrap();
        assert_eq!(&["./checker".to_owned()], executable.command_prefix());
    }

    #[test]
    fn test_compile_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prog.src");
        std::fs::write(&source, "echo compiled\n").unwrap();

        let language = Language::compiled("copy",
            template(&["cp", SOURCE_PLACEHOLDER, BINARY_PLACEHOLDER]),
            template(&["sh", BINARY_PLACEHOLDER]));
        let runner = Runner::new();
        let mut compilers = Compilers::new();

        let executable = compilers.compile_with(&runner, &source, &language).unwrap();
        assert!(dir.path().join("prog").is_file());
        assert_eq!(1, compilers.len());
        assert_eq!(executable, compilers.compile_with(&runner, &source, &language).unwrap());
        assert_eq!(1, compilers.len());
    }

    #[test]
    fn test_up_to_date_binary_is_not_recompiled() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prog.src");
        std::fs::write(&source, "true\n").unwrap();
        std::fs::write(dir.path().join("prog"), "true\n").unwrap();

        let failing = Language::compiled("failing",
            template(&["false"]),
            template(&["sh", BINARY_PLACEHOLDER]));
        let mut compilers = Compilers::new();
        compilers.compile_with(&Runner::new(), &source, &failing).unwrap();
    }

    #[test]
    fn test_compilation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prog.src");
        std::fs::write(&source, "true\n").unwrap();

        let failing = Language::compiled("failing",
            template(&["sh", "-c", "echo broken >&2; exit 1"]),
            template(&["sh", BINARY_PLACEHOLDER]));
        let mut compilers = Compilers::new();
        let err = compilers.compile_with(&Runner::new(), &source, &failing).unwrap_err();
        match err.kind() {
            ErrorKind::CompilationFailed(..) => (),
            kind => panic!("unexpected error kind: {:?}", kind)
        }
        assert!(compilers.is_empty());
    }

    #[test]
    fn test_interpreted_source_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut compilers = Compilers::new();
        assert!(compilers.compile(&Runner::new(), dir.path().join("missing.sh")).is_err());
    }
}

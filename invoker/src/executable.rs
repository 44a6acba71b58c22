use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

use super::{ErrorKind, ProcessBuilder, Result, RunResult, Runner};

/// A program that can be invoked with additional arguments, e.g. `python3 gen.py` or `./sol`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executable {
    /// Command line prefix. The first element is the program.
    command: Vec<String>,

    /// Name displayed in logs.
    name: String,

    /// Working directory of the started processes.
    directory: Option<PathBuf>,
}

impl Executable {
    /// Create a new `Executable` from the given command line prefix. Fails if the prefix is empty.
    pub fn new<I, S>(command: I) -> Result<Executable>
        where I: IntoIterator<Item = S>, S: Into<String> {
        let command = command.into_iter().map(Into::into).collect::<Vec<String>>();
        if command.is_empty() {
            bail!(ErrorKind::EmptyCommand);
        }

        Ok(Executable {
            name: command.join(" "),
            command,
            directory: None
        })
    }

    /// Create a new `Executable` running the binary at the given path. A bare file name refers to
    /// the current directory rather than to `PATH`.
    pub fn local<P>(path: P) -> Executable
        where P: AsRef<Path> {
        let path = path.as_ref();
        let mut components = path.components();
        let bare = match (components.next(), components.next()) {
            (Some(Component::Normal(..)), None) => true,
            _ => false
        };

        let program = if bare {
            Path::new(".").join(path)
        } else {
            path.to_owned()
        };
        let program = program.display().to_string();

        Executable {
            name: program.clone(),
            command: vec![program],
            directory: None
        }
    }

    /// Set the display name.
    pub fn with_name<T>(mut self, name: T) -> Executable
        where T: Into<String> {
        self.name = name.into();
        self
    }

    /// Set the working directory of the started processes.
    pub fn in_directory<P>(mut self, directory: P) -> Executable
        where P: Into<PathBuf> {
        self.directory = Some(directory.into());
        self
    }

    /// Get the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the command line prefix.
    pub fn command_prefix(&self) -> &[String] {
        &self.command
    }

    /// Create a `ProcessBuilder` running this executable with the given additional arguments.
    /// Redirections and limits are left to the caller.
    pub fn command<I, S>(&self, args: I) -> Result<ProcessBuilder>
        where I: IntoIterator<Item = S>, S: Into<String> {
        let mut builder = ProcessBuilder::from_command(self.command.iter().cloned())?;
        for arg in args {
            builder.add_arg(arg)?;
        }
        builder.working_dir = self.directory.clone();

        Ok(builder)
    }

    /// Run this executable with inherited standard streams and no limits.
    pub fn run<I, S>(&self, runner: &Runner, args: I) -> Result<RunResult>
        where I: IntoIterator<Item = S>, S: Into<String> {
        runner.run(self.command(args)?)
    }
}

impl Display for Executable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_normalizes_bare_name() {
        assert_eq!(&["./sol".to_owned()], Executable::local("sol").command_prefix());
        assert_eq!(&["./bin/sol".to_owned()], Executable::local("./bin/sol").command_prefix());
        assert_eq!(&["/usr/bin/sol".to_owned()], Executable::local("/usr/bin/sol").command_prefix());
    }

    #[test]
    fn test_name_defaults_to_command() {
        let executable = Executable::new(vec!["python3", "gen.py"]).unwrap();
        assert_eq!("python3 gen.py", executable.name());
        assert_eq!("gen", executable.with_name("gen").to_string());
    }

    #[test]
    fn test_command_appends_args() {
        let executable = Executable::new(vec!["python3", "gen.py"]).unwrap()
            .in_directory("/tmp");
        let builder = executable.command(vec!["1", "2"]).unwrap();
        assert_eq!("python3 gen.py 1 2", builder.command_line());
        assert_eq!(Some(PathBuf::from("/tmp")), builder.working_dir);
    }

    #[test]
    fn test_run() {
        let executable = Executable::new(vec!["sh", "-c", "exit $0"]).unwrap();
        let runner = Runner::new();
        assert!(executable.run(&runner, vec!["0"]).unwrap().is_ok());
        assert_eq!(5, executable.run(&runner, vec!["5"]).unwrap().exit_code());
    }

    #[test]
    fn test_empty_command() {
        assert!(Executable::new(Vec::<String>::new()).is_err());
    }
}

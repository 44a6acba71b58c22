//! This module maintains problem configurations, loaded from the `problem.yaml` file in the root
//! directory of a problem.
//!

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{ErrorKind, ResultExt, Result};
use crate::settings::{self, FileName, Settings};

/// Name of the configuration file inside a problem directory.
pub const CONFIG_FILE_NAME: &str = "problem.yaml";

/// A memory limit written either as a number of bytes or as a string with a unit suffix.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MemoryLimitValue {
    /// Number of bytes.
    Bytes(usize),

    /// Size with an optional `K`, `M`, `G` or `T` suffix.
    Text(String),
}

/// Provide limit related configurations.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LimitsConfig {
    /// CPU time limit, in seconds.
    pub time: Option<f64>,

    /// Idleness limit, in seconds.
    pub idle: Option<f64>,

    /// Memory limit.
    pub memory: Option<MemoryLimitValue>,
}

/// Provide problem wide configurations.
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemConfig {
    /// Short name of the problem.
    pub name: String,

    /// Limits applied to solutions.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Input file name of solutions, `<std>` for standard input.
    pub input: Option<String>,

    /// Output file name of solutions, `<std>` for standard output.
    pub output: Option<String>,

    /// Source of the reference solution.
    pub solution: PathBuf,

    /// Source of the checker. The built-in token checker is used if absent.
    pub checker: Option<PathBuf>,

    /// Source of the input validator.
    pub validator: Option<PathBuf>,

    /// Source of the test generator, run inside the tests directory by `build`.
    pub generator: Option<PathBuf>,

    /// Source of the interactor. The problem is interactive if present.
    pub interactor: Option<PathBuf>,

    /// Directory holding the test inputs and their answers.
    #[serde(default = "default_tests_dir")]
    pub tests: PathBuf,
}

fn default_tests_dir() -> PathBuf {
    PathBuf::from("tests")
}

/// Largest accepted time limit, in seconds.
const MAX_LIMIT_SECONDS: f64 = 1e9;

fn seconds(name: &str, value: Option<f64>) -> Result<Option<Duration>> {
    match value {
        Some(value) if value > 0.0 && value <= MAX_LIMIT_SECONDS =>
            Ok(Some(Duration::from_secs_f64(value))),
        Some(value) => bail!(ErrorKind::InvalidConfig(format!("invalid {} limit: {}", name, value))),
        None => Ok(None)
    }
}

impl ProblemConfig {
    /// Parse a problem configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<ProblemConfig> {
        let config: ProblemConfig = serde_yaml::from_str(yaml)
            .chain_err(|| ErrorKind::InvalidConfig(String::from("malformed YAML")))?;
        Ok(config)
    }

    /// Load the problem configuration from the given file.
    pub fn from_file<T: AsRef<Path>>(config_file: T) -> Result<ProblemConfig> {
        let config_file = config_file.as_ref();
        info!("Loading problem configuration from file: {}", config_file.display());

        let config_content = std::fs::read_to_string(config_file)
            .chain_err(|| ErrorKind::InvalidConfig(
                format!("cannot read {}", config_file.display())))?;
        ProblemConfig::from_yaml(&config_content)
    }

    /// Get the settings described by this configuration. Fields absent from the configuration
    /// are left unset.
    pub fn settings(&self) -> Result<Settings> {
        let limit_memory = match self.limits.memory {
            Some(MemoryLimitValue::Bytes(bytes)) => Some(invoker::MemorySize::Bytes(bytes)),
            Some(MemoryLimitValue::Text(ref text)) => Some(settings::parse_memory(text)?),
            None => None
        };

        Ok(Settings {
            limit_time: seconds("time", self.limits.time)?,
            limit_idle: seconds("idle", self.limits.idle)?,
            limit_memory,
            input: self.input.as_ref().map(|name| FileName::parse(name)),
            output: self.output.as_ref().map(|name| FileName::parse(name))
        })
    }

    /// Get every program source referenced by this configuration.
    pub fn sources(&self) -> Vec<&Path> {
        let mut sources = vec![self.solution.as_path()];
        sources.extend(self.checker.as_ref().map(PathBuf::as_path));
        sources.extend(self.validator.as_ref().map(PathBuf::as_path));
        sources.extend(self.generator.as_ref().map(PathBuf::as_path));
        sources.extend(self.interactor.as_ref().map(PathBuf::as_path));
        sources
    }

    /// Check that every file referenced by this configuration exists under the given problem
    /// directory. The tests directory may be missing if a generator creates it.
    pub fn check_files<T: AsRef<Path>>(&self, root: T) -> Result<()> {
        let root = root.as_ref();
        for source in self.sources() {
            if !root.join(source).is_file() {
                bail!(ErrorKind::InvalidConfig(format!("unknown file: {}", source.display())));
            }
        }
        if self.generator.is_none() && !root.join(&self.tests).is_dir() {
            bail!(ErrorKind::InvalidConfig(
                format!("unknown tests directory: {}", self.tests.display())));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use invoker::MemorySize;

    #[test]
    fn deserialize_problem_config_yaml() {
        let yaml = r#"
            name: aplusb
            limits:
                time: 2
                idle: 4.5
                memory: 256M
            input: aplusb.in
            output: <stdout>
            solution: solutions/main.cpp
            checker: check.py
            validator: validate.py
        "#;
        let config = ProblemConfig::from_yaml(yaml).unwrap();

        assert_eq!("aplusb", config.name);
        assert_eq!(PathBuf::from("tests"), config.tests);
        assert_eq!(None, config.interactor);
        assert_eq!(3, config.sources().len());

        let settings = config.settings().unwrap();
        assert_eq!(Some(Duration::from_secs(2)), settings.limit_time);
        assert_eq!(Some(Duration::from_millis(4500)), settings.limit_idle);
        assert_eq!(Some(MemorySize::MegaBytes(256)), settings.limit_memory);
        assert_eq!(FileName::Name("aplusb.in".to_owned()), settings.input());
        assert_eq!(FileName::Std, settings.output());
    }

    #[test]
    fn deserialize_minimal_config() {
        let yaml = r#"
            name: echo
            limits:
                memory: 1048576
            solution: echo.sh
            interactor: interact.sh
            tests: data
        "#;
        let config = ProblemConfig::from_yaml(yaml).unwrap();

        let settings = config.settings().unwrap();
        assert_eq!(None, settings.limit_time);
        assert_eq!(Some(MemorySize::MegaBytes(1)), settings.limit_memory);
        assert_eq!(None, settings.input);
        assert_eq!(PathBuf::from("data"), config.tests);
        assert!(config.interactor.is_some());
    }

    #[test]
    fn reject_invalid_limits() {
        let config = ProblemConfig::from_yaml("{name: a, solution: a.sh, limits: {time: -1}}")
            .unwrap();
        assert!(config.settings().is_err());

        let config = ProblemConfig::from_yaml("{name: a, solution: a.sh, limits: {memory: 12X}}")
            .unwrap();
        assert!(config.settings().is_err());

        let config = ProblemConfig::from_yaml("{name: a, solution: a.sh, limits: {idle: 1e20}}")
            .unwrap();
        assert!(config.settings().is_err());

        let config = ProblemConfig::from_yaml(
            "{name: a, solution: a.sh, limits: {memory: 99999999T}}").unwrap();
        assert!(config.settings().is_err());
    }

    #[test]
    fn reject_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProblemConfig::from_yaml("{name: a, solution: a.sh}").unwrap();
        assert!(config.check_files(dir.path()).is_err());

        std::fs::write(dir.path().join("a.sh"), "true\n").unwrap();
        std::fs::create_dir(dir.path().join("tests")).unwrap();
        config.check_files(dir.path()).unwrap();
    }

    #[test]
    fn generated_tests_directory_may_be_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.sh"), "true\n").unwrap();

        let config = ProblemConfig::from_yaml("{name: a, solution: a.sh, generator: gen.sh}")
            .unwrap();
        assert_eq!(2, config.sources().len());
        assert!(config.check_files(dir.path()).is_err());

        std::fs::write(dir.path().join("gen.sh"), "true\n").unwrap();
        config.check_files(dir.path()).unwrap();
    }
}

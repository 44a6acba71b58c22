//! This module implements the operations over the test set of a problem: building it with the
//! generator, validating test inputs, generating reference answers and checking solutions.
//!
//! Every test is an input file inside the tests directory of the problem; its answer is the file
//! with the same name plus the `.a` suffix. Programs run inside a scratch directory created under
//! the problem directory, where the current test is copied to the configured input file.
//!

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use invoker::{
    Executable,
    ProcessBuilder,
    ProcessResourceLimits,
    Redirection,
    RunResult,
    Runner,
};

use crate::{ErrorKind, Result};
use crate::checkers;
use crate::config::{ProblemConfig, CONFIG_FILE_NAME};
use crate::languages::Compilers;
use crate::settings::{FileName, Settings};
use crate::verdict::{PeakTracker, Verdict};

/// Suffix appended to the name of a test to get the name of its answer.
pub const ANSWER_SUFFIX: &str = ".a";

/// Get the path to the answer of the given test.
pub fn answer_path<T: AsRef<Path>>(test: T) -> PathBuf {
    let mut path = OsString::from(test.as_ref().as_os_str());
    path.push(ANSWER_SUFFIX);
    PathBuf::from(path)
}

/// Provide the state shared by the operations of a session: the runner executing programs and the
/// cache of compiled programs.
pub struct ProblemContext {
    /// The runner executing every program.
    pub runner: Runner,

    /// Programs compiled so far.
    pub compilers: Compilers,
}

impl ProblemContext {
    /// Create a new `ProblemContext` instance with an empty compile cache.
    pub fn new(runner: Runner) -> ProblemContext {
        ProblemContext {
            runner,
            compilers: Compilers::new()
        }
    }

    /// Compile the given source file, or get it from the cache.
    fn compile(&mut self, source: &Path) -> Result<Executable> {
        self.compilers.compile(&self.runner, source)
    }
}

/// The scratch directory in which the programs of a problem run.
struct WorkDir {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
    input_is_std: bool,
    output_is_std: bool,
}

impl WorkDir {
    /// Create a new scratch directory under the given problem directory.
    fn new(root: &Path, settings: &Settings) -> Result<WorkDir> {
        let dir = tempfile::Builder::new().prefix(".temp").tempdir_in(root)?;
        let input = settings.input();
        let output = settings.output();

        let input_path = match input {
            FileName::Std => dir.path().join("input"),
            FileName::Name(ref name) => dir.path().join(name)
        };
        let output_path = match output {
            FileName::Std => dir.path().join("output"),
            FileName::Name(ref name) => dir.path().join(name)
        };

        Ok(WorkDir {
            dir,
            input: input_path,
            output: output_path,
            input_is_std: input.is_std(),
            output_is_std: output.is_std()
        })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy the given test to the input file and remove the output of the previous run.
    fn prepare(&self, test: &Path) -> Result<()> {
        std::fs::copy(test, &self.input)?;
        if self.output.exists() {
            std::fs::remove_file(&self.output)?;
        }

        Ok(())
    }

    /// Make the process built by the given builder read the input and write the output of this
    /// directory.
    fn redirect(&self, builder: &mut ProcessBuilder) {
        builder.working_dir = Some(self.path().to_owned());
        builder.redirections.stdin = if self.input_is_std {
            Redirection::File(self.input.clone())
        } else {
            Redirection::Null
        };
        if self.output_is_std {
            builder.redirections.stdout = Redirection::File(self.output.clone());
        }
    }
}

/// Extract a human readable comment from a checker's run.
fn checker_comment(result: &RunResult) -> String {
    let streams = [result.stderr(), result.stdout()];
    for stream in streams.iter() {
        if let Some(bytes) = stream {
            let comment = String::from_utf8_lossy(bytes).trim().to_owned();
            if !comment.is_empty() {
                return comment;
            }
        }
    }

    result.to_string()
}

/// A problem loaded from its directory.
pub struct Problem {
    /// Absolute path to the problem directory.
    root: PathBuf,

    /// Configuration of the problem.
    config: ProblemConfig,

    /// Settings of the problem, with defaults applied.
    settings: Settings,
}

impl Problem {
    /// Load the problem in the given directory from its `problem.yaml`.
    pub fn load<T: AsRef<Path>>(root: T) -> Result<Problem> {
        let root = root.as_ref();
        let config = ProblemConfig::from_file(root.join(CONFIG_FILE_NAME))?;
        Problem::with_config(root, config)
    }

    /// Create a problem in the given directory from an already loaded configuration.
    pub fn with_config<T: AsRef<Path>>(root: T, config: ProblemConfig) -> Result<Problem> {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_owned()
        } else {
            std::env::current_dir()?.join(root)
        };

        config.check_files(&root)?;
        let settings = config.settings()?.fallback(&Settings::defaults());
        debug!("Problem {} settings: {:?}", config.name, settings);

        Ok(Problem {
            root,
            config,
            settings
        })
    }

    /// Get the name of the problem.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the problem directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the configuration of the problem.
    pub fn config(&self) -> &ProblemConfig {
        &self.config
    }

    /// Get the effective settings of the problem.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Override some of the settings of the problem. Unset fields of `overrides` keep their
    /// current values.
    pub fn override_settings(&mut self, overrides: &Settings) {
        self.settings = overrides.fallback(&self.settings);
    }

    /// Determine whether solutions of this problem talk to an interactor.
    pub fn is_interactive(&self) -> bool {
        self.config.interactor.is_some()
    }

    /// List the tests of the problem in name order. Answers and hidden files are skipped.
    pub fn tests(&self) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(&self.config.tests);
        let mut tests = Vec::new();

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let skip = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.starts_with('.') || name.ends_with(ANSWER_SUFFIX),
                None => true
            };
            if !skip && path.is_file() {
                tests.push(path);
            }
        }

        tests.sort();
        if tests.is_empty() {
            bail!(ErrorKind::NoTests);
        }

        Ok(tests)
    }

    fn compile_optional(&self, context: &mut ProblemContext, source: &Option<PathBuf>)
        -> Result<Option<Executable>> {
        match source {
            Some(source) => Ok(Some(context.compile(&self.root.join(source))?)),
            None => Ok(None)
        }
    }

    /// Run the validator on every given test, feeding the test on standard input. The path to the
    /// test is also passed as the only argument.
    pub fn validate(&self, context: &mut ProblemContext, tests: &[PathBuf]) -> Result<()> {
        let validator = match self.compile_optional(context, &self.config.validator)? {
            Some(validator) => validator,
            None => {
                info!("problem {}: no validator, skipping validation", self.name());
                return Ok(());
            }
        };

        info!("validate tests with {}", validator);
        for test in tests {
            let mut builder = validator.command(vec![test.display().to_string()])?;
            builder.working_dir = Some(self.root.clone());
            builder.redirections.stdin = Redirection::File(test.clone());

            let result = context.runner.run(builder)?;
            if !result.is_ok() {
                bail!(ErrorKind::TestFailed(test.display().to_string(),
                    format!("validator: {}", result)));
            }
        }

        Ok(())
    }

    /// Build the test set: run the generator inside the tests directory, list the tests found
    /// there afterwards, validate them and generate every answer anew. Returns the tests.
    pub fn build(&self, context: &mut ProblemContext) -> Result<Vec<PathBuf>> {
        let generator = match self.compile_optional(context, &self.config.generator)? {
            Some(generator) => generator,
            None => bail!(ErrorKind::InvalidConfig(
                format!("problem {} has no generator", self.name())))
        };

        let dir = self.root.join(&self.config.tests);
        std::fs::create_dir_all(&dir)?;

        info!("generate tests with {}", generator);
        let mut builder = generator.command(Vec::<String>::new())?;
        builder.working_dir = Some(dir);
        builder.redirections.stdin = Redirection::Null;

        let result = context.runner.run(builder)?;
        if !result.is_ok() {
            bail!(ErrorKind::GenerationFailed(format!("{}: {}", generator, result)));
        }

        let tests = self.tests()?;
        info!("tests (total: {})", tests.len());
        self.validate(context, &tests)?;
        self.answers(context, &tests, true)?;

        Ok(tests)
    }

    /// Run the solution in the given scratch directory on the test copied there. Returns the
    /// result of the solution and, for interactive problems, the result of the interactor.
    fn run_solution(&self, context: &mut ProblemContext, solution: &Executable,
        interactor: Option<&Executable>, work: &WorkDir, limits: ProcessResourceLimits)
        -> Result<(RunResult, Option<RunResult>)> {
        let mut builder = solution.command(Vec::<String>::new())?;
        builder.limits = limits;

        match interactor {
            Some(interactor) => {
                builder.working_dir = Some(work.path().to_owned());

                let mut interactor = interactor.command(vec![
                    work.input.display().to_string(),
                    work.output.display().to_string()
                ])?;
                interactor.working_dir = Some(work.path().to_owned());
                interactor.limits.idle_time_limit = limits.idle_time_limit;

                let (interactor, solution) = context.runner.run_interactive(builder, interactor)?;
                Ok((solution, Some(interactor)))
            },
            None => {
                work.redirect(&mut builder);
                Ok((context.runner.run(builder)?, None))
            }
        }
    }

    /// Generate the answer of every given test by running the reference solution on it. Tests
    /// that already have an answer are skipped unless `force` is set. Returns the number of
    /// generated answers.
    pub fn answers(&self, context: &mut ProblemContext, tests: &[PathBuf], force: bool)
        -> Result<usize> {
        let solution = context.compile(&self.root.join(&self.config.solution))?;
        let interactor = self.compile_optional(context, &self.config.interactor)?;
        let work = WorkDir::new(&self.root, &self.settings)?;

        // Answers are produced without CPU or memory limits; the idleness limit still guards
        // against a stalled interaction.
        let mut limits = ProcessResourceLimits::empty();
        if interactor.is_some() {
            limits.idle_time_limit = self.settings.limit_idle;
        }

        info!("generate answers with {}", solution);
        let mut generated = 0;
        for test in tests {
            let answer = answer_path(test);
            if answer.is_file() && !force {
                debug!("answer exists: {}", answer.display());
                continue;
            }

            work.prepare(test)?;
            let (result, interactor_result) =
                self.run_solution(context, &solution, interactor.as_ref(), &work, limits)?;
            if !result.is_ok() {
                bail!(ErrorKind::TestFailed(test.display().to_string(),
                    format!("solution: {}", result)));
            }
            if let Some(interactor_result) = interactor_result {
                if !interactor_result.is_ok() {
                    bail!(ErrorKind::TestFailed(test.display().to_string(),
                        format!("interactor: {}", interactor_result)));
                }
            }

            std::fs::copy(&work.output, &answer)?;
            generated += 1;
        }

        Ok(generated)
    }

    /// Judge the output of the solution on one test. Returns `None` if the output is accepted.
    fn run_checker(&self, context: &mut ProblemContext, checker: Option<&Executable>,
        number: usize, work: &WorkDir, answer: &Path) -> Result<Option<Verdict>> {
        let checker = match checker {
            Some(checker) => checker,
            None => {
                if !work.output.is_file() {
                    return Ok(Some(Verdict::wrong_answer(number, "output file not found")));
                }
                let result = checkers::check_tokens(&work.output, answer)?;
                return Ok(if result.accepted {
                    None
                } else {
                    Some(Verdict::wrong_answer(number, result.comment))
                });
            }
        };

        let mut builder = checker.command(vec![
            work.input.display().to_string(),
            work.output.display().to_string(),
            answer.display().to_string()
        ])?;
        builder.working_dir = Some(work.path().to_owned());
        builder.redirections.stdin = Redirection::Null;
        builder.redirections.stdout = Redirection::Capture;
        builder.redirections.stderr = Redirection::Capture;
        builder.limits.idle_time_limit = self.settings.limit_idle;

        let result = context.runner.run(builder)?;
        if result.is_ok() {
            Ok(None)
        } else {
            let comment = checker_comment(&result);
            Ok(Some(Verdict::fail_checker(number, &result, comment)))
        }
    }

    /// Check a solution on every given test. `solution` defaults to the reference solution of the
    /// problem. The first failed test decides the verdict; the peak usage is the maximum over the
    /// tests that ran.
    pub fn check(&self, context: &mut ProblemContext, solution: Option<&Path>, tests: &[PathBuf])
        -> Result<Verdict> {
        if tests.is_empty() {
            bail!(ErrorKind::NoTests);
        }

        let checker = self.compile_optional(context, &self.config.checker)?;
        let interactor = self.compile_optional(context, &self.config.interactor)?;

        let source = match solution {
            Some(solution) => self.root.join(solution),
            None => self.root.join(&self.config.solution)
        };
        let solution = match context.compile(&source) {
            Ok(solution) => solution,
            Err(e) => {
                if let ErrorKind::CompilationFailed(ref source) = *e.kind() {
                    return Ok(Verdict::compilation_error(source.clone()));
                }
                return Err(e);
            }
        };

        info!("checking solution: {}", solution);
        let work = WorkDir::new(&self.root, &self.settings)?;
        let limits = self.settings.limits();
        let mut peaks = PeakTracker::new();

        for (index, test) in tests.iter().enumerate() {
            let number = index + 1;
            let answer = answer_path(test);
            if !answer.is_file() {
                bail!(ErrorKind::TestFailed(test.display().to_string(),
                    String::from("answer not found")));
            }

            work.prepare(test)?;
            let (result, interactor_result) =
                self.run_solution(context, &solution, interactor.as_ref(), &work, limits)?;
            peaks.update(result.peak());
            info!("test #{:02} [{}]: {}", number, test.display(), result);

            if !result.is_ok() {
                return Ok(peaks.apply(Verdict::fail_solution(number, &result)));
            }
            if let Some(interactor_result) = interactor_result {
                if !interactor_result.is_ok() {
                    let comment = checker_comment(&interactor_result);
                    return Ok(peaks.apply(
                        Verdict::fail_checker(number, &interactor_result, comment)));
                }
            }

            if let Some(verdict) = self.run_checker(context, checker.as_ref(), number, &work,
                &answer)? {
                return Ok(peaks.apply(verdict));
            }
        }

        Ok(peaks.apply(Verdict::ok()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::verdict::VerdictKind;

    const SUM_SOLUTION: &str = "read a b\necho $((a + b))\n";

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Create an A+B problem with two tests.
    fn aplusb(config: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "problem.yaml", config);
        write(dir.path(), "solution.sh", SUM_SOLUTION);
        write(dir.path(), "check.sh", "cmp -s \"$2\" \"$3\" || exit 1\n");
        write(dir.path(), "validate.sh", "read a b\n[ \"$a\" -ge 0 ] && [ \"$b\" -ge 0 ]\n");
        write(dir.path(), "tests/01", "1 2\n");
        write(dir.path(), "tests/02", "3 4\n");
        dir
    }

    const APLUSB: &str = r#"
        name: aplusb
        limits:
            time: 2
            idle: 5
            memory: 256M
        solution: solution.sh
        checker: check.sh
        validator: validate.sh
    "#;

    fn context() -> ProblemContext {
        ProblemContext::new(Runner::new())
    }

    fn generated(generator: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "problem.yaml", r#"
            name: aplusb
            solution: solution.sh
            validator: validate.sh
            generator: gen.sh
        "#);
        write(dir.path(), "solution.sh", SUM_SOLUTION);
        write(dir.path(), "validate.sh", "read a b\n[ \"$a\" -ge 0 ] && [ \"$b\" -ge 0 ]\n");
        write(dir.path(), "gen.sh", generator);
        dir
    }

    #[test]
    fn test_build() {
        let dir = generated("for i in 1 2 3; do echo \"$i $((i * 10))\" > 0$i; done\n");
        let problem = Problem::load(dir.path()).unwrap();
        let mut context = context();

        let tests = problem.build(&mut context).unwrap();
        assert_eq!(vec![
            dir.path().join("tests/01"),
            dir.path().join("tests/02"),
            dir.path().join("tests/03")
        ], tests);
        assert_eq!("33\n", std::fs::read_to_string(dir.path().join("tests/03.a")).unwrap());
        assert!(problem.check(&mut context, None, &tests).unwrap().is_ok());
    }

    #[test]
    fn test_build_validates_generated_tests() {
        let dir = generated("echo '1 2' > 01\necho '-1 2' > 02\n");
        let problem = Problem::load(dir.path()).unwrap();

        let err = problem.build(&mut context()).unwrap_err();
        match err.kind() {
            ErrorKind::TestFailed(test, _) => assert!(test.ends_with("02")),
            kind => panic!("unexpected error kind: {:?}", kind)
        }
        assert!(!dir.path().join("tests/01.a").exists());
    }

    #[test]
    fn test_build_failures() {
        let dir = generated("echo '1 2' > 01\nexit 1\n");
        let problem = Problem::load(dir.path()).unwrap();
        match problem.build(&mut context()).unwrap_err().kind() {
            ErrorKind::GenerationFailed(..) => (),
            kind => panic!("unexpected error kind: {:?}", kind)
        }

        let dir = generated("true\n");
        let problem = Problem::load(dir.path()).unwrap();
        match problem.build(&mut context()).unwrap_err().kind() {
            ErrorKind::NoTests => (),
            kind => panic!("unexpected error kind: {:?}", kind)
        }

        let dir = aplusb(APLUSB);
        let problem = Problem::load(dir.path()).unwrap();
        match problem.build(&mut context()).unwrap_err().kind() {
            ErrorKind::InvalidConfig(..) => (),
            kind => panic!("unexpected error kind: {:?}", kind)
        }
    }

    #[test]
    fn test_answer_path() {
        assert_eq!(PathBuf::from("tests/01.a"), answer_path("tests/01"));
    }

    #[test]
    fn test_load_and_list_tests() {
        let dir = aplusb(APLUSB);
        write(dir.path(), "tests/01.a", "3\n");
        write(dir.path(), "tests/.hidden", "");

        let problem = Problem::load(dir.path()).unwrap();
        assert_eq!("aplusb", problem.name());
        assert!(!problem.is_interactive());
        assert_eq!(Some(Duration::from_secs(2)), problem.settings().limit_time);

        let tests = problem.tests().unwrap();
        assert_eq!(vec![dir.path().join("tests/01"), dir.path().join("tests/02")], tests);
    }

    #[test]
    fn test_validate() {
        let dir = aplusb(APLUSB);
        let problem = Problem::load(dir.path()).unwrap();
        let mut context = context();

        problem.validate(&mut context, &problem.tests().unwrap()).unwrap();

        write(dir.path(), "tests/03", "-1 2\n");
        let err = problem.validate(&mut context, &problem.tests().unwrap()).unwrap_err();
        match err.kind() {
            ErrorKind::TestFailed(test, _) => assert!(test.ends_with("03")),
            kind => panic!("unexpected error kind: {:?}", kind)
        }
    }

    #[test]
    fn test_answers() {
        let dir = aplusb(APLUSB);
        let problem = Problem::load(dir.path()).unwrap();
        let mut context = context();
        let tests = problem.tests().unwrap();

        assert_eq!(2, problem.answers(&mut context, &tests, false).unwrap());
        assert_eq!("3\n", std::fs::read_to_string(dir.path().join("tests/01.a")).unwrap());
        assert_eq!("7\n", std::fs::read_to_string(dir.path().join("tests/02.a")).unwrap());

        assert_eq!(0, problem.answers(&mut context, &tests, false).unwrap());
        assert_eq!(2, problem.answers(&mut context, &tests, true).unwrap());
        assert_eq!(1, context.compilers.len());
    }

    #[test]
    fn test_answers_fail_on_broken_solution() {
        let dir = aplusb(APLUSB);
        write(dir.path(), "solution.sh", "exit 3\n");
        let problem = Problem::load(dir.path()).unwrap();
        let tests = problem.tests().unwrap();
        assert!(problem.answers(&mut context(), &tests, false).is_err());
    }

    fn check_with(dir: &TempDir, solution: Option<&str>) -> Verdict {
        let problem = Problem::load(dir.path()).unwrap();
        let mut context = context();
        let tests = problem.tests().unwrap();
        problem.answers(&mut context, &tests, false).unwrap();
        problem.check(&mut context, solution.map(Path::new), &tests).unwrap()
    }

    #[test]
    fn test_check_reference_solution() {
        let dir = aplusb(APLUSB);
        let verdict = check_with(&dir, None);
        assert!(verdict.is_ok());
        assert!(verdict.peak_time().is_some());
        assert!(verdict.peak_memory().is_some());
    }

    #[test]
    fn test_check_wrong_answer() {
        let dir = aplusb(APLUSB);
        write(dir.path(), "wrong.sh", "read a b\necho $((a - b))\n");
        let verdict = check_with(&dir, Some("wrong.sh"));
        assert_eq!(VerdictKind::WrongAnswer(1), verdict.kind());
        assert_eq!("WA/1", verdict.to_string());
    }

    #[test]
    fn test_check_runtime_error_on_second_test() {
        let dir = aplusb(APLUSB);
        write(dir.path(), "crash.sh", "read a b\n[ \"$a\" = 1 ] || exit 3\necho 3\n");
        let verdict = check_with(&dir, Some("crash.sh"));
        assert_eq!("RE/2", verdict.to_string());
    }

    #[test]
    fn test_check_time_limit() {
        let dir = aplusb(APLUSB);
        write(dir.path(), "slow.sh", "while :; do :; done\n");

        let mut problem = Problem::load(dir.path()).unwrap();
        let mut overrides = Settings::new();
        overrides.limit_time = Some(Duration::from_millis(200));
        problem.override_settings(&overrides);
        assert_eq!(Some(Duration::from_secs(5)), problem.settings().limit_idle);

        let mut context = context();
        let tests = problem.tests().unwrap();
        problem.answers(&mut context, &tests, false).unwrap();
        let verdict = problem.check(&mut context, Some(Path::new("slow.sh")), &tests).unwrap();
        assert_eq!(VerdictKind::TimeLimit(1), verdict.kind());
        assert!(verdict.peak_time().unwrap() >= Duration::from_millis(200));
    }

    #[test]
    fn test_check_compilation_error() {
        let dir = aplusb(APLUSB);
        let verdict = check_with(&dir, Some("missing.sh"));
        assert_eq!(VerdictKind::CompilationError, verdict.kind());
    }

    #[test]
    fn test_check_with_builtin_checker() {
        let dir = aplusb(r#"
            name: aplusb
            solution: solution.sh
        "#);
        write(dir.path(), "spaced.sh", "read a b\nprintf '  %d \\n\\n' $((a + b))\n");
        write(dir.path(), "wrong.sh", "read a b\necho 0\n");

        assert!(check_with(&dir, Some("spaced.sh")).is_ok());
        let verdict = check_with(&dir, Some("wrong.sh"));
        assert_eq!("WA/1", verdict.to_string());
        assert_eq!(Some("expect \"3\", but found \"0\""), verdict.comment());
    }

    #[test]
    fn test_check_named_files() {
        let dir = aplusb(r#"
            name: aplusb
            input: sum.in
            output: sum.out
            solution: files.sh
            checker: check.sh
        "#);
        write(dir.path(), "files.sh", "read a b < sum.in\necho $((a + b)) > sum.out\n");
        write(dir.path(), "stdio.sh", SUM_SOLUTION);

        assert!(check_with(&dir, None).is_ok());
        assert_eq!("3\n", std::fs::read_to_string(dir.path().join("tests/01.a")).unwrap());
        assert_eq!(VerdictKind::WrongAnswer(1), check_with(&dir, Some("stdio.sh")).kind());
    }

    #[test]
    fn test_check_interactive() {
        let dir = aplusb(r#"
            name: double
            limits:
                idle: 2
            solution: double.sh
            checker: check.sh
            interactor: interact.sh
        "#);
        write(dir.path(), "double.sh", "read x\necho $((x * 2))\n");
        write(dir.path(), "silent.sh", "read x\nread y\n");
        write(dir.path(), "interact.sh", "read a b < \"$1\"\necho \"$a\"\nread r\necho \"$r\" > \"$2\"\n");
        write(dir.path(), "tests/01.a", "2\n");
        write(dir.path(), "tests/02.a", "6\n");

        let problem = Problem::load(dir.path()).unwrap();
        assert!(problem.is_interactive());
        let mut context = context();
        let tests = problem.tests().unwrap();

        assert!(problem.check(&mut context, None, &tests).unwrap().is_ok());

        let verdict = problem.check(&mut context, Some(Path::new("silent.sh")), &tests).unwrap();
        assert_eq!(VerdictKind::IdlenessLimit(1), verdict.kind());
    }
}

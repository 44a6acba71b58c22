#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
extern crate clap;
extern crate invoker;
extern crate problem;
extern crate stderrlog;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use error_chain::ChainedError;

use invoker::Runner;
use problem::{Problem, ProblemContext, Settings};


error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        Problem(::problem::Error, ::problem::ErrorKind);
    }
}


fn get_arg_matches() -> clap::ArgMatches<'static> {
    let tests_arg = clap::Arg::with_name("tests")
        .long("test")
        .multiple(true)
        .takes_value(true)
        .number_of_values(1)
        .value_name("TEST")
        .help("test to operate on, relative to the problem directory; all tests if omitted");

    clap::App::new("problem-bin")
        .version("0.1.0")
        .author("Lancern <msrlancern@126.com>")
        .about("A wrapper program for developing competitive programming problems in CLI environment.")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .arg(clap::Arg::with_name("problem")
            .short("p")
            .long("problem")
            .takes_value(true)
            .value_name("PROBLEM_DIR")
            .default_value(".")
            .help("path to the problem directory containing problem.yaml"))
        .arg(clap::Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .help("increase the level of logging messages"))
        .arg(clap::Arg::with_name("progress")
            .long("progress")
            .help("print resource usage of programs while they run"))
        .subcommand(clap::SubCommand::with_name("check")
            .version("0.1.0")
            .author("Lancern <msrlancern@126.com>")
            .about("Check a solution against the test set")
            .arg(clap::Arg::with_name("cpu_time_limit")
                .short("t")
                .long("cpu")
                .multiple(false)
                .takes_value(true)
                .value_name("CPU_TIME_LIMIT")
                .help("CPU time limit, in milliseconds; overrides the problem's limit"))
            .arg(clap::Arg::with_name("idle_time_limit")
                .short("r")
                .long("idle")
                .multiple(false)
                .takes_value(true)
                .value_name("IDLE_TIME_LIMIT")
                .help("idleness limit, in milliseconds; overrides the problem's limit"))
            .arg(clap::Arg::with_name("memory_limit")
                .short("m")
                .long("memory")
                .multiple(false)
                .takes_value(true)
                .value_name("MEMORY_LIMIT")
                .help("memory limit such as 256M; overrides the problem's limit"))
            .arg(tests_arg.clone())
            .arg(clap::Arg::with_name("solution")
                .required(false)
                .multiple(false)
                .takes_value(true)
                .value_name("SOLUTION")
                .help("source file of the solution to check; the reference solution if omitted")))
        .subcommand(clap::SubCommand::with_name("build")
            .version("0.1.0")
            .author("Lancern <msrlancern@126.com>")
            .about("Generate, validate and answer the test set"))
        .subcommand(clap::SubCommand::with_name("answers")
            .version("0.1.0")
            .author("Lancern <msrlancern@126.com>")
            .about("Generate answers with the reference solution")
            .arg(clap::Arg::with_name("force")
                .short("f")
                .long("force")
                .help("regenerate answers that already exist"))
            .arg(tests_arg.clone()))
        .subcommand(clap::SubCommand::with_name("validate")
            .version("0.1.0")
            .author("Lancern <msrlancern@126.com>")
            .about("Validate test inputs with the validator")
            .arg(tests_arg))
        .get_matches()
}

fn parse_millis(matches: &clap::ArgMatches<'_>, name: &str) -> Result<Option<Duration>> {
    match matches.value_of(name) {
        Some(value) => {
            let millis = u64::from_str(value)
                .chain_err(|| format!("invalid {} value: {}", name, value))?;
            Ok(Some(Duration::from_millis(millis)))
        },
        None => Ok(None)
    }
}

/// Get the tests selected on the command line, or every test of the problem.
fn selected_tests(problem: &Problem, matches: &clap::ArgMatches<'_>) -> Result<Vec<PathBuf>> {
    match matches.values_of_os("tests") {
        Some(tests) => Ok(tests.map(|test| problem.root().join(test)).collect()),
        None => Ok(problem.tests()?)
    }
}

fn do_check(problem: &mut Problem, context: &mut ProblemContext, matches: &clap::ArgMatches<'_>)
    -> Result<bool> {
    let mut overrides = Settings::new();
    overrides.limit_time = parse_millis(matches, "cpu_time_limit")?;
    overrides.limit_idle = parse_millis(matches, "idle_time_limit")?;
    if let Some(memory) = matches.value_of("memory_limit") {
        overrides.limit_memory = Some(problem::settings::parse_memory(memory)?);
    }
    problem.override_settings(&overrides);

    let tests = selected_tests(problem, matches)?;
    let solution = matches.value_of_os("solution").map(Path::new);
    let verdict = problem.check(context, solution, &tests)?;

    print!("{}", verdict);
    if let Some(comment) = verdict.comment() {
        print!(" ({})", comment);
    }
    if let (Some(time), Some(memory)) = (verdict.peak_time(), verdict.peak_memory()) {
        print!(" [{:.3}s, {:.2}MiB]", time.as_secs_f64(), memory.mebibytes());
    }
    println!();

    Ok(verdict.is_ok())
}

fn do_build(problem: &Problem, context: &mut ProblemContext) -> Result<bool> {
    let tests = problem.build(context)?;
    println!("{} tests built", tests.len());
    Ok(true)
}

fn do_answers(problem: &Problem, context: &mut ProblemContext, matches: &clap::ArgMatches<'_>)
    -> Result<bool> {
    let tests = selected_tests(problem, matches)?;
    let generated = problem.answers(context, &tests, matches.is_present("force"))?;
    println!("{} answers generated, {} skipped", generated, tests.len() - generated);
    Ok(true)
}

fn do_validate(problem: &Problem, context: &mut ProblemContext, matches: &clap::ArgMatches<'_>)
    -> Result<bool> {
    let tests = selected_tests(problem, matches)?;
    problem.validate(context, &tests)?;
    println!("{} tests validated", tests.len());
    Ok(true)
}

fn do_main() -> Result<bool> {
    let matches = get_arg_matches();

    stderrlog::new()
        .modules(vec![module_path!(), "problem", "invoker"])
        .verbosity(matches.occurrences_of("verbose") as usize + 2)
        .init()
        .map_err(|e| Error::from(format!("cannot initialize logger: {}", e)))?;

    let problem_dir = matches.value_of_os("problem").map(PathBuf::from).unwrap_or_default();
    let mut problem = Problem::load(&problem_dir)?;
    info!("problem: {} ({})", problem.name(), problem.root().display());

    let runner = Runner::detect().verbose(matches.is_present("progress"));
    let mut context = ProblemContext::new(runner);

    match matches.subcommand() {
        ("check", Some(check_matches)) => do_check(&mut problem, &mut context, check_matches),
        ("build", Some(..)) => do_build(&problem, &mut context),
        ("answers", Some(answers_matches)) => do_answers(&problem, &mut context, answers_matches),
        ("validate", Some(validate_matches)) =>
            do_validate(&problem, &mut context, validate_matches),
        _ => unreachable!()
    }
}

fn main() {
    match do_main() {
        Ok(true) => (),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e.display_chain().to_string());
            std::process::exit(2);
        }
    }
}

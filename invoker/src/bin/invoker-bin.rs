#[macro_use]
extern crate error_chain;
extern crate invoker;
extern crate clap;
extern crate stderrlog;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use error_chain::ChainedError;

use invoker::{
    MemorySize,
    ProcessBuilder,
    ProcessResourceLimits,
    Redirection,
    RunResult,
    Runner,
};


error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        Invoker(invoker::Error, invoker::ErrorKind);
    }

    foreign_links {
        Io(::std::io::Error);
        Clap(::clap::Error);
    }
}


struct ApplicationConfig {
    pub program: Vec<String>,
    pub interactor: Option<Vec<String>>,
    pub envs: Vec<(String, String)>,

    pub limits: ProcessResourceLimits,

    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub error_file: Option<PathBuf>,

    pub verbose: bool,
    pub log_level: usize,
}

impl ApplicationConfig {
    fn new() -> ApplicationConfig {
        ApplicationConfig {
            program: Vec::new(),
            interactor: None,
            envs: Vec::new(),
            limits: ProcessResourceLimits::empty(),
            input_file: None,
            output_file: None,
            error_file: None,
            verbose: false,
            log_level: 0
        }
    }
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

fn get_app_config() -> Result<ApplicationConfig> {
    let matches = clap::App::new("invoker-bin")
        .version("0.1")
        .author("Lancern <msrlancern@126.com>")
        .about("Run a program, optionally paired with an interactor, under resource limits")
        .arg(clap::Arg::with_name("cpu_time_limit")
            .short("t")
            .long("cpu")
            .takes_value(true)
            .value_name("CPU_TIME_LIMIT")
            .help("specify the CPU time limit, in milliseconds"))
        .arg(clap::Arg::with_name("idle_time_limit")
            .short("r")
            .long("idle")
            .takes_value(true)
            .value_name("IDLE_TIME_LIMIT")
            .help("specify the idleness (wall clock) limit, in milliseconds"))
        .arg(clap::Arg::with_name("memory_limit")
            .short("m")
            .long("mem")
            .takes_value(true)
            .value_name("MEMORY_LIMIT")
            .help("specify the memory limit, in megabytes."))
        .arg(clap::Arg::with_name("input_file")
            .short("i")
            .long("input")
            .takes_value(true)
            .value_name("INPUT_FILE")
            .conflicts_with("interactor")
            .help("specify the path to the input file"))
        .arg(clap::Arg::with_name("output_file")
            .short("o")
            .long("output")
            .takes_value(true)
            .value_name("OUTPUT_FILE")
            .conflicts_with("interactor")
            .help("specify the path to the output file"))
        .arg(clap::Arg::with_name("error_file")
            .short("e")
            .long("error")
            .takes_value(true)
            .value_name("ERROR_FILE")
            .help("specify the path to the error file"))
        .arg(clap::Arg::with_name("interactor")
            .long("interactor")
            .takes_value(true)
            .value_name("INTERACTOR")
            .multiple(true)
            .value_terminator("--")
            .help("specify the interactor along with its arguments, terminated by \"--\""))
        .arg(clap::Arg::with_name("envs")
            .long("env")
            .takes_value(true)
            .value_name("ENVs")
            .multiple(true)
            .number_of_values(1)
            .help("specify the environment variables passed to the child process"))
        .arg(clap::Arg::with_name("verbose")
            .long("verbose")
            .help("print resource usage of the program while it runs"))
        .arg(clap::Arg::with_name("log")
            .short("v")
            .multiple(true)
            .help("increase the level of logging messages"))
        .arg(clap::Arg::with_name("program")
            .value_name("PROGRAM")
            .takes_value(true)
            .multiple(true)
            .required(true)
            .help("specify the program along with its arguments"))
        .get_matches();

    let mut config = ApplicationConfig::new();

    if let Some(program) = matches.values_of("program") {
        config.program = program.map(str::to_owned).collect();
    }
    config.interactor = matches.values_of("interactor")
        .map(|interactor| interactor.map(str::to_owned).collect());

    if let Some(envs) = matches.values_of("envs") {
        for env in envs {
            match env.find('=') {
                Some(pos) => config.envs.push((env[..pos].to_owned(), env[pos + 1..].to_owned())),
                None => bail!(format!("invalid environment variable: {}", env))
            };
        }
    }

    config.limits.cpu_time_limit = parse_millis(&matches, "cpu_time_limit")?;
    config.limits.idle_time_limit = parse_millis(&matches, "idle_time_limit")?;
    if let Some(mem_limit) = matches.value_of("memory_limit") {
        let mem_limit = usize::from_str(mem_limit)
            .chain_err(|| format!("invalid memory limit value: {}", mem_limit))?;
        config.limits.memory_limit = Some(MemorySize::MegaBytes(mem_limit));
    }

    config.input_file = matches.value_of_os("input_file").map(PathBuf::from);
    config.output_file = matches.value_of_os("output_file").map(PathBuf::from);
    config.error_file = matches.value_of_os("error_file").map(PathBuf::from);

    config.verbose = matches.is_present("verbose");
    config.log_level = matches.occurrences_of("log") as usize;

    Ok(config)
}

fn print_result(title: &str, result: &RunResult) {
    print!("{}: {}", title, result);
    if let Some(comment) = result.comment() {
        print!(" ({})", comment);
    }
    println!();

    if let Some(peak) = result.peak() {
        println!("\tCPU time: {} ms", peak.time.as_millis());
        println!("\tPeak resident set size: {} bytes", peak.memory.bytes());
    }
}

fn do_main() -> Result<()> {
    let config = get_app_config()?;

    stderrlog::new()
        .modules(vec![module_path!(), "invoker"])
        .verbosity(config.log_level + 1)
        .init()
        .map_err(|e| Error::from(format!("cannot initialize logger: {}", e)))?;

    let mut builder = ProcessBuilder::from_command(config.program.iter().cloned())?;
    for (name, value) in &config.envs {
        builder.add_env(name.as_str(), value.as_str())?;
    }
    builder.limits = config.limits;

    if let Some(input_file) = config.input_file {
        builder.redirections.stdin = Redirection::File(input_file);
    }
    if let Some(output_file) = config.output_file {
        builder.redirections.stdout = Redirection::File(output_file);
    }
    if let Some(error_file) = config.error_file {
        builder.redirections.stderr = Redirection::File(error_file);
    }

    let runner = Runner::detect().verbose(config.verbose);
    match config.interactor {
        Some(interactor) => {
            let mut interactor = ProcessBuilder::from_command(interactor)?;
            interactor.limits.idle_time_limit = config.limits.idle_time_limit;

            let (interactor_result, solution_result) =
                runner.run_interactive(builder, interactor)?;
            if config.verbose {
                eprintln!();
            }
            print_result("Program", &solution_result);
            print_result("Interactor", &interactor_result);
        },
        None => {
            let result = runner.run(builder)?;
            if config.verbose {
                eprintln!();
            }
            print_result("Program", &result);
        }
    };

    Ok(())
}

fn main() -> Result<()> {
    match do_main() {
        Ok(..) => Ok(()),
        Err(e) => {
            eprintln!("error: {}", e.display_chain().to_string());
            Err(e)
        }
    }
}

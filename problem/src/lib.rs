//! This crate implements the problem side of the harness: limit settings, problem configuration,
//! compilation of the problem's programs and the operations over a problem's test set (validating
//! inputs, generating answers and checking solutions).
//!
//! Every program is executed through the `invoker` crate.
//!

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
extern crate invoker;
extern crate serde;
extern crate serde_yaml;
extern crate tempfile;

mod checkers;
pub mod config;
pub mod languages;
pub mod settings;
pub mod testset;
pub mod verdict;

pub use config::ProblemConfig;
pub use languages::{Compilers, Language};
pub use settings::{FileName, Settings};
pub use testset::{Problem, ProblemContext};
pub use verdict::{Verdict, VerdictKind};

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    links {
        Invoker(::invoker::Error, ::invoker::ErrorKind);
    }

    foreign_links {
        Io(::std::io::Error);
        Yaml(::serde_yaml::Error);
    }

    errors {
        InvalidMemorySize(value: String) {
            description("invalid memory size")
            display("invalid memory size: \"{}\"", value)
        }

        InvalidConfig(reason: String) {
            description("invalid problem configuration")
            display("invalid problem configuration: {}", reason)
        }

        UnknownLanguage(source: String) {
            description("cannot determine language of source file")
            display("cannot determine language of source file: {}", source)
        }

        CompilationFailed(source: String) {
            description("compilation failed")
            display("compilation failed: {}", source)
        }

        TestFailed(test: String, reason: String) {
            description("program failed on test")
            display("program failed on test {}: {}", test, reason)
        }

        NoTests {
            description("no tests found")
        }

        GenerationFailed(reason: String) {
            description("test generation failed")
            display("test generation failed: {}", reason)
        }
    }
}

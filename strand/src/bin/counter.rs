//! Counter smoke program.
//!
//! Starts a managed thread that prints the integers `0..count`, sleeps on
//! the main thread, then tears the managed thread down.
//!
//! # Usage
//!
//! ```sh
//! strand-counter --count 10 --interval-ms 50 --wait-ms 1000
//! ```

use std::time::Duration;

use strand::{CpuConfig, ManagedThread, StartError, StopToken, ThreadBody, ThreadConfig};

/// Default number of values printed.
const DEFAULT_COUNT: u64 = 10;

/// Default time the main thread waits before teardown.
const DEFAULT_WAIT_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Start(#[from] StartError),
}

struct Options {
    count: u64,
    interval: Duration,
    wait: Duration,
    cpu: CpuConfig,
}

/// Prints `i : <n>` for each value, stopping early if asked to.
struct Counter {
    count: u64,
    interval: Duration,
}

impl ThreadBody for Counter {
    fn thread_main(&self, stop: &StopToken) {
        for i in 0..self.count {
            if stop.is_stop_requested() {
                return;
            }
            println!("i : {i}");
            if !self.interval.is_zero() && stop.wait(self.interval) {
                return;
            }
        }
    }

    fn request_stop(&self) {}
}

fn main() {
    strand::init_tracing();

    if let Err(e) = run() {
        eprintln!("strand-counter: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args)?;

    let config = ThreadConfig {
        cpu: options.cpu,
        ..ThreadConfig::named("counter")
    };
    let mut counter = ManagedThread::with_config(
        Counter {
            count: options.count,
            interval: options.interval,
        },
        config,
    );

    counter.try_start()?;
    std::thread::sleep(options.wait);

    // Teardown stops the counter if it is still printing.
    drop(counter);
    Ok(())
}

fn parse_args(args: &[String]) -> Result<Options, CliError> {
    let mut options = Options {
        count: DEFAULT_COUNT,
        interval: Duration::ZERO,
        wait: Duration::from_millis(DEFAULT_WAIT_MS),
        cpu: CpuConfig::Disabled,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--count" | "-n" => {
                i += 1;
                options.count = parse_value(args.get(i), flag)?;
            }
            "--interval-ms" => {
                i += 1;
                options.interval = Duration::from_millis(parse_value(args.get(i), flag)?);
            }
            "--wait-ms" | "-w" => {
                i += 1;
                options.wait = Duration::from_millis(parse_value(args.get(i), flag)?);
            }
            "--core" | "-c" => {
                i += 1;
                options.cpu = CpuConfig::Core(parse_value(args.get(i), flag)?);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            arg => return Err(CliError::Usage(format!("unknown argument: {arg}"))),
        }
        i += 1;
    }

    Ok(options)
}

fn parse_value<T>(value: Option<&String>, flag: &str) -> Result<T, CliError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.ok_or_else(|| CliError::Usage(format!("missing value for {flag}")))?;
    value
        .parse()
        .map_err(|e| CliError::Usage(format!("invalid value for {flag}: {e}")))
}

fn print_usage() {
    eprintln!(
        r#"strand-counter - print integers from a managed thread

USAGE:
    strand-counter [OPTIONS]

OPTIONS:
    -n, --count <N>          Number of values to print (default: 10)
        --interval-ms <MS>   Delay between values (default: 0)
    -w, --wait-ms <MS>       Time before teardown (default: 1000)
    -c, --core <ID>          Pin the counter thread to a core
    -h, --help               Print this help message

ENVIRONMENT:
    RUST_LOG                 Log filter when built with --features tracing
"#
    );
}

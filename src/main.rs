//! Thin CLI layer: parse args, styled output, and call into fanout-core.

mod bench;

use std::env;
use std::io::IsTerminal;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use fanout_core::{
    load_config, run, CancelToken, Message, MessageService, PoolPolicy, RunStats, RunnerError,
    SlowService, StopWatch, Strategy, DEFAULT_MAX_DELAY_MS, DEFAULT_SEED,
};

// ---- UI helpers (no-op when stdout isn't a TTY) ----

fn use_color() -> bool {
    std::io::stdout().is_terminal() && env::var("NO_COLOR").unwrap_or_default().is_empty()
}

fn success(msg: &str) {
    if use_color() {
        println!("{}", msg.green());
    } else {
        println!("{}", msg);
    }
}

fn error(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.red());
    } else {
        eprintln!("{}", msg);
    }
}

fn info(msg: &str) {
    if use_color() {
        println!("{}", msg.cyan());
    } else {
        println!("{}", msg);
    }
}

fn dim(msg: &str) {
    if use_color() {
        println!("{}", msg.dimmed());
    } else {
        println!("{}", msg);
    }
}

/// Service decorator that ticks a progress bar as results complete.
struct ProgressService<S> {
    inner: S,
    bar: ProgressBar,
}

impl<S: MessageService> MessageService for ProgressService<S> {
    fn get_message(&self, id: u32, cancel: &CancelToken) -> Result<Message, RunnerError> {
        let result = self.inner.get_message(id, cancel);
        if result.is_ok() {
            self.bar.inc(1);
        }
        result
    }
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:30.dim} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Knobs for one run, merged from .fanoutrc, FANOUT_* env, and flags.
pub(crate) struct Knobs {
    pub count: u32,
    pub workers: Option<usize>,
    pub timeout: Duration,
    pub max_delay_ms: u64,
    pub seed: u64,
    pub json: bool,
    pub quiet: bool,
}

impl Knobs {
    fn from_matches(matches: &ArgMatches) -> Result<Self, String> {
        let mut cfg = load_config(&env::current_dir().map_err(|e| e.to_string())?);
        cfg.apply_env();

        let parse_u64 = |name: &str| -> Result<Option<u64>, String> {
            match matches.get_one::<String>(name) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| format!("--{} expects a number, got '{}'", name, raw)),
                None => Ok(None),
            }
        };

        let count = parse_u64("count")?.unwrap_or(20);
        if count > u32::MAX as u64 {
            return Err(format!("--count {} is out of range", count));
        }
        let workers = parse_u64("workers")?
            .map(|w| w as usize)
            .or(cfg.workers);
        let timeout_ms = parse_u64("timeout-ms")?
            .or(cfg.timeout_ms)
            .unwrap_or(10_000);
        let max_delay_ms = parse_u64("max-delay-ms")?
            .or(cfg.max_delay_ms)
            .unwrap_or(DEFAULT_MAX_DELAY_MS);
        let seed = parse_u64("seed")?.or(cfg.seed).unwrap_or(DEFAULT_SEED);

        Ok(Self {
            count: count as u32,
            workers,
            timeout: Duration::from_millis(timeout_ms),
            max_delay_ms,
            seed,
            json: matches.get_flag("json"),
            quiet: matches.get_flag("quiet"),
        })
    }

    pub fn policy(&self) -> PoolPolicy {
        match self.workers {
            Some(w) => PoolPolicy::Fixed(w),
            None => PoolPolicy::PerCore,
        }
    }

    pub fn service(&self) -> Arc<SlowService> {
        Arc::new(SlowService::new(self.max_delay_ms, self.seed))
    }

    pub fn show_progress(&self) -> bool {
        !self.json && !self.quiet && self.count > 0
    }
}

fn common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("count")
            .short('n')
            .long("count")
            .help("Number of slow calls to fan out (default: 20)"),
    )
    .arg(
        Arg::new("workers")
            .short('w')
            .long("workers")
            .help("Pool size / fork-join parallelism (default: one per core)"),
    )
    .arg(
        Arg::new("timeout-ms")
            .long("timeout-ms")
            .help("Global deadline for the pool strategy in ms (default: 10000)"),
    )
    .arg(
        Arg::new("max-delay-ms")
            .long("max-delay-ms")
            .help("Upper bound for simulated per-call delay in ms (default: 1000)"),
    )
    .arg(
        Arg::new("seed")
            .long("seed")
            .help("Seed for the deterministic delay derivation"),
    )
    .arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Output machine-readable JSON result"),
    )
    .arg(
        Arg::new("quiet")
            .short('q')
            .long("quiet")
            .action(ArgAction::SetTrue)
            .help("Minimal output, no progress bar"),
    )
}

fn cmd_run(matches: &ArgMatches) -> Result<(), String> {
    let knobs = Knobs::from_matches(matches)?;
    let strategy_name = matches
        .get_one::<String>("strategy")
        .map(String::as_str)
        .unwrap_or("pool");
    let strategy = Strategy::from_name(strategy_name)
        .ok_or_else(|| format!("unknown strategy '{}'", strategy_name))?;

    if knobs.quiet {
        env::set_var("FANOUT_QUIET", "1");
    }

    let bar = if knobs.show_progress() {
        Some(progress_bar(u64::from(knobs.count)))
    } else {
        None
    };
    let service = Arc::new(ProgressService {
        inner: SlowService::new(knobs.max_delay_ms, knobs.seed),
        bar: bar.clone().unwrap_or_else(ProgressBar::hidden),
    });

    if !knobs.json {
        info(&format!(
            "Fanning out {} calls via {} …",
            knobs.count,
            strategy.as_str()
        ));
    }

    let cancel = CancelToken::new();
    let mut watch = StopWatch::new();
    watch.start();
    let outcome = run(
        strategy,
        &service,
        knobs.count,
        knobs.policy(),
        knobs.timeout,
        knobs.workers,
        &cancel,
    );
    watch.stop();
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    match outcome {
        Ok(messages) => {
            let stats = RunStats::from_run(&messages, watch.elapsed_ms());
            if knobs.json {
                let doc = serde_json::json!({
                    "strategy": strategy.as_str(),
                    "stats": stats,
                    "messages": messages,
                });
                println!("{}", doc);
            } else {
                report_run(strategy, &messages, &stats);
            }
            Ok(())
        }
        Err(e) => fail(&knobs, e),
    }
}

fn report_run(strategy: Strategy, messages: &[Message], stats: &RunStats) {
    success(&format!(
        "{}: {} results in {}ms",
        strategy.as_str(),
        stats.count,
        stats.wall_ms
    ));
    if let Some(slowest) = messages.last() {
        info(&format!("Slowest: {}", slowest));
    }
    dim(&format!(
        "delays: min {}ms / mean {}ms / p95 {}ms / max {}ms (sum {}ms)",
        stats.min_delay_ms,
        stats.mean_delay_ms,
        stats.p95_delay_ms,
        stats.max_delay_ms,
        stats.total_delay_ms
    ));
}

/// Map a failed run to the right output stream and exit code 1.
fn fail(knobs: &Knobs, e: RunnerError) -> Result<(), String> {
    if knobs.json {
        println!("{}", serde_json::json!({ "error": e }));
        process::exit(1);
    }
    Err(e.to_string())
}

fn run_cli() -> Result<(), String> {
    let matches = Command::new("fanout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fan-out/fan-in runner for slow operations — sequential, pooled, fork-join")
        .after_help(
            "Examples:\n  fanout run -n 50\n  fanout run -n 50 --strategy forkjoin -w 8\n  fanout run --strategy pool --timeout-ms 1500\n  fanout bench -n 30",
        )
        .subcommand(common_args(
            Command::new("run")
                .about("Run one strategy and report the sorted results")
                .arg(
                    Arg::new("strategy")
                        .short('s')
                        .long("strategy")
                        .value_parser(["sequential", "pool", "forkjoin"])
                        .help("Concurrency strategy (default: pool)"),
                ),
        ))
        .subcommand(common_args(Command::new("bench").about(
            "Run every strategy over the same inputs and compare wall times",
        )))
        .get_matches();

    match matches.subcommand() {
        Some(("run", sub)) => cmd_run(sub),
        Some(("bench", sub)) => {
            let knobs = Knobs::from_matches(sub)?;
            bench::cmd_bench(&knobs)
        }
        _ => Err("no subcommand given; try `fanout run` or `fanout bench`".to_string()),
    }
}

fn main() {
    if let Err(e) = run_cli() {
        error(&format!("Error: {}", e));
        process::exit(1);
    }
}

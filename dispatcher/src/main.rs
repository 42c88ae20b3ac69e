//! Offline rule-driven dispatch agent.
//!
//! Reads free-form text (or a build log), routes it through the rule table
//! and prints the policy-filtered reply. Mode changes persist to
//! `.dispatcher/state.json` unless disabled in the config.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dispatcher::actions::render_report;
use dispatcher::agent::Agent;
use dispatcher::core::stages::locate;
use dispatcher::core::types::ActionResult;
use dispatcher::exit_codes;
use dispatcher::io::config::{AgentConfig, DEFAULT_CONFIG_PATH, load_config};
use dispatcher::logging;

const QUIT_COMMAND: &str = "/quit";

#[derive(Parser)]
#[command(
    name = "dispatcher",
    version,
    about = "Offline rule-driven dispatch agent"
)]
struct Cli {
    /// Path to the TOML config file (missing file = defaults).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Debug tracing on stderr, plus the metadata bag after each reply.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single input.
    Ask {
        /// Input text; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Answer stdin line by line until EOF or `/quit`.
    Repl,
    /// Print the stage report for a build log.
    Locate {
        /// Log file to read (stdin when omitted).
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List rules in evaluation order.
    Rules,
    /// Validate the config and the rule table.
    Check,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let cfg = load_config(&cli.config)?;
    let debug = cli.debug || cfg.debug;
    match cli.command {
        Command::Ask { text } => cmd_ask(cfg, &text.join(" "), debug),
        Command::Repl => cmd_repl(cfg, debug),
        Command::Locate { file } => cmd_locate(file.as_deref(), debug),
        Command::Rules => cmd_rules(cfg),
        Command::Check => cmd_check(cfg),
    }
}

fn cmd_ask(cfg: AgentConfig, input: &str, debug: bool) -> Result<i32> {
    let mut agent = Agent::new(cfg)?;
    print_result(&agent.handle(input), debug)?;
    Ok(exit_codes::OK)
}

fn cmd_repl(cfg: AgentConfig, debug: bool) -> Result<i32> {
    let mut agent = Agent::new(cfg)?;
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("read stdin")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case(QUIT_COMMAND) {
            break;
        }
        print_result(&agent.handle(input), debug)?;
        io::stdout().flush().context("flush stdout")?;
    }
    Ok(exit_codes::OK)
}

fn cmd_locate(file: Option<&Path>, debug: bool) -> Result<i32> {
    let log = match read_log(file) {
        Ok(log) => log,
        Err(err) => {
            eprintln!("{:#}", err);
            return Ok(exit_codes::IO);
        }
    };
    let report = locate(&log);
    println!("{}", render_report(&report));
    if debug {
        let json = serde_json::to_string_pretty(&report).context("serialize stage report")?;
        eprintln!("{json}");
    }
    Ok(exit_codes::OK)
}

fn cmd_rules(cfg: AgentConfig) -> Result<i32> {
    let agent = Agent::new(cfg)?;
    for rule in agent.rules() {
        let gate = rule.mode_required.map_or("any", |mode| mode.as_str());
        println!(
            "{:>4}  {:<12} {:<20} [{}] {}",
            rule.priority,
            rule.name,
            rule.action,
            gate,
            rule.pattern.as_str()
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_check(cfg: AgentConfig) -> Result<i32> {
    let agent = Agent::new(cfg)?;
    let problems = agent.rule_table_problems();
    if !problems.is_empty() {
        eprintln!("rule table problems:\n- {}", problems.join("\n- "));
        return Ok(exit_codes::INVALID);
    }
    println!("ok: {} rules", agent.rules().len());
    Ok(exit_codes::OK)
}

fn read_log(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("read {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            Ok(buf)
        }
    }
}

/// Reply on stdout; metadata as pretty JSON on stderr when `debug`.
fn print_result(result: &ActionResult, debug: bool) -> Result<()> {
    println!("{}", result.text);
    if debug {
        let meta = serde_json::to_string_pretty(&result.metadata).context("serialize metadata")?;
        eprintln!("{meta}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ask_joins_words() {
        let cli = Cli::parse_from(["dispatcher", "ask", "/cook", "BUILD", "FAILED"]);
        match cli.command {
            Command::Ask { text } => assert_eq!(text.join(" "), "/cook BUILD FAILED"),
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["dispatcher", "check", "--config", "x.toml", "--debug"]);
        assert!(matches!(cli.command, Command::Check));
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(cli.debug);
    }

    #[test]
    fn parse_locate_file() {
        let cli = Cli::parse_from(["dispatcher", "locate", "--file", "build.log"]);
        assert!(matches!(
            cli.command,
            Command::Locate { file: Some(ref path) } if path == Path::new("build.log")
        ));
    }

    #[test]
    fn ask_requires_text() {
        assert!(Cli::try_parse_from(["dispatcher", "ask"]).is_err());
    }
}

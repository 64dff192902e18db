use mender::*;

use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Clone, clap::ValueEnum)]
enum Mode {
    /// Prefer templates that carry parent context
    Specific,
    /// Prefer templates without parent context
    General,
}

impl Mode {
    fn config(&self) -> synthesis::RankingConfig {
        match self {
            Mode::Specific => synthesis::RankingConfig::specific(),
            Mode::General => synthesis::RankingConfig::general(),
        }
    }
}

/// Example-driven program repair with 🩹 Mender
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a transformation from one before/after pair and check that it
    /// reproduces the after program
    Run {
        /// The broken program (.py)
        #[arg(short, long, value_name = "FILE")]
        before: PathBuf,

        /// The corrected program (.py)
        #[arg(short, long, value_name = "FILE")]
        after: PathBuf,

        /// The ranking mode
        #[arg(short, long, value_name = "MODE", value_enum, default_value_t = Mode::Specific)]
        mode: Mode,

        /// How many candidate programs to learn
        #[arg(short, long, value_name = "N", default_value_t = 5)]
        k: usize,

        /// Path to output JSON of learned programs (blank for no output)
        #[arg(short, long, value_name = "FILE", default_value = "")]
        json: String,
    },
    /// Repair the broken programs described by a problem file
    Fix {
        /// The problem file to use (.toml)
        #[arg(short, long, value_name = "FILE")]
        problem: PathBuf,
    },
}

#[derive(Deserialize)]
struct ProblemFile {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default)]
    leave_one_out: bool,
    #[serde(rename = "cluster")]
    clusters: Vec<ClusterFile>,
    #[serde(rename = "broken")]
    broken: Vec<BrokenFile>,
    #[serde(default)]
    tests: IndexMap<String, i32>,
    #[serde(default)]
    static_tests: Option<fix::StaticTests>,
}

fn default_top_k() -> usize {
    5
}

#[derive(Deserialize)]
struct ClusterFile {
    id: String,
    examples: Vec<ExampleFile>,
}

#[derive(Deserialize)]
struct ExampleFile {
    before: String,
    after: String,
}

fn run(
    before_filename: &PathBuf,
    after_filename: &PathBuf,
    mode: &Mode,
    k: usize,
    json: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let before_src = std::fs::read_to_string(before_filename)?;
    let after_src = std::fs::read_to_string(after_filename)?;

    let example = synthesis::Example::parse(&before_src, &after_src)?;
    let programs = synthesis::learn(std::slice::from_ref(&example), mode.config(), k)?;

    println!(
        "{}",
        ansi_term::Style::new().bold().paint("Learned programs:")
    );
    for (i, p) in programs.iter().enumerate() {
        println!("  {}) {}", i, ansi_term::Color::Cyan.paint(p.describe()));
    }

    let goal = unparse::unparse(&example.after);
    let reproduced = programs.iter().any(|p| {
        p.run(&example.before)
            .iter()
            .any(|candidate| unparse::unparse(candidate) == goal)
    });

    if reproduced {
        println!(
            "\n{}",
            ansi_term::Color::Cyan.bold().paint("[ Reproduced the fix! ]")
        );
    } else {
        println!(
            "\n{}",
            ansi_term::Color::Red.bold().paint("[ Not reproduced! ]")
        );
    }

    if !json.is_empty() {
        let mut json_file = File::create(PathBuf::from(json))?;
        write!(
            json_file,
            "{}",
            serde_json::to_string_pretty(&programs).unwrap()
        )?;
    }

    Ok(())
}

#[derive(Deserialize)]
struct BrokenFile {
    name: String,
    source: String,
}

fn fix_all(problem_filename: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let problem_src = std::fs::read_to_string(problem_filename)?;
    let problem: ProblemFile = toml::from_str(&problem_src)?;

    let config = match problem.mode.as_deref() {
        Some("general") => synthesis::RankingConfig::general(),
        Some("specific") | None => synthesis::RankingConfig::specific(),
        Some(other) => return Err(format!("unknown mode '{}'", other).into()),
    };

    let mut clusters = vec![];
    for c in &problem.clusters {
        let mut examples = vec![];
        for e in &c.examples {
            examples.push(synthesis::Example::parse(&e.before, &e.after)?);
        }
        clusters.push(fix::Cluster {
            id: c.id.clone(),
            examples,
        });
    }

    let mut fixer = fix::Fixer::new(clusters, config, problem.top_k, oracle::Oracle::default());
    fixer.leave_one_out = problem.leave_one_out;

    for broken in &problem.broken {
        match fixer.fix(&broken.source, &problem.tests, problem.static_tests.as_ref())? {
            Some(fixed) => {
                println!(
                    "{} {}",
                    ansi_term::Color::Cyan.bold().paint("[ Fixed ]"),
                    broken.name
                );
                print!("{}", fixed);
            }
            None => {
                println!(
                    "{} {}",
                    ansi_term::Color::Red.bold().paint("[ Not fixed ]"),
                    broken.name
                );
            }
        }
        println!();
    }

    if !fixer.used_programs.is_empty() {
        println!(
            "{}",
            ansi_term::Style::new().bold().paint("Programs used:")
        );
        for (program, count) in &fixer.used_programs {
            println!("  {}x {}", count, ansi_term::Color::Cyan.paint(program));
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run {
            before,
            after,
            mode,
            k,
            json,
        } => run(before, after, mode, *k, json),
        Commands::Fix { problem } => fix_all(problem),
    };

    match result {
        Ok(()) => (),
        Err(e) => {
            println!("{} {}", ansi_term::Color::Red.bold().paint("error:"), e);
            std::process::exit(1)
        }
    }
}

// Command line handling for the painter binary
//
// Usage:
//   painter [agents] [map] [max_rounds] [max_think_secs] [max_depth] [verbose] [--config <path>]
//
// Positional arguments override the matching Painter.toml values:
//   agents          Comma-separated agent names, e.g. MaxNAgent,GreedyAgent
//   map             Map file name inside the maps folder
//   max_rounds      Round limit
//   max_think_secs  Per-move think budget in seconds, 0 = unbounded
//   max_depth       Search depth for MaxN and Minimax
//   verbose         true/false, mirror move logs to the console

use crate::config::Config;

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub config_path: Option<String>,
    pub agents: Option<Vec<String>>,
    pub map: Option<String>,
    pub max_rounds: Option<u32>,
    pub max_think_time_secs: Option<f64>,
    pub max_depth: Option<u32>,
    pub verbose: Option<bool>,
    pub help: bool,
}

pub fn print_usage() {
    eprintln!("Spaceship Painter");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  painter [AGENTS] [MAP] [MAX_ROUNDS] [MAX_THINK_SECS] [MAX_DEPTH] [VERBOSE] [OPTIONS]");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("  AGENTS           Comma-separated agents: RandomAgent, GreedyAgent, MaxNAgent, MinimaxAgent");
    eprintln!("  MAP              Map file inside the maps folder (default: example_map.txt)");
    eprintln!("  MAX_ROUNDS       Round limit (default: 5)");
    eprintln!("  MAX_THINK_SECS   Seconds per move, 0 = unbounded (default: 0)");
    eprintln!("  MAX_DEPTH        Search depth for MaxN/Minimax (default: 5)");
    eprintln!("  VERBOSE          true or false (default: true)");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --config <path>  Path to Painter.toml (default: Painter.toml)");
    eprintln!("  --help           Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  painter MaxNAgent,MinimaxAgent example_map.txt 10 2 4");
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid verbose flag '{}'", s)),
    }
}

fn parse_number<T: std::str::FromStr>(s: &str, what: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    s.trim()
        .parse::<T>()
        .map_err(|e| format!("Invalid {} '{}': {}", what, s, e))
}

impl CliArgs {
    /// Parses arguments, excluding the program name
    pub fn parse<I, S>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut cli = CliArgs::default();
        let mut positional = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--help" | "-h" => cli.help = true,
                "--config" => {
                    let path = args
                        .get(i + 1)
                        .ok_or_else(|| "--config requires an argument".to_string())?;
                    cli.config_path = Some(path.clone());
                    i += 1;
                }
                other if other.starts_with("--") => {
                    return Err(format!("Unknown option '{}'", other));
                }
                other => positional.push(other.to_string()),
            }
            i += 1;
        }

        if positional.len() > 6 {
            return Err(format!(
                "Too many arguments: expected at most 6, got {}",
                positional.len()
            ));
        }

        for (index, value) in positional.iter().enumerate() {
            match index {
                0 => {
                    cli.agents = Some(
                        value
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect(),
                    )
                }
                1 => cli.map = Some(value.clone()),
                2 => cli.max_rounds = Some(parse_number(value, "round limit")?),
                3 => cli.max_think_time_secs = Some(parse_number(value, "think time")?),
                4 => cli.max_depth = Some(parse_number(value, "search depth")?),
                _ => cli.verbose = Some(parse_bool(value)?),
            }
        }

        Ok(cli)
    }

    /// Writes the given overrides into `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(agents) = &self.agents {
            config.agents.roster = agents.clone();
        }
        if let Some(map) = &self.map {
            config.session.map = map.clone();
        }
        if let Some(max_rounds) = self.max_rounds {
            config.session.max_rounds = max_rounds;
        }
        if let Some(secs) = self.max_think_time_secs {
            config.session.max_think_time_secs = secs;
        }
        if let Some(depth) = self.max_depth {
            config.session.max_depth = depth;
        }
        if let Some(verbose) = self.verbose {
            config.session.verbose = verbose;
        }
    }
}

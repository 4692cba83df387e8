//! Server flags.
//!
//! | Option | Env | Default |
//! |--------|-----|---------|
//! | `--bind` | `ROBRIDGE_BIND` | `0.0.0.0:3000` |
//! | `--log-level` | `ROBRIDGE_LOG_LEVEL` | `info` |
//! | `--log-json` | `ROBRIDGE_LOG_JSON` | `false` |
//! | `--sweep-secs` | `ROBRIDGE_SWEEP_SECS` | `60` |
//!
//! Upstream and cache settings come from the environment, see
//! `robridge_core::config`.

use clap::Parser;

/// Caching proxy and item aggregator for the Roblox web APIs.
#[derive(Debug, Parser)]
#[command(name = "robridge", author, version, about)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "ROBRIDGE_BIND", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "ROBRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "ROBRIDGE_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Seconds between sweeps of expired cache entries; 0 disables the sweep.
    #[arg(long, env = "ROBRIDGE_SWEEP_SECS", default_value_t = 60)]
    pub sweep_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["robridge"]).expect("no flags is valid");
        assert_eq!(cli.log_level, "info");
        assert!(!cli.log_json);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from(["robridge", "--bind", "127.0.0.1:8080", "--log-json"])
            .expect("valid flags");
        assert_eq!(cli.bind, "127.0.0.1:8080");
        assert!(cli.log_json);
    }
}

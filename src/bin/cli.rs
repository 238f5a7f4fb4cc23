// kindle-pids - Kindle PID derivation
// Copyright (C) 2025 kindle-pids contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kindle_pids::{describe_key_store, ConfiguredPlatform, PidConfig, PidGenerator, PidRequest};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kindle-pids-cli")]
#[command(about = "Derive candidate Kindle book PIDs", long_about = None)]
struct Cli {
    /// JSON configuration (volume serial, user name, default store)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the candidate PIDs of a book
    Pids {
        /// EXTH record 209 of the book, hex encoded
        #[arg(long)]
        rec209: Option<String>,
        /// Token named by record 209, hex encoded
        #[arg(long, default_value = "")]
        token: String,
        /// Take --rec209 and --token as plain text instead of hex
        #[arg(long)]
        text: bool,
        /// E-ink Kindle serial number (repeatable)
        #[arg(short, long = "serial")]
        serials: Vec<String>,
        /// PID to try as is (repeatable)
        #[arg(short, long = "pid")]
        pids: Vec<String>,
        /// Kindle info file (repeatable)
        #[arg(short, long = "kindle-info")]
        kindle_info: Vec<PathBuf>,
        /// Also use the default Kindle info file from the configuration
        #[arg(short, long)]
        device_defaults: bool,
    },
    /// Print the decoded records of a Kindle info file
    Info {
        /// Kindle info file
        path: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "kindle_pids=debug" } else { "kindle_pids=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn token_bytes(value: &str, text: bool, option: &str) -> Result<Vec<u8>> {
    if text {
        Ok(value.as_bytes().to_vec())
    } else {
        hex::decode(value).with_context(|| format!("{} is not valid hex", option))
    }
}

fn load_platform(config: Option<&PathBuf>) -> Result<ConfiguredPlatform> {
    let config = match config {
        Some(path) => PidConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PidConfig::default(),
    };
    Ok(ConfiguredPlatform::new(config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let platform = load_platform(cli.config.as_ref())?;

    match cli.command {
        Commands::Pids {
            rec209,
            token,
            text,
            serials,
            pids,
            kindle_info,
            device_defaults,
        } => {
            let rec209 = rec209
                .map(|value| token_bytes(&value, text, "--rec209"))
                .transpose()?;
            let token = token_bytes(&token, text, "--token")?;

            let request = PidRequest {
                rec209,
                token,
                use_device_defaults: device_defaults,
                literal_pids: pids,
                serials,
                key_store_paths: kindle_info,
            };

            let candidates = PidGenerator::new(&platform).derive(&request);
            if candidates.is_empty() {
                eprintln!("No PID candidates; the book cannot be decrypted with these inputs.");
            }
            for pid in candidates {
                println!("{}", pid);
            }
        }
        Commands::Info { path } => {
            let entries = describe_key_store(&platform, &path)
                .with_context(|| format!("Failed to read Kindle info file {}", path.display()))?;
            for entry in entries {
                println!("{}", entry.label);
                println!("--------------------------");
                println!("{}", String::from_utf8_lossy(&entry.value));
                println!("hex: {}", entry.value_hex());
                println!();
            }
        }
    }

    Ok(())
}

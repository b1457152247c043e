//! Command line options for the `skycast` binary.
//!
//! - `now` prints current conditions, the day/night state and the forecast
//! - `watch` keeps the day/night line updated every second until Ctrl-C
//! - `search`, `favorites`, `history`, `unit` and `compare` manage saved preferences
//!
//! Without `--city`, the location is detected automatically (device position,
//! then three IP lookups, then the configured default city).

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_version, Parser, Subcommand, ValueEnum};
use skycast_core::TemperatureUnit;

/// CLI options
#[derive(Debug, Parser)]
#[clap(name = "skycast", about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// Verbose mode (repeat for more).
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Sub-commands (see below).
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

impl Opts {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

// ------

/// All sub-commands:
///
/// `now [--city Q] [--days N]`
/// `watch [--city Q]`
/// `search PARTIAL`
/// `favorites (list|add|remove)`
/// `history [--clear]`
/// `unit [celsius|fahrenheit]`
/// `compare [add|remove]`
///
#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// Current conditions, day/night progress and forecast
    Now(NowOpts),
    /// Live day/night progress
    Watch(WatchOpts),
    /// Look up matching locations
    Search(SearchOpts),
    /// Manage favorite cities
    Favorites(FavoritesOpts),
    /// Show or clear recent searches
    History(HistoryOpts),
    /// Show or set the temperature unit
    Unit(UnitOpts),
    /// Current conditions for all comparison locations
    Compare(CompareOpts),
}

// ------

#[derive(Debug, Parser)]
pub struct NowOpts {
    /// City name, postcode or "lat,lon"; detected automatically when absent.
    #[clap(long)]
    pub city: Option<String>,
    /// Number of forecast days.
    #[clap(short = 'd', long)]
    pub days: Option<u8>,
}

#[derive(Debug, Parser)]
pub struct WatchOpts {
    /// City name, postcode or "lat,lon"; detected automatically when absent.
    #[clap(long)]
    pub city: Option<String>,
}

#[derive(Debug, Parser)]
pub struct SearchOpts {
    /// Partial location name.
    pub partial: String,
}

// ------

#[derive(Debug, Parser)]
pub struct FavoritesOpts {
    #[clap(subcommand)]
    pub subcmd: Option<FavoritesCmd>,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCmd {
    /// List favorite cities
    List,
    /// Add a favorite city
    Add { name: String },
    /// Remove a favorite city
    Remove { name: String },
}

#[derive(Debug, Parser)]
pub struct HistoryOpts {
    /// Forget all recent searches.
    #[clap(long)]
    pub clear: bool,
}

#[derive(Debug, Parser)]
pub struct UnitOpts {
    /// New unit; prints the current one when absent.
    #[clap(value_enum)]
    pub unit: Option<UnitArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    Celsius,
    Fahrenheit,
}

impl From<UnitArg> for TemperatureUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Celsius => TemperatureUnit::Celsius,
            UnitArg::Fahrenheit => TemperatureUnit::Fahrenheit,
        }
    }
}

#[derive(Debug, Parser)]
pub struct CompareOpts {
    #[clap(subcommand)]
    pub subcmd: Option<CompareCmd>,
}

#[derive(Debug, Subcommand)]
pub enum CompareCmd {
    /// Add a comparison location
    Add { name: String },
    /// Remove a comparison location
    Remove { name: String },
}

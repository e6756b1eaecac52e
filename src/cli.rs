use archivist::humanize::HumanDuration;
use archivist::invalidator::{InvalidationRequest, SiteSelection};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "archivist")]
#[command(about = "Invalidate pre-computed analytics archives", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $ARCHIVIST_CONFIG or config/archivist.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mark archives stale so they are rebuilt
    Invalidate(InvalidateArgs),
    /// Count markers by status
    Stats,
    /// Drop range invalidation records older than a given age
    PruneRanges(PruneRangesArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct InvalidateArgs {
    /// Date or date range (YYYY-MM-DD, A,B, today, lastN, previousN); repeatable
    #[arg(long = "dates", required = true, num_args = 1..)]
    pub dates: Vec<String>,

    /// Comma-separated site ids, or "all"
    #[arg(long, default_value = "all")]
    pub sites: SiteSelection,

    /// Comma-separated period kinds (day, week, month, year, range) or "all"
    #[arg(long, value_delimiter = ',')]
    pub periods: Vec<String>,

    /// Segment name or definition; repeatable
    #[arg(long = "segment")]
    pub segments: Vec<String>,

    /// Also invalidate every lower period inside each one
    #[arg(long)]
    pub cascade: bool,

    /// Print what would be invalidated without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Limit invalidation to one plugin, or one report of it (Plugin.report)
    #[arg(long)]
    pub plugin: Option<String>,

    /// Invalidate periods even when their raw logs have been deleted
    #[arg(long)]
    pub ignore_log_deletion_limit: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl InvalidateArgs {
    pub fn to_request(&self, default_cascade: bool) -> InvalidationRequest {
        InvalidationRequest::builder()
            .sites(self.sites.clone())
            .dates(self.dates.clone())
            .periods(self.periods.clone())
            .segments(self.segments.clone())
            .cascade(self.cascade || default_cascade)
            .dry_run(self.dry_run)
            .maybe_plugin(self.plugin.clone())
            .ignore_log_deletion_limit(self.ignore_log_deletion_limit)
            .build()
    }
}

#[derive(clap::Args, Debug)]
pub struct PruneRangesArgs {
    /// Minimum age of records to drop (e.g. "30d")
    #[arg(long, default_value = "30d")]
    pub older_than: HumanDuration,
}

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use utils::OutputPolicy;

mod commands {
    pub mod archive;
    pub mod auto;
    pub mod ogg;
    pub mod wem;
}
mod context;
mod report;

use commands::archive::ArchiveCommands;
use commands::auto::AutoArgs;
use commands::ogg::OggArgs;
use commands::wem::WemArgs;
use context::{ConvertArgs, RunContext};

#[derive(Parser)]
#[command(name = "wwogg")]
#[command(about = "Convert Wwise WEM audio and archives to Ogg/Vorbis", long_about = None)]
struct Cli {
    /// More log output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Less log output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    quiet: u8,
    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,
    /// Replace inputs instead of writing next to them
    #[arg(long, global = true)]
    in_place: bool,
    /// Convert but write nothing
    #[arg(long, global = true)]
    dry_run: bool,
    /// Format of the summary printed at the end
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Text,
    Json,
    None,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert WEM files to Ogg/Vorbis
    Wem(WemArgs),
    /// Recompute granule positions of Ogg/Vorbis files
    Ogg(OggArgs),
    /// WSP/BNK operations (Extract/Convert/List)
    #[command(subcommand)]
    Archive(ArchiveCommands),
    /// Detect each input's type and run its default action
    Auto(AutoArgs),
}

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn log_level(verbose: u8, quiet: u8, debug: bool) -> &'static str {
    let index = (2 + i32::from(verbose) - i32::from(quiet)).clamp(0, 4) as usize;
    if debug { LEVELS[index.max(3)] } else { LEVELS[index] }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(log_level(cli.verbose, cli.quiet, cli.debug));

    let policy = OutputPolicy {
        in_place: cli.in_place,
        dry_run: cli.dry_run,
    };
    let mut ctx = RunContext::new(policy, ConvertArgs::default());

    let show_report = !matches!(cli.command, Commands::Archive(ArchiveCommands::List { .. }));
    match cli.command {
        Commands::Wem(args) => commands::wem::handle(args, &mut ctx)?,
        Commands::Ogg(args) => commands::ogg::handle(args, &mut ctx)?,
        Commands::Archive(cmd) => commands::archive::handle(cmd, &mut ctx)?,
        Commands::Auto(args) => commands::auto::handle(args, &mut ctx)?,
    }

    if show_report {
        ctx.finish();
        match cli.report {
            ReportFormat::Text => println!("{}", ctx.stats),
            ReportFormat::Json => println!("{}", ctx.stats.to_json()?),
            ReportFormat::None => {}
        }
    }

    if ctx.stats.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, 0, false), "info");
        assert_eq!(log_level(1, 0, false), "debug");
        assert_eq!(log_level(5, 0, false), "trace");
        assert_eq!(log_level(0, 2, false), "error");
        assert_eq!(log_level(0, 9, false), "error");
        assert_eq!(log_level(0, 2, true), "debug");
        assert_eq!(log_level(2, 0, true), "trace");
    }

    #[test]
    fn test_allow_deny_last_wins() {
        let cli = Cli::try_parse_from(["wwogg", "archive", "extract", "a.wsp", "--allow", "1", "--deny", "2"]).unwrap();
        let Commands::Archive(ArchiveCommands::Extract { filter, .. }) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(filter.allow, None);
        assert_eq!(filter.deny.as_deref(), Some("2"));
        assert!(filter.to_filter().passes(1));
        assert!(!filter.to_filter().passes(2));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["wwogg", "wem", "a.wem", "-vv", "--dry-run", "--stripped"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.dry_run);
        let Commands::Wem(args) = cli.command else {
            panic!("wrong command");
        };
        assert!(args.convert.stripped);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

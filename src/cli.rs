use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::upgrade::plan::{CopyOptions, LicenseInfo, Mode};

#[derive(Parser, Debug)]
#[command(
    name = "burst-upgrade",
    version,
    about = "Migrate DocumentBurster installations to the current release"
)]
struct Cli {
    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover what a migration would carry over, without writing anything
    Plan {
        #[arg(long, value_name = "DIR")]
        from: PathBuf,
        #[arg(long, value_enum, default_value = "copy-to-new")]
        mode: ModeArg,
        /// The installation is the server variant
        #[arg(long)]
        server: bool,
    },
    /// Migrate an existing installation into a separate, freshly installed one
    MigrateCopy {
        #[arg(long, value_name = "DIR")]
        from: PathBuf,
        #[arg(long, value_name = "DIR")]
        to: PathBuf,
        #[command(flatten)]
        copy: CopyFlags,
        /// Run the migration in memory and list what would be written
        #[arg(long)]
        dry_run: bool,
    },
    /// Download the newest release and migrate the live installation in place
    UpdateNow {
        #[arg(long, value_name = "DIR")]
        install_dir: PathBuf,
        #[arg(long)]
        server: bool,
        /// Version of the running installation, used in the backup name
        #[arg(long, value_name = "VERSION")]
        product_version: Option<String>,
        #[command(flatten)]
        license: LicenseArgs,
        #[command(flatten)]
        copy: CopyFlags,
        /// Leave the scratch workspace in place after the run
        #[arg(long)]
        keep_scratch: bool,
    },
    /// Batch-migrate historical scripts into an installation's scripts tree
    MigrateScripts {
        #[arg(long, value_name = "DIR")]
        from: PathBuf,
        #[arg(long, value_name = "DIR")]
        to: PathBuf,
        /// Nest migrated scripts under scripts/burst/<VERSION>
        #[arg(long, value_name = "VERSION")]
        legacy_version: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    CopyToNew,
    ReplaceLive,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::CopyToNew => Mode::CopyToNew,
            ModeArg::ReplaceLive => Mode::ReplaceLive,
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
struct CopyFlags {
    /// Do not carry the license file over
    #[arg(long)]
    no_copy_license: bool,
    #[arg(long)]
    copy_output: bool,
    #[arg(long)]
    copy_logs: bool,
    #[arg(long)]
    copy_quarantine: bool,
    #[arg(long)]
    copy_backup: bool,
}

impl From<CopyFlags> for CopyOptions {
    fn from(flags: CopyFlags) -> Self {
        Self {
            license: !flags.no_copy_license,
            output: flags.copy_output,
            logs: flags.copy_logs,
            quarantine: flags.copy_quarantine,
            backup: flags.copy_backup,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
struct LicenseArgs {
    #[arg(long, value_name = "KEY")]
    license_key: Option<String>,
    #[arg(long, value_name = "EMAIL")]
    customer_email: Option<String>,
    #[arg(long, value_name = "VERSION")]
    latest_version: Option<String>,
    #[arg(long, value_name = "STATUS")]
    license_status: Option<String>,
}

impl From<LicenseArgs> for LicenseInfo {
    fn from(args: LicenseArgs) -> Self {
        Self {
            latest_version: args.latest_version.unwrap_or_default(),
            key: args.license_key.unwrap_or_default(),
            customer_email: args.customer_email.unwrap_or_default(),
            status: args.license_status.unwrap_or_default(),
        }
    }
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let status = if report.ok { "ok" } else { "failed" };
    println!("{}: {status}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Plan { from, mode, server } => commands::plan::run(&commands::plan::PlanOptions {
            from,
            mode: mode.into(),
            server,
        })?,
        Command::MigrateCopy {
            from,
            to,
            copy,
            dry_run,
        } => commands::migrate_copy::run(&commands::migrate_copy::MigrateCopyOptions {
            from,
            to,
            copy_options: copy.into(),
            dry_run,
        })?,
        Command::UpdateNow {
            install_dir,
            server,
            product_version,
            license,
            copy,
            keep_scratch,
        } => commands::update_now::run(&commands::update_now::UpdateNowOptions {
            install_dir,
            server,
            product_version,
            license: license.into(),
            copy_options: copy.into(),
            keep_scratch,
        })?,
        Command::MigrateScripts {
            from,
            to,
            legacy_version,
        } => commands::migrate_scripts::run(&commands::migrate_scripts::MigrateScriptsOptions {
            from,
            to,
            legacy_version,
        })?,
    };

    print_report(&report, cli.json)?;
    if report.ok {
        Ok(())
    } else {
        Err(anyhow!("{} reported {} issue(s)", report.command, report.issues.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_flags_default_to_license_only() {
        let cli = Cli::try_parse_from(["burst-upgrade", "migrate-copy", "--from", "a", "--to", "b"])
            .expect("parse");
        let Command::MigrateCopy { copy, dry_run, .. } = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(CopyOptions::from(copy), CopyOptions::default());
        assert!(!dry_run);
    }

    #[test]
    fn update_now_collects_license_and_copy_flags() {
        let cli = Cli::try_parse_from([
            "burst-upgrade",
            "--json",
            "update-now",
            "--install-dir",
            "/opt/db",
            "--server",
            "--no-copy-license",
            "--copy-logs",
            "--license-key",
            "K-1",
        ])
        .expect("parse");
        assert!(cli.json);
        let Command::UpdateNow {
            server,
            copy,
            license,
            ..
        } = cli.command
        else {
            panic!("wrong subcommand");
        };
        assert!(server);
        let options = CopyOptions::from(copy);
        assert!(!options.license && options.logs && !options.output);
        assert_eq!(LicenseInfo::from(license).key, "K-1");
    }

    #[test]
    fn plan_mode_accepts_kebab_case() {
        let cli = Cli::try_parse_from(["burst-upgrade", "plan", "--from", "x", "--mode", "replace-live"])
            .expect("parse");
        let Command::Plan { mode, .. } = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(Mode::from(mode), Mode::ReplaceLive);
    }
}

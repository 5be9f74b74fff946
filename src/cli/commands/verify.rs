use crate::cli::commands::{store_from, StoreArgs};
use crate::cli::output::*;
use crate::core::config::Config;
use crate::core::validator::IntegrityValidator;
use crate::ZctaError;
use clap::Args;

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: VerifyArgs, mut config: Config) -> anyhow::Result<()> {
    args.store.apply(&mut config);
    let store = store_from(&config);
    let report = IntegrityValidator::new(config.validation).report(&store);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        section_header(&format!("Verifying {}", store.path().display()));
        for check in &report.tables {
            let actual = check
                .actual
                .map(format_number)
                .unwrap_or_else(|| "unreadable".to_string());
            let line = format!(
                "{}: {} rows (expected {})",
                check.table,
                actual,
                format_number(check.expected)
            );
            if check.matches() {
                success(&line);
            } else {
                error(&line);
            }
        }
    }

    if report.valid {
        if !args.json {
            success("Store is valid");
        }
        Ok(())
    } else {
        Err(ZctaError::ValidationFailed(report.problems.join("; ")).into())
    }
}

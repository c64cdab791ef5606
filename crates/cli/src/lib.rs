pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(
    name = "toldo",
    about = "Toldo quoting CLI",
    long_about = "Turn measurement sheets into priced quotes with installment suggestions.",
    after_help = "Examples:\n  toldo search --catalog catalog.json cortina\n  toldo quote --input visit.json\n  toldo transition --input quote.json --to sent"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Accent-insensitive search over catalog products and customers")]
    Search {
        #[arg(long, help = "Catalog JSON file (array of products)")]
        catalog: PathBuf,
        #[arg(long, help = "Optional customer list JSON file")]
        customers: Option<PathBuf>,
        #[arg(help = "Free-text needle; empty matches everything", default_value = "")]
        needle: String,
    },
    #[command(about = "Generate a quote from a sheet, its history and the current selections")]
    Quote {
        #[arg(long, help = "Quote document JSON file")]
        input: PathBuf,
    },
    #[command(about = "Move a generated quote along its lifecycle")]
    Transition {
        #[arg(long, help = "Quote JSON file, as printed under `data.quote` by `toldo quote`")]
        input: PathBuf,
        #[arg(long, help = "Target status: sent, approved, rejected, expired, revised, ...")]
        to: String,
    },
    #[command(about = "Suggest an installment plan for a total")]
    Installments {
        total: Decimal,
        #[arg(long, help = "Smallest acceptable installment value")]
        min_installment: Option<Decimal>,
        #[arg(long, help = "Largest number of installments offered")]
        max_installments: Option<u32>,
    },
}

pub fn run() -> ExitCode {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Search { catalog, customers, needle } => {
            commands::search::run(&catalog, customers.as_deref(), &needle)
        }
        Command::Quote { input } => commands::quote::run(&input),
        Command::Transition { input, to } => commands::transition::run(&input, &to),
        Command::Installments { total, min_installment, max_installments } => {
            commands::installments::run(total, min_installment, max_installments)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn installments_accepts_decimal_arguments() {
        let cli = Cli::try_parse_from([
            "toldo",
            "installments",
            "1234.56",
            "--min-installment",
            "250.5",
            "--max-installments",
            "12",
        ])
        .expect("valid arguments");

        assert!(matches!(
            cli.command,
            Command::Installments { max_installments: Some(12), min_installment: Some(_), .. }
        ));
    }
}

//! petab-edit CLI - inspect and convert PEtab tables

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use petab_edit::prelude::*;
use petab_edit::{links, problem::Problem};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "petab-edit")]
#[command(author, version, about = "Inspect and convert PEtab problem tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of the tables in a problem directory
    Info {
        /// Directory holding the table files
        dir: PathBuf,
    },

    /// Check cross-table references and report dangling identifiers
    Check {
        /// Directory holding the table files
        dir: PathBuf,
    },

    /// Rewrite a table file with a different delimiter
    Convert {
        /// Input table file (tsv or csv)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output field delimiter
        #[arg(short, long, default_value = "\t")]
        delimiter: char,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { dir } => show_info(&dir),
        Commands::Check { dir } => check(&dir),
        Commands::Convert {
            input,
            output,
            delimiter,
        } => convert(&input, output.as_deref(), delimiter),
    }
}

fn load(dir: &Path) -> Result<ProblemEditor> {
    Problem::load_dir(dir).with_context(|| format!("failed to load problem from '{}'", dir.display()))
}

fn show_info(dir: &Path) -> Result<()> {
    let editor = load(dir)?;
    for kind in [
        TableKind::Measurement,
        TableKind::Observable,
        TableKind::Parameter,
        TableKind::Condition,
        TableKind::Simulation,
    ] {
        let Some(store) = editor.table(kind) else {
            continue;
        };
        let columns: Vec<&str> = store.schema().column_names().collect();
        println!(
            "{:<12} {:>5} rows  columns: {}",
            kind.to_string(),
            store.data_row_count(),
            columns.join(", ")
        );
    }
    Ok(())
}

fn check(dir: &Path) -> Result<()> {
    let editor = load(dir)?;
    let mut problems = 0usize;

    for link in links::all() {
        let Some(source) = editor.table(link.source) else {
            continue;
        };
        let Some(target) = editor.table(link.target) else {
            continue;
        };
        for row in source.rows() {
            let value = source.get_value(row.key(), link.column);
            if value.is_empty() {
                continue;
            }
            let id = value.to_string();
            if !target.has_row(&id) {
                println!(
                    "{} row '{}': {} '{}' is not defined in the {} table",
                    link.source,
                    row.key(),
                    link.column,
                    id,
                    link.target
                );
                problems += 1;
            }
        }
    }

    if problems == 0 {
        println!("no dangling references");
        Ok(())
    } else {
        anyhow::bail!("{} dangling reference(s)", problems)
    }
}

fn convert(input: &Path, output: Option<&Path>, delimiter: char) -> Result<()> {
    let store = TableReader::read_file(input, &ReadOptions::default())
        .with_context(|| format!("failed to read '{}'", input.display()))?;

    let options = WriteOptions {
        delimiter: u8::try_from(delimiter).context("delimiter must be an ASCII character")?,
    };
    match output {
        Some(path) => TableWriter::write_file(&store, path, &options)
            .with_context(|| format!("failed to write '{}'", path.display()))?,
        None => TableWriter::write(&store, std::io::stdout().lock(), &options)?,
    }
    Ok(())
}

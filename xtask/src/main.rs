use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod schema_sql;

#[derive(Debug, Parser)]
#[command(
    name = "xtask",
    about = "This binary defines auxiliary ad-hoc scripts."
)]
enum XTasks {
    /// Writes the SQL of every transition to the schema snapshot file
    GenerateSchemaSql {
        #[arg(long, env = "SCHEMA_SQL_PATH")]
        path: Option<PathBuf>,
    },
    /// Verifies that the schema snapshot file matches the transitions
    VerifySchemaSql {
        #[arg(long, env = "SCHEMA_SQL_PATH")]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .parse_default_env();
    builder.init();

    let opt = XTasks::parse();
    match opt {
        XTasks::GenerateSchemaSql { path } => schema_sql::generate_schema_sql(path)?,
        XTasks::VerifySchemaSql { path } => schema_sql::verify_schema_sql(path)?,
    };

    Ok(())
}

/// Searches for a project root dir, which is a directory that contains a
/// `Cargo.toml` file that defines the project's [cargo workspace][cargo-workspace]).
///
/// It uses the value of [`cargo metadata`][cargo-metadata] `workspace_root`.
///
/// [cargo-metadata]: https://doc.rust-lang.org/cargo/commands/cargo-metadata.html
/// [cargo-workspace]: https://doc.rust-lang.org/book/ch14-03-cargo-workspaces.html
pub fn locate_project_root() -> Result<PathBuf> {
    let cmd = cargo_metadata::MetadataCommand::new();

    let metadata = cmd.exec()?;
    let workspace_root = metadata.workspace_root;

    Ok(workspace_root.into())
}

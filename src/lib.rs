//! Schema history of the room booking `adminapi` app and the machinery to replay it
//!
//! A [`Transition`](schema::Transition) is an ordered list of [`Operation`](schema::Operation)s
//! plus the transitions it depends on. Transitions are applied through a
//! [`SchemaEditor`](editor::SchemaEditor), either to an in-memory store holding rows or rendered
//! to PostgreSQL DDL and run by refinery.
//!
//! ```
//! use roombook_schema::adminapi;
//! use roombook_schema::editor::MemoryDatabase;
//! use roombook_schema::migrate::Executor;
//!
//! let graph = adminapi::graph().unwrap();
//! let mut executor = Executor::new(adminapi::APP_LABEL, MemoryDatabase::default());
//! executor.migrate(&graph, None).unwrap();
//!
//! assert!(executor.editor().table("resources_details").is_some());
//! ```
use anyhow::{Context, Result};
use std::path::Path;

pub mod adminapi;
pub mod cli;
pub mod db;
pub mod editor;
pub mod migrate;
pub mod schema;
pub mod settings;

/// Sets up the fern logger
///
/// `verbose` counts the `-v` flags. Logs go to stderr unless `output` names a file or `-` for
/// stdout.
pub fn setup_logging(verbose: u8, output: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let colors = fern::colors::ColoredLevelConfig::new();

    let dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .level(level);

    let dispatch = match output {
        Some(path) if path == Path::new("-") => dispatch.chain(std::io::stdout()),
        Some(path) => dispatch.chain(
            fern::log_file(path)
                .with_context(|| format!("Unable to open log file {}", path.display()))?,
        ),
        None => dispatch.chain(std::io::stderr()),
    };

    dispatch
        .apply()
        .context("Failed to setup logging utility")
}

/// Wrapper of the main function. Correctly outputs the error to the logging utility or stderr.
pub async fn try_or_exit<T, F>(f: F) -> T
where
    F: std::future::Future<Output = Result<T>>,
{
    match f.await {
        Ok(ok) => ok,
        Err(err) => {
            if log::log_enabled!(log::Level::Error) {
                log::error!("Crashed with error: {:?}", err);
            } else {
                eprintln!("Crashed with error: {:?}", err);
            }

            std::process::exit(-1);
        }
    }
}

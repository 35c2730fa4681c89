use crate::adminapi;
use crate::db;
use crate::editor::MemoryDatabase;
use crate::migrate::Executor;
use crate::settings::Settings;
use anyhow::{Context, Result};
use std::fmt::Write;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "roombook-migrate")]
pub struct Args {
    #[structopt(
        short,
        parse(from_occurrences),
        help = "-v => Info, -vv => Debug, -vvv => Trace"
    )]
    pub verbose: u8,

    #[structopt(
        short,
        long,
        default_value = "config.toml",
        help = "Specify path to configuration file"
    )]
    pub config: PathBuf,

    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "logoutput or \"-\" for stdout"
    )]
    pub logoutput: Option<PathBuf>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Lists the transitions and their operations in application order
    Plan {
        /// Print the transitions as JSON
        #[structopt(long)]
        json: bool,
    },
    /// Prints the PostgreSQL DDL of one or all transitions
    Sql {
        /// `app.name`, name or number of a transition
        transition: Option<String>,
    },
    /// Replays the history against an in-memory store and prints the resulting tables
    Check,
    /// Applies pending transitions to the configured database
    Migrate,
    /// Lists the transitions recorded in the configured database
    Status,
}

/// Parses the CLI-Arguments into [`Args`]
pub fn parse_args() -> Args {
    Args::from_args()
}

/// Runs the selected command, printing its output to stdout
pub async fn run(args: &Args, settings: &Settings) -> Result<()> {
    match &args.command {
        Command::Plan { json } => print!("{}", plan(*json)?),
        Command::Sql { transition } => print!("{}", sql(transition.as_deref())?),
        Command::Check => print!("{}", check()?),
        Command::Migrate => {
            let database = database(settings)?;
            db::migrate(database, &adminapi::graph()?, adminapi::APP_LABEL).await?;
        }
        Command::Status => {
            let database = database(settings)?;
            print!("{}", status(&db::applied(database).await?)?);
        }
    }

    Ok(())
}

fn database(settings: &Settings) -> Result<&crate::settings::Database> {
    settings
        .database
        .as_ref()
        .context("No database configured, set [database] or ROOMBOOK_DATABASE_* variables")
}

pub fn plan(json: bool) -> Result<String> {
    let graph = adminapi::graph()?;
    let ordered = graph.ordered()?;

    if json {
        let mut out = serde_json::to_string_pretty(&ordered)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    for transition in ordered {
        writeln!(out, "{}", transition.key)?;

        for dependency in &transition.dependencies {
            writeln!(out, "  depends on {}", dependency)?;
        }

        for (index, operation) in transition.operations.iter().enumerate() {
            writeln!(out, "  {}. {}", index + 1, operation)?;

            let requires = operation.requires();
            if !requires.is_empty() {
                writeln!(out, "     requires {}", requires.join(", "))?;
            }
        }
    }

    Ok(out)
}

pub fn sql(transition: Option<&str>) -> Result<String> {
    let graph = adminapi::graph()?;
    let selected = transition
        .map(|query| graph.find(query).map(|t| t.key.clone()))
        .transpose()?;

    let mut out = String::new();
    for rendered in db::render(&graph, adminapi::APP_LABEL)? {
        if matches!(&selected, Some(key) if key != &rendered.key) {
            continue;
        }

        writeln!(out, "-- {}", rendered.migration_name())?;
        writeln!(out, "{}", rendered.sql)?;
    }

    Ok(out)
}

pub fn check() -> Result<String> {
    let graph = adminapi::graph()?;
    let mut executor = Executor::new(adminapi::APP_LABEL, MemoryDatabase::default());

    executor.migrate(&graph, None)?;

    let mut out = String::new();
    for name in executor.editor().table_names() {
        let table = executor
            .editor()
            .table(name)
            .with_context(|| format!("table {} vanished", name))?;

        writeln!(out, "{}", name)?;
        for column in table.columns() {
            writeln!(out, "  {}", column)?;
        }

        for set in table.unique_together() {
            writeln!(out, "  UNIQUE ({})", set.join(", "))?;
        }
    }

    Ok(out)
}

/// Formats the migrations recorded in the database next to the known transitions
pub fn status(applied: &[(i32, String)]) -> Result<String> {
    let graph = adminapi::graph()?;

    let mut out = String::new();
    for rendered in db::render(&graph, adminapi::APP_LABEL)? {
        let mark = if applied
            .iter()
            .any(|(version, _)| i64::from(*version) == i64::from(rendered.version))
        {
            "x"
        } else {
            " "
        };

        writeln!(out, "[{}] {}", mark, rendered.key)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let args = Args::from_iter(vec!["roombook-migrate", "-vv", "sql", "3"]);

        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Sql { transition: Some(ref t) } if t == "3"));
    }

    #[test]
    fn plan_lists_operations() {
        let plan = plan(false).unwrap();

        assert!(plan.contains("adminapi.0003_resourcesdetails_remove_hardware_resource_and_more"));
        assert!(plan.contains("  depends on adminapi.0002_userroombooking_user_role"));
        assert!(plan.contains("  8. Delete model Hardware"));
    }

    #[test]
    fn plan_lists_required_models() {
        let plan = plan(false).unwrap();

        assert!(plan.contains("  1. Create model ResourcesDetails\n     requires Resources\n"));
        assert!(plan.contains(
            "  4. Create model Rents\n     requires Payment, Resources, UserRoomBooking\n"
        ));
        assert!(plan.contains(
            "  6. Create model RoomPolicy\n     requires Room, UserRoomBooking\n"
        ));
    }

    #[test]
    fn plan_json_is_parseable() {
        let value: serde_json::Value = serde_json::from_str(&plan(true).unwrap()).unwrap();

        assert_eq!(value.as_array().unwrap().len(), 3);
        assert_eq!(value[2]["operations"][6]["operation"], "delete_model");
    }

    #[test]
    fn sql_selects_one_transition() {
        let out = sql(Some("2")).unwrap();

        assert!(out.starts_with("-- V2__userroombooking_user_role"));
        assert!(!out.contains("V1__initial"));
        assert!(sql(Some("42")).is_err());
    }

    #[test]
    fn check_lists_final_tables() {
        let out = check().unwrap();

        assert!(out.contains("rents\n"));
        assert!(out.contains("room_policy\n"));
        assert!(!out.contains("adminapi_book"));
    }

    #[test]
    fn status_marks_applied() {
        let out = status(&[(1, "initial".to_owned())]).unwrap();

        assert!(out.contains("[x] adminapi.0001_initial"));
        assert!(out.contains("[ ] adminapi.0002_userroombooking_user_role"));
    }
}

//! Applies the transition history to a PostgreSQL database
//!
//! Every transition is rendered to SQL and handed to refinery as migration `V<n>__<name>`, where
//! `<n>` is the numeric prefix of the transition. Refinery records applied migrations in
//! `refinery_schema_history` and runs each of them inside a transaction.
use crate::editor::SqlEditor;
use crate::migrate::{MigrateError, TransitionGraph};
use crate::schema::{ProjectState, TransitionKey};
use crate::settings::Database;
use anyhow::{Context, Result};
use refinery::{Migration, Runner};
use refinery_core::tokio_postgres::{connect, Client, NoTls};

/// The SQL of one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTransition {
    pub key: TransitionKey,
    pub version: u32,
    pub sql: String,
}

impl RenderedTransition {
    /// Name of the refinery migration, e.g. `V1__initial`
    pub fn migration_name(&self) -> String {
        let name = self
            .key
            .name
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .trim_start_matches('_');

        format!("V{}__{}", self.version, name)
    }
}

/// Renders every transition of `graph` in dependency order
///
/// The project state is replayed alongside, so a transition that cannot be applied fails here
/// instead of inside the database.
pub fn render(
    graph: &TransitionGraph,
    app_label: &str,
) -> Result<Vec<RenderedTransition>, MigrateError> {
    let mut state = ProjectState::new(app_label);
    let mut rendered = Vec::new();

    for transition in graph.ordered()? {
        let version = transition
            .key
            .number()
            .ok_or_else(|| MigrateError::Unnumbered(transition.key.clone()))?;

        let mut editor = SqlEditor::default();
        transition.apply_to(&mut state, &mut editor)?;

        rendered.push(RenderedTransition {
            key: transition.key.clone(),
            version,
            sql: editor.make(),
        });
    }

    Ok(rendered)
}

fn runner(rendered: &[RenderedTransition]) -> Result<Runner> {
    let migrations = rendered
        .iter()
        .map(|t| {
            Migration::unapplied(&t.migration_name(), &t.sql)
                .with_context(|| format!("Invalid migration {}", t.key))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Runner::new(&migrations)
        .set_abort_divergent(true)
        .set_abort_missing(true))
}

async fn connect_to(url: &str) -> Result<Client> {
    let (client, conn) = connect(url, NoTls)
        .await
        .context("Unable to connect to database")?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            log::error!("connection error: {}", e)
        }
    });

    Ok(client)
}

pub async fn migrate_from_url(url: &str, graph: &TransitionGraph, app_label: &str) -> Result<()> {
    let rendered = render(graph, app_label)?;
    let mut client = connect_to(url).await?;

    let report = runner(&rendered)?
        .run_async(&mut client)
        .await
        .context("Migration failed")?;

    let applied = report.applied_migrations();
    if applied.is_empty() {
        log::info!("Database is up to date");
    }

    for migration in applied {
        log::info!("Applied V{}__{}", migration.version(), migration.name());
    }

    Ok(())
}

/// Lists the migrations recorded in the database as `(version, name)`
pub async fn applied_from_url(url: &str) -> Result<Vec<(i32, String)>> {
    let mut client = connect_to(url).await?;

    let applied = Runner::new(&[])
        .get_applied_migrations_async(&mut client)
        .await
        .context("Unable to read migration history")?;

    Ok(applied
        .iter()
        .map(|m| (m.version(), m.name().to_owned()))
        .collect())
}

pub async fn migrate(db_config: &Database, graph: &TransitionGraph, app_label: &str) -> Result<()> {
    migrate_from_url(&db_config.connection_string(), graph, app_label).await
}

pub async fn applied(db_config: &Database) -> Result<Vec<(i32, String)>> {
    applied_from_url(&db_config.connection_string()).await
}

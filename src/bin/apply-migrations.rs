use anyhow::{bail, Context, Result};
use clap::Parser;
use farmstead::logging;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "apply-migrations")]
#[command(about = "Apply pending SQL migrations to the farmstead Postgres database")]
struct Args {
    /// Directory holding the numbered *.sql files
    #[arg(long, default_value = "migrations")]
    dir: PathBuf,
    /// List pending migrations without applying them
    #[arg(long)]
    dry_run: bool,
}

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

/// `(version, path)` for every `.sql` file, in lexical order.
fn migration_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

async fn applied_versions(pool: &PgPool) -> Result<HashSet<String>> {
    let rows = sqlx::query("SELECT version FROM schema_migrations").fetch_all(pool).await?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("version").map_err(Into::into))
        .collect()
}

async fn apply(pool: &PgPool, version: &str, path: &Path) -> Result<()> {
    let sql = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(&sql)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("migration {} failed", version))?;
    sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
        .bind(version)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_cli_logging();
    let args = Args::parse();

    let files = migration_files(&args.dir)?;
    if files.is_empty() {
        bail!("no .sql files found in {}", args.dir.display());
    }

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = PgPoolOptions::new().max_connections(1).connect(&url).await?;
    sqlx::query(BOOKKEEPING).execute(&pool).await?;

    let applied = applied_versions(&pool).await?;
    let pending: Vec<_> = files.into_iter().filter(|(v, _)| !applied.contains(v)).collect();
    if pending.is_empty() {
        println!("Database is up to date ({} migrations applied)", applied.len());
        return Ok(());
    }

    for (version, path) in &pending {
        if args.dry_run {
            println!("pending: {}", version);
            continue;
        }
        info!("Applying {}", version);
        apply(&pool, version, path).await?;
        println!("applied: {}", version);
    }
    if args.dry_run {
        println!("{} pending migration(s); run without --dry-run to apply", pending.len());
    }
    Ok(())
}

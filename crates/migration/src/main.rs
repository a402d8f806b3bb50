//! Schema management for the ledger database.
//!
//! `migration [up|down|fresh|status] [PATH]`. Without `PATH` the database is
//! the one the `ledger` binary would use: `LEDGER__DATABASE__SQLITE`, falling
//! back to `ledger.db`.

use migration::{Migrator, MigratorTrait, sqlite_url};
use sea_orm::Database;

const DATABASE_ENV: &str = "LEDGER__DATABASE__SQLITE";
const DEFAULT_PATH: &str = "ledger.db";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "up".to_string());
    let path = args
        .next()
        .or_else(|| std::env::var(DATABASE_ENV).ok())
        .unwrap_or_else(|| DEFAULT_PATH.to_string());

    let db = Database::connect(sqlite_url(&path)).await?;
    match command.as_str() {
        "up" => Migrator::up(&db, None).await?,
        "down" => Migrator::down(&db, Some(1)).await?,
        "fresh" => Migrator::fresh(&db).await?,
        "status" => Migrator::status(&db).await?,
        other => {
            return Err(
                format!("unknown command {other:?}, expected up, down, fresh or status").into(),
            );
        }
    }
    println!("{command}: {path}");
    Ok(())
}

pub use sea_orm_migration::prelude::*;

mod m20250201_000000_ledger;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250201_000000_ledger::Migration)]
    }
}

/// Connection URL of the SQLite database at `path`, created when missing.
pub fn sqlite_url(path: &str) -> String {
    format!("sqlite:{path}?mode=rwc")
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectOptions, ConnectionTrait, Database};

    use super::*;

    #[test]
    fn sqlite_url_creates_missing_files() {
        assert_eq!(sqlite_url("ledger.db"), "sqlite:ledger.db?mode=rwc");
    }

    #[tokio::test]
    async fn up_then_down_leaves_no_ledger_tables() {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        assert!(db.execute_unprepared("SELECT id FROM budgets").await.is_ok());
        assert!(db.execute_unprepared("SELECT id FROM expenses").await.is_ok());

        Migrator::down(&db, None).await.unwrap();
        assert!(db.execute_unprepared("SELECT id FROM budgets").await.is_err());
    }
}

//! Loads a vehicle compatibility CSV straight into the database.
//!
//! Usage: `import_vehicles <file.csv>`

use battery_leads_api::db::Database;
use battery_leads_api::db_storage::PgStore;
use battery_leads_api::vehicle_import::import_vehicles;
use dotenvy::dotenv;
use std::env;

/// Main entry point for the import tool.
///
/// Runs the same import as `POST /api/v1/vehicles/import`, without the HTTP
/// upload limit.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: import_vehicles <file.csv>"))?;

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL or DB_URL must be set"))?;

    let csv_text = tokio::fs::read_to_string(&path).await?;
    tracing::info!("Read {} bytes from {}", csv_text.len(), path);

    let db = Database::new(&database_url).await?;
    let store = PgStore::new(db.pool.clone());

    let summary = import_vehicles(&store, &csv_text).await?;

    println!("Imported {}/{} vehicles from {}", summary.imported, summary.total, path);
    Ok(())
}

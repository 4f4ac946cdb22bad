use chrono::Local;
use dotenvy::dotenv;
use expense_logger::{
    config::{self, database},
    core::{AdmissionPolicy, ExpenseStore, calendar, overview},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Tier configuration is fixed for the lifetime of the process
    let app_config = config::tier::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let policy = AdmissionPolicy::new(app_config.tier);

    // 4. Open the database and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    let store = ExpenseStore::new(db);

    // 5. Report the current month and today's quota
    let overview = overview::current_month_overview(&store).await?;
    info!(
        month = %overview.month,
        total_amount = overview.total_amount,
        total_expenses = overview.total_expenses,
        "Monthly overview"
    );
    for category in overview.by_category() {
        info!(category = %category.category, total = category.total, "Category total");
    }

    let (start, end) = calendar::day_bounds(&Local::now());
    let today = store.get_count(start, end).await?;
    match policy.remaining(today) {
        Some(remaining) => info!(today, remaining, "Free tier daily quota"),
        None => info!(today, "Paid tier, no daily quota"),
    }

    Ok(())
}

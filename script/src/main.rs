use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod seed_events;
mod seed_merchandise;
mod util;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").unwrap();
    let pool = models::db::connect(&database_url).await.unwrap();
    models::db::init_schema(&pool).await.unwrap();

    let task = std::env::args().nth(1).unwrap_or_default();
    let result = match task.as_str() {
        "seed-events" => seed_events::seed_events(&pool).await,
        "seed-merchandise" => seed_merchandise::seed_merchandise(&pool).await,
        _ => {
            // Default: seed everything
            match seed_events::seed_events(&pool).await {
                Ok(()) => seed_merchandise::seed_merchandise(&pool).await,
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        error!("{e:?}");
    }
}

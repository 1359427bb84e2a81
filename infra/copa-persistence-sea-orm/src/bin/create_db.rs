use copa_persistence_sea_orm::{DEFAULT_DATABASE_URL, create_db_pool, ensure_schema};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let url = std::env::var("COPA_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let pool = create_db_pool(&url)
        .await
        .expect("Failed to connect to database");

    ensure_schema(&pool)
        .await
        .expect("Failed to create database tables");

    println!("Created database tables at {}", url);
}

//! Basic mapper usage example
//!
//! This example demonstrates the record mapper end to end:
//! - Declaring a record
//! - Inserting, loading and updating rows
//! - Saving inside a transaction
//! - Scanning ad hoc queries
//!
//! Run with: cargo run --example basic_usage

use rust_record_mapper::prelude::*;

#[derive(Debug, Default)]
struct User {
    id: i64,
    username: String,
    email: Option<String>,
    age: i32,
    balance: f64,
    active: bool,
}

record!(User {
    id [pk],
    username,
    email,
    age [zeroisnull],
    balance,
    active [column = "is_active"],
});

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Rust Record Mapper - Basic Usage Example ===\n");
    let ctx = Context::background();

    println!("1. Connecting to database...");
    let db = SqliteQuerier::open(":memory:").await?;
    db.exec(
        &ctx,
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT,
            age INTEGER,
            balance REAL,
            is_active INTEGER DEFAULT 1
        )",
        &[],
    )
    .await?;
    println!("   ✓ Connected, table created\n");

    println!("2. Inserting records...");
    let users = vec![
        ("alice", Some("alice@example.com"), 30, 1500.50),
        ("bob", None, 25, 2300.75),
        ("charlie", Some("charlie@example.com"), 0, 980.25),
    ];
    for (username, email, age, balance) in users {
        let mut user = User {
            username: username.to_string(),
            email: email.map(str::to_string),
            age,
            balance,
            active: true,
            ..Default::default()
        };
        rust_record_mapper::insert(&ctx, &db, "users", &mut user).await?;
        println!("   ✓ {} has id {}", user.username, user.id);
    }
    println!();

    println!("3. Loading and updating...");
    let mut bob = User::default();
    rust_record_mapper::load(&ctx, &db, "users", &mut bob, 2).await?;
    bob.balance += 100.0;
    rust_record_mapper::update(&ctx, &db, "users", &bob).await?;
    println!("   ✓ {} now has {:.2}\n", bob.username, bob.balance);

    println!("4. Saving inside a transaction...");
    let tx = db.begin(&ctx).await?;
    let mut diana = User {
        username: "diana".into(),
        age: 28,
        active: true,
        ..Default::default()
    };
    rust_record_mapper::save(&ctx, &tx, "users", &mut diana).await?;
    diana.active = false;
    rust_record_mapper::save(&ctx, &tx, "users", &mut diana).await?;
    tx.commit(&ctx).await?;
    println!("   ✓ diana saved with id {}\n", diana.id);

    println!("5. Querying...");
    let mut active: Vec<User> = Vec::new();
    rust_record_mapper::query_all(
        &ctx,
        &db,
        &mut active,
        "SELECT * FROM users WHERE is_active = ? ORDER BY id",
        &[DatabaseValue::Bool(true)],
    )
    .await?;
    for user in &active {
        println!(
            "   {} {:<8} email={:<22} age={:<3} balance={:.2}",
            user.id,
            user.username,
            user.email.as_deref().unwrap_or("-"),
            user.age,
            user.balance
        );
    }

    let mut missing = User::default();
    match rust_record_mapper::load(&ctx, &db, "users", &mut missing, 99).await {
        Err(e) if e.is_not_found() => println!("\n   ✓ id 99: {}", e),
        other => other?,
    }

    println!("\n=== Example completed successfully ===");
    Ok(())
}

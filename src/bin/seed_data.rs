//! Seed data script - populates the database with a starter data set
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - a default Developer account when the directory is empty
//! - a sample candy-shop catalog when there are no products

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use tracing::{info, warn};
use uuid::Uuid;

use backoffice_api::entities::{product, user, Product, Role, User};
use backoffice_api::services::users::digest_password;
use backoffice_api::{config, db};

const DEFAULT_DEV_USERNAME: &str = "dev";
const DEFAULT_DEV_PASSWORD: &str = "ChangeMe12!@";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("=== Back-Office Seed Data ===");

    info!("Connecting to database: {}", cfg.database_url);
    let db = db::establish_connection_from_app_config(&cfg).await?;
    info!("Connected");

    seed_default_user(&db).await?;
    seed_products(&db).await?;

    info!("=== Seed Data Complete ===");
    Ok(())
}

async fn seed_default_user(db: &sea_orm::DatabaseConnection) -> anyhow::Result<()> {
    let existing = User::find().count(db).await?;
    if existing > 0 {
        info!("Users already exist, skipping user creation");
        return Ok(());
    }

    let password =
        std::env::var("SEED_DEV_PASSWORD").unwrap_or_else(|_| DEFAULT_DEV_PASSWORD.to_string());

    let account = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(DEFAULT_DEV_USERNAME.to_string()),
        name: Set("Developer".to_string()),
        password_hash: Set(digest_password(&password)),
        role: Set(Role::Developer),
        monthly_salary: Set(dec!(0.00)),
        is_enabled: Set(true),
        ..Default::default()
    };
    account.insert(db).await?;

    info!("Created default Developer account '{}'", DEFAULT_DEV_USERNAME);
    if password == DEFAULT_DEV_PASSWORD {
        warn!("Default password in use - change it before going live");
    }
    Ok(())
}

async fn seed_products(db: &sea_orm::DatabaseConnection) -> anyhow::Result<()> {
    let existing = Product::find().count(db).await?;
    if existing > 0 {
        info!("Products already exist, skipping product creation");
        return Ok(());
    }

    let products: Vec<(&str, &str, &str, Decimal, Decimal, bool)> = vec![
        ("Chocolate Cake", "🍰", "501", dec!(4.99), dec!(50.000), false),
        ("Gummy Bears", "🫐", "502", dec!(3.49), dec!(100.000), false),
        ("Lollipop", "🍭", "503", dec!(1.99), dec!(200.000), false),
        ("Donut", "🍩", "504", dec!(2.49), dec!(75.000), false),
        ("Ice Cream", "🍦", "505", dec!(3.99), dec!(60.000), false),
        ("Candy Corn", "🌽", "506", dec!(2.99), dec!(150.000), false),
        ("Cupcake", "🧁", "507", dec!(3.99), dec!(80.000), false),
        ("Chocolate Bar", "🍫", "508", dec!(2.49), dec!(120.000), true),
        ("Marshmallow", "☁️", "509", dec!(1.99), dec!(90.000), false),
        ("Candy Apple", "🍎", "510", dec!(3.49), dec!(40.000), false),
        ("Waffle", "🧇", "511", dec!(4.49), dec!(30.000), false),
        ("Croissant", "🥐", "512", dec!(3.49), dec!(55.000), false),
    ];
    let count = products.len();

    for (name, emoji, barcode, price, stock, is_sold_by_weight) in products {
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            emoji: Set(emoji.to_string()),
            barcode: Set(Some(barcode.to_string())),
            price: Set(price),
            stock: Set(stock),
            is_sold_by_weight: Set(is_sold_by_weight),
            ..Default::default()
        };
        model.insert(db).await?;
    }

    info!("Created {} sample products", count);
    Ok(())
}

#![allow(dead_code)]

use std::sync::Arc;

use backoffice_api::{
    db::{self, DbConfig, DbPool},
    entities::{product, user, Role, UserModel},
    events::{self, EventSender},
    services::users::digest_password,
    AppServices,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseBackend as DbBackend, Set, Statement};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Schema bootstrap for the in-memory SQLite database. Mirrors what the
/// deployment migrations create, including the unique indexes the
/// services lean on.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        monthly_salary REAL NOT NULL DEFAULT 0,
        is_enabled INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT
    );"#,
    r#"CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        emoji TEXT NOT NULL,
        barcode TEXT,
        price REAL NOT NULL,
        stock REAL NOT NULL DEFAULT 0,
        is_sold_by_weight INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT
    );"#,
    r#"CREATE TABLE IF NOT EXISTS cart_items (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        product_id TEXT NOT NULL,
        quantity REAL NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT,
        UNIQUE(user_id, product_id)
    );"#,
    r#"CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT,
        user_name TEXT NOT NULL,
        order_date TEXT NOT NULL,
        total REAL NOT NULL,
        item_count INTEGER NOT NULL,
        status TEXT NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS order_items (
        id TEXT PRIMARY KEY NOT NULL,
        order_id TEXT NOT NULL,
        product_id TEXT,
        product_name TEXT NOT NULL,
        product_emoji TEXT NOT NULL,
        price REAL NOT NULL,
        quantity REAL NOT NULL,
        is_sold_by_weight INTEGER NOT NULL DEFAULT 0
    );"#,
    r#"CREATE TABLE IF NOT EXISTS attendance_records (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        user_name TEXT NOT NULL,
        date TEXT NOT NULL,
        status TEXT NOT NULL,
        regular_hours REAL NOT NULL DEFAULT 0,
        overtime_hours REAL NOT NULL DEFAULT 0,
        daily_pay REAL NOT NULL DEFAULT 0,
        check_in_time TEXT,
        check_out_time TEXT,
        notes TEXT,
        created_at TEXT NOT NULL,
        UNIQUE(user_id, date)
    );"#,
    r#"CREATE TABLE IF NOT EXISTS restock_records (
        id TEXT PRIMARY KEY NOT NULL,
        product_id TEXT,
        product_name TEXT NOT NULL,
        product_emoji TEXT NOT NULL,
        quantity_added REAL NOT NULL,
        stock_before REAL NOT NULL,
        stock_after REAL NOT NULL,
        user_id TEXT,
        user_name TEXT NOT NULL,
        restock_date TEXT NOT NULL
    );"#,
];

/// Helper harness: application services backed by a fresh in-memory
/// SQLite database per test.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // A single pooled connection keeps every statement on the same
        // in-memory database.
        let pool = db::establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");

        for sql in SCHEMA {
            pool.execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
                .await
                .expect("failed to create test schema");
        }

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let db = Arc::new(pool);
        let services = AppServices::new(db.clone(), event_sender);

        Self {
            db,
            services,
            _event_task: event_task,
        }
    }

    /// Inserts an enabled account with the given role directly.
    pub async fn create_user(&self, role: Role) -> UserModel {
        let suffix = Uuid::new_v4().simple().to_string();
        self.create_user_named(&format!("user-{}", &suffix[..8]), role)
            .await
    }

    /// Inserts an enabled account with a fixed username.
    pub async fn create_user_named(&self, username: &str, role: Role) -> UserModel {
        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            name: Set(username.to_string()),
            password_hash: Set(digest_password("integration-pass")),
            role: Set(role),
            monthly_salary: Set(Decimal::ZERO),
            is_enabled: Set(true),
            ..Default::default()
        };
        account
            .insert(&*self.db)
            .await
            .expect("failed to create test user")
    }

    /// Inserts a piece-sold product.
    pub async fn create_product(
        &self,
        name: &str,
        price: Decimal,
        stock: Decimal,
    ) -> product::Model {
        self.create_product_full(name, None, price, stock, false)
            .await
    }

    /// Inserts a product with every knob exposed.
    pub async fn create_product_full(
        &self,
        name: &str,
        barcode: Option<&str>,
        price: Decimal,
        stock: Decimal,
        is_sold_by_weight: bool,
    ) -> product::Model {
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            emoji: Set("🍬".to_string()),
            barcode: Set(barcode.map(str::to_string)),
            price: Set(price),
            stock: Set(stock),
            is_sold_by_weight: Set(is_sold_by_weight),
            ..Default::default()
        };
        model
            .insert(&*self.db)
            .await
            .expect("failed to create test product")
    }
}

//! Customer directory: structured customer records, orders and tickets.
//!
//! The pipeline only reads from the directory. [`SqliteDirectory`] opens a
//! read-only connection per call on the blocking pool; the write paths
//! (`init`, `seed_sample_data`) exist for the CLI.

use async_trait::async_trait;
use chrono::{Duration, Local};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use support_core::{AppError, AppResult, CustomerProfile, CustomerRecord, KnownName, Order, Ticket};

/// Read access to customer data.
///
/// Every failure to reach or query the store surfaces as
/// [`AppError::DirectoryUnavailable`]; an unknown id in `get_profile` is
/// [`AppError::NotFound`].
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Display names of every customer, in directory order.
    async fn list_all_names(&self) -> AppResult<Vec<KnownName>>;

    /// Customers whose name, email or phone contains `term` (case-insensitive).
    async fn search(&self, term: &str) -> AppResult<Vec<CustomerRecord>>;

    /// Full profile with orders, newest first.
    async fn get_profile(&self, customer_id: i64) -> AppResult<CustomerProfile>;

    /// Support tickets, newest first.
    async fn get_tickets(&self, customer_id: i64) -> AppResult<Vec<Ticket>>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    phone TEXT,
    signup_date TEXT,
    account_status TEXT,
    account_type TEXT,
    total_orders INTEGER,
    lifetime_value REAL
);

CREATE TABLE IF NOT EXISTS support_tickets (
    id INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT,
    created_date TEXT,
    resolved_date TEXT,
    category TEXT,
    priority TEXT,
    FOREIGN KEY (customer_id) REFERENCES customers(id)
);

CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    order_date TEXT,
    amount REAL,
    status TEXT,
    items TEXT,
    FOREIGN KEY (customer_id) REFERENCES customers(id)
);

CREATE INDEX IF NOT EXISTS idx_tickets_customer ON support_tickets(customer_id);
CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);
"#;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, signup_date, account_status, \
     account_type, total_orders, lifetime_value";

/// Row counts written by [`SqliteDirectory::seed_sample_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedStats {
    pub customers: usize,
    pub tickets: usize,
    pub orders: usize,
}

/// SQLite-backed customer directory.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    db_path: PathBuf,
}

impl SqliteDirectory {
    /// Point at a database file. Nothing is opened until the first call.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Create the database file and tables if missing.
    pub fn init(&self) -> AppResult<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::DirectoryUnavailable(format!(
                    "Failed to create directory for {:?}: {}",
                    self.db_path, e
                ))
            })?;
        }

        let conn = Connection::open(&self.db_path).map_err(db_error)?;
        conn.execute_batch(SCHEMA).map_err(db_error)?;

        tracing::debug!("Initialized customer directory at {:?}", self.db_path);
        Ok(conn)
    }

    /// Replace all rows with the demo data set.
    pub fn seed_sample_data(&self) -> AppResult<SeedStats> {
        let mut conn = self.init()?;
        let tx = conn.transaction().map_err(db_error)?;

        tx.execute_batch(
            "DELETE FROM support_tickets; DELETE FROM orders; DELETE FROM customers;",
        )
        .map_err(db_error)?;

        let customers = sample_customers();
        for c in &customers {
            tx.execute(
                "INSERT INTO customers VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    c.id,
                    c.name,
                    c.email,
                    c.phone,
                    c.signup_date,
                    c.account_status,
                    c.account_type,
                    c.total_orders,
                    c.lifetime_value,
                ],
            )
            .map_err(db_error)?;
        }

        let tickets = sample_tickets();
        for (customer_id, t) in &tickets {
            tx.execute(
                "INSERT INTO support_tickets VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    t.id,
                    customer_id,
                    t.title,
                    t.description,
                    t.status,
                    t.created_date,
                    t.resolved_date,
                    t.category,
                    t.priority,
                ],
            )
            .map_err(db_error)?;
        }

        let orders = sample_orders();
        for (customer_id, o) in &orders {
            let items = serde_json::to_string(&o.items)?;
            tx.execute(
                "INSERT INTO orders VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![o.id, customer_id, o.order_date, o.amount, o.status, items],
            )
            .map_err(db_error)?;
        }

        tx.commit().map_err(db_error)?;

        let stats = SeedStats {
            customers: customers.len(),
            tickets: tickets.len(),
            orders: orders.len(),
        };
        tracing::info!(
            customers = stats.customers,
            tickets = stats.tickets,
            orders = stats.orders,
            "Seeded customer directory"
        );
        Ok(stats)
    }

    /// Run a read-only query on the blocking pool.
    async fn read<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| {
                AppError::DirectoryUnavailable(format!("Failed to open {:?}: {}", path, e))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| AppError::DirectoryUnavailable(format!("Directory task failed: {}", e)))?
    }
}

#[async_trait]
impl CustomerDirectory for SqliteDirectory {
    async fn list_all_names(&self) -> AppResult<Vec<KnownName>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM customers ORDER BY id")
                .map_err(db_error)?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            Ok(names.into_iter().map(KnownName::new).collect())
        })
        .await
    }

    async fn search(&self, term: &str) -> AppResult<Vec<CustomerRecord>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = like_pattern(term);
        let records = self
            .read(move |conn| {
                let sql = format!(
                    "SELECT {} FROM customers \
                     WHERE LOWER(name) LIKE LOWER(?1) ESCAPE '\\' \
                        OR LOWER(email) LIKE LOWER(?1) ESCAPE '\\' \
                        OR phone LIKE ?1 ESCAPE '\\' \
                     ORDER BY id",
                    CUSTOMER_COLUMNS
                );
                let mut stmt = conn.prepare(&sql).map_err(db_error)?;
                let rows = stmt
                    .query_map(params![pattern], record_from_row)
                    .map_err(db_error)?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(db_error)?;
                Ok(rows)
            })
            .await?;

        tracing::debug!(term, matches = records.len(), "Directory search");
        Ok(records)
    }

    async fn get_profile(&self, customer_id: i64) -> AppResult<CustomerProfile> {
        self.read(move |conn| {
            let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
            let record = conn
                .query_row(&sql, params![customer_id], record_from_row)
                .optional()
                .map_err(db_error)?
                .ok_or_else(|| AppError::NotFound(format!("Customer {}", customer_id)))?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, order_date, amount, status, items FROM orders \
                     WHERE customer_id = ?1 ORDER BY order_date DESC, id DESC",
                )
                .map_err(db_error)?;
            let orders = stmt
                .query_map(params![customer_id], order_from_row)
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;

            Ok(CustomerProfile { record, orders })
        })
        .await
    }

    async fn get_tickets(&self, customer_id: i64) -> AppResult<Vec<Ticket>> {
        self.read(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, description, status, created_date, resolved_date, \
                            category, priority \
                     FROM support_tickets WHERE customer_id = ?1 \
                     ORDER BY created_date DESC, id DESC",
                )
                .map_err(db_error)?;
            let tickets = stmt
                .query_map(params![customer_id], ticket_from_row)
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            Ok(tickets)
        })
        .await
    }
}

fn db_error(err: rusqlite::Error) -> AppError {
    AppError::DirectoryUnavailable(err.to_string())
}

/// `%term%` with LIKE wildcards in `term` escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerRecord> {
    Ok(CustomerRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        signup_date: row.get(4)?,
        account_status: row.get(5)?,
        account_type: row.get(6)?,
        total_orders: row.get(7)?,
        lifetime_value: row.get(8)?,
    })
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let items: Option<String> = row.get(4)?;
    Ok(Order {
        id: row.get(0)?,
        order_date: row.get(1)?,
        amount: row.get(2)?,
        status: row.get(3)?,
        items: items
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default(),
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        created_date: row.get(4)?,
        resolved_date: row.get(5)?,
        category: row.get(6)?,
        priority: row.get(7)?,
    })
}

#[rustfmt::skip]
fn sample_customers() -> Vec<CustomerRecord> {
    let customer = |id: i64,
                    name: &str,
                    email: &str,
                    phone: &str,
                    signup: &str,
                    status: &str,
                    tier: &str,
                    orders: i64,
                    value: f64| CustomerRecord {
        id,
        name: name.to_string(),
        email: email.to_string(),
        phone: Some(phone.to_string()),
        signup_date: Some(signup.to_string()),
        account_status: Some(status.to_string()),
        account_type: Some(tier.to_string()),
        total_orders: Some(orders),
        lifetime_value: Some(value),
    };

    vec![
        customer(1, "Ema Johnson", "ema.johnson@email.com", "+1-555-0101", "2023-06-15", "active", "premium", 12, 4500.00),
        customer(2, "John Smith", "john.smith@email.com", "+1-555-0102", "2023-01-20", "active", "standard", 5, 1200.00),
        customer(3, "Sarah Chen", "sarah.chen@email.com", "+1-555-0103", "2022-11-10", "active", "premium", 25, 8900.00),
        customer(4, "Michael Davis", "michael.d@email.com", "+1-555-0104", "2023-09-05", "active", "standard", 3, 650.00),
        customer(5, "Lisa Anderson", "lisa.anderson@email.com", "+1-555-0105", "2022-03-22", "inactive", "standard", 8, 1800.00),
    ]
}

#[rustfmt::skip]
fn sample_tickets() -> Vec<(i64, Ticket)> {
    let ticket = |id: i64,
                  title: &str,
                  description: &str,
                  status: &str,
                  created: String,
                  resolved: Option<&str>,
                  category: &str,
                  priority: &str| Ticket {
        id,
        title: title.to_string(),
        description: Some(description.to_string()),
        status: Some(status.to_string()),
        created_date: Some(created),
        resolved_date: resolved.map(str::to_string),
        category: Some(category.to_string()),
        priority: Some(priority.to_string()),
    };
    let two_days_ago = (Local::now() - Duration::days(2))
        .format("%Y-%m-%d")
        .to_string();

    vec![
        (1, ticket(1, "Refund request for order #5001", "I would like to return item received on 2024-01-10 for a refund.", "closed", "2024-01-11".into(), Some("2024-01-18"), "refund", "high")),
        (1, ticket(2, "Account login issues", "Cannot login to my account. Getting error 403.", "closed", "2024-01-05".into(), Some("2024-01-06"), "technical", "critical")),
        (1, ticket(3, "Shipping delay question", "My order #5045 hasn't arrived yet. Ordered on 2024-01-12.", "closed", "2024-01-16".into(), Some("2024-01-17"), "shipping", "medium")),
        (1, ticket(4, "Subscription upgrade", "Want to upgrade from Standard to Premium plan.", "open", two_days_ago, None, "account", "low")),
        (2, ticket(5, "Product quality complaint", "Item received has defects. Requesting replacement.", "closed", "2024-01-08".into(), Some("2024-01-15"), "quality", "high")),
    ]
}

#[rustfmt::skip]
fn sample_orders() -> Vec<(i64, Order)> {
    let order = |id: i64, date: &str, amount: f64, status: &str, items: &[&str]| Order {
        id,
        order_date: Some(date.to_string()),
        amount: Some(amount),
        status: Some(status.to_string()),
        items: items.iter().map(|i| i.to_string()).collect(),
    };

    vec![
        (1, order(1, "2024-01-10", 299.99, "delivered", &["Wireless Earbuds", "USB Cable"])),
        (1, order(2, "2024-01-12", 450.00, "delivered", &["Laptop Stand", "Keyboard", "Mouse Pad"])),
        (2, order(3, "2024-01-08", 79.99, "delivered", &["Phone Case"])),
        (3, order(4, "2024-01-15", 899.99, "processing", &["Tablet", "Stylus"])),
    ]
}

//! Database service for commerce-service.

use crate::models::{
    Cart, CartLine, CartView, Company, CreateCompany, CreateCustomer, CreateInvoice,
    CreateInvoiceItem, CreateProduct, Customer, Invoice, InvoiceItem, InvoicePage, InvoiceStatus,
    InvoiceSummary, InvoiceView, ListInvoicesFilter, NewPricingPlan, NewProduct, PricingPlan,
    Product, UpdateProduct,
};
use crate::services::metrics::{DB_QUERY_DURATION, INVOICES_TOTAL, NUMBER_ALLOCATION_RETRIES_TOTAL};
use crate::services::numbering;
use anyhow::anyhow;
use chrono::Utc;
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Attempts to insert an invoice before giving up on number allocation.
const NUMBER_ALLOCATION_ATTEMPTS: u32 = 5;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "commerce-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to SQLite"
        );

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::DatabaseError(anyhow!("Invalid database url: {}", e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Product Operations
    // -------------------------------------------------------------------------

    /// Create a product. The denormalized `total` is computed here, in the
    /// same statement as its inputs.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &CreateProduct) -> Result<Product, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_product"])
            .start_timer();

        let product_id = Uuid::new_v4().to_string();
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                product_id, name, specification, unit, unit_price,
                quantity_available, total, photo_url, category, created_utc
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING product_id, name, specification, unit, unit_price,
                quantity_available, total, photo_url, category, created_utc
            "#,
        )
        .bind(&product_id)
        .bind(&input.name)
        .bind(&input.specification)
        .bind(&input.unit)
        .bind(input.unit_price)
        .bind(input.quantity_available)
        .bind(input.quantity_available * input.unit_price)
        .bind(&input.photo_url)
        .bind(&input.category)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to create product: {}", e)))?;

        timer.observe_duration();

        info!(product_id = %product.product_id, name = %product.name, "Product created");

        Ok(product)
    }

    /// Get a product by ID.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &str) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, specification, unit, unit_price,
                quantity_available, total, photo_url, category, created_utc
            FROM products
            WHERE product_id = ?
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get product: {}", e)))?;

        timer.observe_duration();

        Ok(product)
    }

    /// List all products in insertion order.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_products"])
            .start_timer();

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, name, specification, unit, unit_price,
                quantity_available, total, photo_url, category, created_utc
            FROM products
            ORDER BY created_utc, rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list products: {}", e)))?;

        timer.observe_duration();

        Ok(products)
    }

    /// Update a product, recomputing the denormalized `total` whenever
    /// quantity or price changes.
    #[instrument(skip(self, input), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: &str,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = COALESCE(?, name),
                specification = COALESCE(?, specification),
                unit = COALESCE(?, unit),
                unit_price = COALESCE(?, unit_price),
                quantity_available = COALESCE(?, quantity_available),
                total = COALESCE(?, quantity_available) * COALESCE(?, unit_price)
            WHERE product_id = ?
            RETURNING product_id, name, specification, unit, unit_price,
                quantity_available, total, photo_url, category, created_utc
            "#,
        )
        .bind(&input.name)
        .bind(&input.specification)
        .bind(&input.unit)
        .bind(input.unit_price)
        .bind(input.quantity_available)
        .bind(input.quantity_available)
        .bind(input.unit_price)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to update product: {}", e)))?;

        timer.observe_duration();

        if let Some(ref p) = product {
            info!(product_id = %p.product_id, "Product updated");
        }

        Ok(product)
    }

    /// Delete a product.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_product"])
            .start_timer();

        let result = sqlx::query("DELETE FROM products WHERE product_id = ?")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to delete product: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    /// Import normalized product records. With `replace_existing` the delete
    /// and all inserts run in one transaction, so a failure mid-replace never
    /// leaves the catalogue partially wiped.
    #[instrument(skip(self, products), fields(count = products.len(), replace_existing))]
    pub async fn import_products(
        &self,
        products: &[NewProduct],
        replace_existing: bool,
    ) -> Result<usize, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["import_products"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to begin import: {}", e)))?;

        if replace_existing {
            sqlx::query("DELETE FROM products")
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to clear products: {}", e))
                })?;
        }

        let mut created = 0usize;
        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (
                    product_id, name, specification, unit, unit_price,
                    quantity_available, total, photo_url, category, created_utc
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&product.name)
            .bind(&product.specification)
            .bind(&product.unit)
            .bind(product.unit_price)
            .bind(product.quantity_available)
            .bind(product.quantity_available * product.unit_price)
            .bind(&product.photo_url)
            .bind(&product.category)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to import product: {}", e)))?;
            created += 1;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to commit import: {}", e)))?;

        timer.observe_duration();

        info!(created = created, replace_existing, "Products imported");

        Ok(created)
    }

    // -------------------------------------------------------------------------
    // Cart Operations
    // -------------------------------------------------------------------------

    async fn find_cart(&self, session_id: &str) -> Result<Option<Cart>, AppError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT cart_id, session_id, created_utc FROM carts WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to find cart: {}", e)))?;
        Ok(cart)
    }

    /// Return the session's cart, creating an empty one on first contact.
    ///
    /// Find-then-insert: a concurrent first visit loses the insert against
    /// the `session_id` UNIQUE constraint and re-fetches the winner's row.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn get_or_create_cart(&self, session_id: &str) -> Result<Cart, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_or_create_cart"])
            .start_timer();

        if let Some(cart) = self.find_cart(session_id).await? {
            timer.observe_duration();
            return Ok(cart);
        }

        let insert = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (cart_id, session_id, created_utc)
            VALUES (?, ?, ?)
            RETURNING cart_id, session_id, created_utc
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(session_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        let cart = match insert {
            Ok(cart) => {
                info!(cart_id = %cart.cart_id, "Cart created");
                cart
            }
            Err(e) if is_unique_violation(&e) => self
                .find_cart(session_id)
                .await?
                .ok_or_else(|| AppError::DatabaseError(anyhow!("Cart vanished after conflict")))?,
            Err(e) => {
                return Err(AppError::DatabaseError(anyhow!(
                    "Failed to create cart: {}",
                    e
                )))
            }
        };

        timer.observe_duration();

        Ok(cart)
    }

    async fn cart_lines(&self, cart_id: &str) -> Result<Vec<CartLine>, AppError> {
        let lines = sqlx::query_as::<_, CartLine>(
            r#"
            SELECT p.product_id, p.name, p.unit, p.unit_price, p.total AS product_total,
                p.photo_url, ci.quantity, ci.price_snapshot
            FROM cart_items ci
            JOIN products p ON p.product_id = ci.product_id
            WHERE ci.cart_id = ?
            ORDER BY ci.created_utc, ci.rowid
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to load cart items: {}", e)))?;
        Ok(lines)
    }

    async fn rebuild_cart_view(&self, cart: Cart) -> Result<CartView, AppError> {
        let lines = self.cart_lines(&cart.cart_id).await?;
        Ok(CartView::from_lines(cart, lines))
    }

    /// Full cart for a session, joined with current product fields. Creates
    /// the cart lazily so a first GET sees an empty cart, not an error.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn cart_view(&self, session_id: &str) -> Result<CartView, AppError> {
        let cart = self.get_or_create_cart(session_id).await?;
        self.rebuild_cart_view(cart).await
    }

    /// Add a product to the session's cart. Re-adding merges quantities into
    /// the existing row and refreshes the price snapshot; the response is
    /// always the full reconstructed cart.
    #[instrument(skip(self), fields(session_id = %session_id, product_id = %product_id, quantity))]
    pub async fn add_cart_item(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<CartView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_cart_item"])
            .start_timer();

        if quantity < 1 {
            return Err(AppError::BadRequest(anyhow!("quantity must be at least 1")));
        }

        let product = self
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Product not found")))?;

        let cart = self.get_or_create_cart(session_id).await?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_item_id, cart_id, product_id, quantity, price_snapshot, created_utc)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (cart_id, product_id) DO UPDATE
            SET quantity = quantity + excluded.quantity,
                price_snapshot = excluded.price_snapshot
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&cart.cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(product.unit_price)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to add cart item: {}", e)))?;

        timer.observe_duration();

        info!(cart_id = %cart.cart_id, product_id = %product_id, "Cart item added");

        self.rebuild_cart_view(cart).await
    }

    /// Overwrite a cart line's quantity. Zero deletes the line; negative
    /// values are rejected before reaching here.
    #[instrument(skip(self), fields(session_id = %session_id, product_id = %product_id, quantity))]
    pub async fn set_cart_item_quantity(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<CartView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_cart_item_quantity"])
            .start_timer();

        if quantity < 0 {
            return Err(AppError::BadRequest(anyhow!(
                "quantity must not be negative"
            )));
        }

        let cart = self
            .find_cart(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Cart not found for session")))?;

        if quantity == 0 {
            sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND product_id = ?")
                .bind(&cart.cart_id)
                .bind(product_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to remove cart item: {}", e))
                })?;
        } else {
            let result =
                sqlx::query("UPDATE cart_items SET quantity = ? WHERE cart_id = ? AND product_id = ?")
                    .bind(quantity)
                    .bind(&cart.cart_id)
                    .bind(product_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow!("Failed to update cart item: {}", e))
                    })?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(anyhow!("Product not in cart")));
            }
        }

        timer.observe_duration();

        self.rebuild_cart_view(cart).await
    }

    /// Remove a cart line. Absence is not an error.
    #[instrument(skip(self), fields(session_id = %session_id, product_id = %product_id))]
    pub async fn remove_cart_item(
        &self,
        session_id: &str,
        product_id: &str,
    ) -> Result<CartView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_cart_item"])
            .start_timer();

        let cart = self
            .find_cart(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Cart not found for session")))?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND product_id = ?")
            .bind(&cart.cart_id)
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to remove cart item: {}", e)))?;

        timer.observe_duration();

        self.rebuild_cart_view(cart).await
    }

    /// Delete every line in the session's cart. The cart row survives so the
    /// session can keep shopping.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn clear_cart(&self, session_id: &str) -> Result<CartView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["clear_cart"])
            .start_timer();

        let cart = self
            .find_cart(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Cart not found for session")))?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(&cart.cart_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to clear cart: {}", e)))?;

        timer.observe_duration();

        info!(cart_id = %cart.cart_id, "Cart cleared");

        self.rebuild_cart_view(cart).await
    }

    // -------------------------------------------------------------------------
    // Company / Customer Operations
    // -------------------------------------------------------------------------

    /// Create a company.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_company(&self, input: &CreateCompany) -> Result<Company, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (company_id, name, address, phone, email, created_utc)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING company_id, name, address, phone, email, created_utc
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to create company: {}", e)))?;

        timer.observe_duration();

        info!(company_id = %company.company_id, "Company created");

        Ok(company)
    }

    /// Get a company by ID.
    pub async fn get_company(&self, company_id: &str) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT company_id, name, address, phone, email, created_utc FROM companies WHERE company_id = ?",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get company: {}", e)))?;
        Ok(company)
    }

    /// List companies.
    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT company_id, name, address, phone, email, created_utc FROM companies ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list companies: {}", e)))?;
        Ok(companies)
    }

    /// Create a customer.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_customer(&self, input: &CreateCustomer) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (customer_id, name, address, phone, email, created_utc)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING customer_id, name, address, phone, email, created_utc
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to create customer: {}", e)))?;

        timer.observe_duration();

        info!(customer_id = %customer.customer_id, "Customer created");

        Ok(customer)
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT customer_id, name, address, phone, email, created_utc FROM customers WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get customer: {}", e)))?;
        Ok(customer)
    }

    /// List customers.
    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT customer_id, name, address, phone, email, created_utc FROM customers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list customers: {}", e)))?;
        Ok(customers)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Build and persist a numbered invoice from resolved line items.
    ///
    /// Totals are summed in input order so repeated runs are bit-identical;
    /// `sort_order` freezes each item's 0-based input position. The invoice
    /// and its items commit as one transaction. Allocation retries from
    /// fresh state when the insert loses the `invoice_number` uniqueness
    /// race.
    #[instrument(skip(self, input, items), fields(company_id = %input.company_id, customer_id = %input.customer_id, items = items.len()))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
        items: &[CreateInvoiceItem],
        number_prefix: &str,
        number_pad_width: usize,
    ) -> Result<InvoiceView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        if items.is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "Invoice must have at least one item"
            )));
        }
        for item in items {
            if item.quantity < 1 {
                return Err(AppError::BadRequest(anyhow!(
                    "Item quantity must be at least 1"
                )));
            }
            if item.unit_price < 0 {
                return Err(AppError::BadRequest(anyhow!(
                    "Item unit_price must not be negative"
                )));
            }
        }

        let company = self
            .get_company(&input.company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Company not found")))?;
        let customer = self
            .get_customer(&input.customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Customer not found")))?;

        let line_totals: Vec<i64> = items.iter().map(|i| i.quantity * i.unit_price).collect();
        let subtotal: i64 = line_totals.iter().sum();
        let total = subtotal + input.tax + input.service_charge;

        let mut last_conflict = None;
        for attempt in 0..NUMBER_ALLOCATION_ATTEMPTS {
            let invoice_number =
                numbering::next_number(&self.pool, number_prefix, number_pad_width).await?;

            let mut tx = self.pool.begin().await.map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to begin invoice transaction: {}", e))
            })?;

            let invoice_id = Uuid::new_v4().to_string();
            let inserted = sqlx::query_as::<_, Invoice>(
                r#"
                INSERT INTO invoices (
                    invoice_id, invoice_number, company_id, customer_id, invoice_date,
                    due_date, subtotal, tax, service_charge, total, status, notes, created_utc
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?, ?)
                RETURNING invoice_id, invoice_number, company_id, customer_id, invoice_date,
                    due_date, subtotal, tax, service_charge, total, status, notes, created_utc
                "#,
            )
            .bind(&invoice_id)
            .bind(&invoice_number)
            .bind(&input.company_id)
            .bind(&input.customer_id)
            .bind(Utc::now().date_naive())
            .bind(input.due_date)
            .bind(subtotal)
            .bind(input.tax)
            .bind(input.service_charge)
            .bind(total)
            .bind(&input.notes)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await;

            let invoice = match inserted {
                Ok(invoice) => invoice,
                Err(e) if is_unique_violation(&e) => {
                    NUMBER_ALLOCATION_RETRIES_TOTAL
                        .with_label_values(&["retried"])
                        .inc();
                    warn!(
                        invoice_number = %invoice_number,
                        attempt = attempt + 1,
                        "Invoice number conflict, retrying allocation"
                    );
                    tx.rollback().await.ok();
                    last_conflict = Some(invoice_number);
                    continue;
                }
                Err(e) => {
                    return Err(AppError::DatabaseError(anyhow!(
                        "Failed to create invoice: {}",
                        e
                    )))
                }
            };

            let mut invoice_items = Vec::with_capacity(items.len());
            for (position, (item, line_total)) in items.iter().zip(&line_totals).enumerate() {
                let invoice_item = sqlx::query_as::<_, InvoiceItem>(
                    r#"
                    INSERT INTO invoice_items (
                        invoice_item_id, invoice_id, name, specification,
                        quantity, unit, unit_price, total, sort_order
                    )
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    RETURNING invoice_item_id, invoice_id, name, specification,
                        quantity, unit, unit_price, total, sort_order
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&invoice_id)
                .bind(&item.name)
                .bind(&item.specification)
                .bind(item.quantity)
                .bind(&item.unit)
                .bind(item.unit_price)
                .bind(line_total)
                .bind(position as i64)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to create invoice item: {}", e))
                })?;
                invoice_items.push(invoice_item);
            }

            tx.commit().await.map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to commit invoice: {}", e))
            })?;

            timer.observe_duration();

            INVOICES_TOTAL.with_label_values(&["draft"]).inc();

            info!(
                invoice_id = %invoice.invoice_id,
                invoice_number = %invoice.invoice_number,
                total = invoice.total,
                "Invoice created"
            );

            return Ok(InvoiceView {
                invoice,
                items: invoice_items,
                company,
                customer,
            });
        }

        NUMBER_ALLOCATION_RETRIES_TOTAL
            .with_label_values(&["exhausted"])
            .inc();

        Err(AppError::Conflict(anyhow!(
            "Could not allocate a unique invoice number (last tried {})",
            last_conflict.unwrap_or_default()
        )))
    }

    async fn get_invoice_row(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, invoice_number, company_id, customer_id, invoice_date,
                due_date, subtotal, tax, service_charge, total, status, notes, created_utc
            FROM invoices
            WHERE invoice_id = ?
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get invoice: {}", e)))?;
        Ok(invoice)
    }

    async fn get_invoice_items(&self, invoice_id: &str) -> Result<Vec<InvoiceItem>, AppError> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT invoice_item_id, invoice_id, name, specification,
                quantity, unit, unit_price, total, sort_order
            FROM invoice_items
            WHERE invoice_id = ?
            ORDER BY sort_order
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to get invoice items: {}", e)))?;
        Ok(items)
    }

    async fn assemble_view(&self, invoice: Invoice) -> Result<InvoiceView, AppError> {
        let items = self.get_invoice_items(&invoice.invoice_id).await?;
        // Company/customer fields are joined live; historical invoices track
        // later directory edits.
        let company = self
            .get_company(&invoice.company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Company not found")))?;
        let customer = self
            .get_customer(&invoice.customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Customer not found")))?;
        Ok(InvoiceView {
            invoice,
            items,
            company,
            customer,
        })
    }

    /// Get a full invoice with items, company, and customer.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice_view(
        &self,
        invoice_id: &str,
    ) -> Result<Option<InvoiceView>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_view"])
            .start_timer();

        let view = match self.get_invoice_row(invoice_id).await? {
            Some(invoice) => Some(self.assemble_view(invoice).await?),
            None => None,
        };

        timer.observe_duration();

        Ok(view)
    }

    /// Paginated invoice list with optional status filter and search over
    /// invoice number and customer name.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<InvoicePage, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let page = filter.page.max(1);
        let limit = filter.limit.clamp(1, 100);
        let offset = (page - 1) * limit;
        let status = filter.status.map(|s| s.as_str().to_string());
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoices i
            JOIN customers cu ON cu.customer_id = i.customer_id
            WHERE (? IS NULL OR i.status = ?)
              AND (? IS NULL OR i.invoice_number LIKE ? OR cu.name LIKE ?)
            "#,
        )
        .bind(&status)
        .bind(&status)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to count invoices: {}", e)))?;

        let invoices = sqlx::query_as::<_, InvoiceSummary>(
            r#"
            SELECT i.invoice_id, i.invoice_number, co.name AS company_name,
                cu.name AS customer_name, i.invoice_date, i.due_date, i.total,
                i.status, i.created_utc
            FROM invoices i
            JOIN companies co ON co.company_id = i.company_id
            JOIN customers cu ON cu.customer_id = i.customer_id
            WHERE (? IS NULL OR i.status = ?)
              AND (? IS NULL OR i.invoice_number LIKE ? OR cu.name LIKE ?)
            ORDER BY i.created_utc DESC, i.rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&status)
        .bind(&status)
        .bind(&search)
        .bind(&search)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

        Ok(InvoicePage {
            invoices,
            page,
            limit,
            total,
            total_pages,
        })
    }

    /// Apply a status transition, rejecting anything outside the legal table.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, next = next.as_str()))]
    pub async fn update_invoice_status(
        &self,
        invoice_id: &str,
        next: InvoiceStatus,
    ) -> Result<InvoiceView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_status"])
            .start_timer();

        let invoice = self
            .get_invoice_row(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

        let current = invoice.status();
        if !current.can_transition(next) {
            return Err(AppError::InvalidTransition(anyhow!(
                "Cannot move invoice from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        let updated = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = ?
            WHERE invoice_id = ?
            RETURNING invoice_id, invoice_number, company_id, customer_id, invoice_date,
                due_date, subtotal, tax, service_charge, total, status, notes, created_utc
            "#,
        )
        .bind(next.as_str())
        .bind(invoice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to update invoice status: {}", e)))?;

        timer.observe_duration();

        INVOICES_TOTAL.with_label_values(&[next.as_str()]).inc();

        info!(
            invoice_id = %invoice_id,
            from = current.as_str(),
            to = next.as_str(),
            "Invoice status updated"
        );

        self.assemble_view(updated).await
    }

    /// Confirmation side-channel: a DRAFT invoice silently advances to SENT
    /// first, then the confirmation event is recorded. The status change is
    /// not rolled back if the record step fails.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, channel = %channel))]
    pub async fn confirm_invoice(
        &self,
        invoice_id: &str,
        channel: &str,
    ) -> Result<InvoiceView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["confirm_invoice"])
            .start_timer();

        let invoice = self
            .get_invoice_row(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow!("Invoice not found")))?;

        let invoice = if invoice.status() == InvoiceStatus::Draft {
            self.update_invoice_status(invoice_id, InvoiceStatus::Sent)
                .await?
                .invoice
        } else {
            invoice
        };

        sqlx::query(
            r#"
            INSERT INTO invoice_confirmations (confirmation_id, invoice_id, channel, confirmed_utc)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(invoice_id)
        .bind(channel)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to record confirmation: {}", e)))?;

        timer.observe_duration();

        info!(invoice_id = %invoice_id, channel = %channel, "Invoice confirmation recorded");

        self.assemble_view(invoice).await
    }

    /// Delete an invoice and its items together.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = ?")
            .bind(invoice_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to delete invoice: {}", e)))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Invoice deleted");
        }

        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Pricing Plan Operations
    // -------------------------------------------------------------------------

    /// List pricing plans in display order.
    #[instrument(skip(self))]
    pub async fn list_pricing_plans(&self) -> Result<Vec<PricingPlan>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_pricing_plans"])
            .start_timer();

        let plans = sqlx::query_as::<_, PricingPlan>(
            r#"
            SELECT plan_id, name, price, original_price, discount, features,
                limitations, popular, is_active, sort_order, created_utc
            FROM pricing_plans
            ORDER BY sort_order, created_utc
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow!("Failed to list pricing plans: {}", e)))?;

        timer.observe_duration();

        Ok(plans)
    }

    /// Import normalized pricing-plan records; same transaction semantics as
    /// product import.
    #[instrument(skip(self, plans), fields(count = plans.len(), replace_existing))]
    pub async fn import_pricing_plans(
        &self,
        plans: &[NewPricingPlan],
        replace_existing: bool,
    ) -> Result<usize, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["import_pricing_plans"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to begin import: {}", e)))?;

        if replace_existing {
            sqlx::query("DELETE FROM pricing_plans")
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow!("Failed to clear pricing plans: {}", e))
                })?;
        }

        let mut created = 0usize;
        for plan in plans {
            sqlx::query(
                r#"
                INSERT INTO pricing_plans (
                    plan_id, name, price, original_price, discount, features,
                    limitations, popular, is_active, sort_order, created_utc
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&plan.name)
            .bind(plan.price)
            .bind(plan.original_price)
            .bind(&plan.discount)
            .bind(crate::models::pricing_plan::join_multi_value(&plan.features))
            .bind(crate::models::pricing_plan::join_multi_value(&plan.limitations))
            .bind(plan.popular)
            .bind(plan.is_active)
            .bind(plan.sort_order)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow!("Failed to import pricing plan: {}", e))
            })?;
            created += 1;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow!("Failed to commit import: {}", e)))?;

        timer.observe_duration();

        info!(created = created, replace_existing, "Pricing plans imported");

        Ok(created)
    }
}

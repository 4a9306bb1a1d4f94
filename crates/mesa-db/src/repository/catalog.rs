//! # Catalog Repository
//!
//! Database operations for ingredients, products, and recipes.
//!
//! Derived cost columns (`ingredients.cost_per_unit`,
//! `products.cost_price_cents`) are written only through the dedicated
//! setters; the costing engine is their single writer.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::{DiscountKind, Ingredient, Product, RecipeEntry, Unit};

/// Fields accepted when creating or updating a product.
///
/// `price_cents` is not here: the display price is derived from
/// `base_price_cents` and the product discount by the caller.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub category_id: Option<String>,
    pub base_price_cents: i64,
    pub price_cents: i64,
    pub discount_kind: Option<DiscountKind>,
    pub discount_value: Option<f64>,
}

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Ingredients
    // =========================================================================

    /// Creates a new ingredient.
    pub async fn create_ingredient(
        &self,
        name: &str,
        unit: Unit,
        supplier_id: Option<&str>,
    ) -> DbResult<Ingredient> {
        let now = Utc::now();
        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            unit,
            cost_per_unit: None,
            supplier_id: supplier_id.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %ingredient.id, name = %ingredient.name, "Creating ingredient");

        sqlx::query(
            r#"
            INSERT INTO ingredients (id, name, unit, cost_per_unit, supplier_id, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(ingredient.unit)
        .bind(ingredient.cost_per_unit)
        .bind(&ingredient.supplier_id)
        .bind(ingredient.is_active)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(ingredient)
    }

    /// Gets an ingredient by ID.
    pub async fn get_ingredient(&self, id: &str) -> DbResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, unit, cost_per_unit, supplier_id, is_active, created_at, updated_at
            FROM ingredients
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }

    /// Lists active ingredients by name.
    pub async fn list_ingredients(&self) -> DbResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, unit, cost_per_unit, supplier_id, is_active, created_at, updated_at
            FROM ingredients
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ingredients)
    }

    /// Updates an ingredient's editable fields.
    pub async fn update_ingredient(
        &self,
        id: &str,
        name: &str,
        unit: Unit,
        supplier_id: Option<&str>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ingredients SET name = ?2, unit = ?3, supplier_id = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(unit)
        .bind(supplier_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", id));
        }

        Ok(())
    }

    /// Overwrites the derived cost per canonical unit. Costing engine only.
    pub async fn set_ingredient_cost(&self, id: &str, cost_per_unit: Option<f64>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ingredients SET cost_per_unit = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(cost_per_unit)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", id));
        }

        Ok(())
    }

    /// Soft-deletes an ingredient.
    pub async fn deactivate_ingredient(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ingredients SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", id));
        }

        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a new product.
    pub async fn create_product(&self, input: &ProductInput) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            category_id: input.category_id.clone(),
            base_price_cents: input.base_price_cents,
            price_cents: input.price_cents,
            discount_kind: input.discount_kind,
            discount_value: input.discount_value,
            cost_price_cents: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category_id, base_price_cents, price_cents,
                discount_kind, discount_value, cost_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.base_price_cents)
        .bind(product.price_cents)
        .bind(product.discount_kind)
        .bind(product.discount_value)
        .bind(product.cost_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category_id, base_price_cents, price_cents,
                   discount_kind, discount_value, cost_price_cents,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products by name.
    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category_id, base_price_cents, price_cents,
                   discount_kind, discount_value, cost_price_cents,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's editable fields, including price and product
    /// discount.
    pub async fn update_product(&self, id: &str, input: &ProductInput) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2, category_id = ?3, base_price_cents = ?4, price_cents = ?5,
                discount_kind = ?6, discount_value = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.category_id)
        .bind(input.base_price_cents)
        .bind(input.price_cents)
        .bind(input.discount_kind)
        .bind(input.discount_value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Overwrites the derived cost price. Costing engine only.
    pub async fn set_product_cost(&self, id: &str, cost_price_cents: Option<i64>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET cost_price_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(cost_price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes a product.
    pub async fn deactivate_product(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// Replaces a product's full bill of materials in one transaction.
    pub async fn replace_recipe(&self, product_id: &str, entries: &[RecipeEntry]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM recipe_entries WHERE product_id = ?1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO recipe_entries (product_id, ingredient_id, quantity, unit)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(product_id)
            .bind(&entry.ingredient_id)
            .bind(entry.quantity)
            .bind(entry.unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a product's recipe. Empty when the product has no recipe
    /// (it then carries its own stock).
    pub async fn get_recipe(&self, product_id: &str) -> DbResult<Vec<RecipeEntry>> {
        let entries = sqlx::query_as::<_, RecipeEntry>(
            r#"
            SELECT product_id, ingredient_id, quantity, unit
            FROM recipe_entries
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Product IDs whose recipes use an ingredient. The costing cascade
    /// fans out over this.
    pub async fn products_using_ingredient(&self, ingredient_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT product_id
            FROM recipe_entries
            WHERE ingredient_id = ?1
            "#,
        )
        .bind(ingredient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

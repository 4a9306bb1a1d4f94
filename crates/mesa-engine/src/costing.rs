//! # Costing Service
//!
//! Persists derived costs and runs the recalculation cascade.
//!
//! ## Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock moved for ingredient X                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  recalculate_ingredient_cost(X)                                         │
//! │       │  weighted average over X's positive balances (all warehouses)   │
//! │       ▼                                                                 │
//! │  recalculate_products_for_ingredient(X)                                 │
//! │       │  every product whose recipe references X                        │
//! │       ▼                                                                 │
//! │  recalculate_product_cost(P) per product:                               │
//! │       recipe roll-up → else own-stock average → else base price         │
//! │                                                                         │
//! │  Synchronous and idempotent: rerunning recomputes the same values.      │
//! │  Missing cost data degrades (None / fallback), it never fails the       │
//! │  write that triggered the cascade.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use mesa_core::costing::{recipe_cost, weighted_average_cost, Lot, RecipeCostEntry};
use mesa_core::{ItemType, Money};
use mesa_db::Database;

/// Service that owns the derived cost columns.
#[derive(Debug, Clone)]
pub struct CostingService {
    db: Database,
}

impl CostingService {
    /// Creates a new CostingService.
    pub fn new(db: Database) -> Self {
        CostingService { db }
    }

    /// Recomputes an ingredient's weighted-average cost per canonical unit
    /// and persists it. No positive-quantity balance → the stored cost is
    /// left untouched.
    pub async fn recalculate_ingredient_cost(&self, ingredient_id: &str) -> EngineResult<Option<f64>> {
        let lots: Vec<Lot> = self
            .db
            .inventory()
            .list_for_item(ItemType::Ingredient, ingredient_id)
            .await?
            .into_iter()
            .filter_map(|item| {
                item.unit_cost.map(|unit_cost| Lot {
                    quantity: item.quantity,
                    unit_cost,
                })
            })
            .collect();

        let average = weighted_average_cost(&lots);
        if let Some(cost) = average {
            self.db
                .catalog()
                .set_ingredient_cost(ingredient_id, Some(cost))
                .await?;
            debug!(ingredient_id, cost, "Ingredient cost recalculated");
        } else {
            debug!(ingredient_id, "No positive costed balance, keeping previous cost");
        }

        Ok(average)
    }

    /// Recomputes a product's cost price in cents and persists it.
    ///
    /// Three-tier resolution: recipe roll-up when a recipe exists, else
    /// the weighted average of the product's own stock, else the base
    /// price.
    pub async fn recalculate_product_cost(&self, product_id: &str) -> EngineResult<Money> {
        let catalog = self.db.catalog();
        let product = catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Product", product_id))?;

        let recipe = catalog.get_recipe(product_id).await?;

        let cost = if !recipe.is_empty() {
            let mut entries = Vec::with_capacity(recipe.len());
            for entry in &recipe {
                let ingredient = catalog
                    .get_ingredient(&entry.ingredient_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Ingredient", &entry.ingredient_id))?;
                entries.push(RecipeCostEntry {
                    quantity: entry.quantity,
                    unit: entry.unit,
                    ingredient_unit: ingredient.unit,
                    ingredient_cost: ingredient.cost_per_unit,
                });
            }
            recipe_cost(&entries)
        } else {
            let lots: Vec<Lot> = self
                .db
                .inventory()
                .list_for_item(ItemType::Product, product_id)
                .await?
                .into_iter()
                .filter_map(|item| {
                    item.unit_cost.map(|unit_cost| Lot {
                        quantity: item.quantity,
                        unit_cost,
                    })
                })
                .collect();

            match weighted_average_cost(&lots) {
                Some(rate) => Money::from_f64(rate),
                None => Money::from_cents(product.base_price_cents),
            }
        };

        catalog
            .set_product_cost(product_id, Some(cost.cents()))
            .await?;
        debug!(product_id, cost_cents = cost.cents(), "Product cost recalculated");

        Ok(cost)
    }

    /// Fans an ingredient cost change out to every product whose recipe
    /// uses it.
    pub async fn recalculate_products_for_ingredient(&self, ingredient_id: &str) -> EngineResult<()> {
        let product_ids = self
            .db
            .catalog()
            .products_using_ingredient(ingredient_id)
            .await?;

        if product_ids.is_empty() {
            return Ok(());
        }

        info!(ingredient_id, products = product_ids.len(), "Costing fan-out");
        for product_id in &product_ids {
            self.recalculate_product_cost(product_id).await?;
        }

        Ok(())
    }

    /// Full cascade for a set of items touched by a stock movement.
    pub async fn recalculate_for_items(&self, items: &[(ItemType, String)]) -> EngineResult<()> {
        for (item_type, item_id) in items {
            match item_type {
                ItemType::Ingredient => {
                    self.recalculate_ingredient_cost(item_id).await?;
                    self.recalculate_products_for_ingredient(item_id).await?;
                }
                ItemType::Product => {
                    self.recalculate_product_cost(item_id).await?;
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mesa_core::{RecipeEntry, Unit};
    use mesa_db::{BalanceChange, DbConfig, ProductInput};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db.warehouses().create("Main", None).await.unwrap();
        (db, wh.id)
    }

    async fn stock(db: &Database, wh: &str, item_type: ItemType, id: &str, qty: f64, cost: f64) {
        db.inventory()
            .adjust(
                wh,
                &BalanceChange {
                    item_type,
                    item_id: id.to_string(),
                    quantity_delta: qty,
                    unit_cost: Some(cost),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ingredient_weighted_average_across_warehouses() {
        let (db, wh1) = setup().await;
        let wh2 = db.warehouses().create("Second", None).await.unwrap();
        let service = CostingService::new(db.clone());

        let ing = db
            .catalog()
            .create_ingredient("Beans", Unit::Gram, None)
            .await
            .unwrap();
        stock(&db, &wh1, ItemType::Ingredient, &ing.id, 10.0, 2.0).await;
        stock(&db, &wh2.id, ItemType::Ingredient, &ing.id, 5.0, 5.0).await;

        let avg = service.recalculate_ingredient_cost(&ing.id).await.unwrap();
        assert_eq!(avg, Some(3.0));

        let stored = db.catalog().get_ingredient(&ing.id).await.unwrap().unwrap();
        assert_eq!(stored.cost_per_unit, Some(3.0));
    }

    #[tokio::test]
    async fn test_no_stock_keeps_previous_cost() {
        let (db, _) = setup().await;
        let service = CostingService::new(db.clone());

        let ing = db
            .catalog()
            .create_ingredient("Beans", Unit::Gram, None)
            .await
            .unwrap();
        db.catalog()
            .set_ingredient_cost(&ing.id, Some(0.5))
            .await
            .unwrap();

        let avg = service.recalculate_ingredient_cost(&ing.id).await.unwrap();
        assert_eq!(avg, None);

        let stored = db.catalog().get_ingredient(&ing.id).await.unwrap().unwrap();
        assert_eq!(stored.cost_per_unit, Some(0.5));
    }

    #[tokio::test]
    async fn test_product_cost_from_recipe() {
        let (db, _) = setup().await;
        let service = CostingService::new(db.clone());
        let catalog = db.catalog();

        let sugar = catalog
            .create_ingredient("Sugar", Unit::Gram, None)
            .await
            .unwrap();
        catalog.set_ingredient_cost(&sugar.id, Some(0.01)).await.unwrap();

        let product = catalog
            .create_product(&ProductInput {
                name: "Cake".to_string(),
                category_id: None,
                base_price_cents: 1200,
                price_cents: 1200,
                discount_kind: None,
                discount_value: None,
            })
            .await
            .unwrap();
        catalog
            .replace_recipe(
                &product.id,
                &[RecipeEntry {
                    product_id: product.id.clone(),
                    ingredient_id: sugar.id.clone(),
                    quantity: 50.0,
                    unit: Unit::Gram,
                }],
            )
            .await
            .unwrap();

        // 50 g at $0.01/g → $0.50
        let cost = service.recalculate_product_cost(&product.id).await.unwrap();
        assert_eq!(cost.cents(), 50);
    }

    #[tokio::test]
    async fn test_product_cost_fallbacks() {
        let (db, wh) = setup().await;
        let service = CostingService::new(db.clone());

        let product = db
            .catalog()
            .create_product(&ProductInput {
                name: "Bottle".to_string(),
                category_id: None,
                base_price_cents: 200,
                price_cents: 200,
                discount_kind: None,
                discount_value: None,
            })
            .await
            .unwrap();

        // no recipe, no stock → base price
        let cost = service.recalculate_product_cost(&product.id).await.unwrap();
        assert_eq!(cost.cents(), 200);

        // own stock appears → its average wins
        stock(&db, &wh, ItemType::Product, &product.id, 48.0, 0.55).await;
        let cost = service.recalculate_product_cost(&product.id).await.unwrap();
        assert_eq!(cost.cents(), 55);
    }

    #[tokio::test]
    async fn test_cascade_reaches_products() {
        let (db, wh) = setup().await;
        let service = CostingService::new(db.clone());
        let catalog = db.catalog();

        let beans = catalog
            .create_ingredient("Beans", Unit::Gram, None)
            .await
            .unwrap();
        let product = catalog
            .create_product(&ProductInput {
                name: "Espresso".to_string(),
                category_id: None,
                base_price_cents: 300,
                price_cents: 300,
                discount_kind: None,
                discount_value: None,
            })
            .await
            .unwrap();
        catalog
            .replace_recipe(
                &product.id,
                &[RecipeEntry {
                    product_id: product.id.clone(),
                    ingredient_id: beans.id.clone(),
                    quantity: 18.0,
                    unit: Unit::Gram,
                }],
            )
            .await
            .unwrap();

        stock(&db, &wh, ItemType::Ingredient, &beans.id, 1000.0, 0.02).await;
        service
            .recalculate_for_items(&[(ItemType::Ingredient, beans.id.clone())])
            .await
            .unwrap();

        // 18 g at $0.02/g → $0.36
        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.cost_price_cents, Some(36));
    }
}

//! # Seed Data Generator
//!
//! Populates the database with a small demo cafe for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p mesa-db --bin seed
//!
//! # Specify database path
//! cargo run -p mesa-db --bin seed -- --db ./data/mesa.db
//! ```
//!
//! ## Generated Data
//! - One warehouse ("Main storeroom")
//! - Ingredients with canonical units (coffee beans, milk, flour, sugar)
//! - Products with recipes (espresso, latte, croissant) plus one
//!   resale product with its own stock (bottled water)
//! - An opening stock receipt, applied so balances and average costs
//!   are populated
//! - A weekday happy-hour discount on the coffee category

use chrono::Utc;
use std::env;
use uuid::Uuid;

use mesa_core::{
    Discount, DiscountKind, DiscountScope, ItemType, ReceiptEffect, ReceiptKind, ReceiptLine,
    RecipeEntry, StockReceipt, Unit,
};
use mesa_db::{BalanceChange, Database, DbConfig, ProductInput};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./mesa_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mesa POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./mesa_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Mesa POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    if !db.warehouses().list().await?.is_empty() {
        println!("⚠ Database already seeded; delete the file to regenerate.");
        return Ok(());
    }

    // Warehouse
    let warehouse = db
        .warehouses()
        .create("Main storeroom", Some("Back of house"))
        .await?;
    println!("✓ Warehouse {}", warehouse.name);

    // Ingredients
    let catalog = db.catalog();
    let beans = catalog
        .create_ingredient("Coffee beans", Unit::Gram, Some("roaster-1"))
        .await?;
    let milk = catalog
        .create_ingredient("Whole milk", Unit::Milliliter, Some("dairy-1"))
        .await?;
    let flour = catalog.create_ingredient("Flour", Unit::Gram, None).await?;
    let sugar = catalog.create_ingredient("Sugar", Unit::Gram, None).await?;
    println!("✓ 4 ingredients");

    // Products
    let espresso = catalog
        .create_product(&ProductInput {
            name: "Espresso".to_string(),
            category_id: Some("coffee".to_string()),
            base_price_cents: 300,
            price_cents: 300,
            discount_kind: None,
            discount_value: None,
        })
        .await?;
    let latte = catalog
        .create_product(&ProductInput {
            name: "Latte".to_string(),
            category_id: Some("coffee".to_string()),
            base_price_cents: 450,
            price_cents: 450,
            discount_kind: None,
            discount_value: None,
        })
        .await?;
    let croissant = catalog
        .create_product(&ProductInput {
            name: "Croissant".to_string(),
            category_id: Some("bakery".to_string()),
            base_price_cents: 350,
            price_cents: 350,
            discount_kind: None,
            discount_value: None,
        })
        .await?;
    let water = catalog
        .create_product(&ProductInput {
            name: "Bottled water".to_string(),
            category_id: Some("retail".to_string()),
            base_price_cents: 200,
            price_cents: 200,
            discount_kind: None,
            discount_value: None,
        })
        .await?;
    println!("✓ 4 products");

    // Recipes (bottled water has none: it carries its own stock)
    catalog
        .replace_recipe(
            &espresso.id,
            &[RecipeEntry {
                product_id: espresso.id.clone(),
                ingredient_id: beans.id.clone(),
                quantity: 18.0,
                unit: Unit::Gram,
            }],
        )
        .await?;
    catalog
        .replace_recipe(
            &latte.id,
            &[
                RecipeEntry {
                    product_id: latte.id.clone(),
                    ingredient_id: beans.id.clone(),
                    quantity: 18.0,
                    unit: Unit::Gram,
                },
                RecipeEntry {
                    product_id: latte.id.clone(),
                    ingredient_id: milk.id.clone(),
                    quantity: 0.2,
                    unit: Unit::Liter,
                },
            ],
        )
        .await?;
    catalog
        .replace_recipe(
            &croissant.id,
            &[
                RecipeEntry {
                    product_id: croissant.id.clone(),
                    ingredient_id: flour.id.clone(),
                    quantity: 65.0,
                    unit: Unit::Gram,
                },
                RecipeEntry {
                    product_id: croissant.id.clone(),
                    ingredient_id: sugar.id.clone(),
                    quantity: 8.0,
                    unit: Unit::Gram,
                },
            ],
        )
        .await?;
    println!("✓ Recipes");

    // Opening stock: one goods-in receipt, applied so balances and
    // average costs exist
    let now = Utc::now();
    let receipt = StockReceipt {
        id: Uuid::new_v4().to_string(),
        kind: ReceiptKind::Receipt,
        warehouse_id: warehouse.id.clone(),
        supplier_id: Some("roaster-1".to_string()),
        occurred_at: now,
        created_at: now,
    };
    let stock: &[(&str, ItemType, f64, f64)] = &[
        (&beans.id, ItemType::Ingredient, 5_000.0, 0.018),
        (&milk.id, ItemType::Ingredient, 20_000.0, 0.0012),
        (&flour.id, ItemType::Ingredient, 10_000.0, 0.0008),
        (&sugar.id, ItemType::Ingredient, 5_000.0, 0.0009),
        (&water.id, ItemType::Product, 48.0, 0.55),
    ];
    let lines: Vec<ReceiptLine> = stock
        .iter()
        .map(|(id, item_type, qty, cost)| ReceiptLine {
            receipt_id: receipt.id.clone(),
            item_type: *item_type,
            item_id: id.to_string(),
            quantity: *qty,
            unit_cost: Some(*cost),
        })
        .collect();
    db.receipts().create(&receipt, &lines).await?;

    let effects: Vec<ReceiptEffect> = lines
        .iter()
        .map(|line| ReceiptEffect {
            receipt_id: receipt.id.clone(),
            item_type: line.item_type,
            item_id: line.item_id.clone(),
            quantity_delta: line.quantity,
            unit_cost: line.unit_cost,
        })
        .collect();
    let changes: Vec<BalanceChange> = lines
        .iter()
        .map(|line| BalanceChange {
            item_type: line.item_type,
            item_id: line.item_id.clone(),
            quantity_delta: line.quantity,
            unit_cost: line.unit_cost,
        })
        .collect();
    db.receipts().apply(&warehouse.id, &effects, &changes).await?;

    for (id, _, _, cost) in stock.iter().take(4) {
        catalog.set_ingredient_cost(id, Some(*cost)).await?;
    }
    println!("✓ Opening stock receipt applied");

    // Happy hour: 20% off coffee, weekday afternoons
    db.discounts()
        .create(&Discount {
            id: Uuid::new_v4().to_string(),
            name: "Happy Hour".to_string(),
            scope: DiscountScope::Category,
            kind: DiscountKind::Percentage,
            value: 20.0,
            category_ids: vec!["coffee".to_string()],
            product_id: None,
            auto_apply: true,
            auto_apply_days: vec![1, 2, 3, 4, 5],
            auto_apply_start: Some("16:00".parse()?),
            auto_apply_end: Some("18:00".parse()?),
            is_active: true,
        })
        .await?;
    println!("✓ Happy Hour discount");

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

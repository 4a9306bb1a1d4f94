//! # Domain Types
//!
//! Core domain types for the inventory and order engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  CATALOG              LEDGER                 ORDERS                     │
//! │  ┌────────────┐       ┌────────────────┐     ┌──────────────┐           │
//! │  │ Ingredient │       │ Warehouse      │     │ Order        │           │
//! │  │ Product    │──────►│ InventoryItem  │◄────│ OrderItem    │           │
//! │  │ RecipeEntry│ cost  │ StockReceipt   │ pay │ Payment info │           │
//! │  └────────────┘ rollup│ ReceiptLine    │     │ Discount     │           │
//! │                       │ ReceiptEffect  │     └──────────────┘           │
//! │                       │ InventoryAudit │                                │
//! │                       └────────────────┘                                │
//! │                                                                         │
//! │  InventoryItem is mutated ONLY by the ledger applying/reversing         │
//! │  receipt effects; everything else reads it.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID v4 `id` for relations; inventory balances are
//! keyed by the composite (warehouse_id, item_type, item_id).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::units::Unit;

// =============================================================================
// Warehouse
// =============================================================================

/// A physical or logical stock-keeping location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Item Type
// =============================================================================

/// What kind of catalog entity a stock row refers to.
///
/// Ingredients are consumed through recipes; products with no recipe carry
/// their own stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Ingredient,
    Product,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Ingredient => write!(f, "ingredient"),
            ItemType::Product => write!(f, "product"),
        }
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// The running stock balance for one item in one warehouse.
///
/// ## Invariants
/// - Unique on (warehouse_id, item_type, item_id)
/// - `quantity` is a signed running balance; negative means oversold
///   (allowed, no hard floor)
/// - `unit_cost` is the last known weighted-average cost per unit, `None`
///   until the first costed receipt arrives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub warehouse_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    pub quantity: f64,
    pub unit_cost: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Receipt (ledger entry)
// =============================================================================

/// The kind of ledger document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    /// Goods in: increases stock, folds the incoming lot into the
    /// weighted-average unit cost.
    Receipt,
    /// Goods out (spoilage, breakage): decreases stock, cost basis untouched.
    WriteOff,
    /// Full recount: line quantities are absolute counted values; the
    /// applied delta is `counted - previous`.
    Recount,
}

impl fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptKind::Receipt => write!(f, "receipt"),
            ReceiptKind::WriteOff => write!(f, "write_off"),
            ReceiptKind::Recount => write!(f, "recount"),
        }
    }
}

/// An append-only ledger document header.
///
/// Editing or deleting a receipt must reverse its previously applied effect
/// before the new one is applied; see the ledger service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockReceipt {
    pub id: String,
    pub kind: ReceiptKind,
    pub warehouse_id: String,
    pub supplier_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One line of a stock receipt.
///
/// For `Receipt` kind, `unit_cost` is the incoming lot cost per unit.
/// For `Recount`, `quantity` is the absolute counted value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReceiptLine {
    pub receipt_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    pub quantity: f64,
    pub unit_cost: Option<f64>,
}

/// The effect a receipt actually had on a balance, recorded at apply time.
///
/// Reversal replays the inverse of these rows. The effect is stored rather
/// than re-derived from the line list: once lines are edited, the original
/// delta can no longer be reconstructed from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReceiptEffect {
    pub receipt_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    /// Signed quantity delta applied to the balance.
    pub quantity_delta: f64,
    /// Incoming lot cost used for the moving-average update, if any.
    pub unit_cost: Option<f64>,
}

// =============================================================================
// Inventory Audit
// =============================================================================

/// A completed physical stock count. Immutable after creation.
///
/// `performed_at` is the lock boundary: receipts for this warehouse dated
/// on/before it can no longer be edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryAudit {
    pub id: String,
    pub warehouse_id: String,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    /// Sum of negative differences valued at unit cost, as a positive loss.
    pub total_loss_cents: i64,
    /// Sum of positive differences valued at unit cost.
    pub total_gain_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// One counted item within an audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLine {
    pub audit_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    pub previous_quantity: f64,
    pub counted_quantity: f64,
    /// counted - previous
    pub difference: f64,
    /// Unit cost at the moment of the audit (frozen).
    pub unit_cost_snapshot: Option<f64>,
    /// Signed value of the difference in cents (negative = loss).
    pub value_cents: i64,
}

// =============================================================================
// Catalog: Ingredient / Product / Recipe
// =============================================================================

/// A raw material tracked in stock and referenced by recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    /// Canonical stock-keeping unit. Recipe entries convert into this.
    pub unit: Unit,
    /// Derived weighted-average cost per canonical unit. Overwritten by the
    /// costing engine; never edited by hand.
    pub cost_per_unit: Option<f64>,
    pub supplier_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One bill-of-materials line: a product consumes `quantity` of an
/// ingredient, expressed in `unit` (converted to the ingredient's canonical
/// unit for costing and deduction).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RecipeEntry {
    pub product_id: String,
    pub ingredient_id: String,
    pub quantity: f64,
    pub unit: Unit,
}

/// A sellable menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,
    /// Catalog price before any product-level discount.
    pub base_price_cents: i64,
    /// Display price after the product-level discount, kept in sync by the
    /// catalog layer. Order lines are priced from this.
    pub price_cents: i64,
    /// Product-level discount (distinct from order `Discount` rows).
    pub discount_kind: Option<DiscountKind>,
    /// Percent (0-100) for Percentage, currency units for Fixed.
    pub discount_value: Option<f64>,
    /// Derived cost: recipe roll-up, else own-stock average, else base price.
    pub cost_price_cents: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Display price derived from the base price and the product-level
    /// discount, floored at zero.
    pub fn effective_price(&self) -> Money {
        let base = Money::from_cents(self.base_price_cents);
        match (self.discount_kind, self.discount_value) {
            (Some(DiscountKind::Percentage), Some(pct)) => {
                let bps = ((pct * 100.0).round() as i64).clamp(0, 10_000) as u32;
                (base - base.percentage(bps)).floor_zero()
            }
            (Some(DiscountKind::Fixed), Some(amount)) => {
                (base - Money::from_f64(amount)).floor_zero()
            }
            _ => base,
        }
    }
}

// =============================================================================
// Discounts
// =============================================================================

/// What part of an order a discount targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum DiscountScope {
    /// Applies to the whole order subtotal.
    Order,
    /// Applies to lines whose product category is targeted.
    Category,
    /// Applies to lines of one specific product.
    Product,
}

/// How the discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Flat amount in currency units, capped at the matching base.
    Fixed,
    /// Percent of the matching base, 0-100.
    Percentage,
}

/// An order-level discount definition.
///
/// Category-scoped discounts may auto-apply inside a weekly day/time window
/// without being selected by the cashier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: String,
    pub name: String,
    pub scope: DiscountScope,
    pub kind: DiscountKind,
    /// Percent (0-100) for Percentage, currency units for Fixed.
    pub value: f64,
    /// Target categories when scope is Category.
    pub category_ids: Vec<String>,
    /// Target product when scope is Product.
    pub product_id: Option<String>,
    /// Category scope only: apply automatically inside the window below.
    pub auto_apply: bool,
    /// Days of week the window is active, 0 = Sunday .. 6 = Saturday.
    pub auto_apply_days: Vec<u8>,
    pub auto_apply_start: Option<TimeOfDay>,
    pub auto_apply_end: Option<TimeOfDay>,
    pub is_active: bool,
}

/// A discount that was applied to an order, with the resolved amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub discount_id: String,
    pub name: String,
    pub amount: Money,
    /// True when the discount matched an auto-apply window rather than an
    /// explicit selection.
    pub auto_applied: bool,
}

// =============================================================================
// Time of Day
// =============================================================================

/// A wall-clock time without a date, as minutes since midnight.
///
/// Used for discount auto-apply windows; serialized as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Creates a time of day from hours and minutes.
    pub fn new(hours: u8, minutes: u8) -> Result<Self, ValidationError> {
        if hours > 23 || minutes > 59 {
            return Err(ValidationError::InvalidFormat {
                field: "time".to_string(),
                reason: format!("{}:{:02} is not a valid time of day", hours, minutes),
            });
        }
        Ok(TimeOfDay(hours as u16 * 60 + minutes as u16))
    }

    /// Minutes since midnight.
    #[inline]
    pub const fn minutes(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "time".to_string(),
            reason: format!("'{}' is not HH:MM", s),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hours: u8 = h.parse().map_err(|_| invalid())?;
        let minutes: u8 = m.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hours, minutes)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// The order lifecycle.
///
/// ```text
/// draft ──pay──► paid ──complete──► completed
///   │
///   └─cancel──► (deleted)
/// ```
/// No other transitions exist; nothing reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    Paid,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Paid => "paid",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

/// An order through its lifecycle.
///
/// Exactly one draft exists per (location, register, cashier) at a time,
/// enforced by lookup-before-create at `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub location_id: String,
    pub register_id: String,
    pub cashier_id: String,
    /// Warehouse stock is consumed from on payment.
    pub warehouse_id: String,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    /// Total of applied discounts including the manual discount.
    pub discount_cents: i64,
    pub manual_discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub paid_amount_cents: Option<i64>,
    pub change_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A line item in an order. Product data is snapshotted at add time so the
/// order survives later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub category_id: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Free-form modifier notes ("no onions"), JSON-encoded.
    pub modifiers: Option<String>,
    pub line_total_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_parse_and_display() {
        let t: TimeOfDay = "09:30".parse().unwrap();
        assert_eq!(t.minutes(), 570);
        assert_eq!(t.to_string(), "09:30");

        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("9h30".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Draft);
        assert_eq!(OrderStatus::Paid.as_str(), "paid");
    }

    #[test]
    fn test_effective_price_percentage() {
        let mut p = product_fixture(1000);
        p.discount_kind = Some(DiscountKind::Percentage);
        p.discount_value = Some(10.0);
        assert_eq!(p.effective_price().cents(), 900);
    }

    #[test]
    fn test_effective_price_fixed_floors_at_zero() {
        let mut p = product_fixture(500);
        p.discount_kind = Some(DiscountKind::Fixed);
        p.discount_value = Some(9.99);
        assert_eq!(p.effective_price().cents(), 0);
    }

    fn product_fixture(base_price_cents: i64) -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Espresso".to_string(),
            category_id: None,
            base_price_cents,
            price_cents: base_price_cents,
            discount_kind: None,
            discount_value: None,
            cost_price_cents: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

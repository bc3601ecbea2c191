use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MerchType {
    TShirt,
    Hoodie,
    Cap,
    Sticker,
    Bag,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Merchandise {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub merch_type: MerchType,
    pub points_cost: i64,
    /// Never negative.
    pub stock_quantity: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

/// Created atomically with the stock decrement and balance debit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MerchOrder {
    pub id: i64,
    pub student_id: i64,
    pub merchandise_id: i64,
    pub quantity: i64,
    pub points_spent: i64,
    pub status: OrderStatus,
    pub delivery_address: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

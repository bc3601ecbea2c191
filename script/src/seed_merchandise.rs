use anyhow::Context;
use chrono::Utc;
use models::MerchType;
use sqlx::SqlitePool;
use tracing::{info, warn};

struct MerchSpec {
    name: &'static str,
    description: &'static str,
    merch_type: MerchType,
    points_cost: i64,
    stock_quantity: i64,
}

const MERCH_ITEMS: &[MerchSpec] = &[
    MerchSpec {
        name: "Logo T-Shirt",
        description: "Branded t-shirt with the platform logo. 100% cotton, quality print.",
        merch_type: MerchType::TShirt,
        points_cost: 100,
        stock_quantity: 50,
    },
    MerchSpec {
        name: "Sticker Pack",
        description: "A collection of stickers with the platform logo and slogans.",
        merch_type: MerchType::Sticker,
        points_cost: 30,
        stock_quantity: 200,
    },
    MerchSpec {
        name: "Hoodie",
        description: "Warm hooded sweatshirt with the platform logo. Perfect for cooler weather.",
        merch_type: MerchType::Hoodie,
        points_cost: 200,
        stock_quantity: 30,
    },
    MerchSpec {
        name: "Cap",
        description: "Stylish cap with an embroidered logo. Adjustable size.",
        merch_type: MerchType::Cap,
        points_cost: 80,
        stock_quantity: 40,
    },
    MerchSpec {
        name: "Eco Tote Bag",
        description: "Eco-friendly tote bag made from recycled materials.",
        merch_type: MerchType::Bag,
        points_cost: 60,
        stock_quantity: 100,
    },
];

pub async fn seed_merchandise(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut created_count = 0;
    for spec in MERCH_ITEMS {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM merchandise WHERE name = ?")
            .bind(spec.name)
            .fetch_optional(pool)
            .await?;
        if existing.is_some() {
            warn!(name = spec.name, "merchandise already exists");
            continue;
        }

        sqlx::query(
            "INSERT INTO merchandise (name, description, merch_type, points_cost, stock_quantity, is_available, created_at)
             VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(spec.name)
        .bind(spec.description)
        .bind(spec.merch_type)
        .bind(spec.points_cost)
        .bind(spec.stock_quantity)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("unable to insert merchandise")?;

        created_count += 1;
        info!(name = spec.name, "created merchandise");
    }

    let available: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM merchandise WHERE is_available = 1")
        .fetch_one(pool)
        .await?;
    info!(created_count, available, "seeded merchandise");

    Ok(())
}

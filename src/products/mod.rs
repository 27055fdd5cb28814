use axum::{
    extract::State,
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::resolve_clinic_scope;
use crate::shared::error::ApiError;
use crate::shared::schema::{product_categories, products};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub critical_stock_limit: i32,
    pub track_stock: bool,
    pub price: BigDecimal,
    pub tax_rate: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = product_categories)]
pub struct ProductCategory {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SaveProductRequest {
    pub id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub quantity: Option<i32>,
    pub critical_stock_limit: Option<i32>,
    pub track_stock: Option<bool>,
    pub price: Option<BigDecimal>,
    pub tax_rate: Option<BigDecimal>,
}

#[derive(Debug, Deserialize)]
pub struct SaveCategoryRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProductWithStockFlag {
    #[serde(flatten)]
    pub product: Product,
    pub low_stock: bool,
}

/// The single definition of "low stock", evaluated at read time everywhere
/// the flag is exposed. Never stored.
pub fn is_low_stock(quantity: i32, critical_stock_limit: i32, track_stock: bool) -> bool {
    track_stock && quantity < critical_stock_limit
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProductWithStockFlag>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let rows: Vec<Product> = products::table
        .filter(products::clinic_id.eq(scope.clinic_id))
        .order(products::name.asc())
        .load(&mut conn)?;

    let annotated = rows
        .into_iter()
        .map(|product| {
            let low_stock = is_low_stock(
                product.quantity,
                product.critical_stock_limit,
                product.track_stock,
            );
            ProductWithStockFlag { product, low_stock }
        })
        .collect();

    Ok(Json(annotated))
}

pub async fn save_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::validation("product name required"));
    }

    let quantity = req.quantity.unwrap_or(0);
    let critical_stock_limit = req.critical_stock_limit.unwrap_or(0);
    let track_stock = req.track_stock.unwrap_or(true);
    let price = req.price.unwrap_or_else(|| BigDecimal::from(0));
    let tax_rate = req.tax_rate.unwrap_or_else(|| BigDecimal::from(0));

    let saved: Product = match req.id {
        Some(id) => diesel::update(
            products::table
                .filter(products::id.eq(id))
                .filter(products::clinic_id.eq(scope.clinic_id)),
        )
        .set((
            products::category_id.eq(req.category_id),
            products::name.eq(req.name.trim()),
            products::quantity.eq(quantity),
            products::critical_stock_limit.eq(critical_stock_limit),
            products::track_stock.eq(track_stock),
            products::price.eq(&price),
            products::tax_rate.eq(&tax_rate),
        ))
        .get_result(&mut conn)?,
        None => {
            let product = Product {
                id: Uuid::new_v4(),
                clinic_id: scope.clinic_id,
                category_id: req.category_id,
                name: req.name.trim().to_string(),
                quantity,
                critical_stock_limit,
                track_stock,
                price,
                tax_rate,
                created_at: Utc::now(),
            };
            diesel::insert_into(products::table)
                .values(&product)
                .get_result(&mut conn)?
        }
    };

    Ok(Json(saved))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProductCategory>>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    let rows: Vec<ProductCategory> = product_categories::table
        .filter(product_categories::clinic_id.eq(scope.clinic_id))
        .order(product_categories::name.asc())
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SaveCategoryRequest>,
) -> Result<Json<ProductCategory>, ApiError> {
    let mut conn = state.conn.get()?;
    let scope = resolve_clinic_scope(&mut conn, &headers)?;

    if req.name.trim().is_empty() {
        return Err(ApiError::validation("category name required"));
    }

    let category = ProductCategory {
        id: Uuid::new_v4(),
        clinic_id: scope.clinic_id,
        name: req.name.trim().to_string(),
        created_at: Utc::now(),
    };

    let saved = diesel::insert_into(product_categories::table)
        .values(&category)
        .get_result(&mut conn)?;

    Ok(Json(saved))
}

pub fn configure_products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", get(list_products).post(save_product))
        .route(
            "/api/product-categories",
            get(list_categories).post(create_category),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_the_limit_is_low_stock() {
        assert!(is_low_stock(3, 5, true));
    }

    #[test]
    fn at_the_limit_is_not_low_stock() {
        assert!(!is_low_stock(5, 5, true));
    }

    #[test]
    fn untracked_stock_is_never_low() {
        assert!(!is_low_stock(0, 5, false));
    }
}

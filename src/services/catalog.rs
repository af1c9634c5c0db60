use crate::{
    db::DbPool,
    entities::{
        batch::{self, Entity as Batch},
        category::{self, Entity as Category},
        product::{self, Entity as Product, ProductStatus},
        purchase_line::{self, Entity as PurchaseLine},
    },
    errors::ServiceError,
};
use sea_orm::*;
use std::sync::Arc;
use tracing::{info, instrument};

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: Option<String>,
    pub name: String,
    pub category_id: i64,
    pub stock_threshold: i32,
    pub status: ProductStatus,
}

/// Partial product update; only supplied fields change.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub code: Option<Option<String>>,
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub stock_threshold: Option<i32>,
    pub status: Option<ProductStatus>,
}

/// Listing filters for products.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name_contains: Option<String>,
    pub category_id: Option<i64>,
    pub status: Option<ProductStatus>,
}

/// Product and category maintenance.
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    // ---- categories ------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<category::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "Category name must not be empty".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let duplicate = Category::find()
            .filter(category::Column::Name.eq(name))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if duplicate.is_some() {
            return Err(ServiceError::Validation(format!(
                "Category '{}' already exists",
                name
            )));
        }

        category::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn get_category(&self, category_id: i64) -> Result<category::Model, ServiceError> {
        Category::find_by_id(category_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Category::find()
            .order_by_asc(category::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        category_id: i64,
        name: &str,
    ) -> Result<category::Model, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "Category name must not be empty".to_string(),
            ));
        }

        let existing = self.get_category(category_id).await?;
        let mut update: category::ActiveModel = existing.into();
        update.name = Set(name.to_string());
        update
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: i64) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        self.get_category(category_id).await?;

        let in_use = Product::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if in_use > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Category {} still has {} products",
                category_id, in_use
            )));
        }

        Category::delete_by_id(category_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(category_id, "Category deleted");
        Ok(())
    }

    // ---- products --------------------------------------------------------

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Product name must not be empty".to_string(),
            ));
        }
        if input.stock_threshold < 0 {
            return Err(ServiceError::Validation(
                "Stock threshold must not be negative".to_string(),
            ));
        }

        self.get_category(input.category_id).await?;

        let db = self.db_pool.as_ref();
        if let Some(code) = input.code.as_deref().filter(|c| !c.trim().is_empty()) {
            let duplicate = Product::find()
                .filter(product::Column::Code.eq(code))
                .one(db)
                .await
                .map_err(ServiceError::db_error)?;
            if duplicate.is_some() {
                return Err(ServiceError::Validation(format!(
                    "Product code '{}' is already in use",
                    code
                )));
            }
        }

        product::ActiveModel {
            code: Set(input.code.filter(|c| !c.trim().is_empty())),
            name: Set(input.name.trim().to_string()),
            category_id: Set(input.category_id),
            stock_threshold: Set(input.stock_threshold),
            status: Set(input.status.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn get_product(&self, product_id: i64) -> Result<product::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = Product::find();

        if let Some(fragment) = filter.name_contains.filter(|f| !f.trim().is_empty()) {
            query = query.filter(product::Column::Name.contains(fragment.trim()));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(product::Column::Status.eq(status.to_string()));
        }

        query
            .order_by_asc(product::Column::Name)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        product_id: i64,
        update: ProductUpdate,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(product_id).await?;

        if let Some(threshold) = update.stock_threshold {
            if threshold < 0 {
                return Err(ServiceError::Validation(
                    "Stock threshold must not be negative".to_string(),
                ));
            }
        }
        if let Some(category_id) = update.category_id {
            self.get_category(category_id).await?;
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(code) = update.code {
            active.code = Set(code.filter(|c| !c.trim().is_empty()));
        }
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation(
                    "Product name must not be empty".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(category_id) = update.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(threshold) = update.stock_threshold {
            active.stock_threshold = Set(threshold);
        }
        if let Some(status) = update.status {
            active.status = Set(status.to_string());
        }

        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Deleting a product with inventory or purchase history is refused;
    /// deactivate it instead.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: i64) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        self.get_product(product_id).await?;

        let batches = Batch::find()
            .filter(batch::Column::ProductId.eq(product_id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let lines = PurchaseLine::find()
            .filter(purchase_line::Column::ProductId.eq(product_id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if batches > 0 || lines > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Product {} has inventory or purchase history; set it INACTIVE instead",
                product_id
            )));
        }

        Product::delete_by_id(product_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(product_id, "Product deleted");
        Ok(())
    }
}

use crate::{
    db::DbPool,
    entities::{
        purchase::{self, Entity as Purchase},
        supplier::{self, Entity as Supplier},
    },
    errors::ServiceError,
};
use sea_orm::*;
use std::sync::Arc;
use tracing::{info, instrument};

/// Fields for a new supplier.
#[derive(Debug, Clone)]
pub struct NewSupplier {
    pub legal_name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Partial supplier update; only supplied fields change.
#[derive(Debug, Clone, Default)]
pub struct SupplierUpdate {
    pub legal_name: Option<String>,
    pub contact_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
}

pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(legal_name = %input.legal_name))]
    pub async fn create_supplier(
        &self,
        input: NewSupplier,
    ) -> Result<supplier::Model, ServiceError> {
        if input.legal_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Supplier legal name must not be empty".to_string(),
            ));
        }

        supplier::ActiveModel {
            legal_name: Set(input.legal_name.trim().to_string()),
            contact_name: Set(input.contact_name),
            phone: Set(input.phone),
            email: Set(input.email),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn get_supplier(&self, supplier_id: i64) -> Result<supplier::Model, ServiceError> {
        Supplier::find_by_id(supplier_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", supplier_id)))
    }

    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        Supplier::find()
            .order_by_asc(supplier::Column::LegalName)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, update))]
    pub async fn update_supplier(
        &self,
        supplier_id: i64,
        update: SupplierUpdate,
    ) -> Result<supplier::Model, ServiceError> {
        let existing = self.get_supplier(supplier_id).await?;

        let mut active: supplier::ActiveModel = existing.into();
        if let Some(legal_name) = update.legal_name {
            if legal_name.trim().is_empty() {
                return Err(ServiceError::Validation(
                    "Supplier legal name must not be empty".to_string(),
                ));
            }
            active.legal_name = Set(legal_name.trim().to_string());
        }
        if let Some(contact_name) = update.contact_name {
            active.contact_name = Set(contact_name);
        }
        if let Some(phone) = update.phone {
            active.phone = Set(phone);
        }
        if let Some(email) = update.email {
            active.email = Set(email);
        }

        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Suppliers referenced by purchases cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, supplier_id: i64) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        self.get_supplier(supplier_id).await?;

        let purchases = Purchase::find()
            .filter(purchase::Column::SupplierId.eq(supplier_id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if purchases > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Supplier {} has {} recorded purchases",
                supplier_id, purchases
            )));
        }

        Supplier::delete_by_id(supplier_id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        info!(supplier_id, "Supplier deleted");
        Ok(())
    }
}

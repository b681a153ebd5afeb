use crate::core::forms::EntitySchema;
use crate::core::register::{decode_row, decode_rows};
use crate::core::{Backend, Company, Equipment, EquipmentKind, Query};
use crate::utils::error::{ComplianceError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Customer companies and the equipment they own.
pub struct Directory<B: Backend> {
    backend: B,
}

impl<B: Backend> Directory<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    async fn create<T: DeserializeOwned>(
        &self,
        schema: &EntitySchema,
        mut values: Map<String, Value>,
    ) -> Result<T> {
        values.retain(|_, v| !v.is_null());
        schema.validate(&mut values)?;
        let stored = self.backend.insert(schema.table, Value::Object(values)).await?;
        tracing::info!("created {} in {}", schema.entity, schema.table);
        decode_row(stored)
    }

    async fn update<T: DeserializeOwned>(
        &self,
        schema: &EntitySchema,
        id: &str,
        mut patch: Map<String, Value>,
    ) -> Result<T> {
        schema.validate_patch(&mut patch)?;
        let stored = self
            .backend
            .update(schema.table, id, Value::Object(patch))
            .await?;
        tracing::info!("updated {} {}", schema.entity, id);
        decode_row(stored)
    }

    async fn get<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<T> {
        let rows = self
            .backend
            .select(table, &Query::new().eq("id", id).limit(1))
            .await?;
        match rows.into_iter().next() {
            Some(row) => decode_row(row),
            None => Err(ComplianceError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            }),
        }
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        let rows = self
            .backend
            .select("companies", &Query::new().order("name", true))
            .await?;
        decode_rows(rows)
    }

    pub async fn get_company(&self, id: &str) -> Result<Company> {
        self.get("companies", id).await
    }

    pub async fn create_company(&self, values: Map<String, Value>) -> Result<Company> {
        self.create(&EntitySchema::company(), values).await
    }

    pub async fn update_company(&self, id: &str, patch: Map<String, Value>) -> Result<Company> {
        self.update(&EntitySchema::company(), id, patch).await
    }

    pub async fn delete_company(&self, id: &str) -> Result<()> {
        self.backend.delete("companies", id).await?;
        tracing::info!("deleted company {}", id);
        Ok(())
    }

    pub async fn list_equipment(
        &self,
        company_id: Option<&str>,
        kind: Option<EquipmentKind>,
    ) -> Result<Vec<Equipment>> {
        let mut query = Query::new().order("serial_number", true);
        if let Some(company_id) = company_id {
            query = query.eq("company_id", company_id);
        }
        if let Some(kind) = kind {
            query = query.eq("kind", kind);
        }
        decode_rows(self.backend.select("equipment", &query).await?)
    }

    pub async fn get_equipment(&self, id: i64) -> Result<Equipment> {
        self.get("equipment", &id.to_string()).await
    }

    pub async fn create_equipment(&self, values: Map<String, Value>) -> Result<Equipment> {
        self.create(&EntitySchema::equipment(), values).await
    }

    pub async fn update_equipment(&self, id: i64, patch: Map<String, Value>) -> Result<Equipment> {
        self.update(&EntitySchema::equipment(), &id.to_string(), patch)
            .await
    }

    pub async fn delete_equipment(&self, id: i64) -> Result<()> {
        self.backend.delete("equipment", &id.to_string()).await?;
        tracing::info!("deleted equipment {}", id);
        Ok(())
    }
}

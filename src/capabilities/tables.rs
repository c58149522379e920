use crate::capabilities::{Capability, CapabilityResult};
use crate::client::RemoteClient;
use crate::client::tables::RowData;
use crate::error::invalid_params;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct TableIdRequest {
    #[schemars(description = "Numeric id of the table")]
    pub table_id: i64,
}

/// Parameters for nc_tables_read_table
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ReadTableRequest {
    pub table_id: i64,

    #[schemars(description = "Maximum number of rows to return (optional)")]
    pub limit: Option<u32>,

    #[schemars(description = "Number of rows to skip (optional)")]
    pub offset: Option<u32>,
}

/// Parameters for nc_tables_insert_row
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct InsertRowRequest {
    pub table_id: i64,

    #[schemars(description = "Cell values keyed by numeric column id, e.g. {\"12\": \"Milk\"}")]
    pub data: RowData,
}

/// Parameters for nc_tables_update_row
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateRowRequest {
    #[schemars(description = "Numeric id of the row")]
    pub row_id: i64,

    #[schemars(description = "Cell values to change, keyed by numeric column id")]
    pub data: RowData,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct RowIdRequest {
    #[schemars(description = "Numeric id of the row")]
    pub row_id: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListTablesResponse {
    pub tables: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TableSchemaResponse {
    pub schema: Value,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RowsResponse {
    pub rows: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RowResponse {
    pub row: Value,
}

fn validate_row(data: &RowData) -> CapabilityResult<()> {
    if data.is_empty() {
        return Err(invalid_params("data must contain at least one column"));
    }
    if let Some(column) = data.keys().find(|k| k.parse::<u64>().is_err()) {
        return Err(invalid_params(format!(
            "column ids must be numeric, got {column:?}"
        )));
    }
    Ok(())
}

/// Capability for the Tables app
pub struct TablesCapability {
    client: Arc<dyn RemoteClient>,
}

impl TablesCapability {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub async fn list_tables(&self) -> CapabilityResult<ListTablesResponse> {
        let tables = self.client.tables().list_tables().await?;
        Ok(ListTablesResponse { tables })
    }

    pub async fn get_schema(
        &self,
        request: TableIdRequest,
    ) -> CapabilityResult<TableSchemaResponse> {
        let schema = self.client.tables().get_schema(request.table_id).await?;
        Ok(TableSchemaResponse { schema })
    }

    pub async fn read_table(&self, request: ReadTableRequest) -> CapabilityResult<RowsResponse> {
        let rows = self
            .client
            .tables()
            .read_table(request.table_id, request.limit, request.offset)
            .await?;
        Ok(RowsResponse { rows })
    }

    pub async fn insert_row(&self, request: InsertRowRequest) -> CapabilityResult<RowResponse> {
        validate_row(&request.data)?;
        let row = self
            .client
            .tables()
            .insert_row(request.table_id, &request.data)
            .await?;
        Ok(RowResponse { row })
    }

    pub async fn update_row(&self, request: UpdateRowRequest) -> CapabilityResult<RowResponse> {
        validate_row(&request.data)?;
        let row = self
            .client
            .tables()
            .update_row(request.row_id, &request.data)
            .await?;
        Ok(RowResponse { row })
    }

    pub async fn delete_row(&self, request: RowIdRequest) -> CapabilityResult<RowResponse> {
        let row = self.client.tables().delete_row(request.row_id).await?;
        Ok(RowResponse { row })
    }
}

impl Capability for TablesCapability {
    fn id(&self) -> &'static str {
        "tables"
    }

    fn description(&self) -> &'static str {
        "List tables, read their schema and rows, insert, update and delete rows"
    }
}

//! Row helpers shared by the services.

use familyapp_store::{encode, get_as, RowStore, Table};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, ServiceError};
use crate::owner::OwnerId;

/// Encode `draft` and stamp it with the owner.
pub(crate) fn owned_row<T: Serialize>(table: Table, owner: &OwnerId, draft: &T) -> Result<Value> {
    let mut row = encode(table, draft)?;
    if let Some(obj) = row.as_object_mut() {
        obj.insert("owner_id".to_string(), Value::String(owner.as_str().to_string()));
    }
    Ok(row)
}

/// Fetch a row, treating rows of other owners as missing.
pub(crate) async fn fetch_owned<T: DeserializeOwned>(
    store: &dyn RowStore,
    table: Table,
    owner: &OwnerId,
    id: &str,
) -> Result<T> {
    let row: Value = get_as(store, table, id).await?;
    if row.get("owner_id").and_then(Value::as_str) != Some(owner.as_str()) {
        return Err(ServiceError::NotFound {
            table,
            id: id.to_string(),
        });
    }
    Ok(familyapp_store::decode(table, row)?)
}

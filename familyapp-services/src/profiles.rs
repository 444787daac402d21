use std::sync::Arc;

use familyapp_core::time::parse_timezone;
use familyapp_core::Profile;
use familyapp_store::{decode, encode, select_as, Query, RowStore, StoreError, Table};

use crate::error::{Result, ServiceResponse};
use crate::owner::OwnerId;

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn RowStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Insert or replace the profile with `profile.id`.
    pub async fn upsert(&self, profile: Profile) -> ServiceResponse<Profile> {
        ServiceResponse::from_result("profiles.upsert", self.try_upsert(profile).await)
    }

    pub async fn list(&self) -> ServiceResponse<Vec<Profile>> {
        ServiceResponse::from_result("profiles.list", self.all().await)
    }

    pub(crate) async fn all(&self) -> Result<Vec<Profile>> {
        let q = Query::new().order_by("id", true);
        Ok(select_as(self.store.as_ref(), Table::Profiles, &q).await?)
    }

    async fn try_upsert(&self, profile: Profile) -> Result<Profile> {
        let owner = OwnerId::parse(&profile.id)?;
        parse_timezone(&profile.timezone)?;
        let row = encode(Table::Profiles, &profile)?;
        let stored = match self.store.update(Table::Profiles, owner.as_str(), row.clone()).await {
            Ok(v) => v,
            Err(StoreError::NotFound { .. }) => self.store.insert(Table::Profiles, row).await?,
            Err(e) => return Err(e.into()),
        };
        Ok(decode(Table::Profiles, stored)?)
    }
}

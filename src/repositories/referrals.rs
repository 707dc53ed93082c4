use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use super::store::{StoreClient, StoreError};
use crate::models::{
    profiles::Profile,
    referrals::{NewReferralRecord, Referral},
};

const PROFILES_TABLE: &str = "profiles";
const REFERRALS_TABLE: &str = "referrals";

#[derive(Clone)]
pub struct ReferralRepository {
    store: Arc<dyn StoreClient>,
}

impl ReferralRepository {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self { store }
    }

    pub async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>, StoreError> {
        match self
            .store
            .find_one(PROFILES_TABLE, ("id", profile_id))
            .await?
        {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_referral_by_email(
        &self,
        referred_email: &str,
    ) -> Result<Option<Referral>, StoreError> {
        match self
            .store
            .find_one(REFERRALS_TABLE, ("referred_email", referred_email))
            .await?
        {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    pub async fn insert_referral(
        &self,
        record: &NewReferralRecord,
    ) -> Result<Referral, StoreError> {
        let row = self
            .store
            .insert(REFERRALS_TABLE, serde_json::to_value(record)?)
            .await?;

        Ok(serde_json::from_value(row)?)
    }

    pub async fn set_referral_points(
        &self,
        profile_id: &str,
        referral_points: i64,
    ) -> Result<(), StoreError> {
        self.store
            .update(
                PROFILES_TABLE,
                ("id", profile_id),
                json!({
                    "referral_points": referral_points,
                    "updated_at": Utc::now(),
                }),
            )
            .await
    }
}

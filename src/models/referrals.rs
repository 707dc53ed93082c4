use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct NewReferral {
    pub referral_code: Option<String>,
    pub referred_email: Option<String>,
    pub referrer_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referred_email: String,
    pub referrer_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewReferralRecord {
    pub referrer_id: String,
    pub referred_email: String,
    pub referrer_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

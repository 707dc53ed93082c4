use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::oneshot;

use super::{ReferralError, RequestHandler, Service};
use crate::models::{
    profiles::Profile,
    referrals::{NewReferral, NewReferralRecord},
};
use crate::repositories::{referrals::ReferralRepository, store::StoreClient};
use crate::settings;

const REFERRAL_REWARD_POINTS: i64 = 10;

pub enum ReferralServiceRequest {
    NewReferral {
        request: NewReferral,
        response: oneshot::Sender<Result<AdmittedReferral, ReferralError>>,
    },
}

#[derive(Clone, Debug)]
pub struct AdmittedReferral {
    pub referral_id: String,
    pub referrer_name: String,
}

#[derive(Debug)]
struct Submission {
    referral_code: String,
    referred_email: String,
    referrer_name: Option<String>,
}

#[derive(Clone)]
pub struct ReferralRequestHandler {
    repository: ReferralRepository,
    store: settings::Store,
}

impl ReferralRequestHandler {
    pub fn new(store_client: Arc<dyn StoreClient>, store: settings::Store) -> Self {
        let repository = ReferralRepository::new(store_client);

        ReferralRequestHandler { repository, store }
    }

    async fn new_referral(&self, request: NewReferral) -> Result<AdmittedReferral, ReferralError> {
        let submission = validate(request)?;

        if !self.store.is_configured() {
            return Err(ReferralError::Misconfigured);
        }

        let referrer = match self.repository.get_profile(&submission.referral_code).await {
            Ok(Some(profile)) => profile,
            // A failed lookup reads the same as an unknown code.
            Ok(None) | Err(_) => return Err(ReferralError::InvalidReferralCode),
        };

        // Only a row actually found counts as already referred; an errored
        // lookup does not block admission.
        if let Ok(Some(_)) = self
            .repository
            .find_referral_by_email(&submission.referred_email)
            .await
        {
            return Err(ReferralError::DuplicateReferral);
        }

        let referrer_name = submission
            .referrer_name
            .or_else(|| referrer.full_name.clone())
            .unwrap_or_else(|| referrer.email.clone());

        let record = NewReferralRecord {
            referrer_id: referrer.id.clone(),
            referred_email: submission.referred_email,
            referrer_name: referrer_name.clone(),
            status: "pending".to_string(),
            created_at: Utc::now(),
        };
        let referral = self
            .repository
            .insert_referral(&record)
            .await
            .map_err(ReferralError::Persistence)?;

        self.award_points(&referrer, &referral.id);

        Ok(AdmittedReferral {
            referral_id: referral.id,
            referrer_name,
        })
    }

    /// Credits the referrer for a recorded referral without holding up the
    /// response. The task is never awaited; a failed update is logged and
    /// dropped, and the recorded referral stands either way.
    fn award_points(&self, referrer: &Profile, referral_id: &str) {
        let repository = self.repository.clone();
        let referrer_id = referrer.id.clone();
        let referral_id = referral_id.to_string();
        let referral_points = referrer.referral_points + REFERRAL_REWARD_POINTS;

        tokio::spawn(async move {
            log::info!("Awarding points for referral: {}", referral_id);

            match repository
                .set_referral_points(&referrer_id, referral_points)
                .await
            {
                Ok(()) => log::info!("Awarded points to referrer: {}", referrer_id),
                Err(e) => log::error!("Error awarding points to referrer {}: {}", referrer_id, e),
            }
        });
    }
}

fn validate(request: NewReferral) -> Result<Submission, ReferralError> {
    let referral_code = request
        .referral_code
        .filter(|code| !code.is_empty())
        .ok_or(ReferralError::MissingField)?;
    let referred_email = request
        .referred_email
        .filter(|email| !email.is_empty())
        .ok_or(ReferralError::MissingField)?;

    if !is_valid_email(&referred_email) {
        return Err(ReferralError::InvalidEmailFormat);
    }

    Ok(Submission {
        referral_code,
        referred_email,
        referrer_name: request.referrer_name.filter(|name| !name.is_empty()),
    })
}

/// Permissive shape check: one `@`, a non-empty whitespace-free local part,
/// and a domain with an interior dot. Deliberately far from full RFC
/// address validation.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[async_trait]
impl RequestHandler<ReferralServiceRequest> for ReferralRequestHandler {
    async fn handle_request(&self, request: ReferralServiceRequest) {
        match request {
            ReferralServiceRequest::NewReferral { request, response } => {
                let result = self.new_referral(request).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct ReferralService;

impl ReferralService {
    pub fn new() -> Self {
        ReferralService {}
    }
}

#[async_trait]
impl Service<ReferralServiceRequest, ReferralRequestHandler> for ReferralService {}

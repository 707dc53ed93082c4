use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::repositories::store::{RestStore, StoreError};
use crate::settings::Settings;

mod http;
mod referrals;

#[derive(Debug, thiserror::Error)]
enum ReferralError {
    #[error("Missing required fields: referral_code and referred_email")]
    MissingField,
    #[error("Invalid email format")]
    InvalidEmailFormat,
    #[error("Server configuration error")]
    Misconfigured,
    #[error("Invalid referral code")]
    InvalidReferralCode,
    #[error("This email has already been referred")]
    DuplicateReferral,
    #[error("Failed to create referral record")]
    Persistence(#[source] StoreError),
}

impl ReferralError {
    /// Caller errors carry their message to the client; server faults stay
    /// generic on the wire with the detail logged server-side.
    fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ReferralError::MissingField
                | ReferralError::InvalidEmailFormat
                | ReferralError::InvalidReferralCode
                | ReferralError::DuplicateReferral
        )
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(settings: Settings) -> Result<(), anyhow::Error> {
    let (referral_tx, mut referral_rx) = mpsc::channel(512);

    log::info!("Starting referral service.");
    let store = Arc::new(RestStore::new(
        settings.store.url.clone(),
        settings.store.service_key.clone(),
    ));
    let store_settings = settings.store.clone();
    let mut referral_service = referrals::ReferralService::new();
    tokio::spawn(async move {
        referral_service
            .run(
                referrals::ReferralRequestHandler::new(store, store_settings),
                &mut referral_rx,
            )
            .await;
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(settings.server, referral_tx).await
}

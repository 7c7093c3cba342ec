//! Shared application state

use std::time::Duration;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::SesMailer;
use crate::error::BoxError;
use crate::payments::paystack::PaystackClient;
use crate::payments::routing::RoutingRules;
use crate::payments::stripe::StripeClient;
use crate::reconcile::{PgStore, Reconciler};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub reconciler: Reconciler<PgStore, SesMailer>,
    pub routing: RoutingRules,
    /// Paystack signs webhooks with the account secret key
    pub paystack_secret_key: String,
    pub stripe_webhook_secret: String,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database connected, migrations applied");

        // Provider calls share one client; slow providers surface as
        // timeouts instead of hung checkouts.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Ok(region) = std::env::var("SES_REGION") {
            loader = loader.region(aws_config::Region::new(region));
        }
        let aws_cfg = loader.load().await;
        let ses = aws_sdk_sesv2::Client::new(&aws_cfg);
        let mailer = SesMailer::new(ses, config.ses_from_email.clone());

        let routing = RoutingRules::new(&config.local_currency, &config.local_country);
        let reconciler = Reconciler::new(
            PgStore::new(pool.clone()),
            mailer,
            PaystackClient::new(http.clone(), config.paystack_secret_key.clone()),
            StripeClient::new(http, config.stripe_secret_key.clone()),
            routing.clone(),
            config.app_base_url.clone(),
        );

        Ok(Self {
            pool,
            reconciler,
            routing,
            paystack_secret_key: config.paystack_secret_key.clone(),
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
        })
    }
}

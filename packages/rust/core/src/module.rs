//! The enrichment entry point.
//!
//! `ContextualModule` is built once from the host's global configuration and
//! then handles any number of concurrent hook invocations. It holds no
//! per-invocation state.

use contextual_classification::{ClassificationClient, HttpClient, decode};
use contextual_shared::{AccountConfig, ContextualError, GlobalConfig, Result, Site};
use tracing::{debug, info, instrument, warn};

use crate::hook::{ChangeSet, HookResult, ModuleInvocationContext, Mutation, ProcessedAuctionRequestPayload};
use crate::merge::{has_provider_data, merge};

/// Contextual enrichment for the processed-auction stage.
#[derive(Debug)]
pub struct ContextualModule<C = HttpClient> {
    config: GlobalConfig,
    client: C,
}

impl ContextualModule<HttpClient> {
    /// Build the module from the host's optional global configuration blob.
    pub fn build(global_config: Option<&[u8]>) -> Result<Self> {
        let config = GlobalConfig::from_json(global_config)?;
        Self::from_config(config)
    }

    /// Build the module from an already resolved configuration.
    pub fn from_config(config: GlobalConfig) -> Result<Self> {
        let client = HttpClient::new(&config)?;
        info!(endpoint = %config.endpoint, timeout_ms = config.timeout_ms, "contextual module built");
        Ok(Self { config, client })
    }
}

impl<C: ClassificationClient> ContextualModule<C> {
    /// Use `client` instead of the HTTP client.
    pub fn with_client(config: GlobalConfig, client: C) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Enrich the payload's site with the page's classification.
    ///
    /// On success the result holds exactly one mutation replacing
    /// `bidrequest.site`. On any failure no mutation is produced and the
    /// payload is left as it was.
    #[instrument(skip_all)]
    pub async fn handle_processed_auction_hook(
        &self,
        ctx: &ModuleInvocationContext,
        payload: &ProcessedAuctionRequestPayload,
    ) -> Result<HookResult> {
        info!("processed auction hook start");

        let site = self.enrich(ctx, payload).await.inspect_err(|e| {
            warn!(error = %e, "contextual enrichment failed");
        })?;

        let mut change_set = ChangeSet::default();
        change_set.add_mutation(Mutation::update_site(site));

        info!("processed auction hook end");
        Ok(HookResult { change_set })
    }

    /// Resolve the account's silo and build the enriched site.
    async fn enrich(&self, ctx: &ModuleInvocationContext, payload: &ProcessedAuctionRequestPayload) -> Result<Site> {
        let blob = ctx
            .account_config
            .as_deref()
            .ok_or_else(|| ContextualError::config("no account configuration provided"))?;
        let account = AccountConfig::from_json(blob)?;
        info!(silo = %account.silo, "resolved silo");

        self.fetch_contextual(payload, &account.silo).await
    }

    /// Check preconditions, fetch and decode the classification, and merge it.
    async fn fetch_contextual(&self, payload: &ProcessedAuctionRequestPayload, silo: &str) -> Result<Site> {
        let site = payload.bid_request.site.as_ref().ok_or_else(|| {
            ContextualError::precondition("no site object included in request, unable to add contextual data")
        })?;
        if site.page.is_empty() {
            return Err(ContextualError::precondition(
                "site object does not contain a page url, unable to add contextual data",
            ));
        }

        if has_provider_data(site.content.as_ref()) {
            debug!("site already carries contextual data, appending another entry");
        }

        let response = self.client.fetch(silo, &site.page).await?;
        let record = decode(response, &self.config.framing).await?;
        debug!(
            raw = record.raw.is_some(),
            codes = record.codes.is_some(),
            new_codes = record.new_codes.is_some(),
            "classification decoded"
        );

        Ok(merge(&record, site))
    }
}

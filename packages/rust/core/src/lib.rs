//! Contextual enrichment of bid requests.
//!
//! This crate ties the classification client and decoder to the bid request:
//! - [`module`] — the hook entry point ([`ContextualModule`])
//! - [`merge`] — folding a classification record into the site object
//! - [`hook`] — payload, change set and mutation types shared with the host

pub mod hook;
pub mod merge;
pub mod module;

pub use hook::{
    ChangeSet, HookResult, ModuleInvocationContext, Mutation, MutationKind, MutationValue,
    ProcessedAuctionRequestPayload,
};
pub use merge::merge;
pub use module::ContextualModule;

#[cfg(test)]
mod tests {
    use super::*;
    use contextual_shared::{BidRequest, ContextualError, DecodeFailure, Site};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WRAPPED: &str = "aspan.setIAB({\"raw\": {\"text\": [\"Sports>Soccer\", \"Sports>Football\"]}, \"codes\": {\"text\": [\"IAB17\", \"IAB17-44\"]}, \"newcodes\": {\"text\": [\"483\", \"533\"]}})";

    const PAGE: &str = "https://sportsnaut.com/dallas-cowboys-vs-tampa-bay-buccaneers-preview/";

    fn payload() -> ProcessedAuctionRequestPayload {
        ProcessedAuctionRequestPayload {
            bid_request: BidRequest {
                site: Some(Site {
                    page: PAGE.into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    fn global_config(server: &MockServer, framing: &str) -> String {
        format!(
            r#"{{"enabled":true,"endpoint":"{}/{{{{.SILO}}}}/ctx","framing":{framing}}}"#,
            server.uri()
        )
    }

    #[tokio::test]
    async fn enriches_over_http_with_jsonp_framing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/21/ctx"))
            .and(query_param("format", "json"))
            .and(query_param("uri", PAGE))
            .respond_with(ResponseTemplate::new(200).set_body_string(WRAPPED))
            .expect(1)
            .mount(&server)
            .await;

        let config = global_config(&server, r#"{"kind":"jsonp","callback":"aspan.setIAB"}"#);
        let module = ContextualModule::build(Some(config.as_bytes())).unwrap();

        let mut payload = payload();
        let ctx = ModuleInvocationContext::with_account_config(r#"{"silo":"21"}"#);
        let result = module.handle_processed_auction_hook(&ctx, &payload).await.unwrap();
        result.change_set.apply(&mut payload);

        let site = payload.bid_request.site.unwrap();
        assert_eq!(site.name, "arcspan");
        assert_eq!(site.cat, vec!["IAB17", "IAB17-44"]);
        assert_eq!(site.keywords, "Sports>Soccer,Sports>Football");
        let data = &site.content.unwrap().data;
        assert_eq!(data[0].segment.len(), 2);
        assert_eq!(data[0].segment[1].id, "533");
    }

    #[tokio::test]
    async fn wrapped_body_without_framing_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(WRAPPED))
            .mount(&server)
            .await;

        let config = global_config(&server, r#"{"kind":"plain"}"#);
        let module = ContextualModule::build(Some(config.as_bytes())).unwrap();

        let ctx = ModuleInvocationContext::with_account_config(r#"{"silo":"21"}"#);
        let err = module
            .handle_processed_auction_hook(&ctx, &payload())
            .await
            .unwrap_err();
        assert_eq!(err.decode_failure(), Some(DecodeFailure::MalformedBody));
    }

    #[tokio::test]
    async fn server_error_leaves_request_unchanged() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = global_config(&server, r#"{"kind":"plain"}"#);
        let module = ContextualModule::build(Some(config.as_bytes())).unwrap();

        let payload = payload();
        let before = payload.clone();
        let ctx = ModuleInvocationContext::with_account_config(r#"{"silo":"21"}"#);
        let err = module
            .handle_processed_auction_hook(&ctx, &payload)
            .await
            .unwrap_err();

        assert!(matches!(err, ContextualError::Decode { .. }));
        assert_eq!(payload, before);
    }

    #[test]
    fn build_rejects_malformed_global_config() {
        let err = ContextualModule::build(Some(b"{\"endpoint\": 5}".as_slice())).unwrap_err();
        assert!(matches!(err, ContextualError::Config { .. }));
    }

    #[test]
    fn build_without_config_uses_default_endpoint() {
        let module = ContextualModule::build(None).unwrap();
        assert_eq!(module.config().endpoint, contextual_shared::DEFAULT_ENDPOINT);
    }
}

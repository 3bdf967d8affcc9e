//! Host-facing hook types for the processed-auction stage.
//!
//! The host hands the module a [`ProcessedAuctionRequestPayload`] and a
//! [`ModuleInvocationContext`]; the module answers with a [`HookResult`]
//! describing the changes it wants. The module never edits the payload: the
//! host decides whether and when to [`ChangeSet::apply`] the result.

use contextual_shared::{BidRequest, Site};
use serde::Serialize;

/// Payload of the processed-auction stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedAuctionRequestPayload {
    pub bid_request: BidRequest,
}

/// Per-invocation context supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct ModuleInvocationContext {
    /// The account's module configuration blob (JSON), if the host has one.
    pub account_config: Option<Vec<u8>>,
}

impl ModuleInvocationContext {
    /// Context carrying the given account configuration blob.
    pub fn with_account_config(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            account_config: Some(blob.into()),
        }
    }
}

/// What a mutation does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Update,
}

/// Field of the bid request a mutation replaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "target", content = "value", rename_all = "snake_case")]
pub enum MutationValue {
    /// `bidrequest.site`
    Site(Site),
}

impl MutationValue {
    /// Dotted path of the targeted field.
    pub fn key(&self) -> &'static [&'static str] {
        match self {
            Self::Site(_) => &["bidrequest", "site"],
        }
    }
}

/// A declarative, field-level change to the bid request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation {
    pub kind: MutationKind,
    #[serde(flatten)]
    pub value: MutationValue,
}

impl Mutation {
    /// Replace `bidrequest.site` with `site`.
    pub fn update_site(site: Site) -> Self {
        Self {
            kind: MutationKind::Update,
            value: MutationValue::Site(site),
        }
    }

    /// Dotted path of the targeted field.
    pub fn key(&self) -> String {
        self.value.key().join(".")
    }

    /// Apply this mutation to `payload`.
    pub fn apply(self, payload: &mut ProcessedAuctionRequestPayload) {
        match (self.kind, self.value) {
            (MutationKind::Update, MutationValue::Site(site)) => {
                payload.bid_request.site = Some(site);
            }
        }
    }
}

/// Ordered mutations produced by one hook invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    pub fn add_mutation(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Apply every mutation in order.
    pub fn apply(self, payload: &mut ProcessedAuctionRequestPayload) {
        for mutation in self.mutations {
            mutation.apply(payload);
        }
    }
}

/// Result of one hook invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HookResult {
    pub change_set: ChangeSet,
}

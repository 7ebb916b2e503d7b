//! ID type definitions.
//!
//! Upstream records are keyed by opaque object id strings, e.g.
//! "56cf5728784806f72b8b456f".

/// Identifies a user of the aggregation service.
pub type UserId = String;
/// Identifies a single transaction.
pub type TransactionId = String;
/// Identifies a bank account, card or similar.
pub type AccountId = String;
/// Identifies a linked institution credential.
pub type CredentialId = String;
/// Identifies an institution or service in the site catalogue.
pub type SiteId = String;
/// Identifies the organization a site belongs to.
pub type SiteOrganizationId = String;

//! API controller modules, one per resource.

pub mod messages;
pub mod search;
pub mod subscribers;
pub mod subscriptions;
pub mod version;

pub use self::{
    push::{Claims, PushHeader, PushPayload, Urgency},
    search::{InstantAnswer, RelatedTopic, SearchResult},
    subscription::{Keys, Subscription},
};

mod push;
mod search;
mod subscription;

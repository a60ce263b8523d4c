use serde::{Deserialize, Serialize};

/// One entry of the proxied search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub text: String,
    pub url: String,
}

/// DuckDuckGo Instant Answer response. Only the fields the fallback
/// provider consumes; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct InstantAnswer {
    #[serde(default, rename = "AbstractText")]
    pub abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    pub abstract_url: String,
    #[serde(default, rename = "RelatedTopics")]
    pub related_topics: Vec<RelatedTopic>,
}

/// Topic groups come through without `Text` and deserialize to the
/// default, which the mapper skips.
#[derive(Debug, Default, Deserialize)]
pub struct RelatedTopic {
    #[serde(default, rename = "Text")]
    pub text: String,
    #[serde(default, rename = "FirstURL")]
    pub first_url: String,
}

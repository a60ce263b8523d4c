use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use scraper::{Html, Selector};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    error::Error,
    types::{InstantAnswer, SearchResult},
};

const RESULT_LIMIT: usize = 5;
const MIN_SNIPPET_CHARS: usize = 20;
const RELATED_TOPIC_LIMIT: usize = 4;
const TITLE_PREFIX_CHARS: usize = 50;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One upstream search source. Implementations own their HTTP client and
/// request shape; the chain owns ordering, time budgets and degradation.
#[async_trait]
pub trait SearchProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Hard deadline for one query against this provider.
    fn budget(&self) -> Duration;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, Error>;
}

/// Scrapes the DuckDuckGo HTML endpoint with a desktop browser identity.
#[derive(Debug)]
pub struct DuckDuckGoHtml {
    http: Client,
}

impl DuckDuckGoHtml {
    const BUDGET: Duration = Duration::from_secs(10);

    pub fn new() -> Result<DuckDuckGoHtml, Error> {
        let http = Client::builder().timeout(Self::BUDGET).build()?;
        Ok(DuckDuckGoHtml { http })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoHtml {
    fn name(&self) -> &str {
        "duckduckgo-html"
    }

    fn budget(&self) -> Duration {
        Self::BUDGET
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, Error> {
        let url = Url::parse_with_params(
            "https://html.duckduckgo.com/html/",
            &[("q", query)],
        )?;

        let body = self
            .http
            .get(url)
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "ru-RU,ru;q=0.9,en;q=0.8")
            .send()
            .await?
            .text()
            .await?;

        Ok(parse_search_page(&body))
    }
}

/// Extracts result triples from a DuckDuckGo HTML page. Snippets shorter
/// than the minimum are dropped as navigation noise. Runs on the already
/// fetched body, so the parsed DOM never crosses an await point.
pub fn parse_search_page(body: &str) -> Vec<SearchResult> {
    let document = Html::parse_document(body);

    let snippets = select_texts(&document, ".result__snippet");
    let urls = select_texts(&document, ".result__url");
    let titles = select_texts(&document, ".result__a");

    let mut results = Vec::new();
    for (i, text) in snippets.into_iter().take(RESULT_LIMIT).enumerate() {
        if text.chars().count() <= MIN_SNIPPET_CHARS {
            continue;
        }

        results.push(SearchResult {
            title: titles.get(i).cloned().unwrap_or_default(),
            text,
            url: urls.get(i).cloned().unwrap_or_default(),
        });
    }

    results
}

fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let selector = match Selector::parse(selector) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// DuckDuckGo Instant Answer API, the lighter fallback when scraping
/// yields nothing.
#[derive(Debug)]
pub struct DuckDuckGoApi {
    http: Client,
}

impl DuckDuckGoApi {
    const BUDGET: Duration = Duration::from_secs(8);

    pub fn new() -> Result<DuckDuckGoApi, Error> {
        let http = Client::builder().timeout(Self::BUDGET).build()?;
        Ok(DuckDuckGoApi { http })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoApi {
    fn name(&self) -> &str {
        "duckduckgo-api"
    }

    fn budget(&self) -> Duration {
        Self::BUDGET
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, Error> {
        let url = Url::parse_with_params(
            "https://api.duckduckgo.com/",
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )?;

        let answer: InstantAnswer = self
            .http
            .get(url)
            .header(header::USER_AGENT, "Mozilla/5.0")
            .send()
            .await?
            .json()
            .await?;

        Ok(instant_answer_results(answer))
    }
}

pub fn instant_answer_results(answer: InstantAnswer) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if !answer.abstract_text.is_empty() {
        results.push(SearchResult {
            title: String::from("Abstract"),
            text: answer.abstract_text,
            url: answer.abstract_url,
        });
    }

    for topic in answer.related_topics.into_iter().take(RELATED_TOPIC_LIMIT) {
        if topic.text.is_empty() {
            continue;
        }

        results.push(SearchResult {
            title: topic.text.chars().take(TITLE_PREFIX_CHARS).collect(),
            text: topic.text,
            url: topic.first_url,
        });
    }

    results
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub has_results: bool,
}

/// Ordered provider chain. Providers are consulted until one yields
/// results within its budget; an exhausted chain degrades to a canned
/// no-results entry instead of an error.
#[derive(Debug)]
pub struct SearchChain {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl SearchChain {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> SearchChain {
        SearchChain { providers }
    }

    pub fn duckduckgo() -> Result<SearchChain, Error> {
        Ok(SearchChain::new(vec![
            Box::new(DuckDuckGoHtml::new()?),
            Box::new(DuckDuckGoApi::new()?),
        ]))
    }

    pub async fn search(&self, query: &str) -> SearchOutcome {
        for provider in &self.providers {
            match timeout(provider.budget(), provider.search(query)).await {
                Ok(Ok(results)) if !results.is_empty() => {
                    let mut results = results;
                    results.truncate(RESULT_LIMIT);
                    return SearchOutcome {
                        results,
                        has_results: true,
                    };
                },
                Ok(Ok(_)) => {
                    warn!("search provider {} found nothing", provider.name());
                },
                Ok(Err(e)) => {
                    warn!("search provider {} failed: {}", provider.name(), e);
                },
                Err(_) => {
                    warn!(
                        "search provider {} exceeded its {:?} budget",
                        provider.name(),
                        provider.budget()
                    );
                },
            }
        }

        SearchOutcome {
            results: vec![no_results_entry(query)],
            has_results: false,
        }
    }
}

pub fn no_results_entry(query: &str) -> SearchResult {
    SearchResult {
        title: String::from("Результаты не найдены"),
        text: format!(
            "По запросу \"{}\" не найдено точной информации. \
             Попробуйте переформулировать вопрос или спросите что-то другое.",
            query
        ),
        url: String::new(),
    }
}

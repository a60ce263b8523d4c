use crate::{
    configuration::{AppState, State},
    error::Error,
    types::SearchResult,
};
use actix_web::{get, http::header, web, HttpResponse, Result};
use serde::{Deserialize, Serialize};

#[get("/search")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
) -> Result<HttpResponse, Error> {
    let query = match &data.q {
        Some(value) => value.trim(),
        None => "",
    };

    if query.is_empty() {
        return Err(Error::Validation(String::from(
            "Query parameter \"q\" is required",
        )));
    }

    let outcome = state.search.search(query).await;
    let results = outcome
        .results
        .iter()
        .map(|item| item.text.clone())
        .collect();

    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .json(Response {
            query: query.to_owned(),
            results,
            detailed_results: outcome.results,
            has_results: outcome.has_results,
        }))
}

#[derive(Debug, Deserialize)]
pub struct Query {
    q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub query: String,
    pub results: Vec<String>,
    pub detailed_results: Vec<SearchResult>,
    #[serde(rename = "hasResults")]
    pub has_results: bool,
}

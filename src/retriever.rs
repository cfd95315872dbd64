use crate::cache::{self, CacheStore};
use crate::error::{Error, Result};
use crate::intent::{merge, QueryTranslator, SearchFilter};
use crate::provider::{ComplexSearchResponse, ProviderClient, RecipeDetail, RecipeSummary};
use tracing::debug;

/// Orchestrates discovery: translate free text, merge with manual filters,
/// derive ordering, then answer from the cache or the upstream provider.
/// All collaborators are injected at construction; there is no hidden
/// global state.
#[derive(Clone)]
pub struct RecipeRetriever {
    translator: QueryTranslator,
    provider: ProviderClient,
    cache: CacheStore,
}

impl RecipeRetriever {
    pub fn new(translator: QueryTranslator, provider: ProviderClient, cache: CacheStore) -> Self {
        Self {
            translator,
            provider,
            cache,
        }
    }

    /// Search the provider with merged intent, bounded by `limit`. A
    /// provider answer with no matches is an empty list, not an error.
    pub async fn search(
        &self,
        raw_query: Option<&str>,
        manual: SearchFilter,
        limit: u32,
    ) -> Result<Vec<RecipeSummary>> {
        let ai_filter = match raw_query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(text) => self.translator.translate(text).await,
            None => SearchFilter::default(),
        };

        let merged = merge(ai_filter, manual);
        let sort = merged.sort();
        let query_string = merged.to_query_string();
        debug!("Merged filter: {} (sort={})", query_string, sort.as_str());

        let key = cache::search_key(&query_string, limit);
        let payload = self
            .cache
            .get_or_compute(&key, || {
                self.provider.complex_search(&query_string, sort, limit)
            })
            .await?;

        let response: ComplexSearchResponse = serde_json::from_str(&payload)
            .map_err(|e| Error::Provider(format!("unexpected search payload: {e}")))?;

        Ok(response.results)
    }

    /// Fetch the full record for one recipe, through the cache.
    pub async fn get_details(&self, recipe_id: i64) -> Result<RecipeDetail> {
        let key = cache::detail_key(recipe_id);
        let payload = self
            .cache
            .get_or_compute(&key, || self.provider.recipe_information(recipe_id))
            .await?;

        serde_json::from_str(&payload)
            .map_err(|e| Error::Provider(format!("unexpected detail payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::config::ProviderConfig;
    use crate::llm::LlmClient;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct UnusedLlm;

    #[async_trait]
    impl LlmClient for UnusedLlm {
        async fn chat_json(&self, _system: &str, _user: &str) -> Result<serde_json::Value> {
            Err(Error::Llm("translation should not run".to_string()))
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::Llm("embedding should not run".to_string()))
        }
    }

    fn retriever_for(server_url: String) -> RecipeRetriever {
        let provider = ProviderClient::new(&ProviderConfig {
            api_key: "test-key".to_string(),
            base_url: server_url,
            timeout_seconds: 5,
            default_results: 6,
            max_results: 25,
        })
        .unwrap();
        let cache = CacheStore::new(Arc::new(MemoryStore::new()), 3600);
        RecipeRetriever::new(QueryTranslator::new(Arc::new(UnusedLlm)), provider, cache)
    }

    #[tokio::test]
    async fn test_search_without_raw_query_skips_translation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/recipes/complexSearch")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[{"id":5,"title":"Tacos"}],"totalResults":1}"#)
            .create_async()
            .await;

        let retriever = retriever_for(server.url());
        let manual = SearchFilter {
            cuisine: Some("mexican".to_string()),
            ..SearchFilter::default()
        };

        // UnusedLlm would error if translation ran
        let results = retriever.search(None, manual, 6).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Tacos");
    }

    #[tokio::test]
    async fn test_repeat_search_is_served_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/recipes/complexSearch")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[],"totalResults":0}"#)
            .expect(1)
            .create_async()
            .await;

        let retriever = retriever_for(server.url());
        let manual = SearchFilter::from_query("soup");

        let first = retriever.search(None, manual.clone(), 6).await.unwrap();
        let second = retriever.search(None, manual, 6).await.unwrap();

        assert!(first.is_empty());
        assert!(second.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_details_parse_cached_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/recipes/42/information")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":42,"title":"Shakshuka","readyInMinutes":30}"#)
            .expect(1)
            .create_async()
            .await;

        let retriever = retriever_for(server.url());
        let first = retriever.get_details(42).await.unwrap();
        let second = retriever.get_details(42).await.unwrap();

        assert_eq!(first.title, "Shakshuka");
        assert_eq!(second.ready_in_minutes, Some(30));
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/recipes/complexSearch")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let retriever = retriever_for(server.url());
        let result = retriever.search(None, SearchFilter::from_query("soup"), 6).await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }
}

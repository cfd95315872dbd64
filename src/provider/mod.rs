pub mod models;

pub use models::{ComplexSearchResponse, Ingredient, RecipeDetail, RecipeSummary};

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::intent::Sort;
use reqwest::{Client, StatusCode};
use tracing::{debug, error};

/// HTTP client for the upstream recipe provider. Payloads are returned as
/// raw JSON text so the cache layer can store them unchanged.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ProviderClient {
    /// Build a client. The credential is mandatory here so a missing key
    /// fails at startup rather than on the first request.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config(
                "recipe provider API key is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Run a complexSearch with an already-canonical filter query string,
    /// bounded by `number` results and ordered by the derived sort.
    pub async fn complex_search(
        &self,
        filter_query: &str,
        sort: Sort,
        number: u32,
    ) -> Result<String> {
        let mut url = format!(
            "{}/recipes/complexSearch?apiKey={}&number={number}&fillIngredients=true&sort={}",
            self.base_url,
            self.api_key,
            sort.as_str(),
        );
        if !filter_query.is_empty() {
            url.push('&');
            url.push_str(filter_query);
        }

        self.fetch(&url).await
    }

    /// Fetch the full record for one recipe, nutrition included.
    pub async fn recipe_information(&self, recipe_id: i64) -> Result<String> {
        let url = format!(
            "{}/recipes/{recipe_id}/information?apiKey={}&includeNutrition=true&addWinePairing=false&addTasteData=false",
            self.base_url, self.api_key,
        );

        self.fetch(&url).await
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        debug!("Provider request: GET {}", redact_key(url));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            error!("Provider error: HTTP {}", status);
            return Err(match status {
                StatusCode::NOT_FOUND => Error::NotFound("Recipe not found".to_string()),
                StatusCode::PAYMENT_REQUIRED | StatusCode::TOO_MANY_REQUESTS => {
                    Error::Provider("provider quota exhausted".to_string())
                }
                StatusCode::UNAUTHORIZED => {
                    Error::Provider("provider rejected credential".to_string())
                }
                _ => Error::Provider(format!("HTTP {status}")),
            });
        }

        response
            .text()
            .await
            .map_err(|e| Error::Provider(format!("failed to read response: {e}")))
    }
}

/// Strip the apiKey query value before the URL reaches a log line.
fn redact_key(url: &str) -> String {
    match url.split_once("apiKey=") {
        Some((before, after)) => {
            let rest = after.split_once('&').map(|(_, r)| r).unwrap_or("");
            if rest.is_empty() {
                format!("{before}apiKey=***")
            } else {
                format!("{before}apiKey=***&{rest}")
            }
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use mockito::Matcher;

    fn test_config(base_url: String) -> ProviderConfig {
        ProviderConfig {
            api_key: "test-key".to_string(),
            base_url,
            timeout_seconds: 5,
            default_results: 6,
            max_results: 25,
        }
    }

    #[test]
    fn test_missing_credential_fails_at_construction() {
        let mut config = test_config("https://example.com".to_string());
        config.api_key = String::new();
        assert!(ProviderClient::new(&config).is_err());
    }

    #[test]
    fn test_redact_key_hides_credential() {
        let url = "https://x/recipes/complexSearch?apiKey=secret&number=6";
        let redacted = redact_key(url);
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("number=6"));
    }

    #[tokio::test]
    async fn test_complex_search_passes_sort_and_bound() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/recipes/complexSearch")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("apiKey".into(), "test-key".into()),
                Matcher::UrlEncoded("number".into(), "6".into()),
                Matcher::UrlEncoded("sort".into(), "max-used-ingredients".into()),
                Matcher::UrlEncoded("fillIngredients".into(), "true".into()),
                Matcher::UrlEncoded("includeIngredients".into(), "egg,cheese".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[{"id":1,"title":"Omelette"}],"totalResults":1}"#)
            .create_async()
            .await;

        let client = ProviderClient::new(&test_config(server.url())).unwrap();
        let payload = client
            .complex_search(
                "includeIngredients=egg%2Ccheese",
                Sort::MaxUsedIngredients,
                6,
            )
            .await
            .unwrap();

        let parsed: ComplexSearchResponse = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed.results.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_recipe_information_requests_nutrition() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/recipes/42/information")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("includeNutrition".into(), "true".into()),
                Matcher::UrlEncoded("addWinePairing".into(), "false".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":42,"title":"Shakshuka"}"#)
            .create_async()
            .await;

        let client = ProviderClient::new(&test_config(server.url())).unwrap();
        let payload = client.recipe_information(42).await.unwrap();

        let parsed: RecipeDetail = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed.id, 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_surfaces_as_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex("/recipes/.*".into()))
            .with_status(500)
            .create_async()
            .await;

        let client = ProviderClient::new(&test_config(server.url())).unwrap();
        let result = client.recipe_information(42).await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[tokio::test]
    async fn test_missing_recipe_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex("/recipes/.*".into()))
            .with_status(404)
            .create_async()
            .await;

        let client = ProviderClient::new(&test_config(server.url())).unwrap();
        let result = client.recipe_information(999).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}

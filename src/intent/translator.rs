use crate::intent::SearchFilter;
use crate::llm::LlmClient;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed instruction for the translation completion. Enumerates the full
/// recognized key set and the closed value lists, and forbids prose so the
/// response parses as a bare JSON object.
const SYSTEM_INSTRUCTION: &str = r#"You translate a cooking request into recipe search filters.

Respond with a single JSON object and nothing else. Use only these keys, omitting any key that is not clearly implied by the request:

- "query": free-text dish description (string)
- "includeIngredients": ingredients that must be used (array of strings)
- "excludeIngredients": ingredients to avoid (array of strings)
- "cuisine": one of african, asian, american, british, cajun, caribbean, chinese, eastern european, european, french, german, greek, indian, irish, italian, japanese, jewish, korean, latin american, mediterranean, mexican, middle eastern, nordic, southern, spanish, thai, vietnamese
- "type": one of main course, side dish, dessert, appetizer, salad, bread, breakfast, soup, beverage, sauce, marinade, fingerfood, snack, drink
- "diet": array drawn from gluten free, ketogenic, vegetarian, lacto-vegetarian, ovo-vegetarian, vegan, pescetarian, paleo, primal, low fodmap, whole30
- "intolerances": array drawn from dairy, egg, gluten, grain, peanut, seafood, sesame, shellfish, soy, sulfite, tree nut, wheat
- "maxReadyTime": maximum total minutes (number)
- "minCalories": minimum calories per serving (number)
- "maxCalories": maximum calories per serving (number)

Do not invent keys. Do not wrap the object in prose or code fences."#;

/// Turns free-text intent into a structured filter via the language model.
/// Never fails: any model error, parse failure or empty result degrades to
/// a filter carrying the raw text as `query`.
#[derive(Clone)]
pub struct QueryTranslator {
    llm: Arc<dyn LlmClient>,
}

impl QueryTranslator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn translate(&self, free_text: &str) -> SearchFilter {
        let value = match self.llm.chat_json(SYSTEM_INSTRUCTION, free_text).await {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Query translation failed, falling back to raw query: {}",
                    e.log_safe()
                );
                return SearchFilter::from_query(free_text);
            }
        };

        // Unrecognized keys are dropped here: only the closed field set
        // deserializes. Values inside recognized keys are forwarded
        // unvalidated; the provider is the final authority on them.
        let filter: SearchFilter = match serde_json::from_value(value) {
            Ok(filter) => filter,
            Err(e) => {
                warn!(
                    "Translator output did not parse as a filter, falling back: {}",
                    e
                );
                return SearchFilter::from_query(free_text);
            }
        };

        if filter.is_empty() {
            debug!("Translator produced an empty filter, falling back to raw query");
            return SearchFilter::from_query(free_text);
        }

        debug!("Translated '{}' -> {:?}", free_text, filter);
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;

    struct CannedLlm {
        response: Result<serde_json::Value>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn chat_json(&self, _system: &str, _user: &str) -> Result<serde_json::Value> {
            match &self.response {
                Ok(value) => Ok(value.clone()),
                Err(_) => Err(Error::Llm("model unavailable".to_string())),
            }
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::Llm("not under test".to_string()))
        }
    }

    #[tokio::test]
    async fn test_translates_structured_output() {
        let translator = QueryTranslator::new(Arc::new(CannedLlm {
            response: Ok(serde_json::json!({
                "cuisine": "thai",
                "includeIngredients": ["tofu"],
                "maxReadyTime": 30
            })),
        }));

        let filter = translator.translate("quick thai tofu dish").await;
        assert_eq!(filter.cuisine.as_deref(), Some("thai"));
        assert_eq!(filter.include_ingredients, vec!["tofu"]);
        assert_eq!(filter.max_ready_time, Some(30));
    }

    #[tokio::test]
    async fn test_falls_back_when_model_fails() {
        let translator = QueryTranslator::new(Arc::new(CannedLlm {
            response: Err(Error::Llm("down".to_string())),
        }));

        let filter = translator.translate("spicy tofu stir fry").await;
        assert_eq!(filter, SearchFilter::from_query("spicy tofu stir fry"));
    }

    #[tokio::test]
    async fn test_falls_back_when_output_is_not_a_filter() {
        let translator = QueryTranslator::new(Arc::new(CannedLlm {
            response: Ok(serde_json::json!(["not", "an", "object"])),
        }));

        let filter = translator.translate("soup").await;
        assert_eq!(filter, SearchFilter::from_query("soup"));
    }

    #[tokio::test]
    async fn test_falls_back_when_output_is_empty() {
        let translator = QueryTranslator::new(Arc::new(CannedLlm {
            response: Ok(serde_json::json!({"irrelevantKey": "value"})),
        }));

        let filter = translator.translate("something tasty").await;
        assert_eq!(filter, SearchFilter::from_query("something tasty"));
    }
}

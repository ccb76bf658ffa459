/// Completion API client for strategy generation
///
/// Calls a chat-completions endpoint and parses the returned JSON document
/// into a [`GeneratedStrategy`]. The call blocks the requesting handler and
/// is not retried; an upstream failure surfaces as [`AiError`] and maps to
/// a generic 502 at the edge.

use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

/// Error type for completion API operations
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// No API key configured
    #[error("Completion API is not configured")]
    NotConfigured,

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-success status
    #[error("Completion API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The API answered with something that isn't a strategy document
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),
}

/// Input describing the client a strategy is generated for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRequest {
    /// Client name
    pub client_name: String,

    /// Industry vertical
    pub industry: String,

    /// Stated goals
    pub goals: Vec<String>,

    /// Current challenges
    pub current_challenges: Vec<String>,

    /// Available budget in cents, if known
    pub budget_cents: Option<i64>,

    /// Target audience description, if known
    pub target_audience: Option<String>,
}

/// One tactic block of a generated strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyTactic {
    pub category: String,
    pub actions: Vec<String>,
    pub timeline: String,
    pub budget_allocation: String,
}

/// A generated marketing strategy document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedStrategy {
    pub title: String,
    pub executive_summary: String,
    pub objectives: Vec<String>,
    pub tactics: Vec<StrategyTactic>,
    pub metrics: Vec<String>,
    pub timeline: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Completion API client
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl CompletionClient {
    /// Creates a client from AI configuration
    pub fn new(http: reqwest::Client, config: &AiConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            model: config.model.clone(),
        }
    }

    fn build_prompt(request: &StrategyRequest) -> String {
        let mut prompt = format!(
            "Create a comprehensive digital marketing strategy for the following client:\n\n\
             Client: {}\n\
             Industry: {}\n\
             Goals: {}\n\
             Current Challenges: {}\n",
            request.client_name,
            request.industry,
            request.goals.join(", "),
            request.current_challenges.join(", "),
        );

        if let Some(budget_cents) = request.budget_cents {
            prompt.push_str(&format!("Budget: {:.2}\n", budget_cents as f64 / 100.0));
        }
        if let Some(audience) = &request.target_audience {
            prompt.push_str(&format!("Target Audience: {}\n", audience));
        }

        prompt.push_str(
            "\nProvide a detailed strategy as a JSON object with the keys: \
             title, executive_summary, objectives (array), tactics (array of \
             {category, actions, timeline, budget_allocation}), metrics (array), \
             timeline. Focus on practical, actionable steps for the client's \
             industry.",
        );

        prompt
    }

    /// Generates a marketing strategy for a client
    ///
    /// # Errors
    ///
    /// Returns `AiError::NotConfigured` without an API key, `AiError::Api`
    /// on an upstream failure status, and `AiError::InvalidResponse` when
    /// the content cannot be parsed as a strategy document.
    pub async fn generate_strategy(
        &self,
        request: &StrategyRequest,
    ) -> Result<GeneratedStrategy, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert digital marketing strategist. \
                                Provide comprehensive, actionable marketing strategies \
                                as JSON documents."
                },
                {
                    "role": "user",
                    "content": Self::build_prompt(request)
                }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AiError::InvalidResponse("No choices returned".to_string()))?;

        serde_json::from_str::<GeneratedStrategy>(content)
            .map_err(|e| AiError::InvalidResponse(format!("Malformed strategy document: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StrategyRequest {
        StrategyRequest {
            client_name: "Bistro Central".to_string(),
            industry: "Food & Beverage".to_string(),
            goals: vec!["More reservations".to_string()],
            current_challenges: vec!["Low social reach".to_string()],
            budget_cents: Some(250_000),
            target_audience: Some("Young professionals".to_string()),
        }
    }

    #[test]
    fn test_build_prompt_includes_fields() {
        let prompt = CompletionClient::build_prompt(&request());

        assert!(prompt.contains("Bistro Central"));
        assert!(prompt.contains("Food & Beverage"));
        assert!(prompt.contains("More reservations"));
        assert!(prompt.contains("Budget: 2500.00"));
        assert!(prompt.contains("Young professionals"));
    }

    #[test]
    fn test_build_prompt_optional_fields_absent() {
        let mut req = request();
        req.budget_cents = None;
        req.target_audience = None;

        let prompt = CompletionClient::build_prompt(&req);
        assert!(!prompt.contains("Budget:"));
        assert!(!prompt.contains("Target Audience:"));
    }

    #[test]
    fn test_generated_strategy_parsing() {
        let content = r#"{
            "title": "Growth Plan",
            "executive_summary": "Summary",
            "objectives": ["Obj 1"],
            "tactics": [{
                "category": "Content Marketing",
                "actions": ["Post weekly"],
                "timeline": "Q1",
                "budget_allocation": "30%"
            }],
            "metrics": ["Reservations"],
            "timeline": "6 months"
        }"#;

        let strategy: GeneratedStrategy = serde_json::from_str(content).unwrap();
        assert_eq!(strategy.title, "Growth Plan");
        assert_eq!(strategy.tactics.len(), 1);
        assert_eq!(strategy.tactics[0].category, "Content Marketing");
    }
}

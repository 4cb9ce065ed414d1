use dotenv::dotenv;
use meal_plan_engine::api_connection::{
    connection::ApiConnectionError,
    endpoints::{ChatCompletionRequest, ChatMessage, ResponseFormat, OPENROUTER_MODELS},
    LlmProvider, RetryPolicy, Retryable,
};
use meal_plan_engine::meal_ideas::{LlmMealIdeaGenerator, MealIdeaSource};
use meal_plan_engine::models::{MealSlot, PlanRequest};
use meal_plan_engine::schema::validate_draft;
use std::env;

const TEST_API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

// Helper to select a model that is known to be Cerebras-powered from OPENROUTER_MODELS
fn get_cerebras_test_model() -> String {
    OPENROUTER_MODELS
        .iter()
        .find(|m| m.model_source == "cerebras")
        .map(|m| m.model_name.to_string())
        .expect("No Cerebras model found in OPENROUTER_MODELS for testing")
}

fn setup_test_environment() {
    dotenv().ok();
}

fn simple_request(content: &str, response_format: Option<ResponseFormat>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: get_cerebras_test_model(),
        messages: vec![ChatMessage::user(content)],
        response_format,
        temperature: None,
        max_tokens: Some(300),
    }
}

#[tokio::test]
async fn test_missing_api_key_error() {
    setup_test_environment();
    let provider = LlmProvider::openrouter("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ");
    let client = reqwest::Client::new();
    let result = provider.call_chat_completion(&client, &simple_request("Hello", None)).await;
    assert!(matches!(result, Err(ApiConnectionError::MissingApiKey(_))));
    if let Err(ApiConnectionError::MissingApiKey(key_name)) = result {
        assert_eq!(key_name, "THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ");
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_retryable_network_error() {
    env::set_var("MEAL_ENGINE_TEST_DUMMY_KEY", "dummy");
    let provider = LlmProvider::openrouter_with_endpoint("MEAL_ENGINE_TEST_DUMMY_KEY", "http://127.0.0.1:1/chat");
    let client = reqwest::Client::new();
    let result = provider.call_chat_completion(&client, &simple_request("Hello", None)).await;
    match result {
        Err(e @ ApiConnectionError::Network(_)) => assert!(e.is_retryable()),
        other => panic!("expected a network error, got {:?}", other.map(|r| r.id)),
    }
}

#[tokio::test]
#[ignore]
async fn test_successful_json_call() {
    setup_test_environment();
    if env::var(TEST_API_KEY_ENV_VAR).is_err() {
        println!("Skipping test_successful_json_call: {} not set.", TEST_API_KEY_ENV_VAR);
        return;
    }

    let provider = LlmProvider::openrouter(TEST_API_KEY_ENV_VAR);
    let client = reqwest::Client::new();
    let request = ChatCompletionRequest {
        messages: vec![
            ChatMessage::system("Reply with a JSON object with keys \"food\" and \"kcal\". /no_thinking"),
            ChatMessage::user("How many kcal are in 100 g of cooked white rice?"),
        ],
        ..simple_request("", Some(ResponseFormat::json_object()))
    };

    let response = provider.call_chat_completion(&client, &request).await.unwrap();
    let content = response.first_content().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(parsed.get("kcal").is_some());
}

#[tokio::test]
#[ignore]
async fn test_api_error_with_invalid_key() {
    setup_test_environment();

    const INVALID_KEY_ENV_NAME_FOR_THIS_TEST: &str = "ENV_VAR_WITH_BAD_KEY_VALUE";
    env::set_var(INVALID_KEY_ENV_NAME_FOR_THIS_TEST, "this_is_an_invalid_api_key_string_for_testing");

    let provider = LlmProvider::openrouter(INVALID_KEY_ENV_NAME_FOR_THIS_TEST);
    let client = reqwest::Client::new();
    let result = provider
        .call_chat_completion(&client, &simple_request("This call should fail due to invalid key.", None))
        .await;
    match result {
        Err(e @ ApiConnectionError::Api { .. }) => {
            assert!(!e.is_retryable());
            if let ApiConnectionError::Api { status, .. } = e {
                assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);
            }
        }
        other => panic!("expected an API error, got {:?}", other.map(|r| r.id)),
    }

    env::remove_var(INVALID_KEY_ENV_NAME_FOR_THIS_TEST);
}

#[tokio::test]
#[ignore]
async fn test_live_meal_idea_generation() {
    setup_test_environment();
    if env::var(TEST_API_KEY_ENV_VAR).is_err() {
        println!("Skipping test_live_meal_idea_generation: {} not set.", TEST_API_KEY_ENV_VAR);
        return;
    }

    let generator = LlmMealIdeaGenerator::new(LlmProvider::openrouter(TEST_API_KEY_ENV_VAR), RetryPolicy::default());
    let request = PlanRequest {
        days: 2,
        slots: vec![MealSlot::Breakfast, MealSlot::Dinner],
        ..PlanRequest::default()
    };
    let draft = generator.generate(&request).await.unwrap();
    assert!(validate_draft(&draft).is_ok());
    assert_eq!(draft.days.len(), 2);
}

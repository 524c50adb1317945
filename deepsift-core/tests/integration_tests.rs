//! Integration tests for deepsift-core infrastructure

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use deepsift_core::{
    config_error, generation_error, process_concurrently, retrieval_error, retry_async,
    validation_error, with_timeout, DeepsiftConfig, DeepsiftError, ErrorContext, Reflection,
    RetryConfig,
};

#[tokio::test]
async fn test_error_handling() {
    let error = retrieval_error!("Upstream returned 503", "web_search");

    match &error {
        DeepsiftError::Retrieval {
            source_name,
            message,
            context,
            ..
        } => {
            assert_eq!(source_name, "web_search");
            assert_eq!(message, "Upstream returned 503");
            assert_eq!(context.component, "retrieval");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected Retrieval error"),
    }
    assert!(error.is_retrieval());

    // Should not panic
    error.log();

    let network_error = DeepsiftError::Network {
        message: "Connection failed".to_string(),
        source: None,
        context: ErrorContext::new("test"),
    };
    assert!(network_error.is_recoverable());
    assert!(network_error.retry_delay_ms().is_some());

    let config_error = config_error!("Invalid config", "test");
    assert!(!config_error.is_recoverable());
    assert!(config_error.retry_delay_ms().is_none());
}

#[tokio::test]
async fn test_into_retrieval_keeps_source_name() {
    let timeout = DeepsiftError::Timeout {
        operation: "arxiv.search".to_string(),
        duration_ms: 30000,
        context: ErrorContext::new("async_utils"),
    };

    let wrapped = timeout.into_retrieval("arxiv");
    match wrapped {
        DeepsiftError::Retrieval {
            source_name,
            message,
            ..
        } => {
            assert_eq!(source_name, "arxiv");
            assert!(message.contains("arxiv.search"));
        }
        other => panic!("Expected Retrieval error, got {}", other),
    }

    let original = retrieval_error!("no results", "web_search");
    match original.into_retrieval("semantic") {
        DeepsiftError::Retrieval { source_name, .. } => assert_eq!(source_name, "web_search"),
        other => panic!("Expected Retrieval error, got {}", other),
    }
}

#[tokio::test]
async fn test_retry_mechanism() {
    let attempt_count = Arc::new(AtomicUsize::new(0));

    let operation = {
        let attempt_count = Arc::clone(&attempt_count);
        move || {
            let count = attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if count < 3 {
                    Err(generation_error!("Temporary failure", "test"))
                } else {
                    Ok("Success")
                }
            }
        }
    };

    let config = RetryConfig {
        max_attempts: 5,
        initial_delay_ms: 10,
        max_delay_ms: 100,
        backoff_multiplier: 2.0,
        jitter: false,
    };

    let result = retry_async(operation, &config, "test_operation").await;
    assert_eq!(result.unwrap(), "Success");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_timeout_mechanism() {
    let quick_operation = async {
        sleep(Duration::from_millis(10)).await;
        "Success"
    };

    let result = with_timeout(quick_operation, 1000, "quick_test").await;
    assert_eq!(result.unwrap(), "Success");

    let slow_operation = async {
        sleep(Duration::from_millis(200)).await;
        "Should not reach here"
    };

    match with_timeout(slow_operation, 50, "slow_test").await {
        Err(DeepsiftError::Timeout {
            operation,
            duration_ms,
            ..
        }) => {
            assert_eq!(operation, "slow_test");
            assert_eq!(duration_ms, 50);
        }
        _ => panic!("Expected Timeout error"),
    }
}

#[tokio::test]
async fn test_config_validation() {
    let mut config = DeepsiftConfig::default();
    assert!(config.validate().is_ok());

    config.embedding.dimension = 0;
    match config.validate().unwrap_err() {
        DeepsiftError::Config { message, .. } => {
            assert!(message.contains("dimension"));
        }
        _ => panic!("Expected Config error"),
    }
}

#[tokio::test]
async fn test_error_macros() {
    let validation_err = validation_error!("Invalid field value", "max_results", "tools");
    match validation_err {
        DeepsiftError::Validation {
            message,
            field,
            context,
        } => {
            assert_eq!(message, "Invalid field value");
            assert_eq!(field, Some("max_results".to_string()));
            assert_eq!(context.component, "tools");
            assert!(!context.recovery_suggestions.is_empty());
        }
        _ => panic!("Expected Validation error"),
    }

    let generation_err = generation_error!("Malformed payload", "llm_generator");
    assert!(generation_err.is_generation());
    assert!(generation_err.to_string().contains("Malformed payload"));
}

#[tokio::test]
async fn test_concurrent_processing() {
    let items: Vec<i32> = (1..=10).collect();

    let results = process_concurrently(items, 3, |item: i32| async move {
        sleep(Duration::from_millis(10)).await;
        Ok::<i32, DeepsiftError>(item * 2)
    })
    .await;

    assert_eq!(results.len(), 10);
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), (i as i32 + 1) * 2);
    }
}

#[test]
fn test_reflection_termination() {
    assert!(Reflection::complete().should_terminate());
    assert!(Reflection::continue_with(Vec::new()).should_terminate());
    assert!(!Reflection::continue_with(vec!["What is Q-learning?".to_string()]).should_terminate());

    let parsed: Reflection = serde_json::from_str(r#"{"sub_queries": ["a"]}"#).unwrap();
    assert!(!parsed.complete);
    assert_eq!(parsed.sub_queries, vec!["a".to_string()]);
}

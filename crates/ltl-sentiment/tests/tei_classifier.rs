//! Integration tests for `TeiClassifier` using wiremock HTTP mocks.

use ltl_sentiment::{EmotionModel, SentimentError, TeiClassifier};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn classifier_info() -> serde_json::Value {
    serde_json::json!({
        "model_id": "SamLowe/roberta-base-go_emotions",
        "model_dtype": "float32",
        "model_type": {
            "classifier": {
                "id2label": { "0": "admiration", "1": "amusement", "17": "joy", "27": "neutral" },
                "label2id": { "admiration": 0, "amusement": 1, "joy": 17, "neutral": 27 }
            }
        },
        "max_input_length": 512
    })
}

async fn mount_info(server: &MockServer, body: serde_json::Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn inputs(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| (*t).to_string()).collect()
}

#[tokio::test]
async fn classify_returns_scores_per_input() {
    let server = MockServer::start().await;
    mount_info(&server, classifier_info(), 1).await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_json(serde_json::json!({
            "inputs": [["Query: poles. Post: love them"], ["Query: poles. Post: meh"]],
            "truncate": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            [{ "score": 0.91, "label": "joy" }, { "score": 0.05, "label": "neutral" }],
            [{ "score": 0.88, "label": "neutral" }, { "score": 0.02, "label": "joy" }]
        ])))
        .mount(&server)
        .await;

    let classifier = TeiClassifier::new(&server.uri(), 30, None).unwrap();
    let scores = classifier
        .classify(&inputs(&[
            "Query: poles. Post: love them",
            "Query: poles. Post: meh",
        ]))
        .await
        .expect("classify");

    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0][0].label, "joy");
    assert_eq!(scores[1][0].label, "neutral");
}

#[tokio::test]
async fn model_info_is_fetched_once_and_ordered_by_id() {
    let server = MockServer::start().await;
    mount_info(&server, classifier_info(), 1).await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([[{ "score": 1.0, "label": "joy" }]])),
        )
        .expect(3)
        .mount(&server)
        .await;

    let classifier = TeiClassifier::new(&server.uri(), 30, None).unwrap();
    for _ in 0..3 {
        classifier.classify(&inputs(&["x"])).await.unwrap();
    }

    let info = classifier.info().await.unwrap();
    assert_eq!(info.model_id, "SamLowe/roberta-base-go_emotions");
    assert_eq!(info.labels, vec!["admiration", "amusement", "joy", "neutral"]);
}

#[tokio::test]
async fn embedding_model_is_rejected() {
    let server = MockServer::start().await;
    mount_info(
        &server,
        serde_json::json!({
            "model_id": "BAAI/bge-small-en-v1.5",
            "model_type": { "embedding": { "pooling": "cls" } }
        }),
        1,
    )
    .await;

    let classifier = TeiClassifier::new(&server.uri(), 30, None).unwrap();
    let err = classifier.classify(&inputs(&["x"])).await.unwrap_err();
    assert!(
        matches!(err, SentimentError::Classifier(ref msg) if msg.contains("not a sequence classifier")),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn prediction_count_mismatch_is_error() {
    let server = MockServer::start().await;
    mount_info(&server, classifier_info(), 1).await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([[{ "score": 1.0, "label": "joy" }]])),
        )
        .mount(&server)
        .await;

    let classifier = TeiClassifier::new(&server.uri(), 30, None).unwrap();
    let err = classifier
        .classify(&inputs(&["a", "b"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SentimentError::Classifier(ref msg) if msg.contains("1 predictions for 2")));
}

#[tokio::test]
async fn server_error_is_classifier_error() {
    let server = MockServer::start().await;
    mount_info(&server, classifier_info(), 1).await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let classifier = TeiClassifier::new(&server.uri(), 30, None).unwrap();
    let err = classifier.classify(&inputs(&["a"])).await.unwrap_err();
    assert!(matches!(err, SentimentError::Classifier(_)));
}

#[tokio::test]
async fn api_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/info"))
        .and(header("authorization", "Bearer hf_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(classifier_info()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(header("authorization", "Bearer hf_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([[{ "score": 1.0, "label": "joy" }]])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let classifier = TeiClassifier::new(&server.uri(), 30, Some("hf_token".to_string())).unwrap();
    classifier.classify(&inputs(&["a"])).await.unwrap();
}

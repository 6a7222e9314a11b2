mod common;

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    harness, temp_database, temp_vector_store, FailingEmbedder, ScriptedModel, TestHarness,
};
use deskmate::bot::commands::{
    ALREADY_VOTED_TEXT, ASK_USAGE_TEXT, MAX_MESSAGE_LEN, VOTE_EXPIRED_TEXT, VOTE_THANKS_TEXT,
    WELCOME_TEXT,
};
use deskmate::bot::{run_polling, Dispatcher};
use deskmate::config::TelegramConfig;
use deskmate::embeddings::Embedder;
use deskmate::error::{DeskmateError, ErrorKind};
use deskmate::intelligence::IntentClassifier;
use deskmate::models::Vote;
use deskmate::services::fallback::GENERIC_APOLOGY;
use deskmate::services::{
    InteractionStore, ResponseGenerator, Retriever, SupportAssistant,
};
use deskmate::telegram::{TelegramClient, Update};

const TOKEN: &str = "123456:TEST";

fn bot_path(method_name: &str) -> String {
    format!("/bot{TOKEN}/{method_name}")
}

fn telegram_ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
}

fn sent_message(chat_id: i64) -> Value {
    json!({
        "message_id": 500,
        "chat": { "id": chat_id, "type": "private" },
        "text": "ok"
    })
}

fn telegram_client(server: &MockServer) -> TelegramClient {
    TelegramClient::new(&TelegramConfig {
        bot_token: Some(TOKEN.to_string()),
        api_url: server.uri(),
        poll_timeout_secs: 0,
    })
    .unwrap()
}

fn text_update(update_id: i64, chat_id: i64, chat_type: &str, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": 10,
            "chat": { "id": chat_id, "type": chat_type },
            "from": { "id": 77, "is_bot": false, "first_name": "Dilnoza" },
            "text": text
        }
    }))
    .unwrap()
}

fn vote_update(update_id: i64, chat_id: i64, data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb-{update_id}"),
            "from": { "id": 77, "first_name": "Dilnoza" },
            "message": {
                "message_id": 500,
                "chat": { "id": chat_id, "type": "private" }
            },
            "data": data
        }
    }))
    .unwrap()
}

async fn mount_telegram_defaults(server: &MockServer, chat_id: i64) {
    Mock::given(method("POST"))
        .and(path(bot_path("sendMessage")))
        .respond_with(telegram_ok(sent_message(chat_id)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(bot_path("sendChatAction")))
        .respond_with(telegram_ok(json!(true)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(bot_path("answerCallbackQuery")))
        .respond_with(telegram_ok(json!(true)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(bot_path("editMessageReplyMarkup")))
        .respond_with(telegram_ok(sent_message(chat_id)))
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, method_name: &str) -> Vec<Value> {
    let wanted = bot_path(method_name);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == wanted)
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

async fn support_harness() -> TestHarness {
    harness(
        ScriptedModel::replying("Question"),
        ScriptedModel::replying("Reload the page."),
        &["CRM fix: Reload the page."],
    )
    .await
}

#[tokio::test]
async fn test_start_sends_welcome() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, 1).await;
    let h = support_harness().await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(text_update(1, 1, "private", "/start"))
        .await
        .unwrap();

    let sent = requests_to(&server, "sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["text"], WELCOME_TEXT);
    assert!(h.classifier_model.recorded().is_empty());
}

#[tokio::test]
async fn test_empty_ask_replies_with_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("sendMessage")))
        .and(body_partial_json(json!({
            "chat_id": -100,
            "text": ASK_USAGE_TEXT,
            "reply_to_message_id": 10
        })))
        .respond_with(telegram_ok(sent_message(-100)))
        .expect(1)
        .mount(&server)
        .await;
    let h = support_harness().await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(text_update(2, -100, "supergroup", "/ask@deskmate_bot   "))
        .await
        .unwrap();

    assert!(h.classifier_model.recorded().is_empty());
    assert!(h.answer_model.recorded().is_empty());
}

#[tokio::test]
async fn test_group_ask_answers_without_history() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, -100).await;
    let h = support_harness().await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(text_update(3, -100, "group", "/ask How do I fix the CRM?"))
        .await
        .unwrap();

    let sent = requests_to(&server, "sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["text"], "Reload the page.");
    assert_eq!(sent[0]["reply_to_message_id"], 10);
    assert_eq!(
        sent[0]["reply_markup"]["inline_keyboard"][0]
            .as_array()
            .map(Vec::len),
        Some(2)
    );
    assert_eq!(requests_to(&server, "sendChatAction").await.len(), 1);
    assert!(h.assistant.store().get_history(-100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_group_free_text_is_ignored() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, -100).await;
    let h = support_harness().await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(text_update(4, -100, "group", "anyone know the wifi password?"))
        .await
        .unwrap();

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert!(h.classifier_model.recorded().is_empty());
}

#[tokio::test]
async fn test_vote_is_recorded_once_and_buttons_removed() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, 5).await;
    let h = support_harness().await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(text_update(5, 5, "private", "CRM is frozen"))
        .await
        .unwrap();

    let sent = requests_to(&server, "sendMessage").await;
    let up_data = sent[0]["reply_markup"]["inline_keyboard"][0][0]["callback_data"]
        .as_str()
        .unwrap()
        .to_string();
    let interaction_id = up_data.rsplit(':').next().unwrap().to_string();

    dispatcher
        .handle_update(vote_update(6, 5, &up_data))
        .await
        .unwrap();
    dispatcher
        .handle_update(vote_update(7, 5, &format!("vote:down:{interaction_id}")))
        .await
        .unwrap();

    let answers = requests_to(&server, "answerCallbackQuery").await;
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0]["text"], VOTE_THANKS_TEXT);
    assert_eq!(answers[1]["text"], ALREADY_VOTED_TEXT);

    let edits = requests_to(&server, "editMessageReplyMarkup").await;
    assert!(!edits.is_empty());
    assert_eq!(edits[0]["reply_markup"], json!({ "inline_keyboard": [] }));

    let logged = h
        .assistant
        .store()
        .get_interaction(&interaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(logged.vote, Some(Vote::Up));
}

#[tokio::test]
async fn test_vote_for_unknown_interaction() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, 5).await;
    let h = support_harness().await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(vote_update(8, 5, "vote:up:missing-id"))
        .await
        .unwrap();

    let answers = requests_to(&server, "answerCallbackQuery").await;
    assert_eq!(answers[0]["text"], VOTE_EXPIRED_TEXT);
}

#[tokio::test]
async fn test_retrieval_failure_sends_apology() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, 6).await;

    let (db, dir) = temp_database().await;
    let store = temp_vector_store(&dir, FailingEmbedder.dimensions()).await;
    let assistant = Arc::new(SupportAssistant::new(
        IntentClassifier::new(ScriptedModel::replying("Question")),
        Retriever::new(Arc::new(FailingEmbedder), Arc::new(store), 3),
        ResponseGenerator::new(ScriptedModel::replying("unused")),
        InteractionStore::new(db, 5, 16),
    ));
    let dispatcher = Dispatcher::new(telegram_client(&server), assistant);

    dispatcher
        .handle_update(text_update(9, 6, "private", "/ask VPN drops"))
        .await
        .unwrap();

    let sent = requests_to(&server, "sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["text"], GENERIC_APOLOGY);
    assert!(sent[0].get("reply_markup").is_none());
}

#[tokio::test]
async fn test_long_answer_is_split_with_buttons_on_last_message() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, 7).await;
    let long_answer = "Reload the CRM page, then clear caches. ".repeat(125);
    assert_eq!(long_answer.chars().count(), 5000);
    let h = harness(
        ScriptedModel::replying("Question"),
        ScriptedModel::replying(&long_answer),
        &["CRM fix: Reload the page."],
    )
    .await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(text_update(10, 7, "private", "CRM is frozen"))
        .await
        .unwrap();

    let sent = requests_to(&server, "sendMessage").await;
    assert_eq!(sent.len(), 2);
    for message in &sent {
        let text = message["text"].as_str().unwrap();
        assert!(text.encode_utf16().count() <= MAX_MESSAGE_LEN);
    }
    assert_eq!(sent[0]["reply_to_message_id"], 10);
    assert!(sent[0].get("reply_markup").is_none());
    assert!(sent[1].get("reply_to_message_id").is_none());
    assert_eq!(
        sent[1]["reply_markup"]["inline_keyboard"][0]
            .as_array()
            .map(Vec::len),
        Some(2)
    );

    let rejoined = format!(
        "{} {}",
        sent[0]["text"].as_str().unwrap(),
        sent[1]["text"].as_str().unwrap()
    );
    assert_eq!(rejoined, long_answer.trim());
}

#[tokio::test]
async fn test_rejected_answer_falls_back_to_apology() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("sendMessage")))
        .and(body_partial_json(json!({ "text": "Reload the page." })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities"
        })))
        .mount(&server)
        .await;
    mount_telegram_defaults(&server, 8).await;
    let h = support_harness().await;
    let dispatcher = Dispatcher::new(telegram_client(&server), h.assistant.clone());

    dispatcher
        .handle_update(text_update(11, 8, "private", "CRM is frozen"))
        .await
        .unwrap();

    let sent = requests_to(&server, "sendMessage").await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["text"], "Reload the page.");
    assert_eq!(sent[1]["text"], GENERIC_APOLOGY);
    assert_eq!(sent[1]["reply_to_message_id"], 10);
    assert!(sent[1].get("reply_markup").is_none());
}

#[tokio::test]
async fn test_get_updates_rejected_token_is_configuration_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("getUpdates")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let err = telegram_client(&server).get_updates(None).await.unwrap_err();
    assert!(matches!(err, DeskmateError::ApiAuth(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn test_rate_limited_call_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(bot_path("sendMessage")))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 12",
            "parameters": { "retry_after": 12 }
        })))
        .mount(&server)
        .await;

    let err = telegram_client(&server)
        .send_message(1, "hi", None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeskmateError::ApiRateLimit {
            retry_after: Some(12)
        }
    ));
}

#[tokio::test]
async fn test_polling_dispatches_updates_and_advances_offset() {
    let server = MockServer::start().await;
    mount_telegram_defaults(&server, 1).await;
    Mock::given(method("POST"))
        .and(path(bot_path("getUpdates")))
        .respond_with(telegram_ok(json!([{
            "update_id": 100,
            "message": {
                "message_id": 10,
                "chat": { "id": 1, "type": "private" },
                "from": { "id": 77, "is_bot": false, "first_name": "Dilnoza" },
                "text": "/start"
            }
        }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(bot_path("getUpdates")))
        .respond_with(telegram_ok(json!([])).set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;

    let h = support_harness().await;
    let telegram = telegram_client(&server);
    let dispatcher = Arc::new(Dispatcher::new(telegram.clone(), h.assistant.clone()));
    let cancel = CancellationToken::new();

    let poller = tokio::spawn(run_polling(telegram, dispatcher, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();
    poller.await.unwrap().unwrap();

    let sent = requests_to(&server, "sendMessage").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["text"], WELCOME_TEXT);

    let polls = requests_to(&server, "getUpdates").await;
    assert!(polls.len() >= 2);
    assert!(polls[0]["offset"].is_null());
    assert_eq!(polls[1]["offset"], 101);
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

use auth_core::TokenValidator;
use event_schema::LocalBus;
use messaging_service::services::{DialogService, EventPublisher};
use messaging_service::{routes, AppState};
use realtime_service::hub::{ConnectionRegistry, HubState};

use common::{MemoryDialogStore, MemoryUserDirectory, StubValidator};

const WAIT: Duration = Duration::from_secs(2);

/// A message written through the messaging API must reach a WebSocket held
/// by the realtime hub in another "process" via the shared bus.
#[tokio::test]
async fn message_sent_over_http_reaches_the_recipient_socket() {
    let bus = LocalBus::new();
    let validator = Arc::new(StubValidator::new());
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    validator.grant("t1", u1);
    validator.grant("t2", u2);

    // Messaging service.
    let dialogs = Arc::new(
        DialogService::new(
            Arc::new(MemoryDialogStore::new()),
            Arc::new(MemoryUserDirectory::new()),
        )
        .with_publisher(EventPublisher::new(Arc::new(bus.clone()))),
    );
    let msg_app = routes::build_router(AppState {
        dialogs,
        validator: validator.clone() as Arc<dyn TokenValidator>,
    });
    let msg_listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let msg_addr = msg_listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(msg_listener, msg_app).await.unwrap();
    });

    // Realtime hub, sharing only the bus and the credential backend.
    let registry = ConnectionRegistry::new();
    let hub_app = realtime_service::routes::build_router(HubState {
        registry: registry.clone(),
        validator: validator.clone() as Arc<dyn TokenValidator>,
        bus: Arc::new(bus.clone()),
    });
    let hub_listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let hub_addr = hub_listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(hub_listener, hub_app).await.unwrap();
    });

    let (mut socket, _) = connect_async(format!("ws://{hub_addr}/v1/ws?token=t2"))
        .await
        .unwrap();
    for _ in 0..100 {
        if registry.is_connected(u2).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{msg_addr}/v1/dialogs"))
        .bearer_auth("t1")
        .json(&serde_json::json!({ "user_id": u2 }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    let dialog_id = body["dialog_id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("http://{msg_addr}/v1/dialogs/{dialog_id}/messages"))
        .bearer_auth("t1")
        .json(&serde_json::json!({ "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let frame = timeout(WAIT, socket.next())
        .await
        .expect("realtime frame within two seconds")
        .unwrap()
        .unwrap();
    let WsMessage::Text(text) = frame else {
        panic!("expected a text frame");
    };
    let event: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(event["type"], "message.new");
    assert_eq!(event["sender_id"], u1.to_string());
    assert_eq!(event["dialog_id"], dialog_id);
    assert_eq!(event["text"], "hi");
}

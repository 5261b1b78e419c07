use serde_json::{json, Value};
use std::net::TcpListener;
use tchat_server::configuration::JwtSettings;
use tchat_server::startup::{build_auth_service, run, Stores};
use tchat_server::store::InMemoryStore;

pub struct TestApp {
    pub address: String,
    client: reqwest::Client,
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let jwt_config = JwtSettings {
        secret: None,
        access_token_expiry: 900,
        refresh_token_expiry: 30 * 24 * 60 * 60,
    };
    let stores = Stores::from_backend(InMemoryStore::new());
    let auth_service =
        build_auth_service(&stores, "messages-test-secret-0123456789abcdef", &jwt_config);

    let server = run(listener, stores, auth_service).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

/// A signed-up, logged-in user.
struct Account {
    user_id: String,
    bearer: String,
}

impl TestApp {
    async fn register(&self, username: &str) -> Account {
        let signup = self
            .client
            .post(&format!("{}/signup", self.address))
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "secret123"
            }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(201, signup.status().as_u16());

        let login: Value = self
            .client
            .post(&format!("{}/login", self.address))
            .json(&json!({ "username": username, "password": "secret123" }))
            .send()
            .await
            .expect("Failed to execute request.")
            .json()
            .await
            .unwrap();
        let bearer = format!("Bearer {}", login["access_token"].as_str().unwrap());

        let me: Value = self
            .client
            .get(&format!("{}/api/user/me", self.address))
            .header("Authorization", &bearer)
            .send()
            .await
            .expect("Failed to execute request.")
            .json()
            .await
            .unwrap();

        Account {
            user_id: me["user_id"].as_str().unwrap().to_string(),
            bearer,
        }
    }

    async fn send(&self, from: &Account, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/messages", self.address))
            .header("Authorization", &from.bearer)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn get(&self, as_user: &Account, path: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}{}", self.address, path))
            .header("Authorization", &as_user.bearer)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

#[tokio::test]
async fn send_message_by_username_returns_201() {
    let app = spawn_app();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let response = app
        .send(&alice, &json!({"receiver_username": "bob", "body": "hello bob"}))
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"]["sender_id"], alice.user_id);
    assert_eq!(body["message"]["receiver_id"], bob.user_id);
    assert_eq!(body["message"]["body"], "hello bob");
}

#[tokio::test]
async fn send_message_by_receiver_id_returns_201() {
    let app = spawn_app();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let response = app
        .send(&alice, &json!({"receiver_id": bob.user_id, "body": "hi"}))
        .await;

    assert_eq!(201, response.status().as_u16());
}

#[tokio::test]
async fn send_message_rejects_bad_input() {
    let app = spawn_app();
    let alice = app.register("alice").await;
    app.register("bob").await;

    let test_cases = vec![
        (json!({"body": "no receiver"}), 400, "missing receiver"),
        (json!({"receiver_username": "bob"}), 400, "missing body"),
        (json!({"receiver_username": "bob", "body": "   "}), 400, "blank body"),
        (json!({"receiver_id": "not-a-uuid", "body": "hi"}), 400, "malformed receiver id"),
        (json!({"receiver_username": "carol", "body": "hi"}), 404, "unknown receiver"),
    ];

    for (body, status, reason) in test_cases {
        let response = app.send(&alice, &body).await;
        assert_eq!(status, response.status().as_u16(), "Case: {}", reason);
    }
}

#[tokio::test]
async fn read_chat_returns_messages_in_order() {
    let app = spawn_app();
    let alice = app.register("alice").await;
    app.register("bob").await;

    for text in ["one", "two", "three"] {
        let response = app
            .send(&alice, &json!({"receiver_username": "bob", "body": text}))
            .await;
        assert_eq!(201, response.status().as_u16());
    }

    let response = app
        .get(&alice, "/api/messages/chat?receiver_username=bob")
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let bodies: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn read_chat_requires_a_receiver() {
    let app = spawn_app();
    let alice = app.register("alice").await;

    let response = app.get(&alice, "/api/messages/chat").await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn read_last_sent_returns_newest_or_404() {
    let app = spawn_app();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let empty = app
        .get(&alice, "/api/messages/last?receiver_username=bob")
        .await;
    assert_eq!(404, empty.status().as_u16());

    for text in ["first", "second"] {
        app.send(&alice, &json!({"receiver_username": "bob", "body": text}))
            .await;
    }

    let response = app
        .get(&alice, &format!("/api/messages/last?receiver_id={}", bob.user_id))
        .await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"]["body"], "second");
}

#[tokio::test]
async fn read_message_is_limited_to_participants() {
    let app = spawn_app();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;

    let sent: Value = app
        .send(&alice, &json!({"receiver_username": "bob", "body": "secret plans"}))
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/api/messages/{}", sent["message"]["id"].as_str().unwrap());

    assert_eq!(200, app.get(&alice, &path).await.status().as_u16());
    assert_eq!(200, app.get(&bob, &path).await.status().as_u16());
    assert_eq!(404, app.get(&carol, &path).await.status().as_u16());
}

#[tokio::test]
async fn read_message_returns_404_for_unknown_or_malformed_id() {
    let app = spawn_app();
    let alice = app.register("alice").await;

    let unknown = app
        .get(&alice, &format!("/api/messages/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(404, unknown.status().as_u16());

    let malformed = app.get(&alice, "/api/messages/not-a-uuid").await;
    assert_eq!(404, malformed.status().as_u16());
}

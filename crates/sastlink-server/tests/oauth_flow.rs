use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::{StatusCode, header};
use sastlink_server::{AppConfig, build_app, build_state};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

const SECRET: &str = "integration-secret";

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.oauth.identity.jwt_secret = SECRET.into();
    cfg
}

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let cfg = test_config();
    let state = build_state(&cfg).await.expect("build state");
    let app = build_app(state, &cfg);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn login_token(username: &str) -> String {
    let exp = time::OffsetDateTime::now_utc().unix_timestamp() + 3600;
    encode(
        &Header::default(),
        &json!({ "username": username, "exp": exp }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// `name=value` part of the session cookie.
fn session_cookie(resp: &reqwest::Response) -> String {
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}

async fn create_client(client: &reqwest::Client, base: &str, redirect_uri: &str) -> String {
    let resp = client
        .post(format!("{base}/oauth/client"))
        .form(&[("redirect_uri", redirect_uri)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    body["data"]["clientId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_detour_resumes_the_authorize_request() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = http_client();

    let client_id = create_client(&client, &base, "https://app.example/cb").await;

    // No login token: stashed and sent to the login page
    let resp = client
        .get(format!("{base}/oauth/authorize"))
        .query(&[
            ("client_id", client_id.as_str()),
            ("redirect_uri", "https://app.example/cb"),
            ("response_type", "code"),
            ("state", "xyz"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/user/login");
    let cookie = session_cookie(&resp);

    // Same session, now logged in, no parameters
    let resp = client
        .get(format!("{base}/oauth/authorize"))
        .header(header::COOKIE, &cookie)
        .header("TOKEN", login_token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());

    let target = url::Url::parse(&location(&resp)).unwrap();
    assert_eq!(target.host_str(), Some("app.example"));
    assert_eq!(target.path(), "/cb");
    let pairs: Vec<(String, String)> = target.query_pairs().into_owned().collect();
    assert!(pairs.iter().any(|(k, v)| k == "code" && !v.is_empty()));
    assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));

    // The pending slot was consumed: a bare retry has no client_id
    let resp = client
        .get(format!("{base}/oauth/authorize"))
        .header(header::COOKIE, &cookie)
        .header("TOKEN", login_token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["errCode"], "ParamError");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn post_authorize_with_token_grants_directly() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = http_client();

    let client_id = create_client(&client, &base, "https://app.example").await;

    let resp = client
        .post(format!("{base}/oauth/authorize"))
        .header("TOKEN", login_token("bob"))
        .form(&[
            ("client_id", client_id.as_str()),
            ("redirect_uri", "https://api.app.example/done"),
            ("response_type", "code"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);

    let target = location(&resp);
    assert!(target.starts_with("https://api.app.example/done?code="), "{target}");
    assert!(!target.contains("state="));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn forged_token_is_sent_to_login() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = http_client();

    let client_id = create_client(&client, &base, "https://app.example").await;
    let forged = encode(
        &Header::default(),
        &json!({ "username": "mallory", "exp": 4_102_444_800_i64 }),
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let resp = client
        .get(format!("{base}/oauth/authorize"))
        .header("TOKEN", forged)
        .query(&[
            ("client_id", client_id.as_str()),
            ("redirect_uri", "https://app.example/cb"),
            ("response_type", "code"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/user/login");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn redirect_outside_registered_domain_is_rejected() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = http_client();

    let client_id = create_client(&client, &base, "https://app.example").await;

    let resp = client
        .get(format!("{base}/oauth/authorize"))
        .header("TOKEN", login_token("alice"))
        .query(&[
            ("client_id", client_id.as_str()),
            ("redirect_uri", "https://evil.example/cb"),
            ("response_type", "code"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.headers().get(header::LOCATION).is_none());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errCode"], "InternalErr");
    assert_eq!(body["success"], false);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn client_registration_endpoints() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = http_client();

    // Missing redirect_uri
    let resp = client
        .post(format!("{base}/oauth/client"))
        .form(&[("redirect_uri", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errCode"], "ParamError");
    assert!(body["data"].is_null());

    // Bootstrap with a chosen id
    let resp = client
        .get(format!("{base}/oauth/init"))
        .query(&[
            ("client_id", "portal"),
            ("redirect_uri", "https://portal.example"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["data"],
        json!({ "clientId": "portal", "redirectDomain": "https://portal.example" })
    );

    // Same id again
    let resp = client
        .get(format!("{base}/oauth/init"))
        .query(&[
            ("client_id", "portal"),
            ("redirect_uri", "https://other.example"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errCode"], "ClientErr");

    // Missing client_id
    let resp = client
        .get(format!("{base}/oauth/init"))
        .query(&[("redirect_uri", "https://portal.example")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errCode"], "ClientErr");

    // Missing redirect_uri registers nothing
    let resp = client
        .get(format!("{base}/oauth/init"))
        .query(&[("client_id", "x")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["errCode"], "ClientErr");

    let resp = client
        .get(format!("{base}/oauth/init"))
        .query(&[("client_id", "x"), ("redirect_uri", "https://x.example")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["clientId"], "x");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn user_auth_and_healthz() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = http_client();

    let resp = client
        .get(format!("{base}/oauth/user-auth"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/user/login");

    let resp = client
        .get(format!("{base}/oauth/user-auth"))
        .header("TOKEN", "anything")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

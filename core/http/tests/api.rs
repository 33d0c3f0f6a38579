//! Router level tests against an in-memory provider.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey};
use serde_json::Value;
use sha1::Sha1;
use tower::ServiceExt;

use opencdn_crypto::{HashAlgorithm, KdfParams, ObjectCipher, SealingKey, ServerSecret};
use opencdn_http::{app, AppState, HttpSettings};
use opencdn_storage::{MemoryProvider, StorageProvider};
use opencdn_store::{
    CryptoEngine, GroupStore, ObjectStore, TokenAuthority, TokenSettings, TokenStore,
    UploadPolicy, DEFAULT_KEY_LENGTH,
};

const PRIVATE_PEM: &str = include_str!("../../crypto/testdata/rsa_1024_private.pem");
const PUBLIC_PEM: &str = include_str!("../../crypto/testdata/rsa_1024_public.pem");
const BOUNDARY: &str = "opencdntestboundary";

struct TestApp {
    router: Router,
}

struct Options {
    required_for_upload: bool,
    max_object_bytes: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            required_for_upload: false,
            max_object_bytes: opencdn_store::DEFAULT_MAX_OBJECT_BYTES,
        }
    }
}

impl TestApp {
    fn new() -> Self {
        Self::with_options(Options::default())
    }

    fn with_options(options: Options) -> Self {
        let provider: Arc<dyn StorageProvider> = Arc::new(MemoryProvider::new());
        let cipher = ObjectCipher::new(
            ServerSecret::new("server-secret").unwrap(),
            KdfParams::default(),
        );
        let engine = CryptoEngine::new(
            HashAlgorithm::Sha3_256,
            cipher,
            DEFAULT_KEY_LENGTH,
            DEFAULT_KEY_LENGTH,
        )
        .unwrap();
        let policy = Arc::new(UploadPolicy {
            max_object_bytes: options.max_object_bytes,
            ..UploadPolicy::default()
        });

        let mut keys = BTreeMap::new();
        keys.insert("alice".to_string(), SealingKey::from_pem(PUBLIC_PEM).unwrap());
        let tokens = TokenAuthority::new(
            Arc::new(TokenStore::new()),
            keys,
            HashAlgorithm::Sha3_256,
            TokenSettings {
                required_for_upload: options.required_for_upload,
                ..TokenSettings::default()
            },
        )
        .unwrap();

        let state = AppState::new(
            ObjectStore::new(Arc::clone(&provider), engine.clone(), Arc::clone(&policy)),
            GroupStore::new(provider, engine.clone(), policy),
            tokens,
            engine,
            HttpSettings {
                proxy_redirecting: false,
                test_delay: Duration::ZERO,
                max_object_bytes: options.max_object_bytes,
            },
        );

        Self { router: app(state) }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn upload(
        &self,
        fields: &[(&str, &str)],
        filename: &str,
        content: &[u8],
    ) -> (StatusCode, Value) {
        self.send_json(multipart("/upload", fields, Some((filename, content))))
            .await
    }
}

fn multipart(uri: &str, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn form(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn unseal(sealed: &str) -> String {
    let private = RsaPrivateKey::from_pkcs8_pem(PRIVATE_PEM).unwrap();
    let ciphertext = STANDARD.decode(sealed).unwrap();
    String::from_utf8(private.decrypt(Oaep::new::<Sha1>(), &ciphertext).unwrap()).unwrap()
}

fn assert_error(status: StatusCode, body: &Value, expected_status: u16, name: &str) {
    assert_eq!(status.as_u16(), expected_status, "body: {}", body);
    assert_eq!(body["status"], "error");
    assert_eq!(body["name"], name);
}

#[tokio::test]
async fn test_version_banner() {
    let app = TestApp::new();
    let (status, body) = app.send(get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().starts_with("OpenCDN v"));
}

#[tokio::test]
async fn test_object_lifecycle() {
    let app = TestApp::new();

    let (status, uploaded) = app
        .upload(&[("private_key", "owner")], "hello.txt", b"hello")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uploaded["filename"], "hello.txt");
    assert_eq!(uploaded["private_key"], "owner");
    assert_eq!(uploaded["hashed_key"].as_str().unwrap().len(), 64);
    assert!(uploaded.get("group").is_none());

    let key = uploaded["key"].as_str().unwrap();
    assert_eq!(key.len(), DEFAULT_KEY_LENGTH);
    assert_eq!(
        uploaded["hashed_key"],
        HashAlgorithm::Sha3_256.hash_hex(key)
    );

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/{}/hello.txt", key)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    assert!(response.headers()[CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment;"));
    let content = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&content[..], b"hello");

    let uri = format!("/{}/hello.txt", key);
    let (status, body) = app
        .send_json(form("DELETE", &uri, "private_key=intruder"))
        .await;
    assert_error(status, &body, 403, "access_denied");

    let (status, body) = app.send_json(form("DELETE", &uri, "private_key=owner")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, body) = app.send_json(get(&uri)).await;
    assert_error(status, &body, 404, "not_found");
}

#[tokio::test]
async fn test_upload_generates_private_key() {
    let app = TestApp::new();
    let (status, uploaded) = app.upload(&[], "a.png", b"\x89PNG").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        uploaded["private_key"].as_str().unwrap().len(),
        DEFAULT_KEY_LENGTH
    );
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = TestApp::new();

    let (status, body) = app
        .send_json(multipart("/upload", &[("private_key", "x")], None))
        .await;
    assert_error(status, &body, 400, "bad_request");

    let (status, body) = app.upload(&[], "setup.exe", b"MZ").await;
    assert_error(status, &body, 403, "invalid_file_suffix");

    let (status, body) = app.upload(&[], "noext", b"data").await;
    assert_error(status, &body, 403, "invalid_file_suffix");

    let (status, body) = app.upload(&[], "private.key", b"data").await;
    assert_error(status, &body, 403, "invalid_address");
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = TestApp::with_options(Options {
        max_object_bytes: 8,
        ..Options::default()
    });

    let (status, _) = app.upload(&[], "small.txt", b"12345678").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.upload(&[], "big.txt", b"123456789").await;
    assert_error(status, &body, 413, "too_large");
}

#[tokio::test]
async fn test_download_rejections() {
    let app = TestApp::new();
    let (_, uploaded) = app.upload(&[], "hello.txt", b"hello").await;
    let key = uploaded["key"].as_str().unwrap();

    let (status, body) = app.send_json(get("/wrongkey1234567/hello.txt")).await;
    assert_error(status, &body, 404, "not_found");

    let (status, body) = app.send_json(get(&format!("/{}/private.key", key))).await;
    assert_error(status, &body, 404, "not_found");

    let (status, body) = app.send_json(get("/%2E%2E/hello.txt")).await;
    assert_error(status, &body, 403, "invalid_address");
}

#[tokio::test]
async fn test_disallowed_characters_are_not_found() {
    let app = TestApp::new();
    let (_, uploaded) = app.upload(&[], "hello.txt", b"hello").await;
    let key = uploaded["key"].as_str().unwrap();

    let (status, body) = app.send_json(get(&format!("/{}/hel%00lo.txt", key))).await;
    assert_error(status, &body, 404, "not_found");

    let uri = format!("/{}/a%09b.txt", key);
    let (status, body) = app
        .send_json(form("DELETE", &uri, "private_key=whatever"))
        .await;
    assert_error(status, &body, 404, "not_found");

    let (_, created) = app.send_json(form("POST", "/group/team", "")).await;
    let group_key = created["key"].as_str().unwrap();

    let (status, body) = app
        .send_json(get(&format!("/te%00am/{}/a.txt", group_key)))
        .await;
    assert_error(status, &body, 404, "not_found");

    let (status, body) = app
        .send_json(get(&format!("/team/{}/a%09b.txt", group_key)))
        .await;
    assert_error(status, &body, 404, "not_found");

    let (status, body) = app
        .send_json(form("DELETE", "/group/te%60am", "private_key=whatever"))
        .await;
    assert_error(status, &body, 404, "not_found");
}

#[tokio::test]
async fn test_delete_requires_private_key() {
    let app = TestApp::new();
    let (_, uploaded) = app.upload(&[], "hello.txt", b"hello").await;
    let uri = format!("/{}/hello.txt", uploaded["key"].as_str().unwrap());

    let (status, body) = app.send_json(form("DELETE", &uri, "")).await;
    assert_error(status, &body, 400, "bad_request");
}

#[tokio::test]
async fn test_group_lifecycle() {
    let app = TestApp::new();

    let (status, created) = app
        .send_json(form("POST", "/group/team", "private_key=boss"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "team");
    assert_eq!(created["private_key"], "boss");
    let key = created["key"].as_str().unwrap().to_string();

    let (status, body) = app.send_json(form("POST", "/group/team", "")).await;
    assert_error(status, &body, 409, "already_exists");

    let fields = [("group", "team"), ("key", key.as_str()), ("private_key", "boss")];
    let (status, uploaded) = app.upload(&fields, "a.txt", b"alpha").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uploaded["group"], "team");
    assert_eq!(uploaded["key"], key.as_str());
    assert_eq!(uploaded["hashed_key"], created["hashed_key"]);

    let (status, body) = app.upload(&fields, "a.txt", b"again").await;
    assert_error(status, &body, 409, "already_exists");

    let listing_body = format!("key={}&private_key=boss", key);
    let (status, listing) = app
        .send_json(form("PUT", "/group/team", &listing_body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["files"], serde_json::json!(["a.txt"]));

    let file_uri = format!("/team/{}/a.txt", key);
    let (status, content) = app.send(get(&file_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content, b"alpha");

    let (status, body) = app
        .send_json(form("DELETE", &file_uri, "private_key=boss"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, body) = app.send_json(get(&file_uri)).await;
    assert_error(status, &body, 404, "not_found");

    let (status, body) = app
        .send_json(form("DELETE", "/group/team", "private_key=nope"))
        .await;
    assert_error(status, &body, 403, "access_denied");

    let (status, _) = app
        .send_json(form("DELETE", "/group/team", "private_key=boss"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send_json(form("PUT", "/group/team", &listing_body))
        .await;
    assert_error(status, &body, 404, "not_found");
}

#[tokio::test]
async fn test_group_upload_needs_key_and_private_key() {
    let app = TestApp::new();
    let (_, created) = app.send_json(form("POST", "/group/team", "")).await;
    let key = created["key"].as_str().unwrap();

    let (status, body) = app
        .upload(&[("group", "team"), ("key", key)], "a.txt", b"x")
        .await;
    assert_error(status, &body, 400, "bad_request");

    let (status, body) = app
        .upload(&[("group", "team"), ("private_key", "p")], "a.txt", b"x")
        .await;
    assert_error(status, &body, 400, "bad_request");

    let (status, body) = app
        .upload(
            &[("group", "ghost"), ("key", key), ("private_key", "p")],
            "a.txt",
            b"x",
        )
        .await;
    assert_error(status, &body, 404, "not_found");
}

#[tokio::test]
async fn test_token_flow() {
    let app = TestApp::with_options(Options {
        required_for_upload: true,
        ..Options::default()
    });

    let (status, body) = app.upload(&[], "a.txt", b"x").await;
    assert_error(status, &body, 401, "authentication_token_required");

    let (status, body) = app.send_json(form("POST", "/group/team", "")).await;
    assert_error(status, &body, 401, "authentication_token_required");

    let (status, body) = app
        .send_json(form("POST", "/authentication", "key_identifier=bob"))
        .await;
    assert_error(status, &body, 404, "key_not_found");

    let (status, issued) = app
        .send_json(form("POST", "/authentication", "key_identifier=alice"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = unseal(issued["encrypted_authentication_token"].as_str().unwrap());
    let token_field = format!("authentication_token={}", token);

    let (status, _) = app
        .upload(&[("authentication_token", token.as_str())], "a.txt", b"x")
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send_json(form("POST", "/authentication/test", &token_field))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, _) = app
        .send_json(form("DELETE", "/authentication", &token_field))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send_json(form("DELETE", "/authentication", &token_field))
        .await;
    assert_error(status, &body, 403, "invalid_authentication_token");

    let (status, body) = app
        .send_json(form("POST", "/authentication/test", &token_field))
        .await;
    assert_error(status, &body, 403, "invalid_authentication_token");

    let (status, body) = app
        .send_json(form("POST", "/authentication/test", ""))
        .await;
    assert_error(status, &body, 401, "authentication_token_required");
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();
    let (status, body) = app.send_json(get("/a/b/c/d")).await;
    assert_error(status, &body, 404, "not_found");
}

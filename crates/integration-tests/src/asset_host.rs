//! In-process stand-in for the Cloudinary upload API.
//!
//! Serves `POST /v1_1/{cloud}/image/{upload,destroy}` on a loopback port,
//! checks request signatures the way the real host does, and records what
//! was stored and which deletions were asked for.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::post,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use souk_api::config::CloudinaryConfig;
use souk_api::services::assets::sign;

/// Cloud name the fake host answers for.
pub const FAKE_CLOUD_NAME: &str = "demo";

/// API secret the fake host verifies signatures with.
pub const FAKE_API_SECRET: &str = "fake-host-api-secret";

#[derive(Default)]
struct HostState {
    stored: Mutex<Vec<String>>,
    destroy_requests: Mutex<Vec<String>>,
    refuse_destroy: AtomicBool,
}

/// A running fake asset host.
pub struct FakeAssetHost {
    base_url: Url,
    state: Arc<HostState>,
}

impl FakeAssetHost {
    /// Bind a loopback port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no port can be bound.
    pub async fn start() -> Self {
        let state = Arc::new(HostState::default());
        let app = Router::new()
            .route("/v1_1/{cloud}/image/{action}", post(handle_action))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake asset host");
        let addr = listener.local_addr().expect("bound address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("fake asset host stopped");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}/")).expect("valid URL"),
            state,
        }
    }

    /// Client configuration pointing at this host.
    #[must_use]
    pub fn config(&self) -> CloudinaryConfig {
        self.config_with_secret(FAKE_API_SECRET)
    }

    /// Like [`FakeAssetHost::config`], signing with `secret`.
    #[must_use]
    pub fn config_with_secret(&self, secret: &str) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: FAKE_CLOUD_NAME.to_owned(),
            api_key: "123456".to_owned(),
            api_secret: SecretString::from(secret),
            folder: "ecommerce_products".to_owned(),
            base_url: self.base_url.clone(),
        }
    }

    /// Pretend `asset_id` was uploaded earlier.
    pub async fn seed(&self, asset_id: &str) {
        self.state.stored.lock().await.push(asset_id.to_owned());
    }

    /// Make destroy calls answer with an error result.
    pub fn refuse_destroy(&self, refuse: bool) {
        self.state.refuse_destroy.store(refuse, Ordering::SeqCst);
    }

    /// Asset ids currently held.
    pub async fn stored(&self) -> Vec<String> {
        self.state.stored.lock().await.clone()
    }

    /// Every asset id a signed destroy call named, in order.
    pub async fn destroy_requests(&self) -> Vec<String> {
        self.state.destroy_requests.lock().await.clone()
    }
}

async fn read_fields(mut multipart: Multipart) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_owned();
        let value = if name == "file" {
            let len = field.bytes().await.map(|b| b.len()).unwrap_or_default();
            format!("{len} bytes")
        } else {
            field.text().await.unwrap_or_default()
        };
        fields.insert(name, value);
    }
    fields
}

fn signature_matches(fields: &HashMap<String, String>) -> bool {
    let unsigned = ["file", "api_key", "signature", "signature_algorithm"];
    let params: BTreeMap<&str, String> = fields
        .iter()
        .filter(|(k, _)| !unsigned.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    fields.get("signature") == Some(&sign(&params, &SecretString::from(FAKE_API_SECRET)))
}

async fn handle_action(
    State(host): State<Arc<HostState>>,
    Path((cloud, action)): Path<(String, String)>,
    multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let fields = read_fields(multipart).await;
    if cloud != FAKE_CLOUD_NAME || !signature_matches(&fields) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Invalid Signature"}})),
        );
    }

    match action.as_str() {
        "upload" => {
            let folder = fields.get("folder").cloned().unwrap_or_default();
            let mut stored = host.stored.lock().await;
            let public_id = format!("{folder}/asset{}", stored.len() + 1);
            stored.push(public_id.clone());
            (
                StatusCode::OK,
                Json(json!({
                    "public_id": public_id,
                    "secure_url": format!("https://res.example.com/{public_id}.png"),
                })),
            )
        }
        "destroy" => {
            let public_id = fields.get("public_id").cloned().unwrap_or_default();
            host.destroy_requests.lock().await.push(public_id.clone());
            if host.refuse_destroy.load(Ordering::SeqCst) {
                return (StatusCode::OK, Json(json!({ "result": "error" })));
            }

            let mut stored = host.stored.lock().await;
            let before = stored.len();
            stored.retain(|id| *id != public_id);
            let result = if stored.len() < before { "ok" } else { "not found" };
            (StatusCode::OK, Json(json!({ "result": result })))
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

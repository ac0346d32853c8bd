// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Router fixture over a temporary form document.

use axum::body::{to_bytes, Body};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use contact_form_server::config::RateStoreBackend;
use contact_form_server::{router, AppState, ServerConfig};
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A valid submission body.
pub const VALID_BODY: &str =
    "name=Jo+Bloggs&email=jo%40example.com&phone=%2B1+555+123+4567&message=Hello+there%2C+this+is+a+test.";

pub struct Fixture {
    pub dir: TempDir,
    pub config_path: PathBuf,
    pub app: Router,
}

impl Fixture {
    /// File rate store and file mail backend unless `form` says otherwise.
    pub fn new(form: Value) -> Self {
        Self::with_backend(form, RateStoreBackend::File)
    }

    pub fn with_backend(mut form: Value, rate_store: RateStoreBackend) -> Self {
        let dir = tempfile::tempdir().unwrap();

        form["limits"]["rateStorePath"] = json!(dir.path().join("buckets"));
        let mail = &mut form["mail"];
        if mail["mode"].is_null() {
            mail["mode"] = json!("file");
        }
        if mail["to"].is_null() {
            mail["to"] = json!({"team@example.com": "Team"});
        }
        mail["filePath"] = json!(dir.path().join("mail"));

        let config_path = dir.path().join("mailer.config.json");
        std::fs::write(&config_path, serde_json::to_vec_pretty(&form).unwrap()).unwrap();

        let server = ServerConfig {
            config_path: config_path.clone(),
            rate_store,
            ..Default::default()
        };
        let app = router(Arc::new(AppState::new(server).unwrap()));

        Self {
            dir,
            config_path,
            app,
        }
    }

    pub async fn post(&self, body: &str) -> Response {
        self.post_from("203.0.113.10", body).await
    }

    /// Submit `body` as if sent from `peer`.
    pub async fn post_from(&self, peer: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_from(peer, request).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send_from("203.0.113.10", request).await
    }

    pub async fn send_from(&self, peer: &str, request: Request<Body>) -> Response {
        let ip: IpAddr = peer.parse().unwrap();
        self.app
            .clone()
            .layer(MockConnectInfo(SocketAddr::new(ip, 50_000)))
            .oneshot(request)
            .await
            .unwrap()
    }

    /// Contents of every mail record written so far.
    pub fn mail_records(&self) -> Vec<String> {
        match std::fs::read_dir(self.dir.path().join("mail")) {
            Ok(entries) => entries
                .map(|e| std::fs::read_to_string(e.unwrap().path()).unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Messages written so far; records from the same second share a file.
    pub fn mail_count(&self) -> usize {
        self.mail_records()
            .iter()
            .map(|r| r.matches("\n\nHeaders:\n").count())
            .sum()
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

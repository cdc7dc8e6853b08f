//! Shared fixtures for route tests: in-memory store, stub model and `sh`
//! stand-ins for the analysis scripts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::web;
use mongodb::bson::oid::ObjectId;
use tempfile::TempDir;

use crate::config::{AppConfig, ScriptPaths};
use crate::database::memory::MemoryProfileStore;
use crate::database::ProfileStore;
use crate::models::User;
use crate::python::{InvokerConfig, ProcessInvoker};
use crate::services::{auth_service, upload_service};
use crate::services::gemini_service::stub::StubModel;
use crate::services::GenerativeModel;
use crate::state::AppState;

pub const JWT_SECRET: &str = "test-secret";
pub const BOUNDARY: &str = "careergap-test-boundary";

const DEFAULT_SCRIPTS: [(&str, &str); 9] = [
    ("resume.py", r#"printf '{"skills":["rust"],"source":"%s"}\n' "$(basename "$1")""#),
    ("transcript.py", r#"echo '{"cgpa":"9.1"}'"#),
    ("certificate.py", r#"echo '{"certificates":["AWS Cloud Practitioner"]}'"#),
    ("github.py", r#"printf '{"repositories":3,"url":"%s"}\n' "$1""#),
    (
        "personality.py",
        r#"if [ "$1" = "--instructions" ]; then echo '{"instructions":"Pick your top three RIASEC letters"}'; else printf '{"code":"%s","summary":"ok"}\n' "$1"; fi"#,
    ),
    ("skillpath.py", r#"printf '{"target":"%s","report":"%s"}\n' "$1" "$(cat "$2")""#),
    ("portfolioBuilder.py", r#"echo "Portfolio guide"; echo "Based on: $(cat "$1")""#),
    (
        "jobDemand.py",
        r#"printf '{"job_demand_data":{"rust":120},"skills_data":{"top":["rust"]},"summary":{"location":"%s"}}\n' "$1""#,
    ),
    ("CareerRole.py", r#"echo '{"suggested_roles":[{"title":"Backend Engineer"}]}'"#),
];

pub struct TestApp {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryProfileStore>,
    pub model: Option<Arc<StubModel>>,
    pub root: TempDir,
}

impl TestApp {
    /// App without a generative model configured.
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_model(reply: &str) -> Self {
        Self::build(Some(Arc::new(StubModel::new(reply))))
    }

    fn build(model: Option<Arc<StubModel>>) -> Self {
        let root = TempDir::new().unwrap();
        let scripts_dir = root.path().join("scripts");
        std::fs::create_dir_all(&scripts_dir).unwrap();
        for (name, body) in DEFAULT_SCRIPTS {
            std::fs::write(scripts_dir.join(name), body).unwrap();
        }

        let config = test_config(root.path(), &scripts_dir);
        let store = Arc::new(MemoryProfileStore::new());
        let state = web::Data::new(AppState {
            invoker: ProcessInvoker::new(config.invoker.clone()),
            config,
            store: store.clone() as Arc<dyn ProfileStore>,
            model: model.clone().map(|m| m as Arc<dyn GenerativeModel>),
        });

        Self { state, store, model, root }
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.path().join("scripts")
    }

    /// Replaces one stand-in script.
    pub fn write_script(&self, name: &str, body: &str) {
        std::fs::write(self.scripts_dir().join(name), body).unwrap();
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.state.config.uploads_dir
    }

    /// Upload folder of the user created by [`session`](Self::session).
    pub fn user_upload_dir(&self, name: &str, user_id: &ObjectId) -> PathBuf {
        upload_service::user_dir(self.uploads_dir(), name, user_id)
    }

    /// Stores a user and returns its id with a valid session cookie.
    pub async fn session(&self, name: &str, email: &str) -> (ObjectId, Cookie<'static>) {
        let user = self
            .store
            .insert_user(User::with_password(name.into(), email.into(), "unused".into()))
            .await
            .unwrap();
        let token = auth_service::generate_token(&user, JWT_SECRET).unwrap();
        let id = user.id.unwrap();
        (id, Cookie::new(auth_service::SESSION_COOKIE, token))
    }
}

fn test_config(root: &Path, scripts_dir: &Path) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        mongodb_uri: "mongodb://unused".into(),
        mongodb_database: None,
        jwt_secret: JWT_SECRET.into(),
        secure_cookies: false,
        client_url: "http://localhost:5173".into(),
        scripts: ScriptPaths::in_dir(scripts_dir),
        uploads_dir: root.join("uploads"),
        tmp_dir: root.join("tmp"),
        max_upload_bytes: 1024,
        bcrypt_cost: 4,
        invoker: InvokerConfig {
            interpreter: "sh".into(),
            timeout: Duration::from_secs(10),
            max_output_bytes: 64 * 1024,
            max_concurrency: 4,
            max_queue: 16,
        },
        gemini: None,
    }
}

/// Multipart body with the given `(field, filename, contents)` files and text fields.
pub fn multipart_body(files: &[(&str, &str, &str)], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, contents) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

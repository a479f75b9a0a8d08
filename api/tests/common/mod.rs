#![allow(dead_code)]

use api::auth::{self, TokenKind};
use api::AppState;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Database, IntoActiveModel};
use serde_json::Value;
use shared::domain::Plan;
use shared::entity::{rates, vendors};
use shared::models::RateInput;
use shared::{Cache, Config, RecordingTelegram, ServiceContext, Services};
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub telegram: Arc<RecordingTelegram>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.password_hash_cost = 4;
    config.bot_username = Some("VendoraBot".to_string());
    config.media_root = std::env::temp_dir()
        .join(format!("vendora-api-test-{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();
    config
}

pub async fn spawn_with(config: Config) -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let telegram = Arc::new(RecordingTelegram::new());
    let username = config.bot_username.clone();
    let ctx = ServiceContext {
        db: Arc::new(db),
        config: Arc::new(config),
        telegram: telegram.clone(),
        cache: Arc::new(Cache::memory()),
    };
    let state = AppState::new(Services::new(ctx), username);
    TestApp {
        app: api::app(state.clone()),
        state,
        telegram,
    }
}

pub async fn spawn() -> TestApp {
    spawn_with(test_config()).await
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestApp {
    pub fn services(&self) -> &Services {
        &self.state.services
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            headers,
            body,
            text,
        }
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.call(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub fn token(&self, vendor: &vendors::Model) -> String {
        auth::issue(self.state.config(), vendor.id, TokenKind::Access).unwrap()
    }

    pub async fn vendor(&self, email: &str, plan: Plan) -> vendors::Model {
        let v = self
            .services()
            .vendors
            .signup(email, "Ada Trades", "password123")
            .await
            .unwrap();
        if plan == Plan::Trial {
            v
        } else {
            self.services().vendors.set_plan(v.id, plan, None).await.unwrap()
        }
    }

    pub async fn update_vendor(&self, vendor: vendors::Model, f: impl FnOnce(&mut vendors::ActiveModel)) -> vendors::Model {
        let mut active = vendor.into_active_model();
        f(&mut active);
        active.update(self.services().db()).await.unwrap()
    }

    pub async fn rate(&self, vendor_id: i32, asset: &str, buy: i64, sell: i64) -> rates::Model {
        self.services()
            .rates
            .create(
                vendor_id,
                RateInput {
                    asset: asset.to_string(),
                    buy_rate: Decimal::from(buy),
                    sell_rate: Decimal::from(sell),
                    contract_address: Some("0xVendorWallet".to_string()),
                    bank_details: Some("GTBank 0123456789".to_string()),
                },
            )
            .await
            .unwrap()
    }
}

/// A `multipart/form-data` body with plain text fields only.
pub fn multipart(fields: &[(&str, &str)]) -> (String, Body) {
    let boundary = "vendora-test-boundary";
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            boundary, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", boundary));
    (format!("multipart/form-data; boundary={}", boundary), Body::from(body))
}

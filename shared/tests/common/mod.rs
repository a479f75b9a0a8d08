#![allow(dead_code)]

use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Database, IntoActiveModel};
use shared::domain::Plan;
use shared::entity::{rates, vendors};
use shared::models::RateInput;
use shared::{Cache, Config, RecordingTelegram, ServiceContext, Services};
use std::sync::Arc;

pub struct TestEnv {
    pub services: Services,
    pub telegram: Arc<RecordingTelegram>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.password_hash_cost = 4;
    config.media_root = std::env::temp_dir()
        .join(format!("vendora-test-{}", uuid::Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();
    config
}

pub async fn setup_with(config: Config) -> TestEnv {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let telegram = Arc::new(RecordingTelegram::new());
    let ctx = ServiceContext {
        db: Arc::new(db),
        config: Arc::new(config),
        telegram: telegram.clone(),
        cache: Arc::new(Cache::memory()),
    };
    TestEnv {
        services: Services::new(ctx),
        telegram,
    }
}

pub async fn setup() -> TestEnv {
    setup_with(test_config()).await
}

pub async fn vendor(env: &TestEnv, email: &str, plan: Plan) -> vendors::Model {
    let v = env
        .services
        .vendors
        .signup(email, "Ada Trades", "password123")
        .await
        .unwrap();
    if plan == Plan::Trial {
        v
    } else {
        env.services.vendors.set_plan(v.id, plan, None).await.unwrap()
    }
}

pub async fn update_vendor(env: &TestEnv, vendor: vendors::Model, f: impl FnOnce(&mut vendors::ActiveModel)) -> vendors::Model {
    let mut active = vendor.into_active_model();
    f(&mut active);
    active.update(env.services.db()).await.unwrap()
}

pub async fn rate(env: &TestEnv, vendor_id: i32, asset: &str, buy: i64, sell: i64) -> rates::Model {
    env.services
        .rates
        .create(
            vendor_id,
            RateInput {
                asset: asset.to_string(),
                buy_rate: Decimal::from(buy),
                sell_rate: Decimal::from(sell),
                contract_address: Some("0xVendorWallet".to_string()),
                bank_details: None,
            },
        )
        .await
        .unwrap()
}

pub fn staff(mut v: vendors::Model) -> vendors::Model {
    v.is_staff = true;
    v
}

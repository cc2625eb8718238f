#![allow(dead_code)]

use std::path::PathBuf;

use bill_server::auth::JwtConfig;
use bill_server::core::{Config, ServerState};
use bill_server::utils::time;
use chrono_tz::Asia::Kolkata;
use shared::models::{BillCreate, BillItem, ItemKind, PaymentMode};
use tempfile::TempDir;

pub fn test_config(data_dir: PathBuf) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        http_port: 0,
        data_dir,
        log_level: "info".to_string(),
        log_dir: None,
        jwt: JwtConfig {
            secret: "integration-test-secret-integration-test".to_string(),
            expiration_minutes: 60,
            issuer: "bill-server".to_string(),
            audience: "bill-clients".to_string(),
        },
        owner_username: "owner".to_string(),
        owner_password: "test-password-123".to_string(),
        timezone: Kolkata,
        public_base_url: "http://localhost:3000/b".to_string(),
        country_code: "91".to_string(),
    }
}

/// A fresh server state over a throwaway database. The TempDir must stay
/// alive for the duration of the test.
pub async fn test_state() -> (TempDir, ServerState) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(dir.path().to_path_buf());
    let state = ServerState::initialize(&config)
        .await
        .expect("Failed to initialize test state");
    (dir, state)
}

/// Midday (shop time) on the given calendar date, in Unix millis
pub fn midday_millis(date: &str) -> i64 {
    let date = time::parse_date(date).expect("Bad test date");
    time::day_start_millis(date, Kolkata) + 12 * 60 * 60 * 1000
}

pub fn saree_items() -> Vec<BillItem> {
    vec![BillItem {
        kind: ItemKind::Saree,
        custom_label: None,
        unit_price: 1500.0,
        quantity: 2,
    }]
}

pub fn sample_create(date: &str, phone: &str) -> BillCreate {
    BillCreate {
        date: midday_millis(date),
        customer_name: "Asha".to_string(),
        customer_phone: phone.to_string(),
        items: saree_items(),
        total_amount: 3000.0,
        payment_mode: PaymentMode::Cash,
    }
}

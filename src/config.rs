use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;

use crate::models::CommissionPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    /// Monthly base salary a driver's commission is reconciled against when
    /// no payroll row exists for the period (EUR).
    pub driver_base_salary: Decimal,
    /// Commission rate applied to new daily records, as a fraction (0.35 = 35%).
    pub driver_commission_rate: Decimal,
    /// Which commission formula new records default to. Historical records
    /// keep the policy they were created under.
    pub driver_commission_policy: CommissionPolicy,
    pub report_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a valid port number"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            driver_base_salary: env::var("DRIVER_BASE_SALARY")
                .unwrap_or_else(|_| "1400".to_string())
                .parse()
                .expect("DRIVER_BASE_SALARY must be a decimal amount"),
            driver_commission_rate: env::var("DRIVER_COMMISSION_RATE")
                .unwrap_or_else(|_| "0.35".to_string())
                .parse()
                .expect("DRIVER_COMMISSION_RATE must be a decimal fraction"),
            driver_commission_policy: env::var("DRIVER_COMMISSION_POLICY")
                .unwrap_or_else(|_| "gross".to_string())
                .parse()
                .expect("DRIVER_COMMISSION_POLICY must be 'gross' or 'post_expense'"),
            report_cache_ttl_secs: env::var("REPORT_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("REPORT_CACHE_TTL_SECS must be a number of seconds"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

use std::path::PathBuf;

pub const DATA_PATH_VAR: &str = "SALES_DATA_PATH";
pub const FORECAST_URL_VAR: &str = "SALES_FORECAST_URL";
pub const WHITELIST_VAR: &str = "SALES_WHITELIST";

pub const DEFAULT_DATA_PATH: &str = "data/data.csv";
pub const DEFAULT_FORECAST_URL: &str = "https://salesforecastak.streamlit.app/";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub forecast_url: String,
    pub whitelist: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Config {
            data_path: lookup(DATA_PATH_VAR)
                .unwrap_or(DEFAULT_DATA_PATH.to_string())
                .into(),
            forecast_url: lookup(FORECAST_URL_VAR).unwrap_or(DEFAULT_FORECAST_URL.to_string()),
            whitelist: lookup(WHITELIST_VAR).map(PathBuf::from),
        }
    }
}

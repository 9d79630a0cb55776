//! listkit bulk CSV export runtime.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use listkit_application::{
    BulkExporter, CsvQuoting, DEFAULT_BASE_PATH, DEFAULT_CHUNK_SIZE, DEFAULT_EXPORT_FILE_NAME,
    ExportOptions, ModelEndpoint,
};
use listkit_core::{AppError, AppResult};
use listkit_domain::QueryOptions;
use listkit_infrastructure::ReqwestHttpTransport;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 15;

#[derive(Debug, Clone)]
struct ExporterConfig {
    api_base_url: Url,
    api_token: Option<String>,
    model: String,
    base_path: String,
    chunk_size: u64,
    query: QueryOptions,
    output: String,
    http_timeout_seconds: u64,
    quoting: CsvQuoting,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ExporterConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let transport = Arc::new(ReqwestHttpTransport::new(
        http_client,
        config.api_base_url.clone(),
        config.api_token.clone(),
    ));
    let endpoint = ModelEndpoint::with_base_path(config.base_path.as_str(), config.model.as_str())?;

    info!(
        api_base_url = %config.api_base_url,
        model = %config.model,
        chunk_size = config.chunk_size,
        quoting = config.quoting.as_str(),
        "listkit-export started"
    );

    let exporter = BulkExporter::new(transport, endpoint).with_options(ExportOptions {
        chunk_size: config.chunk_size,
        quoting: config.quoting,
        file_name: config.output.clone(),
    });
    let export = exporter.export_csv(&config.query, None).await?;

    tokio::fs::write(export.file_name.as_str(), export.content.as_bytes())
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to write '{}': {error}", export.file_name))
        })?;

    info!(
        file_name = %export.file_name,
        rows = export.row_count,
        mime_type = export.mime_type(),
        "export written"
    );

    Ok(())
}

impl ExporterConfig {
    fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let api_base_url = required(&lookup, "LISTKIT_API_BASE_URL")?;
        let api_base_url = Url::parse(api_base_url.trim()).map_err(|error| {
            AppError::Validation(format!(
                "invalid LISTKIT_API_BASE_URL value '{api_base_url}': {error}"
            ))
        })?;
        let api_token = optional(&lookup, "LISTKIT_API_TOKEN");
        let model = required(&lookup, "LISTKIT_MODEL")?;
        let base_path =
            optional(&lookup, "LISTKIT_BASE_PATH").unwrap_or_else(|| DEFAULT_BASE_PATH.to_owned());
        let chunk_size = parse_u64(&lookup, "LISTKIT_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let query = match optional(&lookup, "LISTKIT_QUERY") {
            Some(raw) => serde_json::from_str::<QueryOptions>(raw.as_str()).map_err(|error| {
                AppError::Validation(format!("invalid LISTKIT_QUERY value: {error}"))
            })?,
            None => QueryOptions::new(),
        };
        let output = optional(&lookup, "LISTKIT_OUTPUT")
            .unwrap_or_else(|| DEFAULT_EXPORT_FILE_NAME.to_owned());
        let http_timeout_seconds = parse_u64(
            &lookup,
            "LISTKIT_HTTP_TIMEOUT_SECONDS",
            DEFAULT_HTTP_TIMEOUT_SECONDS,
        )?;
        let quoting = optional(&lookup, "LISTKIT_CSV_QUOTING")
            .map(|value| value.parse::<CsvQuoting>())
            .transpose()?
            .unwrap_or_default();

        if chunk_size == 0 {
            return Err(AppError::Validation(
                "LISTKIT_CHUNK_SIZE must be greater than zero".to_owned(),
            ));
        }

        if http_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "LISTKIT_HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_token,
            model,
            base_path,
            chunk_size,
            query,
            output,
            http_timeout_seconds,
            quoting,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    optional(lookup, name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> AppResult<u64> {
    match optional(lookup, name) {
        Some(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use listkit_application::CsvQuoting;
    use serde_json::json;

    use super::ExporterConfig;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_values_are_missing() {
        let config = ExporterConfig::from_lookup(lookup(&[
            ("LISTKIT_API_BASE_URL", "https://data.example.com/api"),
            ("LISTKIT_MODEL", "User"),
        ]));
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.base_path, "qnatk");
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.output, "file.csv");
        assert_eq!(config.http_timeout_seconds, 15);
        assert_eq!(config.quoting, CsvQuoting::Legacy);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn query_and_quoting_are_parsed() {
        let config = ExporterConfig::from_lookup(lookup(&[
            ("LISTKIT_API_BASE_URL", "https://data.example.com/api"),
            ("LISTKIT_MODEL", "User"),
            ("LISTKIT_QUERY", r#"{"where":{"active":true}}"#),
            ("LISTKIT_CSV_QUOTING", "rfc4180"),
            ("LISTKIT_API_TOKEN", "secret"),
        ]))
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(config.quoting, CsvQuoting::Rfc4180);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(
            serde_json::to_value(&config.query).unwrap_or_default(),
            json!({"where": {"active": true}})
        );
    }

    #[test]
    fn missing_model_is_rejected() {
        let result = ExporterConfig::from_lookup(lookup(&[(
            "LISTKIT_API_BASE_URL",
            "https://data.example.com/api",
        )]));

        assert!(result.is_err());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let result = ExporterConfig::from_lookup(lookup(&[
            ("LISTKIT_API_BASE_URL", "https://data.example.com/api"),
            ("LISTKIT_MODEL", "User"),
            ("LISTKIT_CHUNK_SIZE", "0"),
        ]));

        assert!(result.is_err());
    }
}

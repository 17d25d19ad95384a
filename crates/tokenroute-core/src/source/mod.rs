//! Metadata source implementations and construction from configuration.

mod http;
mod static_source;

pub use http::HttpMetadataSource;
pub use static_source::StaticMetadataSource;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use tokenroute_traits::MetadataSource;

use crate::config::SourceSettings;

/// Build the metadata source described by `settings`.
pub fn from_settings(settings: &SourceSettings) -> Result<Arc<dyn MetadataSource>> {
    match settings {
        SourceSettings::Http {
            base_url,
            api_key_env,
            timeout_secs,
        } => {
            let mut source = match timeout_secs {
                Some(secs) => HttpMetadataSource::with_timeout(base_url, Duration::from_secs(*secs)),
                None => HttpMetadataSource::new(base_url),
            };
            if let Some(var) = api_key_env {
                match std::env::var(var) {
                    Ok(key) if !key.trim().is_empty() => {
                        source = source.with_api_key(key.trim().to_string());
                    }
                    _ => warn!("API key variable {} is not set, sending unauthenticated requests", var),
                }
            }
            info!("Using HTTP metadata source at {}", base_url);
            Ok(Arc::new(source))
        }
        SourceSettings::Static { path } => {
            let source = StaticMetadataSource::load(path)
                .with_context(|| format!("Failed to load static metadata from {}", path.display()))?;
            Ok(Arc::new(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_static_settings_build_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[\"5\"]\nname = \"Five\"\ninvocations = 5\nactive = true\n")
            .unwrap();

        let source = from_settings(&SourceSettings::Static {
            path: file.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(source.name(), "static");
    }

    #[test]
    fn test_missing_static_file_is_an_error() {
        let result = from_settings(&SourceSettings::Static {
            path: "/nonexistent/metadata.toml".into(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_http_settings_build_source() {
        let source = from_settings(&SourceSettings::Http {
            base_url: "http://localhost:9".to_string(),
            api_key_env: Some("TOKENROUTE_TEST_UNSET_KEY".to_string()),
            timeout_secs: Some(5),
        })
        .unwrap();
        assert_eq!(source.name(), "http");
    }
}

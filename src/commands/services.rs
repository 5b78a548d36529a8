//! Service factory for building application dependencies.
//!
//! Services are built from configuration values but are not part of the
//! configuration itself.

use anyhow::Result;
use log::debug;

use crate::{http::HttpClient, provider::GitHubProvider};

use super::config::Config;

/// Container for the services a run needs.
pub struct Services {
    pub http_client: HttpClient,
    pub provider: GitHubProvider,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = build_http_client(config)?;
        let provider = build_provider(config, http_client.clone());
        Ok(Self {
            http_client,
            provider,
        })
    }
}

/// Build an HTTP client, authenticated when a token is configured
pub fn build_http_client(config: &Config) -> Result<HttpClient> {
    HttpClient::build(config.token.as_deref(), config.http_timeout)
}

/// Build the GitHub release source
pub fn build_provider(config: &Config, http_client: HttpClient) -> GitHubProvider {
    let provider = GitHubProvider::new(http_client, &config.api_url);
    debug!("Using GitHub API at {}", provider.api_url());
    provider
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ReleaseSource, RepoId};
    use mockito::{Matcher, Server};
    use std::path::PathBuf;
    use std::time::Duration;

    fn config(token: Option<&str>, api_url: &str) -> Config {
        Config {
            manifest_path: PathBuf::from("/tmp/repos.json"),
            commands_path: None,
            api_url: api_url.to_string(),
            token: token.map(String::from),
            http_timeout: Duration::from_secs(5),
        }
    }

    /// Verify the Authorization header sent by the built client
    async fn verify_authorization_header(token: Option<&str>) {
        let mut server = Server::new_async().await;

        let expected_header = match token {
            Some(t) => Matcher::Exact(format!("Bearer {}", t)),
            None => Matcher::Missing,
        };

        let mock = server
            .mock("GET", "/repos/o/app/releases/latest")
            .match_header("Authorization", expected_header)
            .match_header("User-Agent", "ghpm-cli")
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name": "v1.0"}"#)
            .create_async()
            .await;

        let services = Services::from_config(&config(token, &server.url())).unwrap();
        let release = services
            .provider
            .latest_release(&RepoId::new("o", "app"))
            .await
            .unwrap();
        assert_eq!(release.tag, "v1.0");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_services_with_github_token() {
        verify_authorization_header(Some("test_token")).await;
    }

    #[tokio::test]
    async fn test_services_without_github_token() {
        verify_authorization_header(None).await;
    }

    #[test]
    fn test_provider_uses_configured_api_url() {
        let services = Services::from_config(&config(None, "http://localhost:9999/")).unwrap();
        assert_eq!(services.provider.api_url(), "http://localhost:9999");
    }
}

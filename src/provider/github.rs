//! GitHub release source.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::http::HttpClient;

use super::{Release, ReleaseAsset, ReleaseSource, RepoId};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Releases per page when listing.
const PAGE_SIZE: usize = 100;

/// Upper bound on listed pages (1000 releases).
const MAX_PAGES: usize = 10;

/// GitHub API response types (internal).
mod api {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Release {
        pub tag_name: String,
        pub published_at: Option<String>,
        #[serde(default)]
        pub prerelease: bool,
        #[serde(default)]
        pub draft: bool,
        #[serde(default)]
        pub assets: Vec<Asset>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Asset {
        pub name: String,
        #[serde(default)]
        pub size: u64,
        pub browser_download_url: String,
    }
}

pub struct GitHubProvider {
    http_client: HttpClient,
    api_url: String,
}

impl GitHubProvider {
    pub fn new(http_client: HttpClient, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn releases_url(&self, repo: &RepoId) -> String {
        format!("{}/repos/{}/{}/releases", self.api_url, repo.owner, repo.repo)
    }
}

#[async_trait]
impl ReleaseSource for GitHubProvider {
    #[tracing::instrument(skip(self))]
    async fn latest_release(&self, repo: &RepoId) -> Result<Release> {
        let url = format!("{}/latest", self.releases_url(repo));
        debug!("Fetching latest release from {}...", url);

        let release: api::Release = self.http_client.get_json(&url).await?;
        Ok(release.into())
    }

    #[tracing::instrument(skip(self))]
    async fn releases(&self, repo: &RepoId) -> Result<Vec<Release>> {
        let url = self.releases_url(repo);
        let per_page = PAGE_SIZE.to_string();
        let mut releases = Vec::new();

        for page in 1..=MAX_PAGES {
            debug!("Fetching releases page {} from {}...", page, url);

            let page_number = page.to_string();
            let parsed: Vec<api::Release> = self
                .http_client
                .get_json_with_query(
                    &url,
                    &[("per_page", per_page.as_str()), ("page", page_number.as_str())],
                )
                .await?;

            let len = parsed.len();
            releases.extend(parsed.into_iter().map(Release::from));

            if len < PAGE_SIZE {
                break;
            }
        }

        Ok(releases)
    }
}

impl From<api::Release> for Release {
    fn from(r: api::Release) -> Self {
        Release {
            tag: r.tag_name,
            published_at: r.published_at,
            prerelease: r.prerelease,
            draft: r.draft,
            assets: r.assets.into_iter().map(ReleaseAsset::from).collect(),
        }
    }
}

impl From<api::Asset> for ReleaseAsset {
    fn from(a: api::Asset) -> Self {
        ReleaseAsset {
            name: a.name,
            size: a.size,
            download_url: a.browser_download_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::NonRetryableError;
    use reqwest::Client;
    use std::time::Duration;

    fn provider(url: &str) -> GitHubProvider {
        let http_client = HttpClient::new(Client::new()).with_retry_delay(Duration::from_millis(1));
        GitHubProvider::new(http_client, url)
    }

    #[test]
    fn test_api_url_trailing_slash() {
        let provider = GitHubProvider::new(HttpClient::new(Client::new()), "https://ghe.local/api/v3/");
        assert_eq!(provider.api_url(), "https://ghe.local/api/v3");
    }

    #[tokio::test]
    async fn test_latest_release() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/repos/owner/app/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "tag_name": "v1.2.0",
                    "name": "App 1.2.0",
                    "published_at": "2024-05-01T00:00:00Z",
                    "prerelease": false,
                    "draft": false,
                    "assets": [
                        {"name": "app_1.2.0_amd64.deb", "size": 2048, "browser_download_url": "https://example.com/app_1.2.0_amd64.deb"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let release = provider(&url)
            .latest_release(&RepoId::new("owner", "app"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(release.tag, "v1.2.0");
        assert!(!release.prerelease);
        assert_eq!(
            release.assets,
            vec![ReleaseAsset {
                name: "app_1.2.0_amd64.deb".into(),
                size: 2048,
                download_url: "https://example.com/app_1.2.0_amd64.deb".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_latest_release_not_found() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/repos/owner/app/releases/latest")
            .with_status(404)
            .create_async()
            .await;

        let err = provider(&url)
            .latest_release(&RepoId::new("owner", "app"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(
            err.downcast_ref::<NonRetryableError>(),
            Some(NonRetryableError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_releases_single_page() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/repos/owner/app/releases?per_page=100&page=1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"tag_name": "v2.0.0-rc1", "prerelease": true, "assets": []},
                    {"tag_name": "v1.9.0", "draft": true},
                    {"tag_name": "v1.8.0", "assets": []}
                ]"#,
            )
            .create_async()
            .await;

        let releases = provider(&url)
            .releases(&RepoId::new("owner", "app"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), 3);
        assert!(releases[0].prerelease);
        assert!(releases[1].draft);
        assert!(!releases[2].prerelease && !releases[2].draft);
    }

    #[tokio::test]
    async fn test_releases_multiple_pages() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let page1: Vec<String> = (0..100)
            .map(|i| format!(r#"{{"tag_name": "v1.0.{}"}}"#, i))
            .collect();

        let mock_p1 = server
            .mock("GET", "/repos/owner/app/releases?per_page=100&page=1")
            .with_status(200)
            .with_body(format!("[{}]", page1.join(",")))
            .create_async()
            .await;

        let mock_p2 = server
            .mock("GET", "/repos/owner/app/releases?per_page=100&page=2")
            .with_status(200)
            .with_body(r#"[{"tag_name": "v0.0.1"}]"#)
            .create_async()
            .await;

        let releases = provider(&url)
            .releases(&RepoId::new("owner", "app"))
            .await
            .unwrap();

        mock_p1.assert_async().await;
        mock_p2.assert_async().await;
        assert_eq!(releases.len(), 101);
        assert_eq!(releases[100].tag, "v0.0.1");
    }
}

use crate::error::PackageError;
use crate::http::HttpClient;
use crate::provider::ReleaseAsset;
use crate::runtime::Runtime;
use anyhow::{Context, anyhow};
use log::info;
use std::path::{Path, PathBuf};

/// Downloads a release asset into `dir` and returns the path of the file.
///
/// The file keeps the asset's name, which package managers such as
/// `apt-get` rely on to recognise a local `.deb`. A transfer whose length
/// differs from the size the release lists is rejected.
#[tracing::instrument(skip(runtime, http_client))]
pub async fn download_asset<R: Runtime>(
    runtime: &R,
    http_client: &HttpClient,
    asset: &ReleaseAsset,
    dir: &Path,
) -> Result<PathBuf, PackageError> {
    let file_name = Path::new(&asset.name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "asset".into());
    let path = dir.join(file_name);

    info!("Downloading {} to {:?}...", asset.download_url, path);

    let bytes = http_client
        .download_file(&asset.download_url, || {
            runtime
                .create_file(&path)
                .with_context(|| format!("Failed to create {:?}", path))
        })
        .await
        .map_err(|source| PackageError::Download {
            url: asset.download_url.clone(),
            source,
        })?;

    if asset.size > 0 && bytes != asset.size {
        return Err(PackageError::Download {
            url: asset.download_url.clone(),
            source: anyhow!(
                "received {} bytes, the release lists {}",
                bytes,
                asset.size
            ),
        });
    }

    info!("Download complete ({} bytes).", bytes);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use reqwest::Client;
    use std::time::Duration;

    fn asset(name: &str, url: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            size: 12,
            download_url: format!("{}/{}", url, name),
        }
    }

    #[tokio::test]
    async fn test_download_asset() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/app_1.0.deb")
            .with_status(200)
            .with_body("deb contents")
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_file()
            .with(eq(PathBuf::from("/tmp/ghpm-x/app_1.0.deb")))
            .times(1)
            .returning(|_| Ok(Box::new(std::io::sink())));

        let http_client = HttpClient::new(Client::new());
        let path = download_asset(
            &runtime,
            &http_client,
            &asset("app_1.0.deb", &url),
            Path::new("/tmp/ghpm-x"),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(path, PathBuf::from("/tmp/ghpm-x/app_1.0.deb"));
    }

    #[tokio::test]
    async fn test_download_asset_not_found() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/app_1.0.deb")
            .with_status(404)
            .create_async()
            .await;

        // No expectations: the file must not be created
        let runtime = MockRuntime::new();
        let http_client = HttpClient::new(Client::new()).with_retry_delay(Duration::from_millis(1));

        let err = download_asset(
            &runtime,
            &http_client,
            &asset("app_1.0.deb", &url),
            Path::new("/tmp/ghpm-x"),
        )
        .await
        .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, PackageError::Download { .. }));
    }

    #[tokio::test]
    async fn test_download_asset_rejects_truncated_transfer() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/app_1.0.deb")
            .with_status(200)
            .with_body("deb")
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_file()
            .returning(|_| Ok(Box::new(std::io::sink())));

        let err = download_asset(
            &runtime,
            &HttpClient::new(Client::new()),
            &asset("app_1.0.deb", &url),
            Path::new("/tmp/ghpm-x"),
        )
        .await
        .unwrap_err();

        match err {
            PackageError::Download { source, .. } => {
                assert_eq!(source.to_string(), "received 3 bytes, the release lists 12");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_download_asset_strips_directories_from_name() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("x")
            .create_async()
            .await;

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_file()
            .with(eq(PathBuf::from("/tmp/ghpm-x/evil.deb")))
            .returning(|_| Ok(Box::new(std::io::sink())));

        let release_asset = ReleaseAsset {
            name: "../../evil.deb".to_string(),
            size: 1,
            download_url: format!("{}/evil.deb", url),
        };

        let path = download_asset(
            &runtime,
            &HttpClient::new(Client::new()),
            &release_asset,
            Path::new("/tmp/ghpm-x"),
        )
        .await
        .unwrap();

        assert_eq!(path, PathBuf::from("/tmp/ghpm-x/evil.deb"));
    }
}

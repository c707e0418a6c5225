//! Kroki client for turning D2 text into SVG

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const D2_SVG_PATH: &str = "d2/svg";

/// HTTP client for a Kroki server
pub struct KrokiClient {
    client: Client,
    base_url: Url,
}

impl KrokiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // A trailing slash keeps any path prefix when joining
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)
        } else {
            Url::parse(&format!("{}/", base_url))
        }
        .context("Invalid Kroki URL")?;

        Ok(Self { client, base_url })
    }

    /// Render D2 text to SVG. Kroki only produces SVG for D2.
    pub async fn generate_svg(&self, diagram: &str) -> Result<Vec<u8>> {
        let url = self.base_url.join(D2_SVG_PATH).context("Invalid Kroki path")?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(diagram.to_string())
            .send()
            .await
            .context("Failed to send request to Kroki")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Kroki returned status {}: {}", status, body);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read Kroki response")?;
        Ok(bytes.to_vec())
    }
}

/// Force a `.svg` extension on the image destination
pub fn svg_output_path(path: &Path) -> PathBuf {
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        path.to_path_buf()
    } else {
        path.with_extension("svg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#;

    #[tokio::test]
    async fn test_generate_svg_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/d2/svg")
            .match_header("content-type", "text/plain")
            .match_body("a -> b")
            .with_status(200)
            .with_body(SVG)
            .create_async()
            .await;

        let client = KrokiClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let svg = client.generate_svg("a -> b").await.unwrap();

        assert_eq!(svg, SVG.as_bytes());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_svg_keeps_path_prefix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/kroki/d2/svg")
            .with_status(200)
            .with_body(SVG)
            .create_async()
            .await;

        let client = KrokiClient::new(&format!("{}/kroki", server.url()), Duration::from_secs(5)).unwrap();
        client.generate_svg("a -> b").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_svg_bad_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/d2/svg")
            .with_status(400)
            .with_body("invalid diagram syntax")
            .create_async()
            .await;

        let client = KrokiClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = client.generate_svg("invalid diagram").await.unwrap_err();

        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("invalid diagram syntax"));
    }

    #[tokio::test]
    async fn test_generate_svg_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/d2/svg")
            .with_status(500)
            .with_body("internal server error")
            .create_async()
            .await;

        let client = KrokiClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(client.generate_svg("a -> b").await.is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(KrokiClient::new("not a url", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_svg_output_path() {
        assert_eq!(svg_output_path(Path::new("out.svg")), PathBuf::from("out.svg"));
        assert_eq!(svg_output_path(Path::new("out.SVG")), PathBuf::from("out.SVG"));
        assert_eq!(svg_output_path(Path::new("out.png")), PathBuf::from("out.svg"));
        assert_eq!(svg_output_path(Path::new("diagrams/out")), PathBuf::from("diagrams/out.svg"));
    }
}

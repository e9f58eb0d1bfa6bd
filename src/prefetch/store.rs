use crate::prefetch::artifact::{ArtifactListing, MatrixPair};
use crate::transport::{check_status, HttpTransport, JsonTransport, TransportError};
use async_compression::tokio::bufread::GzipDecoder;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::info;
use tokio::io::{AsyncBufRead, AsyncReadExt};
use tokio_util::io::StreamReader;

/// Remote storage of the flow artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Every available artifact, in no particular order.
    async fn list(&self) -> Result<Vec<ArtifactListing>, TransportError>;

    async fn download(&self, id: &str) -> Result<MatrixPair, TransportError>;
}

/// Artifacts served over HTTP: `<base>/index.json` lists them, `<base>/<id>` serves one.
/// Ids ending in `.gz` are gzip-compressed objects.
#[derive(Debug, Clone)]
pub struct HttpArtifactStore {
    base_url: String,
    transport: HttpTransport,
}

impl HttpArtifactStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, HttpTransport::new())
    }

    pub fn with_transport(base_url: impl Into<String>, transport: HttpTransport) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn list(&self) -> Result<Vec<ArtifactListing>, TransportError> {
        let url = self.url_for("index.json");
        let index = self.transport.get_json(&url, &[]).await?;
        Ok(serde_json::from_value(index)?)
    }

    async fn download(&self, id: &str) -> Result<MatrixPair, TransportError> {
        let url = self.url_for(id);
        info!("Downloading artifact from {}", url);

        let response = self
            .transport
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::NetworkRequest(url.clone(), e))?;
        let response = check_status(&url, response)?;

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        decode_matrices(StreamReader::new(stream), id).await
    }
}

/// Reads one artifact body, gunzipping it first when `id` ends in `.gz`.
async fn decode_matrices<R>(mut reader: R, id: &str) -> Result<MatrixPair, TransportError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut body = Vec::new();
    if id.ends_with(".gz") {
        GzipDecoder::new(reader).read_to_end(&mut body).await?;
    } else {
        reader.read_to_end(&mut body).await?;
    }
    info!("Downloaded {} bytes for artifact '{}'", body.len(), id);

    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::GzipEncoder;

    const FIELD: &str = "[[[0.25, null], [-1.5, 2.0]], [[0.5, null], [0.0, -0.75]]]";

    fn assert_field(pair: &MatrixPair) {
        assert_eq!(pair.u, vec![vec![Some(0.25), None], vec![Some(-1.5), Some(2.0)]]);
        assert_eq!(pair.v, vec![vec![Some(0.5), None], vec![Some(0.0), Some(-0.75)]]);
    }

    #[test]
    fn test_urls_join_base_and_id() {
        let store = HttpArtifactStore::new("https://storage.example.org/flow/");
        assert_eq!(
            store.url_for("index.json"),
            "https://storage.example.org/flow/index.json"
        );
        assert_eq!(
            store.url_for("/2024/0601-12.json.gz"),
            "https://storage.example.org/flow/2024/0601-12.json.gz"
        );
    }

    #[tokio::test]
    async fn test_gzip_artifacts_are_decompressed() -> Result<(), TransportError> {
        let mut compressed = Vec::new();
        GzipEncoder::new(FIELD.as_bytes())
            .read_to_end(&mut compressed)
            .await?;

        let pair = decode_matrices(&compressed[..], "2024/0601-12.json.gz").await?;
        assert_field(&pair);
        Ok(())
    }

    #[tokio::test]
    async fn test_plain_artifacts_are_parsed_as_is() -> Result<(), TransportError> {
        let pair = decode_matrices(FIELD.as_bytes(), "2024/0601-12.json").await?;
        assert_field(&pair);

        // A compressed body under a plain id is not valid JSON.
        let mut compressed = Vec::new();
        GzipEncoder::new(FIELD.as_bytes())
            .read_to_end(&mut compressed)
            .await?;
        let err = decode_matrices(&compressed[..], "2024/0601-12.json")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::JsonParse(_)));
        Ok(())
    }
}

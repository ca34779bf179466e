use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tokio::runtime::Runtime;

use crate::artifact::ArchiveArtifact;
use crate::error::ArchiveError;
use crate::ArchiveUploader;

/// Remote folder an uploader writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTarget {
    pub endpoint: String,
    pub folder: String,
    pub token: String,
}

impl ArchiveTarget {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        folder: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            folder: folder.into(),
            token: token.into(),
        }
    }

    /// `{endpoint}/{folder}/{file_name}`, with each segment percent-encoded.
    pub fn object_url(&self, file_name: &str) -> Result<Url, ArchiveError> {
        let invalid = |reason: &str| ArchiveError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(self.endpoint.trim()).map_err(|error| invalid(&error.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| invalid("endpoint cannot carry a path"))?;
            segments
                .pop_if_empty()
                .extend(self.folder.split('/').filter(|segment| !segment.is_empty()))
                .push(file_name);
        }
        Ok(url)
    }
}

/// Uploads artifacts with an authenticated HTTP `PUT`.
pub struct HttpArchiveUploader {
    http: Client,
    runtime: Runtime,
    target: ArchiveTarget,
}

impl HttpArchiveUploader {
    pub fn new(target: ArchiveTarget, timeout: Option<Duration>) -> Result<Self, ArchiveError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ArchiveError::Runtime)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            runtime,
            target,
        })
    }

    #[must_use]
    pub fn target(&self) -> &ArchiveTarget {
        &self.target
    }
}

impl ArchiveUploader for HttpArchiveUploader {
    fn upload(&self, artifact: &ArchiveArtifact) -> Result<String, ArchiveError> {
        let url = self.target.object_url(&artifact.file_name)?;

        self.runtime.block_on(async {
            let response = self
                .http
                .put(url.clone())
                .bearer_auth(&self.target.token)
                .header(CONTENT_TYPE, artifact.content_type)
                .body(artifact.body.clone())
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ArchiveError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            Ok(())
        })?;

        tracing::info!(file = %artifact.file_name, location = %url, "transcript archived");
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_joins_endpoint_folder_and_file() {
        let target = ArchiveTarget::new("https://store.example/v1/", "study/2024", "t");

        let url = target.object_url("r 1_transcript.csv").expect("valid url");

        assert_eq!(
            url.as_str(),
            "https://store.example/v1/study/2024/r%201_transcript.csv"
        );
    }

    #[test]
    fn object_url_rejects_unparseable_endpoint() {
        let target = ArchiveTarget::new("not a url", "folder", "t");

        assert!(matches!(
            target.object_url("file.csv"),
            Err(ArchiveError::InvalidEndpoint { .. })
        ));
    }
}

//! Encoding the composited surface and uploading it.

use teaser_common::error::{TeaserError, TeaserResult};
use teaser_grid_model::format::{OutputFormat, OutputQuality};

use crate::compositor::GridCompositor;
use crate::surface::RasterSurface;

/// Highest status treated as a successful upload. 0 is accepted for
/// transports that have no HTTP status.
pub const MAX_SUCCESS_STATUS: u16 = 204;

/// An encoded snapshot of the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One upload: the encoded blob PUT to `url`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Attach the transport's credentials (cookies, authorization).
    pub include_credentials: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub status_text: String,
}

/// Carries an encoded blob to its destination.
#[async_trait::async_trait]
pub trait UploadTransport: Send + Sync {
    /// Perform exactly one PUT. Non-success statuses are returned, not
    /// raised; only failures to complete the exchange are errors.
    async fn put(&self, request: UploadRequest) -> TeaserResult<UploadResponse>;

    /// Transport name for logs.
    fn name(&self) -> &str;
}

/// Encode `surface` with the given parameters.
pub fn encode_surface<S: RasterSurface + ?Sized>(
    surface: &S,
    format: OutputFormat,
    quality: OutputQuality,
) -> TeaserResult<EncodedImage> {
    let bytes = surface.encode(format, quality).map_err(|e| match e {
        TeaserError::EncodeFailure { .. } => e,
        other => TeaserError::encode(other.to_string()),
    })?;
    tracing::debug!(
        format = %format,
        quality = %quality,
        bytes = bytes.len(),
        "Surface encoded"
    );
    Ok(EncodedImage { format, bytes })
}

/// PUT `image` to `url` and map the status onto success or
/// [`TeaserError::UploadFailure`].
pub async fn upload<T: UploadTransport + ?Sized>(
    transport: &T,
    url: &str,
    image: EncodedImage,
) -> TeaserResult<u16> {
    let bytes = image.len();
    let request = UploadRequest {
        url: url.to_string(),
        content_type: image.mime_type(),
        body: image.bytes,
        include_credentials: true,
    };

    let response = transport.put(request).await?;
    if response.status <= MAX_SUCCESS_STATUS {
        tracing::info!(
            url,
            status = response.status,
            bytes,
            transport = transport.name(),
            "Teaser uploaded"
        );
        Ok(response.status)
    } else {
        tracing::warn!(
            url,
            status = response.status,
            status_text = %response.status_text,
            transport = transport.name(),
            "Upload rejected"
        );
        Err(TeaserError::UploadFailure {
            status: response.status,
            status_text: response.status_text,
        })
    }
}

impl<S: RasterSurface> GridCompositor<S> {
    /// Encode the surface as it is now, using the configured output
    /// format and quality.
    pub fn export(&self) -> TeaserResult<EncodedImage> {
        encode_surface(self.surface(), self.output_format(), self.output_quality())
    }

    /// Wait for pending loads, encode, and PUT the result to `url`.
    ///
    /// Resolves to the response status when it is at most 204.
    pub async fn save<T: UploadTransport + ?Sized>(
        &mut self,
        url: &str,
        transport: &T,
    ) -> TeaserResult<u16> {
        self.settle().await;
        let image = self.export()?;
        upload(transport, url, image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::loader::FsFetcher;
    use crate::surface::mock::RecordingSurface;

    /// Replies with a fixed status and records each request.
    struct CannedTransport {
        status: u16,
        status_text: &'static str,
        requests: Mutex<Vec<UploadRequest>>,
    }

    impl CannedTransport {
        fn new(status: u16, status_text: &'static str) -> Self {
            Self {
                status,
                status_text,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl UploadTransport for CannedTransport {
        async fn put(&self, request: UploadRequest) -> TeaserResult<UploadResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(UploadResponse {
                status: self.status,
                status_text: self.status_text.to_string(),
            })
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn compositor() -> GridCompositor<RecordingSurface> {
        let mut c = GridCompositor::new(RecordingSurface::new(64, 64), Arc::new(FsFetcher));
        c.set_dimensions("1,1").unwrap();
        c
    }

    #[test]
    fn test_export_uses_configured_format_and_quality() {
        let mut c = compositor();
        c.set_output_format("png").unwrap();
        c.set_output_quality(0.5f64).unwrap();
        let image = c.export().unwrap();
        assert_eq!(image.format, OutputFormat::Png);
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes, b"image/png|0.5".to_vec());
    }

    #[test]
    fn test_encoder_rejection_is_encode_failure() {
        let mut c = compositor();
        c.surface_mut().reject_encode = true;
        assert!(matches!(c.export(), Err(TeaserError::EncodeFailure { .. })));
    }

    #[tokio::test]
    async fn test_save_resolves_with_success_status() {
        let mut c = compositor();
        let transport = CannedTransport::new(204, "No Content");
        let status = c.save("https://x/img", &transport).await.unwrap();
        assert_eq!(status, 204);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://x/img");
        assert_eq!(requests[0].content_type, "image/jpeg");
        assert!(requests[0].include_credentials);
    }

    #[tokio::test]
    async fn test_save_rejects_above_204() {
        let mut c = compositor();
        let transport = CannedTransport::new(500, "Server Error");
        let err = c.save("https://x/img", &transport).await.unwrap_err();
        assert_eq!(err.to_string(), "500: Server Error");
        assert!(matches!(err, TeaserError::UploadFailure { status: 500, .. }));
        assert_eq!(transport.requests.lock().unwrap().len(), 1, "no retry");

        let redirect = CannedTransport::new(205, "Reset Content");
        assert!(c.save("https://x/img", &redirect).await.is_err());
    }

    #[tokio::test]
    async fn test_status_zero_counts_as_success() {
        let mut c = compositor();
        let transport = CannedTransport::new(0, "");
        assert_eq!(c.save("https://x/img", &transport).await.unwrap(), 0);
    }
}

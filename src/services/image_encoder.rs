// src/services/image_encoder.rs
use crate::errors::StyleError;
use crate::models::{EncodedImagePart, SelectedImage};
use base64::{Engine as _, engine::general_purpose};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads the whole resource and pairs its base64 form with the declared MIME type.
/// The bytes are not inspected.
pub async fn encode_reader<R>(
    mut reader: R,
    mime_type: &str,
) -> Result<EncodedImagePart, StyleError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).await?;

    Ok(EncodedImagePart::new(
        general_purpose::STANDARD.encode(&buffer),
        mime_type,
    ))
}

pub async fn encode_selected(image: &SelectedImage) -> Result<EncodedImagePart, StyleError> {
    encode_reader(&image.bytes[..], &image.mime_type).await
}

/// Picks the MIME type for an upload: an `image/*` declaration wins, a missing or
/// generic declaration falls back to sniffing the bytes.
pub fn resolve_image_mime(declared: Option<&str>, data: &[u8]) -> Result<String, StyleError> {
    match declared {
        Some(mime) if mime.starts_with("image/") => Ok(mime.to_string()),
        None | Some("application/octet-stream") => image::guess_format(data)
            .map(|format| format.to_mime_type().to_string())
            .map_err(|e| StyleError::Validation(format!("Unrecognized image content: {}", e))),
        Some(other) => Err(StyleError::Validation(format!(
            "Selected file is not an image ({})",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    struct BrokenReader;

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "disk went away")))
        }
    }

    #[tokio::test]
    async fn encodes_bytes_with_declared_mime() {
        let image = SelectedImage::new("me.jpg", "image/jpeg", Bytes::from_static(b"hello"));
        let part = encode_selected(&image).await.unwrap();
        assert_eq!(part, EncodedImagePart::new("aGVsbG8=", "image/jpeg"));
    }

    #[tokio::test]
    async fn read_failure_surfaces_as_io_error() {
        let err = encode_reader(BrokenReader, "image/png").await.unwrap_err();
        assert!(matches!(err, StyleError::Io(ref msg) if msg.contains("disk went away")));
    }

    #[test]
    fn declared_image_type_is_trusted() {
        let mime = resolve_image_mime(Some("image/webp"), b"not really webp").unwrap();
        assert_eq!(mime, "image/webp");
    }

    #[test]
    fn missing_type_is_sniffed() {
        assert_eq!(resolve_image_mime(None, PNG_MAGIC).unwrap(), "image/png");
        assert_eq!(
            resolve_image_mime(Some("application/octet-stream"), PNG_MAGIC).unwrap(),
            "image/png"
        );
    }

    #[test]
    fn non_image_types_are_rejected() {
        assert!(matches!(
            resolve_image_mime(Some("text/plain"), PNG_MAGIC),
            Err(StyleError::Validation(_))
        ));
        assert!(matches!(
            resolve_image_mime(None, b"plain text"),
            Err(StyleError::Validation(_))
        ));
    }
}

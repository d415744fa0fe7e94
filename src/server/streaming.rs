//! Chunked plain-text responses.
//!
//! The body has no length, so hyper sends it with
//! `Transfer-Encoding: chunked`, one chunk per item of the stream.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::Stream;

use crate::error::TEXT_PLAIN_UTF8;

/// Wrap a byte stream into a `200 OK` chunked `text/plain` response.
pub fn chunked_text_response<S>(body: S) -> Response
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    (
        [
            (header::CONTENT_TYPE, TEXT_PLAIN_UTF8),
            (header::CACHE_CONTROL, "no-cache"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use futures::stream;

    #[tokio::test]
    async fn test_chunked_response_headers_and_body() {
        let chunks = vec![
            Ok::<_, Infallible>(Bytes::from_static(b"uno ")),
            Ok(Bytes::from_static(b"dos")),
        ];
        let response = chunked_text_response(stream::iter(chunks));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"uno dos");
    }
}

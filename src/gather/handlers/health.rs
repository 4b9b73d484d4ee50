use axum::{http::HeaderMap, response::IntoResponse};

// axum handler for the liveness check
pub async fn ping() -> impl IntoResponse {
    let mut headers = HeaderMap::new();

    if let Ok(value) = format!(
        "{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (headers, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_ping_returns_ok() {
        let response = ping().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024).await.expect("body");
        assert_eq!(&body[..], b"OK");
    }
}

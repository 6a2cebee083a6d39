//! Request extractors whose rejections are reported as [Error]s.
//!
//! Axum's own extractors reject malformed input with a plain text body. These
//! wrappers turn the rejection into [Error::InvalidRequest] so that every
//! client error carries the same JSON `detail` body.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection, QueryRejection},
};

use crate::Error;

/// A JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// The query string of a request.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);

/// Parameters captured from the request path.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::{ApiJson, ApiPath, ApiQuery};

    #[derive(Deserialize)]
    struct Body {
        amount: i64,
    }

    #[derive(Deserialize)]
    struct Params {
        currency: String,
    }

    async fn handler(
        ApiPath(id): ApiPath<i64>,
        ApiQuery(params): ApiQuery<Params>,
        ApiJson(body): ApiJson<Body>,
    ) -> String {
        format!("{id} {} {}", params.currency, body.amount)
    }

    fn get_test_server() -> TestServer {
        let app = Router::new().route("/items/{id}", post(handler));

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn valid_request_is_extracted() {
        let server = get_test_server();

        let response = server
            .post("/items/3")
            .add_query_param("currency", "USD")
            .json(&json!({ "amount": 5 }))
            .await;

        response.assert_status_ok();
        response.assert_text("3 USD 5");
    }

    #[tokio::test]
    async fn missing_body_field_is_a_json_error() {
        let server = get_test_server();

        let response = server
            .post("/items/3")
            .add_query_param("currency", "USD")
            .json(&json!({ "price": 5 }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let detail = response.json::<Value>()["detail"].as_str().unwrap().to_owned();
        assert!(detail.contains("amount"), "got {detail:?}");
    }

    #[tokio::test]
    async fn missing_query_parameter_is_a_json_error() {
        let server = get_test_server();

        let response = server
            .post("/items/3")
            .json(&json!({ "amount": 5 }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["detail"].is_string());
    }

    #[tokio::test]
    async fn malformed_path_parameter_is_a_json_error() {
        let server = get_test_server();

        let response = server
            .post("/items/abc")
            .add_query_param("currency", "USD")
            .json(&json!({ "amount": 5 }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["detail"].is_string());
    }
}

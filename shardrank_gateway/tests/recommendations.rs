mod common;

use ::shardrank_common::{
    anyhow::anyhow,
    error::{Result, ShardRankError},
    serde_json::json,
    tokio,
};
use ::shardrank_gateway::recommendation::RecommendationResponse;
use common::{get_test_server, MockBackend};
use http::StatusCode;

#[tokio::test]
async fn undefined_handler() -> Result<()> {
    let backend = MockBackend::new();
    let server = get_test_server(backend).await?;

    let response = server.get("/any").await;

    response.assert_status_not_found();
    Ok(())
}

#[tokio::test]
async fn root_get_request() -> Result<()> {
    let backend = MockBackend::new();
    let server = get_test_server(backend).await?;

    let response = server.get("/").await;

    response.assert_status_ok();
    response.assert_text("welcome to shardrank");
    Ok(())
}

#[tokio::test]
async fn recommend_products() -> Result<()> {
    let mut backend = MockBackend::new();
    backend
        .expect_recommend()
        .withf(|product_name| product_name == "P1")
        .times(1)
        .returning(|_| Ok(vec!["P3".to_owned(), "P2".to_owned()]));
    let server = get_test_server(backend).await?;

    let response = server
        .post("/recommendations")
        .json(&json!({
            "product_name": "P1"
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&RecommendationResponse {
        recommendations: vec!["P3".to_owned(), "P2".to_owned()],
    });
    Ok(())
}

#[tokio::test]
async fn nothing_to_recommend_yet() -> Result<()> {
    let mut backend = MockBackend::new();
    backend
        .expect_recommend()
        .times(1)
        .returning(|_| Ok(vec![]));
    let server = get_test_server(backend).await?;

    let response = server
        .post("/recommendations")
        .json(&json!({
            "product_name": "P1"
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "recommendations": []
    }));
    Ok(())
}

#[tokio::test]
async fn backend_unavailable() -> Result<()> {
    let mut backend = MockBackend::new();
    backend
        .expect_recommend()
        .times(1)
        .returning(|_| Err(ShardRankError::backend_unavailable(anyhow!("connection refused"))));
    let server = get_test_server(backend).await?;

    let response = server
        .post("/recommendations")
        .json(&json!({
            "product_name": "P1"
        }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    response.assert_text("Backend unavailable: connection refused");
    Ok(())
}

#[tokio::test]
async fn multi_line_product_name() -> Result<()> {
    let mut backend = MockBackend::new();
    backend
        .expect_recommend()
        .times(1)
        .returning(|_| Err(ShardRankError::not_allowed(anyhow!("spans several lines"))));
    let server = get_test_server(backend).await?;

    let response = server
        .post("/recommendations")
        .json(&json!({
            "product_name": "P1\nP2"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn recommend_with_missing_field() -> Result<()> {
    let backend = MockBackend::new();
    let server = get_test_server(backend).await?;

    let response = server
        .post("/recommendations")
        .json(&json!({
            "name": "P1"
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().contains("missing field `product_name`"));
    Ok(())
}

#[tokio::test]
async fn websocket_requires_an_upgrade() -> Result<()> {
    let backend = MockBackend::new();
    let server = get_test_server(backend).await?;

    let response = server.get("/ws").await;

    assert!(response.status_code().is_client_error());
    Ok(())
}

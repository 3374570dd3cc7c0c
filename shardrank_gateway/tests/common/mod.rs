use ::axum_test::TestServer;
use ::mockall::mock;
use ::shardrank_common::{
    error::{Result, ShardRankError},
    node::ProductId,
};
use ::shardrank_gateway::{backend::RecommendationBackend, get_gateway};

mock! {
    pub Backend{}
    impl RecommendationBackend for Backend {
        async fn recommend(&self, product_name: &str) -> Result<Vec<ProductId>>;
    }
}

pub async fn get_test_server(backend: MockBackend) -> Result<TestServer> {
    let app = get_gateway(backend)?;
    TestServer::new(app).map_err(ShardRankError::fail_to_bind)
}

//! Asset host client against the in-process fake host.

#![allow(clippy::unwrap_used)]

use souk_api::services::assets::{AssetError, CloudinaryClient};
use souk_integration_tests::FakeAssetHost;

#[tokio::test]
async fn test_upload_then_destroy() {
    let host = FakeAssetHost::start().await;
    let client = CloudinaryClient::new(&host.config()).unwrap();

    let asset = client
        .upload(vec![0x89, b'P', b'N', b'G'], "shoe.png", "image/png")
        .await
        .unwrap();
    assert_eq!(asset.asset_id, "ecommerce_products/asset1");
    assert_eq!(
        asset.url,
        "https://res.example.com/ecommerce_products/asset1.png"
    );
    assert_eq!(host.stored().await, vec![asset.asset_id.clone()]);

    assert!(client.destroy(&asset.asset_id).await.unwrap());
    assert!(host.stored().await.is_empty());
    assert_eq!(host.destroy_requests().await, vec![asset.asset_id]);
}

#[tokio::test]
async fn test_destroy_unknown_asset_reports_not_found() {
    let host = FakeAssetHost::start().await;
    let client = CloudinaryClient::new(&host.config()).unwrap();

    assert!(!client.destroy("ecommerce_products/gone").await.unwrap());
}

#[tokio::test]
async fn test_refused_destroy_is_an_error() {
    let host = FakeAssetHost::start().await;
    let client = CloudinaryClient::new(&host.config()).unwrap();
    host.seed("ecommerce_products/kept").await;
    host.refuse_destroy(true);

    let err = client.destroy("ecommerce_products/kept").await.unwrap_err();
    assert!(matches!(err, AssetError::NotDeleted { ref result, .. } if result == "error"));
    assert_eq!(host.stored().await, vec!["ecommerce_products/kept"]);
}

#[tokio::test]
async fn test_wrong_secret_is_an_api_error() {
    let host = FakeAssetHost::start().await;
    let client = CloudinaryClient::new(&host.config_with_secret("some-other-secret")).unwrap();

    let err = client
        .upload(vec![1, 2, 3], "shoe.png", "image/png")
        .await
        .unwrap_err();
    assert!(matches!(err, AssetError::Api { status: 401, .. }));
    assert!(host.stored().await.is_empty());
}

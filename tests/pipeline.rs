//! End-to-end tests for the secure render pipeline.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;

mod common;
use common::{
    client, extract_nonce, start_gateway, test_config, FailingRenderer, RecordingRenderer,
    StubRenderer, DOCUMENT,
};

#[tokio::test]
async fn header_nonce_matches_body_nonce() {
    let gateway = start_gateway(
        test_config(),
        Arc::new(StubRenderer(DOCUMENT.to_string())),
    )
    .await;

    let response = client().get(gateway.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let csp = response
        .headers()
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let nonce = extract_nonce(&csp);
    assert_eq!(nonce.len(), 64, "32 random bytes, hex encoded");

    assert!(csp.contains(&format!("script-src 'self' 'strict-dynamic' 'nonce-{nonce}'")));
    assert!(csp.contains(&format!("style-src 'self' 'nonce-{nonce}'")));

    let body = response.text().await.unwrap();
    assert!(!body.contains("randomNonceGoesHere"));
    assert_eq!(
        body.matches(&nonce).count(),
        2,
        "both placeholder occurrences carry the header's nonce"
    );
}

#[tokio::test]
async fn nonces_never_repeat_across_requests() {
    let gateway = start_gateway(
        test_config(),
        Arc::new(StubRenderer(DOCUMENT.to_string())),
    )
    .await;
    let client = client();

    let mut seen = HashSet::new();
    for _ in 0..20 {
        let response = client.get(gateway.url("/")).send().await.unwrap();
        let csp = response
            .headers()
            .get("content-security-policy")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(seen.insert(extract_nonce(&csp)), "nonce reused across requests");
    }
}

#[tokio::test]
async fn render_failure_yields_a_generic_500() {
    let gateway = start_gateway(test_config(), Arc::new(FailingRenderer)).await;

    let response = client().get(gateway.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.text().await.unwrap();
    assert_eq!(body, "Internal Server Error");
    assert!(!body.contains("randomNonceGoesHere"));
    assert!(!body.contains("offline"), "no failure detail leaks");
}

#[tokio::test]
async fn every_response_carries_hsts() {
    let gateway = start_gateway(test_config(), Arc::new(FailingRenderer)).await;
    let client = client();
    let expected = "max-age=31536000; includeSubDomains; preload";

    let rendered = client.get(gateway.url("/")).send().await.unwrap();
    assert_eq!(
        rendered.headers().get("strict-transport-security").unwrap(),
        expected,
        "error responses included"
    );

    let post = client.post(gateway.url("/anywhere")).send().await.unwrap();
    assert_eq!(post.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        post.headers().get("strict-transport-security").unwrap(),
        expected
    );
}

#[tokio::test]
async fn rendered_responses_carry_the_fixed_hardening_headers() {
    let gateway = start_gateway(
        test_config(),
        Arc::new(StubRenderer(DOCUMENT.to_string())),
    )
    .await;

    let response = client().get(gateway.url("/")).send().await.unwrap();
    let headers = response.headers();

    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(headers.get("x-request-id").is_some());

    let csp = headers
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("default-src 'self'"));
    assert!(csp.contains("frame-ancestors 'none'"));
    assert!(csp.contains("img-src 'self' data: blob:"));
    assert!(csp.contains("font-src 'self' data:"));
    assert!(csp.contains("connect-src 'self'"));
}

#[tokio::test]
async fn non_get_on_unmatched_paths_is_a_plain_404() {
    let gateway = start_gateway(
        test_config(),
        Arc::new(StubRenderer(DOCUMENT.to_string())),
    )
    .await;

    let response = client()
        .delete(gateway.url("/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.text().await.unwrap();
    assert!(!body.contains("app shell"), "no document is rendered");
}

#[tokio::test]
async fn renderer_receives_the_fully_qualified_url() {
    let renderer = Arc::new(RecordingRenderer::default());
    let gateway = start_gateway(test_config(), renderer.clone()).await;

    client()
        .get(gateway.url("/dashboard?tab=2"))
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();

    let recorded = renderer.last.lock().await.clone().unwrap();
    assert_eq!(
        recorded.url,
        format!("https://{}/dashboard?tab=2", gateway.addr)
    );
    assert_eq!(recorded.base_href, "/");
    assert_eq!(recorded.bootstrap, "./main.server");
}

#[tokio::test]
async fn large_documents_are_compressed_small_ones_are_not() {
    let large = format!(
        "<html><body><script nonce=\"randomNonceGoesHere\"></script>{}</body></html>",
        "x".repeat(4096)
    );
    let gateway = start_gateway(test_config(), Arc::new(StubRenderer(large))).await;
    let client = client();

    let response = client
        .get(gateway.url("/"))
        .header("accept-encoding", "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("content-encoding").unwrap(),
        "gzip",
        "bodies above the threshold are compressed"
    );

    let small_gateway = start_gateway(
        test_config(),
        Arc::new(StubRenderer("<html>tiny</html>".to_string())),
    )
    .await;
    let response = client
        .get(small_gateway.url("/"))
        .header("accept-encoding", "gzip")
        .send()
        .await
        .unwrap();
    assert!(
        response.headers().get("content-encoding").is_none(),
        "bodies under the threshold pass through"
    );
}

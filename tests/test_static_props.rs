//! Static props resolution against a mocked content API.

use sanity_preview_bridge::{
    ClientConfig, FetchError, NextSanity, SanityError, SanityProps, StaticProps, StaticPropsArgs,
    StaticPropsContext,
};
use serde_json::{json, Value as JsonValue};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERY_PATH: &str = "/v2021-03-25/data/query/production";

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("abc123", "production")
        .with_api_version("2021-03-25")
        .with_api_host(server.uri())
        .with_token("secret-token")
}

fn params(v: JsonValue) -> serde_json::Map<String, JsonValue> {
    v.as_object().cloned().unwrap()
}

#[tokio::test]
async fn anonymous_query_binds_params_and_sends_no_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("query", "*[slug.current == $slug][0]"))
        .and(query_param("$slug", "\"about\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ms": 3, "result": { "title": "About" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sanity = NextSanity::setup(config(&server)).unwrap();
    let ctx = StaticPropsContext::default().with_params(params(json!({ "slug": "about" })));
    let props: SanityProps = sanity
        .static_props(StaticPropsArgs::new("*[slug.current == $slug][0]", &ctx))
        .await
        .unwrap();

    assert_eq!(props.data, json!({ "title": "About" }));
    assert!(!props.preview);
    assert_eq!(props.params, params(json!({ "slug": "about" })));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn preview_query_carries_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [{ "_id": "drafts.post-1" }] })))
        .expect(1)
        .mount(&server)
        .await;

    let sanity = NextSanity::setup(config(&server)).unwrap();
    let ctx = StaticPropsContext::preview(json!({}));
    let merged = sanity
        .fetch_static_props(StaticPropsArgs::new("*[_type == 'post']", &ctx), None)
        .await
        .unwrap();

    assert_eq!(merged.props["data"], json!([{ "_id": "drafts.post-1" }]));
    assert_eq!(merged.props["preview"], json!(true));
    assert_eq!(merged.props["params"], json!({}));
}

#[tokio::test]
async fn merge_keeps_base_props_and_directives() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .mount(&server)
        .await;

    let sanity = NextSanity::setup(config(&server)).unwrap();
    let ctx = StaticPropsContext::default();
    let base = StaticProps::default()
        .with_prop("siteTitle", json!("Blog"))
        .revalidate(60);
    let merged = sanity
        .fetch_static_props(StaticPropsArgs::new("*[_id == 'missing'][0]", &ctx), Some(base))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&merged).unwrap(),
        json!({
            "props": {
                "siteTitle": "Blog",
                "data": null,
                "preview": false,
                "params": {}
            },
            "revalidate": 60
        })
    );
}

#[tokio::test]
async fn upstream_errors_surface_with_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "description": "param $slug referenced, but not provided",
                "type": "queryParseError"
            }
        })))
        .mount(&server)
        .await;

    let sanity = NextSanity::setup(config(&server)).unwrap();
    let ctx = StaticPropsContext::default();
    let err = sanity
        .fetch_static_props(StaticPropsArgs::new("*[slug.current == $slug]", &ctx), None)
        .await
        .unwrap_err();

    match err {
        SanityError::Fetch(FetchError::Status { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "param $slug referenced, but not provided");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let sanity = NextSanity::setup(config(&server)).unwrap();
    let ctx = StaticPropsContext::default();
    let err = sanity
        .fetch_static_props(StaticPropsArgs::new("*", &ctx), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SanityError::Fetch(FetchError::Decode(_))));
}

#[tokio::test]
async fn long_queries_are_posted() {
    let server = MockServer::start().await;
    let query = format!("*[_type == 'post' && !(_id in {:?})]", vec!["x".repeat(40); 300]);
    let bound = params(json!({ "limit": 10 }));

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .and(body_json(json!({ "query": query, "params": { "limit": 10 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let sanity = NextSanity::setup(config(&server)).unwrap();
    let ctx = StaticPropsContext::default();
    let props: SanityProps = sanity
        .static_props(StaticPropsArgs::new(&query, &ctx).params(&bound))
        .await
        .unwrap();
    assert_eq!(props.data, json!([]));
    assert_eq!(props.params, bound);
}

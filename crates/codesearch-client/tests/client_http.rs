//! Integration tests for CodeSearchClient over HTTP.
//!
//! Uses wiremock for HTTP mocking. Tests cover request encoding, typed
//! response unwrapping, write-through caching, file info memoisation and
//! status mapping.

use codesearch_client::{
    callers, CacheMode, ClientConfig, ClientError, CodeSearchClient, EdgeKind, XrefNode,
    CALLERS_FILE,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(mock_server: &MockServer) -> ClientConfig {
    ClientConfig::default()
        .with_host(mock_server.uri())
        .with_user_agent("codesearch-tests")
        .with_timeout_secs(2)
}

fn search_body() -> serde_json::Value {
    json!({
        "search_response": [{
            "search_result": [{
                "top_file": {"file": {"name": "base/logging.h", "package_name": "chromium"}},
                "match": [{"line_number": 42, "line_text": "#define LOG(severity)"}]
            }],
            "estimated_total_number_of_results": 1
        }],
        "elapsed_ms": 7
    })
}

#[tokio::test]
async fn test_search_sends_encoded_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/codesearch/json"))
        .and(query_param("search_request", "b"))
        .and(query_param("query", "LOG"))
        .and(query_param("max_num_results", "3"))
        .and(header("user-agent", "codesearch-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeSearchClient::new(config_for(&mock_server)).expect("client");
    let results = client.search("LOG", 3).await.expect("search failed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].top_file.file.name, "base/logging.h");
    assert_eq!(results[0].matches[0].line_number, 42);
}

#[tokio::test]
async fn test_cached_first_hits_disk_on_second_call() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/codesearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server)
        .with_cache_dir(dir.path())
        .with_cache_mode(CacheMode::CachedFirst);
    let client = CodeSearchClient::new(config).expect("client");

    let first = client.search("LOG", 3).await.unwrap();
    let second = client.search("LOG", 3).await.unwrap();
    assert_eq!(first, second);

    let stats = client.stats();
    assert_eq!(stats.network_requests, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(client.store().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_replay_only_client_never_calls_server() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server)
        .with_cache_dir(dir.path())
        .with_cache_mode(CacheMode::ReplayOnly);
    let client = CodeSearchClient::new(config).expect("client");

    let err = client.search("LOG", 3).await.unwrap_err();
    assert!(matches!(err, ClientError::ResourceNotCached { .. }));
    assert_eq!(client.store().list_missing().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_info_is_memoised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("file_info_request", "b"))
        .and(query_param("name", "base/logging.h"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_info_response": [{
                "file_info": {
                    "name": "base/logging.h",
                    "package_name": "chromium",
                    "lines": 3,
                    "content": {"text": "a\nb\nc\n"}
                }
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeSearchClient::new(config_for(&mock_server)).expect("client");
    let first = client.file_info("./base/logging.h").await.unwrap();
    let second = client.file_info("base/logging.h").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.lines, 3);
}

#[tokio::test]
async fn test_file_info_missing_from_response_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_info_response": [{"error_message": "no such file"}]
        })))
        .mount(&mock_server)
        .await;

    let client = CodeSearchClient::new(config_for(&mock_server)).expect("client");
    let err = client.file_info("nope.cc").await.unwrap_err();

    assert!(matches!(err, ClientError::Server { .. }));
    assert!(err.to_string().contains("no such file"));
}

#[tokio::test]
async fn test_xref_edges_build_nodes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("xref_search_request", "b"))
        .and(query_param("query", "cpp:net::class-Foo"))
        .and(query_param("edge_filter", "300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "xref_search_response": [{
                "search_result": [{
                    "file": {"name": "net/foo.h", "package_name": "chromium"},
                    "match": [
                        {"signature": "cpp:net::Foo::Bar", "line_number": 10, "type": "Declares"},
                        {"signature": "cpp:net::Foo::Baz", "line_number": 12, "type": "Declares"}
                    ]
                }]
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = CodeSearchClient::new(config_for(&mock_server)).expect("client");
    let node = XrefNode::from_signature("cpp:net::class-Foo", None);
    let edges = node
        .edges(&client, &[EdgeKind::DECLARES], 50)
        .await
        .unwrap();

    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].signature(), "cpp:net::Foo::Bar");
    assert_eq!(edges[1].to_string(), "net/foo.h:12: cpp:net::Foo::Baz");
}

#[tokio::test]
async fn test_missing_sub_response_yields_empty_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"elapsed_ms": 1})))
        .mount(&mock_server)
        .await;

    let client = CodeSearchClient::new(config_for(&mock_server)).expect("client");
    assert!(client.search("x", 1).await.unwrap().is_empty());
    assert!(client.xrefs("sig", &[], 1).await.unwrap().is_empty());
    assert!(client.annotations("a.cc").await.unwrap().is_empty());
    assert!(!client.status().await.unwrap().success);
}

#[tokio::test]
async fn test_server_errors_are_not_cached() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend overloaded"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server)
        .with_cache_dir(dir.path())
        .with_cache_mode(CacheMode::CachedFirst);
    let client = CodeSearchClient::new(config).expect("client");

    for _ in 0..2 {
        let err = client.status().await.unwrap_err();
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "backend overloaded");
            }
            other => panic!("expected Server error, got {other:?}"),
        }
    }
    assert!(client.store().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signature_lookups_use_annotations() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("annotation_request", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "annotation_response": [{
                "annotation": [
                    {
                        "type": {"id": 4},
                        "range": {"start_line": 5, "start_column": 3, "end_line": 5, "end_column": 9},
                        "xref_signature": {"signature": "cpp:net::Foo::Start(int)"}
                    },
                    {
                        "type": {"id": 1},
                        "range": {"start_line": 8, "start_column": 1, "end_line": 8, "end_column": 4},
                        "internal_link": {"signature": "cpp:net::class-Foo", "path": "net/foo.h"}
                    }
                ]
            }]
        })))
        .mount(&mock_server)
        .await;

    let client = CodeSearchClient::new(config_for(&mock_server)).expect("client");

    assert_eq!(
        client.signature_for_location("net/foo.cc", 5, 4).await.unwrap(),
        Some("cpp:net::Foo::Start(int)".to_string())
    );
    assert_eq!(
        client.signature_for_location("net/foo.cc", 6, 1).await.unwrap(),
        None
    );
    assert_eq!(
        client.signature_for_symbol("net/foo.cc", "Start").await.unwrap(),
        Some("cpp:net::Foo::Start(int)".to_string())
    );
    assert_eq!(
        client.signature_for_symbol("net/foo.cc", "Foo").await.unwrap(),
        Some("cpp:net::class-Foo".to_string())
    );
}

#[tokio::test]
async fn test_dump_callers_records_where_queries_came_from() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server)
        .with_cache_dir(dir.path())
        .with_cache_mode(CacheMode::CachedFirst);
    let client = CodeSearchClient::new(config).expect("client");

    let first = line!() + 1;
    client.search("LOG", 3).await.unwrap();
    let second = line!() + 1;
    client.search("LOG", 3).await.unwrap();
    let node = XrefNode::from_signature("cpp:net::class-Foo", None);
    let edges_line = line!() + 1;
    node.edges(&client, &[], 5).await.unwrap();

    assert_eq!(client.dump_callers().await.unwrap(), 2);

    let written = callers::load(&dir.path().join(CALLERS_FILE)).await.unwrap();
    let mut by_method: Vec<(String, Vec<u32>)> = written
        .values()
        .map(|r| {
            assert!(r.callers.iter().all(|site| site.file == file!()));
            (r.method.clone(), r.callers.iter().map(|site| site.line).collect())
        })
        .collect();
    by_method.sort();
    assert_eq!(
        by_method,
        vec![
            ("search".to_string(), vec![first, second]),
            ("xref_search".to_string(), vec![edges_line]),
        ]
    );
}

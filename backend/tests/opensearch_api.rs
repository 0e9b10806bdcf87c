use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use catalogue_search::{api::search::SearchService, config::Settings, server};
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Clone)]
struct FakeEngine {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    status: StatusCode,
    response: Value,
}

async fn fake_search(State(engine): State<FakeEngine>, Path(index): Path<String>, Json(body): Json<Value>) -> Response {
    engine.requests.lock().unwrap().push((index, body));
    (engine.status, Json(engine.response.clone())).into_response()
}

/// Start a fake engine answering every search with `response`.
async fn start_engine(status: StatusCode, response: Value) -> (String, FakeEngine) {
    let engine = FakeEngine { requests: Arc::new(Mutex::new(Vec::new())), status, response };
    let app = Router::new().route("/{index}/_search", post(fake_search)).with_state(engine.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), engine)
}

fn app(elasticsearch_url: String) -> Router {
    let settings = Settings {
        elasticsearch_url,
        elasticsearch_index: "sentinel".to_string(),
        ..Settings::default()
    };
    server::router(Arc::new(SearchService::new(settings).unwrap()))
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn hits(hits: Vec<Value>, total: u64) -> Value {
    json!({"took": 3, "timed_out": false, "hits": {"total": {"value": total, "relation": "eq"}, "hits": hits}})
}

fn sentinel_hit() -> Value {
    json!({
        "_id": "S1A_IW_GRDH_1SDV",
        "_source": {
            "temporal": {"start_time": "2016-08-01T10:00:00", "end_time": "2016-08-01T10:00:25"},
            "misc": {
                "platform": {"Satellite": "Sentinel-1A"},
                "product_info": {"Product Class Description": "SAR Standard L1 Product"}
            },
            "file": {
                "directory": "/neodc/sentinel1a/data",
                "filename": "S1A_IW_GRDH_1SDV.manifest",
                "data_file": "S1A_IW_GRDH_1SDV.zip",
                "data_file_size": 1234,
                "location": "on_disk"
            }
        }
    })
}

#[tokio::test]
async fn atom_search_translates_parameters() {
    let (url, engine) = start_engine(StatusCode::OK, hits(vec![sentinel_hit()], 1)).await;
    let (status, body) = get(
        app(url),
        "/opensearch/atom?platform=Sentinel-1A&dataOnline=TRUE&sensorMode=IW&endDate=2016-08-20&maximumRecords=500&format=rss",
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let requests = engine.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (index, request) = &requests[0];
    assert_eq!(index, "sentinel");
    assert_eq!(request["from"], json!(0));
    assert_eq!(request["size"], json!(50));
    assert_eq!(request["explain"], json!(true));
    assert_eq!(request["sort"], json!([{"temporal.end_time": {"order": "desc"}}]));
    assert_eq!(
        request["query"]["bool"]["must"],
        json!([
            {"match_phrase": {"misc.platform.Satellite": "Sentinel-1A"}},
            {"match_phrase": {"file.location": "on_disk"}},
        ])
    );
    assert_eq!(request["query"]["bool"]["minimum_should_match"], json!(1));
    assert_eq!(
        request["query"]["bool"]["filter"],
        json!([{"range": {"temporal.start_time": {"lt": "2016-08-21"}}}])
    );

    assert!(body.contains("<title>Catalogue Search Feed for sentinel</title>"));
    assert!(body.contains("Found 1 results. Showing the first 1 result"));
    assert!(body.contains("<dc:identifier>S1A_IW_GRDH_1SDV</dc:identifier>"));
    assert!(body.contains("rel=\"enclosure\""));
}

#[tokio::test]
async fn json_search_returns_paging_fields() {
    let (url, _engine) = start_engine(StatusCode::OK, hits(vec![sentinel_hit()], 21)).await;
    let (status, body) = get(app(url), "/opensearch/json?startPage=3").await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["totalResults"], json!(21));
    assert_eq!(body["startIndex"], json!(21));
    assert_eq!(body["startPage"], json!(3));
    assert_eq!(body["rows"][0]["misc"]["platform"]["Satellite"], json!("Sentinel-1A"));
}

#[tokio::test]
async fn deep_pages_are_rejected_before_searching() {
    let (url, engine) = start_engine(StatusCode::OK, hits(vec![], 0)).await;
    let (status, body) = get(app(url), "/opensearch/atom?startRecord=9995").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("This server is currently only able to page through the first 10,000 results."));
    assert!(engine.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn out_of_range_paging_is_a_client_error() {
    let (url, engine) = start_engine(StatusCode::OK, hits(vec![], 0)).await;
    for query in ["startRecord=9223372036854775807", "startPage=9223372036854775807"] {
        let (status, body) = get(app(url.clone()), &format!("/opensearch/json?{}", query)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert!(body.starts_with("This server is currently only able to page through the first 10,000 results."));
    }
    assert!(engine.requests.lock().unwrap().is_empty());

    let (status, _) = get(app(url), "/opensearch/atom?startRecord=-9223372036854775808").await;
    assert_eq!(status, StatusCode::OK);
    let requests = engine.requests.lock().unwrap();
    assert_eq!(requests[0].1["from"], json!(0));
    assert_eq!(requests[0].1["size"], json!(0));
}

#[tokio::test]
async fn oddly_shaped_records_still_render() {
    let odd = json!({
        "_id": "odd",
        "_source": {"misc": {"platform": null}, "temporal": {"start_time": 1470045600}, "file": {"location": "on_disk"}}
    });
    let broken = json!({"_id": "broken", "_source": ["not", "an", "object"]});
    let (url, _engine) = start_engine(StatusCode::OK, hits(vec![sentinel_hit(), odd, broken], 3)).await;

    let (status, body) = get(app(url.clone()), "/opensearch/json").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["rows"].as_array().unwrap().len(), 3);
    assert_eq!(body["rows"][1]["misc"]["platform"], Value::Null);

    let (status, body) = get(app(url), "/opensearch/atom").await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body.contains("<dc:identifier>odd</dc:identifier>"));
    assert!(body.contains("<dc:identifier>broken</dc:identifier>"));
}

#[tokio::test]
async fn invalid_dates_and_polygons_are_client_errors() {
    let (url, engine) = start_engine(StatusCode::OK, hits(vec![], 0)).await;
    let (status, body) = get(app(url.clone()), "/opensearch/json?startDate=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid date format");

    let (status, _) = get(app(url), "/opensearch/json?geometry=POINT(1%202)").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(engine.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn engine_shape_errors_are_surfaced() {
    let error = json!({
        "error": {
            "root_cause": [{"type": "invalid_shape_exception", "reason": "Self-intersection at or near point [10.0, 10.0]"}],
            "type": "search_phase_execution_exception"
        },
        "status": 400
    });
    let (url, _engine) = start_engine(StatusCode::BAD_REQUEST, error).await;
    let (status, body) = get(app(url), "/opensearch/atom?geometry=POLYGON((0%200,10%2010,10%200,0%2010,0%200))").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Self-intersection at or near point [10.0, 10.0]");
}

#[tokio::test]
async fn unclassified_engine_errors_are_server_errors() {
    let (url, _engine) = start_engine(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})).await;
    let (status, _) = get(app(url), "/opensearch/atom").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unreachable_engine_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (status, body) = get(app(format!("http://{}", addr)), "/opensearch/atom").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Error while connecting to the search service");
}

#[tokio::test]
async fn resource_gml_renders_one_record() {
    let (url, engine) = start_engine(StatusCode::OK, hits(vec![sentinel_hit()], 1)).await;
    let (status, body) = get(app(url), "/resource/gml?uid=S1A_IW_GRDH_1SDV").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<eop:EarthObservation"));
    assert!(body.contains("<eop:shortName>Sentinel-1A</eop:shortName>"));
    assert!(body.contains("<eop:size uom=\"byte\">1234</eop:size>"));

    let requests = engine.requests.lock().unwrap();
    assert_eq!(
        requests[0].1["query"]["bool"]["must"],
        json!([{"match_phrase": {"misc.product_info.Name": "S1A_IW_GRDH_1SDV"}}])
    );
    assert_eq!(requests[0].1["size"], json!(1));
}

#[tokio::test]
async fn resource_json_is_the_stored_document() {
    let (url, _engine) = start_engine(StatusCode::OK, hits(vec![sentinel_hit()], 1)).await;
    let (status, body) = get(app(url), "/resource/json?uid=S1A_IW_GRDH_1SDV").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, sentinel_hit()["_source"]);
}

#[tokio::test]
async fn resource_lookup_errors() {
    let (url, _engine) = start_engine(StatusCode::OK, hits(vec![], 0)).await;
    let (status, _) = get(app(url.clone()), "/resource/gml?uid=missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(app(url.clone()), "/resource/gml").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Missing uid parameter");

    let (status, _) = get(app(url), "/resource/atom?uid=x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_formats_and_health() {
    let (url, _engine) = start_engine(StatusCode::OK, hits(vec![], 0)).await;
    let (status, _) = get(app(url.clone()), "/opensearch/rss").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(app(url), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"status": "ok"}));
}

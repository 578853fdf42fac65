//! Integration tests for covchart-data crate.

use covchart_common::test_utils::{date_range, init_test_logging, mock_date, source_fixtures};
use covchart_common::CovChartError;
use covchart_config::{default_metrics, AreaQuery, Config, LabelFilter, WindowAlign};
use covchart_data::gov_api::parse_page;
use covchart_data::{
    DataSource, DataframeBuilder, FetchRequest, GovApiSource, MetricFrame, MetricSpec, RawRow,
    RawTable, StaticSource, ZoeSource,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn national_cases(days: usize) -> RawTable {
    RawTable::from_rows(
        date_range(mock_date(2020, 11, 1), days)
            .into_iter()
            .enumerate()
            .map(|(i, date)| RawRow::new(date, "England").with_value("cases", 1000.0 + 100.0 * i as f64)),
    )
}

#[tokio::test]
async fn test_static_source_feeds_builder() {
    init_test_logging();
    let source = StaticSource::new(national_cases(14));

    let raw = source.fetch(&FetchRequest::new("cases", "newCasesBySpecimenDate")).await.unwrap();
    let spec = MetricSpec::new("cases", "cases").with_window(7, WindowAlign::Trailing);
    let table = DataframeBuilder::new().build(&raw, &spec).unwrap();

    assert_eq!(table.len(), 14);
    assert_eq!(table.value("England", mock_date(2020, 11, 6)), None);
    // mean of 1000..=1600 step 100
    assert_eq!(table.value("England", mock_date(2020, 11, 7)), Some(1300.0));
}

#[tokio::test]
async fn test_static_source_region_filter() {
    let mut raw = national_cases(3);
    raw.push(RawRow::new(mock_date(2020, 11, 1), "London").with_value("cases", 5.0));
    let source = StaticSource::new(raw);

    let fetched = source
        .fetch(&FetchRequest::new("cases", "cases").with_region("London"))
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(source.name(), "static");
}

#[test]
fn test_age_breakdown_page_to_metric_table() {
    let page = parse_page(source_fixtures::gov_api_cases_by_age_page()).unwrap();

    let mut spec = MetricSpec::new("cases_60_plus", "cases");
    spec.label_filters.push(LabelFilter {
        key: "age".into(),
        values: vec!["60+".into()],
    });
    spec.national_total = Some("England".into());
    let table = DataframeBuilder::new().build(&page.table, &spec).unwrap();

    let day = mock_date(2020, 11, 1);
    assert_eq!(table.value("London", day), Some(90.0));
    assert_eq!(table.value("North East", day), Some(45.0));
    assert_eq!(table.value("England", day), Some(135.0));
}

#[test]
fn test_default_metric_specs_need_their_columns() {
    let config = Config::default();
    let deaths = default_metrics().into_iter().find(|m| m.id.as_str() == "deaths").unwrap();
    let spec = MetricSpec::from_config(&deaths, config.pipeline.start_date);

    let err = DataframeBuilder::new().build(&national_cases(5), &spec).unwrap_err();
    assert!(err.is_shape());
}

#[test]
fn test_frame_overlays_metrics_for_a_region() {
    let builder = DataframeBuilder::new();
    let cases = builder
        .build(&national_cases(10), &MetricSpec::new("cases", "cases"))
        .unwrap();
    let deaths_raw = RawTable::from_rows(
        date_range(mock_date(2020, 11, 5), 10)
            .into_iter()
            .map(|date| RawRow::new(date, "England").with_value("deaths", 10.0)),
    );
    let deaths = builder.build(&deaths_raw, &MetricSpec::new("deaths", "deaths")).unwrap();

    let frame = MetricFrame::aggregate(vec![("Cases".into(), cases), ("Deaths".into(), deaths)]);
    let smoothed = frame.map_tables(|t| t.rolling_mean(3, WindowAlign::Trailing)).unwrap();

    assert_eq!(frame.dates().len(), 14);
    assert_eq!(smoothed.dates(), frame.dates());
    let england = smoothed.region("England");
    assert_eq!(england.len(), 2);
    assert_eq!(england[1].1[6], Some(10.0));
    assert_eq!(england[1].1[5], None);
}

/// Serves one canned response per connection, in order, and returns the
/// request lines it saw.
async fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let head = String::from_utf8_lossy(&head);
            requests.push(head.lines().next().unwrap_or_default().to_string());

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        requests
    });
    (base, handle)
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

fn deaths_request() -> FetchRequest {
    FetchRequest::new("deaths", "newDeaths28DaysByDeathDate").with_area(AreaQuery::of_type("region"))
}

#[tokio::test]
async fn test_zoe_steps_back_past_missing_files() {
    let (base, server) = serve(vec![
        http_response("404 Not Found", ""),
        http_response("200 OK", source_fixtures::zoe_incidence_csv()),
    ])
    .await;
    let source = ZoeSource::new(client(), &base, 3).starting_from(mock_date(2020, 11, 3));

    let table = source.fetch(&FetchRequest::new("zoe", "covid_in_pop")).await.unwrap();

    assert_eq!(table.len(), 4);
    let requests = server.await.unwrap();
    assert!(requests[0].contains("/incidence_20201103.csv"));
    assert!(requests[1].contains("/incidence_20201102.csv"));
}

#[tokio::test]
async fn test_zoe_gives_up_after_lookback() {
    let (base, server) = serve(vec![
        http_response("404 Not Found", ""),
        http_response("404 Not Found", ""),
    ])
    .await;
    let source = ZoeSource::new(client(), &base, 2).starting_from(mock_date(2020, 11, 3));

    let err = source.fetch(&FetchRequest::new("zoe", "covid_in_pop")).await.unwrap_err();

    assert!(err.is_retrieval());
    assert!(err.to_string().contains("can't get Zoe data for the last 2 days"));
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_zoe_server_error_is_retrieval_error() {
    let (base, _server) = serve(vec![http_response("500 Internal Server Error", "")]).await;
    let source = ZoeSource::new(client(), &base, 5).starting_from(mock_date(2020, 11, 3));

    let err = source.fetch(&FetchRequest::new("zoe", "covid_in_pop")).await.unwrap_err();

    assert!(matches!(
        err,
        CovChartError::Retrieval {
            status_code: Some(500),
            ..
        }
    ));
}

#[tokio::test]
async fn test_gov_api_follows_next_page() {
    let first = r#"{"data": [{"date": "2020-11-03", "region": "London", "deaths": 30}],
        "pagination": {"current": "/v1/data?page=1", "next": "/v1/data?page=2"}}"#;
    let (base, server) = serve(vec![
        http_response("200 OK", first),
        http_response("200 OK", source_fixtures::gov_api_deaths_page()),
    ])
    .await;
    let source = GovApiSource::new(client(), &format!("{base}/v1/data")).unwrap();

    let table = source.fetch(&deaths_request()).await.unwrap();

    assert_eq!(table.len(), 5);
    assert_eq!(table.date_span(), Some((mock_date(2020, 11, 1), mock_date(2020, 11, 3))));
    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains("page=1"));
    assert!(requests[1].contains("page=2"));
}

#[tokio::test]
async fn test_gov_api_no_content_ends_paging() {
    let first = r#"{"data": [{"date": "2020-11-01", "region": "London", "deaths": 30}],
        "pagination": {"next": "/v1/data?page=2"}}"#;
    let (base, server) = serve(vec![
        http_response("200 OK", first),
        "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_string(),
    ])
    .await;
    let source = GovApiSource::new(client(), &format!("{base}/v1/data")).unwrap();

    let table = source.fetch(&deaths_request()).await.unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_gov_api_error_status_is_retrieval_error() {
    let (base, _server) = serve(vec![http_response("500 Internal Server Error", "oops")]).await;
    let source = GovApiSource::new(client(), &format!("{base}/v1/data")).unwrap();

    let err = source.fetch(&deaths_request()).await.unwrap_err();

    assert!(err.is_retrieval());
    assert!(err.to_string().contains("API returned 500"));
}

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use dashboard_metrics::{unix_timestamp, EarningsPeriod};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use web_utils::format_elapsed_time;

use crate::{
    config::Config,
    error::DashboardError,
    poller::Poller,
    render::chart_series,
    sink::{ChartId, DashboardView, Field},
    DashboardStore,
};

const DASHBOARD_PAGE_TEMPLATE: &str = include_str!("../templates/dashboard.html");

/// Values the HTTP layer needs from the configuration.
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub client_poll_interval_secs: u64,
    pub default_period: EarningsPeriod,
    pub chart_range_hours: f64,
    pub stale_after_secs: u64,
}

impl From<&Config> for WebSettings {
    fn from(config: &Config) -> Self {
        Self {
            client_poll_interval_secs: config.poll_interval_secs,
            default_period: config.default_period,
            chart_range_hours: config.chart_range_hours,
            stale_after_secs: config.stale_after_secs(),
        }
    }
}

pub async fn run_http_server(
    address: String,
    store: Arc<DashboardStore>,
    poller: Arc<Poller>,
    settings: WebSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&address).await?;
    info!("🌐 Web dashboard listening on http://{}", address);
    info!(
        "Client polling interval: {} seconds",
        settings.client_poll_interval_secs
    );

    let settings = Arc::new(settings);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let store = store.clone();
        let poller = poller.clone();
        let settings = settings.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let store = store.clone();
                let poller = poller.clone();
                let settings = settings.clone();
                async move { handle_request(req, store, poller, settings).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

async fn handle_request<B>(
    req: Request<B>,
    store: Arc<DashboardStore>,
    poller: Arc<Poller>,
    settings: Arc<WebSettings>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => Response::builder()
            .header("content-type", "text/html; charset=utf-8")
            .body(Full::new(dashboard_page(&settings))),
        (&Method::GET, "/api/metrics") => {
            match parse_period(&query, settings.default_period) {
                Ok(period) => match store.get() {
                    Some(view) => json_response(
                        StatusCode::OK,
                        metrics_json(&view, period, unix_timestamp() as u64),
                    ),
                    None => not_ready(),
                },
                Err(e) => json_response(StatusCode::BAD_REQUEST, json!({ "error": e.to_string() })),
            }
        }
        (&Method::GET, "/api/charts") => match parse_range_hours(&query) {
            Ok(range) => match store.get() {
                Some(view) => json_response(
                    StatusCode::OK,
                    charts_json(&view, range, settings.chart_range_hours, unix_timestamp()),
                ),
                None => not_ready(),
            },
            Err(e) => json_response(StatusCode::BAD_REQUEST, json!({ "error": e })),
        },
        (&Method::POST, "/api/refresh") => refresh(&poller).await,
        (&Method::GET, "/health") => {
            let stale = store.is_stale(settings.stale_after_secs);
            let status_code = if stale {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::OK
            };
            json_response(
                status_code,
                json!({
                    "healthy": !stale,
                    "stale": stale
                }),
            )
        }
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found"))),
    };

    Ok(response.unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    }))
}

fn json_response(
    status: StatusCode,
    body: serde_json::Value,
) -> Result<Response<Full<Bytes>>, hyper::http::Error> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
}

fn not_ready() -> Result<Response<Full<Bytes>>, hyper::http::Error> {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": "No successful refresh yet" }),
    )
}

async fn refresh(poller: &Poller) -> Result<Response<Full<Bytes>>, hyper::http::Error> {
    match poller.refresh().await {
        Ok(report) => json_response(
            StatusCode::OK,
            json!({
                "success": true,
                "refreshed_at": report.refreshed_at,
                "history_samples": report.history_samples,
                "average_window_hours": report.average_window_hours
            }),
        ),
        Err(e @ DashboardError::Busy) => {
            warn!("Manual refresh rejected: {}", e);
            json_response(
                StatusCode::CONFLICT,
                json!({ "success": false, "error": e.to_string() }),
            )
        }
        Err(e) => json_response(
            StatusCode::BAD_GATEWAY,
            json!({ "success": false, "error": e.to_string() }),
        ),
    }
}

fn dashboard_page(settings: &WebSettings) -> Bytes {
    // Convert seconds to milliseconds for JavaScript setInterval
    let client_poll_interval_ms = settings.client_poll_interval_secs * 1000;

    let html = DASHBOARD_PAGE_TEMPLATE
        .replace("{client_poll_interval_ms}", &client_poll_interval_ms.to_string())
        .replace("{default_period}", settings.default_period.as_str())
        .replace(
            "{chart_range_options}",
            &chart_range_options(settings.chart_range_hours),
        );

    Bytes::from(html)
}

/// Ranges offered in the chart selector, in hours.
const CHART_RANGE_CHOICES: [f64; 5] = [1.0, 6.0, 12.0, 24.0, 168.0];

fn range_label(hours: f64) -> String {
    if hours >= 24.0 && hours % 24.0 == 0.0 {
        format!("{}d", hours / 24.0)
    } else {
        format!("{}h", hours)
    }
}

/// `<option>` list for the range selector; the configured range is always
/// present and preselected.
fn chart_range_options(selected: f64) -> String {
    let mut choices = CHART_RANGE_CHOICES.to_vec();
    if !choices.contains(&selected) {
        choices.push(selected);
        choices.sort_by(f64::total_cmp);
    }

    choices
        .into_iter()
        .map(|hours| {
            format!(
                r#"                <option value="{}"{}>{}</option>"#,
                hours,
                if hours == selected { " selected" } else { "" },
                range_label(hours)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn parse_period(
    query: &str,
    default: EarningsPeriod,
) -> Result<EarningsPeriod, dashboard_metrics::metrics::UnknownPeriod> {
    match query_param(query, "period") {
        Some(value) => value.parse(),
        None => Ok(default),
    }
}

/// `None` means the configured range.
fn parse_range_hours(query: &str) -> Result<Option<f64>, String> {
    let value = match query_param(query, "range") {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };
    match value.parse::<f64>() {
        Ok(hours) if hours > 0.0 && hours.is_finite() => Ok(Some(hours)),
        _ => Err(format!("invalid chart range `{}`", value)),
    }
}

fn metrics_json(view: &DashboardView, period: EarningsPeriod, now: u64) -> serde_json::Value {
    let fields: serde_json::Map<String, serde_json::Value> = view
        .scalars()
        .map(|(field, text)| (field.key().into_owned(), json!(text)))
        .collect();

    json!({
        "fields": fields,
        "period": period,
        "earnings": {
            "coin": view.scalar(Field::EarningsCoin(period)),
            "fiat": view.scalar(Field::EarningsFiat(period))
        },
        "refreshed_at": view.refreshed_at,
        "refreshed_ago": format_elapsed_time(now, view.refreshed_at)
    })
}

/// Series for the requested range, or the ones rendered with the cycle when
/// no range was asked for.
fn charts_json(
    view: &DashboardView,
    range_hours: Option<f64>,
    default_range_hours: f64,
    now: f64,
) -> serde_json::Value {
    let mut charts = serde_json::Map::new();
    match range_hours {
        Some(hours) => {
            for (chart, points) in chart_series(&view.history, now, hours) {
                charts.insert(chart.key().to_string(), json!(points));
            }
        }
        None => {
            for chart in [ChartId::Hashrate, ChartId::Price] {
                charts.insert(chart.key().to_string(), json!(view.series(chart)));
            }
        }
    }
    charts.insert(
        "range_hours".to_string(),
        json!(range_hours.unwrap_or(default_range_hours)),
    );
    serde_json::Value::Object(charts)
}

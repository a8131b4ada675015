use crate::config::{Config, ServeConfig};
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::RollError;
use crate::extract::{ExtractOptions, ExtractionReport, RollExtractor};
use crate::layout::TemplateSet;
use crate::output::{write_csv, LayoutChoice, OutputFormat};
use crate::preprocessing::Preset;
use crate::rasterize::{PageRange, PageSource, DEFAULT_DPI};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Room for multipart boundaries and the text fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<EngineRegistry>,
    pub templates: Arc<TemplateSet>,
    pub config: Arc<ServeConfig>,
}

/// Extraction response for `format=json`
#[derive(Serialize)]
pub struct ExtractResponse {
    pub template: String,
    pub engine: String,
    pub processing_time_ms: u64,
    #[serde(flatten)]
    pub report: ExtractionReport,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engines: Vec<EngineInfo>,
    pub default_engine: String,
    pub templates: Vec<String>,
    pub max_file_size_bytes: usize,
}

/// Routes and middleware over prepared state
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_file_size
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/extract", post(handle_extract))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: ServeConfig, engine_config: Config) -> anyhow::Result<()> {
    let engines = EngineRegistry::new(&engine_config)?;

    let mut templates = TemplateSet::builtin();
    if let Some(path) = &config.template_file {
        templates.load_file(path)?;
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        engines: Arc::new(engines),
        templates: Arc::new(templates),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Fields of an `/extract` form
#[derive(Default)]
struct ExtractForm {
    file: Option<Bytes>,
    file_name: Option<String>,
    content_type: Option<String>,
    template: Option<String>,
    engine: Option<String>,
    first_page: Option<usize>,
    last_page: Option<usize>,
    preset: Option<Preset>,
    layout: Option<LayoutChoice>,
    format: Option<OutputFormat>,
}

impl ExtractForm {
    async fn read(mut multipart: Multipart) -> Result<Self, RollError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RollError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                form.content_type = field.content_type().map(|s| s.to_string());
                form.file_name = field.file_name().map(|s| s.to_string());
                form.file = Some(field.bytes().await.map_err(|e| {
                    RollError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
                continue;
            }

            let value = field.text().await.map_err(|e| {
                RollError::InvalidRequest(format!("Invalid field '{}': {}", name, e))
            })?;
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }

            match name.as_str() {
                "template" => form.template = Some(value),
                "engine" => form.engine = Some(value),
                "first_page" => form.first_page = Some(parse_page(&name, &value)?),
                "last_page" => form.last_page = Some(parse_page(&name, &value)?),
                "preset" => form.preset = Some(value.parse()?),
                "layout" => form.layout = Some(value.parse()?),
                "format" => form.format = Some(value.parse()?),
                _ => {
                    // Ignore unknown fields
                }
            }
        }

        Ok(form)
    }

    fn suffix(&self) -> &'static str {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase());
        match (from_name.as_deref(), self.content_type.as_deref()) {
            (Some("pdf"), _) | (_, Some("application/pdf")) => ".pdf",
            (Some("png"), _) | (_, Some("image/png")) => ".png",
            (Some("jpg" | "jpeg"), _) | (_, Some("image/jpeg")) => ".jpg",
            (Some("tif" | "tiff"), _) | (_, Some("image/tiff")) => ".tiff",
            _ => ".tmp",
        }
    }
}

fn parse_page(name: &str, value: &str) -> Result<usize, RollError> {
    value
        .parse()
        .map_err(|_| RollError::InvalidRequest(format!("{} must be a page number", name)))
}

/// Handle extraction requests
async fn handle_extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, RollError> {
    let start = Instant::now();
    let form = ExtractForm::read(multipart).await?;

    let data = form.file.as_ref().ok_or(RollError::MissingFile)?;
    if data.len() > state.config.max_file_size {
        return Err(RollError::FileTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let template = state
        .templates
        .get(form.template.as_deref().unwrap_or("ward-roll"))?
        .clone();
    let engine = state.engines.resolve(form.engine.as_deref())?;
    let options = ExtractOptions {
        pages: PageRange::new(form.first_page, form.last_page)?,
        preset: form.preset.unwrap_or_default(),
        ..Default::default()
    };

    let mut temp_file = tempfile::Builder::new()
        .suffix(form.suffix())
        .tempfile()
        .map_err(|e| RollError::Internal(format!("Failed to create temp file: {}", e)))?;
    temp_file
        .write_all(data)
        .map_err(|e| RollError::Internal(format!("Failed to write temp file: {}", e)))?;

    tracing::info!(
        "Extracting {} byte upload with template '{}' and engine {}",
        data.len(),
        template.name,
        engine.name()
    );

    let layout = form.layout.unwrap_or_default().resolve(&template);
    let template_name = template.name.clone();
    let engine_name = engine.name().to_string();

    // The pipeline is synchronous and CPU bound
    let report = tokio::task::spawn_blocking(move || {
        let source = PageSource::open(temp_file.path(), DEFAULT_DPI)?;
        RollExtractor::new(template, engine, options)?.run(&source)
    })
    .await
    .map_err(|e| RollError::Internal(format!("Extraction task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Extracted {} records in {}ms",
        report.records.len(),
        processing_time_ms
    );

    match form.format.unwrap_or(OutputFormat::Json) {
        OutputFormat::Json => Ok(Json(ExtractResponse {
            template: template_name,
            engine: engine_name,
            processing_time_ms,
            report,
        })
        .into_response()),
        OutputFormat::Csv => {
            let mut body = Vec::new();
            write_csv(&report.records, layout, &mut body)?;
            Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response())
        }
    }
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engines: state.engines.info(),
        default_engine: state.engines.default_name().to_string(),
        templates: state
            .templates
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        max_file_size_bytes: state.config.max_file_size,
    })
}

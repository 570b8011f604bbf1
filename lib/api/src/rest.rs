use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use facelabel_core::{LabelEngine, LabelResponse, Strategy, Vector, VerifiedRecord};
use facelabel_storage::RecordWriter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
struct LabelRequest {
    embedding: Vec<f32>,
    /// Strategy name or legacy method number; engine default when absent
    strategy: Option<String>,
}

#[derive(Deserialize)]
struct RecordRequest {
    embedding: Vec<f32>,
    #[serde(default)]
    requires_verification: bool,
    #[serde(default)]
    verified_labels: Vec<String>,
    #[serde(default)]
    incorrect_labels: Vec<String>,
}

#[derive(Serialize)]
struct IndexInfo {
    size: usize,
    dim: usize,
}

/// Shared handler state
pub struct ApiState {
    pub engine: Arc<LabelEngine>,
    /// Record ingestion is disabled when `None`
    pub writer: Option<Arc<dyn RecordWriter>>,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(
        engine: Arc<LabelEngine>,
        writer: Option<Arc<dyn RecordWriter>>,
        port: u16,
    ) -> std::io::Result<()> {
        let state = web::Data::new(ApiState { engine, writer });
        tracing::info!(port, "Starting REST API");

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(state.clone())
                .configure(configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Register every route; shared by the server and tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health))
        .route("/labels", web::post().to(resolve_labels))
        .route("/index", web::get().to(index_info))
        .route("/index/rebuild", web::post().to(rebuild_index))
        .route("/records/{id}", web::put().to(put_record))
        .route("/records/{id}", web::delete().to(delete_record));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("Success")
}

fn fail(message: impl Into<String>) -> LabelResponse {
    LabelResponse::Fail {
        message: message.into(),
    }
}

async fn resolve_labels(
    state: web::Data<ApiState>,
    body: web::Json<LabelRequest>,
) -> ActixResult<HttpResponse> {
    let request = body.into_inner();
    let strategy = match request.strategy.as_deref() {
        None => state.engine.config().default_strategy,
        Some(name) => match name.parse::<Strategy>() {
            Ok(strategy) => strategy,
            Err(e) => return Ok(HttpResponse::BadRequest().json(fail(e.to_string()))),
        },
    };

    let engine = state.engine.clone();
    let embedding = request.embedding;
    let response = web::block(move || engine.resolve_labels(&embedding, strategy)).await?;
    if response.is_success() {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::BadRequest().json(response))
    }
}

async fn index_info(state: web::Data<ApiState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(IndexInfo {
        size: state.engine.index_len(),
        dim: state.engine.config().dim,
    }))
}

async fn rebuild_index(state: web::Data<ApiState>) -> ActixResult<HttpResponse> {
    let engine = state.engine.clone();
    let result = web::block(move || engine.rebuild_index()).await?;

    match result {
        Ok(report) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "size": report.size,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        }))),
        Err(e) => {
            tracing::error!(error = %e, "Index rebuild failed");
            Ok(HttpResponse::ServiceUnavailable().json(fail(e.to_string())))
        }
    }
}

async fn put_record(
    state: web::Data<ApiState>,
    path: web::Path<String>,
    body: web::Json<RecordRequest>,
) -> ActixResult<HttpResponse> {
    let Some(writer) = state.writer.clone() else {
        return Ok(HttpResponse::NotImplemented().json(fail("Record ingestion is not enabled")));
    };

    let id = path.into_inner();
    let request = body.into_inner();
    if let Err(e) = Vector::validate(&request.embedding, state.engine.config().dim) {
        return Ok(HttpResponse::BadRequest().json(fail(e.to_string())));
    }

    let record = VerifiedRecord {
        id: id.clone(),
        embedding: request.embedding,
        requires_verification: request.requires_verification,
        verified_labels: request.verified_labels,
        incorrect_labels: request.incorrect_labels,
    };
    match web::block(move || writer.put(record)).await? {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "id": id,
        }))),
        Err(e) => Ok(HttpResponse::ServiceUnavailable().json(fail(e.to_string()))),
    }
}

async fn delete_record(
    state: web::Data<ApiState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let Some(writer) = state.writer.clone() else {
        return Ok(HttpResponse::NotImplemented().json(fail("Record ingestion is not enabled")));
    };

    let id = path.into_inner();
    let lookup = id.clone();
    match web::block(move || writer.delete(&lookup)).await? {
        Ok(true) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "success",
            "id": id,
        }))),
        Ok(false) => Ok(HttpResponse::NotFound().json(fail(format!("Record '{}' not found", id)))),
        Err(e) => Ok(HttpResponse::ServiceUnavailable().json(fail(e.to_string()))),
    }
}

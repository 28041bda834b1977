use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::error;
use serde_json::json;
use std::io::Write;

use crate::config::AppConfig;
use crate::explain::Explainer;
use crate::inference::ModelHandle;
use crate::ingest::ScanUpload;
use crate::pages;
use crate::pipeline;

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: String) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/predict").route(web::post().to(handle_predict)))
        .service(web::resource("/api/predict").route(web::post().to(handle_predict_api)))
        .service(Files::new("/static", static_dir));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(pages::index_page())
}

async fn handle_predict(
    config: web::Data<AppConfig>,
    model: web::Data<ModelHandle>,
    explainer: web::Data<Explainer>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let upload = read_upload(payload).await?;
    let report = pipeline::run(&config, &model, &explainer, upload).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(pages::report_page(&report)))
}

async fn handle_predict_api(
    config: web::Data<AppConfig>,
    model: web::Data<ModelHandle>,
    explainer: web::Data<Explainer>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    use actix_web::ResponseError;

    let upload = read_upload(payload).await?;
    match pipeline::run(&config, &model, &explainer, upload).await {
        Ok(report) => Ok(HttpResponse::Ok().json(report)),
        Err(e) => {
            error!("scan pipeline failed: {}", e);
            Ok(HttpResponse::build(e.status_code()).json(json!({ "error": e.to_string() })))
        }
    }
}

/// Reads the first file-carrying field off the multipart stream.
async fn read_upload(mut payload: Multipart) -> Result<ScanUpload, Error> {
    let mut filename = None;
    let mut bytes = Vec::new();

    while let Ok(Some(mut field)) = payload.try_next().await {
        let field_filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|name| name.to_string());
        if field_filename.is_none() {
            continue;
        }

        while let Some(chunk) = field.next().await {
            let data = chunk?;
            bytes.write_all(&data)?;
        }

        filename = field_filename;
        if !bytes.is_empty() {
            break;
        }
    }

    Ok(ScanUpload { filename, bytes })
}

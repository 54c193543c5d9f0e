#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::Multipart,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::error::FillError;
use crate::loader::XlsxSource;
use crate::resolver::{self, SourceSpec};
use crate::rewriter;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: Option<String>,
}

pub async fn run(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Build router
    let app = Router::new()
        .route("/", get(serve_landing))
        .route("/api/fill", post(fill_template));

    // Start server
    let listener = TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

/// One upload request: template docx + data workbook + optional JSON source
/// configuration. The whole fill runs to completion inside this handler;
/// nothing is shared across requests.
async fn fill_template(mut multipart: Multipart) -> Response {
    let mut template = Vec::new();
    let mut template_name = String::from("document.docx");
    let mut data = Vec::new();
    let mut sources_json: Option<String> = None;

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        match field.name().unwrap_or("unknown") {
            "template" => {
                if let Some(name) = field.file_name() {
                    template_name = name.to_string();
                }
                template = field.bytes().await.unwrap_or_default().to_vec();
            }
            "data" => {
                data = field.bytes().await.unwrap_or_default().to_vec();
            }
            "sources" => {
                sources_json = field.text().await.ok().filter(|s| !s.trim().is_empty());
            }
            _ => {}
        }
    }

    if template.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No template file received");
    }
    if data.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No data file received");
    }

    match fill(&template, data, sources_json.as_deref()) {
        Ok((document, warnings)) => {
            for warning in &warnings {
                log::warn!("fill {}: {}", template_name, warning);
            }
            let filename = template_name.replace(".docx", "_generated.docx");

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, DOCX_MIME)
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                )
                .header("x-fill-warnings", warnings.len().to_string())
                .body(axum::body::Body::from(document))
                .unwrap()
        }
        Err(e) => {
            let status = match e {
                FillError::BadConfig(_) | FillError::BadDocument(_) | FillError::NoData => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, &e.to_string())
        }
    }
}

/// The synchronous request body: build the mapping, rewrite the document.
fn fill(
    template: &[u8],
    data: Vec<u8>,
    sources_json: Option<&str>,
) -> Result<(Vec<u8>, Vec<String>), FillError> {
    let mut source = XlsxSource::from_bytes(data)?;

    let specs: Vec<SourceSpec> = match sources_json {
        Some(text) => resolver::specs_from_json(text)?,
        None => resolver::specs_from_sheets(&source),
    };

    let build = resolver::build_mapping(&mut source, &specs)?;
    let (document, _stats) = rewriter::fill_bytes(template, &build.mapping)?;
    Ok((document, build.warnings))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: Some(message.to_string()),
        }),
    )
        .into_response()
}

use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    app_state::{AppState, Status},
    export, extractor,
    models::TABLE_HEADERS,
    pdf,
};

const NO_FILE_TEXT: &str = "Nenhum arquivo enviado.";

type ApiError = (StatusCode, Json<serde_json::Value>);

// --- Respuestas de la API ---

/// Las tres salidas de la interfaz: texto, tabla y enlace de descarga.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    text: String,
    headers: [&'static str; 13],
    rows: Vec<Vec<String>>,
    patient_name: Option<String>,
    download_url: Option<String>,
}

impl ProcessResponse {
    /// Sólo un mensaje en el cuadro de texto; tabla y descarga vacías.
    fn message(text: String) -> Self {
        Self {
            text,
            headers: TABLE_HEADERS,
            rows: Vec::new(),
            patient_name: None,
            download_url: None,
        }
    }
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_upload_bytes;
    Router::new()
        .route("/api/process", post(process_handler))
        .route("/api/download/:id", get(download_handler))
        .route("/api/status", get(status_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn process_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await.map_err(|e| {
        warn!("Formulario multipart inválido: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("Formulário inválido: {}", e)})),
        )
    })?;

    let Some((filename, bytes)) = upload else {
        warn!("Petición de proceso sin fichero.");
        return Ok(Json(ProcessResponse::message(NO_FILE_TEXT.to_string())));
    };

    set_status(&state, true, format!("Processando {}...", filename));

    let text = match pdf::decode_pdf(bytes).await {
        Ok(text) => text,
        Err(e) => {
            warn!("No se pudo leer el PDF {}: {}", filename, e);
            let message = format!("Erro ao ler PDF: {}", e);
            set_status(&state, false, message.clone());
            return Ok(Json(ProcessResponse::message(message)));
        }
    };

    match process_text(&state, &text) {
        Ok(response) => {
            info!(
                "Procesado {}: {} campos, paciente {}.",
                filename,
                response.rows.len(),
                if response.patient_name.is_some() { "identificado" } else { "no identificado" }
            );
            set_status(&state, false, format!("{} processado.", filename));
            Ok(Json(response))
        }
        Err(e) => {
            error!("Error generando el resumen de {}: {:#}", filename, e);
            set_status(&state, false, format!("Erro ao gerar o resumo: {}", e));
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Erro ao gerar o resumo: {}", e)})),
            ))
        }
    }
}

#[axum::debug_handler]
async fn download_handler(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let path = state.artifacts.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let content = tokio::fs::read(&path).await.map_err(|e| {
        error!("No se pudo leer {}: {}", path.display(), e);
        StatusCode::NOT_FOUND
    })?;

    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "resumo.txt".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    ))
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Status> {
    Json(state.status.lock().unwrap().clone())
}

#[axum::debug_handler]
async fn shutdown_handler(
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}

// --- Utilidades ---

/// Devuelve el primer campo `file` con contenido. Un campo vacío y sin
/// nombre (formulario enviado sin seleccionar fichero) cuenta como ausente.
async fn read_upload(
    multipart: &mut Multipart,
) -> Result<Option<(String, Vec<u8>)>, axum::extract::multipart::MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if filename.is_empty() && bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some((filename, bytes.to_vec())));
    }
    Ok(None)
}

/// Extrae los datos, guarda el .txt y arma la respuesta.
fn process_text(state: &AppState, text: &str) -> anyhow::Result<ProcessResponse> {
    let extraction = extractor::extract(Some(text));
    let path = export::write_summary(&state.config.output_dir, &extraction.summary)?;
    let id = state.artifacts.register(path);

    Ok(ProcessResponse {
        rows: extraction.rows(),
        text: extraction.summary,
        headers: TABLE_HEADERS,
        patient_name: extraction.patient_name,
        download_url: Some(format!("/api/download/{}", id)),
    })
}

fn set_status(state: &AppState, is_busy: bool, message: String) {
    let mut status = state.status.lock().unwrap();
    status.is_busy = is_busy;
    status.message = message;
    if !is_busy {
        status.last_processed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    const BOUNDARY: &str = "teleterapia-boundary";
    const REPORT: &str = "Nome do Paciente: Maria Souza Matricula: 998877\n\
        Campo 1 6X\n\
        Jaw Y1 Campo 1 Y1: 5.0 cm Jaw Y2 Campo 1 Y2: -5.0 cm Filtro\n\
        total fluence fsx = 100 mm fsy = 100 mm";

    fn test_state(dir: &std::path::Path) -> AppState {
        let (tx, _rx) = oneshot::channel();
        AppState::new(
            AppConfig {
                server_addr: "127.0.0.1:0".into(),
                frontend_dir: "frontend".into(),
                output_dir: dir.to_path_buf(),
                max_upload_bytes: 1024 * 1024,
                open_browser: false,
            },
            tx,
        )
    }

    fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_file_returns_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .oneshot(multipart_request("otro", "plan.pdf", b"%PDF"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["text"], NO_FILE_TEXT);
        assert_eq!(body["rows"], json!([]));
        assert!(body["download_url"].is_null());
    }

    #[tokio::test]
    async fn unreadable_pdf_reports_error_text() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .oneshot(multipart_request("file", "plan.pdf", b"no es un pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["text"].as_str().unwrap().starts_with("Erro ao ler PDF: "));
        assert_eq!(body["rows"], json!([]));
        assert!(body["download_url"].is_null());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn processed_text_round_trips_through_download() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let response = process_text(&state, REPORT).unwrap();

        assert_eq!(response.patient_name.as_deref(), Some("Maria Souza"));
        assert_eq!(response.headers, TABLE_HEADERS);
        assert_eq!(
            response.rows,
            vec![vec![
                "6X", "N/A", "N/A", "5.0", "-5.0", "N/A", "N/A", "N/A", "N/A", "N/A", "N/A",
                "100", "100"
            ]]
        );

        let url = response.download_url.clone().unwrap();
        let download = create_router(state)
            .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(download.status(), StatusCode::OK);
        assert_eq!(
            download.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(download.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes, response.text.as_bytes());
    }

    #[tokio::test]
    async fn unknown_download_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/download/no-existe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_reports_last_action() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        set_status(&state, false, "plan.pdf processado.".into());

        let response = create_router(state)
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["is_busy"], false);
        assert_eq!(body["message"], "plan.pdf processado.");
        assert!(body["last_processed_at"].is_string());
    }
}

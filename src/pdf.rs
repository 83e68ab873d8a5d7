//! Decodificación del PDF subido a un único texto plano.

use anyhow::{anyhow, Result};
use tracing::info;

/// Extrae el texto de todas las páginas del PDF y las une con saltos de
/// línea. Una página sin texto aporta una cadena vacía.
///
/// `pdf-extract` es síncrono y puede entrar en pánico con ficheros
/// corruptos, así que se ejecuta en un hilo bloqueante: el pánico llega
/// como error del `JoinHandle`.
pub async fn decode_pdf(bytes: Vec<u8>) -> Result<String> {
    if bytes.is_empty() {
        return Err(anyhow!("arquivo vazio"));
    }

    let size = bytes.len();
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| anyhow!("falha interna do decodificador: {e}"))?
    .map_err(|e| anyhow!("{e}"))?;

    info!("PDF decodificado: {} páginas, {} bytes.", pages.len(), size);
    Ok(join_pages(&pages))
}

fn join_pages(pages: &[String]) -> String {
    pages.join("\n")
}

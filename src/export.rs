//! Generación del fichero .txt descargable con el resumen de la extracción.

use std::{
    collections::VecDeque,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

/// Escribe el resumen en un fichero temporal nuevo (`teleterapia_*.txt`)
/// dentro de `dir`. El fichero no se borra al terminar la petición.
pub fn write_summary(dir: &Path, summary: &str) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("teleterapia_")
        .suffix(".txt")
        .tempfile_in(dir)
        .with_context(|| format!("não foi possível criar o arquivo em {}", dir.display()))?;

    file.write_all(summary.as_bytes())
        .context("falha ao gravar o resumo")?;
    file.flush().context("falha ao gravar o resumo")?;

    let (_, path) = file
        .keep()
        .map_err(|e| e.error)
        .context("falha ao manter o arquivo temporário")?;

    info!("Resumen guardado en {}", path.display());
    Ok(path)
}

/// Número de descargas recientes que se mantienen accesibles.
const MAX_ARTIFACTS: usize = 64;

/// Registro de los ficheros generados, indexados por un id opaco que es lo
/// único que ve el frontend. Sólo se recuerdan los `capacity` más recientes;
/// los ficheros antiguos siguen en disco pero dejan de poder descargarse.
#[derive(Clone)]
pub struct ArtifactStore {
    inner: Arc<Mutex<VecDeque<(String, PathBuf)>>>,
    capacity: usize,
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::with_capacity(MAX_ARTIFACTS)
    }
}

impl ArtifactStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn register(&self, path: PathBuf) -> String {
        let id = Uuid::new_v4().to_string();
        let mut entries = self.inner.lock().unwrap();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((id.clone(), path));
        id
    }

    pub fn get(&self, id: &str) -> Option<PathBuf> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, path)| path.clone())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

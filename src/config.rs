//! Carga y gestión de configuración de la aplicación.

use std::{env, path::PathBuf};
use anyhow::{anyhow, Result};

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub frontend_dir: PathBuf,
    /// Directorio donde se crean los .txt descargables.
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub open_browser: bool,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server_addr = var("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:7860".to_string());
        let frontend_dir = var("FRONTEND_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("frontend"));
        let output_dir = var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let max_upload_mb = match var("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| anyhow!("MAX_UPLOAD_MB no es un número válido: {raw}"))?,
            None => 20,
        };

        let open_browser = match var("OPEN_BROWSER") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("OPEN_BROWSER debe ser true/false: {raw}"))?,
            None => true,
        };

        Ok(Self {
            server_addr,
            frontend_dir,
            output_dir,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            open_browser,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config_with(&[]).unwrap();
        assert_eq!(cfg.server_addr, "127.0.0.1:7860");
        assert_eq!(cfg.frontend_dir, PathBuf::from("frontend"));
        assert_eq!(cfg.output_dir, env::temp_dir());
        assert_eq!(cfg.max_upload_bytes, 20 * 1024 * 1024);
        assert!(cfg.open_browser);
    }

    #[test]
    fn overrides() {
        let cfg = config_with(&[
            ("SERVER_ADDR", "0.0.0.0:9000"),
            ("OUTPUT_DIR", "/var/tmp/teleterapia"),
            ("MAX_UPLOAD_MB", "5"),
            ("OPEN_BROWSER", "off"),
        ])
        .unwrap();
        assert_eq!(cfg.server_addr, "0.0.0.0:9000");
        assert_eq!(cfg.output_dir, PathBuf::from("/var/tmp/teleterapia"));
        assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
        assert!(!cfg.open_browser);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config_with(&[("MAX_UPLOAD_MB", "mucho")]).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_MB"));
        let err = config_with(&[("OPEN_BROWSER", "quizás")]).unwrap_err();
        assert!(err.to_string().contains("OPEN_BROWSER"));
    }
}

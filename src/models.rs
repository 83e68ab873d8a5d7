//! Modelos de dominio (campos de tratamiento y resultado de la extracción).

use serde::Serialize;

/// Valor centinela para cualquier dato que no se encuentra en el documento.
pub const NOT_AVAILABLE: &str = "N/A";

/// Valor de las columnas de fluencia cuando no aplican (campo con filtro o
/// sin fluencia detectada).
pub const NO_FLUENCE: &str = "-";

/// Texto del resumen cuando no se ha extraído absolutamente nada.
pub const NO_DATA_TEXT: &str = "Nenhum dado extraído.";

/// Cabeceras de la tabla, en el orden exacto de las celdas de cada fila.
pub const TABLE_HEADERS: [&str; 13] = [
    "Energia", "X", "Y", "Y1", "Y2", "Filtro", "MU", "Dose", "SSD", "Prof", "P.Ef", "FSX", "FSY",
];

/// Un campo (haz) del plan de tratamiento.
/// Todos los valores se guardan tal cual aparecen en el texto del informe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRecord {
    pub energy: String,
    pub size_x: String,
    pub size_y: String,
    pub jaw_y1: String,
    pub jaw_y2: String,
    pub filter: String,
    pub monitor_units: String,
    pub dose: String,
    pub ssd: String,
    pub depth: String,
    pub effective_depth: String,
    pub fluence_x: String,
    pub fluence_y: String,
}

impl FieldRecord {
    /// Fila de relleno cuando el documento no contiene ningún "Campo N".
    pub fn placeholder() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            energy: na(),
            size_x: na(),
            size_y: na(),
            jaw_y1: na(),
            jaw_y2: na(),
            filter: na(),
            monitor_units: na(),
            dose: na(),
            ssd: na(),
            depth: na(),
            effective_depth: na(),
            fluence_x: NO_FLUENCE.to_string(),
            fluence_y: NO_FLUENCE.to_string(),
        }
    }

    /// Celdas en el orden de `TABLE_HEADERS`.
    pub fn cells(&self) -> [&str; 13] {
        [
            &self.energy,
            &self.size_x,
            &self.size_y,
            &self.jaw_y1,
            &self.jaw_y2,
            &self.filter,
            &self.monitor_units,
            &self.dose,
            &self.ssd,
            &self.depth,
            &self.effective_depth,
            &self.fluence_x,
            &self.fluence_y,
        ]
    }

    /// Línea del resumen de texto: celdas separadas por ", ".
    pub fn summary_line(&self) -> String {
        self.cells().join(", ")
    }
}

/// Unidad de tratamiento declarada en la cabecera del informe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreatmentUnit {
    pub name: String,
    pub energy: String,
}

/// Resultado completo de procesar el texto de un informe.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub patient_name: Option<String>,
    pub registration: Option<String>,
    pub unit: Option<TreatmentUnit>,
    pub fields: Vec<FieldRecord>,
    pub summary: String,
}

impl Extraction {
    /// Tabla en formato fila-mayor, lista para serializar al frontend.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.fields
            .iter()
            .map(|f| f.cells().iter().map(|c| c.to_string()).collect())
            .collect()
    }
}

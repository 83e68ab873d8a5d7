//! Extracción de los datos del plan de teleterapia a partir del texto plano
//! del informe PDF.
//!
//! Flujo:
//!   1. Normaliza el texto (todos los espacios en blanco a un único espacio).
//!   2. Busca los datos escalares (paciente, matrícula, unidad).
//!   3. Enumera las cabeceras "Campo N <energía>": fijan el número de filas.
//!   4. Para cada columna aísla el bloque entre dos marcadores fijos y
//!      recoge un valor por campo.
//!   5. Ensambla las filas rellenando con "N/A" y genera el resumen de texto.
//!
//! Nunca falla: cualquier dato que no se encuentre se degrada a "N/A" o a
//! una lista vacía.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{
    Extraction, FieldRecord, TreatmentUnit, NOT_AVAILABLE, NO_DATA_TEXT, NO_FLUENCE,
};

static PATIENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Nome do Paciente:\s*(.+?)\s*Matricula").unwrap());
static REGISTRATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Matricula:\s*(\d+)").unwrap());
static UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Unidade de tratamento:\s*([^,]+),\s*energia:\s*(\S+)").unwrap()
});
static FIELD_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Campo (\d+)\s+(\d+X)").unwrap());

static CM_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Campo \d+\s*([\d.]+)\s*cm").unwrap());
static JAW_Y1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Y1:\s*([+-]?\d+\.\d+)").unwrap());
static JAW_Y2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Y2:\s*([+-]?\d+\.\d+)").unwrap());
static FILTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Campo \d+\s*([-\w]+)").unwrap());
static MU_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Campo \d+\s*([\d.]+)\s*MU").unwrap());
static DOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Campo \d+\s+([\d.]+)\s*cGy").unwrap());

static FLUENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)(?:total fluence|flu[eê]ncia total).*?fsx\s*=\s*(\d+)\s*mm.*?fsy\s*=\s*(\d+)\s*mm",
    )
    .unwrap()
});

/// Valores de filtro que equivalen a "sin filtro".
const EMPTY_FILTERS: [&str; 3] = ["-", "nan", ""];

/// Procesa el texto de un informe. Acepta `None` o texto vacío.
pub fn extract(raw: Option<&str>) -> Extraction {
    let text = normalize(raw.unwrap_or_default());

    let patient_name = first_capture(&PATIENT_RE, &text);
    let registration = first_capture(&REGISTRATION_RE, &text);
    let unit = UNIT_RE.captures(&text).map(|caps| TreatmentUnit {
        name: caps[1].trim().to_string(),
        energy: caps[2].trim().to_string(),
    });

    let energies: Vec<String> = FIELD_HEADER_RE
        .captures_iter(&text)
        .map(|caps| caps[2].to_string())
        .collect();

    // El orden de los marcadores importa: cada bloque termina donde empieza el siguiente.
    let size_x = block_values(&text, "Tamanho do Campo Aberto X", &["Tamanho do Campo Aberto Y"], &CM_VALUE_RE);
    let size_y = block_values(&text, "Tamanho do Campo Aberto Y", &["Jaw Y1"], &CM_VALUE_RE);
    let jaw_y1 = block_values(&text, "Jaw Y1", &["Jaw Y2"], &JAW_Y1_RE);
    let jaw_y2 = block_values(&text, "Jaw Y2", &["Filtro"], &JAW_Y2_RE);
    let filters = block_values(&text, "Filtro", &["MU"], &FILTER_RE);
    let monitor_units = block_values(&text, "MU", &["Dose"], &MU_RE);
    let doses = all_captures(&DOSE_RE, &text);
    let ssd = block_values(&text, "SSD", &["Profundidade"], &CM_VALUE_RE);
    let depth = block_values(&text, "Profundidade", &["Profundidade Efetiva"], &CM_VALUE_RE);
    let effective_depth = block_values(
        &text,
        "Profundidade Efetiva",
        &["Informações do Campo", "Campo 1"],
        &CM_VALUE_RE,
    );

    let fluences: Vec<(String, String)> = FLUENCE_RE
        .captures_iter(&text)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect();

    debug!(
        "Extracción: {} campos, X={} Y={} Y1={} Y2={} filtros={} MU={} dosis={} SSD={} prof={} p.ef={} fluencias={}",
        energies.len(),
        size_x.len(),
        size_y.len(),
        jaw_y1.len(),
        jaw_y2.len(),
        filters.len(),
        monitor_units.len(),
        doses.len(),
        ssd.len(),
        depth.len(),
        effective_depth.len(),
        fluences.len()
    );

    let columns = [
        &size_x,
        &size_y,
        &jaw_y1,
        &jaw_y2,
        &filters,
        &monitor_units,
        &doses,
        &ssd,
        &depth,
        &effective_depth,
    ];
    let nothing_found = patient_name.is_none()
        && registration.is_none()
        && unit.is_none()
        && energies.is_empty()
        && fluences.is_empty()
        && columns.iter().all(|c| c.is_empty());

    let row_count = energies.len().max(1);
    let fields: Vec<FieldRecord> = (0..row_count)
        .map(|i| {
            let (fluence_x, fluence_y) = fluence_for_row(filters.get(i), &fluences, i);
            FieldRecord {
                energy: value_at(&energies, i),
                size_x: value_at(&size_x, i),
                size_y: value_at(&size_y, i),
                jaw_y1: value_at(&jaw_y1, i),
                jaw_y2: value_at(&jaw_y2, i),
                filter: value_at(&filters, i),
                monitor_units: value_at(&monitor_units, i),
                dose: value_at(&doses, i),
                ssd: value_at(&ssd, i),
                depth: value_at(&depth, i),
                effective_depth: value_at(&effective_depth, i),
                fluence_x,
                fluence_y,
            }
        })
        .collect();

    let summary = if nothing_found {
        NO_DATA_TEXT.to_string()
    } else {
        build_summary(
            patient_name.as_deref(),
            registration.as_deref(),
            unit.as_ref(),
            &fields,
        )
    };

    Extraction {
        patient_name,
        registration,
        unit,
        fields,
        summary,
    }
}

/// Colapsa cualquier secuencia de espacios en blanco (saltos de línea
/// incluidos) a un único espacio. Los separadores ASCII 0x1C-0x1F también
/// cuentan como espacio.
pub fn normalize(raw: &str) -> String {
    raw.split(is_separator)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

fn all_captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text).map(|caps| caps[1].to_string()).collect()
}

/// Texto entre `start` y el primer `end` posterior (sin distinguir
/// mayúsculas). Si el primer marcador final no delimita nada se prueban los
/// siguientes, en orden.
fn find_block(text: &str, start: &str, ends: &[&str]) -> Option<String> {
    ends.iter().find_map(|end| {
        let pattern = format!(r"(?is){}(.*?){}", regex::escape(start), regex::escape(end));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                debug!("Patrón de bloque inválido '{}': {}", pattern, e);
                return None;
            }
        };
        first_capture(&re, text)
    })
}

fn block_values(text: &str, start: &str, ends: &[&str], value_re: &Regex) -> Vec<String> {
    find_block(text, start, ends)
        .map(|block| all_captures(value_re, &block))
        .unwrap_or_default()
}

fn value_at(values: &[String], index: usize) -> String {
    values
        .get(index)
        .cloned()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// La fluencia sólo se rellena en campos sin filtro. Si hay más campos que
/// pares detectados se repite el último par.
fn fluence_for_row(
    filter: Option<&String>,
    fluences: &[(String, String)],
    index: usize,
) -> (String, String) {
    let has_filter = filter.is_some_and(|f| !EMPTY_FILTERS.contains(&f.as_str()));
    if has_filter {
        return (NO_FLUENCE.to_string(), NO_FLUENCE.to_string());
    }
    fluences
        .get(index)
        .or_else(|| fluences.last())
        .cloned()
        .unwrap_or_else(|| (NO_FLUENCE.to_string(), NO_FLUENCE.to_string()))
}

fn build_summary(
    patient_name: Option<&str>,
    registration: Option<&str>,
    unit: Option<&TreatmentUnit>,
    fields: &[FieldRecord],
) -> String {
    let mut lines = Vec::with_capacity(fields.len() + 3);
    if let Some(name) = patient_name {
        lines.push(format!("Nome do Paciente: {}", name));
    }
    if let Some(registration) = registration {
        lines.push(format!("Matricula: {}", registration));
    }
    if let Some(unit) = unit {
        lines.push(format!(
            "Unidade de tratamento: {} | Energia: {}",
            unit.name, unit.energy
        ));
    }
    lines.extend(fields.iter().map(FieldRecord::summary_line));
    lines.join("\n")
}

use crate::utils::error::{OrderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four catalogues the backend exposes under `/api`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "experiencias")]
    Experience,
    #[serde(rename = "formaciones")]
    Education,
    #[serde(rename = "habilidades")]
    Skills,
    #[serde(rename = "proyectos")]
    Projects,
}

/// How a section is put in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStrategy {
    Chronological,
    Slotted,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Experience,
        Section::Education,
        Section::Skills,
        Section::Projects,
    ];

    /// Path segment under `/api` and base name of the output files.
    pub fn resource(&self) -> &'static str {
        match self {
            Section::Experience => "experiencias",
            Section::Education => "formaciones",
            Section::Skills => "habilidades",
            Section::Projects => "proyectos",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Experience => "Experiencia Laboral",
            Section::Education => "Formación",
            Section::Skills => "Habilidades Técnicas",
            Section::Projects => "Mis Proyectos",
        }
    }

    pub fn strategy(&self) -> OrderStrategy {
        match self {
            Section::Experience | Section::Education => OrderStrategy::Chronological,
            Section::Skills | Section::Projects => OrderStrategy::Slotted,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

impl FromStr for Section {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "experiencias" | "experiencia" | "experience" => Ok(Section::Experience),
            "formaciones" | "formacion" | "formación" | "education" => Ok(Section::Education),
            "habilidades" | "habilidad" | "skills" => Ok(Section::Skills),
            "proyectos" | "proyecto" | "projects" => Ok(Section::Projects),
            other => Err(OrderError::InvalidConfigValueError {
                field: "section".to_string(),
                value: other.to_string(),
                reason: "expected one of experiencias, formaciones, habilidades, proyectos"
                    .to_string(),
            }),
        }
    }
}

/// The fields of a timeline entry the chronological ranker reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodFields<'a> {
    pub start_month: Option<&'a str>,
    pub start_year: Option<i32>,
    pub end_month: Option<&'a str>,
    pub end_year: Option<i32>,
    pub ongoing: bool,
}

/// A record spanning a bounded or open-ended interval of months.
pub trait Period {
    fn period(&self) -> PeriodFields<'_>;
}

/// A record that may ask for a fixed 1-based display slot.
pub trait Positionable {
    fn position(&self) -> Option<f64>;
}

/// Label and detail columns used in the CSV summaries.
pub trait Listing {
    fn id(&self) -> &str;
    fn label(&self) -> String;
    fn detail(&self) -> String;
}

/// Section-agnostic period record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub start_month: Option<String>,
    #[serde(default, deserialize_with = "lenient::year")]
    pub start_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub end_month: Option<String>,
    #[serde(default, deserialize_with = "lenient::year")]
    pub end_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub ongoing: bool,
}

impl Period for PeriodRecord {
    fn period(&self) -> PeriodFields<'_> {
        PeriodFields {
            start_month: self.start_month.as_deref(),
            start_year: self.start_year,
            end_month: self.end_month.as_deref(),
            end_year: self.end_year,
            ongoing: self.ongoing,
        }
    }
}

/// Section-agnostic positionable item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct PositionableItem {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(
        default,
        deserialize_with = "lenient::position",
        serialize_with = "lenient::serialize_position"
    )]
    pub position: Option<f64>,
}

impl Positionable for PositionableItem {
    fn position(&self) -> Option<f64> {
        self.position
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub puesto: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub empresa: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub descripcion: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub mes_inicio: Option<String>,
    #[serde(default, deserialize_with = "lenient::year")]
    pub ano_inicio: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub mes_fin: Option<String>,
    #[serde(default, deserialize_with = "lenient::year")]
    pub ano_fin: Option<i32>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub trabajo_activo: bool,
}

impl Period for Experience {
    fn period(&self) -> PeriodFields<'_> {
        PeriodFields {
            start_month: self.mes_inicio.as_deref(),
            start_year: self.ano_inicio,
            end_month: self.mes_fin.as_deref(),
            end_year: self.ano_fin,
            ongoing: self.trabajo_activo,
        }
    }
}

impl Listing for Experience {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.puesto.clone()
    }

    fn detail(&self) -> String {
        format!("{} · {}", self.empresa, date_range(&self.period()))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub centro: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub mes_inicio: Option<String>,
    #[serde(default, deserialize_with = "lenient::year")]
    pub ano_inicio: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub mes_fin: Option<String>,
    #[serde(default, deserialize_with = "lenient::year")]
    pub ano_fin: Option<i32>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub cursando_ahora: bool,
}

impl Period for Education {
    fn period(&self) -> PeriodFields<'_> {
        PeriodFields {
            start_month: self.mes_inicio.as_deref(),
            start_year: self.ano_inicio,
            end_month: self.mes_fin.as_deref(),
            end_year: self.ano_fin,
            ongoing: self.cursando_ahora,
        }
    }
}

impl Listing for Education {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.nombre.clone()
    }

    fn detail(&self) -> String {
        format!("{} · {}", self.centro, date_range(&self.period()))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Skill {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::position",
        serialize_with = "lenient::serialize_position"
    )]
    pub position: Option<f64>,
}

impl Positionable for Skill {
    fn position(&self) -> Option<f64> {
        self.position
    }
}

impl Listing for Skill {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn detail(&self) -> String {
        self.category.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Project {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub descripcion: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub enlace: Option<String>,
    #[serde(default, deserialize_with = "lenient::tags")]
    pub tecnologias: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub imagen: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::position",
        serialize_with = "lenient::serialize_position"
    )]
    pub position: Option<f64>,
}

impl Positionable for Project {
    fn position(&self) -> Option<f64> {
        self.position
    }
}

impl Listing for Project {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.nombre.clone()
    }

    fn detail(&self) -> String {
        self.tecnologias.join(", ")
    }
}

/// Skills sharing a category, shown as one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryColumn {
    pub category: String,
    pub skills: Vec<Skill>,
}

/// Raw documents fetched for one section.
#[derive(Debug, Clone)]
pub struct SectionFetch {
    pub section: Section,
    pub documents: Vec<serde_json::Value>,
    /// Set when the fetch failed and `documents` is the empty fallback.
    pub fetch_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub sections: Vec<SectionFetch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderedItems {
    Experience(Vec<Experience>),
    Education(Vec<Education>),
    Skills {
        skills: Vec<Skill>,
        columns: Vec<CategoryColumn>,
    },
    Projects(Vec<Project>),
}

impl OrderedItems {
    pub fn len(&self) -> usize {
        match self {
            OrderedItems::Experience(items) => items.len(),
            OrderedItems::Education(items) => items.len(),
            OrderedItems::Skills { skills, .. } => skills.len(),
            OrderedItems::Projects(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<String> {
        self.listings().iter().map(|l| l.id().to_string()).collect()
    }

    pub fn listings(&self) -> Vec<&dyn Listing> {
        match self {
            OrderedItems::Experience(items) => items.iter().map(|i| i as &dyn Listing).collect(),
            OrderedItems::Education(items) => items.iter().map(|i| i as &dyn Listing).collect(),
            OrderedItems::Skills { skills, .. } => {
                skills.iter().map(|i| i as &dyn Listing).collect()
            }
            OrderedItems::Projects(items) => items.iter().map(|i| i as &dyn Listing).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderedSection {
    pub section: Section,
    pub items: OrderedItems,
    /// Documents dropped because they were not JSON objects.
    pub skipped: usize,
    pub fetch_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderedPortfolio {
    pub sections: Vec<OrderedSection>,
}

impl OrderedPortfolio {
    pub fn section(&self, section: Section) -> Option<&OrderedSection> {
        self.sections.iter().find(|s| s.section == section)
    }
}

/// "Enero 2022 - Actualidad" style range shown on timeline cards.
pub fn date_range(period: &PeriodFields<'_>) -> String {
    let start = month_year(period.start_month, period.start_year);
    let end = if period.ongoing {
        "Actualidad".to_string()
    } else {
        month_year(period.end_month, period.end_year)
    };
    format!("{} - {}", start, end)
}

fn month_year(month: Option<&str>, year: Option<i32>) -> String {
    match (month, year) {
        (Some(m), Some(y)) => format!("{} {}", m, y),
        (Some(m), None) => m.to_string(),
        (None, Some(y)) => y.to_string(),
        (None, None) => "?".to_string(),
    }
}

// position 與 posicion 可能同時出現，解碼前先合併
macro_rules! pinned_serde {
    ($($ty:ty),+) => {$(
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                let value = lenient::merge_position(serde_json::Value::deserialize(d)?);
                <$ty>::deserialize(value).map_err(serde::de::Error::custom)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
                <$ty>::serialize(self, s)
            }
        }
    )+};
}

pinned_serde!(PositionableItem, Skill, Project);

/// Deserializers that accept whatever the admin forms managed to store.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    /// Folds the `posicion` key into `position`. A present, non-blank
    /// `position` wins.
    pub fn merge_position(value: Value) -> Value {
        let Value::Object(mut doc) = value else {
            return value;
        };
        if let Some(legacy) = doc.remove("posicion") {
            let missing = match doc.get("position") {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                doc.insert("position".to_string(), legacy);
            }
        }
        Value::Object(doc)
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        })
    }

    /// Blank strings count as absent: the forms send `""` for unset selects.
    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
    }

    pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        })
    }

    pub fn position<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let raw = match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(raw.filter(|p| p.is_finite()))
    }

    pub fn serialize_position<S: Serializer>(
        position: &Option<f64>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match position {
            Some(p) if p.fract() == 0.0 && p.abs() < i64::MAX as f64 => s.serialize_i64(*p as i64),
            Some(p) => s.serialize_f64(*p),
            None => s.serialize_none(),
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
            Value::Number(n) => n.as_i64() == Some(1),
            _ => false,
        })
    }

    /// Accepts either a JSON array or the comma separated text the project form edits.
    pub fn tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let tags = match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect(),
            Value::String(s) => s.split(',').map(|t| t.trim().to_string()).collect(),
            _ => Vec::new(),
        };
        Ok(tags.into_iter().filter(|t: &String| !t.is_empty()).collect())
    }
}

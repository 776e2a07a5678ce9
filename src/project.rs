//! Project model
//!
//! A minimal project: a name, a layout choice and two object lists
//! (specimens and phases). Projects are stored as JSON.

use crate::binding::Choices;
use crate::error::{Result, XrdError};
use crate::model::{
    expect_float, expect_string, unknown_property, DataType, Model, ModelType, ObjectCollection,
    ObjectList, PropertyDescriptor, Schema,
};
use crate::types::{ObjectRef, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// ==================== Pattern ====================

/// Measured diffraction pattern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Diffraction angles in degrees 2θ
    pub two_theta: Vec<f64>,
    pub intensity: Vec<f64>,
}

/// Descriptive numbers for a pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub points: usize,
    pub min_two_theta: f64,
    pub max_two_theta: f64,
    pub max_intensity: f64,
    /// Trapezoidal integral of intensity over 2θ
    pub integrated_intensity: f64,
}

impl Pattern {
    pub fn new(two_theta: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if two_theta.len() != intensity.len() {
            return Err(XrdError::Project(format!(
                "pattern has {} angles but {} intensities",
                two_theta.len(),
                intensity.len()
            )));
        }
        Ok(Self {
            two_theta,
            intensity,
        })
    }

    pub fn len(&self) -> usize {
        self.two_theta.len().min(self.intensity.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> PatternSummary {
        let n = self.len();
        let points = &self.two_theta[..n];
        let values = &self.intensity[..n];

        let integrated_intensity = points
            .windows(2)
            .zip(values.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum();

        PatternSummary {
            points: n,
            min_two_theta: points.iter().copied().fold(f64::NAN, f64::min),
            max_two_theta: points.iter().copied().fold(f64::NAN, f64::max),
            max_intensity: values.iter().copied().fold(f64::NAN, f64::max),
            integrated_intensity,
        }
    }

    /// Cache key identifying this pattern's data
    pub fn cache_key(&self) -> String {
        let mut key = String::with_capacity(16 * self.len() + 16);
        key.push_str("pattern-summary:");
        for (x, y) in self.two_theta.iter().zip(&self.intensity) {
            key.push_str(&format!("{:x},{:x};", x.to_bits(), y.to_bits()));
        }
        key
    }
}

// ==================== Specimen ====================

pub static SPECIMEN_SCHEMA: Schema = Schema::new(
    "Specimen",
    &[
        PropertyDescriptor::column("name", DataType::String).with_label("Name"),
        PropertyDescriptor::column("sample_length", DataType::Float)
            .with_label(r"\large Sample length (cm)"),
        PropertyDescriptor::column("abs_scale", DataType::Float).with_label("Absolute scale"),
        PropertyDescriptor::column("pattern", DataType::Object).with_label("Pattern"),
    ],
);

/// A measured sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specimen {
    pub name: String,
    #[serde(default = "default_sample_length")]
    pub sample_length: f64,
    #[serde(default = "default_abs_scale")]
    pub abs_scale: f64,
    #[serde(default)]
    pub pattern: Arc<Pattern>,
}

fn default_sample_length() -> f64 {
    3.0
}

fn default_abs_scale() -> f64 {
    1.0
}

impl Specimen {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sample_length: default_sample_length(),
            abs_scale: default_abs_scale(),
            pattern: Arc::new(Pattern::default()),
        }
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Arc::new(pattern);
        self
    }
}

impl Model for Specimen {
    fn schema(&self) -> &'static Schema {
        &SPECIMEN_SCHEMA
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(self.name.as_str().into()),
            "sample_length" => Some(Value::Float(self.sample_length)),
            "abs_scale" => Some(Value::Float(self.abs_scale)),
            "pattern" => Some(Value::Object(ObjectRef::from_arc(Arc::clone(&self.pattern)))),
            _ => None,
        }
    }

    fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "name" => self.name = expect_string(&SPECIMEN_SCHEMA, name, value)?,
            "sample_length" => self.sample_length = expect_float(&SPECIMEN_SCHEMA, name, value)?,
            "abs_scale" => self.abs_scale = expect_float(&SPECIMEN_SCHEMA, name, value)?,
            "pattern" => {
                let pattern = value
                    .as_object()
                    .and_then(|o| o.downcast_ref::<Pattern>())
                    .ok_or_else(|| {
                        XrdError::Configuration("Specimen.pattern expects a Pattern".to_string())
                    })?;
                self.pattern = Arc::new(pattern.clone());
            }
            _ => return Err(unknown_property(&SPECIMEN_SCHEMA, name)),
        }
        Ok(())
    }
}

impl ModelType for Specimen {
    fn type_schema() -> &'static Schema {
        &SPECIMEN_SCHEMA
    }
}

// ==================== Phase ====================

pub static PHASE_SCHEMA: Schema = Schema::new(
    "Phase",
    &[
        PropertyDescriptor::column("name", DataType::String).with_label("Name"),
        PropertyDescriptor::column("weight_fraction", DataType::Float).with_label("W_{phase}"),
        PropertyDescriptor::column("sigma_star", DataType::Float).with_label("σ*"),
        PropertyDescriptor::property("color", DataType::String),
    ],
);

/// A mineral phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default)]
    pub weight_fraction: f64,
    #[serde(default)]
    pub sigma_star: f64,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#008600".to_string()
}

impl Phase {
    pub fn new(name: impl Into<String>, weight_fraction: f64) -> Self {
        Self {
            name: name.into(),
            weight_fraction,
            sigma_star: 0.0,
            color: default_color(),
        }
    }
}

impl Model for Phase {
    fn schema(&self) -> &'static Schema {
        &PHASE_SCHEMA
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(self.name.as_str().into()),
            "weight_fraction" => Some(Value::Float(self.weight_fraction)),
            "sigma_star" => Some(Value::Float(self.sigma_star)),
            "color" => Some(self.color.as_str().into()),
            _ => None,
        }
    }

    fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "name" => self.name = expect_string(&PHASE_SCHEMA, name, value)?,
            "weight_fraction" => self.weight_fraction = expect_float(&PHASE_SCHEMA, name, value)?,
            "sigma_star" => self.sigma_star = expect_float(&PHASE_SCHEMA, name, value)?,
            "color" => self.color = expect_string(&PHASE_SCHEMA, name, value)?,
            _ => return Err(unknown_property(&PHASE_SCHEMA, name)),
        }
        Ok(())
    }
}

impl ModelType for Phase {
    fn type_schema() -> &'static Schema {
        &PHASE_SCHEMA
    }
}

// ==================== Project ====================

fn specimen_schema() -> &'static Schema {
    &SPECIMEN_SCHEMA
}

fn phase_schema() -> &'static Schema {
    &PHASE_SCHEMA
}

pub static PROJECT_SCHEMA: Schema = Schema::new(
    "Project",
    &[
        PropertyDescriptor::property("name", DataType::String),
        PropertyDescriptor::property("description", DataType::String),
        PropertyDescriptor::property("layout", DataType::String),
        PropertyDescriptor::property("layout_choices", DataType::Object),
        PropertyDescriptor::property("specimens", DataType::List(specimen_schema)),
        PropertyDescriptor::property("phases", DataType::List(phase_schema)),
    ],
);

static LAYOUT_CHOICES: Lazy<Arc<Choices>> = Lazy::new(|| {
    Arc::new(vec![
        ("FULL".to_string(), "Full".to_string()),
        ("VIEWONLY".to_string(), "View-only".to_string()),
    ])
});

/// A PyXRD-style project
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub layout: String,
    pub specimens: ObjectList<Specimen>,
    pub phases: ObjectList<Phase>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: "FULL".to_string(),
            ..Default::default()
        }
    }

    /// Load a project file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            XrdError::Project(format!("Failed to read project file {:?}: {}", path, e))
        })?;

        let mut project: Project = serde_json::from_str(&content).map_err(|e| {
            XrdError::Project(format!("Failed to parse project file {:?}: {}", path, e))
        })?;
        if project.layout.is_empty() {
            project.layout = "FULL".to_string();
        }
        Ok(project)
    }

    /// Save project file to disk as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            XrdError::Project(format!("Failed to write project file {:?}: {}", path, e))
        })
    }
}

impl Model for Project {
    fn schema(&self) -> &'static Schema {
        &PROJECT_SCHEMA
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "layout" => Some(self.layout.as_str().into()),
            "layout_choices" => Some(Value::Object(ObjectRef::from_arc(Arc::clone(
                &LAYOUT_CHOICES,
            )))),
            _ => None,
        }
    }

    fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "name" => self.name = expect_string(&PROJECT_SCHEMA, name, value)?,
            "description" => self.description = expect_string(&PROJECT_SCHEMA, name, value)?,
            "layout" => self.layout = expect_string(&PROJECT_SCHEMA, name, value)?,
            _ => return Err(unknown_property(&PROJECT_SCHEMA, name)),
        }
        Ok(())
    }

    fn collection(&self, name: &str) -> Option<&dyn ObjectCollection> {
        match name {
            "specimens" => Some(&self.specimens),
            "phases" => Some(&self.phases),
            _ => None,
        }
    }

    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn ObjectCollection> {
        match name {
            "specimens" => Some(&mut self.specimens),
            "phases" => Some(&mut self.phases),
            _ => None,
        }
    }
}

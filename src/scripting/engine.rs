//! Rhai engine setup for user scripts
//!
//! ## Registered Functions
//!
//! - `plot_safe(text)` - markup for the plot renderer
//! - `string_safe(text)` - plain text rendering of markup
//! - `font_size(text)` - font size hint (10, 15 or 20)
//! - `mt_frac(x)` - `\frac{n}{d}` markup for a number
//! - `mt_range(lower, name, upper)` - `lower <= name <= upper` markup
//! - `load_project(path)` - load a project file and describe it as a map
//!
//! `print` and `debug` output goes to the log.

use crate::mathtext;
use crate::model::Model;
use crate::project::Project;
use crate::types::Value;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map};

/// Create an engine with limits and the helper functions registered
pub fn create_engine() -> Engine {
    let mut engine = Engine::new();
    configure_engine(&mut engine);
    engine
}

fn configure_engine(engine: &mut Engine) {
    // Safety limits
    engine.set_max_expr_depths(64, 64);
    engine.set_max_call_levels(64);
    engine.set_max_operations(50_000_000);
    engine.set_max_string_size(1_000_000);
    engine.set_max_array_size(100_000);
    engine.set_max_map_size(10_000);

    engine.on_print(|text| tracing::info!(target: "xrd_rs::script", "{}", text));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(
            target: "xrd_rs::script",
            "{} @ {:?}: {}",
            source.unwrap_or("script"),
            pos,
            text
        )
    });

    // Markup
    engine.register_fn("plot_safe", |text: &str| mathtext::plot_safe(text));
    engine.register_fn("string_safe", |text: &str| mathtext::string_safe(text));
    engine.register_fn("font_size", |text: &str| mathtext::font_size(text) as i64);
    engine.register_fn("mt_frac", mathtext::mt_frac);
    engine.register_fn("mt_frac", |x: i64| mathtext::mt_frac(x as f64));
    engine.register_fn("mt_range", |lo: f64, name: &str, hi: f64| {
        mathtext::mt_range(lo, name, hi)
    });
    engine.register_fn("mt_range", |lo: i64, name: &str, hi: i64| {
        mathtext::mt_range(lo as f64, name, hi as f64)
    });
    engine.register_fn("mt_range", |lo: f64, name: &str, hi: i64| {
        mathtext::mt_range(lo, name, hi as f64)
    });
    engine.register_fn("mt_range", |lo: i64, name: &str, hi: f64| {
        mathtext::mt_range(lo as f64, name, hi)
    });

    // Projects
    engine.register_fn(
        "load_project",
        |path: &str| -> Result<Map, Box<EvalAltResult>> {
            let project = Project::load(path).map_err(|e| e.to_string())?;
            Ok(describe_project(&project))
        },
    );
}

fn value_to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::Str(s) => s.into(),
        Value::Float(v) => v.into(),
        Value::Object(o) => format!("<{}>", o.short_type_name()).into(),
        Value::Null => Dynamic::UNIT,
    }
}

/// Project contents as a script map: name, layout and one array of row maps
/// per list property
fn describe_project(project: &Project) -> Map {
    let mut map = Map::new();
    map.insert("name".into(), project.name.clone().into());
    map.insert("layout".into(), project.layout.clone().into());

    for property in project.schema().properties() {
        let Some(collection) = project.collection(property.name) else {
            continue;
        };
        let rows: Array = collection
            .entries()
            .map(|(_, object)| {
                let mut row = Map::new();
                for column in object.schema().properties() {
                    if let Some(value) = object.get_value(column.name) {
                        row.insert(column.name.into(), value_to_dynamic(value));
                    }
                }
                Dynamic::from_map(row)
            })
            .collect();
        map.insert(property.name.into(), rows.into());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Phase;
    use tempfile::TempDir;

    #[test]
    fn test_markup_helpers() {
        let engine = create_engine();
        let text: String = engine
            .eval(r#"string_safe(mt_range(0, "x", 1))"#)
            .unwrap();
        assert_eq!(text, "( 0 ≤ x ≤ 1 )");

        let frac: String = engine.eval("mt_frac(0.5)").unwrap();
        assert_eq!(frac, r"\frac{1}{2}");

        let size: i64 = engine.eval(r#"font_size("\\larger a")"#).unwrap();
        assert_eq!(size, 20);

        let plot: String = engine.eval(r#"plot_safe("α")"#).unwrap();
        assert_eq!(plot, r"$\alpha$");
    }

    #[test]
    fn test_load_project() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.pyxrd.json");
        let mut project = Project::new("Mix");
        project.phases.push(Phase::new("Illite", 0.5));
        project.save(&path).unwrap();

        let engine = create_engine();
        let script = format!(
            r#"let p = load_project("{}"); p.name + ":" + p.phases.len() + ":" + p.phases[0].name"#,
            path.display()
        );
        let result: String = engine.eval(&script).unwrap();
        assert_eq!(result, "Mix:1:Illite");

        assert!(engine
            .eval::<Map>(r#"load_project("/no/such/project.json")"#)
            .is_err());
    }

    #[test]
    fn test_call_depth_limit() {
        let engine = create_engine();
        assert!(engine.eval::<i64>("fn f(x) { f(x) } f(1)").is_err());
    }
}

//! Function binding manifests.
//!
//! Each function directory holds a JSON manifest with a `bindings` array.
//! `function.local.json` takes precedence over the deployed
//! `function.json`. Bindings are parsed into typed descriptors up front so
//! a missing or mistyped field fails registration instead of surfacing
//! at invocation time.

use std::path::{Path, PathBuf};

use axum::http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ManifestError, ManifestResult};

pub const LOCAL_MANIFEST: &str = "function.local.json";
pub const DEPLOYED_MANIFEST: &str = "function.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Verbs the function router serves; anything else is answered with 404.
    pub const SERVED: [HttpMethod; 3] = [HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" => Some(Self::Delete),
            "head" => Some(Self::Head),
            "options" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn is_served(self) -> bool {
        Self::SERVED.contains(&self)
    }

    pub fn as_method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
            Self::Head => Method::HEAD,
            Self::Options => Method::OPTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTrigger {
    pub route: String,
    pub methods: Vec<HttpMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTrigger {
    /// May contain `%VAR%` or bare environment names.
    pub queue_name: String,
    pub connection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTrigger {
    pub schedule: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobBinding {
    /// `container/name` template, resolved at write time.
    pub path: String,
    pub connection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    HttpTrigger(HttpTrigger),
    QueueTrigger(QueueTrigger),
    TimerTrigger(TimerTrigger),
    BlobOutput(BlobBinding),
    /// The `$return` HTTP output; carries no configuration.
    HttpOutput,
    /// Any binding the router does not act on.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub direction: Direction,
    pub kind: BindingKind,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    bindings: Vec<Binding>,
}

#[derive(Deserialize)]
struct RawManifest {
    bindings: Vec<Map<String, Value>>,
}

impl Manifest {
    /// Manifest file for a function directory, preferring the local variant.
    pub fn locate(directory: &Path) -> ManifestResult<PathBuf> {
        [LOCAL_MANIFEST, DEPLOYED_MANIFEST]
            .into_iter()
            .map(|file| directory.join(file))
            .find(|path| path.is_file())
            .ok_or_else(|| ManifestError::NotFound(directory.to_path_buf()))
    }

    pub fn load(directory: &Path) -> ManifestResult<Self> {
        let path = Self::locate(directory)?;
        let text = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &text)
    }

    /// Parse manifest text; `path` is only used for error reporting.
    pub fn parse(path: &Path, text: &str) -> ManifestResult<Self> {
        let raw: RawManifest = serde_json::from_str(text).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let bindings = raw
            .bindings
            .iter()
            .enumerate()
            .map(|(index, fields)| parse_binding(index, fields))
            .collect::<ManifestResult<_>>()?;
        Ok(Self {
            path: path.to_path_buf(),
            bindings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn http_trigger(&self) -> Option<&HttpTrigger> {
        self.bindings.iter().find_map(|b| match &b.kind {
            BindingKind::HttpTrigger(t) => Some(t),
            _ => None,
        })
    }

    pub fn queue_trigger(&self) -> Option<&QueueTrigger> {
        self.bindings.iter().find_map(|b| match &b.kind {
            BindingKind::QueueTrigger(t) => Some(t),
            _ => None,
        })
    }

    pub fn timer_trigger(&self) -> Option<&TimerTrigger> {
        self.bindings.iter().find_map(|b| match &b.kind {
            BindingKind::TimerTrigger(t) => Some(t),
            _ => None,
        })
    }

    pub fn blob_output(&self) -> Option<&BlobBinding> {
        self.bindings.iter().find_map(|b| match &b.kind {
            BindingKind::BlobOutput(o) => Some(o),
            _ => None,
        })
    }
}

// ── Binding parsing ────────────────────────────────────────────

struct Fields<'a> {
    label: String,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn required(&self, field: &'static str) -> ManifestResult<&'a str> {
        self.optional(field).ok_or_else(|| self.missing(field))
    }

    fn optional(&self, field: &str) -> Option<&'a str> {
        self.map.get(field).and_then(Value::as_str)
    }

    fn missing(&self, field: &'static str) -> ManifestError {
        ManifestError::MissingField {
            binding: self.label.clone(),
            field,
        }
    }
}

fn parse_binding(index: usize, map: &Map<String, Value>) -> ManifestResult<Binding> {
    let label = map
        .get("name")
        .and_then(Value::as_str)
        .map_or_else(|| format!("bindings[{index}]"), str::to_string);
    let fields = Fields { label, map };

    let kind = fields.required("type")?;
    let name = fields.required("name")?.to_string();
    let direction = parse_direction(&fields)?;

    let kind = match (kind, direction) {
        ("httpTrigger", _) => BindingKind::HttpTrigger(HttpTrigger {
            route: fields.required("route")?.to_string(),
            methods: parse_methods(&fields)?,
        }),
        ("serviceBusTrigger" | "queueTrigger", _) => BindingKind::QueueTrigger(QueueTrigger {
            queue_name: fields.required("queueName")?.to_string(),
            connection: fields.optional("connection").map(str::to_string),
        }),
        ("timerTrigger", _) => BindingKind::TimerTrigger(TimerTrigger {
            schedule: fields.required("schedule")?.to_string(),
        }),
        ("blob", Direction::Out) => BindingKind::BlobOutput(BlobBinding {
            path: fields.required("path")?.to_string(),
            connection: fields.optional("connection").map(str::to_string),
        }),
        ("http", Direction::Out) => BindingKind::HttpOutput,
        (other, _) => BindingKind::Other(other.to_string()),
    };

    Ok(Binding {
        name,
        direction,
        kind,
    })
}

fn parse_direction(fields: &Fields<'_>) -> ManifestResult<Direction> {
    match fields.required("direction")? {
        "in" => Ok(Direction::In),
        "out" => Ok(Direction::Out),
        "inout" => Ok(Direction::InOut),
        other => Err(ManifestError::InvalidDirection {
            binding: fields.label.clone(),
            direction: other.to_string(),
        }),
    }
}

fn parse_methods(fields: &Fields<'_>) -> ManifestResult<Vec<HttpMethod>> {
    let Some(Value::Array(values)) = fields.map.get("methods") else {
        return Err(fields.missing("methods"));
    };
    values
        .iter()
        .map(|value| {
            let raw = value.as_str().ok_or_else(|| fields.missing("methods"))?;
            HttpMethod::parse(raw).ok_or_else(|| ManifestError::InvalidMethod {
                binding: fields.label.clone(),
                method: raw.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP: &str = r#"{
        "scriptFile": "__init__.py",
        "bindings": [
            {"authLevel": "anonymous", "type": "httpTrigger", "direction": "in",
             "name": "req", "methods": ["get", "POST"], "route": "hello/{name?}"},
            {"type": "http", "direction": "out", "name": "$return"},
            {"type": "blob", "direction": "out", "name": "outputblob",
             "path": "out/{rand-guid}", "connection": "AZURE_SA"}
        ]
    }"#;

    fn parse(text: &str) -> ManifestResult<Manifest> {
        Manifest::parse(Path::new("function.json"), text)
    }

    #[test]
    fn http_manifest_is_typed() {
        let manifest = parse(HTTP).unwrap();
        let http = manifest.http_trigger().unwrap();
        assert_eq!(http.route, "hello/{name?}");
        assert_eq!(http.methods, vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(manifest.blob_output().unwrap().path, "out/{rand-guid}");
        assert_eq!(manifest.bindings()[1].kind, BindingKind::HttpOutput);
        assert!(manifest.queue_trigger().is_none());
        assert!(manifest.timer_trigger().is_none());
    }

    #[test]
    fn queue_and_timer_triggers() {
        let queue = parse(
            r#"{"bindings": [{"type": "serviceBusTrigger", "direction": "in",
                "name": "msg", "queueName": "%QUEUE%", "connection": "SB"}]}"#,
        )
        .unwrap();
        assert_eq!(queue.queue_trigger().unwrap().queue_name, "%QUEUE%");

        let timer = parse(
            r#"{"bindings": [{"type": "timerTrigger", "direction": "in",
                "name": "mytimer", "schedule": "0 */5 * * * *"}]}"#,
        )
        .unwrap();
        assert_eq!(timer.timer_trigger().unwrap().schedule, "0 */5 * * * *");
    }

    #[test]
    fn missing_route_is_reported() {
        let err = parse(
            r#"{"bindings": [{"type": "httpTrigger", "direction": "in",
                "name": "req", "methods": ["get"]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingField { ref binding, field: "route" } if binding == "req"
        ));
    }

    #[test]
    fn missing_methods_is_reported() {
        let err = parse(
            r#"{"bindings": [{"type": "httpTrigger", "direction": "in",
                "name": "req", "route": "x"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingField { field: "methods", .. }));
    }

    #[test]
    fn unknown_method_and_direction() {
        let err = parse(
            r#"{"bindings": [{"type": "httpTrigger", "direction": "in",
                "name": "req", "route": "x", "methods": ["fetch"]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidMethod { ref method, .. } if method == "fetch"));

        let err = parse(r#"{"bindings": [{"type": "blob", "direction": "sideways", "name": "b"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidDirection { .. }));
    }

    #[test]
    fn unnamed_binding_is_labelled_by_index() {
        let err = parse(r#"{"bindings": [{"type": "timerTrigger", "direction": "in"}]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::MissingField { ref binding, field: "name" } if binding == "bindings[0]"
        ));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(parse("{"), Err(ManifestError::Json { .. })));
        assert!(matches!(parse(r#"{"nope": []}"#), Err(ManifestError::Json { .. })));
    }

    #[test]
    fn local_manifest_wins() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Manifest::locate(dir.path()), Err(ManifestError::NotFound(_))));

        std::fs::write(dir.path().join(DEPLOYED_MANIFEST), HTTP).unwrap();
        assert_eq!(
            Manifest::locate(dir.path()).unwrap(),
            dir.path().join(DEPLOYED_MANIFEST)
        );

        std::fs::write(
            dir.path().join(LOCAL_MANIFEST),
            r#"{"bindings": [{"type": "timerTrigger", "direction": "in",
                "name": "t", "schedule": "*/5 * * * * *"}]}"#,
        )
        .unwrap();
        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.path(), dir.path().join(LOCAL_MANIFEST));
        assert!(manifest.timer_trigger().is_some());
        assert!(manifest.http_trigger().is_none());
    }

    #[test]
    fn served_methods() {
        assert!(HttpMethod::Get.is_served());
        assert!(HttpMethod::Delete.is_served());
        assert!(!HttpMethod::Put.is_served());
        assert_eq!(HttpMethod::Post.as_method(), Method::POST);
    }
}

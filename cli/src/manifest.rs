//! Boot manifests: simulated targets plus the items to run against them.
//!
//! ```toml
//! root = "app"
//!
//! [[targets]]
//! name = "app"
//!
//! [[targets]]
//! name = "database"
//! methods = [
//!     { name = "connect", delay_ms = 40 },
//!     { name = "warm_cache", delay_ms = 900 },
//! ]
//!
//! [[items]]
//! phase = "before"
//! target = "database"
//! method = "connect"
//! timeout_ms = 100
//! ```
//!
//! Each simulated method completes `delay_ms` after it is invoked (inline
//! when zero). `complete = false` holds the completion forever, and a
//! target with `fail = "..."` makes its factory fail with that message.

use std::collections::HashSet;
use std::fs;
use std::future;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use ignite_engine::{Component, Completion, Container, MethodTable, QueueItem, Registrations};
use ignite_types::{MethodName, Phase, TargetId};

const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("target '{0}' is declared more than once")]
    DuplicateTarget(TargetId),
    #[error("item {target}.{method} has a zero timeout")]
    ZeroTimeout { target: TargetId, method: MethodName },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Target resolved after the last phase drains.
    pub root: TargetId,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    pub name: TargetId,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    /// Factory error message; the target never resolves when set.
    pub fail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    pub name: MethodName,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default = "default_true")]
    pub complete: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemSpec {
    pub phase: Phase,
    pub target: TargetId,
    pub method: MethodName,
    pub timeout_ms: Option<u64>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(&target.name) {
                return Err(ManifestError::DuplicateTarget(target.name.clone()));
            }
        }
        if let Some(item) = self.items.iter().find(|item| item.timeout_ms == Some(0)) {
            return Err(ManifestError::ZeroTimeout {
                target: item.target.clone(),
                method: item.method.clone(),
            });
        }
        Ok(())
    }

    /// Startup items in manifest order.
    #[must_use]
    pub fn registrations(&self) -> Registrations {
        self.items.iter().map(ItemSpec::to_item).collect()
    }

    /// A container with one lazily-built simulated component per target.
    #[must_use]
    pub fn container(&self) -> Container {
        let mut container = Container::new();
        for spec in &self.targets {
            let spec = spec.clone();
            container.insert_factory(spec.name.clone(), move || spec.build());
        }
        container
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }
}

impl TargetSpec {
    fn build(&self) -> Result<Arc<dyn Component>, String> {
        if let Some(message) = &self.fail {
            return Err(message.clone());
        }
        let table = self
            .methods
            .iter()
            .fold(MethodTable::new(), |table, method| {
                let delay = Duration::from_millis(method.delay_ms);
                let complete = method.complete;
                table.with_method(method.name.clone(), move |done| {
                    simulate(done, delay, complete);
                })
            });
        Ok(Arc::new(table))
    }
}

fn simulate(done: Completion, delay: Duration, complete: bool) {
    if !complete {
        tokio::spawn(async move {
            let _held = done;
            future::pending::<()>().await;
        });
        return;
    }
    if delay.is_zero() {
        done.complete();
        return;
    }
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        done.complete();
    });
}

impl ItemSpec {
    fn to_item(&self) -> QueueItem {
        let item = QueueItem::new(self.phase, self.target.clone(), self.method.clone());
        match self.timeout_ms {
            Some(ms) => item.with_timeout(Duration::from_millis(ms)),
            None => item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ignite_engine::Resolver;

    const SAMPLE: &str = r#"
        root = "app"

        [[targets]]
        name = "app"

        [[targets]]
        name = "db"
        methods = [{ name = "connect", delay_ms = 40 }, { name = "hang", complete = false }]

        [[targets]]
        name = "broken"
        fail = "disk full"

        [[items]]
        phase = "before"
        target = "db"
        method = "connect"
        timeout_ms = 100

        [[items]]
        phase = "framework_before_boot"
        target = "db"
        method = "hang"
    "#;

    #[test]
    fn test_parse_sample() {
        let manifest: Manifest = SAMPLE.parse().unwrap();
        assert_eq!(manifest.root.as_str(), "app");
        assert_eq!(manifest.targets.len(), 3);
        assert_eq!(manifest.targets[1].methods[0].delay_ms, 40);
        assert!(manifest.targets[1].methods[0].complete);
        assert!(!manifest.targets[1].methods[1].complete);
    }

    #[test]
    fn test_registrations_keep_manifest_order_and_timeouts() {
        let manifest: Manifest = SAMPLE.parse().unwrap();
        let registrations = manifest.registrations();
        let items = registrations.items();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].phase(), Phase::Before);
        assert_eq!(items[0].timeout(), Some(Duration::from_millis(100)));
        assert_eq!(items[1].phase(), Phase::FrameworkBeforeBoot);
        assert_eq!(items[1].timeout(), None);
    }

    #[test]
    fn test_container_builds_simulated_targets() {
        let manifest: Manifest = SAMPLE.parse().unwrap();
        let container = manifest.container();

        let db = container.resolve(&TargetId::new("db").unwrap()).unwrap();
        assert!(db.startup_method(&MethodName::new("connect").unwrap()).is_some());
        assert!(db.startup_method(&MethodName::new("missing").unwrap()).is_none());

        let err = container
            .resolve(&TargetId::new("broken").unwrap())
            .err()
            .unwrap();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let err = "root = \"a\"\n[[targets]]\nname = \"a\"\n[[targets]]\nname = \"a\"\n"
            .parse::<Manifest>()
            .unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateTarget(ref t) if t.as_str() == "a"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = r#"
            root = "a"
            [[items]]
            phase = "after"
            target = "a"
            method = "init"
            timeout_ms = 0
        "#
        .parse::<Manifest>()
        .unwrap_err();
        assert_eq!(err.to_string(), "item a.init has a zero timeout");
    }

    #[test]
    fn test_unknown_phase_rejected() {
        let err = r#"
            root = "a"
            [[items]]
            phase = "during"
            target = "a"
            method = "init"
        "#
        .parse::<Manifest>()
        .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}

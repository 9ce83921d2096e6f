//! Shared scaffolding for the integration suites
//!
//! Most scenarios are backend-agnostic, so they run once per real
//! backend through [`backends`]. The embedded backend needs a scratch
//! file; its temp directory rides along so it outlives the factory.

use polystore::{Config, RepositoryFactory};
use std::sync::Once;
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Route adapter logs into the test harness output, once per binary
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub struct Backend {
    pub name: &'static str,
    pub factory: RepositoryFactory,
    _dir: Option<TempDir>,
}

pub fn datastore_backend() -> Backend {
    init_tracing();
    let config = Config::from_toml_str("env = \"datastore\"").unwrap();
    Backend {
        name: "datastore",
        factory: RepositoryFactory::from_config(&config).unwrap(),
        _dir: None,
    }
}

pub fn embedded_backend() -> Backend {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let document = format!(
        "env = \"embedded\"\n[embedded]\npath = \"{}\"\n",
        dir.path().join("store.redb").display()
    );
    let config = Config::from_toml_str(&document).unwrap();
    Backend {
        name: "embedded",
        factory: RepositoryFactory::from_config(&config).unwrap(),
        _dir: Some(dir),
    }
}

/// Both real backends, for scenarios that must behave identically
pub fn backends() -> Vec<Backend> {
    vec![datastore_backend(), embedded_backend()]
}

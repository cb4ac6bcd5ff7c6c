use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::config::{Backend, Config, Style};
use crate::notes::{self, Notes};
use crate::resource::{self, Resource};
use crate::store::{Database, JsonFileStore, RecordStore};

/// Backing stores opened for a configuration. Each is opened only when at
/// least one resource uses it.
pub struct Stores {
    pub file: Option<Arc<JsonFileStore>>,
    pub db: Option<Arc<Database>>,
}

impl Stores {
    pub async fn open(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let collections = cfg.file_collections();
        let file = if collections.is_empty() {
            None
        } else {
            let path = data_dir.join(cfg.app.get_data_file());
            tracing::info!(path = %path.display(), "opening data file");
            Some(JsonFileStore::open(&path, &collections).await?)
        };

        let db = if cfg.needs_database() {
            Some(Database::new(&cfg.app, data_dir).await?)
        } else {
            None
        };

        Ok(Stores { file, db })
    }

    fn store_for(&self, name: &str, backend: Backend) -> Result<Arc<dyn RecordStore>> {
        let store: Arc<dyn RecordStore> = match backend {
            Backend::File => match &self.file {
                Some(file) => Arc::new(file.collection(name)),
                None => anyhow::bail!("no data file opened for {}", name),
            },
            Backend::Database => match &self.db {
                Some(db) => Arc::new(db.collection(name)),
                None => anyhow::bail!("no database opened for {}", name),
            },
        };
        Ok(store)
    }
}

pub fn router(cfg: &Config, stores: &Stores) -> Result<Router> {
    let mut app = Router::new().route("/api", get(api::status));

    for rc in &cfg.resources {
        let store = stores.store_for(&rc.name, rc.backend)?;
        let path = format!("/api/{}", rc.name);
        tracing::info!(resource = %rc.name, backend = ?rc.backend, style = ?rc.style, "mounting {}", path);

        let routes = match rc.style {
            Style::Plain => resource::routes(Resource::new(store)),
            Style::Notes => notes::routes(Notes::new(store)),
        };
        app = app.nest(&path, routes);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Ok(app
        .fallback(api::not_found)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Opens the stores for `cfg` and returns the assembled router.
pub async fn build(cfg: &Config, data_dir: &Path) -> Result<Router> {
    let stores = Stores::open(cfg, data_dir).await?;
    router(cfg, &stores)
}

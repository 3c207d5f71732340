use std::sync::Arc;

use db::DBService;

use crate::config::Config;

/// Shared state handed to every route.
pub trait Deployment: Clone + Send + Sync + 'static {
    fn db(&self) -> &DBService;

    fn config(&self) -> &Config;
}

#[derive(Clone)]
pub struct LocalDeployment {
    db: DBService,
    config: Arc<Config>,
}

impl LocalDeployment {
    pub fn new(db: DBService, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

impl Deployment for LocalDeployment {
    fn db(&self) -> &DBService {
        &self.db
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

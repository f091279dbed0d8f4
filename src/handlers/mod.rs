mod database;
mod repository;
mod workspace;

pub use database::DatabaseHandler;
pub use repository::{orphaned_packs, parse_garbage_kib, RepositoryHandler};
pub use workspace::{clean_workspace, WorkspaceHandler};

use crate::config::Config;
use crate::handler::ResourceHandler;
use crate::kind::ResourceKind;

/// Handler for `kind`, or `None` when its configuration section is absent.
pub fn handler_for<'a>(config: &'a Config, kind: ResourceKind) -> Option<Box<dyn ResourceHandler + 'a>> {
    match kind {
        ResourceKind::Repository => config
            .git
            .as_ref()
            .map(|s| Box::new(RepositoryHandler::new(&s.search)) as Box<dyn ResourceHandler + 'a>),
        ResourceKind::Workspace => config
            .edt
            .as_ref()
            .map(|s| Box::new(WorkspaceHandler::new(s)) as Box<dyn ResourceHandler + 'a>),
        ResourceKind::Database => config
            .database
            .as_ref()
            .map(|s| Box::new(DatabaseHandler::new(s)) as Box<dyn ResourceHandler + 'a>),
    }
}

/// Handlers for every configured kind, in sweep order.
pub fn configured_handlers(config: &Config) -> Vec<Box<dyn ResourceHandler + '_>> {
    ResourceKind::ALL
        .into_iter()
        .filter_map(|kind| handler_for(config, kind))
        .collect()
}

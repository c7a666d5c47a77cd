pub mod app;
pub mod events;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use lpt_db::{Database, DatabaseModule};
use lpt_kernel::ModuleRegistry;

/// Register the database core module and every application module
pub fn register_all(registry: &mut ModuleRegistry, database: Arc<Database>) {
    registry.register_core(Arc::new(DatabaseModule::new(database.clone())));
    registry.register_custom(events::create_module(database.clone()));
    registry.register_custom(app::create_module(database));
}

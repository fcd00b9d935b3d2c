use metrics_exporter_prometheus::PrometheusHandle;
use room_planner::config::{AppConfig, DatabaseConfig};
use room_planner::scheduling::{SqliteAssignmentStore, StoreError, TimetableService};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

pub(crate) type PlannerService = TimetableService<SqliteAssignmentStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) async fn open_store(
    database: &DatabaseConfig,
) -> Result<Arc<SqliteAssignmentStore>, StoreError> {
    debug!(url = %database.url, max_connections = database.max_connections, "opening assignment store");
    let store = SqliteAssignmentStore::connect(&database.url, database.max_connections).await?;
    Ok(Arc::new(store))
}

pub(crate) async fn build_service(config: &AppConfig) -> Result<Arc<PlannerService>, StoreError> {
    let store = open_store(&config.database).await?;
    let service =
        TimetableService::new(store).with_unknown_day_policy(config.scheduling.unknown_days);
    Ok(Arc::new(service))
}

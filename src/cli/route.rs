//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::help::command_name;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_config_toml, format_context_text, format_sources_json, format_sources_text, format_stats_text,
    format_sweep_report_text, to_json_pretty,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigLoader, EngineConfig};
use crate::context::{render_context, ContextRequest, Role, Turn};
use crate::error::{ContextError, StorageError};
use crate::service::ContextService;
use crate::source::{names, DataSourceRegistry};
use crate::store::{RecordStore, SledRecordStore, StoredRecord};
use crate::types::{Record, Timestamp};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

/// Runtime context for CLI execution: config, record store, and the context service.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    config: EngineConfig,
    store: Arc<SledRecordStore>,
    service: ContextService,
    clock: Arc<dyn Clock>,
    runtime: Runtime,
    store_path: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ContextError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ContextError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let store_path = if config.storage.path.is_absolute() {
            config.storage.path.clone()
        } else {
            workspace_root.join(&config.storage.path)
        };
        std::fs::create_dir_all(&store_path).map_err(StorageError::from)?;
        let store = Arc::new(SledRecordStore::new(&store_path)?);

        let mut registry = DataSourceRegistry::new();
        registry.load_from_config(&config.sources, store.clone())?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let service = ContextService::from_config(&config, Arc::new(registry), Arc::clone(&clock));
        let runtime = Runtime::new().map_err(StorageError::from)?;

        debug!(store = %store_path.display(), "Run context ready");
        Ok(Self {
            config,
            store,
            service,
            clock,
            runtime,
            store_path,
        })
    }

    pub fn service(&self) -> &ContextService {
        &self.service
    }

    pub fn store_path(&self) -> &PathBuf {
        &self.store_path
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ContextError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ContextError> {
        match command {
            Commands::Ingest {
                source,
                subject,
                scope,
                at,
                record,
            } => self.handle_ingest(source, subject, scope.clone(), at.as_deref(), record),
            Commands::Build {
                subject,
                scope_kind,
                session,
                scope_id,
                sources,
                format,
            } => {
                let mut request =
                    ContextRequest::new(subject, scope_kind, session).with_sources(sources.clone());
                if let Some(scope_id) = scope_id {
                    request = request.with_scope_id(scope_id);
                }
                self.handle_build(&request, format)
            }
            Commands::Turn {
                subject,
                session,
                role,
                content,
            } => self.handle_turn(subject, session, role, content),
            Commands::Sweep { format } => {
                let report = self
                    .service
                    .retention_sweeper(self.store.clone(), &self.config.retention)
                    .sweep_once();
                match format.as_str() {
                    "json" => to_json_pretty(&report),
                    _ => Ok(format_sweep_report_text(&report)),
                }
            }
            Commands::Stats { format } => {
                let stats = self.service.stats();
                match format.as_str() {
                    "json" => to_json_pretty(&stats),
                    _ => Ok(format_stats_text(&stats)),
                }
            }
            Commands::Sources { format } => {
                let sources = self.service.registry().list_all();
                match format.as_str() {
                    "json" => format_sources_json(&sources),
                    _ => Ok(format_sources_text(&sources)),
                }
            }
            Commands::Config { format } => match format.as_str() {
                "json" => to_json_pretty(&self.config),
                _ => format_config_toml(&self.config),
            },
        }
    }

    fn handle_ingest(
        &self,
        source: &str,
        subject: &str,
        scope: Option<String>,
        at: Option<&str>,
        record: &str,
    ) -> Result<String, ContextError> {
        let payload: Record = serde_json::from_str(record)
            .map_err(|e| ContextError::InvalidInput(format!("record is not valid JSON: {}", e)))?;
        if !payload.is_object() {
            return Err(ContextError::InvalidInput(
                "record must be a JSON object".to_string(),
            ));
        }
        let created_at = match at {
            Some(at) => parse_timestamp(at)?,
            None => self.clock.now(),
        };

        let stored = StoredRecord::new(source, subject, scope, created_at, payload);
        self.store.put(&stored)?;
        self.store.flush()?;
        self.service.invalidate_subject(subject);

        Ok(format!(
            "Stored {} record {} for {}",
            stored.source, stored.id, stored.subject_id
        ))
    }

    fn handle_build(&self, request: &ContextRequest, format: &str) -> Result<String, ContextError> {
        self.hydrate_conversation(&request.subject_id, &request.session_id)?;
        let context = self.runtime.block_on(self.service.build(request))?;
        match format {
            "json" => to_json_pretty(&context),
            "prompt" => Ok(render_context(&context)),
            _ => Ok(format_context_text(&context)),
        }
    }

    fn handle_turn(
        &self,
        subject: &str,
        session: &str,
        role: &str,
        content: &str,
    ) -> Result<String, ContextError> {
        let role: Role = role.parse().map_err(ContextError::InvalidInput)?;
        let turn = self.service.record_turn(session, role, content);

        let payload = serde_json::to_value(&turn)
            .map_err(|e| ContextError::StorageError(StorageError::Serialization(e.to_string())))?;
        let stored = StoredRecord::new(
            names::CONVERSATION,
            subject,
            Some(session.to_string()),
            turn.timestamp,
            payload,
        );
        self.store.put(&stored)?;
        self.store.flush()?;

        Ok(format!("Recorded {} turn for session {}", turn.role, session))
    }

    /// Load the session's persisted turns into the in-process window.
    fn hydrate_conversation(&self, subject: &str, session: &str) -> Result<(), ContextError> {
        let log = self.service.conversations();
        let records = self
            .store
            .list(names::CONVERSATION, subject, Some(session), log.max_turns())?;

        log.clear_session(session);
        // Newest first from the store.
        for record in records.into_iter().rev() {
            match serde_turn(&record.payload) {
                Some(turn) => log.record(session, turn),
                None => warn!(record_id = %record.id, "Skipping malformed conversation record"),
            }
        }
        Ok(())
    }
}

fn serde_turn(payload: &Record) -> Option<Turn> {
    serde_json::from_value(payload.clone()).ok()
}

fn parse_timestamp(value: &str) -> Result<Timestamp, ContextError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ContextError::InvalidInput(format!("invalid timestamp '{}': {}", value, e)))
}

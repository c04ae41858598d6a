use std::collections::BTreeMap;
use std::sync::Arc;

use crate::exec::flags::validate_flags;
use crate::exec::{Channel, ExpActionCommandSpec, ExpModelCommandSpec, FaultRegistry};
use crate::model::{ExpModel, PreparationRecord, PreparationStatus};
use crate::storage::{InsertOutcome, Store};
use crate::transport::{Code, Response};
use crate::uid::new_uid;

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub target: String,
    pub action: String,
    pub flags: BTreeMap<String, String>,
    /// Caller-chosen uid; generated when `None` or empty.
    pub uid: Option<String>,
    /// Process scope recorded in the ledger; empty for host-wide faults.
    pub process: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusQuery {
    Uid(String),
    Running {
        program_type: String,
        process: String,
    },
    All,
}

/// Resolves faults, drives executors and keeps the preparation ledger in step.
///
/// Flag, environment and lookup problems come back as failed [`Response`]s;
/// storage failures are returned as errors for the caller to classify.
pub struct Runner {
    pub store: Store,
    pub registry: FaultRegistry,
    pub channel: Arc<dyn Channel>,
}

impl Runner {
    pub fn new(store: Store, registry: FaultRegistry, channel: Arc<dyn Channel>) -> Self {
        Self {
            store,
            registry,
            channel,
        }
    }

    pub fn create(&self, req: &CreateRequest) -> anyhow::Result<Response> {
        let Some((spec, action)) = self.registry.find_action(&req.target, &req.action) else {
            return Ok(Response::fail(
                Code::HandlerNotFound,
                format!("{} {} command not found", req.target, req.action),
            ));
        };

        let channel = match self.channel_for(spec.as_ref(), action.as_ref(), &req.flags) {
            Ok(c) => c,
            Err(resp) => return Ok(resp),
        };
        if let Err(resp) = validate_flags(spec.as_ref(), action.as_ref(), &req.flags) {
            return Ok(resp);
        }

        let uid = match req.uid.as_deref() {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => new_uid(),
        };
        if self.store.get_preparation_by_uid(&uid)?.is_some() {
            return Ok(Response::fail(
                Code::DuplicateError,
                format!("uid {} already exists", uid),
            ));
        }

        let record = PreparationRecord::running(&uid, spec.name(), &req.process);
        if let InsertOutcome::AlreadyRunning(existing) =
            self.store.insert_running_preparation(&record)?
        {
            return Ok(Response::fail(
                Code::DuplicateError,
                format!(
                    "{} experiment is already running, uid: {}",
                    spec.name(),
                    existing.uid
                ),
            ));
        }

        let model = ExpModel {
            target: spec.name().to_string(),
            action_name: action.name().to_string(),
            action_flags: req.flags.clone(),
        };
        tracing::info!(
            event = "experiment.start",
            uid = %uid,
            target = spec.name(),
            action = action.name(),
            flags = ?model.action_flags
        );

        let resp = action.executor(Some(channel)).start(&uid, &model);
        if !resp.success {
            tracing::warn!(event = "experiment.start_failed", uid = %uid, code = resp.code, err = %resp.err_msg());
            self.store
                .update_preparation_status(&uid, PreparationStatus::Error, resp.err_msg())?;
            return Ok(resp);
        }
        Ok(Response::ok(serde_json::Value::String(uid)))
    }

    /// Stops the fault recorded under `uid`. `action` may be omitted when the
    /// fault has a single action.
    pub fn destroy(&self, uid: &str, action: Option<&str>) -> anyhow::Result<Response> {
        let Some(record) = self.store.get_preparation_by_uid(uid)? else {
            return Ok(Response::fail(
                Code::DataNotFound,
                format!("uid {} not found", uid),
            ));
        };
        if record.status().map_or(true, PreparationStatus::is_terminal) {
            return Ok(Response::fail(
                Code::IllegalCommand,
                format!("experiment {} is {}, not Running", uid, record.status),
            ));
        }

        let Some(spec) = self.registry.find(&record.program_type) else {
            return Ok(Response::fail(
                Code::HandlerNotFound,
                format!("{} command not found", record.program_type),
            ));
        };
        let action = match resolve_destroy_action(spec.as_ref(), action) {
            Ok(a) => a,
            Err(resp) => return Ok(resp),
        };

        let flags = BTreeMap::new();
        let channel = match self.channel_for(spec.as_ref(), action.as_ref(), &flags) {
            Ok(c) => c,
            Err(resp) => return Ok(resp),
        };

        let model = ExpModel::new(spec.name(), action.name());
        tracing::info!(event = "experiment.stop", uid = %uid, target = spec.name(), action = action.name());

        let resp = action.executor(Some(channel)).stop(uid, &model);
        if resp.success {
            self.store
                .update_preparation_status(uid, PreparationStatus::Destroyed, "")?;
            Ok(Response::ok(serde_json::Value::String(uid.to_string())))
        } else {
            tracing::warn!(event = "experiment.stop_failed", uid = %uid, code = resp.code, err = %resp.err_msg());
            self.store
                .update_preparation_status(uid, PreparationStatus::Running, resp.err_msg())?;
            Ok(resp)
        }
    }

    pub fn status(&self, query: &StatusQuery) -> anyhow::Result<Response> {
        let found = match query {
            StatusQuery::All => {
                return Ok(Response::ok(serde_json::to_value(
                    self.store.list_preparations()?,
                )?))
            }
            StatusQuery::Uid(uid) => self.store.get_preparation_by_uid(uid)?,
            StatusQuery::Running {
                program_type,
                process,
            } => self.store.get_running_preparation(program_type, process)?,
        };
        match found {
            Some(record) => Ok(Response::ok(serde_json::to_value(record)?)),
            None => Ok(Response::fail_default(Code::DataNotFound)),
        }
    }

    /// Runs the fault's pre-executor; it may swap in its own channel.
    fn channel_for(
        &self,
        spec: &dyn ExpModelCommandSpec,
        action: &dyn ExpActionCommandSpec,
        flags: &BTreeMap<String, String>,
    ) -> Result<Arc<dyn Channel>, Response> {
        let Some(setup) = spec.pre_executor().pre_exec(action.name(), spec.name(), flags) else {
            return Ok(self.channel.clone());
        };
        match setup() {
            Ok(Some(channel)) => Ok(channel),
            Ok(None) => Ok(self.channel.clone()),
            Err(e) => Err(Response::fail(
                Code::EnvironmentError,
                format!("prepare {} {} err, {}", spec.name(), action.name(), e),
            )),
        }
    }
}

fn resolve_destroy_action(
    spec: &dyn ExpModelCommandSpec,
    action: Option<&str>,
) -> Result<Arc<dyn ExpActionCommandSpec>, Response> {
    let mut actions = spec.actions();
    match action {
        Some(name) => actions.into_iter().find(|a| a.matches(name)).ok_or_else(|| {
            Response::fail(
                Code::HandlerNotFound,
                format!("{} {} command not found", spec.name(), name),
            )
        }),
        None if actions.len() == 1 => Ok(actions.remove(0)),
        None => Err(Response::fail(
            Code::ParameterLess,
            format!("less --action flag, {} has {} actions", spec.name(), actions.len()),
        )),
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use blade_core::engine::{CreateRequest, Runner, StatusQuery};
use blade_core::exec::{default_registry, Channel};
use blade_core::model::{PreparationRecord, PreparationStatus};
use blade_core::storage::Store;
use blade_core::transport::{Code, Response};

/// Records every command; optionally fails them.
struct FakeChannel {
    script_path: PathBuf,
    fail_with: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            script_path: PathBuf::from("/opt/blade/bin"),
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            script_path: PathBuf::from("/opt/blade/bin"),
            fail_with: Some(msg.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Channel for FakeChannel {
    fn run(&self, script: &Path, args: &str) -> Response {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", script.display(), args));
        match &self.fail_with {
            Some(msg) => Response::fail(Code::ExecCommandError, msg.clone()),
            None => Response::ok(serde_json::json!("")),
        }
    }

    fn script_path(&self) -> &Path {
        &self.script_path
    }

    fn is_command_available(&self, _command: &str) -> bool {
        true
    }
}

fn runner(channel: Arc<FakeChannel>) -> anyhow::Result<Runner> {
    let store = Store::memory()?;
    store.init_schema()?;
    Ok(Runner::new(store, default_registry(), channel))
}

fn cpu_request(flags: &[(&str, &str)]) -> CreateRequest {
    CreateRequest {
        target: "cpu".into(),
        action: "fullload".into(),
        flags: flags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        uid: None,
        process: String::new(),
    }
}

fn uid_of(resp: &Response) -> String {
    resp.result
        .as_ref()
        .and_then(|v| v.as_str())
        .expect("uid result")
        .to_string()
}

#[test]
fn test_create_records_running_experiment() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;

    let resp = runner.create(&cpu_request(&[("cpu-list", "0-1")]))?;
    assert!(resp.success, "{:?}", resp);
    let uid = uid_of(&resp);
    assert_eq!(uid.len(), 16);

    assert_eq!(
        ch.calls(),
        vec!["/opt/blade/bin/chaos_burncpu --start --cpu-count 0 --cpu-list 0,1"]
    );
    let rec = runner.store.get_preparation_by_uid(&uid)?.unwrap();
    assert_eq!(rec.program_type, "cpu");
    assert_eq!(rec.status(), Some(PreparationStatus::Running));
    assert_eq!(rec.error, "");
    Ok(())
}

#[test]
fn test_create_with_alias_and_explicit_uid() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;

    let mut req = cpu_request(&[("cpu-count", "1")]);
    req.action = "fl".into();
    req.uid = Some("my-uid".into());
    let resp = runner.create(&req)?;
    assert_eq!(uid_of(&resp), "my-uid");
    assert!(ch.calls()[0].ends_with("--start --cpu-count 1"));
    Ok(())
}

#[test]
fn test_second_running_create_is_duplicate() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;

    let first = uid_of(&runner.create(&cpu_request(&[]))?);
    let resp = runner.create(&cpu_request(&[("cpu-count", "1")]))?;
    assert!(resp.is_code(Code::DuplicateError));
    assert!(resp.err_msg().contains(&first));
    assert_eq!(ch.calls().len(), 1);
    assert_eq!(runner.store.list_preparations()?.len(), 1);
    Ok(())
}

#[test]
fn test_reused_uid_is_duplicate() -> anyhow::Result<()> {
    let runner = runner(FakeChannel::new())?;
    runner.store.insert_preparation(&PreparationRecord {
        status: "Destroyed".into(),
        ..PreparationRecord::running("taken", "cpu", "")
    })?;

    let mut req = cpu_request(&[]);
    req.uid = Some("taken".into());
    let resp = runner.create(&req)?;
    assert!(resp.is_code(Code::DuplicateError));
    Ok(())
}

#[test]
fn test_failed_start_is_recorded_as_error() -> anyhow::Result<()> {
    let runner = runner(FakeChannel::failing("permission denied"))?;

    let mut req = cpu_request(&[]);
    req.uid = Some("u1".into());
    let resp = runner.create(&req)?;
    assert!(resp.is_code(Code::ExecCommandError));

    let rec = runner.store.get_preparation_by_uid("u1")?.unwrap();
    assert_eq!(rec.status(), Some(PreparationStatus::Error));
    assert_eq!(rec.error, "permission denied");

    // An errored record frees the running slot.
    let resp = runner.create(&cpu_request(&[]))?;
    assert!(resp.is_code(Code::ExecCommandError));
    Ok(())
}

#[test]
fn test_invalid_invocations_touch_nothing() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;

    let mut unknown_target = cpu_request(&[]);
    unknown_target.target = "gpu".into();
    assert!(runner.create(&unknown_target)?.is_code(Code::HandlerNotFound));

    let mut unknown_action = cpu_request(&[]);
    unknown_action.action = "halfload".into();
    assert!(runner.create(&unknown_action)?.is_code(Code::HandlerNotFound));

    let resp = runner.create(&cpu_request(&[("cpu-percent", "50")]))?;
    assert!(resp.is_code(Code::IllegalParameters));
    assert!(resp.err_msg().contains("cpu-percent"));

    assert!(ch.calls().is_empty());
    assert!(runner.store.list_preparations()?.is_empty());
    Ok(())
}

#[test]
fn test_bad_flag_value_marks_record_error() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;

    let mut req = cpu_request(&[("cpu-count", "lots")]);
    req.uid = Some("u1".into());
    let resp = runner.create(&req)?;
    assert!(resp.is_code(Code::IllegalParameters));
    assert!(ch.calls().is_empty());
    assert_eq!(
        runner.store.get_preparation_by_uid("u1")?.unwrap().status(),
        Some(PreparationStatus::Error)
    );
    Ok(())
}

#[test]
fn test_destroy_stops_and_marks_destroyed() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;
    let uid = uid_of(&runner.create(&cpu_request(&[]))?);

    let resp = runner.destroy(&uid, None)?;
    assert!(resp.success, "{:?}", resp);
    assert_eq!(ch.calls()[1], "/opt/blade/bin/chaos_burncpu --stop");
    assert_eq!(
        runner.store.get_preparation_by_uid(&uid)?.unwrap().status(),
        Some(PreparationStatus::Destroyed)
    );

    // Second destroy is refused without touching the host.
    let again = runner.destroy(&uid, Some("fl"))?;
    assert!(again.is_code(Code::IllegalCommand));
    assert_eq!(ch.calls().len(), 2);
    Ok(())
}

#[test]
fn test_destroy_refuses_finished_and_unrecognised_rows() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;
    let mut failed = PreparationRecord::running("e1", "cpu", "");
    failed.status = PreparationStatus::Error.as_str().into();
    runner.store.insert_preparation(&failed)?;
    let mut odd = PreparationRecord::running("x1", "cpu", "nginx");
    odd.status = "Paused".into();
    runner.store.insert_preparation(&odd)?;

    assert!(runner.destroy("e1", None)?.is_code(Code::IllegalCommand));
    assert!(runner.destroy("x1", None)?.is_code(Code::IllegalCommand));
    assert!(ch.calls().is_empty());
    Ok(())
}

#[test]
fn test_destroy_unknown_uid_and_action() -> anyhow::Result<()> {
    let ch = FakeChannel::new();
    let runner = runner(ch.clone())?;
    assert!(runner.destroy("nope", None)?.is_code(Code::DataNotFound));

    let uid = uid_of(&runner.create(&cpu_request(&[]))?);
    assert!(runner
        .destroy(&uid, Some("halfload"))?
        .is_code(Code::HandlerNotFound));
    assert_eq!(ch.calls().len(), 1);
    Ok(())
}

#[test]
fn test_failed_stop_keeps_running_with_error() -> anyhow::Result<()> {
    let runner = runner(FakeChannel::failing("no such process"))?;
    runner
        .store
        .insert_preparation(&PreparationRecord::running("u1", "cpu", ""))?;

    let resp = runner.destroy("u1", None)?;
    assert!(resp.is_code(Code::ExecCommandError));
    let rec = runner.store.get_preparation_by_uid("u1")?.unwrap();
    assert_eq!(rec.status(), Some(PreparationStatus::Running));
    assert_eq!(rec.error, "no such process");
    Ok(())
}

#[test]
fn test_status_queries() -> anyhow::Result<()> {
    let runner = runner(FakeChannel::new())?;
    let mut req = cpu_request(&[]);
    req.uid = Some("u1".into());
    req.process = "nginx".into();
    runner.create(&req)?;

    let by_uid = runner.status(&StatusQuery::Uid("u1".into()))?;
    assert_eq!(by_uid.result.as_ref().unwrap()["process"], "nginx");

    let running = runner.status(&StatusQuery::Running {
        program_type: "cpu".into(),
        process: String::new(),
    })?;
    assert_eq!(running.result.as_ref().unwrap()["uid"], "u1");

    let other = runner.status(&StatusQuery::Running {
        program_type: "cpu".into(),
        process: "redis".into(),
    })?;
    assert!(other.is_code(Code::DataNotFound));

    let all = runner.status(&StatusQuery::All)?;
    assert_eq!(all.result.as_ref().unwrap().as_array().unwrap().len(), 1);

    assert!(runner
        .status(&StatusQuery::Uid("missing".into()))?
        .is_code(Code::DataNotFound));
    Ok(())
}

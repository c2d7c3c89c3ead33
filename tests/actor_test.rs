use actor_otp::testing::{assert_receives, with_timeout, Probe};
use actor_otp::{
    actor, message, Actor, ActorError, Clause, Context, ExitReason, GenServer, Kind, Pid, Ref,
    Scope, Value, ANY,
};
use async_trait::async_trait;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

enum Command {
    Stop,
    Fail,
    Panic,
    SpawnChild,
    Ask(Pid),
}

/// Reports its lifecycle to a probe and obeys simple commands.
struct Scripted {
    probe: Pid,
    fail_init: bool,
}

impl Scripted {
    fn new(probe: &Pid) -> Self {
        Self {
            probe: probe.clone(),
            fail_init: false,
        }
    }
}

#[async_trait]
impl Actor for Scripted {
    type State = u32;

    async fn init(&mut self, ctx: &mut Context) -> Result<u32, ActorError> {
        if self.fail_init {
            return Err(ActorError::failed("init refused"));
        }
        message::send(&self.probe, ("init", ctx.pid()));
        Ok(0)
    }

    async fn run(&mut self, steps: &mut u32, ctx: &mut Context) -> Result<(), ActorError> {
        let command = ctx
            .receive_with(
                vec![
                    Clause::sync("stop", |_| Command::Stop),
                    Clause::sync("fail", |_| Command::Fail),
                    Clause::sync("panic", |_| Command::Panic),
                    Clause::sync("spawn_child", |_| Command::SpawnChild),
                    Clause::sync(("ask", Kind::Pid), |c| match c[0].as_pid() {
                        Some(pid) => Command::Ask(pid.clone()),
                        None => Command::Fail,
                    }),
                ],
                None,
            )
            .await?;
        *steps += 1;

        match command {
            Command::Stop => ctx.stop(ExitReason::Normal),
            Command::Fail => return Err(ActorError::failed("asked to fail")),
            Command::Panic => panic!("asked to panic"),
            Command::SpawnChild => {
                let child = actor::start(ctx.scope(), Scripted::new(&self.probe))?;
                message::send(&self.probe, ("child", child));
            }
            Command::Ask(server) => {
                let reply = ctx.call(&server, "get", Duration::from_secs(1)).await?;
                message::send(&self.probe, ("answer", reply));
            }
        }
        Ok(())
    }

    async fn terminate(&mut self, reason: &ExitReason, steps: &mut u32, ctx: &mut Context) {
        message::send(
            &self.probe,
            ("terminated", ctx.pid(), reason.to_string(), i64::from(*steps)),
        );
    }
}

fn exit_to(probe: &Pid) -> impl FnOnce(Pid, ExitReason) + Send + 'static {
    let probe = probe.clone();
    move |pid, reason| message::send(&probe, ("exit", pid, reason.to_string()))
}

async fn started(probe: &mut Probe) -> Pid {
    let captures = assert_receives(probe, ("init", Kind::Pid), WAIT).await;
    captures[0].as_pid().cloned().expect("pid")
}

#[tokio::test]
async fn test_stop_is_a_normal_exit() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let handle = actor::start_link(&scope, Scripted::new(probe.pid()), exit_to(probe.pid())).unwrap();
    let pid = started(&mut probe).await;
    assert_eq!(&pid, handle.pid());

    message::send(&pid, "stop");
    let terminated = assert_receives(&mut probe, ("terminated", &pid, Kind::Str, Kind::Int), WAIT).await;
    assert_eq!(terminated[0], "normal");
    assert_eq!(terminated[1], Value::Int(1));
    assert_receives(&mut probe, ("exit", &pid, "normal"), WAIT).await;

    assert_eq!(handle.join().await, ExitReason::Normal);
    assert!(!pid.is_alive());
}

#[tokio::test]
async fn test_run_error_becomes_error_reason_after_terminate() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let handle = actor::start_link(&scope, Scripted::new(probe.pid()), exit_to(probe.pid())).unwrap();
    let pid = started(&mut probe).await;

    message::send(&pid, "fail");
    let terminated = assert_receives(&mut probe, ("terminated", &pid, Kind::Str, ANY), WAIT).await;
    assert_eq!(terminated[0], "error: asked to fail");
    assert_receives(&mut probe, ("exit", &pid, "error: asked to fail"), WAIT).await;
    assert!(handle.join().await.is_abnormal());
}

#[tokio::test]
async fn test_cancel_runs_terminate_with_cancelled() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let handle = actor::start_link(&scope, Scripted::new(probe.pid()), exit_to(probe.pid())).unwrap();
    let pid = started(&mut probe).await;

    handle.cancel();
    let terminated = assert_receives(&mut probe, ("terminated", &pid, Kind::Str, ANY), WAIT).await;
    assert_eq!(terminated[0], "cancelled");
    assert_eq!(handle.join().await, ExitReason::Cancelled);
}

#[tokio::test]
async fn test_init_failure_skips_terminate() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let mut scripted = Scripted::new(probe.pid());
    scripted.fail_init = true;
    let handle = actor::start_link(&scope, scripted, exit_to(probe.pid())).unwrap();
    let pid = handle.pid().clone();

    let reason = with_timeout(WAIT, handle.join()).await.unwrap();
    assert_eq!(reason.to_string(), "error: init refused");
    assert_receives(&mut probe, ("exit", &pid, "error: init refused"), WAIT).await;
    assert!(probe
        .receive(("terminated", ANY, ANY, ANY), Duration::from_millis(50))
        .await
        .is_err());
}

#[tokio::test]
async fn test_panic_in_run_is_reported_as_error_after_terminate() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let handle = actor::start_link(&scope, Scripted::new(probe.pid()), exit_to(probe.pid())).unwrap();
    let pid = started(&mut probe).await;

    message::send(&pid, "panic");
    let reason = with_timeout(WAIT, handle.join()).await.unwrap();
    assert_eq!(reason, ExitReason::error("panicked: asked to panic"));

    let terminated = assert_receives(&mut probe, ("terminated", &pid, Kind::Str, Kind::Int), WAIT).await;
    assert_eq!(terminated[0], "error: panicked: asked to panic");
    assert_eq!(terminated[1], Value::Int(1));
    assert_receives(&mut probe, ("exit", &pid, "error: panicked: asked to panic"), WAIT).await;
}

#[tokio::test]
async fn test_scope_shutdown_cancels_nested_actors() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let parent = actor::start(&scope, Scripted::new(probe.pid())).unwrap();
    assert_eq!(started(&mut probe).await, parent);

    message::send(&parent, "spawn_child");
    let child = started(&mut probe).await;
    assert_receives(&mut probe, ("child", &child), WAIT).await;

    with_timeout(WAIT, scope.shutdown()).await.unwrap();
    assert!(!parent.is_alive());
    assert!(!child.is_alive());
    assert_receives(&mut probe, ("terminated", &child, "cancelled", ANY), WAIT).await;
    assert_receives(&mut probe, ("terminated", &parent, "cancelled", ANY), WAIT).await;
}

#[tokio::test]
async fn test_actor_exit_cancels_its_own_children() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let handle = actor::start_link(&scope, Scripted::new(probe.pid()), |_, _| {}).unwrap();
    let parent = started(&mut probe).await;

    message::send(&parent, "spawn_child");
    let child = started(&mut probe).await;

    message::send(&parent, "stop");
    assert_eq!(handle.join().await, ExitReason::Normal);
    assert!(!child.is_alive());
    assert!(!scope.is_cancelled());
}

struct Constant;

#[async_trait]
impl GenServer for Constant {
    type State = ();

    async fn init(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
        Ok(())
    }

    async fn handle_call(
        &mut self,
        _request: Value,
        _from: Ref,
        _state: &mut (),
        _ctx: &mut Context,
    ) -> Result<Value, ActorError> {
        Ok(Value::Int(42))
    }
}

#[tokio::test]
async fn test_call_from_actor_keeps_other_messages_queued() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let server = Constant.start(&scope).unwrap();
    let pid = actor::start(&scope, Scripted::new(probe.pid())).unwrap();
    started(&mut probe).await;

    message::send(&pid, ("ask", &server));
    message::send(&pid, "stop");
    assert_receives(&mut probe, ("answer", 42), WAIT).await;
    assert_receives(&mut probe, ("terminated", &pid, "normal", Value::Int(2)), WAIT).await;
}

#[tokio::test]
async fn test_send_to_terminated_actor_does_not_fail() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let handle = actor::start_link(&scope, Scripted::new(probe.pid()), |_, _| {}).unwrap();
    let pid = started(&mut probe).await;
    message::send(&pid, "stop");
    handle.join().await;

    message::send(&pid, "stop");
    message::cast(&pid, "anything");
    let err = message::call(&pid, "get", Duration::from_millis(30))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[test]
fn test_start_without_runtime_is_usage_error() {
    let probe = Probe::new();
    let err = actor::start(&Scope::new(), Scripted::new(probe.pid())).unwrap_err();
    assert!(matches!(err, ActorError::Usage(_)));
}

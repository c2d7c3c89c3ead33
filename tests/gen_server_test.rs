use actor_otp::message::{self, TASK_SUCCESS};
use actor_otp::testing::{assert_receives, with_timeout, Probe};
use actor_otp::{
    ActorError, Context, ExitReason, GenServer, Kind, Pid, Ref, Scope, TaskHandle, Value, ANY,
};
use async_trait::async_trait;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(2);

/// Counter with background work, reporting completions and info messages to a probe.
struct Counter {
    probe: Pid,
}

#[derive(Default)]
struct CounterState {
    count: i64,
    last_info: Value,
    pending: Option<TaskHandle>,
}

async fn work_ok() -> Result<Value, ActorError> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(Value::from("OK"))
}

async fn work_err() -> Result<Value, ActorError> {
    Err(ActorError::failed("bad input"))
}

async fn work_panic() -> Result<Value, ActorError> {
    panic!("task exploded")
}

async fn work_after(millis: i64) -> Result<Value, ActorError> {
    tokio::time::sleep(Duration::from_millis(u64::try_from(millis).unwrap_or(0))).await;
    Ok(Value::Int(millis))
}

async fn work_slow() -> Result<Value, ActorError> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Ok(Value::Nil)
}

#[async_trait]
impl GenServer for Counter {
    type State = CounterState;

    async fn init(&mut self, _ctx: &mut Context) -> Result<CounterState, ActorError> {
        Ok(CounterState::default())
    }

    async fn handle_call(
        &mut self,
        request: Value,
        _from: Ref,
        state: &mut CounterState,
        ctx: &mut Context,
    ) -> Result<Value, ActorError> {
        let reply = match request.as_tuple() {
            Some([op, Value::Int(n)]) if *op == "add" => {
                state.count += n;
                Value::Int(state.count)
            }
            Some([op, Value::Ref(tag), Value::Int(millis)]) if *op == "start_after" => {
                let (tag, _) = ctx.start_background_task(work_after(*millis), Some(*tag))?;
                Value::from(tag)
            }
            _ => match request.as_str() {
                Some("get") => Value::Int(state.count),
                Some("last_info") => state.last_info.clone(),
                Some("slow") => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Value::Nil
                }
                Some("start_ok") => {
                    let (tag, _) = ctx.start_background_task(work_ok(), None)?;
                    Value::from(tag)
                }
                Some("start_err") => {
                    let (tag, _) = ctx.start_background_task(work_err(), None)?;
                    Value::from(tag)
                }
                Some("start_panic") => {
                    let (tag, _) = ctx.start_background_task(work_panic(), None)?;
                    Value::from(tag)
                }
                Some("start_slow") => {
                    let (tag, handle) = ctx.start_background_task(work_slow(), None)?;
                    state.pending = Some(handle);
                    Value::from(tag)
                }
                Some("cancel") => {
                    let cancelled = state.pending.take();
                    if let Some(handle) = &cancelled {
                        handle.cancel();
                    }
                    Value::Bool(cancelled.is_some())
                }
                _ => Value::Nil,
            },
        };
        Ok(reply)
    }

    async fn handle_cast(
        &mut self,
        request: Value,
        state: &mut CounterState,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        match request.as_tuple() {
            Some([op, Value::Int(n)]) if *op == "set" => state.count = *n,
            _ if request == "reset" => state.count = 0,
            _ => {}
        }
        Ok(())
    }

    async fn handle_info(
        &mut self,
        message: Value,
        state: &mut CounterState,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        message::send(&self.probe, ("info", message.clone()));
        state.last_info = message;
        Ok(())
    }

    async fn handle_task_success(
        &mut self,
        tag: Ref,
        task: Pid,
        result: Value,
        _state: &mut CounterState,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        message::send(&self.probe, ("success", tag, task, result));
        Ok(())
    }

    async fn handle_task_failure(
        &mut self,
        tag: Ref,
        task: Pid,
        reason: String,
        _state: &mut CounterState,
        _ctx: &mut Context,
    ) -> Result<(), ActorError> {
        message::send(&self.probe, ("failure", tag, task, reason));
        Ok(())
    }
}

async fn call(pid: &Pid, request: impl Into<Value>) -> Value {
    message::call(pid, request, WAIT).await.expect("call failed")
}

fn start_counter(scope: &Scope, probe: &Probe) -> Pid {
    Counter {
        probe: probe.pid().clone(),
    }
    .start(scope)
    .expect("start counter")
}

#[tokio::test]
async fn test_call_returns_reply_and_updates_state() {
    let scope = Scope::new();
    let probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    assert_eq!(call(&pid, "get").await, Value::Int(0));
    assert_eq!(call(&pid, ("add", 5)).await, Value::Int(5));
    assert_eq!(call(&pid, ("add", 3)).await, Value::Int(8));
    scope.shutdown().await;
}

#[tokio::test]
async fn test_cast_is_observed_by_following_call() {
    let scope = Scope::new();
    let probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    message::cast(&pid, ("set", 100));
    assert_eq!(call(&pid, "get").await, Value::Int(100));
    message::cast(&pid, "reset");
    assert_eq!(call(&pid, "get").await, Value::Int(0));
    scope.shutdown().await;
}

#[tokio::test]
async fn test_info_is_processed_in_mailbox_order() {
    let scope = Scope::new();
    let probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let msg = Value::from(("custom", "info", "message"));
    message::send(&pid, msg.clone());
    assert_eq!(call(&pid, "last_info").await, msg);
    scope.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_calls_are_serialized() {
    let scope = Scope::new();
    let probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let callers: Vec<_> = (0..10)
        .map(|_| {
            let pid = pid.clone();
            tokio::spawn(async move { call(&pid, ("add", 1)).await })
        })
        .collect();

    let mut results = Vec::new();
    for caller in callers {
        results.push(caller.await.unwrap().as_int().unwrap());
    }
    results.sort_unstable();
    assert_eq!(results, (1..=10).collect::<Vec<i64>>());
    assert_eq!(call(&pid, "get").await, Value::Int(10));
    scope.shutdown().await;
}

#[tokio::test]
async fn test_call_timeout_is_caller_side_only() {
    let scope = Scope::new();
    let probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let started = Instant::now();
    let err = message::call(&pid, "slow", Duration::from_millis(100))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "No matching message within 0.1s");
    assert!(elapsed >= Duration::from_millis(95), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1000), "returned late: {elapsed:?}");
    assert!(pid.is_alive());
    scope.shutdown().await;
}

struct Silent;

#[async_trait]
impl GenServer for Silent {
    type State = ();

    async fn init(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_unimplemented_call_fails_the_server() {
    let scope = Scope::new();
    let handle = Silent.start_link(&scope, |_, _| {}).unwrap();

    message::cast(handle.pid(), "ignored");
    message::send(handle.pid(), "also ignored");
    let err = message::call(handle.pid(), "anything", Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let reason = with_timeout(WAIT, handle.join()).await.unwrap();
    assert_eq!(
        reason,
        ExitReason::error("Silent.handle_call/3 not implemented")
    );
}

#[tokio::test]
async fn test_background_task_success() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let tag = call(&pid, "start_ok").await.as_token().expect("ref");
    let done = assert_receives(&mut probe, ("success", tag, Kind::Pid, "OK"), WAIT).await;
    assert_eq!(done.len(), 1);
    assert!(done[0].as_pid().is_some());
    scope.shutdown().await;
}

#[tokio::test]
async fn test_background_task_error_and_panic_are_failures() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let tag = call(&pid, "start_err").await.as_token().expect("ref");
    assert_receives(&mut probe, ("failure", tag, Kind::Pid, "error: bad input"), WAIT).await;

    let tag = call(&pid, "start_panic").await.as_token().expect("ref");
    let failed = assert_receives(&mut probe, ("failure", tag, Kind::Pid, Kind::Str), WAIT).await;
    assert_eq!(failed[1], "error: panicked: task exploded");

    assert!(pid.is_alive());
    scope.shutdown().await;
}

#[tokio::test]
async fn test_cancelled_background_task_reports_failure() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let tag = call(&pid, "start_slow").await.as_token().expect("ref");
    assert_eq!(call(&pid, "cancel").await, Value::Bool(true));
    assert_receives(&mut probe, ("failure", tag, Kind::Pid, "cancelled"), WAIT).await;
    assert!(probe
        .receive(("success", tag, ANY, ANY), Duration::from_millis(50))
        .await
        .is_err());
    scope.shutdown().await;
}

#[tokio::test]
async fn test_unregistered_completion_goes_to_handle_info() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let pid = start_counter(&scope, &probe);
    let stranger = Probe::new();

    message::send(&pid, (TASK_SUCCESS, stranger.pid(), 7));
    let info = assert_receives(&mut probe, ("info", ANY), WAIT).await;
    assert_eq!(info[0], Value::from((TASK_SUCCESS, stranger.pid(), 7)));
    scope.shutdown().await;
}

#[tokio::test]
async fn test_background_task_keeps_caller_chosen_tag() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let chosen = Ref::make();
    let returned = call(&pid, ("start_after", chosen, 5)).await;
    assert_eq!(returned.as_token(), Some(chosen));
    assert_receives(&mut probe, ("success", chosen, Kind::Pid, 5), WAIT).await;
    scope.shutdown().await;
}

#[tokio::test]
async fn test_overlapping_tasks_complete_under_their_own_tags() {
    let scope = Scope::new();
    let mut probe = Probe::new();
    let pid = start_counter(&scope, &probe);

    let slow = Ref::make();
    let fast = Ref::make();
    call(&pid, ("start_after", slow, 80)).await;
    call(&pid, ("start_after", fast, 5)).await;

    let first = probe.next(WAIT).await.unwrap();
    let [Value::Str(kind), Value::Ref(tag), Value::Pid(fast_task), Value::Int(result)] =
        first.as_tuple().expect("completion tuple")
    else {
        panic!("unexpected completion {first}");
    };
    assert_eq!((kind.as_str(), *tag, *result), ("success", fast, 5));

    let second = assert_receives(&mut probe, ("success", slow, Kind::Pid, 80), WAIT).await;
    assert_ne!(second[0].as_pid(), Some(fast_task));
    scope.shutdown().await;
}

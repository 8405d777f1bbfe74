//! Fixture model shared by the integration tests.
#![allow(dead_code)]

use modeler::prelude::*;
use modeler::reactive::{Observable, Subscription};
use modeler::validation::{collect, ensure, ArgumentValidation};
use modeler::ActionCore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Records every request the model makes.
#[derive(Default)]
pub struct ApiMock {
    requests: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl ApiMock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn send_request(&self, request: impl Into<String>) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        self.requests.lock().push(request.into());
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("request failed");
        }
        Ok(())
    }

    pub async fn fetch_all(&self) -> anyhow::Result<Vec<String>> {
        self.send_request("fetch_all").await?;
        Ok(vec!["a".to_string(), "b".to_string()])
    }

    pub fn fail_next_request(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

pub struct TestModel {
    registry: Registry<TestModel>,
    pub api: Arc<ApiMock>,
    pub items: Mutex<Vec<String>>,
    pub normal_property: u32,
    pub counter: Observable<u32>,
    pub observed: Arc<AtomicUsize>,
}

impl TestModel {
    pub fn normal_method(&self) -> u32 {
        self.normal_property + 1
    }

    async fn fetch_all(self: Arc<Self>) -> anyhow::Result<()> {
        let items = self.api.fetch_all().await?;
        *self.items.lock() = items;
        Ok(())
    }

    async fn success_action_without_args(self: Arc<Self>) -> anyhow::Result<()> {
        self.api.send_request("without_args").await
    }

    async fn success_action_with_args(self: Arc<Self>, number: u32, text: String) -> anyhow::Result<()> {
        self.api.send_request(format!("{number}:{text}")).await
    }

    async fn single_error_action(self: Arc<Self>) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        anyhow::bail!("x")
    }

    async fn flaky_action(self: Arc<Self>) -> anyhow::Result<()> {
        self.api.send_request("flaky").await
    }

    async fn defect_action(self: Arc<Self>) -> anyhow::Result<()> {
        Err(Defect::new("index out of range").into())
    }

    async fn nested_action_a(self: Arc<Self>) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn nested_action_b(self: Arc<Self>) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn root_success_action(self: Arc<Self>) -> anyhow::Result<()> {
        self.call::<NestedActionA>(())?.await?;
        self.call::<NestedActionB>(())?.await?;
        Ok(())
    }

    async fn root_error_action(self: Arc<Self>) -> anyhow::Result<()> {
        self.call::<NestedActionA>(())?.await?;
        // The child captures its failure; this action still succeeds.
        self.call::<SingleErrorAction>(())?.await?;
        Ok(())
    }

    async fn recursively_action(self: Arc<Self>, index: u32) -> anyhow::Result<()> {
        if index == 2 {
            return Ok(());
        }
        self.call::<RecursivelyAction>(index + 1)?.await?;
        Ok(())
    }

    fn sync_recursion(self: &Arc<Self>) -> anyhow::Result<()> {
        let _ = self.call::<SyncRecursion>(())?;
        Ok(())
    }

    fn sync_void_action(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn sync_error_action(&self) -> anyhow::Result<()> {
        anyhow::bail!("sync failure")
    }

    async fn action_with_abort(self: Arc<Self>, handle: CancellationHandle) -> anyhow::Result<()> {
        self.api.send_request("endless").await?;
        handle.cancelled().await;
        Err(Cancelled.into())
    }

    async fn root_with_nested_and_abort(
        self: Arc<Self>,
        share: bool,
        handle: CancellationHandle,
    ) -> anyhow::Result<()> {
        let nested = if share {
            self.call_with::<ActionWithAbort>((), handle)?
        } else {
            self.call::<ActionWithAbort>(())?
        };
        nested.await?;
        Ok(())
    }

    async fn root_reraising_abort(self: Arc<Self>, handle: CancellationHandle) -> anyhow::Result<()> {
        self.call_with::<ActionWithAbort>((), handle)?.await?;
        if self.action::<ActionWithAbort>()?.is_abort() {
            return Err(Cancelled.into());
        }
        Ok(())
    }

    async fn add_item(self: Arc<Self>, sku: String, quantity: u32) -> anyhow::Result<()> {
        self.api.send_request(format!("add:{sku}x{quantity}")).await?;
        self.items.lock().push(sku);
        Ok(())
    }

    async fn parent_action_with_super_call(self: Arc<Self>, number: u32) -> anyhow::Result<()> {
        self.api.send_request(format!("parent:{number}")).await
    }

    async fn action_with_super_call(self: Arc<Self>, number: u32) -> anyhow::Result<()> {
        self.call::<ParentActionWithSuperCall>(number)?.await?;
        Ok(())
    }
}

fn check_item(_owner: &TestModel, (sku, quantity): &(String, u32)) -> ArgumentValidation {
    collect(vec![
        ensure(!sku.is_empty(), "sku", "must not be empty"),
        ensure(*quantity > 0, "quantity", "must be positive"),
    ])
}

define_action!(pub struct FetchAll: TestModel => async fetch_all(););
define_action!(pub struct SuccessActionWithoutArgs: TestModel => async success_action_without_args(););
define_action!(pub struct SuccessActionWithArgs: TestModel => async success_action_with_args(number: u32, text: String););
define_action!(pub struct SingleErrorAction: TestModel => async single_error_action(););
define_action!(pub struct FlakyAction: TestModel => async flaky_action(););
define_action!(pub struct DefectAction: TestModel => async defect_action(););
define_action!(pub struct NestedActionA: TestModel => async nested_action_a(););
define_action!(pub struct NestedActionB: TestModel => async nested_action_b(););
define_action!(pub struct RootSuccessAction: TestModel => async root_success_action(););
define_action!(pub struct RootErrorAction: TestModel => async root_error_action(););
define_action!(pub struct RecursivelyAction: TestModel => async recursively_action(index: u32););
define_action!(pub struct SyncRecursion: TestModel => sync sync_recursion(););
define_action!(pub struct SyncVoidAction: TestModel => sync sync_void_action(););
define_action!(pub struct SyncErrorAction: TestModel => sync sync_error_action(););
define_action!(pub struct ActionWithAbort: TestModel => async action_with_abort() with handle;);
define_action!(pub struct RootWithNestedAndAbort: TestModel => async root_with_nested_and_abort(share: bool) with handle;);
define_action!(pub struct RootReraisingAbort: TestModel => async root_reraising_abort() with handle;);
define_action! {
    /// Validated before callers decide to run it.
    pub struct AddItem: TestModel => async add_item(sku: String, quantity: u32)
        where validate = check_item;
}
define_action!(pub struct ActionWithSuperCall: TestModel => async action_with_super_call(number: u32););

/// Base behaviour overridden by [`ActionWithSuperCall`]; shares its name.
pub struct ParentActionWithSuperCall;

impl ActionDef<TestModel> for ParentActionWithSuperCall {
    type Args = u32;

    const NAME: &'static str = "action_with_super_call";

    fn run(owner: Arc<TestModel>, number: u32, _handle: CancellationHandle) -> Invocation {
        Invocation::future(owner.parent_action_with_super_call(number))
    }
}

/// Never declared in the schema.
pub struct Undeclared;

impl ActionDef<TestModel> for Undeclared {
    type Args = ();

    const NAME: &'static str = "undeclared";

    fn run(_owner: Arc<TestModel>, _args: (), _handle: CancellationHandle) -> Invocation {
        Invocation::done()
    }
}

/// Claims the name of a plain method.
pub struct NotMarked;

impl ActionDef<TestModel> for NotMarked {
    type Args = ();

    const NAME: &'static str = "normal_method";

    fn run(_owner: Arc<TestModel>, _args: (), _handle: CancellationHandle) -> Invocation {
        Invocation::done()
    }
}

impl ProtoModel for TestModel {
    fn registry(&self) -> &Registry<Self> {
        &self.registry
    }

    fn declare(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .action::<FetchAll>()
            .action::<SuccessActionWithoutArgs>()
            .action::<SuccessActionWithArgs>()
            .action::<SingleErrorAction>()
            .action::<FlakyAction>()
            .action::<DefectAction>()
            .action::<NestedActionA>()
            .action::<NestedActionB>()
            .action::<RootSuccessAction>()
            .action::<RootErrorAction>()
            .action::<RecursivelyAction>()
            .action::<SyncRecursion>()
            .action::<SyncVoidAction>()
            .action::<SyncErrorAction>()
            .action::<ActionWithAbort>()
            .action::<RootWithNestedAndAbort>()
            .action::<RootReraisingAbort>()
            .action::<AddItem>()
            .action::<ParentActionWithSuperCall>()
            .action::<ActionWithSuperCall>()
            .method("normal_method")
    }

    fn setup(self: &Arc<Self>) {
        let observed = Arc::clone(&self.observed);
        self.registry.watch(&self.counter, move |_, _| {
            observed.fetch_add(1, Ordering::SeqCst);
        });
    }
}

impl ModelFactory for TestModel {
    type Params = Arc<ApiMock>;

    fn construct(api: Arc<ApiMock>) -> Self {
        Self {
            registry: Registry::new(),
            api,
            items: Mutex::new(Vec::new()),
            normal_property: 1,
            counter: Observable::new(0),
            observed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

pub fn create_test_model(api: Arc<ApiMock>) -> Model<TestModel> {
    TestModel::create(api).expect("test model schema is valid")
}

/// Collects the states an action moves through.
pub fn record_states(action: &ActionCore) -> (Arc<Mutex<Vec<ActionState>>>, Subscription) {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let subscription = action.subscribe(move |new, _| sink.lock().push(new));
    (states, subscription)
}

/// Collects `(action name, state)` pairs of several actions in one log.
pub fn record_many(actions: &[&ActionCore]) -> (Arc<Mutex<Vec<(&'static str, ActionState)>>>, Vec<Subscription>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let subscriptions = actions
        .iter()
        .map(|action| {
            let sink = Arc::clone(&log);
            let name = action.name();
            action.subscribe(move |new, _| sink.lock().push((name, new)))
        })
        .collect();
    (log, subscriptions)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

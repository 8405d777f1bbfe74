//! Shopping Cart
//!
//! This example demonstrates a model whose actions talk to a remote API.
//!
//! Key concepts:
//! - Declaring actions with `define_action!`
//! - Reacting to outside state with a watcher registered in `setup`
//! - Observing action state and the model's pending flag
//! - Conflicts, cancellation and captured errors
//!
//! Run with: cargo run --example cart

use modeler::prelude::*;
use modeler::reactive::Observable;
use modeler::validation::{ensure, ArgumentValidation};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// Remote API
#[derive(Default)]
struct CartApi {
    stored: Mutex<BTreeSet<String>>,
}

impl CartApi {
    async fn fetch_all(&self) -> anyhow::Result<BTreeSet<String>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(self.stored.lock().clone())
    }

    async fn add(&self, sku: &str) -> anyhow::Result<BTreeSet<String>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if sku == "out-of-stock" {
            anyhow::bail!("{sku} is not available");
        }
        let mut stored = self.stored.lock();
        stored.insert(sku.to_string());
        Ok(stored.clone())
    }

    async fn remove(&self, sku: &str) -> anyhow::Result<BTreeSet<String>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut stored = self.stored.lock();
        stored.remove(sku);
        Ok(stored.clone())
    }
}

struct Cart {
    registry: Registry<Cart>,
    logged_in: Observable<bool>,
    api: Arc<CartApi>,
    items: Mutex<BTreeSet<String>>,
}

impl Cart {
    fn items(&self) -> Vec<String> {
        self.items.lock().iter().cloned().collect()
    }

    async fn init(self: Arc<Self>) -> anyhow::Result<()> {
        let items = self.api.fetch_all().await?;
        *self.items.lock() = items;
        Ok(())
    }

    async fn add(self: Arc<Self>, sku: String, handle: CancellationHandle) -> anyhow::Result<()> {
        let items = handle.run_until_cancelled(self.api.add(&sku)).await??;
        *self.items.lock() = items;
        Ok(())
    }

    async fn remove(self: Arc<Self>, sku: String) -> anyhow::Result<()> {
        let items = self.api.remove(&sku).await?;
        *self.items.lock() = items;
        Ok(())
    }
}

fn known_sku(_cart: &Cart, sku: &String) -> ArgumentValidation {
    ensure(!sku.trim().is_empty(), "sku", "must not be blank")
}

define_action!(struct Init: Cart => async init(););
define_action! {
    struct Add: Cart => async add(sku: String) with handle
        where validate = known_sku;
}
define_action!(struct Remove: Cart => async remove(sku: String););

impl ProtoModel for Cart {
    fn registry(&self) -> &Registry<Self> {
        &self.registry
    }

    fn declare(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .action::<Init>()
            .action::<Add>()
            .action::<Remove>()
            .method("items")
    }

    fn setup(self: &Arc<Self>) {
        let cart = Arc::downgrade(self);
        self.registry.watch_immediate(&self.logged_in, move |logged_in, _| {
            let Some(cart) = cart.upgrade() else {
                return;
            };
            if !*logged_in {
                cart.items.lock().clear();
                return;
            }
            match cart.call::<Init>(()) {
                Ok(promise) => {
                    tokio::spawn(promise);
                }
                Err(error) => warn!(%error, "could not load the cart"),
            }
        });
    }
}

impl ModelFactory for Cart {
    type Params = (Observable<bool>, Arc<CartApi>);

    fn construct((logged_in, api): Self::Params) -> Self {
        Self {
            registry: Registry::new(),
            logged_in,
            api,
            items: Mutex::new(BTreeSet::new()),
        }
    }
}

async fn settle(action: &modeler::ActionCore) -> anyhow::Result<()> {
    if let Some(promise) = action.promise() {
        promise.await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Shopping Cart ===\n");

    let api = Arc::new(CartApi::default());
    api.stored.lock().insert("book".to_string());
    let logged_in = Observable::new(false);
    let cart = Cart::create((logged_in.clone(), Arc::clone(&api)))?;

    let pending = cart.registry().watch_pending();
    let _pending_log = pending.subscribe(|busy, _| info!(busy = *busy, "cart pending flag"));

    println!("Step 1: Log in");
    logged_in.set(true);
    let init = cart.action::<Init>()?;
    println!("  init is {}", init.state());
    settle(&init).await?;
    println!("  init is {}, items: {:?}\n", init.state(), cart.items());

    println!("Step 2: Add items");
    let add = cart.action::<Add>()?;
    let adding = add.exec("pen".to_string())?;
    match add.exec("lamp".to_string()) {
        Ok(_) => println!("  unexpected: second add started"),
        Err(error) => println!("  second add refused: {error}"),
    }
    adding.await?;
    println!("  items: {:?}", cart.items());

    let problems = add.validate(&"  ".to_string())?;
    println!("  blank sku rejected: {}", problems[0]);
    println!();

    println!("Step 3: Capture a failure");
    add.exec("out-of-stock".to_string())?.await?;
    if let Some(error) = add.error() {
        println!("  add is {}: {error}", add.state());
    }
    add.reset_error()?;
    println!();

    println!("Step 4: Cancel a slow request");
    let adding = add.exec("desk".to_string())?;
    let cancelled = add.cancel(Some("changed my mind".into()));
    assert!(cancelled.ptr_eq(&adding));
    adding.await?;
    println!(
        "  add is {} because {:?}\n",
        add.state(),
        add.abort_reason().and_then(|reason| reason.as_str().map(str::to_string))
    );

    println!("Step 5: Remove an item");
    cart.call::<Remove>("book".to_string())?.await?;
    println!("  items: {:?}\n", cart.items());

    println!("Step 6: Snapshot");
    println!("{}\n", serde_json::to_string_pretty(&cart.snapshot())?);

    println!("Step 7: Log out");
    logged_in.set(false);
    println!("  items: {:?}", cart.items());
    cart.destroy();

    println!("\nKey Takeaways:");
    println!("- Actions expose their state while the API call runs");
    println!("- Running an action twice at once is a conflict, not a queue");
    println!("- Failures are captured on the action instead of being returned");
    println!("- Cancellation settles the action into abort with a reason");

    Ok(())
}

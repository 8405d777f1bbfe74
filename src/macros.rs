//! Macros for ergonomic action definitions.

/// Generate an [`ActionDef`](crate::ActionDef) for one method of a model.
///
/// ```text
/// define_action!($vis struct Def: Owner => async|sync method(arg: Type, ...)
///     [with handle] [where validate = path];)
/// ```
///
/// - `async` methods take `self: Arc<Self>` and return
///   `anyhow::Result<()>` from an `async fn`;
/// - `sync` methods take `&self` or `self: &Arc<Self>` and return
///   `anyhow::Result<()>`;
/// - `with handle` passes the execution's
///   [`CancellationHandle`](crate::CancellationHandle) as the last argument;
/// - `where validate = path` uses `path(&owner, &args)` as the definition's
///   argument validation.
///
/// The arguments become the definition's `Args`: `()` for none, the type
/// itself for one, a tuple for several.
///
/// # Example
///
/// ```
/// use modeler::prelude::*;
/// use std::sync::Arc;
///
/// struct Cart {
///     registry: Registry<Cart>,
/// }
///
/// impl Cart {
///     async fn add(self: Arc<Self>, sku: String, quantity: u32) -> anyhow::Result<()> {
///         let _ = (sku, quantity);
///         Ok(())
///     }
///
///     async fn sync_all(self: Arc<Self>, handle: CancellationHandle) -> anyhow::Result<()> {
///         handle.check()?;
///         Ok(())
///     }
///
///     fn clear(&self) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// define_action! {
///     /// Add an item.
///     pub struct Add: Cart => async add(sku: String, quantity: u32);
/// }
/// define_action!(pub struct SyncAll: Cart => async sync_all() with handle;);
/// define_action!(struct Clear: Cart => sync clear(););
///
/// assert_eq!(<Add as ActionDef<Cart>>::NAME, "add");
/// assert_eq!(<Clear as ActionDef<Cart>>::NAME, "clear");
/// ```
#[macro_export]
macro_rules! define_action {
    (
        $(#[$meta:meta])*
        $vis:vis struct $def:ident : $owner:ty => $mode:ident $method:ident (
            $($arg:ident : $ty:ty),* $(,)?
        )
        $(with $handle:ident)?
        $(where validate = $validate:path)?
        ;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default)]
        $vis struct $def;

        impl $crate::ActionDef<$owner> for $def {
            type Args = $crate::define_action!(@args $($ty),*);

            const NAME: &'static str = stringify!($method);

            #[allow(unused_variables)]
            fn run(
                owner: ::std::sync::Arc<$owner>,
                args: Self::Args,
                handle: $crate::CancellationHandle,
            ) -> $crate::Invocation {
                let $crate::define_action!(@pat $($arg),*) = args;
                $crate::define_action!(@invoke $mode
                    $crate::define_action!(@call owner handle $method ($($arg),*) $(with $handle)?))
            }

            $(
                fn validate(
                    owner: &$owner,
                    args: &Self::Args,
                ) -> $crate::validation::ArgumentValidation {
                    $validate(owner, args)
                }
            )?
        }
    };

    (@args) => { () };
    (@args $ty:ty) => { $ty };
    (@args $($ty:ty),+) => { ($($ty),+) };

    (@pat) => { () };
    (@pat $arg:ident) => { $arg };
    (@pat $($arg:ident),+) => { ($($arg),+) };

    (@call $owner:ident $handle:ident $method:ident ($($arg:ident),*)) => {
        $owner.$method($($arg),*)
    };
    (@call $owner:ident $handle:ident $method:ident ($($arg:ident),*) with $named:ident) => {
        $owner.$method($($arg,)* $handle)
    };

    (@invoke async $call:expr) => { $crate::Invocation::future($call) };
    (@invoke sync $call:expr) => { $crate::Invocation::finished($call) };
}

//! Contracts between pools and the engine that owns the real objects

/// A prototype from which pooled instances are produced.
///
/// The identity doubles as the registry key, so two templates with the same
/// identity share one pool. An empty identity is a configuration error.
///
/// # Examples
///
/// ```
/// use spawn_pool::{Poolable, Template};
///
/// #[derive(Clone)]
/// struct Prefab(&'static str);
///
/// struct Entity {
///     active: bool,
/// }
///
/// impl Poolable for Entity {
///     fn on_spawn(&mut self) {
///         self.active = true;
///     }
///     fn on_despawn(&mut self) {
///         self.active = false;
///     }
/// }
///
/// impl Template for Prefab {
///     type Instance = Entity;
///     type Placement = ();
///
///     fn identity(&self) -> &str {
///         self.0
///     }
///
///     fn instantiate(&self, _placement: Option<&()>) -> Entity {
///         Entity { active: true }
///     }
/// }
/// ```
pub trait Template: Send + Sync + 'static {
    /// Object produced by [`Template::instantiate`]
    type Instance: Poolable;

    /// Where new instances are placed (a parent node, a scene layer, ...).
    /// Use `()` when the engine needs nothing.
    type Placement: Send + Sync + 'static;

    /// Key under which instances of this template are pooled
    fn identity(&self) -> &str;

    /// Create a brand new instance
    fn instantiate(&self, placement: Option<&Self::Placement>) -> Self::Instance;
}

/// Lifecycle hooks a pool invokes on its instances.
pub trait Poolable: Send + 'static {
    /// Called once per acquire, before the handle reaches the caller
    fn on_spawn(&mut self) {}

    /// Called once per release and once per pre-created instance
    fn on_despawn(&mut self) {}

    /// Whether the engine has destroyed the underlying object.
    ///
    /// Destroyed instances are skipped on acquire; they are never handed out
    /// again but stay in the pool.
    fn is_destroyed(&self) -> bool {
        false
    }
}

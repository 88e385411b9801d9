//! Type-erased registry of initialized feature slices.

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// State owned by a feature slice and shared with every request.
pub trait FeatureSlice: Any + Debug + Send + Sync {
    /// Slice name used in startup logs.
    fn name(&self) -> &'static str;

    /// Enables downcasting from the trait object.
    fn as_any(&self) -> &dyn Any;
}

/// A feature that finished its initialization.
#[derive(Debug)]
pub struct InitializedSlice {
    pub id: TypeId,
    pub state: Box<dyn FeatureSlice>,
}

impl InitializedSlice {
    pub fn new<T: FeatureSlice>(state: T) -> Self {
        Self { id: TypeId::of::<T>(), state: Box::new(state) }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.state.name()
    }
}

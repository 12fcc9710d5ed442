//! Parameter model — layout, atomic store, and pre-resolved handles.

pub mod handles;
pub mod layout;
pub mod store;

pub use handles::{EngineConfig, ParamHandles, StepSlot};
pub use layout::{MasterParam, ParamLayout, ParamRange, ParamSpec, StepParam, MAX_STEPS};
pub use store::{ParamChange, ParamSnapshot, ParamStore};

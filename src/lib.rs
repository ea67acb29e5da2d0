// Core modules
pub mod class;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod global;
pub mod handle;
pub mod intern;
pub mod logging;
pub mod mta;
pub mod runtime;
pub mod store;

// Re-export commonly used items
pub use class::{ClassDef, ClassId, Destructor, Disposal, MtaConstructor, PrimitiveClass, Printer};
pub use config::RuntimeConfig;
pub use dispatch::{
    CombinationFn, GenericId, GenericOptions, MethodForm, MethodId, Outcome, Trampoline,
};
pub use error::{AdiError, AdiResult, ErrorKind};
pub use handle::{AccessMode, LocateMode, MapToken, Slot};
pub use mta::{Data, DataMut, Element, Mta, Transfer, TypeCode};
pub use runtime::{Runtime, RuntimeStats};
pub use store::ObjectId;

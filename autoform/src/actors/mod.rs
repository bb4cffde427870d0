pub mod form;

pub use form::{FormActor, FormActorState, FormArguments, FormMsg};

pub mod action;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod template;

pub use action::{Action, ActionOutput, ActionRegistry, action_fn};
pub use controller::{Controller, ControllerLoader, ControllerRegistry, Scope, controller_fn};
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use template::{FileTemplates, TemplateError, TemplateRenderer};

pub mod loader;
pub mod pattern;
pub mod table;

pub use loader::{RouteLoadError, load_routes};
pub use table::{Route, RouteArgs, RouteBinding, RouteDefinition, RouteTable};

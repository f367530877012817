pub mod password;
pub mod service;
pub mod token;

pub use service::{
    Access, Auth, AuthError, AuthPolicy, AuthenticatedUser, FirewallOptions, INVALID_CREDENTIALS,
    LoginOutcome,
};

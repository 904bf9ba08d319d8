mod jwks;
mod validator;

pub mod capabilities;
pub mod model;

pub use capabilities::{authorize, Actor, ActorRole, Capability};
pub use jwks::JwksClient;
pub use validator::JwtValidator;

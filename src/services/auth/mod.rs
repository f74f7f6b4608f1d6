pub mod factory;
pub mod keys;
pub mod parser;

pub use factory::build_jwt_auth;
pub use keys::{KeyResolver, SecretResolver, StaticSecrets, algorithm_name};
pub use parser::{ClaimsFactory, Parser};

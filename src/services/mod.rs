pub mod authz;
pub mod jwks;
pub mod policy;
pub mod token;

pub mod authorizer;
pub mod bearer;
pub mod factory;
pub mod response;

pub use authorizer::{AuthorizationRequest, Authorizer, UNKNOWN_PRINCIPAL};
pub use bearer::bearer_token;
pub use factory::build_authorizer;
pub use response::{AuthorizationResponse, GatewayContract, adapt};

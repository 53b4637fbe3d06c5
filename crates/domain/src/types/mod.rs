//! Domain types and models

pub mod credential;
pub mod identity;
pub mod page;
pub mod request;
pub mod role_chain;

pub use credential::Credential;
pub use identity::{AuthMethod, CacheKey, IdentityContext};
pub use page::{PageCursor, PagePosition, PaginationStyle};
pub use request::{HttpMethod, RequestSpec};
pub use role_chain::{RoleChain, RoleChainError, RoleHop};

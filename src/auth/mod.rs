// Authentication module
// Password hashing, bearer tokens, email verification and role-gated access

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod token;
pub mod verification;

// Re-export commonly used types
pub use handlers::{login_handler, me_handler, register_handler, verify_email_handler};
pub use middleware::{authenticate, AuthContext, RequireRoles};
pub use models::{LoginRequest, RegisterRequest, RegisterResponse, Role, RoleSet, TokenResponse};
pub use service::{AccountChanges, AuthService};
pub use token::{Claims, TokenService};

//! 认证授权模块
//!
//! 提供 JWT 认证、权限判定和中间件：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前用户上下文
//! - [`require_auth`] - 认证中间件
//! - [`permissions`] - 权限判定 (authorize + 资源级谓词)

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod permissions;

pub use extractor::Principal;
pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
pub use permissions::authorize;

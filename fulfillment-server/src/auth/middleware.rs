//! 认证中间件
//!
//! 为 JWT 认证提供 Axum 中间件

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;

use crate::auth::{Claims, CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::db::repository::user;
use crate::security_log;
use crate::utils::{AppError, AppResult, ErrorCode};

/// 认证中间件 - 要求用户登录
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT，然后从数据库解析
/// 用户当前的角色与权限，将 [`CurrentUser`] 注入请求扩展。
///
/// # 跳过认证的路径
///
/// - `OPTIONS *` (CORS 预检)
/// - 非 `/api/` 路径
/// - `/api/health` (健康检查)
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 NotAuthenticated |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 / 未知用户 | 401 TokenInvalid |
/// | 用户已停用 | 401 AccountDisabled |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    // 允许 CORS 预检的 OPTIONS 请求 (跳过认证)
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过认证 (让它们正常返回 404)
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    // 公共 API 路由跳过认证
    if path == "/api/health" {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::unauthenticated());
        }
    };

    // 验证令牌
    let claims = match state.jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );

            return match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            };
        }
    };

    let user = resolve_principal(&state.pool, &claims).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Turn validated claims into a principal with its current capabilities
///
/// The role is read from the store on every request, so role edits and
/// deactivations take effect without waiting for tokens to expire.
pub async fn resolve_principal(pool: &SqlitePool, claims: &Claims) -> AppResult<CurrentUser> {
    let user_id = claims
        .user_id()
        .map_err(|e| AppError::invalid_token(e.to_string()))?;

    let Some((user, role)) = user::find_with_role(pool, user_id).await? else {
        security_log!("WARN", "auth_unknown_user", user_id = user_id);
        return Err(AppError::invalid_token("Unknown user"));
    };

    if !user.is_active {
        security_log!("WARN", "auth_disabled_user", user_id = user_id);
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let (role, capabilities) = match role {
        Some(role) if role.is_active => (Some(role.name), role.capabilities),
        _ => (None, Vec::new()),
    };

    Ok(CurrentUser {
        id: user.id,
        username: user.username,
        role,
        capabilities,
    })
}

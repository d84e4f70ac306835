use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{JwtConfig, JwtService};
use crate::core::Config;
use crate::db::DbService;
use crate::services::EventBus;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段都是廉价克隆 (pool 与 Arc 内部共享)，axum 为每个请求克隆一次。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | events | EventBus | 领域事件广播 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 领域事件总线
    pub events: EventBus,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`initialize()`](Self::initialize) 方法代替
    pub fn new(config: Config, pool: SqlitePool, jwt_service: Arc<JwtService>) -> Self {
        Self {
            config,
            pool,
            jwt_service,
            events: EventBus::new(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 数据库 (WAL + 迁移)
    /// 3. JWT 服务
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        if config.is_production() && std::env::var("JWT_SECRET").is_err() {
            anyhow::bail!("JWT_SECRET environment variable must be set in production");
        }

        let db_path = config.database_path();
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self::new(config.clone(), db_service.pool, jwt_service))
    }

    /// In-memory state for tests and local tooling
    ///
    /// Fresh migrated database, fixed JWT secret.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let mut config = Config::from_env();
        config.jwt = JwtConfig {
            secret: "fulfillment-test-secret-0123456789abcdef".to_string(),
            ..config.jwt
        };
        let db_service = DbService::in_memory().await?;
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self::new(config, db_service.pool, jwt_service))
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}

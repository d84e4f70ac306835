//! Fulfillment Server - 订单履约后端
//!
//! # 架构概述
//!
//! HTTP backend that takes orders from placement to completion:
//!
//! - **权限** (`auth`): JWT principals and the capability evaluator
//! - **订单** (`orders`): order state machine, money rules, order numbers
//! - **骑手** (`riders`): rider availability, nearest-rider assignment, location
//! - **班次** (`shifts`): staff cash shifts and reconciliation
//! - **事件** (`services`): in-process domain event bus
//! - **HTTP API** (`api`): RESTful routes under `/api`
//!
//! # 模块结构
//!
//! ```text
//! fulfillment-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、权限判定
//! ├── db/            # SQLite 连接池与仓储
//! ├── orders/        # 订单状态机
//! ├── riders/        # 骑手分配与定位
//! ├── shifts/        # 班次现金对账
//! ├── services/      # 事件总线
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、校验、金额
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod orders;
pub mod riders;
pub mod services;
pub mod shifts;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use services::EventBus;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load `.env`, make sure the work directory exists and start logging.
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }

    init_logger_with_file(
        Some(&config.log_level),
        Some(config.is_production()),
        config.log_dir.as_deref(),
    );
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
    ______      __________ ____
   / ____/_  __/ / __/ (_) / /
  / /_  / / / / / /_/ / / / /
 / __/ / /_/ / / __/ / / / /
/_/    \__,_/_/_/ /_/_/_/_/
    "#
    );
}

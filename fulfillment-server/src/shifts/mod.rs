//! 班次模块 - 员工现金班次的开班、交班与对账

pub mod service;

pub use service::ListShiftsQuery;

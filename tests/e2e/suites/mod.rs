//! 测试套件模块
//!
//! 按功能组织的测试用例集合。

pub mod concurrency;
pub mod config_bootstrap;
pub mod subscription;

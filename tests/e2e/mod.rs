//! 通知注册表端到端测试
//!
//! 测试覆盖跨 crate 的完整流程，包括：
//! - 配置加载到服务初始化
//! - 多管理器并发发布、切换、关闭
//! - 计数订阅与事件信号

pub mod helpers;
pub mod suites;

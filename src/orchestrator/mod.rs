//! 编排层
//!
//! 负责一次运行的资源组装、去重、顺序处理和统计

pub mod batch_processor;

pub use batch_processor::{App, RunReport};

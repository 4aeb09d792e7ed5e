pub mod lp_manager;

pub use lp_manager::ILpManager;

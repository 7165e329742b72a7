pub mod faction;
pub mod role;

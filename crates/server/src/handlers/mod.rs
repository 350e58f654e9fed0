pub mod spa;
pub mod ws;

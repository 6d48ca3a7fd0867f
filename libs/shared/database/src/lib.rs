pub mod food_bank;

pub use food_bank::FoodBankClient;
pub use shared_models::error::ApiError;

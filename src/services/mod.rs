pub mod analysis_service;
pub mod auth_service;
pub mod career_role_service;
pub mod gemini_service;
pub mod industry_demand_service;
pub mod student_service;
pub mod upload_service;

pub use gemini_service::{GeminiClient, GenerativeModel};

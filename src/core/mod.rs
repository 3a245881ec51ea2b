pub mod analytics;
pub mod comparison;
pub mod credibility;
pub mod document_parser;
pub mod email;
pub mod errors;
pub mod export;
pub mod field_extractor;
pub mod gemini;
pub mod github;
pub mod insights;
pub mod models;
pub mod normalizer;
pub mod ocr;
pub mod pdf;
pub mod prompts;
pub mod secret_store;
pub mod service;
pub mod settings_store;
pub mod spreadsheet;

//! # IO Module
//!
//! The interface layer between HTTP clients and the domain services.
//!
//! Handlers translate requests into service calls and map the outcome back
//! to status codes. They hold no business rules of their own.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: The `/api` REST surface
//! - **Authentication**: Resolving `Authorization: Bearer` headers to a user
//! - **Error Translation**: Domain errors to status codes with plain text bodies

pub mod rest;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod product;
pub mod user;

pub use product::{CreateProductInput, CreateProductResponse};
pub use user::{CreateUserInput, CreateUserResponse, UserRecord};

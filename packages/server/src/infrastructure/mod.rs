//! Infrastructure layer: wire-format DTOs.

pub mod dto;

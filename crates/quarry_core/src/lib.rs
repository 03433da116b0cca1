#![forbid(unsafe_code)]
//! Shared language vocabulary for the quarry parsing toolkit.
//!
//! This crate is the single source of truth for the vocabulary the engine
//! consumes: supported languages, structural punctuation, construct-introducing
//! keywords, lexical profiles, and canonical AST node-type names. Everything is
//! **registry-first**: a stable identifier enum plus a const metadata table with
//! `from_str`/`as_str` style lookups.
//!
//! ## Notes
//! - This crate is intentionally dependency-free and side-effect-free so the
//!   registries can live in `const` tables and be reused by any tooling layer.
//! - Enforcement of syntax rules lives in the engine; this crate only records
//!   spellings and metadata.

pub mod lang;

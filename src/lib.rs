// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Telegram Rewards Server - Mini App points and referral service
//!
//! This crate authenticates Telegram Mini App users from signed WebApp init
//! data, provisions one rewards account per Telegram user and keeps an
//! append-only points ledger in an embedded redb database.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Telegram init-data verification and extractors
//! - `provisioning` - Account creation and referral linkage
//! - `storage` - Accounts, ledger and leaderboard (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod provisioning;
pub mod state;
pub mod storage;

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - reads or writes one setting

use super::Context;
use crate::config::{self as settings, KEYS};
use anyhow::{Context as _, Result};
use tracing::info;

/// Print the effective value of `key`, or store `value` in the config file
pub fn run(ctx: &Context, key: &str, value: Option<String>) -> Result<()> {
    match value {
        Some(value) => {
            let mut file_settings = settings::load_file(&ctx.config_path)?;
            file_settings.set(key, &value)?;
            settings::save(&ctx.config_path, &file_settings)?;
            info!("Set {} = {} in {}", key, value, ctx.config_path.display());
            println!("{key} = {value}");
        }
        None => {
            let current = ctx.settings.get(key).with_context(|| {
                format!("Unknown config key: {}. Valid: {}", key, KEYS.join(", "))
            })?;
            println!("{current}");
        }
    }
    Ok(())
}

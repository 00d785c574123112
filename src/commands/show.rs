// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Show command - prints the stored diagram

use super::{print_diagram, Context};
use crate::render::escape_raw;
use anyhow::Result;

/// Print the stored diagram, drawn or as its description
pub fn run(ctx: &Context, raw: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let Some(handoff) = store.load_handoff() else {
        println!("No stored diagram. Run `repoviz generate <url>` first.");
        return Ok(());
    };

    if let Some(repo) = &handoff.repo {
        eprintln!("Repository: {repo}");
    }
    if raw {
        println!("{}", escape_raw(handoff.diagram.as_str()));
    } else {
        print_diagram(ctx, &handoff.diagram);
    }
    Ok(())
}

use anyhow::Result;
use gallery::prelude::*;
use serde_json::json;

use crate::{cli::AppContext, output::OutputFormat};

pub fn show(ctx: &AppContext) -> Result<()> {
    let config = ctx.gallery.config();
    let identity = ctx.gallery.identity();
    let overridden = config.identity.as_deref().is_some_and(|id| !id.trim().is_empty());
    if ctx.output.format() == OutputFormat::Table {
        return ctx.output.emit_text(identity.as_str());
    }
    let attributes = (!overridden).then(|| IdentityAttributes::from_env(&config.user_agent));
    ctx.output.emit_json(&json!({
        "identity": identity,
        "derived": !overridden,
        "attributes": attributes,
        "voting": ctx.gallery.voting_enabled(),
    }))
}

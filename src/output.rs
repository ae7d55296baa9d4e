use crate::client::ResponseData;
use anyhow::{Context, Result};
use std::io::Write;

/// Writes a response to `out`.
///
/// JSON responses are re-indented when `pretty` is set; anything else is
/// written as received, which already ends in a newline.
pub fn render(response: &ResponseData, pretty: bool, out: &mut impl Write) -> Result<()> {
    if response.is_json
        && pretty
        && let Ok(json) = serde_json::from_str::<serde_json::Value>(&response.body)
    {
        let rendered = serde_json::to_string_pretty(&json)?;
        writeln!(out, "{rendered}").context("writing output")?;
        return Ok(());
    }

    out.write_all(response.body.as_bytes())
        .context("writing output")?;
    Ok(())
}

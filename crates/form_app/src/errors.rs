use std::sync::OnceLock;

use color_eyre::Result;

static INIT: OnceLock<()> = OnceLock::new();

/// Install the color-eyre report and panic hooks. Idempotent.
pub fn init() -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    // try_into_hooks does not panic if a hook is already set
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .capture_span_trace_by_default(false)
        .display_location_section(cfg!(debug_assertions))
        .display_env_section(false)
        .try_into_hooks()?;
    eyre_hook.install()?;
    panic_hook.install();

    let _ = INIT.set(());
    Ok(())
}

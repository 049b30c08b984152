//! Air temperature reporting toggles

use super::HandlerContext;
use crate::command::CommandOutcome;
use tracing::info;

/// Handle TurnOnAir: include air temperature in telemetry
pub fn handle_turn_on_air(ctx: &HandlerContext<'_>) -> CommandOutcome {
    ctx.flags.set_air_temp_enabled(true);
    info!(device = ctx.device_id, "[CMD] Turning air temp readings on.");
    CommandOutcome::Success
}

/// Handle TurnOffAir: leave air temperature out of telemetry
pub fn handle_turn_off_air(ctx: &HandlerContext<'_>) -> CommandOutcome {
    ctx.flags.set_air_temp_enabled(false);
    info!(device = ctx.device_id, "[CMD] Turning air temp readings off.");
    CommandOutcome::Success
}

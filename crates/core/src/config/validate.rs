use super::{
    types::{Config, TOOL_MAX_BITS},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Size-class range is non-empty, stepped and within the tool ceiling
/// - Validation rounds are positive
/// - Tool program is set and argument templates name the artifacts they touch
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let schedule = &config.schedule;

    if schedule.min_bits == 0 {
        return Err(invalid("schedule.min_bits must be greater than 0"));
    }
    if schedule.bit_delta == 0 {
        return Err(invalid("schedule.bit_delta must be greater than 0"));
    }
    if schedule.min_bits > schedule.max_bits {
        return Err(invalid(format!(
            "schedule.min_bits ({}) exceeds schedule.max_bits ({})",
            schedule.min_bits, schedule.max_bits
        )));
    }
    if schedule.max_bits > TOOL_MAX_BITS {
        return Err(invalid(format!(
            "schedule.max_bits ({}) exceeds the tool ceiling of {} bits",
            schedule.max_bits, TOOL_MAX_BITS
        )));
    }
    if schedule.max_slots == Some(0) {
        return Err(invalid("schedule.max_slots cannot be 0"));
    }

    let tool = &config.tool;

    if tool.iteration_count == 0 {
        return Err(invalid("tool.iteration_count must be greater than 0"));
    }
    if tool.program.as_os_str().is_empty() {
        return Err(invalid("tool.program cannot be empty"));
    }
    if !mentions(&tool.generate_args, "{candidates}") {
        return Err(invalid(
            "tool.generate_args must reference the {candidates} artifact",
        ));
    }
    for placeholder in ["{candidates}", "{result}"] {
        if !mentions(&tool.validate_args, placeholder) {
            return Err(invalid(format!(
                "tool.validate_args must reference the {} artifact",
                placeholder
            )));
        }
    }

    if config.output.prefix.is_empty() || config.output.prefix.contains('/') {
        return Err(invalid(
            "output.prefix must be a non-empty file name component",
        ));
    }

    Ok(())
}

fn mentions(args: &[String], placeholder: &str) -> bool {
    args.iter().any(|arg| arg.contains(placeholder))
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(reason.into())
}

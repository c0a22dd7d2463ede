use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::EXIT_INVALID_INPUT;
use crate::project::Project;
use serde_json::{Map, Value};

/// Rewritten definitions as pretty-printed JSON
///
/// With `state_machine` only that definition is printed; otherwise an object
/// keyed by registration name holds all of them.
pub fn run_rewrite_command(project: &Project, state_machine: Option<&str>) -> CliResult<String> {
    let mapping = &project.config.task_resource_mapping;
    let machines = project.state_machines()?;

    let output = match state_machine {
        Some(name) => {
            let machine = machines.get(name).ok_or_else(|| {
                CliError::new(format!("State machine '{name}' not found"), EXIT_INVALID_INPUT)
            })?;
            machine.rewritten(mapping).definition
        }
        None => Value::Object(
            machines
                .rewritten(mapping)
                .iter()
                .map(|machine| (machine.name.to_string(), machine.definition.clone()))
                .collect::<Map<String, Value>>(),
        ),
    };

    serde_json::to_string_pretty(&output).cli_general_error()
}

use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use schedule_editor::config::{EditorConfig, MissingPathPolicy};
use schedule_editor::editor::{ScheduleEditor, assign_schedule_modes_to_links};
use schedule_editor::scenario::Scenario;

const USAGE: &str = "usage: schedule-editor <scenario.json> <commands.csv> <output.json>";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [scenario_path, commands_path, output_path] = args.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let config = config_from_env();

    let scenario = match Scenario::load(scenario_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!(error = %e, "failed to load scenario");
            return ExitCode::FAILURE;
        }
    };

    let commands = match std::fs::read_to_string(commands_path) {
        Ok(commands) => commands,
        Err(e) => {
            error!(path = %commands_path, error = %e, "failed to read commands");
            return ExitCode::FAILURE;
        }
    };

    let Scenario { network, schedule } = scenario;
    let mut editor = ScheduleEditor::with_inferred_routers(schedule, network, config);
    let report = editor.apply_batch(&commands);

    for failure in &report.failures {
        warn!(
            record = failure.record_number,
            command = %failure.record,
            error = %failure.error,
            "command not applied"
        );
    }

    let (schedule, mut network) = editor.into_parts();
    assign_schedule_modes_to_links(&schedule, &mut network);
    let output = Scenario::new(network, schedule);
    if let Err(e) = output.save(output_path) {
        error!(error = %e, "failed to write scenario");
        return ExitCode::FAILURE;
    }
    info!(path = %output_path, "wrote edited scenario");

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Editor configuration from `SCHEDULE_EDITOR_DELIMITER` and
/// `SCHEDULE_EDITOR_LENIENT_REFRESH`.
fn config_from_env() -> EditorConfig {
    let mut config = EditorConfig::default();

    if let Ok(delimiter) = std::env::var("SCHEDULE_EDITOR_DELIMITER") {
        let mut chars = delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => config.delimiter = c,
            _ => warn!(
                value = %delimiter,
                "SCHEDULE_EDITOR_DELIMITER must be a single character, using default"
            ),
        }
    }

    if let Ok(lenient) = std::env::var("SCHEDULE_EDITOR_LENIENT_REFRESH")
        && matches!(lenient.as_str(), "1" | "true" | "yes")
    {
        config.missing_path = MissingPathPolicy::LinkOnly;
    }

    config
}

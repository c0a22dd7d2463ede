use crate::cli::OutputFormat;
use crate::error::{CliResult, IntoCliResult};
use crate::project::Project;

/// The resolved configuration in the requested format
pub fn run_config_command(project: &Project, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&project.config).cli_general_error(),
        OutputFormat::Yaml => serde_yaml::to_string(&project.config).cli_general_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigOverrides;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_config_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("serverless.yml");
        std::fs::write(
            &path,
            "custom:\n  stepFunctionsLocal:\n    accountId: 101010101010\n    region: us-east-1\n    waitTimeScale: 0.25\n",
        )
        .unwrap();
        let project = Project::load(Some(path.as_path()), &ConfigOverrides::default()).unwrap();

        let output: serde_json::Value =
            serde_json::from_str(&run_config_command(&project, OutputFormat::Json).unwrap())
                .unwrap();

        assert_eq!(output["account_id"], "101010101010");
        assert_eq!(output["region"], "us-east-1");
        assert_eq!(output["wait_time_scale"], 0.25);
        assert_eq!(output["lambda_endpoint"], "http://localhost:4000");
    }
}

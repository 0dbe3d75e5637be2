use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::spawner::ProcessCommand;

pub struct ProcessCommandBuilder {
    command: ProcessCommand,
}

impl ProcessCommandBuilder {
    pub fn new(program: &str) -> Self {
        Self {
            command: ProcessCommand {
                program: program.to_string(),
                args: Vec::new(),
                env: HashMap::new(),
                working_dir: None,
                timeout: None,
            },
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.command.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.command
            .args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.command.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ProcessCommand {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_full_command() {
        let cmd = ProcessCommandBuilder::new("dask-scheduler")
            .arg("--port")
            .arg("8787")
            .args(["--bokeh", "--bokeh-port", "8888"])
            .env("DASK_LOGGING__DISTRIBUTED", "info")
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(cmd.program, "dask-scheduler");
        assert_eq!(
            cmd.args,
            vec!["--port", "8787", "--bokeh", "--bokeh-port", "8888"]
        );
        assert_eq!(
            cmd.env.get("DASK_LOGGING__DISTRIBUTED"),
            Some(&"info".to_string())
        );
        assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
        assert!(cmd.working_dir.is_none());
    }
}

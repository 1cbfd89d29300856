//! Command parsing and dispatch onto the [`Storage`] facade.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use filebridge_core::config::ConfigUpdate;
use filebridge_core::files::FileDescriptor;
use filebridge_core::Storage;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// A parsed `filebridge` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(String),
    Cat(String),
    Put { file: PathBuf, dir: String },
    Remove(String),
    Mkdir { name: String, parent: String },
    Tree(String),
    Outline(String),
    Aggregate(String),
    Dump(String),
    Probe,
    Exec(String),
    Config,
    SetConfig(ConfigUpdate),
    ForceLocal(bool),
    ForceSsh(bool),
}

/// What a command prints on stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Json(Value),
    Text(String),
}

impl Output {
    fn json(value: impl Serialize) -> anyhow::Result<Self> {
        Ok(Output::Json(serde_json::to_value(value)?))
    }

    pub fn render(&self) -> anyhow::Result<String> {
        match self {
            Output::Json(value) => Ok(serde_json::to_string_pretty(value)?),
            Output::Text(text) => Ok(text.clone()),
        }
    }
}

/// Parse the arguments following the binary name.
pub fn parse(args: &[String]) -> anyhow::Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        bail!("missing command");
    };
    let optional = |idx: usize| rest.get(idx).cloned().unwrap_or_default();
    let required = |idx: usize, what: &str| -> anyhow::Result<String> {
        rest.get(idx)
            .cloned()
            .with_context(|| format!("{name}: missing <{what}>"))
    };

    let command = match name.as_str() {
        "ls" => Command::List(optional(0)),
        "cat" => Command::Cat(required(0, "path")?),
        "put" => Command::Put {
            file: PathBuf::from(required(0, "file")?),
            dir: optional(1),
        },
        "rm" => Command::Remove(required(0, "path")?),
        "mkdir" => Command::Mkdir {
            name: required(0, "name")?,
            parent: optional(1),
        },
        "tree" => Command::Tree(optional(0)),
        "outline" => Command::Outline(optional(0)),
        "aggregate" => Command::Aggregate(optional(0)),
        "dump" => Command::Dump(optional(0)),
        "probe" => Command::Probe,
        "exec" => {
            if rest.is_empty() {
                bail!("exec: missing <command>");
            }
            Command::Exec(rest.join(" "))
        }
        "config" => Command::Config,
        "set-config" => {
            let json = required(0, "json")?;
            let update: ConfigUpdate =
                serde_json::from_str(&json).context("set-config: invalid JSON")?;
            Command::SetConfig(update)
        }
        "force-local" => Command::ForceLocal(parse_switch(&required(0, "on|off")?)?),
        "force-ssh" => Command::ForceSsh(parse_switch(&required(0, "on|off")?)?),
        other => bail!("unknown command: {other}"),
    };
    Ok(command)
}

fn parse_switch(value: &str) -> anyhow::Result<bool> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => bail!("expected on or off, got {other}"),
    }
}

/// Stage a local file as an upload descriptor.
fn descriptor_for(file: &Path) -> anyhow::Result<FileDescriptor> {
    let metadata =
        std::fs::metadata(file).with_context(|| format!("cannot read {}", file.display()))?;
    let original_name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?
        .to_string_lossy()
        .to_string();
    Ok(FileDescriptor {
        original_name,
        local_temp_path: file.to_path_buf(),
        size: metadata.len(),
    })
}

/// Execute `command` against `storage`.
pub async fn run(storage: &Storage, command: Command) -> anyhow::Result<Output> {
    match command {
        Command::List(path) => Output::json(storage.list_entries(&path).await?),
        Command::Cat(path) => Ok(Output::Text(storage.read_file(&path).await?)),
        Command::Put { file, dir } => {
            let descriptor = descriptor_for(&file)?;
            storage.write_file(&descriptor, &dir).await?;
            Output::json(serde_json::json!({
                "uploaded": descriptor.original_name,
                "size": descriptor.size,
            }))
        }
        Command::Remove(path) => Output::json(serde_json::json!({
            "deleted": storage.delete_entry(&path).await?,
        })),
        Command::Mkdir { name, parent } => Output::json(serde_json::json!({
            "created": storage.create_folder(&name, &parent).await?,
        })),
        Command::Tree(path) => Output::json(storage.get_tree(&path).await?),
        Command::Outline(path) => Ok(Output::Text(storage.get_outline(&path).await?)),
        Command::Aggregate(path) => Output::json(storage.get_all_files_aggregate(&path).await?),
        Command::Dump(path) => Ok(Output::Text(storage.get_formatted_aggregate(&path).await?)),
        Command::Probe => Output::json(serde_json::json!({
            "mode": storage.mode(),
            "connected": storage.test_connectivity().await,
        })),
        Command::Exec(command) => {
            let output = storage.execute_remote_command(&command).await?;
            if !output.success() {
                warn!(code = output.code, %command, "Remote command failed");
            }
            Output::json(output)
        }
        Command::Config => Output::json(storage.get_config()),
        Command::SetConfig(update) => {
            storage.set_config(&update)?;
            Output::json(storage.get_config())
        }
        Command::ForceLocal(value) => {
            storage.set_force_local_folder(value)?;
            Output::json(storage.get_config())
        }
        Command::ForceSsh(value) => {
            storage.set_force_ssh_mode(value)?;
            Output::json(storage.get_config())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filebridge_core::config::StorageConfig;
    use filebridge_core::mode::Environment;
    use tempfile::TempDir;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    fn storage_in(dir: &TempDir) -> Storage {
        Storage::new(StorageConfig {
            environment: Environment::Development,
            local_root_path: dir.path().join("files"),
            flags_path: dir.path().join("mode.json"),
            ..Default::default()
        })
    }

    #[test]
    fn parse_defaults_optional_paths_to_root() {
        assert_eq!(parse(&args("ls")).unwrap(), Command::List(String::new()));
        assert_eq!(
            parse(&args("mkdir reports")).unwrap(),
            Command::Mkdir {
                name: "reports".into(),
                parent: String::new()
            }
        );
    }

    #[test]
    fn parse_exec_joins_remaining_args() {
        assert_eq!(
            parse(&args("exec ls -la /tmp")).unwrap(),
            Command::Exec("ls -la /tmp".into())
        );
    }

    #[test]
    fn parse_set_config_json() {
        let cmd = parse(&[
            "set-config".to_string(),
            r#"{"remoteRootPath":"/data/","sandboxFallback":true}"#.to_string(),
        ])
        .unwrap();
        match cmd {
            Command::SetConfig(update) => {
                assert_eq!(update.remote_root_path.as_deref(), Some("/data/"));
                assert_eq!(update.sandbox_fallback, Some(true));
                assert_eq!(update.force_ssh_mode, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&args("cat")).is_err());
        assert!(parse(&args("force-ssh maybe")).is_err());
        assert!(parse(&args("frobnicate")).is_err());
    }

    #[tokio::test]
    async fn put_then_cat() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        let source = dir.path().join("hello.txt");
        std::fs::write(&source, "hello\n").unwrap();

        run(
            &storage,
            Command::Put {
                file: source,
                dir: "inbox".into(),
            },
        )
        .await
        .unwrap();
        let out = run(&storage, Command::Cat("inbox/hello.txt".into()))
            .await
            .unwrap();
        assert_eq!(out, Output::Text("hello\n".into()));
    }

    #[tokio::test]
    async fn mkdir_reports_created_flag() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        let cmd = Command::Mkdir {
            name: "docs".into(),
            parent: String::new(),
        };

        let first = run(&storage, cmd.clone()).await.unwrap();
        let second = run(&storage, cmd).await.unwrap();
        assert_eq!(first, Output::Json(serde_json::json!({ "created": true })));
        assert_eq!(second, Output::Json(serde_json::json!({ "created": false })));
    }

    #[tokio::test]
    async fn probe_in_local_mode_is_connected() {
        let dir = TempDir::new().unwrap();
        let out = run(&storage_in(&dir), Command::Probe).await.unwrap();
        assert_eq!(
            out,
            Output::Json(serde_json::json!({ "mode": "local", "connected": true }))
        );
    }
}

//! Shared utilities for filebridge-core integration tests.
//!
//! Remote tests run against the SSH container from
//! `tests/docker/docker-compose.yml` and are skipped at runtime when it is
//! not reachable.

// Each integration test is compiled as its own crate, so not every test file
// uses every function from this shared module.
#![allow(dead_code)]

use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;

use filebridge_core::config::{RemoteConfig, StorageConfig};
use filebridge_core::files::FileDescriptor;
use filebridge_core::mode::Environment;

/// SSH/SFTP container with password authentication.
pub const PORT_SSH: u16 = 2201;

/// Home directory of the test user inside the container.
pub const REMOTE_TEST_ROOT: &str = "/config";

/// Check if a TCP port is reachable on the given host.
///
/// Returns `true` if a TCP connection can be established within 2 seconds.
pub fn is_port_reachable(host: &str, port: u16) -> bool {
    let addr = format!("{host}:{port}");
    if let Ok(addr) = addr.parse() {
        TcpStream::connect_timeout(&addr, Duration::from_secs(2)).is_ok()
    } else {
        false
    }
}

/// Skip the current test if the Docker container is not reachable on the
/// given port.
macro_rules! require_docker {
    ($port:expr) => {
        if !common::is_port_reachable("127.0.0.1", $port) {
            eprintln!(
                "SKIPPED: Docker container not reachable on port {} \
                 (start with: cd tests/docker && docker compose up -d)",
                $port
            );
            return;
        }
    };
}
pub(crate) use require_docker;

/// Password credentials for the test container.
pub fn ssh_password_config(port: u16) -> RemoteConfig {
    RemoteConfig {
        host: "127.0.0.1".into(),
        port,
        username: "testuser".into(),
        password: Some("testpass".into()),
        ..Default::default()
    }
}

/// Development-mode config rooted in `dir`, flags stored beside it.
pub fn local_config(dir: &Path) -> StorageConfig {
    StorageConfig {
        environment: Environment::Development,
        local_root_path: dir.join("files"),
        flags_path: dir.join("mode.json"),
        ..Default::default()
    }
}

/// Production-mode config pointing at the test container under a unique
/// remote root.
pub fn remote_config(dir: &Path, root_name: &str) -> StorageConfig {
    StorageConfig {
        environment: Environment::Production,
        remote: ssh_password_config(PORT_SSH),
        remote_root_path: format!("{REMOTE_TEST_ROOT}/{root_name}/"),
        flags_path: dir.join("mode.json"),
        ..Default::default()
    }
}

/// Stage an upload in `dir` the way a request handler would.
pub fn stage_upload(dir: &Path, name: &str, content: &[u8]) -> FileDescriptor {
    let path = dir.join(format!("upload-{}", rand_suffix()));
    std::fs::write(&path, content).unwrap();
    FileDescriptor {
        original_name: name.to_string(),
        local_temp_path: path,
        size: content.len() as u64,
    }
}

/// Random suffix for unique temp and remote names.
pub fn rand_suffix() -> String {
    use rand::Rng;
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

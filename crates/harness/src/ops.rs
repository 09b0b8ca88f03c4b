//! Capability-checked operations.
//!
//! Each operation asks its sandbox for the matching permission before it
//! does any work. Bodies that stick to these functions cannot reach a side
//! effect their grant does not cover.

use std::env::VarError;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use policy::PermissionRequest;

use crate::{CaseError, Sandbox};

type Result<T> = std::result::Result<T, CaseError>;

/// Read a file to a string. Requires `read`.
pub async fn read_to_string(sandbox: &Sandbox, path: impl AsRef<Path>) -> Result<String> {
    sandbox.require(PermissionRequest::read("fs.read"))?;
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Write a file, replacing its contents. Requires `write`.
pub async fn write(
    sandbox: &Sandbox,
    path: impl AsRef<Path>,
    contents: impl AsRef<[u8]>,
) -> Result<()> {
    sandbox.require(PermissionRequest::write("fs.write"))?;
    Ok(tokio::fs::write(path, contents).await?)
}

/// Resolve `host:port` to socket addresses. Requires `net`.
pub async fn lookup_host(sandbox: &Sandbox, host: &str) -> Result<Vec<SocketAddr>> {
    sandbox.require(PermissionRequest::net("net.lookup"))?;
    Ok(tokio::net::lookup_host(host).await?.collect())
}

/// Read an environment variable. Requires `env`.
///
/// An unset variable is `None`; a value that is not valid unicode fails.
pub fn env_var(sandbox: &Sandbox, key: &str) -> Result<Option<String>> {
    sandbox.require(PermissionRequest::env("env.var"))?;
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(CaseError::failed(format!(
            "environment variable {key} is not valid unicode: {raw:?}"
        ))),
    }
}

/// Run a program to completion and capture its output. Requires `run`.
pub async fn run_command<I, S>(sandbox: &Sandbox, program: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    sandbox.require(PermissionRequest::run("process.run"))?;
    Ok(tokio::process::Command::new(program)
        .args(args)
        .output()
        .await?)
}

/// Resolve a native library for foreign calls. Requires `ffi`.
///
/// Only the path is resolved; loading and symbol lookup are left to the caller.
pub async fn resolve_library(sandbox: &Sandbox, path: impl AsRef<Path>) -> Result<PathBuf> {
    sandbox.require(PermissionRequest::ffi("ffi.dlopen"))?;
    Ok(tokio::fs::canonicalize(path).await?)
}

/// Nanosecond-precision time since the sandbox was created. Requires `hrtime`.
pub fn hrtime(sandbox: &Sandbox) -> Result<Duration> {
    sandbox.require(PermissionRequest::hrtime("hrtime.now"))?;
    Ok(sandbox.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::{Permission, PermissionSet};

    #[tokio::test]
    async fn test_denied_before_touching_filesystem() {
        let sandbox = Sandbox::new("no-read", PermissionSet::none());
        let err = read_to_string(&sandbox, "/definitely/missing/file")
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Violation(v) if v.permission == Permission::Read));
    }

    #[tokio::test]
    async fn test_granted_read_surfaces_io_error() {
        let sandbox = Sandbox::new("read", PermissionSet::only(Permission::Read));
        let err = read_to_string(&sandbox, "/definitely/missing/file")
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Io(_)));
        assert!(sandbox.violation().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let path = std::env::temp_dir().join(format!("permbench-ops-{}", std::process::id()));
        let grant = PermissionSet::from_names(["read", "write"]).unwrap();
        let sandbox = Sandbox::new("rw", grant);

        write(&sandbox, &path, "hello").await.unwrap();
        assert_eq!(read_to_string(&sandbox, &path).await.unwrap(), "hello");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_env_and_hrtime_gated() {
        let sandbox = Sandbox::new("hrtime", PermissionSet::only(Permission::Hrtime));
        assert!(hrtime(&sandbox).is_ok());
        assert!(env_var(&sandbox, "PATH").is_err());
        assert_eq!(sandbox.violation().unwrap().api_name, "env.var");
    }

    #[test]
    fn test_env_var_unset_and_non_unicode() {
        let sandbox = Sandbox::new("env", PermissionSet::only(Permission::Env));
        assert_eq!(env_var(&sandbox, "PERMBENCH_SURELY_UNSET").unwrap(), None);

        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;

            let key = "PERMBENCH_NON_UNICODE";
            // SAFETY: no other test reads or writes this variable.
            unsafe { std::env::set_var(key, std::ffi::OsStr::from_bytes(b"\xff\xfe")) };
            let err = env_var(&sandbox, key).unwrap_err();
            assert!(matches!(err, CaseError::Failed(msg) if msg.contains(key)));
            unsafe { std::env::remove_var(key) };
        }
    }

    #[tokio::test]
    async fn test_run_and_ffi_denied() {
        let sandbox = Sandbox::new("none", PermissionSet::none());
        assert!(run_command(&sandbox, "true", Vec::<&str>::new()).await.is_err());
        assert!(resolve_library(&sandbox, "libc.so.6").await.is_err());
        assert!(lookup_host(&sandbox, "localhost:80").await.is_err());
        // Only the first denial is kept.
        assert_eq!(sandbox.violation().unwrap().permission, Permission::Run);
    }
}

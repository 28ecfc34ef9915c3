//! Typed readers over `git config`, mirroring `git-branchless`'s
//! `core::config` module.

use crate::driver::GitDriver;

const DEFAULT_TRUNK_CANDIDATES: &[&str] = &["main", "master", "trunk"];

impl GitDriver {
    fn config_get(&self, key: &str) -> Option<String> {
        let args = ["config", "--get", key];
        let output = self.run_info().run_silent(&args, Default::default()).ok()?;
        if output.success() {
            Some(output.stdout_string())
        } else {
            None
        }
    }

    fn config_get_bool(&self, key: &str, default: bool) -> bool {
        match self.config_get(key).as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    fn config_set(&self, key: &str, value: &str) -> Result<(), crate::driver::Error> {
        let args = ["config", "--local", key, value];
        let output = self
            .run_info()
            .run_silent(&args, Default::default())
            .map_err(crate::driver::Error::from)?;
        if output.success() {
            Ok(())
        } else {
            Err(crate::driver::Error::CommandFailed {
                args: args.join(" "),
                exit_code: output.exit_code,
                stderr: output.stderr_string(),
            })
        }
    }

    /// Record `name` as the trunk branch in this repository's local config.
    pub fn set_trunk_branch_name(&self, name: &str) -> Result<(), crate::driver::Error> {
        self.config_set("spice.trunk", name)
    }

    /// Record `name` as the remote this repository pushes to and submits
    /// against.
    pub fn set_remote_name(&self, name: &str) -> Result<(), crate::driver::Error> {
        self.config_set("spice.remote", name)
    }

    /// The name of the trunk branch, resolved through `spice.trunk`, falling
    /// back to Git's own `init.defaultBranch`, falling back to probing for
    /// one of `main`/`master`/`trunk` among local branches.
    pub fn get_trunk_branch_name(&self) -> Option<String> {
        if let Some(name) = self.config_get("spice.trunk") {
            return Some(name);
        }
        if let Some(name) = self.config_get("init.defaultBranch") {
            if self.resolve_ref(&name).is_ok() {
                return Some(name);
            }
        }
        for candidate in DEFAULT_TRUNK_CANDIDATES {
            if self.resolve_ref(candidate).is_ok() {
                return Some((*candidate).to_owned());
            }
        }
        None
    }

    /// The name of the Git remote to push to and submit against, resolved
    /// through `spice.remote`, falling back to `origin`.
    pub fn get_remote_name(&self) -> String {
        self.config_get("spice.remote")
            .unwrap_or_else(|| "origin".to_owned())
    }

    /// Whether restacking should preserve each commit's original author
    /// timestamp rather than stamping the rebase time.
    pub fn get_restack_preserve_timestamps(&self) -> bool {
        self.config_get_bool("spice.restack.preserveTimestamps", true)
    }

    /// Whether branches should auto-switch to their new name after a
    /// rename/fold/split operation. Mirrors `branchless.core.autoSwitchBranches`.
    pub fn get_auto_switch_branches(&self) -> bool {
        self.config_get_bool("spice.autoSwitchBranches", true)
    }

    /// Whether hint messages (e.g. "run `stack restack` to continue") should
    /// be printed after operations that leave the stack stale.
    pub fn get_hints_enabled(&self) -> bool {
        self.config_get_bool("spice.hints", true)
    }
}

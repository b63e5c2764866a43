//! vim-plug bootstrap and plugin installation.
//!
//! Both steps depend on the network or an editor binary, so their failures
//! are reported as skips rather than task failures.
use anyhow::Result;
use std::path::PathBuf;

use super::{Context, Task, TaskResult};

/// Location of `plug.vim` below the target root.
fn plug_path(ctx: &Context) -> PathBuf {
    ctx.target().join(".vim").join("autoload").join("plug.vim")
}

/// Download `plug.vim` with `curl`, falling back to `wget`.
#[derive(Debug, Default)]
pub struct InstallVimPlug;

impl Task for InstallVimPlug {
    fn name(&self) -> &str {
        "Install vim-plug"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.plugins.enabled
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let path = plug_path(ctx);
        if std::fs::symlink_metadata(&path).is_ok() {
            ctx.log
                .info(&format!("already installed: {}", path.display()));
            return Ok(TaskResult::Ok);
        }

        let url = ctx.config.plugins.url.trim();
        if url.is_empty() {
            return Ok(TaskResult::Skipped("no download URL configured".to_string()));
        }

        if ctx.dry_run {
            ctx.log
                .dry_run(&format!("would download {url} to {}", path.display()));
            return Ok(TaskResult::DryRun);
        }

        if let Some(parent) = path.parent() {
            ctx.fs_ops.create_dir_all(parent)?;
        }
        let dest = path.to_string_lossy().into_owned();
        let attempts: [(&str, Vec<&str>); 2] = [
            ("curl", vec!["-fLo", dest.as_str(), "--create-dirs", url]),
            ("wget", vec!["-q", "-O", dest.as_str(), url]),
        ];

        let mut errors = Vec::new();
        for (program, args) in &attempts {
            if !ctx.executor.which(program) {
                ctx.log.debug(&format!("{program} not found"));
                continue;
            }
            match ctx.executor.run(program, args) {
                Ok(_) => {
                    ctx.log.info(&format!("downloaded vim-plug with {program}"));
                    return Ok(TaskResult::Ok);
                }
                Err(e) => {
                    ctx.log.debug(&format!("{program} failed: {e:#}"));
                    errors.push(format!("{program}: {e:#}"));
                    // wget leaves an empty file behind on failure.
                    if std::fs::symlink_metadata(&path).is_ok() {
                        ctx.fs_ops.remove_file(&path).ok();
                    }
                }
            }
        }

        let reason = if errors.is_empty() {
            "neither curl nor wget is available".to_string()
        } else {
            format!("download failed ({})", errors.join("; "))
        };
        ctx.log.warn(&format!("vim-plug not installed: {reason}"));
        Ok(TaskResult::Skipped(reason))
    }
}

/// Run `vim +PlugInstall +qall` with `HOME` pointing at the target root.
#[derive(Debug, Default)]
pub struct InstallVimPlugins;

impl Task for InstallVimPlugins {
    fn name(&self) -> &str {
        "Install vim plugins"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.plugins.enabled
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !ctx.executor.which("vim") {
            return Ok(TaskResult::Skipped("vim not found".to_string()));
        }
        if ctx.dry_run {
            ctx.log.dry_run("would run: vim +PlugInstall +qall");
            return Ok(TaskResult::DryRun);
        }
        if std::fs::symlink_metadata(plug_path(ctx)).is_err() {
            return Ok(TaskResult::Skipped("vim-plug is not installed".to_string()));
        }

        let home = ctx.target().to_string_lossy().into_owned();
        match ctx.executor.run_in_with_env(
            ctx.target(),
            "vim",
            &["+PlugInstall", "+qall"],
            &[("HOME", home.as_str())],
        ) {
            Ok(_) => Ok(TaskResult::Ok),
            Err(e) => {
                ctx.log.warn(&format!("plugin installation failed: {e:#}"));
                Ok(TaskResult::Skipped("vim +PlugInstall failed".to_string()))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::TestContext;

    #[test]
    fn plug_download_uses_curl_first() {
        let tc = TestContext::new().with_executor(MockExecutor::default());
        let result = InstallVimPlug.run(&tc.ctx()).unwrap();
        assert_eq!(result, TaskResult::Ok);
        let calls = tc.executor().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], "curl");
        assert!(calls[0].iter().any(|a| a.ends_with(".vim/autoload/plug.vim")));
        assert!(tc.target().join(".vim/autoload").is_dir());
    }

    #[test]
    fn plug_download_falls_back_to_wget() {
        let tc = TestContext::new()
            .with_executor(MockExecutor::with_responses(vec![(false, ""), (true, "")]));
        assert_eq!(InstallVimPlug.run(&tc.ctx()).unwrap(), TaskResult::Ok);
        let calls = tc.executor().calls();
        assert_eq!(calls[1][0], "wget");
    }

    #[test]
    fn plug_download_failure_is_a_skip() {
        let tc = TestContext::new()
            .with_executor(MockExecutor::with_responses(vec![(false, ""), (false, "")]));
        let result = InstallVimPlug.run(&tc.ctx()).unwrap();
        assert!(matches!(result, TaskResult::Skipped(reason) if reason.contains("download failed")));
    }

    #[test]
    fn plug_without_downloaders_is_a_skip() {
        let tc = TestContext::new().with_executor(
            MockExecutor::default()
                .without_program("curl")
                .without_program("wget"),
        );
        let result = InstallVimPlug.run(&tc.ctx()).unwrap();
        assert!(matches!(result, TaskResult::Skipped(_)));
        assert!(tc.executor().calls().is_empty());
    }

    #[test]
    fn plug_already_present_is_ok_without_calls() {
        let tc = TestContext::new().with_executor(MockExecutor::default());
        tc.write_target(".vim/autoload/plug.vim", "\" plug");
        assert_eq!(InstallVimPlug.run(&tc.ctx()).unwrap(), TaskResult::Ok);
        assert!(tc.executor().calls().is_empty());
    }

    #[test]
    fn plug_dry_run_downloads_nothing() {
        let tc = TestContext::new()
            .with_executor(MockExecutor::default())
            .dry_run(true);
        assert_eq!(InstallVimPlug.run(&tc.ctx()).unwrap(), TaskResult::DryRun);
        assert!(tc.executor().calls().is_empty());
        assert!(!tc.target().join(".vim").exists());
    }

    #[test]
    fn plugins_skip_without_vim() {
        let tc = TestContext::new().with_executor(MockExecutor::default().without_program("vim"));
        assert_eq!(
            InstallVimPlugins.run(&tc.ctx()).unwrap(),
            TaskResult::Skipped("vim not found".to_string())
        );
    }

    #[test]
    fn plugins_run_with_target_as_home() {
        let tc = TestContext::new().with_executor(MockExecutor::default());
        tc.write_target(".vim/autoload/plug.vim", "\" plug");
        assert_eq!(InstallVimPlugins.run(&tc.ctx()).unwrap(), TaskResult::Ok);
        let calls = tc.executor().calls();
        assert_eq!(calls[0], vec!["vim", "+PlugInstall", "+qall"]);
        let envs = tc.executor().envs();
        assert_eq!(envs[0][0].0, "HOME");
        assert_eq!(envs[0][0].1, tc.target().to_string_lossy());
    }

    #[test]
    fn plugins_failure_is_a_skip() {
        let tc = TestContext::new().with_executor(MockExecutor::with_responses(vec![(false, "")]));
        tc.write_target(".vim/autoload/plug.vim", "\" plug");
        assert!(matches!(
            InstallVimPlugins.run(&tc.ctx()).unwrap(),
            TaskResult::Skipped(_)
        ));
    }

    #[test]
    fn disabled_plugins_do_not_run() {
        let tc = TestContext::new().plugins_enabled(false);
        assert!(!InstallVimPlug.should_run(&tc.ctx()));
        assert!(!InstallVimPlugins.should_run(&tc.ctx()));
    }
}

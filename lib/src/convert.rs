//! The ISO to EBS-backed AMI conversion pipeline.
//!
//! Strictly sequential: each external step completes (or aborts the build)
//! before the next begins.  The only held resource is the set of bind
//! mounts, which is released on every exit path.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fn_error_context::context;

use crate::buildenv::BuildEnv;
use crate::buildlog::BuildLog;
use crate::cli::Opt;
use crate::config::Config;
use crate::ebs;
use crate::flags::EffectiveFlagSet;
use crate::identity::{self, BuildIdentity};
use crate::iso;
use crate::mount::{self, MountGuard};
use crate::names::ArtifactNames;
use crate::publish;
use crate::rootfs;

/// Everything derived before the first side-effecting step.  Constructed
/// once from the command line and the environment, immutable afterwards.
#[derive(Debug)]
pub(crate) struct ResolvedBuild {
    pub(crate) identity: BuildIdentity,
    pub(crate) flags: EffectiveFlagSet,
    pub(crate) config: Config,
    pub(crate) names: ArtifactNames,
}

impl ResolvedBuild {
    /// Resolve the build parameters: identity, effective flags, artifact
    /// names and configuration.  No side effects beyond warnings.
    #[context("Resolving build parameters")]
    pub(crate) fn resolve(opt: &Opt) -> Result<Self> {
        let identity = BuildIdentity::parse(&opt.app_version)?;
        let class = identity::classify_version(&identity.version);
        let flags = opt.flags().resolve(class);
        identity::validate_architecture(&identity, identity::host_architecture()?)?;
        let config = Config::from_env(flags.publish)?;
        let names =
            ArtifactNames::derive(&identity, flags.increment, flags.name_override.as_deref());
        Ok(Self {
            identity,
            flags,
            config,
            names,
        })
    }
}

#[context("Querying root privilege")]
fn require_root() -> Result<()> {
    let uid = rustix::process::getuid();
    if !uid.is_root() {
        anyhow::bail!("This command requires root privileges");
    }
    if !rustix::thread::capability_is_in_bounding_set(rustix::thread::Capability::SystemAdmin)? {
        anyhow::bail!("This command requires full root privileges (CAP_SYS_ADMIN)");
    }
    Ok(())
}

/// Release the bind mounts and remove the working trees when INT/TERM
/// arrives while the build runs on the blocking pool.
fn spawn_signal_cleanup(
    rootfs_dir: Utf8PathBuf,
    cdroot_dir: Utf8PathBuf,
    debug: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut int), Ok(mut term)) = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) else {
            tracing::warn!("Failed to install signal handlers");
            return;
        };
        tokio::select! {
            _ = int.recv() => {},
            _ = term.recv() => {},
        }
        tracing::error!("Interrupted; cleaning up");
        mount::unmount_all(&rootfs_dir);
        cleanup_workdirs(&rootfs_dir, &cdroot_dir, debug);
        std::process::exit(1);
    })
}

/// Best-effort removal of the working trees.  Trees with anything still
/// mounted beneath them are left alone, as is everything under BT_DEBUG.
fn cleanup_workdirs(rootfs_dir: &Utf8Path, cdroot_dir: &Utf8Path, debug: bool) {
    if debug {
        tracing::debug!("Debug retention: keeping {rootfs_dir} and {cdroot_dir}");
        return;
    }
    for dir in [rootfs_dir, cdroot_dir] {
        if !dir.exists() {
            continue;
        }
        if mount::any_bind_mounted(dir) {
            tracing::warn!("Not removing {dir}: still mounted");
            continue;
        }
        if let Err(e) = std::fs::remove_dir_all(dir) {
            tracing::warn!("Failed to remove {dir}: {e}");
        }
    }
}

/// Run the conversion for the given command line.
pub(crate) async fn run(opt: Opt) -> Result<()> {
    let resolved = ResolvedBuild::resolve(&opt)?;
    require_root()?;

    let outdir = resolved.config.builds.join("ec2");
    std::fs::create_dir_all(&outdir).with_context(|| format!("Creating {outdir}"))?;
    let rootfs_dir = outdir.join(&resolved.names.rootfs);
    let cdroot_dir = outdir.join(&resolved.names.cdroot);

    // The pipeline blocks on external processes, so it runs on the blocking
    // pool; the runtime thread stays free to service the signal listener.
    let signal_task =
        spawn_signal_cleanup(rootfs_dir.clone(), cdroot_dir.clone(), resolved.config.debug);
    let r = tokio::task::spawn_blocking(move || build(resolved, &outdir)).await;
    signal_task.abort();
    r.context("Build task panicked")?
}

/// The sequential build: acquire, patch, image, publish, clean up.
fn build(resolved: ResolvedBuild, outdir: &Utf8Path) -> Result<()> {
    let rootfs_dir = outdir.join(&resolved.names.rootfs);
    let cdroot_dir = outdir.join(&resolved.names.cdroot);
    if rootfs_dir.exists() {
        anyhow::bail!("Working tree {rootfs_dir} already exists (leftover from a failed run?)");
    }
    let log = BuildLog::create(&outdir.join(&resolved.names.log), &resolved.names.name)?;

    let r = build_inner(&resolved, outdir, &rootfs_dir, &log);
    cleanup_workdirs(&rootfs_dir, &cdroot_dir, resolved.config.debug);
    let ami_id = r?;
    println!("Build complete: {} ({ami_id})", resolved.names.name);
    Ok(())
}

fn build_inner(
    resolved: &ResolvedBuild,
    outdir: &Utf8Path,
    rootfs_dir: &Utf8Path,
    log: &BuildLog,
) -> Result<String> {
    let flags = &resolved.flags;
    let names = &resolved.names;
    let config = &resolved.config;

    let isofile = config.isos.join(&names.iso);
    iso::download(&isofile, log)?;
    iso::verify(&isofile, log)?;
    iso::extract(&isofile, outdir, log)?;
    anyhow::ensure!(
        rootfs_dir.exists(),
        "Extraction did not produce {rootfs_dir}"
    );

    patch_phase(rootfs_dir, flags, config, log)?;

    let ami_id = ebs::create_image(&names.name, rootfs_dir, log)?;
    log.line(&format!("registered {ami_id}"))?;
    if flags.pvm_register {
        let pvm_id = ebs::register_pvm(&ami_id, &names.name, log)?;
        log.line(&format!("registered paravirtual {pvm_id}"))?;
    }
    if flags.copy {
        ebs::copy_to_regions(&ami_id, log)?;
    }
    if flags.marketplace {
        ebs::share_marketplace(&ami_id, log)?;
    }

    let buildenv = BuildEnv {
        name: names.name.clone(),
        app_name: resolved.identity.app_name.clone(),
        tag: names.tag.clone(),
        ami_id: ami_id.clone(),
        created: chrono::Utc::now(),
    };
    let buildenv_path = outdir.join(&names.buildenv);
    buildenv.write(&buildenv_path)?;

    if flags.publish {
        // Config guarantees both destinations when publish is set
        let meta = config
            .publish_meta
            .as_deref()
            .context("Missing publish metadata destination")?;
        let logs = config
            .publish_logs
            .as_deref()
            .context("Missing publish logs destination")?;
        publish::publish_file(&buildenv_path, meta, log)?;
        publish::publish_file(log.path(), logs, log)?;
    }
    Ok(ami_id)
}

/// The phase that needs the kernel filesystems inside the rootfs.  The
/// guard also releases on error drop; the explicit release keeps nothing
/// mounted by the time imaging starts.
#[context("Patching {rootfs_dir}")]
fn patch_phase(
    rootfs_dir: &Utf8Path,
    flags: &EffectiveFlagSet,
    config: &Config,
    log: &BuildLog,
) -> Result<()> {
    let mut mounts = MountGuard::bind(rootfs_dir)?;
    rootfs::purge_packages(rootfs_dir, log)?;
    if flags.sec_updates {
        rootfs::install_security_updates(rootfs_dir, log)?;
    }
    if flags.increment {
        rootfs::upgrade_all(rootfs_dir, log)?;
    }
    rootfs::apply_patch(rootfs_dir, &config.patches.join("ec2"), log)?;
    if flags.pvm_shim {
        rootfs::apply_patch(rootfs_dir, &config.patches.join("pvmshim"), log)?;
    }
    mounts.release();
    Ok(())
}
